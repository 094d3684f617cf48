//! Clean and the build pipeline: clean always settles before the parallel
//! task group starts, so no task can write into a directory that is being
//! deleted. The tasks own disjoint output subtrees and run without any
//! shared mutable state.

use std::fs;
use std::time::Instant;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::config::Paths;
use crate::error::{BuildError, CleanError};
use crate::report::as_overhead;
use crate::task::{self, TaskId, TaskReport};

/// Delete the entire build root if it exists, then recreate it empty.
pub fn clean(paths: &Paths) -> Result<(), CleanError> {
    let s = Instant::now();
    let root = paths.root();

    if fs::metadata(root).is_ok() {
        fs::remove_dir_all(root).map_err(CleanError::Remove)?;
    }

    fs::create_dir_all(root).map_err(CleanError::Create)?;

    tracing::info!("cleaned the build root {}", as_overhead(s));
    Ok(())
}

/// Run the whole pipeline once: clean, then every task in parallel. A fatal
/// error in any task aborts the group; per-file skips do not.
pub fn build(paths: &Paths) -> Result<Vec<TaskReport>, BuildError> {
    clean(paths)?;

    let s = Instant::now();

    let reports = TaskId::ALL
        .par_iter()
        .map(|&id| task::run_task(id, paths).map_err(|e| BuildError::Task(id.name(), e)))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!("finished {} tasks {}", reports.len(), as_overhead(s));
    Ok(reports)
}
