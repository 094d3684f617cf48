//! The task registry: seven runnable operations over the six path table
//! categories. A task resolves its source set at invocation time, hands it
//! to the category's transform and reports what was written and what was
//! skipped.

use camino::Utf8PathBuf;

use crate::config::{AssetKind, PathEntry, Paths};
use crate::error::TaskError;
use crate::report::FileFailure;
use crate::transform::{copy, images, scripts, styles};

/// One runnable transform task. `WebpImages` shares the images path entry:
/// it runs over the same sources but derives webp copies instead of
/// optimized originals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    Markup,
    Styles,
    Scripts,
    Images,
    WebpImages,
    Fonts,
    Video,
}

impl TaskId {
    /// Every task, in the order the build pipeline runs them (they are
    /// independent; the order only matters for logs).
    pub const ALL: [TaskId; 7] = [
        TaskId::Markup,
        TaskId::Styles,
        TaskId::Scripts,
        TaskId::Images,
        TaskId::WebpImages,
        TaskId::Fonts,
        TaskId::Video,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TaskId::Markup => "html",
            TaskId::Styles => "css",
            TaskId::Scripts => "js",
            TaskId::Images => "images",
            TaskId::WebpImages => "webp",
            TaskId::Fonts => "fonts",
            TaskId::Video => "video",
        }
    }

    /// The path table category this task reads from and writes under.
    pub fn kind(self) -> AssetKind {
        match self {
            TaskId::Markup => AssetKind::Markup,
            TaskId::Styles => AssetKind::Styles,
            TaskId::Scripts => AssetKind::Scripts,
            TaskId::Images | TaskId::WebpImages => AssetKind::Images,
            TaskId::Fonts => AssetKind::Fonts,
            TaskId::Video => AssetKind::Video,
        }
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a single transform pass produced.
#[derive(Debug, Default)]
pub(crate) struct Outcome {
    pub written: Vec<Utf8PathBuf>,
    pub skipped: Vec<FileFailure>,
}

/// Result of one task invocation.
#[derive(Debug)]
pub struct TaskReport {
    pub id: TaskId,
    /// Output files written, in source order.
    pub written: Vec<Utf8PathBuf>,
    /// Source files skipped because their transform failed.
    pub skipped: Vec<FileFailure>,
}

/// Run one task to completion. An empty source set is a successful no-op.
pub fn run_task(id: TaskId, paths: &Paths) -> Result<TaskReport, TaskError> {
    let entry = paths.entry(id.kind());
    let files = source_files(entry)?;

    let outcome = match id {
        TaskId::Markup | TaskId::Fonts | TaskId::Video => {
            copy::verbatim(&files, &entry.base, &entry.out)?
        }
        TaskId::Styles => styles::process(&files, &entry.base, &entry.out)?,
        TaskId::Scripts => scripts::process(&files, &entry.base, &entry.out)?,
        TaskId::Images => images::optimize(&files, &entry.base, &entry.out, paths.cache())?,
        TaskId::WebpImages => images::webp(&files, &entry.base, &entry.out, paths.cache())?,
    };

    tracing::info!(
        task = id.name(),
        written = outcome.written.len(),
        skipped = outcome.skipped.len(),
        "task finished"
    );

    Ok(TaskReport {
        id,
        written: outcome.written,
        skipped: outcome.skipped,
    })
}

/// Resolve the entry's source selector against the file system. The result
/// is sorted so task output order is deterministic.
fn source_files(entry: &PathEntry) -> Result<Vec<Utf8PathBuf>, TaskError> {
    let pattern = entry.base.join(&entry.select);
    let mut files = Vec::new();

    for hit in glob::glob(pattern.as_str())? {
        let path = Utf8PathBuf::try_from(hit?)?;
        if path.is_dir() {
            continue;
        }
        if entry.matches_ext(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
