//! Structured reporting for per-file transform failures.
//!
//! A broken asset must never block the rest of the pipeline: a file that
//! fails its transform is reported here with a title and message and then
//! skipped, while sibling files and other tasks proceed.

use std::fmt::Display;
use std::time::Instant;

use camino::Utf8PathBuf;
use console::Style;

const ANSI_BLUE: Style = Style::new().blue();
const ANSI_RED: Style = Style::new().red();

/// A single skipped file, with the reason it was skipped.
#[derive(Debug, Clone)]
pub struct FileFailure {
    /// Short category of the failure, e.g. "SCSS Error".
    pub title: &'static str,
    /// The source file that was skipped.
    pub path: Utf8PathBuf,
    pub message: String,
}

impl FileFailure {
    pub fn new(title: &'static str, path: Utf8PathBuf, err: impl Display) -> Self {
        Self {
            title,
            path,
            message: err.to_string(),
        }
    }
}

/// Log a per-file failure. This is terminal at file granularity; nothing is
/// rethrown upward.
pub(crate) fn file_failure(failure: &FileFailure) {
    tracing::error!(
        file = %failure.path,
        "{}: {}",
        ANSI_RED.apply_to(failure.title),
        failure.message,
    );
}

pub(crate) fn as_overhead(s: Instant) -> impl Display {
    let e = Instant::now();
    let f = format!("(+{}ms)", e.duration_since(s).as_millis());
    ANSI_BLUE.apply_to(f)
}
