use std::sync::mpsc::RecvError;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::config::AssetKind;

#[derive(Debug, Error)]
pub enum AssetforgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Error while building:\n{0}")]
    Build(#[from] BuildError),

    #[error("Task '{0}':\n{1}")]
    Task(&'static str, TaskError),

    #[error("Error while cleaning the build root:\n{0}")]
    Clean(#[from] CleanError),

    #[error("Error while watching for file changes:\n{0}")]
    Watch(#[from] WatchError),
}

/// Path table validation failure. Fatal, raised before any task runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Category '{0}': empty source selector")]
    EmptySelector(AssetKind),

    #[error("Category '{0}': empty watch selector")]
    EmptyWatchSelector(AssetKind),

    #[error("Category '{kind}': output directory '{out}' escapes the build root '{root}'")]
    OutputOutsideRoot {
        kind: AssetKind,
        out: Utf8PathBuf,
        root: Utf8PathBuf,
    },
}

/// Fatal task failure. Per-file transform errors are not represented here;
/// they are reported and the file is skipped (see [`crate::FileFailure`]).
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Couldn't write to the output directory.\n{0}")]
    Io(#[from] std::io::Error),

    #[error("Couldn't compile glob pattern.\n{0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),
}

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("Couldn't remove the build root.\n{0}")]
    Remove(std::io::Error),

    #[error("Couldn't recreate the build root.\n{0}")]
    Create(std::io::Error),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Error while cleaning the build root:\n{0}")]
    Clean(#[from] CleanError),

    #[error("Task '{0}':\n{1}")]
    Task(&'static str, TaskError),
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Recv(#[from] RecvError),
}
