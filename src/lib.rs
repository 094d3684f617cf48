#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod build;
mod config;
mod error;
mod report;
mod server;
mod task;
mod transform;
mod watch;

pub use crate::build::{build, clean};
pub use crate::config::{AssetKind, PathEntry, Paths};
pub use crate::error::*;
pub use crate::report::FileFailure;
pub use crate::server::ReloadEvent;
pub use crate::task::{TaskId, TaskReport, run_task};
pub use crate::watch::watch;
