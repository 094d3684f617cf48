//! Watch mode is implemented as a three-part system:
//!
//! 1. **File watcher**: the `notify` crate monitors the collapsed set of
//!    watch roots recursively, with debouncing so rapid file saves coalesce
//!    into one batch.
//! 2. **Watch bindings**: each path table category owns a binding pairing
//!    its watch selector with the task(s) to re-run; bindings are created at
//!    startup and never mutated.
//! 3. **Reload notifier**: every task that completes after a change pushes a
//!    [`ReloadEvent`] to the connected browsers (see [`crate::server`]).
//!
//! Event batches arriving while tasks run queue up in the channel and are
//! handled on the next loop iteration, so the last event in a burst is never
//! dropped. A task failure at watch time is logged and the loop returns to
//! waiting; it never terminates the engine.

use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::{DebouncedEvent, new_debouncer};

use crate::build;
use crate::config::{AssetKind, Paths};
use crate::error::WatchError;
use crate::server::{self, ReloadEvent};
use crate::task::{self, TaskId};

const DEBOUNCE: Duration = Duration::from_millis(250);

/// (watch selector, tasks) pair for one category. Created once at engine
/// startup, torn down at process exit.
struct WatchBinding {
    tasks: &'static [TaskId],
    pattern: Pattern,
    exts: &'static [&'static str],
}

impl WatchBinding {
    /// Returns the canonicalized watch root alongside the binding, or
    /// `None` when the category's source directory does not exist yet.
    fn try_new(kind: AssetKind, paths: &Paths) -> Result<Option<(Utf8PathBuf, Self)>, WatchError> {
        let entry = paths.entry(kind);

        if !entry.base.exists() {
            tracing::debug!(category = kind.name(), base = %entry.base, "skipping watch, no source directory");
            return Ok(None);
        }

        let root = entry.base.canonicalize_utf8()?;
        let pattern = Pattern::new(root.join(&entry.watch).as_str())?;

        // An image change invalidates both the optimized original and its
        // webp copy.
        let tasks: &'static [TaskId] = match kind {
            AssetKind::Markup => &[TaskId::Markup],
            AssetKind::Styles => &[TaskId::Styles],
            AssetKind::Scripts => &[TaskId::Scripts],
            AssetKind::Images => &[TaskId::Images, TaskId::WebpImages],
            AssetKind::Fonts => &[TaskId::Fonts],
            AssetKind::Video => &[TaskId::Video],
        };

        Ok(Some((
            root,
            Self {
                tasks,
                pattern,
                exts: entry.exts,
            },
        )))
    }

    fn matches(&self, path: &Utf8Path) -> bool {
        if !self.pattern.matches_path(path.as_std_path()) {
            return false;
        }
        self.exts.is_empty() || path.extension().is_some_and(|ext| self.exts.contains(&ext))
    }
}

/// Run an initial build, then serve the build root and re-run tasks on file
/// changes until the process is interrupted.
pub fn watch(paths: &Paths) -> Result<(), WatchError> {
    build::build(paths)?;

    let (tcp, ws_port) = server::reserve_ws_port()?;
    tracing::info!(port = ws_port, "reload websocket listening");

    let clients = Arc::new(Mutex::new(Vec::new()));
    let _thread_in = server::new_thread_ws_incoming(tcp, clients.clone());
    let (tx_reload, _thread_out) = server::new_thread_ws_reload(clients);
    let _thread_http = server::start_http(paths.root().to_owned());

    let mut bindings = Vec::new();
    let mut roots = HashSet::new();
    for kind in AssetKind::ALL {
        if let Some((root, binding)) = WatchBinding::try_new(kind, paths)? {
            roots.insert(root);
            bindings.push(binding);
        }
    }

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, None, tx)?;

    for root in collapse_watch_roots(roots) {
        tracing::info!("watching {root}");
        debouncer.watch(root.as_std_path(), RecursiveMode::Recursive)?;
    }

    loop {
        match rx.recv()? {
            Ok(events) => {
                for id in due_tasks(&bindings, &events) {
                    match task::run_task(id, paths) {
                        Ok(_) => {
                            if let Err(e) = tx_reload.send(ReloadEvent::now(id)) {
                                tracing::error!("reload channel closed: {e}");
                            }
                        }
                        Err(e) => tracing::error!(task = id.name(), "task failed: {e}"),
                    }
                }
            }
            Err(errors) => {
                for e in errors {
                    tracing::error!("watch error: {e}");
                }
            }
        }
    }
}

/// Map an event batch to the tasks that must re-run, deduplicated, in
/// binding order.
fn due_tasks(bindings: &[WatchBinding], events: &[DebouncedEvent]) -> Vec<TaskId> {
    let mut due = Vec::new();

    for de in events {
        if !matches!(
            de.event.kind,
            EventKind::Create(..) | EventKind::Modify(..) | EventKind::Remove(..)
        ) {
            continue;
        }

        for path in &de.event.paths {
            let Some(path) = Utf8Path::from_path(path) else {
                continue;
            };

            for binding in bindings {
                if binding.matches(path) {
                    for &id in binding.tasks {
                        if !due.contains(&id) {
                            due.push(id);
                        }
                    }
                }
            }
        }
    }

    due
}

/// Reduces a set of paths to the minimal set of watch roots.
///
/// If we watch `/a` and `/a/b`, we only need to watch `/a` because the
/// watcher is recursive.
fn collapse_watch_roots(roots: HashSet<Utf8PathBuf>) -> Vec<Utf8PathBuf> {
    let mut roots: Vec<_> = roots.into_iter().collect();
    roots.sort();

    let mut filtered: Vec<Utf8PathBuf> = Vec::new();
    for root in roots {
        if let Some(last) = filtered.last()
            && root.starts_with(last)
        {
            continue;
        }
        filtered.push(root);
    }

    filtered
}
