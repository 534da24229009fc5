//! FileSystem Actor
//!
//! Watches the project and sends debounced rebuild requests to the
//! BuilderActor. The watcher starts before the initial build so no change
//! made during it is lost.
//!
//! ```text
//! Watcher → Debouncer (timing) → ChangeFilter (relevance) → BuildMsg::Rebuild
//! ```
//!
//! Every relevant change bumps the build generation before the request is
//! queued, so a build already in flight notices it has been superseded.

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use super::messages::BuildMsg;
use crate::config::ProjectConfig;
use crate::pipeline::Generation;

mod debouncer;
mod filter;
mod types;
mod watch_roots;

#[cfg(test)]
mod tests;

use debouncer::Debouncer;
use filter::ChangeFilter;
use types::ChangeSet;

/// FileSystem Actor - watches for file changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    watch_roots: watch_roots::WatchRoots,
    builder_tx: mpsc::Sender<BuildMsg>,
    debouncer: Debouncer,
    filter: ChangeFilter,
    generation: Generation,
}

impl FsActor {
    pub fn new(
        config: &ProjectConfig,
        builder_tx: mpsc::Sender<BuildMsg>,
        generation: Generation,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        // missing roots are re-attached once they appear
        let mut watch_roots = watch_roots::WatchRoots::for_project(config);
        watch_roots.attach_existing(&mut watcher)?;
        for root in watch_roots.roots() {
            crate::debug!("watch"; "watching {}", root.display());
        }

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            builder_tx,
            debouncer: Debouncer::new(),
            filter: ChangeFilter::new(config),
            generation,
        })
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            builder_tx,
            mut debouncer,
            filter,
            generation,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                event = async_rx.recv() => match event {
                    Some(event) => debouncer.add_event(&event),
                    None => break,
                },
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    watch_roots.maintain(&mut watcher);
                    let Some(raw) = debouncer.take_if_ready() else {
                        continue;
                    };
                    let changes = filter.apply(raw);
                    if dispatch(changes, &builder_tx, &generation).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Queue a rebuild for `changes`.
///
/// Returns `Err(())` if the BuilderActor shut down.
async fn dispatch(
    changes: ChangeSet,
    builder_tx: &mpsc::Sender<BuildMsg>,
    generation: &Generation,
) -> Result<(), ()> {
    if changes.is_empty() {
        return Ok(());
    }
    log_changes(&changes);

    generation.bump();
    builder_tx
        .send(BuildMsg::Rebuild {
            changed: changes.paths(),
            config_changed: changes.config_changed,
        })
        .await
        .map_err(|_| ())
}

fn log_changes(changes: &ChangeSet) {
    match changes.changes.as_slice() {
        [(path, kind)] => {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            crate::log!("watch"; "{} {}", kind.label(), name);
        }
        many => crate::log!("watch"; "{} files changed", many.len()),
    }
}

