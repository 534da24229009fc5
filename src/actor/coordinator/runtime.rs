use std::time::Duration;

use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::builder::BuilderActor;
use crate::actor::fs::FsActor;
use crate::actor::messages::{BuildMsg, WsMsg};
use crate::actor::ws::WsActor;

/// How long actors get to wind down after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

pub(super) struct Actors {
    pub(super) builder: BuilderActor,
    pub(super) fs: Option<FsActor>,
    pub(super) ws: Option<WsActor>,
}

/// Run all actors until the shutdown signal, or until the builder exits.
pub(super) async fn run_actors(
    actors: Actors,
    build_tx: mpsc::Sender<BuildMsg>,
    ws_tx: Option<mpsc::Sender<WsMsg>>,
    shutdown_rx: Option<Receiver<()>>,
) {
    let mut builder_handle = tokio::spawn(actors.builder.run());
    let fs_handle = actors.fs.map(|fs| tokio::spawn(fs.run()));
    let ws_handle = actors.ws.map(|ws| tokio::spawn(ws.run()));

    match shutdown_rx {
        Some(rx) => loop {
            if rx.try_recv().is_ok() {
                crate::debug!("actor"; "shutdown signal received");
                break;
            }
            if builder_handle.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        },
        None => {
            let _ = (&mut builder_handle).await;
        }
    }

    let _ = build_tx.send(BuildMsg::Shutdown).await;
    if let Some(tx) = &ws_tx {
        let _ = tx.send(WsMsg::Shutdown).await;
    }
    if let Some(handle) = fs_handle {
        handle.abort();
    }

    let _ = tokio::time::timeout(SHUTDOWN_GRACE, builder_handle).await;
    if let Some(handle) = ws_handle {
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, handle).await;
    }
}
