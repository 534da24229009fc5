//! Actor Coordinator - wires up the dev loop
//!
//! Creates the channels, starts the live update acceptor and runs the
//! actors until shutdown. The watcher is created before the initial build
//! starts so no change made during it is lost.

mod runtime;

use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::builder::BuilderActor;
use super::fs::FsActor;
use super::live::LiveSite;
use super::messages::{BuildMsg, WsMsg};
use super::ws::WsActor;
use crate::config::ProjectConfig;
use crate::core::BuildMode;
use crate::pipeline::Generation;

const CHANNEL_BUFFER: usize = 32;

/// Coordinator - wires up and runs the actor system.
pub struct Coordinator {
    config: Arc<ProjectConfig>,
    mode: BuildMode,
    site: Arc<LiveSite>,
    watch: bool,
    live_reload: bool,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    pub fn new(config: Arc<ProjectConfig>, mode: BuildMode, site: Arc<LiveSite>) -> Self {
        let watch = config.serve.watch;
        Self {
            live_reload: watch && mode.policy().live_reload,
            config,
            mode,
            site,
            watch,
            shutdown_rx: None,
        }
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run the actor system.
    pub async fn run(mut self) -> Result<()> {
        let (build_tx, build_rx) = mpsc::channel::<BuildMsg>(CHANNEL_BUFFER);
        let generation = Generation::new();

        let (ws_tx, ws_actor) = if self.live_reload {
            let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);
            let serve = &self.config.serve;
            match crate::reload::server::start_ws_server_with_channel(
                serve.interface,
                serve.ws_port,
                ws_tx.clone(),
            ) {
                Ok(port) => {
                    self.site.set_ws_port(port);
                    crate::debug!("actor"; "live updates on port {}", port);
                    (Some(ws_tx), Some(WsActor::new(ws_rx)))
                }
                Err(e) => {
                    crate::log!("actor"; "websocket server failed: {}", e);
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        let fs_actor = if self.watch {
            let actor = FsActor::new(&self.config, build_tx.clone(), generation.clone())
                .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;
            Some(actor)
        } else {
            None
        };

        let builder = BuilderActor::new(
            build_rx,
            ws_tx.clone(),
            Arc::clone(&self.config),
            self.mode,
            Arc::clone(&self.site),
            generation,
        );

        crate::debug!("actor"; "start");
        runtime::run_actors(
            runtime::Actors {
                builder,
                fs: fs_actor,
                ws: ws_actor,
            },
            build_tx,
            ws_tx,
            self.shutdown_rx.take(),
        )
        .await;

        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
