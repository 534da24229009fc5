//! Builder Actor - runs the pipeline for the dev loop
//!
//! Owns the initial build and every rebuild. Builds run on the blocking
//! pool; a change arriving mid-build has already bumped the generation, so
//! the running build stops at its next checkpoint and the next one starts
//! as soon as it returns. Only a fully successful build is published.

use std::future::pending;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use super::live::LiveSite;
use super::messages::{BuildMsg, WsMsg};
use crate::config::ProjectConfig;
use crate::core::{BuildMode, ServeState};
use crate::logger::{status_error, status_success, status_unchanged, status_warning};
use crate::pipeline::{self, BuildError, BuildOptions, BuildResult, Generation};
use crate::reload::plan::UpdatePlan;

type BuildTask = JoinHandle<Result<BuildResult, BuildError>>;

pub struct BuilderActor {
    rx: mpsc::Receiver<BuildMsg>,
    /// `None` when no live update channel runs
    ws_tx: Option<mpsc::Sender<WsMsg>>,
    config: Arc<ProjectConfig>,
    mode: BuildMode,
    site: Arc<LiveSite>,
    generation: Generation,
    /// Apply style updates in place instead of reloading
    hot: bool,
    /// The last finished build failed
    failed: bool,
}

impl BuilderActor {
    pub fn new(
        rx: mpsc::Receiver<BuildMsg>,
        ws_tx: Option<mpsc::Sender<WsMsg>>,
        config: Arc<ProjectConfig>,
        mode: BuildMode,
        site: Arc<LiveSite>,
        generation: Generation,
    ) -> Self {
        let hot = config.serve.hot;
        Self {
            rx,
            ws_tx,
            config,
            mode,
            site,
            generation,
            hot,
            failed: false,
        }
    }

    /// Initial build, then rebuild on every request until shutdown.
    pub async fn run(mut self) {
        if let Err(e) = self.site.state().transition(ServeState::Building) {
            crate::debug!("build"; "{}", e);
        }
        let mut task = Some(self.spawn_build(false));
        // a rebuild was requested while a build was running
        let mut queued = false;

        loop {
            tokio::select! {
                biased;

                msg = self.rx.recv() => match msg {
                    Some(BuildMsg::Rebuild { changed, config_changed }) => {
                        crate::debug!("build"; "rebuild requested by {} path(s)", changed.len());
                        if config_changed {
                            self.reload_config();
                        }
                        self.enter_rebuilding();
                        if task.is_some() {
                            queued = true;
                        } else {
                            task = Some(self.spawn_build(true));
                        }
                    }
                    Some(BuildMsg::Shutdown) | None => break,
                },

                joined = wait_task(&mut task) => {
                    self.on_build_done(joined).await;
                    if std::mem::take(&mut queued) {
                        task = Some(self.spawn_build(true));
                    }
                }
            }
        }

        let _ = self.site.state().transition(ServeState::Stopped);
        crate::debug!("build"; "shutting down");
    }

    fn spawn_build(&self, quiet: bool) -> BuildTask {
        let config = Arc::clone(&self.config);
        let mode = self.mode;
        let options = BuildOptions {
            cancel: Some(self.generation.token()),
            quiet,
        };
        tokio::task::spawn_blocking(move || pipeline::build_with(&config, mode, &options))
    }

    /// Re-read the config file. On failure the old config stays in effect
    /// for the rebuild.
    fn reload_config(&mut self) {
        match self.config.reload() {
            Ok(config) => {
                if config.serve.port != self.config.serve.port
                    || config.serve.interface != self.config.serve.interface
                {
                    status_warning("serve address changes take effect after a restart");
                }
                self.hot = config.serve.hot;
                self.config = Arc::new(config);
                crate::log!("config"; "reloaded");
            }
            Err(e) => status_error("config error", &format!("{e:#}")),
        }
    }

    /// `Serving → Rebuilding`; a loop that never had a good build stays
    /// in `Building`.
    fn enter_rebuilding(&self) {
        let state = self.site.state();
        if matches!(state.get(), ServeState::Serving | ServeState::Rebuilding) {
            let _ = state.transition(ServeState::Rebuilding);
        }
    }

    fn settle(&self) {
        if let Err(e) = self.site.state().transition(ServeState::Serving) {
            crate::debug!("build"; "{}", e);
        }
    }

    async fn on_build_done(&mut self, joined: Result<Result<BuildResult, BuildError>, JoinError>) {
        match joined {
            Ok(Ok(built)) => self.on_success(built).await,
            Ok(Err(BuildError::Superseded { step })) => {
                crate::debug!("build"; "superseded during {}", step);
            }
            Ok(Err(e)) => self.on_failure(e).await,
            Err(e) => crate::log!("build"; "build task failed: {}", e),
        }
    }

    async fn on_success(&mut self, built: BuildResult) {
        let first = self.site.current().is_none();
        let old = self.site.publish(Arc::clone(&built.artifacts));
        self.settle();

        if std::mem::take(&mut self.failed) {
            self.send(WsMsg::ClearError).await;
        }

        if first {
            crate::log!(
                "build";
                "{} files in {:.2}s",
                built.artifacts.len(),
                built.elapsed.as_secs_f64()
            );
        }

        let plan = match old {
            Some(old) => UpdatePlan::between(&old, &built.artifacts),
            None => UpdatePlan::Reload("first successful build".into()),
        };
        let plan = match plan {
            UpdatePlan::Update(_) if !self.hot => UpdatePlan::Reload("styles changed".into()),
            plan => plan,
        };

        match &plan {
            UpdatePlan::None => status_unchanged("no output changes"),
            UpdatePlan::Update(modules) => {
                status_success(&format!("updated {} module(s) in place", modules.len()));
            }
            UpdatePlan::Reload(reason) if !first => status_success(&format!("rebuilt: {reason}")),
            UpdatePlan::Reload(_) => {}
        }

        if let Some(msg) = plan.message() {
            self.send(msg.into()).await;
        }
    }

    /// The served set stays as it was; clients get an error overlay.
    async fn on_failure(&mut self, error: BuildError) {
        self.failed = true;
        if self.site.current().is_some() {
            self.settle();
        }

        let path = match error.file() {
            Some(file) => self.config.root_relative(file).display().to_string(),
            None => error.step().to_string(),
        };
        let detail = format!("{:#}", anyhow::Error::from(error));
        status_error(&format!("build failed: {path}"), &detail);
        self.send(WsMsg::Error { path, error: detail }).await;
    }

    async fn send(&self, msg: WsMsg) {
        if let Some(tx) = &self.ws_tx
            && tx.send(msg).await.is_err()
        {
            crate::debug!("build"; "ws actor gone");
        }
    }
}

/// Wait for the running build (pends forever if none).
async fn wait_task(
    task: &mut Option<BuildTask>,
) -> Result<Result<BuildResult, BuildError>, JoinError> {
    match task {
        Some(handle) => {
            let joined = handle.await;
            *task = None;
            joined
        }
        None => pending().await,
    }
}
