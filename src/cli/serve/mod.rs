//! Development server with live reload support.
//!
//! Requests are answered from the in-memory artifact set the builder last
//! published; until the first build succeeds every request gets a 503.

mod lifecycle;
mod response;
mod route;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel;
use tiny_http::{Request, Server};

use crate::actor::LiveSite;
use crate::config::ProjectConfig;
use crate::core::BuildMode;
use crate::{debug, log};
use response::Delivery;
use route::Route;

/// Worker threads answering HTTP requests.
const REQUEST_THREADS: usize = 4;

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    shutdown_rx: channel::Receiver<()>,
}

/// Bind the HTTP server without starting the request loop.
pub fn bind_server(config: &ProjectConfig) -> Result<BoundServer> {
    let serve = &config.serve;
    let (server, addr) = lifecycle::bind_with_retry(serve.interface, serve.port, serve.strict_port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    crate::core::register_server(Arc::clone(&server), shutdown_tx);

    Ok(BoundServer {
        server,
        addr,
        shutdown_rx,
    })
}

impl BoundServer {
    /// Start the dev loop and the request loop (blocking until shutdown).
    pub fn run(self, config: Arc<ProjectConfig>, mode: BuildMode) -> Result<()> {
        let site = LiveSite::new();
        let actors = lifecycle::spawn_actors(
            Arc::clone(&config),
            mode,
            Arc::clone(&site),
            self.shutdown_rx,
        );

        log!("serve"; "http://{} ({})", self.addr, mode);
        let result = run_request_loop(&self.server, &config, &site);
        lifecycle::wait_for_shutdown(actors);
        result
    }
}

/// `serve` command.
pub fn serve(config: ProjectConfig, mode: BuildMode) -> Result<()> {
    let config = Arc::new(config);
    bind_server(&config)?.run(config, mode)
}

fn run_request_loop(server: &Server, config: &Arc<ProjectConfig>, site: &Arc<LiveSite>) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .thread_name(|i| format!("packwright-http-{i}"))
        .build()?;

    for request in server.incoming_requests() {
        let config = Arc::clone(config);
        let site = Arc::clone(site);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &config, &site) {
                debug!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, config: &ProjectConfig, site: &LiveSite) -> Result<()> {
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }
    if !response::is_read_request(&request) {
        return response::respond_method_not_allowed(request);
    }

    // a whole set per request, never a mix of two builds
    let Some(set) = site.current() else {
        return response::respond_unavailable(request);
    };

    let delivery = Delivery {
        ws_port: site.ws_port(),
        compress: config.serve.compress,
    };
    let url = request.url().to_string();
    match route::route(&set, &url, &config.build.public_path, config.serve.history_fallback) {
        Route::File(artifact) => response::respond_artifact(request, artifact, 200, delivery),
        Route::Fallback(index) => {
            debug!("serve"; "{} -> index.html", url);
            response::respond_artifact(request, index, 200, delivery)
        }
        Route::NotFound => response::respond_not_found(request),
    }
}
