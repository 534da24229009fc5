//! Server lifecycle management.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Result, bail};
use crossbeam::channel::Receiver;
use tiny_http::Server;

use crate::actor::{Coordinator, LiveSite};
use crate::config::ProjectConfig;
use crate::core::BuildMode;
use crate::log;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the interface and port, trying the following ports unless
/// `strict` is set.
pub fn bind_with_retry(interface: IpAddr, base_port: u16, strict: bool) -> Result<(Server, SocketAddr)> {
    let attempts = if strict { 1 } else { MAX_PORT_RETRIES };
    let mut last_error = String::new();

    for offset in 0..attempts {
        let port = base_port.saturating_add(offset);
        match Server::http(SocketAddr::new(interface, port)) {
            Ok(server) => {
                let addr = server
                    .server_addr()
                    .to_ip()
                    .unwrap_or_else(|| SocketAddr::new(interface, port));
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, addr.port());
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    if strict {
        bail!("port {} is not available: {}", base_port, last_error);
    }
    bail!(
        "failed to bind after {} attempts (ports {}-{}): {}",
        attempts,
        base_port,
        base_port.saturating_add(attempts - 1),
        last_error
    )
}

/// Spawn the actor system on its own runtime thread.
pub fn spawn_actors(
    config: Arc<ProjectConfig>,
    mode: BuildMode,
    site: Arc<LiveSite>,
    shutdown_rx: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                log!("actor"; "failed to create runtime: {}", e);
                return;
            }
        };

        rt.block_on(async {
            let coordinator =
                Coordinator::new(config, mode, site).with_shutdown_signal(shutdown_rx);
            if let Err(e) = coordinator.run().await {
                log!("actor"; "error: {}", e);
            }
        });
    })
}

/// Wait for actor system to shutdown gracefully (max 2 seconds).
pub fn wait_for_shutdown(handle: JoinHandle<()>) {
    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(std::time::Duration::from_millis(50));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_strict_port_fails_when_taken() {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let (_first, addr) = bind_with_retry(localhost, 0, true).unwrap();
        match bind_with_retry(localhost, addr.port(), true) {
            Ok(_) => panic!("second bind on port {} succeeded", addr.port()),
            Err(err) => assert!(err.to_string().contains("not available")),
        }
    }

    #[test]
    fn test_taken_port_moves_on() {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let (_first, addr) = bind_with_retry(localhost, 0, true).unwrap();
        let (_second, next) = bind_with_retry(localhost, addr.port(), false).unwrap();
        assert_ne!(next.port(), addr.port());
    }
}
