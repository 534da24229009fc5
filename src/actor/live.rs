//! The artifact set currently being served.
//!
//! Readers (HTTP handlers) load the current set without locking; the
//! builder swaps in a new set only after a build fully succeeds, so a
//! request never sees a half-built set.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use arc_swap::ArcSwapOption;

use crate::core::StateCell;
use crate::output::ArtifactSet;

#[derive(Debug, Default)]
pub struct LiveSite {
    artifacts: ArcSwapOption<ArtifactSet>,
    state: StateCell,
    ws_port: AtomicU16,
}

impl LiveSite {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current set, `None` until the first build succeeds.
    pub fn current(&self) -> Option<Arc<ArtifactSet>> {
        self.artifacts.load_full()
    }

    /// Publish `set`, returning the one it replaced.
    pub fn publish(&self, set: Arc<ArtifactSet>) -> Option<Arc<ArtifactSet>> {
        self.artifacts.swap(Some(set))
    }

    pub fn state(&self) -> &StateCell {
        &self.state
    }

    /// Port of the live update channel, if one is running.
    pub fn ws_port(&self) -> Option<u16> {
        match self.ws_port.load(Ordering::Relaxed) {
            0 => None,
            port => Some(port),
        }
    }

    pub fn set_ws_port(&self, port: u16) {
        self.ws_port.store(port, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_replaces_whole_set() {
        let site = LiveSite::new();
        assert!(site.current().is_none());

        let first = Arc::new(ArtifactSet::new());
        assert!(site.publish(Arc::clone(&first)).is_none());

        let second = Arc::new(ArtifactSet::new());
        let old = site.publish(Arc::clone(&second)).unwrap();
        assert!(Arc::ptr_eq(&old, &first));
        assert!(Arc::ptr_eq(&site.current().unwrap(), &second));
    }

    #[test]
    fn test_ws_port_unset_by_default() {
        let site = LiveSite::new();
        assert_eq!(site.ws_port(), None);
        site.set_ws_port(35729);
        assert_eq!(site.ws_port(), Some(35729));
    }
}
