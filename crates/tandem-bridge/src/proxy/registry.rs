//! Live and daemon proxy bookkeeping for a session

use crate::ffi::NativeRef;
use crate::proxy::{InterfaceProxy, WeakProxy};
use std::collections::HashMap;

/// Where a released proxy ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Released {
    /// Moved to the daemon set; the handle stays valid
    Daemon,
    /// Removed and invalidated
    Destroyed,
}

/// Proxies keyed by identity
///
/// Live proxies are held weakly, so a proxy the host drops releases itself
/// and its entry is pruned. Daemon proxies were released by the host but
/// are held strongly so the foreign side can keep calling back into them.
#[derive(Debug, Default)]
pub struct ProxyRegistry {
    live: HashMap<u64, WeakProxy>,
    daemons: HashMap<u64, InterfaceProxy>,
}

impl ProxyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, proxy: &InterfaceProxy) {
        self.prune();
        self.live.insert(proxy.identity_hash(), proxy.downgrade());
    }

    /// Forget live entries whose proxy has been dropped
    pub fn prune(&mut self) {
        self.live.retain(|_, weak| weak.is_alive());
    }

    /// Release a proxy
    ///
    /// Returns `None` if the proxy is neither live nor (for a forced
    /// release) a daemon. A `Destroyed` proxy is invalidated and marked as
    /// released; the caller tells the boundary.
    pub fn release(
        &mut self,
        proxy: &InterfaceProxy,
        keep_as_daemon: bool,
        force: bool,
    ) -> Option<Released> {
        let id = proxy.identity_hash();
        if self.live.remove(&id).is_some() {
            if keep_as_daemon && !force {
                self.daemons.insert(id, proxy.clone());
                return Some(Released::Daemon);
            }
            proxy.mark_released();
            return Some(Released::Destroyed);
        }
        if force && self.daemons.remove(&id).is_some() {
            proxy.mark_released();
            return Some(Released::Destroyed);
        }
        None
    }

    /// Invalidate and forget every daemon proxy
    pub fn clear_daemons(&mut self) -> Vec<InterfaceProxy> {
        let cleared: Vec<InterfaceProxy> = self.daemons.drain().map(|(_, p)| p).collect();
        for proxy in &cleared {
            proxy.mark_released();
        }
        cleared
    }

    /// First live or daemon proxy bound to `token`
    pub fn find(&self, token: NativeRef) -> Option<InterfaceProxy> {
        self.live
            .values()
            .filter_map(WeakProxy::upgrade)
            .chain(self.daemons.values().cloned())
            .find(|p| p.token() == token)
    }

    pub fn is_daemon(&self, proxy: &InterfaceProxy) -> bool {
        self.daemons.contains_key(&proxy.identity_hash())
    }

    pub fn live_count(&self) -> usize {
        self.live.values().filter(|weak| weak.is_alive()).count()
    }

    pub fn daemon_count(&self) -> usize {
        self.daemons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0 && self.daemons.is_empty()
    }
}
