//! Bridge session API
//!
//! Provides `BridgeSession`, which owns the native boundary, the exception
//! translator and the registry of proxies handed out to host code.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use tandem_bridge::ffi::{CallbackTable, ParamType};
//! use tandem_bridge::proxy::InterfaceDecl;
//! use tandem_bridge::{BridgeSession, Value};
//!
//! let table = Arc::new(CallbackTable::new());
//! let session = BridgeSession::new(table.clone());
//!
//! let decl = InterfaceDecl::new("Counter").method("next", &[], ParamType::Number);
//! let counter = session.create_proxy(&decl, ["next"]);
//! table.register(counter.token(), "next", |_| Ok(Value::from(1)));
//!
//! assert_eq!(counter.invoke("next", &[]).unwrap(), Value::from(1));
//! ```

use crate::error::{BridgeError, BridgeResult};
use crate::ffi::boundary::{LineSink, NativeBoundary};
use crate::ffi::library::LibraryBoundary;
use crate::ffi::loader::LibraryLoader;
use crate::ffi::NativeRef;
use crate::proxy::{InterfaceDecl, InterfaceProxy, ProxyRegistry, Released};
use crate::stdio::StreamRedirector;
use crate::trace::ExceptionTranslator;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tandem_config::{Config, ConfigError};
use tracing::debug;

/// One connection between host code and a foreign runtime
pub struct BridgeSession {
    /// Where forwarded calls go
    boundary: Arc<dyn NativeBoundary>,
    /// Where redirected output lines go, if anywhere
    sink: Option<Arc<dyn LineSink>>,
    translator: Arc<ExceptionTranslator>,
    registry: Mutex<ProxyRegistry>,
    /// Released proxies stay callable from the foreign side
    keep_as_daemon: bool,
    next_token: AtomicU64,
}

impl BridgeSession {
    /// Create a session over `boundary` with default settings
    pub fn new(boundary: Arc<dyn NativeBoundary>) -> Self {
        Self {
            boundary,
            sink: None,
            translator: Arc::new(ExceptionTranslator::default()),
            registry: Mutex::new(ProxyRegistry::new()),
            keep_as_daemon: false,
            next_token: AtomicU64::new(1),
        }
    }

    /// Load the configured boundary library and apply the configured settings
    ///
    /// The library also serves as the session's line sink.
    pub fn from_config(config: &Config) -> BridgeResult<Self> {
        let path = config
            .library_path()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "library.path".to_string(),
                reason: "no boundary library configured".to_string(),
            })?;

        let mut loader = LibraryLoader::with_search_paths(config.search_paths());
        let library = Arc::new(LibraryBoundary::open(&mut loader, path)?);

        Ok(Self::new(library.clone())
            .with_line_sink(library)
            .with_translator(ExceptionTranslator::new(config.foreign_marker()))
            .with_keep_as_daemon(config.keep_as_daemon()))
    }

    pub fn with_line_sink(mut self, sink: Arc<dyn LineSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_translator(mut self, translator: ExceptionTranslator) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    pub fn with_keep_as_daemon(mut self, keep_as_daemon: bool) -> Self {
        self.keep_as_daemon = keep_as_daemon;
        self
    }

    pub fn translator(&self) -> &ExceptionTranslator {
        &self.translator
    }

    pub fn keep_as_daemon(&self) -> bool {
        self.keep_as_daemon
    }

    fn registry(&self) -> MutexGuard<'_, ProxyRegistry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create a proxy under a fresh token
    ///
    /// The boundary learns about the token from `proxy.token()`.
    pub fn create_proxy<I, S>(&self, decl: &InterfaceDecl, implemented: I) -> InterfaceProxy
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let token = NativeRef(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.bind_proxy(decl, token, implemented)
    }

    /// Create a proxy for a token minted by the foreign side
    pub fn bind_proxy<I, S>(
        &self,
        decl: &InterfaceDecl,
        token: NativeRef,
        implemented: I,
    ) -> InterfaceProxy
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let proxy = InterfaceProxy::new(
            decl,
            token,
            implemented,
            Arc::clone(&self.boundary),
            Arc::clone(&self.translator),
        );
        self.registry().insert(&proxy);
        proxy
    }

    /// Release a proxy handed out by this session
    ///
    /// With `keep_as_daemon` set (and `force` unset) the proxy stays valid
    /// in the daemon set; otherwise it is invalidated and the boundary is
    /// told to release the token. Proxies that are simply dropped release
    /// themselves and leave the session.
    pub fn release(&self, proxy: &InterfaceProxy, force: bool) -> BridgeResult<Released> {
        let released = self
            .registry()
            .release(proxy, self.keep_as_daemon, force)
            .ok_or(BridgeError::AlreadyReleased(proxy.token()))?;

        debug!(token = %proxy.token(), ?released, "released proxy");
        if released == Released::Destroyed {
            self.boundary.release(proxy.token());
        }
        Ok(released)
    }

    /// Release the proxy bound to `token`
    pub fn release_token(&self, token: NativeRef, force: bool) -> BridgeResult<Released> {
        let proxy = self.find(token).ok_or(BridgeError::UnknownProxy(token))?;
        self.release(&proxy, force)
    }

    /// Invalidate every daemon proxy; returns how many there were
    pub fn clear_daemon_proxies(&self) -> usize {
        let cleared = self.registry().clear_daemons();
        for proxy in &cleared {
            self.boundary.release(proxy.token());
        }
        debug!(count = cleared.len(), "cleared daemon proxies");
        cleared.len()
    }

    /// Whether any proxy (live or daemon) is still registered
    pub fn has_live_proxies(&self) -> bool {
        !self.registry().is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.registry().live_count()
    }

    pub fn daemon_count(&self) -> usize {
        self.registry().daemon_count()
    }

    /// The registered proxy bound to `token`
    pub fn find(&self, token: NativeRef) -> Option<InterfaceProxy> {
        self.registry().find(token)
    }

    /// Redirect the host's standard streams to the session's line sink
    pub fn redirect_streams(&self, stdout: bool, stderr: bool) -> BridgeResult<StreamRedirector> {
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| BridgeError::Boundary("the session has no line sink".to_string()))?;
        StreamRedirector::new(stdout, stderr, sink)
    }

    /// Redirect the streams selected in `config`
    pub fn redirect_from_config(&self, config: &Config) -> BridgeResult<StreamRedirector> {
        self.redirect_streams(config.redirect_stdout(), config.redirect_stderr())
    }
}
