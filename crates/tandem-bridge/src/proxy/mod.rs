//! Interface proxies backed by foreign objects
//!
//! An `InterfaceProxy` stands in for one foreign object. Every call goes
//! through the proxy's dispatch table:
//!
//! 1. identity methods (`equals`, `hashCode`, `toString`) are answered locally,
//!    whether or not the handle is still valid
//! 2. calls not declared by the interface fail with `UndeclaredMethod`
//! 3. declared methods the foreign side does not implement fail with
//!    `UnimplementedMethod`
//! 4. everything else leases the native handle (failing with `InvalidHandle`
//!    once invalidated) and is forwarded to the boundary
//!
//! Dropping the last clone of a proxy that was never released releases its
//! token through the boundary.

pub mod dispatch;
pub mod handle;
pub mod interface;
pub mod registry;

pub use dispatch::{DispatchTable, IdentityOp, Route};
pub use handle::{HandleLease, NativeHandle};
pub use interface::InterfaceDecl;
pub use registry::{ProxyRegistry, Released};

use crate::error::{BridgeError, BridgeResult};
use crate::ffi::boundary::{CallResult, ForeignError, NativeBoundary};
use crate::ffi::NativeRef;
use crate::trace::{self, ExceptionTranslator};
use crate::value::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

struct ProxyInner {
    interface: String,
    handle: NativeHandle,
    implemented: BTreeSet<String>,
    table: DispatchTable,
    boundary: Arc<dyn NativeBoundary>,
    translator: Arc<ExceptionTranslator>,
    identity: u64,
    /// Set once the boundary has been told to release the token
    released: AtomicBool,
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        self.handle.invalidate();
        if !self.released.swap(true, Ordering::AcqRel) {
            debug!(
                interface = %self.interface,
                token = %self.handle.token(),
                "releasing unreachable interface proxy"
            );
            self.boundary.release(self.handle.token());
        }
    }
}

/// A host-side implementation of an interface whose methods run remotely
///
/// Clones share identity: they are the same proxy. When the last clone is
/// dropped without an explicit release, the boundary is told to release
/// the token.
#[derive(Clone)]
pub struct InterfaceProxy {
    inner: Arc<ProxyInner>,
}

/// Non-owning reference to an [`InterfaceProxy`]
#[derive(Debug, Clone)]
pub struct WeakProxy {
    inner: Weak<ProxyInner>,
    identity: u64,
}

impl WeakProxy {
    /// The proxy, if any clone of it is still alive
    pub fn upgrade(&self) -> Option<InterfaceProxy> {
        self.inner.upgrade().map(|inner| InterfaceProxy { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn identity_hash(&self) -> u64 {
        self.identity
    }
}

impl InterfaceProxy {
    /// Bind `token` to `decl`, resolving the dispatch table once
    pub fn new<I, S>(
        decl: &InterfaceDecl,
        token: NativeRef,
        implemented: I,
        boundary: Arc<dyn NativeBoundary>,
        translator: Arc<ExceptionTranslator>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let implemented: BTreeSet<String> = implemented.into_iter().map(Into::into).collect();
        let table = DispatchTable::build(decl, &implemented);
        let identity = NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed);
        debug!(
            interface = decl.name(),
            %token,
            identity,
            implemented = implemented.len(),
            "created interface proxy"
        );

        Self {
            inner: Arc::new(ProxyInner {
                interface: decl.name().to_string(),
                handle: NativeHandle::new(token),
                implemented,
                table,
                boundary,
                translator,
                identity,
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Call `method` with `args`
    ///
    /// Blocks until the foreign side answers. Foreign failures come back as
    /// `BridgeError::Foreign` with a merged trace.
    #[track_caller]
    pub fn invoke(&self, method: &str, args: &[Value]) -> BridgeResult<Value> {
        let _frame = trace::enter(&self.inner.interface, method);

        let route = self
            .inner
            .table
            .resolve(method, args.len())
            .ok_or_else(|| BridgeError::UndeclaredMethod {
                interface: self.inner.interface.clone(),
                method: method.to_string(),
                arity: args.len(),
            })?;

        let candidates = match route {
            Route::Identity(op) => return Ok(self.answer_identity(*op, args)),
            Route::Unimplemented => {
                return Err(BridgeError::UnimplementedMethod {
                    interface: self.inner.interface.clone(),
                    method: method.to_string(),
                })
            }
            Route::Forward(candidates) => candidates,
        };
        let descriptor = dispatch::select_overload(candidates, args)?;

        let lease = self
            .inner
            .handle
            .try_use()
            .ok_or_else(|| BridgeError::InvalidHandle {
                interface: self.inner.interface.clone(),
                method: method.to_string(),
            })?;

        tracing::trace!(
            token = %lease.token(),
            method = %descriptor.signature(),
            "forwarding call"
        );
        match self.inner.boundary.call(lease.token(), descriptor, args)? {
            CallResult::Returned(value) => Ok(value),
            CallResult::Threw(error) => Err(self.translate_failure(method, &error)),
        }
    }

    // Not #[track_caller]: the first merged frame must be this call site.
    fn translate_failure(&self, method: &str, error: &ForeignError) -> BridgeError {
        let translator = &self.inner.translator;
        BridgeError::Foreign(translator.translate_error_in(&self.inner.interface, method, error))
    }

    fn answer_identity(&self, op: IdentityOp, args: &[Value]) -> Value {
        match op {
            IdentityOp::Equals => Value::Bool(matches!(
                args.first(),
                Some(Value::Proxy(other)) if self.same_instance(other)
            )),
            IdentityOp::HashCode => Value::Number(self.identity_hash() as f64),
            IdentityOp::ToString => Value::String(self.to_string()),
        }
    }

    /// Mark the handle invalid; idempotent
    ///
    /// Calls already forwarded run to completion. Does not notify the
    /// foreign side.
    pub fn invalidate(&self) {
        if self.inner.handle.invalidate() {
            debug!(
                interface = %self.inner.interface,
                token = %self.inner.handle.token(),
                "invalidated interface proxy"
            );
        }
    }

    pub fn is_valid(&self) -> bool {
        self.inner.handle.is_valid()
    }

    pub fn token(&self) -> NativeRef {
        self.inner.handle.token()
    }

    pub fn interface(&self) -> &str {
        &self.inner.interface
    }

    pub fn implemented_methods(&self) -> &BTreeSet<String> {
        &self.inner.implemented
    }

    /// Invalidate and claim the one boundary release for this token
    ///
    /// Returns `false` if the token was already released.
    pub(crate) fn mark_released(&self) -> bool {
        self.invalidate();
        !self.inner.released.swap(true, Ordering::AcqRel)
    }

    pub fn downgrade(&self) -> WeakProxy {
        WeakProxy {
            inner: Arc::downgrade(&self.inner),
            identity: self.inner.identity,
        }
    }

    /// Whether `other` is this very proxy (or a clone of it)
    pub fn same_instance(&self, other: &InterfaceProxy) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Identity hash, unique per proxy and unrelated to the native token
    pub fn identity_hash(&self) -> u64 {
        self.inner.identity
    }

    /// Calls currently forwarded through this proxy
    pub fn in_flight(&self) -> usize {
        self.inner.handle.in_flight()
    }
}

impl PartialEq for InterfaceProxy {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl Eq for InterfaceProxy {}

impl Hash for InterfaceProxy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.identity.hash(state);
    }
}

impl fmt::Display for InterfaceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods: Vec<&str> = self.inner.implemented.iter().map(String::as_str).collect();
        write!(
            f,
            "{}Proxy{{implementedMethods=[{}], ptr={}}}",
            self.inner.interface,
            methods.join(", "),
            self.inner.handle.token()
        )
    }
}

impl fmt::Debug for InterfaceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceProxy")
            .field("interface", &self.inner.interface)
            .field("token", &self.inner.handle.token())
            .field("identity", &self.inner.identity)
            .field("valid", &self.inner.handle.is_valid())
            .finish()
    }
}
