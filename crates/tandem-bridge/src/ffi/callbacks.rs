//! In-process boundary built from host closures
//!
//! Lets an embedder (or a test) stand in for the foreign runtime: each
//! foreign object is a token with a set of method callbacks keyed by name.

use crate::error::BridgeError;
use crate::ffi::boundary::{CallResult, ForeignError, NativeBoundary};
use crate::ffi::types::MethodDescriptor;
use crate::ffi::NativeRef;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::trace;

/// A foreign method implementation
pub type Callback = Arc<dyn Fn(&[Value]) -> Result<Value, ForeignError> + Send + Sync>;

/// Boundary whose foreign objects are tables of closures
#[derive(Default)]
pub struct CallbackTable {
    objects: RwLock<HashMap<NativeRef, HashMap<String, Callback>>>,
}

impl CallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` as `method` of the object behind `target`
    ///
    /// Overloads share one callback per name; it receives the arguments as passed.
    pub fn register<F>(&self, target: NativeRef, method: &str, callback: F)
    where
        F: Fn(&[Value]) -> Result<Value, ForeignError> + Send + Sync + 'static,
    {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects
            .entry(target)
            .or_default()
            .insert(method.to_string(), Arc::new(callback));
    }

    /// Check whether the object behind `target` is still registered
    pub fn contains(&self, target: NativeRef) -> bool {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&target)
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, target: NativeRef, method: &str) -> Result<Callback, BridgeError> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        let methods = objects
            .get(&target)
            .ok_or_else(|| BridgeError::Boundary(format!("no foreign object {}", target)))?;
        methods.get(method).cloned().ok_or_else(|| {
            BridgeError::Boundary(format!("foreign object {} has no method '{}'", target, method))
        })
    }
}

impl NativeBoundary for CallbackTable {
    fn call(
        &self,
        target: NativeRef,
        method: &MethodDescriptor,
        args: &[Value],
    ) -> Result<CallResult, BridgeError> {
        // Clone the callback out so no lock is held while it runs
        let callback = self.lookup(target, method.name())?;
        trace!(%target, method = %method.signature(), "invoking callback");
        Ok(match callback(args) {
            Ok(value) => CallResult::Returned(value),
            Err(error) => CallResult::Threw(error),
        })
    }

    fn release(&self, target: NativeRef) {
        self.objects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&target);
    }
}
