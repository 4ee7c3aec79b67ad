//! Dispatch table resolved once per proxy.
//!
//! Maps (method name, arity) → what the proxy does with the call:
//! answer it locally, reject it, or forward it across the boundary.

use crate::error::BridgeError;
use crate::ffi::types::MethodDescriptor;
use crate::proxy::interface::InterfaceDecl;
use crate::value::Value;
use std::collections::{BTreeSet, HashMap};

/// Methods answered by the proxy itself, never forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityOp {
    Equals,
    HashCode,
    ToString,
}

impl IdentityOp {
    const ALL: [IdentityOp; 3] = [IdentityOp::Equals, IdentityOp::HashCode, IdentityOp::ToString];

    pub fn name(self) -> &'static str {
        match self {
            IdentityOp::Equals => "equals",
            IdentityOp::HashCode => "hashCode",
            IdentityOp::ToString => "toString",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            IdentityOp::Equals => 1,
            IdentityOp::HashCode | IdentityOp::ToString => 0,
        }
    }
}

/// What a (name, arity) pair resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Identity(IdentityOp),
    /// Declared and implemented; candidates in declaration order
    Forward(Vec<MethodDescriptor>),
    /// Declared on the host side, absent from the foreign implementation
    Unimplemented,
}

/// Routes keyed by method name, then arity
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    routes: HashMap<String, HashMap<usize, Route>>,
}

impl DispatchTable {
    /// Resolve every declared method against the implemented set
    ///
    /// Identity methods take precedence over declared methods of the same
    /// name and arity.
    pub fn build(decl: &InterfaceDecl, implemented: &BTreeSet<String>) -> Self {
        let mut routes: HashMap<String, HashMap<usize, Route>> = HashMap::new();

        for method in decl.methods() {
            let by_arity = routes.entry(method.name().to_string()).or_default();
            if !implemented.contains(method.name()) {
                by_arity.insert(method.arity(), Route::Unimplemented);
                continue;
            }
            match by_arity
                .entry(method.arity())
                .or_insert_with(|| Route::Forward(Vec::new()))
            {
                Route::Forward(candidates) => candidates.push(method.clone()),
                Route::Identity(_) | Route::Unimplemented => {}
            }
        }

        for op in IdentityOp::ALL {
            routes
                .entry(op.name().to_string())
                .or_default()
                .insert(op.arity(), Route::Identity(op));
        }

        Self { routes }
    }

    pub fn resolve(&self, name: &str, arity: usize) -> Option<&Route> {
        self.routes.get(name)?.get(&arity)
    }

    /// Number of (name, arity) routes
    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pick the first overload whose parameter types accept `args`
///
/// When none does, the error reports the first candidate's mismatch.
pub fn select_overload<'a>(
    candidates: &'a [MethodDescriptor],
    args: &[Value],
) -> Result<&'a MethodDescriptor, BridgeError> {
    let mut first_error = None;
    for candidate in candidates {
        match candidate.first_mismatch(args) {
            None => return Ok(candidate),
            Some((index, expected)) => {
                first_error.get_or_insert_with(|| BridgeError::ArgumentType {
                    method: candidate.signature(),
                    index,
                    expected: expected.display_name(),
                    got: args[index].type_name(),
                });
            }
        }
    }
    Err(first_error.unwrap_or_else(|| {
        BridgeError::Boundary("no overload candidates for a forwarded method".to_string())
    }))
}
