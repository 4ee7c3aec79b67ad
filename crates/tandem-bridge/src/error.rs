//! Bridge error type

use crate::ffi::loader::LoadError;
use crate::ffi::marshal::MarshalError;
use crate::ffi::NativeRef;
use crate::stdio::StreamTag;
use crate::trace::TranslatedException;
use thiserror::Error;

/// Errors surfaced to callers of the bridge
///
/// None of these are retried internally; they propagate straight to whoever
/// invoked the proxy method or session operation.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The handle behind the proxy was invalidated; recreate the proxy
    #[error("The proxy for '{interface}' isn't valid anymore (calling '{method}')")]
    InvalidHandle { interface: String, method: String },

    /// The interface declares the method but the foreign side never implemented it
    #[error("The method '{method}' of '{interface}' was not implemented by the foreign runtime")]
    UnimplementedMethod { interface: String, method: String },

    /// No declared method matches the name and argument count
    #[error("'{interface}' declares no method '{method}' taking {arity} argument(s)")]
    UndeclaredMethod {
        interface: String,
        method: String,
        arity: usize,
    },

    /// An argument does not fit the declared parameter type
    #[error("Argument {index} of '{method}': expected {expected}, got {got}")]
    ArgumentType {
        method: String,
        index: usize,
        expected: &'static str,
        got: &'static str,
    },

    /// A forwarded call failed on the foreign side (already translated)
    #[error(transparent)]
    Foreign(#[from] TranslatedException),

    /// The boundary itself failed before the foreign side could answer
    #[error("Native boundary failure: {0}")]
    Boundary(String),

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] tandem_config::ConfigError),

    /// Another redirector already owns the stream
    #[error("{0} is already redirected")]
    StreamBusy(StreamTag),

    #[error("Proxy {0} is already released")]
    AlreadyReleased(NativeRef),

    #[error("No proxy with the token {0} exists")]
    UnknownProxy(NativeRef),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
