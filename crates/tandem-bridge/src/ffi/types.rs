//! Bridge type system - declared parameter types and method descriptors
//!
//! Defines:
//! - `ParamType`: the declared type of a parameter or return value
//! - `MethodDescriptor`: name + parameter types, the overload identity sent across the boundary
//!
//! Type mapping:
//! - ParamType::Bool → Value::Bool
//! - ParamType::Number → Value::Number
//! - ParamType::String → Value::String (or null)
//! - ParamType::Array → Value::Array (or null)
//! - ParamType::Object → Value::Object (or null)
//! - ParamType::Proxy → Value::Proxy (or null)
//! - ParamType::Any → any value
//! - ParamType::Void → return-only, no value

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a method parameter or return value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Any,
    Bool,
    Number,
    String,
    Array,
    Object,
    Proxy,
    Void,
}

impl ParamType {
    /// Check if a value can be passed where this type is declared
    ///
    /// Reference-like types accept null; bool and number do not.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tandem_bridge::ffi::ParamType;
    /// # use tandem_bridge::Value;
    /// assert!(ParamType::Number.accepts(&Value::Number(1.0)));
    /// assert!(ParamType::String.accepts(&Value::Null));
    /// assert!(!ParamType::Number.accepts(&Value::Null));
    /// ```
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ParamType::Any, _)
                | (ParamType::Bool, Value::Bool(_))
                | (ParamType::Number, Value::Number(_))
                | (ParamType::String, Value::String(_) | Value::Null)
                | (ParamType::Array, Value::Array(_) | Value::Null)
                | (ParamType::Object, Value::Object(_) | Value::Null)
                | (ParamType::Proxy, Value::Proxy(_) | Value::Null)
        )
    }

    /// Get a display name for this type
    pub fn display_name(&self) -> &'static str {
        match self {
            ParamType::Any => "any",
            ParamType::Bool => "bool",
            ParamType::Number => "number",
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Proxy => "proxy",
            ParamType::Void => "void",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A declared interface method
///
/// The signature (`name(type,...)`) is what identifies the overload on the
/// foreign side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    name: String,
    params: Vec<ParamType>,
    returns: ParamType,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, params: Vec<ParamType>, returns: ParamType) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    pub fn returns(&self) -> ParamType {
        self.returns
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Overload signature, e.g. `greet(string,number)`
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(|p| p.display_name()).collect();
        format!("{}({})", self.name, params.join(","))
    }

    /// Index and expected type of the first argument this descriptor rejects
    pub fn first_mismatch(&self, args: &[Value]) -> Option<(usize, ParamType)> {
        self.params
            .iter()
            .zip(args)
            .position(|(param, arg)| !param.accepts(arg))
            .map(|i| (i, self.params[i]))
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.signature(), self.returns)
    }
}
