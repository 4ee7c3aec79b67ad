//! Host-side interface declarations

use crate::ffi::types::{MethodDescriptor, ParamType};

/// An interface whose methods are implemented on the foreign side
///
/// # Examples
///
/// ```
/// # use tandem_bridge::proxy::InterfaceDecl;
/// # use tandem_bridge::ffi::ParamType;
/// let greeter = InterfaceDecl::new("Greeter")
///     .method("greet", &[ParamType::String], ParamType::String)
///     .method("greet", &[ParamType::String, ParamType::Number], ParamType::String);
/// assert_eq!(greeter.methods().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDecl {
    name: String,
    methods: Vec<MethodDescriptor>,
}

impl InterfaceDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Declare a method (overloads are declared by repeating the name)
    pub fn method(mut self, name: &str, params: &[ParamType], returns: ParamType) -> Self {
        self.methods
            .push(MethodDescriptor::new(name, params.to_vec(), returns));
        self
    }

    pub fn with_descriptor(mut self, descriptor: MethodDescriptor) -> Self {
        self.methods.push(descriptor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn declares(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name() == name)
    }
}
