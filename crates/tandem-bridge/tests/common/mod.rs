//! Shared test utilities for bridge integration tests
#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};
use tandem_bridge::ffi::{MethodDescriptor, ParamType};
use tandem_bridge::proxy::InterfaceDecl;
use tandem_bridge::{
    BridgeError, CallResult, ExceptionTranslator, ForeignError, InterfaceProxy, LineSink,
    NativeBoundary, NativeRef, StreamTag, Value,
};

// Re-export testing utilities
pub use pretty_assertions::{assert_eq, assert_ne};

/// One call that reached the boundary
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub target: NativeRef,
    pub signature: String,
    pub args: Vec<Value>,
}

/// Boundary that records every call and answers with a fixed result
pub struct RecordingBoundary {
    calls: Mutex<Vec<RecordedCall>>,
    answer: Mutex<CallResult>,
    released: Mutex<Vec<NativeRef>>,
}

impl RecordingBoundary {
    pub fn returning(value: Value) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            answer: Mutex::new(CallResult::Returned(value)),
            released: Mutex::new(Vec::new()),
        })
    }

    pub fn throwing(error: ForeignError) -> Arc<Self> {
        let boundary = Self::returning(Value::Null);
        *boundary.answer.lock().unwrap() = CallResult::Threw(error);
        boundary
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn released(&self) -> Vec<NativeRef> {
        self.released.lock().unwrap().clone()
    }
}

impl NativeBoundary for RecordingBoundary {
    fn call(
        &self,
        target: NativeRef,
        method: &MethodDescriptor,
        args: &[Value],
    ) -> Result<CallResult, BridgeError> {
        self.calls.lock().unwrap().push(RecordedCall {
            target,
            signature: method.signature(),
            args: args.to_vec(),
        });
        Ok(self.answer.lock().unwrap().clone())
    }

    fn release(&self, target: NativeRef) {
        self.released.lock().unwrap().push(target);
    }
}

/// Line sink that keeps every line it receives
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(String, StreamTag)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<(String, StreamTag)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn lines_for(&self, tag: StreamTag) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(_, t)| *t == tag)
            .map(|(line, _)| line)
            .collect()
    }
}

impl LineSink for RecordingSink {
    fn write_line(&self, line: &str, stream: StreamTag) -> io::Result<()> {
        self.lines.lock().unwrap().push((line.to_string(), stream));
        Ok(())
    }
}

/// `Greeter` with an overloaded `greet`, plus `wave` and `farewell`
pub fn greeter_decl() -> InterfaceDecl {
    InterfaceDecl::new("Greeter")
        .method("greet", &[ParamType::String], ParamType::String)
        .method("greet", &[ParamType::String, ParamType::Number], ParamType::String)
        .method("wave", &[], ParamType::Void)
        .method("farewell", &[ParamType::String], ParamType::String)
}

/// A `Greeter` proxy whose foreign side implements `greet` and `wave`
pub fn greeter(boundary: Arc<dyn NativeBoundary>, token: u64) -> InterfaceProxy {
    InterfaceProxy::new(
        &greeter_decl(),
        NativeRef(token),
        ["greet", "wave"],
        boundary,
        Arc::new(ExceptionTranslator::default()),
    )
}
