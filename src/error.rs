use std::any::Any;

use parse_display::Display;

/// An argument was rejected when a wrapper, delay or configuration was constructed.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("invalid argument: {message}")]
pub struct InvalidArgument {
    message: String,
}
impl InvalidArgument {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for InvalidArgument {}

/// A callback panicked while the runtime was running it.
///
/// The wrappers never catch faults of the functions they run.
/// The panic unwinds up to the runtime's timer loop, which reports it with this error.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("deferred execution fault: {message}")]
pub struct DeferredExecutionFault {
    message: String,
}
impl DeferredExecutionFault {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_string()
        };
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for DeferredExecutionFault {}
