//! Error types for typed calls

use crate::stack::{CallStatus, ValueKind};

/// Result type for a typed call
pub type CallResult<T> = Result<T, CallError>;

/// Failure to turn a stack value into a Rust value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    /// The runtime cannot convert the value to the requested type
    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        /// Rust type name
        expected: &'static str,
        /// Runtime type found on the stack
        found: ValueKind,
    },

    /// Integer does not fit the requested Rust integer type
    #[error("Value {value} out of range for {target}")]
    OutOfRange {
        /// Rust type name
        target: &'static str,
        /// Value read from the stack
        value: i64,
    },

    /// String is not valid UTF-8
    #[error("String is not valid UTF-8")]
    InvalidUtf8,
}

/// Failure of a call through a [`GlobalFunction`](crate::GlobalFunction)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CallError {
    /// The global is unbound or bound to something that cannot be called
    #[error("Global '{name}' is not a function (found {found})")]
    NotAFunction {
        /// Global name
        name: String,
        /// Type actually bound to the name
        found: ValueKind,
    },

    /// The function and its arguments do not fit on the runtime stack
    #[error("Call to '{name}' needs {needed} stack slots, more than the runtime allows")]
    StackOverflow {
        /// Global name
        name: String,
        /// Slots the call needed: the function plus its arguments or results
        needed: usize,
    },

    /// The lookup or the protected call reported an error
    #[error("Call to '{name}' failed ({status}): {message}")]
    Runtime {
        /// Global name
        name: String,
        /// Status returned by the protected call
        status: CallStatus,
        /// Error object left by the runtime, rendered as text
        message: String,
    },

    /// A return value could not be converted to the declared type
    #[error("Return value {position} of '{name}': {source}")]
    Conversion {
        /// Global name
        name: String,
        /// Zero-based position in the declared return list
        position: usize,
        /// Underlying conversion failure
        #[source]
        source: ConversionError,
    },
}

impl CallError {
    /// Name of the global the failed call targeted
    pub fn function_name(&self) -> &str {
        match self {
            CallError::NotAFunction { name, .. }
            | CallError::StackOverflow { name, .. }
            | CallError::Runtime { name, .. }
            | CallError::Conversion { name, .. } => name,
        }
    }
}
