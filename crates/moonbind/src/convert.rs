//! Traits for moving single values between Rust and the runtime stack.
//!
//! `ToStack` is the argument marshaller: one Rust value becomes exactly one
//! pushed stack value. `FromStack` is the result unmarshaller: the value at
//! a stack index becomes a Rust value, leaving the stack untouched.
//!
//! Both traits are open: implement them for your own types to pass them to
//! or receive them from script functions.
//!
//! # Example
//!
//! ```ignore
//! use moonbind::{ConversionError, FromStack, LuaStack, ToStack};
//!
//! struct Meters(f64);
//!
//! impl ToStack for Meters {
//!     fn push_to<S: LuaStack + ?Sized>(self, stack: &S) {
//!         stack.push_number(self.0);
//!     }
//! }
//!
//! impl FromStack for Meters {
//!     fn from_stack<S: LuaStack + ?Sized>(stack: &S, index: i32) -> Result<Self, ConversionError> {
//!         f64::from_stack(stack, index).map(Meters)
//!     }
//! }
//! ```

use crate::error::ConversionError;
use crate::stack::{LuaStack, ValueKind};

/// Push a Rust value onto the stack.
pub trait ToStack {
    /// Push exactly one value.
    fn push_to<S: LuaStack + ?Sized>(self, stack: &S);
}

/// Read a Rust value from a stack slot.
pub trait FromStack: Sized {
    /// Convert the value at `index` without removing it.
    fn from_stack<S: LuaStack + ?Sized>(stack: &S, index: i32) -> Result<Self, ConversionError>;
}

/// The nil value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Nil;

fn mismatch<S: LuaStack + ?Sized>(stack: &S, index: i32, expected: &'static str) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        found: stack.type_of(index),
    }
}

// ============================================================================
// Primitive Type Implementations
// ============================================================================

impl ToStack for bool {
    fn push_to<S: LuaStack + ?Sized>(self, stack: &S) {
        stack.push_boolean(self);
    }
}

impl FromStack for bool {
    fn from_stack<S: LuaStack + ?Sized>(stack: &S, index: i32) -> Result<Self, ConversionError> {
        Ok(stack.to_boolean(index))
    }
}

macro_rules! impl_to_stack_integer {
    ($($ty:ty),*) => {$(
        impl ToStack for $ty {
            fn push_to<S: LuaStack + ?Sized>(self, stack: &S) {
                stack.push_integer(i64::from(self));
            }
        }
    )*};
}

macro_rules! impl_from_stack_integer {
    ($($ty:ty),*) => {$(
        impl FromStack for $ty {
            fn from_stack<S: LuaStack + ?Sized>(stack: &S, index: i32) -> Result<Self, ConversionError> {
                let value = stack
                    .to_integer(index)
                    .ok_or_else(|| mismatch(stack, index, stringify!($ty)))?;
                <$ty>::try_from(value).map_err(|_| ConversionError::OutOfRange {
                    target: stringify!($ty),
                    value,
                })
            }
        }
    )*};
}

impl_to_stack_integer!(i8, i16, i32, i64, u8, u16, u32);
impl_from_stack_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl ToStack for f32 {
    fn push_to<S: LuaStack + ?Sized>(self, stack: &S) {
        stack.push_number(f64::from(self));
    }
}

impl FromStack for f32 {
    fn from_stack<S: LuaStack + ?Sized>(stack: &S, index: i32) -> Result<Self, ConversionError> {
        stack
            .to_number(index)
            .map(|n| n as f32)
            .ok_or_else(|| mismatch(stack, index, "f32"))
    }
}

impl ToStack for f64 {
    fn push_to<S: LuaStack + ?Sized>(self, stack: &S) {
        stack.push_number(self);
    }
}

impl FromStack for f64 {
    fn from_stack<S: LuaStack + ?Sized>(stack: &S, index: i32) -> Result<Self, ConversionError> {
        stack
            .to_number(index)
            .ok_or_else(|| mismatch(stack, index, "f64"))
    }
}

// ============================================================================
// Strings
// ============================================================================

impl ToStack for &str {
    fn push_to<S: LuaStack + ?Sized>(self, stack: &S) {
        stack.push_string(self.as_bytes());
    }
}

impl ToStack for String {
    fn push_to<S: LuaStack + ?Sized>(self, stack: &S) {
        stack.push_string(self.as_bytes());
    }
}

impl ToStack for &String {
    fn push_to<S: LuaStack + ?Sized>(self, stack: &S) {
        stack.push_string(self.as_bytes());
    }
}

impl FromStack for String {
    fn from_stack<S: LuaStack + ?Sized>(stack: &S, index: i32) -> Result<Self, ConversionError> {
        let bytes = stack
            .to_bytes(index)
            .ok_or_else(|| mismatch(stack, index, "String"))?;
        String::from_utf8(bytes).map_err(|_| ConversionError::InvalidUtf8)
    }
}

impl ToStack for &[u8] {
    fn push_to<S: LuaStack + ?Sized>(self, stack: &S) {
        stack.push_string(self);
    }
}

impl ToStack for Vec<u8> {
    fn push_to<S: LuaStack + ?Sized>(self, stack: &S) {
        stack.push_string(&self);
    }
}

impl FromStack for Vec<u8> {
    fn from_stack<S: LuaStack + ?Sized>(stack: &S, index: i32) -> Result<Self, ConversionError> {
        stack
            .to_bytes(index)
            .ok_or_else(|| mismatch(stack, index, "Vec<u8>"))
    }
}

// ============================================================================
// Nil and Optional Values
// ============================================================================

impl ToStack for Nil {
    fn push_to<S: LuaStack + ?Sized>(self, stack: &S) {
        stack.push_nil();
    }
}

impl FromStack for Nil {
    fn from_stack<S: LuaStack + ?Sized>(stack: &S, index: i32) -> Result<Self, ConversionError> {
        if stack.type_of(index).is_none_or_nil() {
            Ok(Nil)
        } else {
            Err(mismatch(stack, index, "Nil"))
        }
    }
}

impl<T: ToStack> ToStack for Option<T> {
    fn push_to<S: LuaStack + ?Sized>(self, stack: &S) {
        match self {
            Some(value) => value.push_to(stack),
            None => stack.push_nil(),
        }
    }
}

impl<T: FromStack> FromStack for Option<T> {
    fn from_stack<S: LuaStack + ?Sized>(stack: &S, index: i32) -> Result<Self, ConversionError> {
        if stack.type_of(index).is_none_or_nil() {
            Ok(None)
        } else {
            T::from_stack(stack, index).map(Some)
        }
    }
}

// Reports the type only; useful when a caller just wants to know what came back.
impl FromStack for ValueKind {
    fn from_stack<S: LuaStack + ?Sized>(stack: &S, index: i32) -> Result<Self, ConversionError> {
        Ok(stack.type_of(index))
    }
}
