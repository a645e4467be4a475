//! Argument lists and declared return lists.
//!
//! A call takes any `PushArgs` value: `()` for no arguments, a single
//! `ToStack` value, a tuple of up to twelve of them, or a runtime-sized
//! [`Variadic`]. Values are pushed left to right.
//!
//! The declared return list is any `ReturnValues` type: `()` for no result,
//! a single `FromStack` type for a bare value, a tuple for several values,
//! or `Variadic<T>` for however many the callee returns.

use std::ops::{Deref, DerefMut};

use crate::convert::{FromStack, ToStack};
use crate::error::ConversionError;
use crate::stack::{LuaStack, MULTRET};

/// Ordered list of call arguments.
pub trait PushArgs {
    /// Number of values `push_args` will push.
    fn count(&self) -> usize;

    /// Push every argument, first argument first.
    fn push_args<S: LuaStack + ?Sized>(self, stack: &S);
}

/// Declared list of return values.
pub trait ReturnValues: Sized {
    /// Number of results requested from the call ([`MULTRET`] for all).
    const COUNT: i32;

    /// Read the results occupying `base..=top` without popping them.
    fn collect<S: LuaStack + ?Sized>(stack: &S, base: i32) -> Result<Self, ReturnValueError>;
}

/// Conversion failure of one value in a return list
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnValueError {
    /// Zero-based position in the return list
    pub position: usize,
    /// Underlying conversion failure
    pub source: ConversionError,
}

fn read<T: FromStack, S: LuaStack + ?Sized>(
    stack: &S,
    base: i32,
    position: usize,
) -> Result<T, ReturnValueError> {
    T::from_stack(stack, base + position as i32).map_err(|source| ReturnValueError { position, source })
}

// ============================================================================
// No Arguments / No Result
// ============================================================================

impl PushArgs for () {
    fn count(&self) -> usize {
        0
    }

    fn push_args<S: LuaStack + ?Sized>(self, _stack: &S) {}
}

impl ReturnValues for () {
    const COUNT: i32 = 0;

    fn collect<S: LuaStack + ?Sized>(_stack: &S, _base: i32) -> Result<Self, ReturnValueError> {
        Ok(())
    }
}

// ============================================================================
// Single Values
// ============================================================================

impl<T: ToStack> PushArgs for T {
    fn count(&self) -> usize {
        1
    }

    fn push_args<S: LuaStack + ?Sized>(self, stack: &S) {
        self.push_to(stack);
    }
}

impl<T: FromStack> ReturnValues for T {
    const COUNT: i32 = 1;

    fn collect<S: LuaStack + ?Sized>(stack: &S, base: i32) -> Result<Self, ReturnValueError> {
        read(stack, base, 0)
    }
}

// ============================================================================
// Tuples
// ============================================================================

macro_rules! impl_tuple {
    ($count:expr; $($name:ident),+) => {
        impl<$($name: ToStack),+> PushArgs for ($($name,)+) {
            fn count(&self) -> usize {
                $count
            }

            #[allow(non_snake_case)]
            fn push_args<S: LuaStack + ?Sized>(self, stack: &S) {
                let ($($name,)+) = self;
                $($name.push_to(stack);)+
            }
        }

        impl<$($name: FromStack),+> ReturnValues for ($($name,)+) {
            const COUNT: i32 = $count;

            #[allow(unused_assignments)]
            fn collect<S: LuaStack + ?Sized>(stack: &S, base: i32) -> Result<Self, ReturnValueError> {
                let mut position = 0;
                Ok(($({
                    let value: $name = read(stack, base, position)?;
                    position += 1;
                    value
                },)+))
            }
        }
    };
}

impl_tuple!(1; A);
impl_tuple!(2; A, B);
impl_tuple!(3; A, B, C);
impl_tuple!(4; A, B, C, D);
impl_tuple!(5; A, B, C, D, E);
impl_tuple!(6; A, B, C, D, E, F);
impl_tuple!(7; A, B, C, D, E, F, G);
impl_tuple!(8; A, B, C, D, E, F, G, H);
impl_tuple!(9; A, B, C, D, E, F, G, H, I);
impl_tuple!(10; A, B, C, D, E, F, G, H, I, J);
impl_tuple!(11; A, B, C, D, E, F, G, H, I, J, K);
impl_tuple!(12; A, B, C, D, E, F, G, H, I, J, K, L);

// ============================================================================
// Variadic
// ============================================================================

/// Runtime-sized list of same-typed values.
///
/// As arguments every element is pushed in order. As a return list it
/// requests all results and converts each of them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variadic<T>(Vec<T>);

impl<T> Variadic<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Variadic(Vec::new())
    }

    /// Unwrap into the inner vector
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for Variadic<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T> DerefMut for Variadic<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}

impl<T> From<Vec<T>> for Variadic<T> {
    fn from(values: Vec<T>) -> Self {
        Variadic(values)
    }
}

impl<T> FromIterator<T> for Variadic<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Variadic(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for Variadic<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: ToStack> PushArgs for Variadic<T> {
    fn count(&self) -> usize {
        self.0.len()
    }

    fn push_args<S: LuaStack + ?Sized>(self, stack: &S) {
        for value in self.0 {
            value.push_to(stack);
        }
    }
}

impl<T: FromStack> ReturnValues for Variadic<T> {
    const COUNT: i32 = MULTRET;

    fn collect<S: LuaStack + ?Sized>(stack: &S, base: i32) -> Result<Self, ReturnValueError> {
        let len = (stack.top() - base + 1).max(0) as usize;
        (0..len).map(|position| read(stack, base, position)).collect()
    }
}
