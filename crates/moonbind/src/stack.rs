//! LuaStack trait — abstract runtime operations
//!
//! Defines the interface that an embedded runtime implements. The binding
//! layer programs against this trait only: it never creates, loads or
//! destroys a runtime, it just pushes values, calls, and reads results.

use std::fmt;

/// Request every result a call produces instead of a fixed count.
pub const MULTRET: i32 = -1;

/// Type of a value on the runtime stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Index refers to no stack slot at all
    None,
    /// The nil value
    Nil,
    /// true / false
    Boolean,
    /// Raw pointer value
    LightUserdata,
    /// Integer or float
    Number,
    /// Byte string
    String,
    /// Table
    Table,
    /// Script or native function
    Function,
    /// Full userdata
    Userdata,
    /// Coroutine
    Thread,
}

impl ValueKind {
    /// Map a raw runtime type tag (`LUA_TNONE` = -1 .. `LUA_TTHREAD` = 8).
    pub fn from_raw(tag: i32) -> Self {
        match tag {
            0 => ValueKind::Nil,
            1 => ValueKind::Boolean,
            2 => ValueKind::LightUserdata,
            3 => ValueKind::Number,
            4 => ValueKind::String,
            5 => ValueKind::Table,
            6 => ValueKind::Function,
            7 => ValueKind::Userdata,
            8 => ValueKind::Thread,
            _ => ValueKind::None,
        }
    }

    /// Name the runtime uses for this type in its own messages.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::None => "no value",
            ValueKind::Nil => "nil",
            ValueKind::Boolean => "boolean",
            ValueKind::LightUserdata | ValueKind::Userdata => "userdata",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Table => "table",
            ValueKind::Function => "function",
            ValueKind::Thread => "thread",
        }
    }

    /// True for nil and for an empty slot.
    pub fn is_none_or_nil(self) -> bool {
        matches!(self, ValueKind::None | ValueKind::Nil)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status reported by a protected call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// The call completed
    Ok,
    /// The callee yielded
    Yield,
    /// Error raised while running the callee
    RuntimeError,
    /// Error while compiling a chunk
    SyntaxError,
    /// Allocation failure
    MemoryError,
    /// Error while running the message handler
    HandlerError,
    /// Status code this crate does not know about
    Unknown(i32),
}

impl CallStatus {
    /// Map a raw status code (`LUA_OK` = 0 .. `LUA_ERRERR` = 5).
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => CallStatus::Ok,
            1 => CallStatus::Yield,
            2 => CallStatus::RuntimeError,
            3 => CallStatus::SyntaxError,
            4 => CallStatus::MemoryError,
            5 => CallStatus::HandlerError,
            other => CallStatus::Unknown(other),
        }
    }

    /// Raw status code.
    pub fn code(self) -> i32 {
        match self {
            CallStatus::Ok => 0,
            CallStatus::Yield => 1,
            CallStatus::RuntimeError => 2,
            CallStatus::SyntaxError => 3,
            CallStatus::MemoryError => 4,
            CallStatus::HandlerError => 5,
            CallStatus::Unknown(code) => code,
        }
    }

    /// True when the call completed without error.
    pub fn is_ok(self) -> bool {
        self == CallStatus::Ok
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallStatus::Ok => f.write_str("ok"),
            CallStatus::Yield => f.write_str("yield"),
            CallStatus::RuntimeError => f.write_str("runtime error"),
            CallStatus::SyntaxError => f.write_str("syntax error"),
            CallStatus::MemoryError => f.write_str("memory error"),
            CallStatus::HandlerError => f.write_str("error in message handler"),
            CallStatus::Unknown(code) => write!(f, "status {}", code),
        }
    }
}

/// Abstract runtime context for typed calls.
///
/// One implementor value is one running runtime instance (the "runtime
/// handle"). Every method takes `&self` so that any number of
/// [`GlobalFunction`](crate::GlobalFunction) wrappers can borrow the same
/// handle. Implementors are expected to be `!Sync`: the stack must only be
/// touched from one thread at a time.
///
/// # Indices
///
/// Positive indices count from the bottom of the current frame starting at
/// 1, negative indices count from the top (-1 is the topmost value).
pub trait LuaStack {
    // ========================================================================
    // Stack Layout
    // ========================================================================

    /// Index of the top element, which is also the number of elements.
    fn top(&self) -> i32;

    /// Grow (filling with nil) or shrink the stack so that `index` is the top.
    ///
    /// Accepts negative indices; `set_top(-1 - n)` drops `n` values.
    fn set_top(&self, index: i32);

    /// Remove `n` values from the top.
    fn pop(&self, n: i32) {
        if n > 0 {
            self.set_top(-n - 1);
        }
    }

    /// Convert a relative index into an absolute one.
    fn abs_index(&self, index: i32) -> i32 {
        if index > 0 {
            index
        } else {
            self.top() + index + 1
        }
    }

    /// Make sure `n` more values fit on the stack, growing it if needed.
    ///
    /// Returns false when that would exceed the runtime's stack limit;
    /// nothing is pushed either way.
    fn check_stack(&self, n: i32) -> bool;

    // ========================================================================
    // Globals
    // ========================================================================

    /// Push the global bound to `name` (nil when unbound), returning its type.
    ///
    /// The lookup runs in protected mode. If it raises (an erroring
    /// `__index` on the globals table, say) the error object is pushed in
    /// place of the value and the status is returned as `Err`.
    fn get_global(&self, name: &str) -> Result<ValueKind, CallStatus>;

    // ========================================================================
    // Push
    // ========================================================================

    /// Push nil
    fn push_nil(&self);

    /// Push a boolean
    fn push_boolean(&self, value: bool);

    /// Push an integer
    fn push_integer(&self, value: i64);

    /// Push a float
    fn push_number(&self, value: f64);

    /// Push a byte string (may contain NUL bytes)
    fn push_string(&self, value: &[u8]);

    // ========================================================================
    // Call
    // ========================================================================

    /// Call the function sitting below the `nargs` topmost values.
    ///
    /// Function and arguments are popped. On success `nresults` values are
    /// left on the stack (all of them with [`MULTRET`]); on failure a
    /// single error object is left instead.
    fn pcall(&self, nargs: i32, nresults: i32) -> CallStatus;

    // ========================================================================
    // Read
    // ========================================================================

    /// Type of the value at `index`
    fn type_of(&self, index: i32) -> ValueKind;

    /// Truthiness of the value at `index` (only nil and false are false)
    fn to_boolean(&self, index: i32) -> bool;

    /// Integer at `index`, if the runtime can convert it to one
    fn to_integer(&self, index: i32) -> Option<i64>;

    /// Float at `index`, if the runtime can convert it to one
    fn to_number(&self, index: i32) -> Option<f64>;

    /// String bytes at `index`, if the runtime can convert it to a string.
    ///
    /// Like the runtime itself, numbers may be converted in place.
    fn to_bytes(&self, index: i32) -> Option<Vec<u8>>;
}

impl<S: LuaStack + ?Sized> LuaStack for &S {
    fn top(&self) -> i32 {
        (**self).top()
    }

    fn set_top(&self, index: i32) {
        (**self).set_top(index)
    }

    fn check_stack(&self, n: i32) -> bool {
        (**self).check_stack(n)
    }

    fn get_global(&self, name: &str) -> Result<ValueKind, CallStatus> {
        (**self).get_global(name)
    }

    fn push_nil(&self) {
        (**self).push_nil()
    }

    fn push_boolean(&self, value: bool) {
        (**self).push_boolean(value)
    }

    fn push_integer(&self, value: i64) {
        (**self).push_integer(value)
    }

    fn push_number(&self, value: f64) {
        (**self).push_number(value)
    }

    fn push_string(&self, value: &[u8]) {
        (**self).push_string(value)
    }

    fn pcall(&self, nargs: i32, nresults: i32) -> CallStatus {
        (**self).pcall(nargs, nresults)
    }

    fn type_of(&self, index: i32) -> ValueKind {
        (**self).type_of(index)
    }

    fn to_boolean(&self, index: i32) -> bool {
        (**self).to_boolean(index)
    }

    fn to_integer(&self, index: i32) -> Option<i64> {
        (**self).to_integer(index)
    }

    fn to_number(&self, index: i32) -> Option<f64> {
        (**self).to_number(index)
    }

    fn to_bytes(&self, index: i32) -> Option<Vec<u8>> {
        (**self).to_bytes(index)
    }
}
