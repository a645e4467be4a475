//! HostState — in-process runtime backing `LuaStack`

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use moonbind::{CallStatus, FromStack, LuaStack, ToStack, ValueKind, MULTRET};

use crate::value::{HostFunction, Value};

/// Most values a state's stack may hold across all frames.
const STACK_LIMIT: usize = 1_000_000;

/// A single runtime instance: one value stack plus one global table.
///
/// Globals hold plain values or native closures registered with
/// [`HostState::register`]. Calls made through the stack API run the
/// closure in its own frame, so inside a closure index 1 is the first
/// argument no matter how deep the caller's stack is.
///
/// `HostState` is `!Sync`; share it between wrappers by reference on one
/// thread.
#[derive(Default)]
pub struct HostState {
    stack: RefCell<Vec<Value>>,
    // Absolute stack offset of each active frame's first slot.
    frames: RefCell<Vec<usize>>,
    globals: RefCell<HashMap<String, Value>>,
}

impl HostState {
    /// Create an empty runtime
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Globals
    // ========================================================================

    /// Bind `name` to `value`, replacing any previous binding
    pub fn set_global(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.globals.borrow_mut().insert(name.into(), value.into());
    }

    /// Current binding of `name`
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    /// Unbind `name`, returning its previous value
    pub fn remove_global(&self, name: &str) -> Option<Value> {
        self.globals.borrow_mut().remove(name)
    }

    /// Bind `name` to a native closure
    pub fn register(
        &self,
        name: impl Into<String>,
        f: impl Fn(&HostState) -> Result<usize, String> + 'static,
    ) {
        self.set_global(name, HostFunction::new(f));
    }

    /// Names of every bound global
    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().keys().cloned().collect()
    }

    // ========================================================================
    // Helpers for native closures
    // ========================================================================

    /// Push a host value
    pub fn push_value(&self, value: impl Into<Value>) {
        self.stack.borrow_mut().push(value.into());
    }

    /// Copy of the value at `index` (nil when the slot is empty)
    pub fn value(&self, index: i32) -> Value {
        self.slot(index)
            .and_then(|slot| self.stack.borrow().get(slot).cloned())
            .unwrap_or_default()
    }

    /// Convert argument `index` of the running closure
    pub fn arg<T: FromStack>(&self, index: i32) -> Result<T, String> {
        T::from_stack(self, index).map_err(|err| format!("bad argument #{} ({})", index, err))
    }

    /// Push any `ToStack` value
    pub fn push<T: ToStack>(&self, value: T) {
        value.push_to(self);
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn base(&self) -> usize {
        self.frames.borrow().last().copied().unwrap_or(0)
    }

    /// Absolute vector offset of `index`, if it names a live slot.
    fn slot(&self, index: i32) -> Option<usize> {
        let base = self.base();
        let len = self.stack.borrow().len();
        let slot = if index > 0 {
            base + index as usize - 1
        } else if index < 0 {
            let from_top = index.unsigned_abs() as usize;
            if from_top > len - base {
                return None;
            }
            len - from_top
        } else {
            return None;
        };
        (slot < len).then_some(slot)
    }

    fn with_slot<T>(&self, index: i32, f: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        let slot = self.slot(index)?;
        f(&self.stack.borrow()[slot])
    }

    fn raise(&self, func_slot: usize, message: String) -> CallStatus {
        tracing::trace!(%message, "host call raised an error");
        let mut stack = self.stack.borrow_mut();
        stack.truncate(func_slot);
        stack.push(Value::String(message.into_bytes()));
        CallStatus::RuntimeError
    }
}

impl LuaStack for HostState {
    fn top(&self) -> i32 {
        (self.stack.borrow().len() - self.base()) as i32
    }

    fn set_top(&self, index: i32) {
        let base = self.base();
        let mut stack = self.stack.borrow_mut();
        let new_len = if index >= 0 {
            base + index as usize
        } else {
            (stack.len() as i64 + i64::from(index) + 1).max(base as i64) as usize
        };
        stack.resize(new_len, Value::Nil);
    }

    fn check_stack(&self, n: i32) -> bool {
        usize::try_from(n).is_ok_and(|n| self.stack.borrow().len() + n <= STACK_LIMIT)
    }

    fn get_global(&self, name: &str) -> Result<ValueKind, CallStatus> {
        let value = self.global(name).unwrap_or_default();
        let kind = value.kind();
        self.stack.borrow_mut().push(value);
        Ok(kind)
    }

    fn push_nil(&self) {
        self.push_value(Value::Nil);
    }

    fn push_boolean(&self, value: bool) {
        self.push_value(Value::Boolean(value));
    }

    fn push_integer(&self, value: i64) {
        self.push_value(Value::Integer(value));
    }

    fn push_number(&self, value: f64) {
        self.push_value(Value::Number(value));
    }

    fn push_string(&self, value: &[u8]) {
        self.push_value(Value::String(value.to_vec()));
    }

    fn pcall(&self, nargs: i32, nresults: i32) -> CallStatus {
        let len = self.stack.borrow().len();
        let func_slot = len - nargs as usize - 1;
        debug_assert!(func_slot >= self.base(), "pcall reaches below the current frame");

        let callee = self.stack.borrow()[func_slot].clone();
        let function = match callee {
            Value::Function(function) => function,
            other => {
                return self.raise(func_slot, format!("attempt to call a {} value", other.kind()));
            }
        };

        self.frames.borrow_mut().push(func_slot + 1);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| function.invoke(self)));
        self.frames.borrow_mut().pop();

        match outcome {
            Ok(Ok(count)) => {
                let mut stack = self.stack.borrow_mut();
                let available = stack.len().saturating_sub(func_slot + 1);
                let first_result = stack.len() - count.min(available);
                let mut results = stack.split_off(first_result);
                stack.truncate(func_slot);
                if nresults != MULTRET {
                    results.resize(nresults.max(0) as usize, Value::Nil);
                }
                stack.extend(results);
                CallStatus::Ok
            }
            Ok(Err(message)) => self.raise(func_slot, message),
            Err(panic) => {
                let message = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                self.raise(func_slot, format!("host function panicked: {}", message))
            }
        }
    }

    fn type_of(&self, index: i32) -> ValueKind {
        self.with_slot(index, |value| Some(value.kind()))
            .unwrap_or(ValueKind::None)
    }

    fn to_boolean(&self, index: i32) -> bool {
        self.with_slot(index, |value| Some(value.is_truthy()))
            .unwrap_or(false)
    }

    fn to_integer(&self, index: i32) -> Option<i64> {
        self.with_slot(index, Value::to_integer)
    }

    fn to_number(&self, index: i32) -> Option<f64> {
        self.with_slot(index, Value::to_number)
    }

    fn to_bytes(&self, index: i32) -> Option<Vec<u8>> {
        let slot = self.slot(index)?;
        let mut stack = self.stack.borrow_mut();
        let bytes = stack[slot].to_bytes()?;
        // Numbers become strings in place, as the runtime's own conversion does.
        if !matches!(stack[slot], Value::String(_)) {
            stack[slot] = Value::String(bytes.clone());
        }
        Some(bytes)
    }
}
