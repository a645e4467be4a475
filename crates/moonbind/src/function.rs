//! Typed handle to a global script function.

use std::fmt;
use std::marker::PhantomData;

use crate::error::{CallError, CallResult};
use crate::multi::{PushArgs, ReturnValues};
use crate::stack::{CallStatus, LuaStack, ValueKind};

/// A script function, bound by global name, callable from Rust.
///
/// `R` is the declared return list: `()` for no result, `T` for one bare
/// value, `(A, B, ..)` for several. The wrapper only remembers the name;
/// every call looks the global up again, so reassigning the global in the
/// runtime is observed by the next call.
///
/// The wrapper borrows the runtime handle and is neither `Clone` nor `Copy`.
///
/// # Example
///
/// ```ignore
/// let add: GlobalFunction<_, i64> = GlobalFunction::new(&lua, "add");
/// assert_eq!(add.call((2, 3))?, 5);
///
/// let primes: GlobalFunction<_, (i32, i32, i32)> = GlobalFunction::new(&lua, "primes");
/// assert_eq!(primes.call(())?, (2, 3, 5));
/// ```
pub struct GlobalFunction<'s, S: LuaStack + ?Sized, R: ReturnValues = ()> {
    state: &'s S,
    name: String,
    _returns: PhantomData<fn() -> R>,
}

impl<'s, S: LuaStack + ?Sized, R: ReturnValues> GlobalFunction<'s, S, R> {
    /// Bind `name` in `state`. Nothing is looked up until the first call.
    pub fn new(state: &'s S, name: impl Into<String>) -> Self {
        GlobalFunction {
            state,
            name: name.into(),
            _returns: PhantomData,
        }
    }

    /// Global name this wrapper calls
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runtime handle this wrapper calls into
    pub fn state(&self) -> &'s S {
        self.state
    }

    /// Call the function with `args` and convert its results to `R`.
    ///
    /// The stack depth is the same after the call as before it, whether
    /// the call succeeds or fails.
    pub fn call<A: PushArgs>(&self, args: A) -> CallResult<R> {
        invoke(self.state, &self.name, args)
    }
}

impl<S: LuaStack + ?Sized, R: ReturnValues> fmt::Debug for GlobalFunction<'_, S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalFunction")
            .field("name", &self.name)
            .field("returns", &R::COUNT)
            .finish()
    }
}

/// Call the global `name` once, without keeping a wrapper around.
pub fn call_global<S, A, R>(state: &S, name: &str, args: A) -> CallResult<R>
where
    S: LuaStack + ?Sized,
    A: PushArgs,
    R: ReturnValues,
{
    invoke(state, name, args)
}

/// Restores the stack depth recorded at construction when dropped.
struct StackGuard<'a, S: LuaStack + ?Sized> {
    stack: &'a S,
    top: i32,
}

impl<'a, S: LuaStack + ?Sized> StackGuard<'a, S> {
    fn new(stack: &'a S) -> Self {
        StackGuard {
            stack,
            top: stack.top(),
        }
    }
}

impl<S: LuaStack + ?Sized> Drop for StackGuard<'_, S> {
    fn drop(&mut self) {
        self.stack.set_top(self.top);
    }
}

fn invoke<S, A, R>(stack: &S, name: &str, args: A) -> CallResult<R>
where
    S: LuaStack + ?Sized,
    A: PushArgs,
    R: ReturnValues,
{
    let guard = StackGuard::new(stack);
    let base = guard.top;

    // Room for the function plus the larger of its arguments and results.
    let expected_args = args.count();
    let needed = expected_args.max(R::COUNT.max(0) as usize) + 1;
    if !i32::try_from(needed).is_ok_and(|n| stack.check_stack(n)) {
        tracing::debug!(name, needed, "call does not fit on the stack");
        return Err(CallError::StackOverflow {
            name: name.to_string(),
            needed,
        });
    }

    // Resolve
    let found = match stack.get_global(name) {
        Ok(kind) => kind,
        Err(status) => return Err(runtime_error(stack, name, status)),
    };
    if found != ValueKind::Function {
        tracing::debug!(name, %found, "global is not callable");
        return Err(CallError::NotAFunction {
            name: name.to_string(),
            found,
        });
    }

    // Invoke
    args.push_args(stack);
    let nargs = stack.top() - base - 1;
    debug_assert_eq!(nargs as usize, expected_args, "argument count mismatch");

    tracing::trace!(name, nargs, nresults = R::COUNT, "calling global function");
    let status = stack.pcall(nargs, R::COUNT);
    if !status.is_ok() {
        return Err(runtime_error(stack, name, status));
    }
    debug_assert!(
        R::COUNT < 0 || stack.top() == base + R::COUNT,
        "protected call left {} values, expected {}",
        stack.top() - base,
        R::COUNT
    );

    // Collect
    R::collect(stack, base + 1).map_err(|err| CallError::Conversion {
        name: name.to_string(),
        position: err.position,
        source: err.source,
    })
}

fn runtime_error<S: LuaStack + ?Sized>(stack: &S, name: &str, status: CallStatus) -> CallError {
    let message = error_message(stack);
    tracing::debug!(name, %status, %message, "global function call failed");
    CallError::Runtime {
        name: name.to_string(),
        status,
        message,
    }
}

/// Render the error object a failed call left on top of the stack.
fn error_message<S: LuaStack + ?Sized>(stack: &S) -> String {
    match stack.type_of(-1) {
        ValueKind::String | ValueKind::Number => stack
            .to_bytes(-1)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default(),
        kind => format!("(error object is a {} value)", kind),
    }
}
