//! moonbind - typed calls into global functions of an embedded Lua runtime
//!
//! This crate turns a Rust argument list and a declared Rust return type
//! into the push / protected-call / read / pop sequence of a Lua-style
//! stack API. It never owns the runtime: anything implementing
//! [`LuaStack`] can be called into, and creating the runtime, opening its
//! libraries and loading scripts stay with the embedding code.
//!
//! # Example
//!
//! ```ignore
//! use moonbind::GlobalFunction;
//! use moonbind_lua::Lua;
//!
//! let lua = Lua::new()?;
//! lua.exec("function greet(name, times) return string.rep('hi ' .. name, times, ', ') end")?;
//!
//! let greet: GlobalFunction<_, String> = GlobalFunction::new(&lua, "greet");
//! assert_eq!(greet.call(("bob", 2))?, "hi bob, hi bob");
//! ```
//!
//! # Extending
//!
//! Implement [`ToStack`] to pass a type as an argument and [`FromStack`] to
//! receive it as a result. Types without an implementation are rejected at
//! compile time.

#![warn(missing_docs)]

mod convert;
mod error;
mod function;
mod multi;
mod stack;

pub use convert::{FromStack, Nil, ToStack};
pub use error::{CallError, CallResult, ConversionError};
pub use function::{call_global, GlobalFunction};
pub use multi::{PushArgs, ReturnValueError, ReturnValues, Variadic};
pub use stack::{CallStatus, LuaStack, ValueKind, MULTRET};
