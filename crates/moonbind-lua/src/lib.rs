//! moonbind-lua - Lua 5.4 backend for moonbind
//!
//! [`Lua`] wraps a `lua_State` (built from vendored sources through
//! `mlua-sys`) and implements [`moonbind::LuaStack`] on top of the raw C
//! API, so typed [`moonbind::GlobalFunction`] handles can call script
//! functions directly.
//!
//! # Example
//!
//! ```ignore
//! use moonbind::GlobalFunction;
//! use moonbind_lua::Lua;
//!
//! let lua = Lua::new()?;
//! lua.exec("function divmod(a, b) return a // b, a % b end")?;
//!
//! let divmod: GlobalFunction<_, (i64, i64)> = GlobalFunction::new(&lua, "divmod");
//! assert_eq!(divmod.call((17, 5))?, (3, 2));
//! ```

#![warn(missing_docs)]

mod error;
mod state;

pub use error::{LuaError, LuaResult};
pub use state::Lua;

/// Raw Lua C API, for embedders that create or configure states themselves.
pub use mlua_sys as ffi;
