//! moonbind-host - in-process reference runtime for moonbind
//!
//! `HostState` implements [`moonbind::LuaStack`] with a plain value stack
//! and a global table whose functions are Rust closures following the
//! runtime's native-function convention. It lets embedding code and tests
//! exercise typed calls without linking a C runtime.
//!
//! # Example
//!
//! ```ignore
//! use moonbind::GlobalFunction;
//! use moonbind_host::HostState;
//!
//! let state = HostState::new();
//! state.register("add", |s| {
//!     let a: i64 = s.arg(1)?;
//!     let b: i64 = s.arg(2)?;
//!     s.push(a + b);
//!     Ok(1)
//! });
//!
//! let add: GlobalFunction<_, i64> = GlobalFunction::new(&state, "add");
//! assert_eq!(add.call((2, 3))?, 5);
//! ```

#![warn(missing_docs)]

mod state;
mod value;

pub use state::HostState;
pub use value::{HostFn, HostFunction, Value};
