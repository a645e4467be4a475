//! Lua — a `lua_State` exposed through `LuaStack`

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr::NonNull;
use std::slice;

use moonbind::{CallStatus, FromStack, LuaStack, ToStack, ValueKind};
use mlua_sys as ffi;

use crate::error::{LuaError, LuaResult};

/// Handle to one Lua 5.4 state.
///
/// A state created with [`Lua::new`] is owned and closed on drop. A state
/// adopted with [`Lua::from_raw`] belongs to someone else and is left
/// open. Either way the handle is `!Send` and `!Sync`.
///
/// Script loading lives here rather than in the binding layer: run the
/// scripts that define your globals first, then build
/// [`GlobalFunction`](moonbind::GlobalFunction)s against the handle.
#[derive(Debug)]
pub struct Lua {
    ptr: NonNull<ffi::lua_State>,
    owned: bool,
}

impl Lua {
    /// Create a state with the standard libraries opened.
    pub fn new() -> LuaResult<Self> {
        // SAFETY: luaL_newstate has no preconditions; a null return is handled.
        let ptr = NonNull::new(unsafe { ffi::luaL_newstate() }).ok_or(LuaError::Allocation)?;
        // SAFETY: freshly created, valid state.
        unsafe { ffi::luaL_openlibs(ptr.as_ptr()) };
        Ok(Lua { ptr, owned: true })
    }

    /// Adopt a state created elsewhere. Returns `None` for a null pointer.
    ///
    /// # Safety
    /// `ptr` must be a valid `lua_State` that stays open for as long as the
    /// returned handle and every wrapper built on it are alive, and it must
    /// not be used from another thread meanwhile.
    pub unsafe fn from_raw(ptr: *mut ffi::lua_State) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Lua { ptr, owned: false })
    }

    /// Raw state pointer
    pub fn as_ptr(&self) -> *mut ffi::lua_State {
        self.ptr.as_ptr()
    }

    /// True when dropping this handle closes the state
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    // ========================================================================
    // Script Loading
    // ========================================================================

    /// Compile and run a chunk named `=chunk`.
    pub fn exec(&self, source: &str) -> LuaResult<()> {
        self.exec_named(source, "=chunk")
    }

    /// Compile and run a chunk under the given chunk name.
    ///
    /// Chunk names follow the Lua convention: `=name` is used verbatim in
    /// messages, `@path` marks a file. Only source text is accepted;
    /// precompiled chunks fail to load.
    pub fn exec_named(&self, source: &str, chunk: &str) -> LuaResult<()> {
        let l = self.as_ptr();
        let chunk_name = CString::new(chunk.replace('\0', "")).unwrap_or_default();
        let top = self.top();

        // SAFETY: valid state; buffer and name outlive the call.
        let status = unsafe {
            ffi::luaL_loadbufferx(
                l,
                source.as_ptr() as *const c_char,
                source.len(),
                chunk_name.as_ptr(),
                c"t".as_ptr(),
            )
        };
        if status != ffi::LUA_OK {
            let message = self.take_error(top);
            tracing::debug!(chunk, %message, "failed to load chunk");
            return Err(LuaError::Load {
                chunk: chunk.to_string(),
                message,
            });
        }

        let status = self.pcall(0, 0);
        if !status.is_ok() {
            let message = self.take_error(top);
            tracing::debug!(chunk, %message, "chunk raised an error");
            return Err(LuaError::Run {
                chunk: chunk.to_string(),
                message,
            });
        }
        Ok(())
    }

    /// Read, compile and run a script file.
    pub fn exec_file(&self, path: impl AsRef<Path>) -> LuaResult<()> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| LuaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.exec_named(&source, &format!("@{}", path.display()))
    }

    // ========================================================================
    // Globals
    // ========================================================================

    /// Assign a global from Rust.
    ///
    /// The assignment honours a `__newindex` on the globals table; an error
    /// it raises comes back as [`LuaError::Global`].
    pub fn set_global<T: ToStack>(&self, name: &str, value: T) -> LuaResult<()> {
        let l = self.as_ptr();
        let top = self.top();
        self.reserve(3);
        // SAFETY: valid state with three free slots.
        unsafe {
            ffi::lua_pushcclosure(l, assign_global, 0);
            ffi::lua_pushlstring(l, name.as_ptr() as *const c_char, name.len());
        }
        value.push_to(self);

        let status = self.pcall(2, 0);
        if status.is_ok() {
            return Ok(());
        }
        let message = self.take_error(top);
        tracing::debug!(name, %message, "failed to assign global");
        Err(LuaError::Global {
            name: name.to_string(),
            message,
        })
    }

    /// Read a global into a Rust value.
    pub fn global<T: FromStack>(&self, name: &str) -> LuaResult<T> {
        let top = self.top();
        if self.get_global(name).is_err() {
            let message = self.take_error(top);
            tracing::debug!(name, %message, "failed to read global");
            return Err(LuaError::Global {
                name: name.to_string(),
                message,
            });
        }
        let value = T::from_stack(self, -1);
        self.set_top(top);
        value.map_err(|source| LuaError::Conversion {
            name: name.to_string(),
            source,
        })
    }

    /// Pop the error object above `top` and render it as text.
    fn take_error(&self, top: i32) -> String {
        let message = match self.type_of(-1) {
            ValueKind::String | ValueKind::Number => self
                .to_bytes(-1)
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default(),
            kind => format!("(error object is a {} value)", kind),
        };
        self.set_top(top);
        message
    }

    /// Panics if the stack cannot hold `n` more values.
    fn reserve(&self, n: c_int) {
        assert!(self.check_stack(n), "Lua stack overflow");
    }
}

/// `[name] -> [value]`: index the globals table, metamethods included.
unsafe extern "C-unwind" fn index_global(l: *mut ffi::lua_State) -> c_int {
    ffi::lua_rawgeti(l, ffi::LUA_REGISTRYINDEX, ffi::LUA_RIDX_GLOBALS as ffi::lua_Integer);
    ffi::lua_pushvalue(l, 1);
    ffi::lua_gettable(l, -2);
    1
}

/// `[name, value] -> []`: assign into the globals table, metamethods included.
unsafe extern "C-unwind" fn assign_global(l: *mut ffi::lua_State) -> c_int {
    ffi::lua_rawgeti(l, ffi::LUA_REGISTRYINDEX, ffi::LUA_RIDX_GLOBALS as ffi::lua_Integer);
    ffi::lua_pushvalue(l, 1);
    ffi::lua_pushvalue(l, 2);
    ffi::lua_settable(l, -3);
    0
}

impl Drop for Lua {
    fn drop(&mut self) {
        if self.owned {
            // SAFETY: owned states are closed exactly once, here.
            unsafe { ffi::lua_close(self.ptr.as_ptr()) };
        }
    }
}

impl LuaStack for Lua {
    fn top(&self) -> i32 {
        // SAFETY: valid state.
        unsafe { ffi::lua_gettop(self.as_ptr()) }
    }

    fn set_top(&self, index: i32) {
        // SAFETY: callers keep indices within the current frame.
        unsafe { ffi::lua_settop(self.as_ptr(), index) }
    }

    fn check_stack(&self, n: i32) -> bool {
        // SAFETY: valid state; lua_checkstack refuses to grow past LUAI_MAXSTACK.
        n >= 0 && unsafe { ffi::lua_checkstack(self.as_ptr(), n) != 0 }
    }

    fn get_global(&self, name: &str) -> Result<ValueKind, CallStatus> {
        let l = self.as_ptr();
        self.reserve(2);
        // Through the globals table so that names may contain NUL bytes.
        // SAFETY: valid state with two free slots; stack goes
        // [index_global, key] -> [value] or [error].
        unsafe {
            ffi::lua_pushcclosure(l, index_global, 0);
            ffi::lua_pushlstring(l, name.as_ptr() as *const c_char, name.len());
        }
        let status = self.pcall(1, 1);
        if status.is_ok() {
            Ok(self.type_of(-1))
        } else {
            Err(status)
        }
    }

    fn push_nil(&self) {
        self.reserve(1);
        // SAFETY: valid state with a free slot.
        unsafe { ffi::lua_pushnil(self.as_ptr()) }
    }

    fn push_boolean(&self, value: bool) {
        self.reserve(1);
        // SAFETY: valid state with a free slot.
        unsafe { ffi::lua_pushboolean(self.as_ptr(), c_int::from(value)) }
    }

    fn push_integer(&self, value: i64) {
        self.reserve(1);
        // SAFETY: valid state with a free slot.
        unsafe { ffi::lua_pushinteger(self.as_ptr(), value as ffi::lua_Integer) }
    }

    fn push_number(&self, value: f64) {
        self.reserve(1);
        // SAFETY: valid state with a free slot.
        unsafe { ffi::lua_pushnumber(self.as_ptr(), value as ffi::lua_Number) }
    }

    fn push_string(&self, value: &[u8]) {
        self.reserve(1);
        // SAFETY: valid state with a free slot; Lua copies the bytes.
        unsafe {
            ffi::lua_pushlstring(self.as_ptr(), value.as_ptr() as *const c_char, value.len());
        }
    }

    fn pcall(&self, nargs: i32, nresults: i32) -> CallStatus {
        // SAFETY: the caller placed a function and `nargs` values on the stack.
        let status = unsafe { ffi::lua_pcall(self.as_ptr(), nargs, nresults, 0) };
        CallStatus::from_raw(status)
    }

    fn type_of(&self, index: i32) -> ValueKind {
        // SAFETY: lua_type accepts any acceptable index.
        ValueKind::from_raw(unsafe { ffi::lua_type(self.as_ptr(), index) })
    }

    fn to_boolean(&self, index: i32) -> bool {
        // SAFETY: lua_toboolean accepts any acceptable index.
        unsafe { ffi::lua_toboolean(self.as_ptr(), index) != 0 }
    }

    fn to_integer(&self, index: i32) -> Option<i64> {
        let mut isnum: c_int = 0;
        // SAFETY: valid state; isnum is a valid out pointer.
        let value = unsafe { ffi::lua_tointegerx(self.as_ptr(), index, &mut isnum) };
        (isnum != 0).then_some(value as i64)
    }

    fn to_number(&self, index: i32) -> Option<f64> {
        let mut isnum: c_int = 0;
        // SAFETY: valid state; isnum is a valid out pointer.
        let value = unsafe { ffi::lua_tonumberx(self.as_ptr(), index, &mut isnum) };
        (isnum != 0).then_some(value as f64)
    }

    fn to_bytes(&self, index: i32) -> Option<Vec<u8>> {
        let mut len: usize = 0;
        // SAFETY: valid state; the returned buffer stays alive while the value
        // is on the stack, and is copied out before returning.
        unsafe {
            let data = ffi::lua_tolstring(self.as_ptr(), index, &mut len);
            if data.is_null() {
                return None;
            }
            Some(slice::from_raw_parts(data as *const u8, len).to_vec())
        }
    }
}
