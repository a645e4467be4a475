//! Error types for the Lua backend

use std::path::PathBuf;

use moonbind::ConversionError;

/// Result type for state management, script loading and global access
pub type LuaResult<T> = Result<T, LuaError>;

/// Failure to create a state, run a chunk, or access a global
#[derive(Debug, thiserror::Error)]
pub enum LuaError {
    /// `luaL_newstate` could not allocate a state
    #[error("Failed to allocate a Lua state")]
    Allocation,

    /// The chunk did not compile
    #[error("Failed to load chunk {chunk}: {message}")]
    Load {
        /// Chunk name
        chunk: String,
        /// Message left by the compiler
        message: String,
    },

    /// The chunk raised an error while running
    #[error("Error running chunk {chunk}: {message}")]
    Run {
        /// Chunk name
        chunk: String,
        /// Message left by the runtime
        message: String,
    },

    /// Reading or assigning a global raised an error, typically from a
    /// metatable on the globals table
    #[error("Failed to access global '{name}': {message}")]
    Global {
        /// Global name
        name: String,
        /// Message left by the runtime
        message: String,
    },

    /// A global could not be converted to the requested Rust type
    #[error("Global '{name}': {source}")]
    Conversion {
        /// Global name
        name: String,
        /// Underlying conversion failure
        #[source]
        source: ConversionError,
    },

    /// The script file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// Script path
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },
}
