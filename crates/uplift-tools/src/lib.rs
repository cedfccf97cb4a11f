//! Secure wrappers for Uplift
//!
//! Each wrapper pairs an unsafe primitive (a shell session, a file editor, a
//! SQLite store, a module loader, a cache backend) with the matching
//! validator from `uplift-core`. Rejections become `ToolError::Security` and
//! land in the wrapper's audit log; nothing reaches the primitive unvalidated.

pub mod bash;
pub mod cache;
pub mod edit;
pub mod error;
pub mod plugin;
pub mod sql;

pub use bash::{BashSession, CommandOutput, SecureExecutor, ShellSession};
pub use cache::{CacheBackend, CacheStats, MemoryBackend, SecureCache};
pub use edit::{EditCommand, FileEditor, SecureEditTool, SecurePathManager};
pub use error::{ToolError, ToolResult};
pub use plugin::{
    ApprovedPlugin, LoadedModule, ModuleLoader, PluginDecision, SecurePluginLoader,
    SourceModuleLoader,
};
pub use sql::{SecureSqlManager, SecureSqliteConfigStore, SqliteConfigStore};

/// Characters of a command kept in audit entries
pub const AUDIT_COMMAND_CHARS: usize = 200;

/// Characters of command output kept in audit entries
pub const AUDIT_OUTPUT_CHARS: usize = 500;

/// Characters of a SQL query kept in audit entries
pub const AUDIT_QUERY_CHARS: usize = 100;
