//! Plugin loading as two separate phases: decide, then load

mod loader;
mod secure;

pub use loader::{LoadedModule, ModuleLoader, SourceModuleLoader};
pub use secure::{ApprovedPlugin, PluginDecision, SecurePluginLoader};
