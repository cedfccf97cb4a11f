//! Plugin source validation: static analysis, code signatures and
//! capability permissions.

mod detector;
mod permission;
mod signature;
mod validator;

pub use detector::{DANGEROUS_BUILTINS, DangerousPatternDetector, ModuleRule, module_rule};
pub use permission::Permission;
pub use signature::PluginSignature;
pub use validator::{PluginPolicy, PluginValidator};
