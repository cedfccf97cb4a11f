//! Core library for the Uplift security layer.
//!
//! Every check that decides whether an untrusted string may be executed or
//! accessed lives here: shell commands, filesystem paths, SQL identifiers and
//! queries, and plugin source code. Validators return structured results and
//! never raise; the enforcing wrappers in `uplift-tools` turn rejections into
//! errors.

pub mod config;
pub mod error;
pub mod security;

pub use config::SecurityConfig;
pub use error::{ConfigError, SecurityError, SecurityResult, SignatureError};
pub use security::{
    AccessMode, AllowedDirectorySet, AuditEntry, AuditLog, CommandRisk, CommandValidation,
    CommandValidator, DangerousPatternDetector, IdentifierKind, IdentifierValidator,
    InjectionDetector, KeySource, PathRisk, PathValidation, PathValidator, Permission,
    PluginPolicy, PluginRisk, PluginSignature, PluginValidation, PluginValidator, RiskTier,
    SecurityProfile, SecuritySuite, SharedAuditLog, SignatureValidator, SigningKey, SqlRisk,
    SqlValidation, ValidationOutcome,
};
