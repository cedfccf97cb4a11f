//! Validators for untrusted input
//!
//! Each validator is a synchronous, in-process decision over one kind of
//! input. The only shared mutable state is the allowed-directory set of the
//! path validator and the audit logs owned by the enforcing wrappers.

pub mod audit;
pub mod command;
pub mod path;
mod patterns;
pub mod plugin;
pub mod profile;
pub mod result;
pub mod risk;
pub mod signature;
pub mod sql;
pub mod suite;

pub use audit::{AuditEntry, AuditLog, DEFAULT_AUDIT_CAPACITY, SharedAuditLog, sanitize_for_log};
pub use command::{CommandPolicy, CommandValidator};
pub use path::{AccessMode, AllowedDirectorySet, PathPolicy, PathValidator};
pub use plugin::{
    DangerousPatternDetector, Permission, PluginPolicy, PluginSignature, PluginValidator,
};
pub use profile::SecurityProfile;
pub use result::{
    CommandValidation, PathValidation, PluginValidation, SqlValidation, ValidationOutcome,
};
pub use risk::{CommandRisk, PathRisk, PluginRisk, RiskTier, SqlRisk};
pub use signature::{KeySource, SignatureValidator, SigningKey};
pub use sql::{IdentifierKind, IdentifierValidator, InjectionDetector};
pub use suite::SecuritySuite;
