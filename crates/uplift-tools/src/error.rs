//! Error type for the secure wrappers

use uplift_core::SecurityError;

pub type ToolResult<T> = Result<T, ToolError>;

/// Errors raised by a wrapper or the primitive behind it
///
/// `Security` means the input was refused before any side effect. Every
/// other variant is an ordinary failure of the wrapped operation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid arguments provided to the tool
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The wrapped operation failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The wrapped operation ran past its deadline
    #[error("Execution timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl ToolError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArguments(_) => "UPLIFT_TOOL_ARGUMENTS",
            Self::ExecutionFailed(_) => "UPLIFT_TOOL_EXECUTION",
            Self::Timeout { .. } => "UPLIFT_TOOL_TIMEOUT",
            Self::NotFound(_) => "UPLIFT_TOOL_NOT_FOUND",
            Self::Security(err) => err.error_code(),
            Self::Io(_) => "UPLIFT_TOOL_IO",
            Self::Json(_) => "UPLIFT_TOOL_JSON",
            Self::Sql(_) => "UPLIFT_TOOL_SQL",
            Self::Other(_) => "UPLIFT_TOOL_OTHER",
        }
    }

    pub fn is_security_violation(&self) -> bool {
        matches!(self, Self::Security(err) if err.is_security_violation())
    }

    /// The security error, when this failure was a refusal
    pub fn as_security(&self) -> Option<&SecurityError> {
        match self {
            Self::Security(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uplift_core::CommandRisk;

    #[test]
    fn test_timeout_is_not_a_security_violation() {
        let err = ToolError::Timeout { seconds: 120 };
        assert!(!err.is_security_violation());
        assert_eq!(err.error_code(), "UPLIFT_TOOL_TIMEOUT");
        assert!(err.as_security().is_none());
    }

    #[test]
    fn test_security_error_keeps_its_code() {
        let err: ToolError = SecurityError::CommandRejected {
            command: "rm -rf /".into(),
            risk: CommandRisk::Forbidden,
            reason: "command 'rm' is forbidden".into(),
        }
        .into();
        assert!(err.is_security_violation());
        assert_eq!(err.error_code(), "UPLIFT_COMMAND_REJECTED");
        assert!(err.to_string().contains("rm"));
    }
}
