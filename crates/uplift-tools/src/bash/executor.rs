//! `SecureExecutor`: validate, then run, then audit

use super::session::{BashSession, CommandOutput, ShellSession};
use crate::error::ToolResult;
use crate::{AUDIT_COMMAND_CHARS, AUDIT_OUTPUT_CHARS};
use tracing::{error, info, instrument, warn};
use uplift_core::security::{DEFAULT_AUDIT_CAPACITY, sanitize_for_log};
use uplift_core::{
    AuditEntry, AuditLog, CommandValidation, CommandValidator, SecurityError, SecurityProfile,
    SecuritySuite, SharedAuditLog,
};

const OPERATION: &str = "execute_command";

/// Runs shell commands only after the command validator accepts them
///
/// The session receives the re-quoted argv from the validation result, never
/// the caller's raw string, so glob and variable expansion do not apply.
pub struct SecureExecutor<S = BashSession> {
    validator: CommandValidator,
    session: S,
    audit: SharedAuditLog,
}

impl SecureExecutor<BashSession> {
    pub fn new(allow_dangerous: bool) -> Self {
        Self::with_session(
            CommandValidator::new(allow_dangerous),
            BashSession::new(),
            AuditLog::shared(DEFAULT_AUDIT_CAPACITY),
        )
    }

    pub fn for_profile(profile: SecurityProfile) -> Self {
        Self::with_session(
            CommandValidator::for_profile(profile),
            BashSession::new(),
            AuditLog::shared(DEFAULT_AUDIT_CAPACITY),
        )
    }

    pub fn from_suite(suite: &SecuritySuite) -> Self {
        Self::with_session(
            suite.commands().clone(),
            BashSession::new(),
            AuditLog::shared(suite.audit_capacity()),
        )
    }
}

impl<S: ShellSession> SecureExecutor<S> {
    pub fn with_session(validator: CommandValidator, session: S, audit: SharedAuditLog) -> Self {
        Self {
            validator,
            session,
            audit,
        }
    }

    pub fn validator(&self) -> &CommandValidator {
        &self.validator
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Validation without execution or auditing
    pub fn validate_only(&self, command: &str) -> CommandValidation {
        self.validator.validate(command)
    }

    #[instrument(skip_all, fields(command = %sanitize_for_log(command, 50)))]
    pub async fn execute(&self, command: &str) -> ToolResult<CommandOutput> {
        let logged = sanitize_for_log(command, AUDIT_COMMAND_CHARS);
        let validation = self.validator.validate(command);

        let sanitized = match validation.sanitized_command {
            Some(ref sanitized) if validation.is_valid => sanitized.clone(),
            _ => {
                error!(
                    command = %logged,
                    risk = %validation.risk_level,
                    reason = %validation.reason,
                    "command blocked"
                );
                self.audit.record(
                    AuditEntry::new(OPERATION, logged.clone(), false)
                        .with_risk(validation.risk_level)
                        .with_reason(validation.reason.clone()),
                );
                return Err(SecurityError::CommandRejected {
                    command: logged,
                    risk: validation.risk_level,
                    reason: validation.reason,
                }
                .into());
            }
        };

        match self.session.run(&sanitized).await {
            Ok(output) => {
                if output.success() {
                    info!(risk = %validation.risk_level, "command completed");
                } else {
                    warn!(exit_code = ?output.exit_code, "command exited with failure");
                }
                self.audit.record(
                    AuditEntry::new(OPERATION, logged, output.success())
                        .with_risk(validation.risk_level)
                        .with_detail("exit_code", output.exit_code)
                        .with_detail(
                            "output",
                            sanitize_for_log(&output.combined(), AUDIT_OUTPUT_CHARS),
                        ),
                );
                Ok(output)
            }
            Err(err) => {
                warn!(error = %err, "command execution failed");
                self.audit.record(
                    AuditEntry::new(OPERATION, logged, false)
                        .with_risk(validation.risk_level)
                        .with_error(err.to_string()),
                );
                Err(err)
            }
        }
    }

    /// The newest `limit` entries, oldest first
    pub fn get_audit_log(&self, limit: usize) -> Vec<AuditEntry> {
        self.audit.recent(limit)
    }

    pub fn clear_audit_log(&self) {
        self.audit.clear();
    }

    pub fn audit_log(&self) -> SharedAuditLog {
        self.audit.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bash::MockShellSession;
    use crate::error::ToolError;
    use uplift_core::CommandRisk;

    fn executor(session: MockShellSession) -> SecureExecutor<MockShellSession> {
        SecureExecutor::with_session(CommandValidator::new(false), session, AuditLog::shared(50))
    }

    fn ok_output(stdout: &str) -> CommandOutput {
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
            duration_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_rejected_command_never_reaches_session() {
        let mut session = MockShellSession::new();
        session.expect_run().never();
        let executor = executor(session);

        let err = executor.execute("ls; cat /etc/passwd").await.unwrap_err();
        match err {
            ToolError::Security(SecurityError::CommandRejected { risk, .. }) => {
                assert_eq!(risk, CommandRisk::Forbidden)
            }
            other => panic!("unexpected error: {other}"),
        }

        let log = executor.get_audit_log(10);
        assert_eq!(log.len(), 1);
        assert!(!log[0].success);
        assert_eq!(log[0].risk_level.as_deref(), Some("forbidden"));
    }

    #[tokio::test]
    async fn test_accepted_command_runs_requoted_argv() {
        let mut session = MockShellSession::new();
        session
            .expect_run()
            .withf(|command| command == "grep 'a b' notes.txt")
            .times(1)
            .returning(|_| Ok(ok_output("a b\n")));
        let executor = executor(session);

        let output = executor.execute("grep \"a b\" notes.txt").await.unwrap();
        assert_eq!(output.stdout, "a b\n");

        let log = executor.get_audit_log(10);
        assert_eq!(log.len(), 1);
        assert!(log[0].success);
        assert_eq!(log[0].details["exit_code"], 0);
    }

    #[tokio::test]
    async fn test_timeout_propagates_as_execution_error() {
        let mut session = MockShellSession::new();
        session
            .expect_run()
            .returning(|_| Err(ToolError::Timeout { seconds: 120 }));
        let executor = executor(session);

        let err = executor.execute("ls -la").await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { seconds: 120 }));
        assert!(!err.is_security_violation());

        let log = executor.get_audit_log(10);
        assert!(!log[0].success);
        assert!(log[0].error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_audit_truncates_command_and_output() {
        let mut session = MockShellSession::new();
        session
            .expect_run()
            .returning(|_| Ok(ok_output(&"x".repeat(2000))));
        let executor = executor(session);

        let long_arg = "a".repeat(400);
        executor.execute(&format!("echo {long_arg}")).await.unwrap();

        let entry = &executor.get_audit_log(1)[0];
        assert_eq!(entry.input.chars().count(), AUDIT_COMMAND_CHARS + 3);
        let output = entry.details["output"].as_str().unwrap();
        assert_eq!(output.chars().count(), AUDIT_OUTPUT_CHARS + 3);
    }

    #[tokio::test]
    async fn test_dangerous_command_depends_on_flag() {
        let mut session = MockShellSession::new();
        session.expect_run().returning(|_| Ok(ok_output("")));
        let permissive = SecureExecutor::with_session(
            CommandValidator::new(true),
            session,
            AuditLog::shared(10),
        );
        assert!(permissive.execute("mkdir build").await.is_ok());

        let mut session = MockShellSession::new();
        session.expect_run().never();
        let strict = executor(session);
        let err = strict.execute("mkdir build").await.unwrap_err();
        assert!(err.is_security_violation());
    }

    #[tokio::test]
    async fn test_validate_only_and_clear() {
        let mut session = MockShellSession::new();
        session.expect_run().never();
        let executor = executor(session);

        assert!(executor.validate_only("ls -la /tmp").is_valid);
        assert!(!executor.validate_only("rm -rf /").is_valid);
        assert!(executor.get_audit_log(10).is_empty());

        let _ = executor.execute("rm -rf /").await;
        assert_eq!(executor.get_audit_log(10).len(), 1);
        executor.clear_audit_log();
        assert!(executor.get_audit_log(10).is_empty());
    }
}
