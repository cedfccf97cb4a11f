//! Shell command classification.
//!
//! Checks run in a fixed order and stop at the first rejection:
//! 1. empty input
//! 2. dangerous patterns in the raw, unparsed string
//! 3. shell-word tokenization
//! 4. classification of the base command name (default deny)
//! 5. per-token argument checks
//!
//! The raw scan must come before tokenization: the tokenizer happily treats
//! `;` or `|` as ordinary argument text.

use super::patterns::PatternBank;
use super::profile::SecurityProfile;
use super::result::CommandValidation;
use super::risk::{CommandRisk, RiskTier};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, instrument};

/// Read-only tools
pub const SAFE_COMMANDS: &[&str] = &[
    "ls", "cat", "head", "tail", "grep", "find", "echo", "pwd", "whoami", "date", "which", "wc",
    "sort", "uniq", "diff", "file", "stat", "du", "df",
];

/// Text-munging tools; allowed but reported as restricted
pub const RESTRICTED_COMMANDS: &[&str] = &["sed", "awk", "cut", "tr", "xargs", "tee"];

/// Tools that create, copy or move files
pub const DANGEROUS_COMMANDS: &[&str] = &["mkdir", "touch", "cp", "mv", "ln"];

/// Never allowed, regardless of policy
pub const FORBIDDEN_COMMANDS: &[&str] = &[
    // filesystem destruction
    "rm", "dd", "mkfs", "fdisk", "parted",
    // process and system control
    "kill", "killall", "shutdown", "reboot", "halt", "systemctl", "service",
    // users and permissions
    "useradd", "userdel", "usermod", "passwd", "chmod", "chown", "chgrp", "sudo", "su",
    // firewall
    "iptables", "ufw", "firewall-cmd",
    // package managers
    "apt", "yum", "dnf", "pip", "npm",
    // network
    "curl", "wget", "nc", "netcat", "telnet", "ssh", "scp", "rsync",
    // interpreters and shells
    "python", "python3", "perl", "ruby", "node", "bash", "sh", "eval", "exec", "source",
];

const RAW_PATTERNS: &[(&str, &str)] = &[
    ("command chaining or piping (`;`, `&`, `|`)", r"[;&|]"),
    ("line break", r"[\n\r]"),
    ("command substitution `$(`", r"\$\("),
    ("backtick command substitution", r"`"),
    ("redirection into a device file", r">\s*/dev/"),
    ("access to /etc/", r"/etc/"),
    ("access to /root/", r"/root/"),
    ("access to /proc/", r"/proc/"),
    ("access to /sys/", r"/sys/"),
    ("path traversal `..`", r"\.\."),
    ("home directory expansion `~`", r"~"),
];

/// Substrings no single argument may contain
const SENSITIVE_ARGUMENT_PATHS: &[&str] = &["/etc/", "/root/", "/proc/", "/sys/", "/dev/"];

static RAW_BANK: LazyLock<PatternBank> =
    LazyLock::new(|| PatternBank::compile(RAW_PATTERNS, false, false));

/// Construction-time command policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandPolicy {
    /// Permit the `DANGEROUS_COMMANDS` tier
    pub allow_dangerous: bool,
    /// Extra command names treated as safe; forbidden names stay forbidden
    pub custom_whitelist: BTreeSet<String>,
}

impl CommandPolicy {
    pub fn for_profile(profile: SecurityProfile) -> Self {
        let extra: &[&str] = match profile {
            SecurityProfile::Strict => &[],
            SecurityProfile::Moderate => &["mkdir", "touch", "cp"],
            SecurityProfile::Permissive => &["mkdir", "touch", "cp", "mv", "ln"],
        };
        Self {
            allow_dangerous: profile != SecurityProfile::Strict,
            custom_whitelist: extra.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_whitelisted<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_whitelist
            .extend(commands.into_iter().map(Into::into));
        self
    }
}

/// Classifies shell command strings by risk tier
#[derive(Debug, Clone, Default)]
pub struct CommandValidator {
    policy: CommandPolicy,
}

impl CommandValidator {
    pub fn new(allow_dangerous: bool) -> Self {
        Self::with_policy(CommandPolicy {
            allow_dangerous,
            ..CommandPolicy::default()
        })
    }

    pub fn with_policy(policy: CommandPolicy) -> Self {
        Self { policy }
    }

    pub fn for_profile(profile: SecurityProfile) -> Self {
        Self::with_policy(CommandPolicy::for_profile(profile))
    }

    pub fn policy(&self) -> &CommandPolicy {
        &self.policy
    }

    /// Lowest tier this validator rejects
    pub fn rejection_threshold(&self) -> CommandRisk {
        if self.policy.allow_dangerous {
            CommandRisk::REJECT_AT
        } else {
            CommandRisk::Dangerous
        }
    }

    /// Tier of a base command name, `None` when it is on no list
    pub fn classify(&self, name: &str) -> Option<CommandRisk> {
        if FORBIDDEN_COMMANDS.contains(&name) {
            Some(CommandRisk::Forbidden)
        } else if DANGEROUS_COMMANDS.contains(&name) {
            Some(CommandRisk::Dangerous)
        } else if RESTRICTED_COMMANDS.contains(&name) {
            Some(CommandRisk::Restricted)
        } else if SAFE_COMMANDS.contains(&name) || self.policy.custom_whitelist.contains(name) {
            Some(CommandRisk::Safe)
        } else {
            None
        }
    }

    /// Validate a command string
    #[instrument(level = "debug", skip_all, fields(allow_dangerous = self.policy.allow_dangerous))]
    pub fn validate(&self, command: &str) -> CommandValidation {
        if command.trim().is_empty() {
            return CommandValidation::reject(CommandRisk::Forbidden, "command is empty");
        }

        match RAW_BANK.find(command) {
            Ok(Some(pattern)) => {
                return CommandValidation::reject(
                    CommandRisk::Forbidden,
                    format!("dangerous pattern detected: {}", pattern.label),
                );
            }
            Ok(None) => {}
            Err(e) => {
                return CommandValidation::reject(
                    CommandRisk::Forbidden,
                    format!("pattern check unavailable: {}", e),
                );
            }
        }

        let tokens = match shell_words::split(command) {
            Ok(tokens) => tokens,
            Err(e) => {
                return CommandValidation::reject(
                    CommandRisk::Forbidden,
                    format!("command could not be parsed: {}", e),
                );
            }
        };

        self.validate_tokens(&tokens)
    }

    /// Classification and per-token checks for an already split argv
    ///
    /// Skips the raw-string scan, so it is only safe for argv that never
    /// passes through a shell as one string.
    pub fn validate_tokens(&self, tokens: &[String]) -> CommandValidation {
        match self.check_tokens(tokens) {
            Ok(risk) => {
                debug!(risk = %risk, command = %tokens[0], "command accepted");
                CommandValidation::accept(
                    risk,
                    format!("command allowed ({})", risk),
                    shell_words::join(tokens),
                )
            }
            Err(rejection) => rejection,
        }
    }

    /// Steps 4 and 5 over already-tokenized input
    fn check_tokens(&self, tokens: &[String]) -> Result<CommandRisk, CommandValidation> {
        let Some(first) = tokens.first() else {
            return Err(CommandValidation::reject(
                CommandRisk::Forbidden,
                "command is empty",
            ));
        };

        let base = base_command(first);
        let risk = match self.classify(base) {
            Some(CommandRisk::Forbidden) => {
                return Err(CommandValidation::reject(
                    CommandRisk::Forbidden,
                    format!("command '{}' is forbidden", base),
                ));
            }
            Some(CommandRisk::Dangerous) if !self.policy.allow_dangerous => {
                return Err(CommandValidation::reject(
                    CommandRisk::Dangerous,
                    format!("command '{}' modifies the filesystem and dangerous commands are disabled", base),
                ));
            }
            Some(risk) => risk,
            None => {
                return Err(CommandValidation::reject(
                    CommandRisk::Forbidden,
                    format!("command '{}' is not in whitelist", base),
                ));
            }
        };

        for token in tokens {
            if let Some(reason) = unsafe_token(token) {
                return Err(CommandValidation::reject(CommandRisk::Forbidden, reason));
            }
        }

        Ok(risk)
    }
}

/// `/usr/bin/ls` -> `ls`
fn base_command(token: &str) -> &str {
    Path::new(token)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(token)
}

fn unsafe_token(token: &str) -> Option<String> {
    match RAW_BANK.find(token) {
        Ok(Some(pattern)) => {
            return Some(format!("argument '{}' contains {}", token, pattern.label));
        }
        Ok(None) => {}
        Err(e) => return Some(format!("pattern check unavailable: {}", e)),
    }
    SENSITIVE_ARGUMENT_PATHS
        .iter()
        .find(|p| token.contains(*p))
        .map(|p| format!("argument '{}' references sensitive path {}", token, p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict() -> CommandValidator {
        CommandValidator::new(false)
    }

    #[test]
    fn test_safe_command() {
        let r = strict().validate("ls -la /tmp");
        assert!(r.is_valid);
        assert_eq!(r.risk_level, CommandRisk::Safe);
        assert_eq!(r.sanitized_command.as_deref(), Some("ls -la /tmp"));
    }

    #[test]
    fn test_forbidden_command_names_rm() {
        let r = strict().validate("rm -rf /");
        assert!(!r.is_valid);
        assert_eq!(r.risk_level, CommandRisk::Forbidden);
        assert!(r.reason.contains("rm"));
    }

    #[test]
    fn test_chaining_caught_before_tokenization() {
        let r = strict().validate("ls; cat /etc/passwd");
        assert!(!r.is_valid);
        assert_eq!(r.risk_level, CommandRisk::Forbidden);
        assert!(r.reason.contains(";"));
        assert!(r.reason.starts_with("dangerous pattern detected"));
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(strict().validate("").risk_level, CommandRisk::Forbidden);
        assert!(!strict().validate("   \t").is_valid);
    }

    #[test]
    fn test_raw_patterns() {
        for cmd in [
            "echo $(whoami)",
            "echo `id`",
            "cat file > /dev/sda",
            "cat ../secret",
            "ls ~",
            "ls /proc/1",
            "ls /sys/kernel",
            "ls /root/",
            "echo a && echo b",
            "cat a | grep b",
            "ls\nrm -rf /",
        ] {
            let r = strict().validate(cmd);
            assert!(!r.is_valid, "{:?} should be rejected", cmd);
            assert_eq!(r.risk_level, CommandRisk::Forbidden);
        }
    }

    #[test]
    fn test_malformed_quoting() {
        let r = strict().validate("echo 'unterminated");
        assert!(!r.is_valid);
        assert_eq!(r.risk_level, CommandRisk::Forbidden);
        assert!(r.reason.contains("parsed"));
    }

    #[test]
    fn test_unknown_command_default_deny() {
        let r = strict().validate("git status");
        assert!(!r.is_valid);
        assert_eq!(r.risk_level, CommandRisk::Forbidden);
        assert!(r.reason.contains("not in whitelist"));
    }

    #[test]
    fn test_directory_prefix_stripped() {
        assert!(strict().validate("/bin/ls -l").is_valid);
        assert!(!strict().validate("/usr/bin/curl example.com").is_valid);
    }

    #[test]
    fn test_restricted_tier() {
        let r = strict().validate("sed -n 1p notes.txt");
        assert!(r.is_valid);
        assert_eq!(r.risk_level, CommandRisk::Restricted);
    }

    #[test]
    fn test_dangerous_gated_by_policy() {
        let r = strict().validate("mkdir build");
        assert!(!r.is_valid);
        assert_eq!(r.risk_level, CommandRisk::Dangerous);

        let r = CommandValidator::new(true).validate("mkdir build");
        assert!(r.is_valid);
        assert_eq!(r.risk_level, CommandRisk::Dangerous);
    }

    #[test]
    fn test_sensitive_argument_paths() {
        let r = strict().validate("cat /dev/null");
        assert!(!r.is_valid);
        assert!(r.reason.contains("/dev/"));
    }

    #[test]
    fn test_custom_whitelist() {
        let v = CommandValidator::with_policy(CommandPolicy::default().with_whitelisted(["git", "rm"]));
        assert!(v.validate("git status").is_valid);
        // forbidden stays forbidden
        assert!(!v.validate("rm file").is_valid);
    }

    #[test]
    fn test_profiles() {
        let strict = CommandValidator::for_profile(SecurityProfile::Strict);
        assert!(!strict.validate("touch a.txt").is_valid);
        assert_eq!(strict.rejection_threshold(), CommandRisk::Dangerous);

        let moderate = CommandValidator::for_profile(SecurityProfile::Moderate);
        assert!(moderate.validate("touch a.txt").is_valid);
        assert!(moderate.validate("mv a.txt b.txt").is_valid);
        assert_eq!(moderate.rejection_threshold(), CommandRisk::Forbidden);

        let permissive = CommandValidator::for_profile(SecurityProfile::Permissive);
        assert!(permissive.validate("ln -s a b").is_valid);
        assert!(!permissive.validate("curl example.com").is_valid);
    }

    #[test]
    fn test_quoted_arguments_are_rejoined() {
        let r = strict().validate("grep \"hello world\" notes.txt");
        assert!(r.is_valid);
        assert_eq!(r.sanitized_command.as_deref(), Some("grep 'hello world' notes.txt"));
    }

    #[test]
    fn test_token_stage_rejects_what_raw_scan_rejects() {
        let v = strict();
        for cmd in ["ls; pwd", "ls | cat", "cat /etc/passwd", "ls ..", "echo >/dev/null"] {
            let tokens = shell_words::split(cmd).unwrap();
            assert!(!v.validate_tokens(&tokens).is_valid, "{:?} passed token checks", cmd);
        }
    }

    #[test]
    fn test_validate_tokens_accepts_plain_argv() {
        let tokens = vec!["wc".to_string(), "-l".to_string(), "notes.txt".to_string()];
        let r = strict().validate_tokens(&tokens);
        assert!(r.is_valid);
        assert!(!strict().validate_tokens(&[]).is_valid);
    }
}
