//! SQL identifier hygiene and query injection scanning.
//!
//! Identifiers are checked against a keyword list, a structural-syntax bank
//! and a strict charset. Queries are scanned as a whole by a separate bank;
//! callers should run both whenever a query is assembled from parts.

use super::patterns::PatternBank;
use super::result::SqlValidation;
use super::risk::SqlRisk;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

/// Longest accepted identifier, in characters
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Reserved words never accepted as identifiers
pub const SQL_KEYWORDS: &[&str] = &[
    // DDL
    "CREATE", "DROP", "ALTER", "TRUNCATE", "RENAME",
    // DML
    "SELECT", "INSERT", "UPDATE", "DELETE", "MERGE",
    // DCL
    "GRANT", "REVOKE",
    // TCL
    "COMMIT", "ROLLBACK", "SAVEPOINT",
    // objects
    "TABLE", "DATABASE", "INDEX", "VIEW", "TRIGGER", "PROCEDURE", "FUNCTION",
    // clauses
    "FROM", "WHERE", "JOIN", "UNION", "ORDER", "GROUP", "HAVING", "LIMIT",
    // execution and file access
    "EXEC", "EXECUTE", "DECLARE", "SET", "LOAD_FILE", "INTO", "OUTFILE", "DUMPFILE", "SHELL",
    "SYSTEM",
];

const IDENTIFIER_PATTERNS: &[(&str, &str)] = &[
    ("a quote or statement terminator", r#"[;'"`]"#),
    ("a line comment", r"--"),
    ("a block comment", r"/\*|\*/"),
    ("a backslash escape", r"\\"),
    ("a boolean operator", r"\s+(OR|AND)\s+"),
    ("a comparison operator", r"=|<|>"),
    ("a parenthesis", r"\(|\)"),
    ("an arithmetic operator", r"\+|-|\*|/"),
];

const INJECTION_PATTERNS: &[(&str, &str)] = &[
    ("quoted tautology", r"'\s*OR\s+'.*?'='"),
    ("numeric tautology", r"'\s*OR\s+1=1"),
    ("string tautology", r"'\s*OR\s+'1'='1"),
    ("line comment", r"--"),
    ("stacked statement", r";.*?(DROP|DELETE|INSERT|UPDATE|CREATE|ALTER)"),
    ("UNION-based extraction", r"UNION\s+SELECT"),
    ("UNION ALL-based extraction", r"UNION\s+ALL\s+SELECT"),
    ("time-based blind (SLEEP)", r"SLEEP\s*\("),
    ("time-based blind (WAITFOR)", r"WAITFOR\s+DELAY"),
    ("time-based blind (BENCHMARK)", r"BENCHMARK\s*\("),
    ("boolean blind (AND 1=1)", r"AND\s+1=1"),
    ("boolean blind (AND 1=2)", r"AND\s+1=2"),
    ("stacked DROP", r";\s*DROP"),
    ("stacked DELETE", r";\s*DELETE"),
    ("stacked INSERT", r";\s*INSERT"),
    ("block comment", r"/\*.*?\*/"),
    ("file read (LOAD_FILE)", r"LOAD_FILE\s*\("),
    ("file write (INTO OUTFILE)", r"INTO\s+OUTFILE"),
    ("file write (INTO DUMPFILE)", r"INTO\s+DUMPFILE"),
];

static IDENTIFIER_BANK: LazyLock<PatternBank> =
    LazyLock::new(|| PatternBank::compile(IDENTIFIER_PATTERNS, true, false));

static INJECTION_BANK: LazyLock<PatternBank> =
    LazyLock::new(|| PatternBank::compile(INJECTION_PATTERNS, true, true));

/// What an identifier names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Table,
    Column,
    Database,
    Index,
    View,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Table => "table",
            IdentifierKind::Column => "column",
            IdentifierKind::Database => "database",
            IdentifierKind::Index => "index",
            IdentifierKind::View => "view",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(IdentifierKind::Table),
            "column" => Ok(IdentifierKind::Column),
            "database" => Ok(IdentifierKind::Database),
            "index" => Ok(IdentifierKind::Index),
            "view" => Ok(IdentifierKind::View),
            other => Err(format!("unknown identifier kind: {}", other)),
        }
    }
}

/// Validates table, column and other object names
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierValidator;

impl IdentifierValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_identifier(&self, name: &str, kind: IdentifierKind) -> SqlValidation {
        let name = name.trim();
        if name.is_empty() {
            return SqlValidation::reject(SqlRisk::Forbidden, format!("{} name is empty", kind));
        }

        let length = name.chars().count();
        if length > MAX_IDENTIFIER_LENGTH {
            return SqlValidation::reject(
                SqlRisk::Forbidden,
                format!(
                    "{} name is {} characters long (maximum {})",
                    kind, length, MAX_IDENTIFIER_LENGTH
                ),
            );
        }

        let upper = name.to_ascii_uppercase();
        if SQL_KEYWORDS.contains(&upper.as_str()) {
            return SqlValidation::reject(
                SqlRisk::Forbidden,
                format!("{} name '{}' is a reserved SQL keyword", kind, name),
            );
        }

        match IDENTIFIER_BANK.find(name) {
            Ok(Some(pattern)) => {
                return SqlValidation::reject(
                    SqlRisk::Dangerous,
                    format!("{} name contains {}", kind, pattern.label),
                );
            }
            Ok(None) => {}
            Err(e) => {
                return SqlValidation::reject(
                    SqlRisk::Forbidden,
                    format!("pattern check unavailable: {}", e),
                );
            }
        }

        if !is_plain_identifier(name) {
            return SqlValidation::reject(
                SqlRisk::Dangerous,
                format!(
                    "{} name must start with a letter or underscore and contain only letters, digits and underscores",
                    kind
                ),
            );
        }

        if name.contains("__") {
            debug!(identifier = name, kind = %kind, "identifier accepted with warning");
            return SqlValidation::accept(
                SqlRisk::Suspicious,
                format!("{} name contains a double underscore", kind),
            );
        }

        SqlValidation::accept(SqlRisk::Safe, format!("{} name is valid", kind))
    }

    pub fn validate_table_name(&self, name: &str) -> SqlValidation {
        self.validate_identifier(name, IdentifierKind::Table)
    }

    pub fn validate_column_name(&self, name: &str) -> SqlValidation {
        self.validate_identifier(name, IdentifierKind::Column)
    }

    /// Rewrite `name` into a plain identifier and validate the rewrite
    ///
    /// Invalid characters become `_` and a leading digit gets a `_` prefix.
    /// The rewrite can still be rejected, e.g. when it is a keyword.
    pub fn sanitize_identifier(&self, name: &str, kind: IdentifierKind) -> SqlValidation {
        let mut sanitized: String = name
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
            sanitized.insert(0, '_');
        }

        let mut result = self.validate_identifier(&sanitized, kind);
        result.sanitized = Some(sanitized);
        result
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Scans complete query strings for injection signatures
#[derive(Debug, Clone, Copy, Default)]
pub struct InjectionDetector;

impl InjectionDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect_injection(&self, query: &str) -> SqlValidation {
        if query.trim().is_empty() {
            return SqlValidation::reject(SqlRisk::Forbidden, "query is empty");
        }
        match INJECTION_BANK.find(query) {
            Ok(Some(pattern)) => SqlValidation::reject(
                SqlRisk::Dangerous,
                format!("possible SQL injection: {}", pattern.label),
            ),
            Ok(None) => SqlValidation::accept(SqlRisk::Safe, "no injection pattern detected"),
            Err(e) => SqlValidation::reject(
                SqlRisk::Forbidden,
                format!("pattern check unavailable: {}", e),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_table_name() {
        let r = IdentifierValidator::new().validate_table_name("user_profiles");
        assert!(r.is_valid);
        assert_eq!(r.risk_level, SqlRisk::Safe);
    }

    #[test]
    fn test_stacked_statement_in_table_name() {
        let r = IdentifierValidator::new().validate_table_name("users; DROP TABLE users");
        assert!(!r.is_valid);
        assert_eq!(r.risk_level, SqlRisk::Dangerous);
    }

    #[test]
    fn test_length_boundary() {
        let v = IdentifierValidator::new();
        let max = "a".repeat(64);
        assert!(v.validate_column_name(&max).is_valid);
        let over = "a".repeat(65);
        let r = v.validate_column_name(&over);
        assert!(!r.is_valid);
        assert_eq!(r.risk_level, SqlRisk::Forbidden);
    }

    #[test]
    fn test_empty_and_blank() {
        let v = IdentifierValidator::new();
        assert_eq!(v.validate_table_name("").risk_level, SqlRisk::Forbidden);
        assert!(!v.validate_table_name("   ").is_valid);
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let v = IdentifierValidator::new();
        for name in ["select", "Drop", "TABLE", "load_file"] {
            let r = v.validate_table_name(name);
            assert!(!r.is_valid, "{}", name);
            assert_eq!(r.risk_level, SqlRisk::Forbidden);
        }
        // keywords inside a longer name are fine
        assert!(v.validate_table_name("selected_items").is_valid);
    }

    #[test]
    fn test_structural_syntax_is_dangerous() {
        let v = IdentifierValidator::new();
        for name in ["a'b", "a--b", "a/*b", "a=b", "a(b)", "a+b", "a-b", "x OR y", "a\\b"] {
            let r = v.validate_column_name(name);
            assert!(!r.is_valid, "{}", name);
            assert_eq!(r.risk_level, SqlRisk::Dangerous, "{}", name);
        }
    }

    #[test]
    fn test_charset() {
        let v = IdentifierValidator::new();
        let r = v.validate_table_name("1users");
        assert!(!r.is_valid);
        assert_eq!(r.risk_level, SqlRisk::Dangerous);
        assert!(!v.validate_table_name("user name").is_valid);
        assert!(!v.validate_table_name("tábla").is_valid);
        assert!(v.validate_table_name("_private").is_valid);
    }

    #[test]
    fn test_double_underscore_is_suspicious_but_valid() {
        let r = IdentifierValidator::new().validate_table_name("app__meta");
        assert!(r.is_valid);
        assert_eq!(r.risk_level, SqlRisk::Suspicious);
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert!(IdentifierValidator::new().validate_table_name("  orders  ").is_valid);
    }

    #[test]
    fn test_sanitize_identifier() {
        let v = IdentifierValidator::new();
        let r = v.sanitize_identifier("2024 sales-report", IdentifierKind::Table);
        assert_eq!(r.sanitized.as_deref(), Some("_2024_sales_report"));
        assert!(r.is_valid);

        let r = v.sanitize_identifier("select", IdentifierKind::Table);
        assert_eq!(r.sanitized.as_deref(), Some("select"));
        assert!(!r.is_valid);
    }

    #[test]
    fn test_injection_patterns() {
        let d = InjectionDetector::new();
        for query in [
            "SELECT * FROM users WHERE name = '' OR 1=1",
            "SELECT * FROM users WHERE id = 1 UNION SELECT password FROM admins",
            "SELECT * FROM t WHERE id = 1; DROP TABLE t",
            "SELECT * FROM t WHERE a = 1 -- comment",
            "SELECT /* hidden */ 1",
            "SELECT SLEEP(5)",
            "SELECT LOAD_FILE('/etc/passwd')",
            "SELECT 1 INTO OUTFILE '/tmp/x'",
            "select * from t where id = 1 and 1=2",
            "SELECT 1;\nDELETE FROM t",
        ] {
            let r = d.detect_injection(query);
            assert!(!r.is_valid, "{}", query);
            assert_eq!(r.risk_level, SqlRisk::Dangerous, "{}", query);
        }
    }

    #[test]
    fn test_clean_query() {
        let r = InjectionDetector::new()
            .detect_injection("SELECT key, value FROM app_config WHERE key = ?");
        assert!(r.is_valid);
        assert_eq!(r.risk_level, SqlRisk::Safe);
        assert!(!InjectionDetector::new().detect_injection("").is_valid);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Column".parse::<IdentifierKind>().unwrap(), IdentifierKind::Column);
        assert!("schema".parse::<IdentifierKind>().is_err());
    }
}
