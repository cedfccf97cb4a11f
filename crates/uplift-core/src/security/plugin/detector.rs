//! Syntax-tree scan of Python plugin source.
//!
//! The source is parsed with tree-sitter and every node is visited. Text
//! matching alone would miss aliased imports and flag string literals, so
//! only real call and import nodes count.

use super::permission::Permission;
use crate::security::result::PluginValidation;
use crate::security::risk::{PluginRisk, RiskTier};
use std::collections::BTreeSet;
use tracing::debug;
use tree_sitter::{Node, Parser};

/// Builtins whose call makes a plugin Critical
pub const DANGEROUS_BUILTINS: &[&str] = &[
    "eval",
    "exec",
    "compile",
    "__import__",
    "open",
    "file",
    "input",
    "raw_input",
    "execfile",
    "reload",
];

/// Risk and implied permissions of importing a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleRule {
    pub module: &'static str,
    pub risk: PluginRisk,
    pub permissions: &'static [Permission],
}

const fn rule(
    module: &'static str,
    risk: PluginRisk,
    permissions: &'static [Permission],
) -> ModuleRule {
    ModuleRule {
        module,
        risk,
        permissions,
    }
}

const MODULE_RULES: &[ModuleRule] = &[
    // process and OS control
    rule("os", PluginRisk::High, &[Permission::SystemInfo, Permission::FileRead]),
    rule("sys", PluginRisk::High, &[Permission::SystemInfo]),
    rule("subprocess", PluginRisk::High, &[Permission::ProcessSpawn]),
    rule("ctypes", PluginRisk::High, &[Permission::SystemModify]),
    rule("cffi", PluginRisk::High, &[Permission::SystemModify]),
    // network
    rule("socket", PluginRisk::Medium, &[Permission::NetworkAccess]),
    rule("requests", PluginRisk::Medium, &[Permission::NetworkAccess]),
    rule("urllib", PluginRisk::Medium, &[Permission::NetworkAccess]),
    rule("http", PluginRisk::Medium, &[Permission::NetworkAccess]),
    rule("ftplib", PluginRisk::Medium, &[Permission::NetworkAccess]),
    rule("telnetlib", PluginRisk::Medium, &[Permission::NetworkAccess]),
    // object deserialization
    rule("pickle", PluginRisk::Medium, &[]),
    rule("shelve", PluginRisk::Medium, &[]),
    rule("marshal", PluginRisk::Medium, &[]),
    // databases
    rule("sqlite3", PluginRisk::Medium, &[Permission::DatabaseRead]),
    rule("psycopg2", PluginRisk::Medium, &[Permission::DatabaseRead]),
    rule("mysql", PluginRisk::Medium, &[Permission::DatabaseRead]),
];

/// Rule for a top-level module name, if it is considered dangerous
pub fn module_rule(module: &str) -> Option<&'static ModuleRule> {
    MODULE_RULES.iter().find(|r| r.module == module)
}

#[derive(Debug)]
struct Findings {
    risk: PluginRisk,
    permissions: BTreeSet<Permission>,
    patterns: Vec<String>,
}

impl Findings {
    fn new() -> Self {
        Self {
            risk: PluginRisk::Safe,
            permissions: BTreeSet::new(),
            patterns: Vec::new(),
        }
    }

    fn builtin(&mut self, name: &str, line: usize) {
        self.risk = self.risk.max(PluginRisk::Critical);
        self.patterns
            .push(format!("line {}: call to dangerous builtin '{}'", line, name));
    }

    fn import(&mut self, dotted: &str, line: usize) {
        let top = dotted.split('.').next().unwrap_or(dotted).trim();
        if let Some(rule) = module_rule(top) {
            self.risk = self.risk.max(rule.risk);
            self.permissions.extend(rule.permissions.iter().copied());
            self.patterns
                .push(format!("line {}: import of dangerous module '{}'", line, top));
        }
    }
}

/// Flags dangerous calls and imports in Python source
#[derive(Debug, Clone, Copy, Default)]
pub struct DangerousPatternDetector;

impl DangerousPatternDetector {
    pub fn new() -> Self {
        Self
    }

    /// Static analysis of `source`; valid iff the final risk is below Critical
    pub fn analyze_code(&self, source: &str) -> PluginValidation {
        if source.trim().is_empty() {
            return PluginValidation::reject(PluginRisk::Critical, "plugin source is empty");
        }

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
            return PluginValidation::reject(
                PluginRisk::Critical,
                format!("python grammar unavailable: {}", e),
            );
        }
        let Some(tree) = parser.parse(source, None) else {
            return PluginValidation::reject(PluginRisk::Critical, "plugin source could not be parsed");
        };

        let root = tree.root_node();
        if root.has_error() {
            return PluginValidation::reject(
                PluginRisk::Critical,
                format!("syntax error at line {}", first_error_line(root)),
            );
        }

        let bytes = source.as_bytes();
        let mut findings = Findings::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            inspect(node, bytes, &mut findings);
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        let is_valid = !findings.risk.rejects();
        let reason = if findings.patterns.is_empty() {
            "static analysis passed".to_string()
        } else {
            format!("{} dangerous pattern(s) detected", findings.patterns.len())
        };
        debug!(risk = %findings.risk, patterns = findings.patterns.len(), "plugin source analyzed");

        PluginValidation {
            is_valid,
            risk_level: findings.risk,
            reason,
            signature_valid: true,
            static_analysis_passed: is_valid,
            permissions_required: findings.permissions,
            dangerous_patterns: findings.patterns,
        }
    }
}

fn inspect(node: Node<'_>, source: &[u8], findings: &mut Findings) {
    let line = node.start_position().row + 1;
    match node.kind() {
        "call" => {
            if let Some(name) = node
                .child_by_field_name("function")
                .and_then(|f| called_builtin(f, source))
            {
                findings.builtin(name, line);
            }
        }
        "exec_statement" => findings.builtin("exec", line),
        "import_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                let dotted = match name.kind() {
                    "aliased_import" => name.child_by_field_name("name"),
                    _ => Some(name),
                };
                if let Some(dotted) = dotted {
                    findings.import(text(dotted, source), line);
                }
            }
        }
        "import_from_statement" => {
            // relative imports load plugin-local modules
            if let Some(module) = node
                .child_by_field_name("module_name")
                .filter(|m| m.kind() == "dotted_name")
            {
                findings.import(text(module, source), line);
            }
        }
        _ => {}
    }
}

/// Name of the dangerous builtin a call targets: `eval(...)` or `builtins.eval(...)`
fn called_builtin<'s>(function: Node<'_>, source: &'s [u8]) -> Option<&'s str> {
    let name = match function.kind() {
        "identifier" => text(function, source),
        "attribute" => {
            let object = function.child_by_field_name("object")?;
            if !matches!(text(object, source), "builtins" | "__builtins__") {
                return None;
            }
            text(function.child_by_field_name("attribute")?, source)
        }
        _ => return None,
    };
    DANGEROUS_BUILTINS.contains(&name).then_some(name)
}

fn text<'s>(node: Node<'_>, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

fn first_error_line(root: Node<'_>) -> usize {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return node.start_position().row + 1;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    root.start_position().row + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(source: &str) -> PluginValidation {
        DangerousPatternDetector::new().analyze_code(source)
    }

    #[test]
    fn test_clean_source() {
        let r = analyze("def run(x):\n    return x * 2\n");
        assert!(r.is_valid);
        assert_eq!(r.risk_level, PluginRisk::Safe);
        assert!(r.permissions_required.is_empty());
        assert!(r.dangerous_patterns.is_empty());
        assert!(r.static_analysis_passed);
    }

    #[test]
    fn test_subprocess_implies_process_spawn() {
        let r = analyze("import subprocess\nsubprocess.run(['ls'])\n");
        assert!(r.is_valid);
        assert_eq!(r.risk_level, PluginRisk::High);
        assert!(r.permissions_required.contains(&Permission::ProcessSpawn));
        assert_eq!(r.dangerous_patterns.len(), 1);
    }

    #[test]
    fn test_dangerous_builtin_is_critical() {
        let r = analyze("data = input()\nresult = eval(data)\n");
        assert!(!r.is_valid);
        assert_eq!(r.risk_level, PluginRisk::Critical);
        assert!(!r.static_analysis_passed);
        assert!(r.dangerous_patterns.iter().any(|p| p.contains("'eval'")));
        assert!(r.dangerous_patterns[0].starts_with("line 1"));
    }

    #[test]
    fn test_builtins_module_call_is_critical() {
        let r = analyze("import builtins\nbuiltins.exec('print(1)')\n");
        assert_eq!(r.risk_level, PluginRisk::Critical);
    }

    #[test]
    fn test_method_named_like_builtin_is_fine() {
        let r = analyze("model.eval()\nparser.compile()\n");
        assert!(r.is_valid);
        assert_eq!(r.risk_level, PluginRisk::Safe);
    }

    #[test]
    fn test_syntax_error_is_critical() {
        let r = analyze("x = 1\ndef broken(:\n    pass\n");
        assert!(!r.is_valid);
        assert_eq!(r.risk_level, PluginRisk::Critical);
        assert!(r.reason.contains("syntax error"));
    }

    #[test]
    fn test_empty_source_rejected() {
        assert_eq!(analyze("  \n").risk_level, PluginRisk::Critical);
    }

    #[test]
    fn test_from_import_uses_top_level_module() {
        let r = analyze("from os.path import join\n");
        assert_eq!(r.risk_level, PluginRisk::High);
        assert!(r.permissions_required.contains(&Permission::SystemInfo));
        assert!(r.permissions_required.contains(&Permission::FileRead));
    }

    #[test]
    fn test_aliased_and_dotted_imports() {
        let r = analyze("import json, urllib.request as ur\n");
        assert_eq!(r.risk_level, PluginRisk::Medium);
        assert!(r.permissions_required.contains(&Permission::NetworkAccess));

        let r = analyze("import subprocess as sp\n");
        assert_eq!(r.risk_level, PluginRisk::High);
    }

    #[test]
    fn test_relative_imports_ignored() {
        let r = analyze("from . import os\nfrom .sys import helper\n");
        assert_eq!(r.risk_level, PluginRisk::Safe);
    }

    #[test]
    fn test_string_literals_are_not_imports() {
        let r = analyze("code = \"import os; eval('1')\"\n");
        assert_eq!(r.risk_level, PluginRisk::Safe);
    }

    #[test]
    fn test_escalation_keeps_highest() {
        let r = analyze("import subprocess\nimport requests\nimport sqlite3\n");
        assert_eq!(r.risk_level, PluginRisk::High);
        assert_eq!(r.dangerous_patterns.len(), 3);
        assert!(r.permissions_required.contains(&Permission::DatabaseRead));
        assert!(r.permissions_required.contains(&Permission::NetworkAccess));
    }

    #[test]
    fn test_module_rules() {
        assert_eq!(module_rule("pickle").map(|r| r.risk), Some(PluginRisk::Medium));
        assert!(module_rule("json").is_none());
    }
}
