//! Compiled regex banks shared by the validators.
//!
//! A bank either compiles completely or not at all. Callers treat an
//! uncompiled bank as a rejection, so a bad pattern can never open a hole.

use regex::{Regex, RegexBuilder};

/// A compiled pattern with the label used in rejection reasons
#[derive(Debug)]
pub(crate) struct Pattern {
    pub label: &'static str,
    regex: Regex,
}

impl Pattern {
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

#[derive(Debug)]
pub(crate) struct PatternBank {
    compiled: Result<Vec<Pattern>, String>,
}

impl PatternBank {
    /// Compile `(label, pattern)` pairs
    pub fn compile(
        specs: &[(&'static str, &'static str)],
        case_insensitive: bool,
        dot_matches_new_line: bool,
    ) -> Self {
        let compiled = specs
            .iter()
            .map(|&(label, source)| {
                RegexBuilder::new(source)
                    .case_insensitive(case_insensitive)
                    .dot_matches_new_line(dot_matches_new_line)
                    .build()
                    .map(|regex| Pattern { label, regex })
                    .map_err(|e| format!("pattern `{}` failed to compile: {}", source, e))
            })
            .collect();
        Self { compiled }
    }

    /// First pattern matching `haystack`, in declaration order
    pub fn find(&self, haystack: &str) -> Result<Option<&Pattern>, &str> {
        match &self.compiled {
            Ok(patterns) => Ok(patterns.iter().find(|p| p.is_match(haystack))),
            Err(e) => Err(e.as_str()),
        }
    }

    pub fn len(&self) -> usize {
        self.compiled.as_ref().map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_reports_first_match() {
        let bank = PatternBank::compile(&[("semicolon", ";"), ("pipe", r"\|")], false, false);
        let hit = bank.find("a | b ; c").unwrap().unwrap();
        assert_eq!(hit.label, "semicolon");
        assert!(bank.find("plain").unwrap().is_none());
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn test_bad_pattern_poisons_whole_bank() {
        let bank = PatternBank::compile(&[("ok", "a"), ("broken", "(")], false, false);
        assert!(bank.find("a").is_err());
        assert_eq!(bank.len(), 0);
    }

    #[test]
    fn test_flags_apply() {
        let bank = PatternBank::compile(&[("comment", r"/\*.*?\*/")], true, true);
        assert!(bank.find("SELECT /* multi\nline */ 1").unwrap().is_some());
    }
}
