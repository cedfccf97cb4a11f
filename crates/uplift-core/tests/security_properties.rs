//! Property tests over the validator families

use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;
use uplift_core::security::signature::{sign, verify};
use uplift_core::{
    CommandRisk, CommandValidator, IdentifierValidator, PathValidator, PluginRisk,
    RiskTier, SqlRisk,
};

const SAFE_WORDS: &[&str] = &["ls", "cat", "grep", "wc", "head", "echo", "sort"];

/// Fragments the raw-pattern scan rejects, excluding line breaks which the
/// tokenizer treats as plain whitespace
const INJECTIONS: &[&str] = &[
    "; rm -rf x",
    " && whoami",
    " | tee out",
    " $(id)",
    " `id`",
    " > /dev/sda",
    " /etc/shadow",
    " /root/.bashrc",
    " /proc/self/environ",
    " /sys/kernel",
    " ../../secret",
    " ~/secret",
    " &",
];

fn tier_strategy<R: RiskTier>() -> impl Strategy<Value = R> {
    prop::sample::select(R::all().to_vec())
}

proptest! {
    #[test]
    fn escalation_is_monotonic(
        levels in prop::collection::vec(tier_strategy::<PluginRisk>(), 1..20)
    ) {
        let mut current = PluginRisk::LOWEST;
        for level in levels {
            let next = current.escalate(level);
            prop_assert!(next >= current);
            prop_assert!(next >= level);
            current = next;
        }
    }

    #[test]
    fn sql_escalation_is_monotonic(a in tier_strategy::<SqlRisk>(), b in tier_strategy::<SqlRisk>()) {
        prop_assert_eq!(a.escalate(b), b.escalate(a));
        prop_assert!(a.escalate(b) >= a);
    }

    #[test]
    fn command_validity_matches_threshold(
        word in prop::sample::select(SAFE_WORDS.to_vec()),
        arg in "[a-z0-9_./-]{0,12}",
        injection in prop::option::of(prop::sample::select(INJECTIONS.to_vec())),
        allow_dangerous in any::<bool>(),
    ) {
        let validator = CommandValidator::new(allow_dangerous);
        let command = format!("{} {}{}", word, arg, injection.unwrap_or(""));
        let result = validator.validate(&command);
        if result.is_valid {
            prop_assert!(result.risk_level < validator.rejection_threshold());
        } else {
            prop_assert!(!result.reason.is_empty());
        }
        if result.risk_level >= validator.rejection_threshold() {
            prop_assert!(!result.is_valid);
        }
        if injection.is_some() {
            prop_assert!(!result.is_valid);
            prop_assert_eq!(result.risk_level, CommandRisk::Forbidden);
        }
    }

    #[test]
    fn raw_pattern_rejections_survive_tokenization(
        word in prop::sample::select(SAFE_WORDS.to_vec()),
        injection in prop::sample::select(INJECTIONS.to_vec()),
    ) {
        // Whatever the raw scan rejects must also fail once the scan is
        // bypassed: either the tokenizer refuses it or a token check does.
        let command = format!("{}{}", word, injection);
        prop_assert!(!CommandValidator::new(true).validate(&command).is_valid);
        if let Ok(tokens) = shell_words::split(&command) {
            let tokenized = CommandValidator::new(true).validate_tokens(&tokens);
            prop_assert!(!tokenized.is_valid, "{:?} -> {:?}", command, tokens);
        }
    }

    #[test]
    fn signature_round_trip(
        payload in prop::collection::vec(any::<u8>(), 0..256),
        other in prop::collection::vec(any::<u8>(), 0..256),
        key in prop::collection::vec(any::<u8>(), 1..64),
    ) {
        let sig = sign(&payload, &key).unwrap();
        prop_assert!(verify(&payload, &sig, &key));
        if payload != other {
            prop_assert!(!verify(&other, &sig, &key));
        }
    }

    #[test]
    fn identifier_validity_matches_threshold(name in "\\PC{0,70}") {
        let result = IdentifierValidator::new().validate_table_name(&name);
        prop_assert_eq!(result.is_valid, !result.risk_level.rejects());
        if !result.is_valid {
            prop_assert!(!result.reason.is_empty());
        }
    }

    #[test]
    fn plain_identifiers_up_to_64_chars_pass(name in "[a-z][a-z0-9]{0,63}") {
        let upper = name.to_ascii_uppercase();
        prop_assume!(!uplift_core::security::sql::SQL_KEYWORDS.contains(&upper.as_str()));
        prop_assert!(IdentifierValidator::new().validate_column_name(&name).is_valid);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn canonicalization_is_idempotent(
        segments in prop::collection::vec("[a-z]{1,6}|\\.|\\.\\.", 1..8)
    ) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        let validator = PathValidator::new([tmp.path().to_path_buf()]);
        let relative = segments.join("/");
        // paths running through an existing file cannot be resolved at all
        let Ok(once) = validator.canonicalize(tmp.path().join(&relative)) else {
            return Ok(());
        };
        let twice = validator.canonicalize(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn path_validity_matches_threshold(name in "[a-zA-Z0-9_./~-]{1,24}") {
        let tmp = TempDir::new().unwrap();
        let validator = PathValidator::new([tmp.path().to_path_buf()]);
        let result = validator.validate(tmp.path().join(&name), uplift_core::AccessMode::Read);
        prop_assert_eq!(result.is_valid, !result.risk_level.rejects());
        prop_assert_eq!(result.is_valid, result.resolved_path.is_some());
    }
}
