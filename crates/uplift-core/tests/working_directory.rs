//! Defaults that depend on the process working directory.
//!
//! Every test here changes the working directory, so they run serially.

use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use uplift_core::{AccessMode, PathValidator, SecurityConfig, SecurityProfile, SecuritySuite};

struct CwdGuard(PathBuf);

impl CwdGuard {
    fn enter(dir: &Path) -> Self {
        let previous = env::current_dir().unwrap();
        env::set_current_dir(dir).unwrap();
        Self(previous)
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.0);
    }
}

#[test]
#[serial]
fn test_default_directories_follow_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let _guard = CwdGuard::enter(&root);

    let validator = PathValidator::new(Vec::<PathBuf>::new());
    let allowed = validator.allowed_directories();
    assert!(allowed.contains(&root));
    assert!(allowed.contains(&root.join("uploads")));
    assert_eq!(validator.base_directory(), root.as_path());
}

#[test]
#[serial]
fn test_relative_paths_resolve_against_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    fs::write(root.join("notes.txt"), "hello").unwrap();
    let _guard = CwdGuard::enter(&root);

    let validator = PathValidator::new(Vec::<PathBuf>::new());
    let result = validator.validate("notes.txt", AccessMode::Read);
    assert!(result.is_valid, "{}", result.reason);
    assert_eq!(result.resolved_path, Some(root.join("notes.txt")));
}

#[test]
#[serial]
fn test_suite_without_directories_confines_to_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let _guard = CwdGuard::enter(&root);

    let suite =
        SecuritySuite::from_config(&SecurityConfig::for_profile(SecurityProfile::Permissive))
            .unwrap();
    let outside = root.parent().unwrap().join("elsewhere.txt");
    assert!(!suite.paths().validate(&outside, AccessMode::Read).is_valid);
    assert!(suite.paths().validate("draft.txt", AccessMode::Create).is_valid);
}
