//! Filesystem path validation against an allowed-directory whitelist.

use super::profile::SecurityProfile;
use super::result::PathValidation;
use super::risk::PathRisk;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

/// System directories that are never accessible
const SENSITIVE_DIRECTORIES: &[&str] = &[
    "/etc", "/root", "/proc", "/sys", "/dev", "/boot", "/usr/bin", "/usr/sbin", "/sbin", "/bin",
    "/var/log", "/var/run",
];

/// Credential directories, matched as any path component
const SENSITIVE_COMPONENTS: &[&str] = &[".ssh", ".aws", ".kube"];

/// Matched as substrings of the final file name
const SENSITIVE_FILE_FRAGMENTS: &[&str] = &[
    "passwd",
    "shadow",
    "sudoers",
    "id_rsa",
    "id_dsa",
    "id_ecdsa",
    "id_ed25519",
    "authorized_keys",
    "known_hosts",
    ".env",
];

/// Kind of access a caller intends to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    Write,
    Create,
    Delete,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Read => "read",
            AccessMode::Write => "write",
            AccessMode::Create => "create",
            AccessMode::Delete => "delete",
        }
    }

    /// Modifying modes need an existing, writable parent directory
    pub fn modifies(&self) -> bool {
        !matches!(self, AccessMode::Read)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(AccessMode::Read),
            "write" => Ok(AccessMode::Write),
            "create" => Ok(AccessMode::Create),
            "delete" => Ok(AccessMode::Delete),
            other => Err(format!("unknown access mode: {}", other)),
        }
    }
}

/// Canonical directories a path must fall under
///
/// Read on every validation and mutable at runtime, so it sits behind a lock.
#[derive(Debug, Default)]
pub struct AllowedDirectorySet {
    dirs: RwLock<Vec<PathBuf>>,
}

impl AllowedDirectorySet {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        let mut unique = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if !unique.contains(&dir) {
                unique.push(dir);
            }
        }
        Self {
            dirs: RwLock::new(unique),
        }
    }

    /// Returns `false` if the directory was already present
    pub fn add(&self, dir: PathBuf) -> bool {
        let mut dirs = self.dirs.write();
        if dirs.contains(&dir) {
            return false;
        }
        dirs.push(dir);
        true
    }

    pub fn remove(&self, dir: &Path) -> bool {
        let mut dirs = self.dirs.write();
        let before = dirs.len();
        dirs.retain(|d| d != dir);
        dirs.len() != before
    }

    /// First configured directory that equals or contains `path`
    pub fn matching(&self, path: &Path) -> Option<PathBuf> {
        self.dirs
            .read()
            .iter()
            .find(|dir| path.starts_with(dir))
            .cloned()
    }

    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.dirs.read().clone()
    }

    pub fn len(&self) -> usize {
        self.dirs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.read().is_empty()
    }

    fn describe(&self) -> String {
        let dirs = self.dirs.read();
        if dirs.is_empty() {
            return "none configured".to_string();
        }
        dirs.iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Construction-time path policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPolicy {
    /// Empty means the working-directory defaults
    pub allowed_directories: Vec<PathBuf>,
    pub allow_symlinks: bool,
    /// Relative paths resolve against this; defaults to the working directory
    pub base_directory: Option<PathBuf>,
}

impl PathPolicy {
    pub fn for_profile(profile: SecurityProfile, allowed_directories: Vec<PathBuf>) -> Self {
        Self {
            allowed_directories,
            allow_symlinks: profile != SecurityProfile::Strict,
            base_directory: None,
        }
    }
}

/// Validates paths before any filesystem access
#[derive(Debug)]
pub struct PathValidator {
    base_directory: PathBuf,
    allowed: AllowedDirectorySet,
    allow_symlinks: bool,
}

impl PathValidator {
    /// Validator over `allowed_directories` with symlinks refused
    pub fn new<I, P>(allowed_directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_policy(PathPolicy {
            allowed_directories: allowed_directories.into_iter().map(Into::into).collect(),
            ..PathPolicy::default()
        })
    }

    pub fn with_policy(policy: PathPolicy) -> Self {
        let base_directory = policy
            .base_directory
            .unwrap_or_else(|| {
                std::env::current_dir()
                    .ok()
                    .or_else(dirs::home_dir)
                    .unwrap_or_else(|| PathBuf::from("/"))
            });
        let requested = if policy.allowed_directories.is_empty() {
            default_directories(&base_directory)
        } else {
            policy.allowed_directories
        };

        let mut validator = Self {
            base_directory,
            allowed: AllowedDirectorySet::default(),
            allow_symlinks: policy.allow_symlinks,
        };
        let dirs = requested
            .iter()
            .filter_map(|dir| match validator.canonicalize(dir) {
                Ok(real) => Some(real),
                Err(e) => {
                    warn!(
                        directory = %dir.display(),
                        error = %e,
                        "dropping unresolvable allowed directory"
                    );
                    None
                }
            })
            .collect();
        validator.allowed = AllowedDirectorySet::new(dirs);
        validator
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn allows_symlinks(&self) -> bool {
        self.allow_symlinks
    }

    pub fn allowed_directories(&self) -> Vec<PathBuf> {
        self.allowed.snapshot()
    }

    /// Add a directory at runtime; returns its canonical form
    pub fn add_allowed_directory(&self, dir: impl AsRef<Path>) -> io::Result<PathBuf> {
        let canonical = self.canonicalize(dir)?;
        if self.allowed.add(canonical.clone()) {
            info!(directory = %canonical.display(), "allowed directory added");
        }
        Ok(canonical)
    }

    pub fn remove_allowed_directory(&self, dir: impl AsRef<Path>) -> bool {
        let dir = dir.as_ref();
        let target = self
            .canonicalize(dir)
            .unwrap_or_else(|_| dir.to_path_buf());
        let removed = self.allowed.remove(&target);
        if removed {
            info!(directory = %target.display(), "allowed directory removed");
        }
        removed
    }

    /// Absolute real path of `path`
    ///
    /// Expands `~`, anchors relative paths at the base directory and resolves
    /// `.`, `..` and symlinks. Paths that do not exist yet resolve through
    /// their deepest existing ancestor.
    pub fn canonicalize(&self, path: impl AsRef<Path>) -> io::Result<PathBuf> {
        resolve_existing(&normalize_lexically(&self.absolute(path.as_ref())))
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        let expanded = match path.to_str() {
            Some(s) if s.starts_with('~') => PathBuf::from(shellexpand::tilde(s).as_ref()),
            _ => path.to_path_buf(),
        };
        if expanded.is_absolute() {
            expanded
        } else {
            self.base_directory.join(expanded)
        }
    }

    #[instrument(level = "debug", skip_all, fields(mode = %mode))]
    pub fn validate(&self, path: impl AsRef<Path>, mode: AccessMode) -> PathValidation {
        let path = path.as_ref();
        let raw = path.to_string_lossy();

        if raw.trim().is_empty() {
            return PathValidation::reject(PathRisk::Forbidden, "path is empty");
        }
        if raw.contains('\0') {
            return PathValidation::reject(PathRisk::Forbidden, "path contains a NUL byte");
        }
        if raw.contains("..") {
            return PathValidation::reject(PathRisk::Dangerous, "path traversal sequence '..' detected");
        }
        if raw.contains("//") || raw.contains("\\\\") {
            return PathValidation::reject(PathRisk::Dangerous, "repeated path separator detected");
        }

        let canonical = match self.canonicalize(path) {
            Ok(p) => p,
            Err(e) => {
                return PathValidation::reject(
                    PathRisk::Dangerous,
                    format!("path could not be resolved: {}", e),
                );
            }
        };

        if let Some(hit) = sensitive_location(&canonical) {
            return PathValidation::reject(
                PathRisk::Forbidden,
                format!("access to sensitive location {} is not allowed", hit),
            );
        }

        let Some(mut allowed_directory) = self.allowed.matching(&canonical) else {
            return PathValidation::reject(
                PathRisk::Forbidden,
                format!(
                    "path {} is outside the allowed directories ({})",
                    canonical.display(),
                    self.allowed.describe()
                ),
            );
        };

        let lexical = normalize_lexically(&self.absolute(path));
        let is_symlink = fs::symlink_metadata(&lexical)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if is_symlink {
            if !self.allow_symlinks {
                return PathValidation::reject(
                    PathRisk::Dangerous,
                    format!("{} is a symbolic link and symlinks are not allowed", lexical.display()),
                );
            }
            let target = match fs::canonicalize(&lexical) {
                Ok(t) => t,
                Err(e) => {
                    return PathValidation::reject(
                        PathRisk::Dangerous,
                        format!("symbolic link target could not be resolved: {}", e),
                    );
                }
            };
            match self.allowed.matching(&target) {
                Some(dir) if sensitive_location(&target).is_none() => allowed_directory = dir,
                _ => {
                    return PathValidation::reject(
                        PathRisk::Forbidden,
                        format!(
                            "symbolic link target {} escapes the allowed directories",
                            target.display()
                        ),
                    );
                }
            }
        }

        if mode.modifies() {
            let Some(parent) = canonical.parent() else {
                return PathValidation::reject(
                    PathRisk::Dangerous,
                    format!("{} has no parent directory", canonical.display()),
                );
            };
            if !parent.is_dir() {
                return PathValidation::reject(
                    PathRisk::Dangerous,
                    format!("parent directory {} does not exist", parent.display()),
                );
            }
            if !is_writable(parent) {
                return PathValidation::reject(
                    PathRisk::Forbidden,
                    format!("parent directory {} is not writable", parent.display()),
                );
            }
        }

        debug!(resolved = %canonical.display(), "path accepted");
        PathValidation::accept(canonical, allowed_directory)
    }
}

fn default_directories(base: &Path) -> Vec<PathBuf> {
    vec![
        base.to_path_buf(),
        base.join("data"),
        base.join("temp"),
        base.join("uploads"),
    ]
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor and re-attach the rest
fn resolve_existing(path: &Path) -> io::Result<PathBuf> {
    for ancestor in path.ancestors() {
        match fs::canonicalize(ancestor) {
            Ok(real) => {
                let rest = path.strip_prefix(ancestor).map_err(io::Error::other)?;
                return Ok(if rest.as_os_str().is_empty() {
                    real
                } else {
                    real.join(rest)
                });
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no existing ancestor for {}", path.display()),
    ))
}

fn sensitive_location(path: &Path) -> Option<String> {
    if let Some(dir) = SENSITIVE_DIRECTORIES
        .iter()
        .find(|dir| path.starts_with(dir))
    {
        return Some((*dir).to_string());
    }
    if let Some(component) = path.components().find_map(|c| match c {
        Component::Normal(part) => SENSITIVE_COMPONENTS
            .iter()
            .find(|s| part == **s)
            .copied(),
        _ => None,
    }) {
        return Some(component.to_string());
    }
    let name = path.file_name()?.to_string_lossy();
    SENSITIVE_FILE_FRAGMENTS
        .iter()
        .find(|fragment| name.contains(*fragment))
        .map(|fragment| format!("'{}' file", fragment))
}

#[cfg(unix)]
fn is_writable(dir: &Path) -> bool {
    nix::unistd::access(dir, nix::unistd::AccessFlags::W_OK).is_ok()
}

#[cfg(not(unix))]
fn is_writable(dir: &Path) -> bool {
    fs::metadata(dir)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}
