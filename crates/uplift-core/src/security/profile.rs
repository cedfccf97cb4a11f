//! Named security presets.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Preset resolved once, at construction, into concrete validator settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityProfile {
    /// Refuse anything not explicitly needed; signatures required
    #[default]
    Strict,
    /// File-creating commands, followed symlinks, signatures optional
    Moderate,
    /// Development use; plugin permissions unrestricted
    Permissive,
}

impl SecurityProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityProfile::Strict => "strict",
            SecurityProfile::Moderate => "moderate",
            SecurityProfile::Permissive => "permissive",
        }
    }

    /// Whether a missing secret key may fall back to the built-in development key
    pub fn allows_default_key(&self) -> bool {
        !matches!(self, SecurityProfile::Strict)
    }

    pub fn all() -> [SecurityProfile; 3] {
        [
            SecurityProfile::Strict,
            SecurityProfile::Moderate,
            SecurityProfile::Permissive,
        ]
    }
}

impl fmt::Display for SecurityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(SecurityProfile::Strict),
            "moderate" => Ok(SecurityProfile::Moderate),
            "permissive" => Ok(SecurityProfile::Permissive),
            _ => Err(ConfigError::InvalidProfile(s.to_string())),
        }
    }
}
