//! Capability permissions a plugin may require.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "file.read")]
    FileRead,
    #[serde(rename = "file.write")]
    FileWrite,
    #[serde(rename = "file.delete")]
    FileDelete,
    #[serde(rename = "network.access")]
    NetworkAccess,
    #[serde(rename = "network.bind")]
    NetworkBind,
    #[serde(rename = "process.spawn")]
    ProcessSpawn,
    #[serde(rename = "process.kill")]
    ProcessKill,
    #[serde(rename = "system.info")]
    SystemInfo,
    #[serde(rename = "system.modify")]
    SystemModify,
    #[serde(rename = "database.read")]
    DatabaseRead,
    #[serde(rename = "database.write")]
    DatabaseWrite,
    #[serde(rename = "api.call")]
    ApiCall,
}

impl Permission {
    pub const ALL: [Permission; 12] = [
        Permission::FileRead,
        Permission::FileWrite,
        Permission::FileDelete,
        Permission::NetworkAccess,
        Permission::NetworkBind,
        Permission::ProcessSpawn,
        Permission::ProcessKill,
        Permission::SystemInfo,
        Permission::SystemModify,
        Permission::DatabaseRead,
        Permission::DatabaseWrite,
        Permission::ApiCall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::FileRead => "file.read",
            Permission::FileWrite => "file.write",
            Permission::FileDelete => "file.delete",
            Permission::NetworkAccess => "network.access",
            Permission::NetworkBind => "network.bind",
            Permission::ProcessSpawn => "process.spawn",
            Permission::ProcessKill => "process.kill",
            Permission::SystemInfo => "system.info",
            Permission::SystemModify => "system.modify",
            Permission::DatabaseRead => "database.read",
            Permission::DatabaseWrite => "database.write",
            Permission::ApiCall => "api.call",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown permission: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_forms_round_trip() {
        for p in Permission::ALL {
            assert_eq!(p.as_str().parse::<Permission>().unwrap(), p);
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p.as_str()));
        }
        assert!("file.execute".parse::<Permission>().is_err());
    }
}
