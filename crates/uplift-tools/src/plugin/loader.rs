//! The unsafe primitive: whatever actually brings plugin code to life

use crate::error::ToolResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uplift_core::security::signature::sha256_hex;

/// Loads source that has already been approved
///
/// Implementations run or register the code; they never see source that
/// failed validation.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    type Handle: Clone + Send + Sync + 'static;

    async fn load(&self, name: &str, path: &Path, source: &str) -> ToolResult<Self::Handle>;
}

/// Metadata for a module handed to the host runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedModule {
    pub name: String,
    pub path: PathBuf,
    pub code_hash: String,
    pub size_bytes: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Keeps approved sources in memory for an embedding interpreter to pick up
#[derive(Debug, Default)]
pub struct SourceModuleLoader {
    sources: RwLock<BTreeMap<String, Arc<str>>>,
}

impl SourceModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source of a loaded module
    pub fn source(&self, name: &str) -> Option<Arc<str>> {
        self.sources.read().get(name).cloned()
    }
}

#[async_trait]
impl ModuleLoader for SourceModuleLoader {
    type Handle = Arc<LoadedModule>;

    async fn load(&self, name: &str, path: &Path, source: &str) -> ToolResult<Self::Handle> {
        let module = LoadedModule {
            name: name.to_string(),
            path: path.to_path_buf(),
            code_hash: sha256_hex(source.as_bytes()),
            size_bytes: source.len(),
            loaded_at: Utc::now(),
        };
        self.sources.write().insert(name.to_string(), Arc::from(source));
        debug!(module = name, hash = %module.code_hash, "module source registered");
        Ok(Arc::new(module))
    }
}
