//! `SecureEditTool`: path validation in front of `FileEditor`

use super::editor::FileEditor;
use super::manager::SecurePathManager;
use crate::error::ToolResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};
use uplift_core::{AccessMode, PathValidator, SecuritySuite};

/// One editor operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditCommand {
    View {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        view_range: Option<(usize, usize)>,
    },
    Create {
        file_text: String,
    },
    StrReplace {
        old_str: String,
        new_str: String,
    },
    Insert {
        insert_line: usize,
        new_str: String,
    },
    UndoEdit,
}

impl EditCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::View { .. } => "view",
            Self::Create { .. } => "create",
            Self::StrReplace { .. } => "str_replace",
            Self::Insert { .. } => "insert",
            Self::UndoEdit => "undo_edit",
        }
    }

    /// The access the command needs on its target
    pub fn access_mode(&self) -> AccessMode {
        match self {
            Self::View { .. } => AccessMode::Read,
            Self::Create { .. } => AccessMode::Create,
            Self::StrReplace { .. } | Self::Insert { .. } | Self::UndoEdit => AccessMode::Write,
        }
    }
}

/// File edits restricted to validated, canonical paths
#[derive(Debug)]
pub struct SecureEditTool {
    paths: SecurePathManager,
    editor: FileEditor,
}

impl SecureEditTool {
    pub fn new(validator: Arc<PathValidator>) -> Self {
        Self::with_manager(SecurePathManager::new(validator))
    }

    pub fn with_manager(paths: SecurePathManager) -> Self {
        Self {
            paths,
            editor: FileEditor::new(),
        }
    }

    pub fn from_suite(suite: &SecuritySuite) -> Self {
        Self::with_manager(SecurePathManager::from_suite(suite))
    }

    pub fn paths(&self) -> &SecurePathManager {
        &self.paths
    }

    /// Validate `path` for the command's access mode, then run it on the
    /// resolved path
    #[instrument(skip(self, command), fields(command = command.name(), path = %path.display()))]
    pub async fn execute(&self, path: &Path, command: EditCommand) -> ToolResult<String> {
        let resolved = self.paths.require(path, command.access_mode())?;
        debug!(resolved = %resolved.display(), "running edit");

        match command {
            EditCommand::View { view_range } => self.editor.view(&resolved, view_range).await,
            EditCommand::Create { file_text } => self.editor.create(&resolved, &file_text).await,
            EditCommand::StrReplace { old_str, new_str } => {
                self.editor.str_replace(&resolved, &old_str, &new_str).await
            }
            EditCommand::Insert {
                insert_line,
                new_str,
            } => self.editor.insert(&resolved, insert_line, &new_str).await,
            EditCommand::UndoEdit => self.editor.undo_edit(&resolved).await,
        }
    }
}
