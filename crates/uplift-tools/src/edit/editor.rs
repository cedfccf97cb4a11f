//! The unsafe primitive: an editor that trusts every path it is given

use crate::error::{ToolError, ToolResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Lines shown by `view` before the output is cut
const MAX_VIEW_LINES: usize = 2000;

/// String-replacement editor with per-file undo history
#[derive(Debug, Default)]
pub struct FileEditor {
    history: Mutex<HashMap<PathBuf, Vec<String>>>,
}

impl FileEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numbered file content, or a listing when `path` is a directory
    pub async fn view(&self, path: &Path, view_range: Option<(usize, usize)>) -> ToolResult<String> {
        if !fs::try_exists(path).await? {
            return Err(ToolError::NotFound(path.display().to_string()));
        }

        if fs::metadata(path).await?.is_dir() {
            return self.list_directory(path).await;
        }

        let content = fs::read_to_string(path).await?;
        let lines: Vec<&str> = content.lines().collect();
        let (start, end) = match view_range {
            Some((start, end)) => {
                if start == 0 || start > end || start > lines.len().max(1) {
                    return Err(ToolError::InvalidArguments(format!(
                        "invalid view range [{}, {}] for a file with {} lines",
                        start,
                        end,
                        lines.len()
                    )));
                }
                (start, end.min(lines.len()))
            }
            None => (1, lines.len().min(MAX_VIEW_LINES)),
        };

        let mut output = lines
            .iter()
            .enumerate()
            .skip(start - 1)
            .take(end + 1 - start)
            .map(|(i, line)| format!("{:6}\t{}", i + 1, line))
            .collect::<Vec<_>>()
            .join("\n");
        if view_range.is_none() && lines.len() > MAX_VIEW_LINES {
            output.push_str(&format!(
                "\n... ({} more lines)",
                lines.len() - MAX_VIEW_LINES
            ));
        }
        Ok(output)
    }

    async fn list_directory(&self, path: &Path) -> ToolResult<String> {
        let mut entries = Vec::new();
        let mut dir_entries = fs::read_dir(path).await?;
        while let Some(entry) = dir_entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().await?.is_dir() {
                entries.push(format!("  {}/", name));
            } else {
                entries.push(format!("  {}", name));
            }
        }
        entries.sort();
        Ok(format!(
            "Directory: {}\n\n{}\n\n({} items)",
            path.display(),
            if entries.is_empty() {
                "  (empty)".to_string()
            } else {
                entries.join("\n")
            },
            entries.len()
        ))
    }

    pub async fn create(&self, path: &Path, content: &str) -> ToolResult<String> {
        if fs::try_exists(path).await? {
            return Err(ToolError::ExecutionFailed(format!(
                "File already exists: {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;
        Ok(format!("File created successfully at: {}", path.display()))
    }

    /// Replace the single occurrence of `old_str`
    pub async fn str_replace(&self, path: &Path, old_str: &str, new_str: &str) -> ToolResult<String> {
        if old_str.is_empty() {
            return Err(ToolError::InvalidArguments(
                "old_str must not be empty".to_string(),
            ));
        }
        let content = fs::read_to_string(path).await?;
        match content.matches(old_str).count() {
            0 => {
                return Err(ToolError::ExecutionFailed(format!(
                    "old_str not found in {}",
                    path.display()
                )));
            }
            1 => {}
            n => {
                return Err(ToolError::ExecutionFailed(format!(
                    "old_str appears {} times in {}; it must be unique",
                    n,
                    path.display()
                )));
            }
        }

        let updated = content.replacen(old_str, new_str, 1);
        fs::write(path, &updated).await?;
        self.remember(path, content);
        Ok(format!("The file {} has been edited.", path.display()))
    }

    /// Insert `text` after line `insert_line` (0 inserts at the top)
    pub async fn insert(&self, path: &Path, insert_line: usize, text: &str) -> ToolResult<String> {
        let content = fs::read_to_string(path).await?;
        let mut lines: Vec<&str> = content.lines().collect();
        if insert_line > lines.len() {
            return Err(ToolError::InvalidArguments(format!(
                "insert_line {} is past the end of the file ({} lines)",
                insert_line,
                lines.len()
            )));
        }

        let new_lines: Vec<&str> = text.lines().collect();
        lines.splice(insert_line..insert_line, new_lines);
        let mut updated = lines.join("\n");
        if content.ends_with('\n') || content.is_empty() {
            updated.push('\n');
        }

        fs::write(path, &updated).await?;
        self.remember(path, content);
        Ok(format!("The file {} has been edited.", path.display()))
    }

    /// Restore the content before the last edit of `path`
    pub async fn undo_edit(&self, path: &Path) -> ToolResult<String> {
        let previous = self
            .history
            .lock()
            .get_mut(path)
            .and_then(|versions| versions.pop());
        let Some(previous) = previous else {
            return Err(ToolError::ExecutionFailed(format!(
                "No edit history for {}",
                path.display()
            )));
        };
        fs::write(path, previous).await?;
        Ok(format!("Last edit to {} undone successfully.", path.display()))
    }

    fn remember(&self, path: &Path, content: String) {
        self.history
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .push(content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_then_view() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        let editor = FileEditor::new();

        editor.create(&path, "one\ntwo\nthree\n").await.unwrap();
        let view = editor.view(&path, None).await.unwrap();
        assert!(view.contains("     1\tone"));
        assert!(view.contains("     3\tthree"));

        let ranged = editor.view(&path, Some((2, 2))).await.unwrap();
        assert_eq!(ranged, "     2\ttwo");
        assert!(editor.view(&path, Some((3, 1))).await.is_err());
    }

    #[tokio::test]
    async fn test_create_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        let editor = FileEditor::new();
        editor.create(&path, "x").await.unwrap();
        assert!(matches!(
            editor.create(&path, "y").await,
            Err(ToolError::ExecutionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_view_directory_lists_entries() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        let listing = FileEditor::new().view(dir.path(), None).await.unwrap();
        assert!(listing.contains("  a/\n  b.txt"));
        assert!(listing.ends_with("(2 items)"));
    }

    #[tokio::test]
    async fn test_str_replace_requires_unique_match() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "foo bar foo").unwrap();
        let editor = FileEditor::new();

        let err = editor.str_replace(&path, "foo", "baz").await.unwrap_err();
        assert!(err.to_string().contains("2 times"));
        assert!(editor.str_replace(&path, "missing", "x").await.is_err());

        editor.str_replace(&path, "bar", "qux").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "foo qux foo");
    }

    #[tokio::test]
    async fn test_insert_and_undo() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "first\nthird\n").unwrap();
        let editor = FileEditor::new();

        editor.insert(&path, 1, "second").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "first\nsecond\nthird\n"
        );
        assert!(editor.insert(&path, 10, "x").await.is_err());

        editor.undo_edit(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nthird\n");
        assert!(editor.undo_edit(&path).await.is_err());
    }
}
