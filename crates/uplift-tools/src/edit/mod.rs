//! File editing behind the path validator

mod editor;
mod manager;
mod tool;

pub use editor::FileEditor;
pub use manager::SecurePathManager;
pub use tool::{EditCommand, SecureEditTool};
