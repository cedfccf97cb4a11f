//! SQL identifier and query checks, and the SQLite config store they guard

mod manager;
mod store;

pub use manager::SecureSqlManager;
pub use store::{SecureSqliteConfigStore, SqliteConfigStore};
