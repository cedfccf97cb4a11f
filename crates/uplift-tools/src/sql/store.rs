//! SQLite-backed key/value configuration store
//!
//! `SqliteConfigStore` interpolates its table name straight into SQL, since
//! SQLite cannot bind identifiers. `SecureSqliteConfigStore` is the only
//! constructor callers outside this module should use.

use super::manager::SecureSqlManager;
use crate::error::ToolResult;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use uplift_core::{IdentifierKind, SecuritySuite};

/// JSON values keyed by string, one row per key
#[derive(Debug)]
pub struct SqliteConfigStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteConfigStore {
    /// Open or create the database at `path`; `table` is used verbatim
    pub fn open<P: AsRef<Path>>(path: P, table: &str) -> ToolResult<Self> {
        Self::init(Connection::open(path)?, table)
    }

    pub fn open_in_memory(table: &str) -> ToolResult<Self> {
        Self::init(Connection::open_in_memory()?, table)
    }

    fn init(conn: Connection, table: &str) -> ToolResult<Self> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );"
        ))?;
        debug!(table, "config table ready");
        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn get(&self, key: &str) -> ToolResult<Option<Value>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                &format!("SELECT value FROM {} WHERE key = ?1", self.table),
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|raw| serde_json::from_str(&raw)).transpose()?)
    }

    pub fn set(&self, key: &str, value: &Value) -> ToolResult<()> {
        let encoded = serde_json::to_string(value)?;
        self.conn.lock().execute(
            &format!(
                "INSERT INTO {} (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
                self.table
            ),
            params![key, encoded],
        )?;
        Ok(())
    }

    /// Returns whether a row was removed
    pub fn delete(&self, key: &str) -> ToolResult<bool> {
        let removed = self.conn.lock().execute(
            &format!("DELETE FROM {} WHERE key = ?1", self.table),
            params![key],
        )?;
        Ok(removed > 0)
    }

    pub fn keys(&self) -> ToolResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT key FROM {} ORDER BY key", self.table))?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    pub fn load_all(&self) -> ToolResult<BTreeMap<String, Value>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT key, value FROM {}", self.table))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut all = BTreeMap::new();
        for (key, raw) in rows {
            all.insert(key, serde_json::from_str(&raw)?);
        }
        Ok(all)
    }
}

/// `SqliteConfigStore` whose table name was validated before any SQL ran
#[derive(Debug)]
pub struct SecureSqliteConfigStore {
    store: SqliteConfigStore,
}

impl SecureSqliteConfigStore {
    pub fn open<P: AsRef<Path>>(path: P, table: &str, sql: &SecureSqlManager) -> ToolResult<Self> {
        let table = sql.require_identifier(table, IdentifierKind::Table)?;
        let store = SqliteConfigStore::open(path, &table)?;
        info!(table = %table, strict = sql.is_strict(), "config store opened");
        Ok(Self { store })
    }

    pub fn open_in_memory(table: &str, sql: &SecureSqlManager) -> ToolResult<Self> {
        let table = sql.require_identifier(table, IdentifierKind::Table)?;
        Ok(Self {
            store: SqliteConfigStore::open_in_memory(&table)?,
        })
    }

    pub fn from_suite<P: AsRef<Path>>(suite: &SecuritySuite, path: P, table: &str) -> ToolResult<Self> {
        Self::open(path, table, &SecureSqlManager::from_suite(suite))
    }

    pub fn table(&self) -> &str {
        self.store.table()
    }

    pub fn get(&self, key: &str) -> ToolResult<Option<Value>> {
        self.store.get(key)
    }

    pub fn set(&self, key: &str, value: &Value) -> ToolResult<()> {
        self.store.set(key, value)
    }

    pub fn delete(&self, key: &str) -> ToolResult<bool> {
        self.store.delete(key)
    }

    pub fn keys(&self) -> ToolResult<Vec<String>> {
        self.store.keys()
    }

    pub fn load_all(&self) -> ToolResult<BTreeMap<String, Value>> {
        self.store.load_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use serde_json::json;
    use tempfile::TempDir;
    use uplift_core::{SecurityError, SqlRisk};

    #[test]
    fn test_store_round_trip() {
        let store = SqliteConfigStore::open_in_memory("settings").unwrap();
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("theme", &json!("dark")).unwrap();
        store.set("limits", &json!({"max": 3})).unwrap();
        store.set("theme", &json!("light")).unwrap();

        assert_eq!(store.get("theme").unwrap(), Some(json!("light")));
        assert_eq!(store.keys().unwrap(), vec!["limits", "theme"]);
        assert_eq!(store.load_all().unwrap()["limits"], json!({"max": 3}));

        assert!(store.delete("theme").unwrap());
        assert!(!store.delete("theme").unwrap());
        assert_eq!(store.keys().unwrap(), vec!["limits"]);
    }

    #[test]
    fn test_store_persists_on_disk() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("config.db");
        SqliteConfigStore::open(&db, "settings")
            .unwrap()
            .set("k", &json!(1))
            .unwrap();
        let reopened = SqliteConfigStore::open(&db, "settings").unwrap();
        assert_eq!(reopened.get("k").unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_secure_store_rejects_injected_table_name() {
        let sql = SecureSqlManager::new(false);
        let err = SecureSqliteConfigStore::open_in_memory("users; DROP TABLE users", &sql)
            .unwrap_err();
        match err {
            ToolError::Security(SecurityError::SqlRejected { risk, .. }) => {
                assert_eq!(risk, SqlRisk::Dangerous)
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!sql.get_audit_log(1)[0].success);
    }

    #[test]
    fn test_secure_store_strictness() {
        let lenient = SecureSqlManager::new(false);
        let store = SecureSqliteConfigStore::open_in_memory("app__config", &lenient).unwrap();
        store.set("a", &json!(true)).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(json!(true)));

        let strict = SecureSqlManager::new(true);
        assert!(SecureSqliteConfigStore::open_in_memory("app__config", &strict).is_err());
        assert!(SecureSqliteConfigStore::open_in_memory("app_config", &strict).is_ok());
    }

    #[test]
    fn test_secure_store_rejects_keyword_table() {
        let sql = SecureSqlManager::new(false);
        let err = SecureSqliteConfigStore::open_in_memory("select", &sql).unwrap_err();
        assert!(err.is_security_violation());
    }
}
