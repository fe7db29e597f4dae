//! SQLite store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use policy::CertificateRequestPolicy;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::{Error, RecordId, Result, ReviewRecord};

/// SQLite-backed store for policies and review history.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS policies (
                name TEXT PRIMARY KEY,
                spec TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                request TEXT NOT NULL,
                username TEXT NOT NULL,
                status TEXT NOT NULL,
                message TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_reviews_timestamp
                ON reviews(timestamp);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::Poisoned)
    }

    /// Create or replace a policy.
    pub fn apply(&self, policy: &CertificateRequestPolicy) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO policies (name, spec, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET spec = excluded.spec, updated_at = excluded.updated_at",
            params![
                policy.name,
                serde_json::to_string(&policy.spec)?,
                Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )?;
        debug!(policy = %policy.name, "applied policy");
        Ok(())
    }

    /// Delete a policy, returning whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM policies WHERE name = ?1", [name])?;
        Ok(deleted > 0)
    }

    /// Get a policy by name.
    pub fn get(&self, name: &str) -> Result<Option<CertificateRequestPolicy>> {
        let spec: Option<String> = self
            .conn()?
            .query_row("SELECT spec FROM policies WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .optional()?;

        spec.map(|spec| -> Result<CertificateRequestPolicy> {
            Ok(CertificateRequestPolicy {
                name: name.to_string(),
                spec: serde_json::from_str(&spec)?,
            })
        })
        .transpose()
    }

    /// List all policies, ordered by name.
    pub fn policies(&self) -> Result<Vec<CertificateRequestPolicy>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name, spec FROM policies ORDER BY name")?;

        let rows = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let spec: String = row.get(1)?;
                Ok((name, spec))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(name, spec)| -> Result<CertificateRequestPolicy> {
                Ok(CertificateRequestPolicy {
                    name,
                    spec: serde_json::from_str(&spec)?,
                })
            })
            .collect()
    }

    /// Append a review to history.
    pub fn append_review(&self, record: &ReviewRecord) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO reviews (id, timestamp, request, username, status, message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                record.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
                record.request,
                record.username,
                record.status,
                record.message,
            ],
        )?;
        Ok(())
    }

    /// Load the most recent reviews, newest first.
    pub fn reviews(&self, limit: usize) -> Result<Vec<ReviewRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, request, username, status, message FROM reviews
             ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    ReviewRecord {
                        id: RecordId::default(),
                        timestamp: Utc::now(),
                        request: row.get(2)?,
                        username: row.get(3)?,
                        status: row.get(4)?,
                        message: row.get(5)?,
                    },
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, timestamp, record)| -> Result<ReviewRecord> {
                Ok(ReviewRecord {
                    id: RecordId(
                        id.parse()
                            .map_err(|_| Error::Corrupt(format!("review id {id:?}")))?,
                    ),
                    timestamp: timestamp
                        .parse()
                        .map_err(|_| Error::Corrupt(format!("review timestamp {timestamp:?}")))?,
                    ..record
                })
            })
            .collect()
    }
}

#[async_trait]
impl policy::PolicyStore for SqliteStore {
    async fn list(&self) -> policy::Result<Vec<CertificateRequestPolicy>> {
        self.policies()
            .map_err(|e| policy::Error::backend("failed to list policies from sqlite", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::PolicyStore;
    use serde_json::json;

    #[test]
    fn apply_and_get() {
        let store = SqliteStore::in_memory().unwrap();
        let policy = CertificateRequestPolicy::new("web")
            .with_spec(json!({ "allowed_dns_names": ["*.example.com"] }));

        store.apply(&policy).unwrap();

        assert_eq!(store.get("web").unwrap(), Some(policy));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn apply_replaces_existing_policy() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .apply(&CertificateRequestPolicy::new("web").with_spec(json!({ "v": 1 })))
            .unwrap();
        store
            .apply(&CertificateRequestPolicy::new("web").with_spec(json!({ "v": 2 })))
            .unwrap();

        let policies = store.policies().unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].spec["v"], 2);
    }

    #[test]
    fn delete_reports_existence() {
        let store = SqliteStore::in_memory().unwrap();
        store.apply(&CertificateRequestPolicy::new("web")).unwrap();

        assert!(store.delete("web").unwrap());
        assert!(!store.delete("web").unwrap());
        assert!(store.policies().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_returns_policies_by_name() {
        let store = SqliteStore::in_memory().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            store.apply(&CertificateRequestPolicy::new(name)).unwrap();
        }

        let names: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn reviews_newest_first_with_limit() {
        let store = SqliteStore::in_memory().unwrap();
        let mut first = ReviewRecord::new("ns/a", "alice", "denied", "nope");
        first.timestamp = Utc::now() - chrono::Duration::seconds(10);
        let second = ReviewRecord::new("ns/b", "bob", "approved", "ok");

        store.append_review(&first).unwrap();
        store.append_review(&second).unwrap();

        let all = store.reviews(10).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].request, "ns/a");
        assert_eq!(all[1].status, "denied");

        let latest = store.reviews(1).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].username, "bob");
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("approver.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.apply(&CertificateRequestPolicy::new("kept")).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get("kept").unwrap().is_some());
    }
}
