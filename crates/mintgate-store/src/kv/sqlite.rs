//! SQLite KV backend.

#![cfg(feature = "sqlite")]

use std::path::Path;

use anyhow::Result;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{BatchResult, KvStore, Precondition, WriteBatch, WriteOp};

const MIG_0001: &str = include_str!("migrations/0001_init.sql");

pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let this = Self { conn: Mutex::new(conn) };
        this.migrate()?;
        Ok(this)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(MIG_0001)?;
        let v: i64 = conn.query_row("PRAGMA user_version;", [], |r| r.get(0))?;
        if v < 1 {
            conn.execute_batch("PRAGMA user_version = 1;")?;
        }
        Ok(())
    }

    fn now_unix() -> i64 {
        time::OffsetDateTime::now_utc().unix_timestamp()
    }
}

impl KvStore for SqliteKv {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        let ts = Self::now_unix();
        let conn = self.conn.lock();
        conn.execute(
            r#"INSERT INTO kv(key,value,updated_at)
               VALUES(?1,?2,?3)
               ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at"#,
            params![key, value, ts],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let upper = format!("{prefix}\u{10FFFF}");
        let mut stmt = conn.prepare("SELECT key FROM kv WHERE key >= ?1 AND key <= ?2 ORDER BY key ASC")?;
        let rows = stmt.query_map(params![prefix, upper], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            let k = r?;
            if k.starts_with(prefix) {
                out.push(k);
            }
        }
        Ok(out)
    }

    fn apply(&mut self, batch: &WriteBatch) -> Result<BatchResult> {
        let ts = Self::now_unix();
        let mut conn = self.conn.lock();
        // IMMEDIATE takes the write lock up front so the precondition reads
        // and the writes see one consistent snapshot even across processes.
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        for (i, cond) in batch.preconditions.iter().enumerate() {
            let current: Option<Vec<u8>> = tx
                .query_row("SELECT value FROM kv WHERE key = ?1", params![cond.key()], |r| r.get(0))
                .optional()?;
            let met = match cond {
                Precondition::KeyAbsent { .. } => current.is_none(),
                Precondition::ValueEquals { expected, .. } => {
                    current.as_deref() == Some(expected.as_slice())
                }
            };
            if !met {
                // Dropping the transaction rolls back; nothing was written yet.
                return Ok(BatchResult::Unmet(i));
            }
        }

        for op in &batch.ops {
            match op {
                WriteOp::Put { key, value } => {
                    tx.execute(
                        r#"INSERT INTO kv(key,value,updated_at)
                           VALUES(?1,?2,?3)
                           ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at"#,
                        params![key, value, ts],
                    )?;
                }
            }
        }

        tx.commit()?;
        Ok(BatchResult::Committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sqlite_roundtrip() {
        let td = TempDir::new().unwrap();
        let mut kv = SqliteKv::open(td.path().join("kv.sqlite3")).unwrap();
        kv.put("k", b"v".to_vec()).unwrap();
        assert_eq!(kv.get("k").unwrap().unwrap(), b"v");
        assert!(kv.get("missing").unwrap().is_none());
    }

    #[test]
    fn sqlite_batch_rolls_back_on_unmet() {
        let td = TempDir::new().unwrap();
        let mut kv = SqliteKv::open(td.path().join("kv.sqlite3")).unwrap();
        kv.put("a", b"1".to_vec()).unwrap();

        let batch = WriteBatch::new()
            .expect_value("a", b"stale".to_vec())
            .put("a", b"2".to_vec());
        assert_eq!(kv.apply(&batch).unwrap(), BatchResult::Unmet(0));
        assert_eq!(kv.get("a").unwrap().unwrap(), b"1");
    }

    #[test]
    fn sqlite_survives_reopen() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("kv.sqlite3");
        {
            let mut kv = SqliteKv::open(&path).unwrap();
            kv.put("persist", b"yes".to_vec()).unwrap();
        }
        let kv = SqliteKv::open(&path).unwrap();
        assert_eq!(kv.get("persist").unwrap().unwrap(), b"yes");
    }
}
