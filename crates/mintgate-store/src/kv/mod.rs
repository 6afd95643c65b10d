//! KV storage backends with atomic conditional writes.
//!
//! Every multi-key mutation in the store goes through [`WriteBatch`]: a set of
//! preconditions plus a set of writes that a backend applies all-or-nothing.
//! The SQLite backend runs the batch inside a real transaction, so the
//! compare-and-swap holds across independent processes sharing one database
//! file; the in-memory backend applies it under the write lock and is meant
//! for tests and single-process use.

mod memory;

#[cfg(feature = "sqlite")]
mod sqlite;

use std::path::Path;

use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};

pub use memory::MemoryKv;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteKv;

#[derive(Debug, Clone)]
pub enum KvBackend {
    Memory,
    #[cfg(feature = "sqlite")]
    Sqlite { path: String },
}

impl Default for KvBackend {
    fn default() -> Self {
        #[cfg(feature = "sqlite")]
        {
            return KvBackend::Sqlite { path: "kv.sqlite3".to_string() };
        }
        #[cfg(not(feature = "sqlite"))]
        {
            KvBackend::Memory
        }
    }
}

/// A condition that must hold for a [`WriteBatch`] to commit.
#[derive(Debug, Clone)]
pub enum Precondition {
    /// The key must not exist.
    KeyAbsent { key: String },
    /// The key must exist with exactly these bytes.
    ValueEquals { key: String, expected: Vec<u8> },
}

impl Precondition {
    pub fn key(&self) -> &str {
        match self {
            Precondition::KeyAbsent { key } => key,
            Precondition::ValueEquals { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone)]
pub enum WriteOp {
    Put { key: String, value: Vec<u8> },
}

/// Preconditions plus writes, applied atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub preconditions: Vec<Precondition>,
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_absent(mut self, key: impl Into<String>) -> Self {
        self.preconditions.push(Precondition::KeyAbsent { key: key.into() });
        self
    }

    pub fn expect_value(mut self, key: impl Into<String>, expected: Vec<u8>) -> Self {
        self.preconditions.push(Precondition::ValueEquals { key: key.into(), expected });
        self
    }

    pub fn put(mut self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.ops.push(WriteOp::Put { key: key.into(), value });
        self
    }

    pub fn put_json<T: Serialize>(self, key: impl Into<String>, value: &T) -> Result<Self> {
        Ok(self.put(key, serde_json::to_vec(value)?))
    }
}

/// Outcome of applying a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchResult {
    /// All preconditions held; every write was applied.
    Committed,
    /// The precondition at this index failed; nothing was written.
    Unmet(usize),
}

pub struct Kv {
    inner: RwLock<Box<dyn KvStore + Send + Sync>>,
}

impl Kv {
    pub fn open<P: AsRef<Path>>(dir: P, backend: KvBackend) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let store: Box<dyn KvStore + Send + Sync> = match backend {
            KvBackend::Memory => Box::new(MemoryKv::default()),
            #[cfg(feature = "sqlite")]
            KvBackend::Sqlite { path } => Box::new(SqliteKv::open(dir.join(path))?),
        };

        Ok(Self { inner: RwLock::new(store) })
    }

    pub fn put_bytes(&self, key: &str, value: Vec<u8>) -> Result<()> {
        validate_key(key)?;
        self.inner.write().put(key, value)
    }

    pub fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        self.inner.read().get(key)
    }

    pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.put_bytes(key, serde_json::to_vec(value)?)
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.get_bytes(key)? else { return Ok(None); };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        validate_key(prefix)?;
        self.inner.read().list_prefix(prefix)
    }

    /// Apply a conditional batch atomically.
    pub fn apply(&self, batch: &WriteBatch) -> Result<BatchResult> {
        for cond in &batch.preconditions {
            validate_key(cond.key())?;
        }
        for op in &batch.ops {
            match op {
                WriteOp::Put { key, .. } => validate_key(key)?,
            }
        }
        self.inner.write().apply(batch)
    }
}

pub trait KvStore {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn list_prefix(&self, prefix: &str) -> Result<Vec<String>>;
    fn apply(&mut self, batch: &WriteBatch) -> Result<BatchResult>;
}

pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > 256 {
        return Err(anyhow!("kv key must be 1..=256 chars"));
    }
    if !key.is_ascii() {
        return Err(anyhow!("kv key must be ASCII"));
    }
    for b in key.bytes() {
        let ok = matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'-' | b'/' | b':' | b'@');
        if !ok {
            return Err(anyhow!("kv key contains invalid char"));
        }
    }
    Ok(())
}
