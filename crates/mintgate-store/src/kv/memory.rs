//! In-memory KV backend.

use std::collections::BTreeMap;

use anyhow::Result;

use super::{BatchResult, KvStore, Precondition, WriteBatch, WriteOp};

#[derive(Default)]
pub struct MemoryKv {
    map: BTreeMap<String, Vec<u8>>,
}

impl KvStore for MemoryKv {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.map.insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.map.get(key).cloned())
    }

    fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.map.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    fn apply(&mut self, batch: &WriteBatch) -> Result<BatchResult> {
        // The caller holds the write lock, so check-then-write is atomic here.
        for (i, cond) in batch.preconditions.iter().enumerate() {
            let met = match cond {
                Precondition::KeyAbsent { key } => !self.map.contains_key(key),
                Precondition::ValueEquals { key, expected } => {
                    self.map.get(key).map(|v| v == expected).unwrap_or(false)
                }
            };
            if !met {
                return Ok(BatchResult::Unmet(i));
            }
        }

        for op in &batch.ops {
            match op {
                WriteOp::Put { key, value } => {
                    self.map.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(BatchResult::Committed)
    }
}
