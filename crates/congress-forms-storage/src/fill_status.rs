//! Fill status storage - append-only log of form fill outcomes.

use crate::range_utils::{prefix_end_bound, ts_key};
use anyhow::{Result, bail};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::sync::Arc;

const FILL_DATA: TableDefinition<&str, &[u8]> = TableDefinition::new("fill_statuses:data");
/// `{bioguide}:{created_at}:{id}` -> id
const FILL_BY_LEGISLATOR: TableDefinition<&str, &str> =
    TableDefinition::new("fill_statuses:by_legislator");
/// `{created_at}:{id}` -> id
const FILL_BY_TIME: TableDefinition<&str, &str> = TableDefinition::new("fill_statuses:by_time");

/// Byte-level fill status storage.
///
/// Records are never updated or removed once appended.
#[derive(Clone)]
pub struct FillStatusStorage {
    db: Arc<Database>,
}

impl FillStatusStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(FILL_DATA)?;
        write_txn.open_table(FILL_BY_LEGISLATOR)?;
        write_txn.open_table(FILL_BY_TIME)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Append a record. Fails if `id` was already used.
    pub fn append(&self, id: &str, bioguide_id: &str, created_at_ms: i64, data: &[u8]) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut data_table = txn.open_table(FILL_DATA)?;
            if data_table.get(id)?.is_some() {
                bail!("Fill status {id} already recorded");
            }
            data_table.insert(id, data)?;

            let mut by_legislator = txn.open_table(FILL_BY_LEGISLATOR)?;
            let key = format!("{bioguide_id}:{}:{id}", ts_key(created_at_ms));
            by_legislator.insert(key.as_str(), id)?;

            let mut by_time = txn.open_table(FILL_BY_TIME)?;
            let key = format!("{}:{id}", ts_key(created_at_ms));
            by_time.insert(key.as_str(), id)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FILL_DATA)?;
        Ok(table.get(id)?.map(|value| value.value().to_vec()))
    }

    /// All records for one legislator, oldest first.
    pub fn list_for_legislator(&self, bioguide_id: &str) -> Result<Vec<Vec<u8>>> {
        let prefix = format!("{bioguide_id}:");
        let end = prefix_end_bound(&prefix);
        self.collect_index(FILL_BY_LEGISLATOR, &prefix, &end)
    }

    /// Records for one legislator created strictly after `since_ms`, oldest first.
    pub fn list_for_legislator_since(&self, bioguide_id: &str, since_ms: i64) -> Result<Vec<Vec<u8>>> {
        let start = format!("{bioguide_id}:{}", ts_key(since_ms.saturating_add(1)));
        let end = prefix_end_bound(&format!("{bioguide_id}:"));
        self.collect_index(FILL_BY_LEGISLATOR, &start, &end)
    }

    /// Records created in `[from_ms, to_ms)` across all legislators.
    pub fn list_created_between(&self, from_ms: i64, to_ms: i64) -> Result<Vec<Vec<u8>>> {
        if to_ms <= from_ms {
            return Ok(Vec::new());
        }
        let start = ts_key(from_ms);
        let end = ts_key(to_ms);
        self.collect_index(FILL_BY_TIME, &start, &end)
    }

    pub fn count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FILL_DATA)?;
        Ok(table.len()? as usize)
    }

    fn collect_index(
        &self,
        index_def: TableDefinition<'static, &'static str, &'static str>,
        start: &str,
        end: &str,
    ) -> Result<Vec<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(index_def)?;
        let data = read_txn.open_table(FILL_DATA)?;

        let mut records = Vec::new();
        for entry in index.range(start..end)? {
            let (_, id) = entry?;
            if let Some(bytes) = data.get(id.value())? {
                records.push(bytes.value().to_vec());
            }
        }
        Ok(records)
    }
}
