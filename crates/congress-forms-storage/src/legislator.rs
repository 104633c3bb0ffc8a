//! Legislator profile storage.
//!
//! Profiles are stored as opaque bytes. Two secondary indexes keep lookups
//! cheap: one by bioguide id and one by seat (a caller-defined key such as
//! `senate:CA:1`). Both sort newest first so that a seat which changed
//! occupant resolves to the most recently created profile.

use crate::range_utils::{prefix_end_bound, reverse_ts_key};
use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

const LEGISLATOR_DATA: TableDefinition<&str, &[u8]> = TableDefinition::new("legislators:data");
const LEGISLATOR_BY_BIOGUIDE: TableDefinition<&str, &str> =
    TableDefinition::new("legislators:by_bioguide");
const LEGISLATOR_BY_SEAT: TableDefinition<&str, &str> = TableDefinition::new("legislators:by_seat");
/// id -> index keys currently pointing at it, newline separated
const LEGISLATOR_INDEX_KEYS: TableDefinition<&str, &str> =
    TableDefinition::new("legislators:index_keys");

/// Index entries for one stored profile.
#[derive(Debug, Clone)]
pub struct LegislatorKeys<'a> {
    pub id: &'a str,
    pub bioguide_id: &'a str,
    pub seat: Option<&'a str>,
    pub created_at_ms: i64,
}

#[derive(Clone)]
pub struct LegislatorStorage {
    db: Arc<Database>,
}

impl LegislatorStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(LEGISLATOR_DATA)?;
        write_txn.open_table(LEGISLATOR_BY_BIOGUIDE)?;
        write_txn.open_table(LEGISLATOR_BY_SEAT)?;
        write_txn.open_table(LEGISLATOR_INDEX_KEYS)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Insert or replace a profile, re-pointing its index entries.
    pub fn put(&self, keys: &LegislatorKeys<'_>, data: &[u8]) -> Result<()> {
        let bioguide_key = format!(
            "{}:{}:{}",
            keys.bioguide_id,
            reverse_ts_key(keys.created_at_ms),
            keys.id
        );
        let seat_key = keys
            .seat
            .map(|seat| format!("{seat}:{}:{}", reverse_ts_key(keys.created_at_ms), keys.id));

        let txn = self.db.begin_write()?;
        {
            let mut index_keys = txn.open_table(LEGISLATOR_INDEX_KEYS)?;
            let previous = index_keys
                .get(keys.id)?
                .map(|value| value.value().to_string());

            let mut by_bioguide = txn.open_table(LEGISLATOR_BY_BIOGUIDE)?;
            let mut by_seat = txn.open_table(LEGISLATOR_BY_SEAT)?;
            if let Some(previous) = previous {
                let mut lines = previous.lines();
                if let Some(old_bioguide_key) = lines.next() {
                    by_bioguide.remove(old_bioguide_key)?;
                }
                if let Some(old_seat_key) = lines.next() {
                    by_seat.remove(old_seat_key)?;
                }
            }

            by_bioguide.insert(bioguide_key.as_str(), keys.id)?;
            let mut stored_keys = bioguide_key.clone();
            if let Some(seat_key) = &seat_key {
                by_seat.insert(seat_key.as_str(), keys.id)?;
                stored_keys.push('\n');
                stored_keys.push_str(seat_key);
            }
            index_keys.insert(keys.id, stored_keys.as_str())?;

            let mut data_table = txn.open_table(LEGISLATOR_DATA)?;
            data_table.insert(keys.id, data)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LEGISLATOR_DATA)?;
        Ok(table.get(id)?.map(|value| value.value().to_vec()))
    }

    /// Most recently created profile for a bioguide id.
    pub fn newest_by_bioguide(&self, bioguide_id: &str) -> Result<Option<Vec<u8>>> {
        self.newest_in(LEGISLATOR_BY_BIOGUIDE, &format!("{bioguide_id}:"))
    }

    /// Most recently created profile holding `seat`.
    pub fn newest_for_seat(&self, seat: &str) -> Result<Option<Vec<u8>>> {
        self.newest_in(LEGISLATOR_BY_SEAT, &format!("{seat}:"))
    }

    /// All profiles as (id, data) pairs.
    pub fn list(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LEGISLATOR_DATA)?;

        let mut items = Vec::new();
        for item in table.iter()? {
            let (key, value) = item?;
            items.push((key.value().to_string(), value.value().to_vec()));
        }
        Ok(items)
    }

    /// Delete by id, returns true if it existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let existed = {
            let mut index_keys = txn.open_table(LEGISLATOR_INDEX_KEYS)?;
            let previous = index_keys.remove(id)?.map(|value| value.value().to_string());
            if let Some(previous) = previous {
                let mut lines = previous.lines();
                let mut by_bioguide = txn.open_table(LEGISLATOR_BY_BIOGUIDE)?;
                if let Some(key) = lines.next() {
                    by_bioguide.remove(key)?;
                }
                let mut by_seat = txn.open_table(LEGISLATOR_BY_SEAT)?;
                if let Some(key) = lines.next() {
                    by_seat.remove(key)?;
                }
            }
            let mut data_table = txn.open_table(LEGISLATOR_DATA)?;
            data_table.remove(id)?.is_some()
        };
        txn.commit()?;
        Ok(existed)
    }

    fn newest_in(
        &self,
        index_def: TableDefinition<'static, &'static str, &'static str>,
        prefix: &str,
    ) -> Result<Option<Vec<u8>>> {
        let end = prefix_end_bound(prefix);
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(index_def)?;
        let data = read_txn.open_table(LEGISLATOR_DATA)?;

        for entry in index.range(prefix..end.as_str())? {
            let (_, id) = entry?;
            if let Some(bytes) = data.get(id.value())? {
                return Ok(Some(bytes.value().to_vec()));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_store() -> (LegislatorStorage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("legislators.redb");
        let db = Arc::new(Database::create(db_path).unwrap());
        (LegislatorStorage::new(db).unwrap(), dir)
    }

    fn keys<'a>(
        id: &'a str,
        bioguide_id: &'a str,
        seat: Option<&'a str>,
        created_at_ms: i64,
    ) -> LegislatorKeys<'a> {
        LegislatorKeys {
            id,
            bioguide_id,
            seat,
            created_at_ms,
        }
    }

    #[test]
    fn test_newest_for_seat_prefers_latest_profile() {
        let (store, _temp_dir) = test_store();
        store
            .put(&keys("old", "B000001", Some("senate:CA:1"), 1_000), b"old")
            .unwrap();
        store
            .put(&keys("new", "P000145", Some("senate:CA:1"), 2_000), b"new")
            .unwrap();
        store
            .put(&keys("other", "F000062", Some("senate:CA:2"), 3_000), b"other")
            .unwrap();

        assert_eq!(store.newest_for_seat("senate:CA:1").unwrap().unwrap(), b"new".to_vec());
        assert!(store.newest_for_seat("senate:NY:1").unwrap().is_none());
    }

    #[test]
    fn test_put_replaces_stale_seat_index() {
        let (store, _temp_dir) = test_store();
        store
            .put(&keys("p1", "A000001", Some("house:TX:7"), 1_000), b"v1")
            .unwrap();
        store
            .put(&keys("p1", "A000001", Some("house:TX:8"), 1_000), b"v2")
            .unwrap();

        assert!(store.newest_for_seat("house:TX:7").unwrap().is_none());
        assert_eq!(store.newest_for_seat("house:TX:8").unwrap().unwrap(), b"v2".to_vec());
        assert_eq!(store.newest_by_bioguide("A000001").unwrap().unwrap(), b"v2".to_vec());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_clears_indexes() {
        let (store, _temp_dir) = test_store();
        store
            .put(&keys("p1", "A000001", Some("house:TX:7"), 1_000), b"v1")
            .unwrap();
        assert!(store.delete("p1").unwrap());
        assert!(!store.delete("p1").unwrap());
        assert!(store.newest_by_bioguide("A000001").unwrap().is_none());
        assert!(store.newest_for_seat("house:TX:7").unwrap().is_none());
    }
}
