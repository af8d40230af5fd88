use std::path::Path;

use redb::{
    Database,
    ReadableDatabase,
    ReadableTable,
    ReadableTableMetadata,
    TableDefinition,
};
use tracing::debug;

use crate::error::{Error, Result};

/// Extracted text keyed by image path.
const IMAGES: TableDefinition<&str, &str> = TableDefinition::new("images");

/// Durable mapping from image path to the text recognized in it.
///
/// Every mutation runs in its own write transaction, so a record is
/// visible to [`Store::exists`] as soon as [`Store::insert`] returns.
pub struct Store {
    db: Database,
}

impl Store {
    /// Open (or create) the store at `path` and make sure the `images`
    /// table exists.
    pub fn open(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "opening image store");
        let db = Database::create(path)?;
        let store = Self { db };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Create the `images` table if it is missing. Safe to call on every
    /// startup.
    pub fn ensure_schema(&self) -> Result<()> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Schema(e.to_string()))?;
        txn.open_table(IMAGES)
            .map_err(|e| Error::Schema(e.to_string()))?;
        txn.commit().map_err(|e| Error::Schema(e.to_string()))?;
        debug!("image store ready");
        Ok(())
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(IMAGES)?;
        Ok(table.get(path)?.is_some())
    }

    /// Insert a new record. An existing record is never overwritten:
    /// the write is rolled back and [`Error::DuplicateKey`] returned.
    pub fn insert(&self, path: &str, content: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        let present = {
            let mut table = txn.open_table(IMAGES)?;
            let present = table.get(path)?.is_some();
            if !present {
                table.insert(path, content)?;
            }
            present
        };

        if present {
            txn.abort()?;
            return Err(Error::DuplicateKey(path.to_string()));
        }

        txn.commit()?;
        Ok(())
    }

    pub fn get(&self, path: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(IMAGES)?;
        Ok(table.get(path)?.map(|v| v.value().to_string()))
    }

    pub fn count(&self) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(IMAGES)?;
        Ok(table.len()?)
    }

    /// Return every path whose content contains `needle`, ignoring case.
    ///
    /// The result carries no ordering guarantee.
    pub fn search(&self, needle: &str) -> Result<Vec<String>> {
        let needle = needle.to_lowercase();
        let txn = self.db.begin_read()?;
        let table = txn.open_table(IMAGES)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            if v.value().to_lowercase().contains(&needle) {
                result.push(k.value().to_string());
            }
        }
        Ok(result)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}
