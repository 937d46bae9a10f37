//! Scanning the shard tree for entries already on disk.

use crate::error::Result;
use crate::key::Key;
use crate::store::PermanentStore;
use std::fs;

/// Totals from a scan of the store directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Number of entry files found.
    pub entries: usize,
    /// Sum of their sizes in bytes.
    pub bytes: u64,
}

impl PermanentStore {
    /// Count entries and bytes physically present under the root.
    ///
    /// Files that do not decode to a key (temp files, foreign files) are ignored.
    pub fn scan(&self) -> Result<ScanStats> {
        let mut stats = ScanStats::default();
        self.visit_entries(|_key, size| {
            stats.entries += 1;
            stats.bytes += size;
        })?;
        Ok(stats)
    }

    /// List the keys of all entries present under the root, sorted.
    pub fn keys(&self) -> Result<Vec<Key>> {
        let mut keys = Vec::new();
        self.visit_entries(|key, _size| keys.push(key))?;
        keys.sort();
        Ok(keys)
    }

    /// Walk `{root}/{shard}/{shard}/{leaf}` under the store lock.
    fn visit_entries(&self, mut visit: impl FnMut(Key, u64)) -> Result<()> {
        let _guard = self.lock_ledger();
        self.check_root()?;

        for outer in fs::read_dir(self.root())? {
            let outer_path = outer?.path();
            if !outer_path.is_dir() {
                continue;
            }

            for inner in fs::read_dir(&outer_path)? {
                let inner_path = inner?.path();
                if !inner_path.is_dir() {
                    continue;
                }

                for entry in fs::read_dir(&inner_path)? {
                    let entry = entry?;
                    let metadata = entry.metadata()?;
                    if !metadata.is_file() {
                        continue;
                    }

                    if let Some(key) = self.encoder().decode(&entry.path()) {
                        visit(key, metadata.len());
                    }
                }
            }
        }

        Ok(())
    }
}
