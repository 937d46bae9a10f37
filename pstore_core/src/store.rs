//! Store management and entry I/O.

use crate::disk_usage::DiskUsageLedger;
use crate::error::{Error, Result};
use crate::key::Key;
use crate::path::PathEncoder;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Settings applied when opening a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Hard ceiling on the total bytes of stored values.
    pub max_disk_usage: u64,
    /// Seed the ledger from entries already on disk instead of starting at zero.
    pub reconcile: bool,
    /// When reconciling, open a store whose existing entries exceed the quota.
    /// Puts are rejected until deletes bring usage back under the ceiling.
    pub allow_over_quota: bool,
}

impl StoreOptions {
    pub fn new(max_disk_usage: u64) -> Self {
        Self {
            max_disk_usage,
            reconcile: false,
            allow_over_quota: false,
        }
    }

    pub fn reconcile(mut self, reconcile: bool) -> Self {
        self.reconcile = reconcile;
        self
    }

    pub fn allow_over_quota(mut self, allow: bool) -> Self {
        self.allow_over_quota = allow;
        self
    }
}

/// A quota-bounded, content-addressed key/value store on the filesystem.
///
/// Each value is stored verbatim in its own file, located by [`PathEncoder`].
/// Puts and deletes are serialized by a single lock that also guards the
/// disk usage ledger; gets read without it, since entries are only ever
/// replaced by an atomic rename.
#[derive(Debug)]
pub struct PermanentStore {
    encoder: PathEncoder,
    ledger: Mutex<DiskUsageLedger>,
}

impl PermanentStore {
    /// Open a store at `root` with a quota of `max_disk_usage` bytes.
    ///
    /// The root directory and any missing ancestors are created. The ledger
    /// starts at zero regardless of what is already on disk.
    pub fn new<P: AsRef<Path>>(root: P, max_disk_usage: u64) -> Result<Self> {
        Self::with_options(root, StoreOptions::new(max_disk_usage))
    }

    /// Open a store at `root` with explicit options.
    pub fn with_options<P: AsRef<Path>>(root: P, options: StoreOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        prepare_root(&root)?;

        let store = Self {
            encoder: PathEncoder::new(&root),
            ledger: Mutex::new(DiskUsageLedger::new(options.max_disk_usage)),
        };

        if options.reconcile {
            let stats = store.scan()?;
            let max = options.max_disk_usage;
            let ledger = match DiskUsageLedger::with_used(stats.bytes, max) {
                Some(ledger) => ledger,
                None if options.allow_over_quota => {
                    warn!(
                        root = %root.display(),
                        used = stats.bytes,
                        max,
                        "existing entries exceed quota; puts rejected until space is freed"
                    );
                    DiskUsageLedger::seeded(stats.bytes, max)
                }
                None => {
                    return Err(Error::invalid_store(
                        &root,
                        format!(
                            "existing entries occupy {} bytes, more than the {} byte quota",
                            stats.bytes, max
                        ),
                    ));
                }
            };
            *store.lock_ledger() = ledger;
        }

        info!(
            root = %root.display(),
            max_disk_usage = options.max_disk_usage,
            used = store.disk_usage(),
            reconciled = options.reconcile,
            "opened permanent store"
        );

        Ok(store)
    }

    /// Get the root directory of the store.
    pub fn root(&self) -> &Path {
        self.encoder.root()
    }

    /// Bytes currently accounted to stored entries.
    pub fn disk_usage(&self) -> u64 {
        self.lock_ledger().current()
    }

    /// The quota this store was opened with.
    pub fn max_disk_usage(&self) -> u64 {
        self.lock_ledger().capacity()
    }

    /// Get the path to the entry file for a key.
    pub fn entry_path(&self, key: &Key) -> PathBuf {
        self.encoder.encode(key)
    }

    pub(crate) fn encoder(&self) -> &PathEncoder {
        &self.encoder
    }

    /// Store `value` under `key`.
    ///
    /// Fails with [`Error::CapacityExceeded`] without touching the filesystem
    /// if the value does not fit. Replacing an existing entry only accounts
    /// for the difference in size.
    pub fn put(&self, key: &Key, value: &[u8]) -> Result<()> {
        if value.is_empty() {
            return Err(Error::EmptyValue { key: *key });
        }
        let size = value.len() as u64;
        let path = self.encoder.encode(key);

        let mut ledger = self.lock_ledger();
        self.check_root()?;

        let old_size = entry_size(&path)?.unwrap_or(0);
        let growth = size.saturating_sub(old_size);
        if !ledger.try_reserve(growth) {
            warn!(
                %key,
                requested = size,
                used = ledger.current(),
                max = ledger.capacity(),
                "put rejected: capacity exceeded"
            );
            return Err(Error::capacity_exceeded(
                *key,
                size,
                ledger.current(),
                ledger.capacity(),
            ));
        }

        if let Err(err) = self.write_entry(key, &path, value) {
            ledger.release(growth);
            return Err(err);
        }
        ledger.release(old_size.saturating_sub(size));

        debug!(%key, size, used = ledger.current(), "stored entry");
        Ok(())
    }

    /// Retrieve the value stored under `key`.
    pub fn get(&self, key: &Key) -> Result<Vec<u8>> {
        self.check_root()?;
        let path = self.encoder.encode(key);

        match fs::read(&path) {
            Ok(value) => {
                debug!(%key, size = value.len(), "read entry");
                Ok(value)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // The root may have vanished since the check above.
                self.check_root()?;
                Err(Error::not_found(*key))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the entry for `key` and release its bytes.
    ///
    /// Deleting an absent key succeeds without changing disk usage.
    pub fn delete(&self, key: &Key) -> Result<()> {
        let path = self.encoder.encode(key);

        let mut ledger = self.lock_ledger();
        self.check_root()?;

        let Some(size) = entry_size(&path)? else {
            debug!(%key, "delete of absent entry");
            return Ok(());
        };

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.check_root()?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        ledger.release(size);

        debug!(%key, size, used = ledger.current(), "deleted entry");
        Ok(())
    }

    /// Check whether an entry exists for `key`.
    pub fn contains(&self, key: &Key) -> Result<bool> {
        self.check_root()?;
        Ok(entry_size(&self.encoder.encode(key))?.is_some())
    }

    /// Write an entry atomically: temp file in the shard directory, then rename.
    fn write_entry(&self, key: &Key, path: &Path, value: &[u8]) -> Result<()> {
        // Shard directories are created one level at a time so that a missing
        // root is reported rather than silently recreated.
        for dir in self.encoder.shard_dirs(key) {
            match fs::create_dir(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
                Err(e) => return Err(e.into()),
            }
        }

        let mut temp_file = tempfile::NamedTempFile::new_in(self.encoder.shard_dir(key))?;
        temp_file.write_all(value)?;
        temp_file.flush()?;
        temp_file.persist(path)?;

        Ok(())
    }

    /// Fail with an I/O error unless the root is still a directory.
    pub(crate) fn check_root(&self) -> Result<()> {
        match fs::metadata(self.root()) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(Error::root_unavailable(self.root())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::root_unavailable(self.root()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn lock_ledger(&self) -> MutexGuard<'_, DiskUsageLedger> {
        match self.ledger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Create the root if needed and confirm it is a directory.
fn prepare_root(root: &Path) -> Result<()> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => return Err(Error::invalid_store(root, "path is not a directory")),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::invalid_store(root, e.to_string())),
    }

    fs::create_dir_all(root)
        .map_err(|e| Error::invalid_store(root, format!("cannot create directory: {}", e)))
}

/// Size of the entry file at `path`, or `None` if there is none.
fn entry_size(path: &Path) -> Result<Option<u64>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::key::Category;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const ONE_KB: usize = 1024;
    const DEFAULT_MAX: u64 = 4 * 1024;

    /// Content of `size` bytes and a key bound to it.
    fn key_value(category: Category, seed: u64, size: usize) -> (Key, Vec<u8>) {
        let value: Vec<u8> = (0..size)
            .map(|i| (seed as usize).wrapping_mul(31).wrapping_add(i) as u8)
            .collect();
        let mut tagged = seed.to_le_bytes().to_vec();
        tagged.extend_from_slice(&value);
        (Key::new(category, Identity::digest(&tagged)), value)
    }

    fn category_for(n: u64) -> Category {
        Category::ALL[n as usize % Category::ALL.len()]
    }

    fn open(temp_dir: &TempDir, max: u64) -> PermanentStore {
        PermanentStore::new(temp_dir.path().join("permanent_store"), max).unwrap()
    }

    #[test]
    fn test_new_creates_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("a").join("b").join("store");
        let store = PermanentStore::new(&root, 1).unwrap();

        assert!(root.is_dir());
        assert_eq!(store.root(), root);
        assert_eq!(store.disk_usage(), 0);
        assert_eq!(store.max_disk_usage(), 1);
    }

    #[test]
    fn test_new_accepts_existing_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = PermanentStore::new(temp_dir.path(), 200_000).unwrap();
        assert_eq!(store.disk_usage(), 0);
    }

    #[test]
    fn test_new_various_capacities() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("permanent_store");
        for max in [0, 1, 200_000] {
            assert!(PermanentStore::new(&root, max).is_ok());
        }
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("File");
        fs::write(&file_path, " ").unwrap();

        let result = PermanentStore::new(&file_path, 200_000);
        assert!(matches!(result, Err(Error::InvalidStore { .. })));

        let result = PermanentStore::new(file_path.join("base"), 200_000);
        assert!(matches!(result, Err(Error::InvalidStore { .. })));
    }

    #[test]
    fn test_zero_capacity_rejects_every_put() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, 0);
        let (key, value) = key_value(Category::Mid, 1, 1);

        let result = store.put(&key, &value);
        assert!(matches!(result, Err(Error::CapacityExceeded { .. })));
        assert!(!store.entry_path(&key).exists());
    }

    #[test]
    fn test_successful_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, DEFAULT_MAX);
        let (key1, value1) = key_value(Category::Anmid, 1, 2 * ONE_KB);
        let (key2, value2) = key_value(Category::MutableData, 2, 2 * ONE_KB);

        store.put(&key1, &value1).unwrap();
        store.put(&key2, &value2).unwrap();

        assert_eq!(store.get(&key1).unwrap(), value1);
        assert_eq!(store.get(&key2).unwrap(), value2);
        assert_eq!(store.disk_usage(), DEFAULT_MAX);
    }

    #[test]
    fn test_entry_file_holds_raw_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, DEFAULT_MAX);
        let (key, value) = key_value(Category::ImmutableData, 3, 300);

        store.put(&key, &value).unwrap();

        let path = store.entry_path(&key);
        assert!(path.starts_with(store.root()));
        assert_eq!(fs::read(&path).unwrap(), value);
        assert_eq!(fs::metadata(&path).unwrap().len(), store.disk_usage());
    }

    #[test]
    fn test_unsuccessful_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, DEFAULT_MAX);
        let (key, value) = key_value(Category::Smid, 4, DEFAULT_MAX as usize + 1);

        match store.put(&key, &value) {
            Err(Error::CapacityExceeded {
                requested, used, max, ..
            }) => {
                assert_eq!(requested, DEFAULT_MAX + 1);
                assert_eq!(used, 0);
                assert_eq!(max, DEFAULT_MAX);
            }
            other => panic!("expected capacity error, got {:?}", other),
        }
        assert!(matches!(store.get(&key), Err(Error::NotFound { .. })));
        assert_eq!(store.disk_usage(), 0);
    }

    #[test]
    fn test_put_empty_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, DEFAULT_MAX);
        let key = Key::Maid(Identity::digest(b""));

        assert!(matches!(store.put(&key, &[]), Err(Error::EmptyValue { .. })));
        assert!(!store.contains(&key).unwrap());
    }

    #[test]
    fn test_get_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, DEFAULT_MAX);
        let (key, _) = key_value(Category::Tmid, 5, 10);

        assert!(matches!(store.get(&key), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_delete_on_overfill() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, DEFAULT_MAX);

        let pairs: Vec<_> = (0..4)
            .map(|i| key_value(category_for(i), i, ONE_KB))
            .collect();
        for (key, value) in &pairs {
            store.put(key, value).unwrap();
            assert_eq!(&store.get(key).unwrap(), value);
        }
        assert_eq!(store.disk_usage(), DEFAULT_MAX);

        let (key, value) = key_value(Category::Pmid, 100, 2 * ONE_KB);
        assert!(matches!(
            store.put(&key, &value),
            Err(Error::CapacityExceeded { .. })
        ));
        assert!(matches!(store.get(&key), Err(Error::NotFound { .. })));

        store.delete(&pairs[0].0).unwrap();
        store.delete(&pairs[1].0).unwrap();
        assert_eq!(store.disk_usage(), 2 * ONE_KB as u64);

        store.put(&key, &value).unwrap();
        assert_eq!(store.get(&key).unwrap(), value);
        assert_eq!(store.disk_usage(), DEFAULT_MAX);
    }

    #[test]
    fn test_delete_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, DEFAULT_MAX);
        let (kept, kept_value) = key_value(Category::Anmpid, 6, 100);
        let (key, value) = key_value(Category::Mpid, 7, 200);
        let (never, _) = key_value(Category::Antmid, 8, 1);

        store.put(&kept, &kept_value).unwrap();
        store.put(&key, &value).unwrap();
        store.delete(&key).unwrap();
        assert_eq!(store.disk_usage(), 100);

        store.delete(&key).unwrap();
        store.delete(&never).unwrap();
        assert_eq!(store.disk_usage(), 100);
        assert!(matches!(store.get(&key), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_categories_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, DEFAULT_MAX);
        let id = Identity::digest(b"shared identity");

        store.put(&Key::Maid(id), b"maid").unwrap();
        store.put(&Key::Pmid(id), b"pmid value").unwrap();

        assert_eq!(store.get(&Key::Maid(id)).unwrap(), b"maid");
        assert_eq!(store.get(&Key::Pmid(id)).unwrap(), b"pmid value");
        assert!(matches!(
            store.get(&Key::Mid(id)),
            Err(Error::NotFound { .. })
        ));

        store.delete(&Key::Maid(id)).unwrap();
        assert_eq!(store.get(&Key::Pmid(id)).unwrap(), b"pmid value");
        assert_eq!(store.disk_usage(), 10);
    }

    #[test]
    fn test_overwrite_same_value_not_double_counted() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, DEFAULT_MAX);
        let (key, value) = key_value(Category::ImmutableData, 9, 3 * ONE_KB);

        store.put(&key, &value).unwrap();
        store.put(&key, &value).unwrap();

        assert_eq!(store.disk_usage(), 3 * ONE_KB as u64);
        assert_eq!(store.get(&key).unwrap(), value);
    }

    #[test]
    fn test_overwrite_accounts_size_delta() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, DEFAULT_MAX);
        let key = Key::MutableData(Identity::digest(b"versioned"));

        store.put(&key, &[1u8; 1000]).unwrap();
        store.put(&key, &[2u8; 3000]).unwrap();
        assert_eq!(store.disk_usage(), 3000);

        store.put(&key, &[3u8; 10]).unwrap();
        assert_eq!(store.disk_usage(), 10);
        assert_eq!(store.get(&key).unwrap(), vec![3u8; 10]);
    }

    #[test]
    fn test_overwrite_over_quota_keeps_old_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, DEFAULT_MAX);
        let key = Key::MutableData(Identity::digest(b"versioned"));
        let (other, other_value) = key_value(Category::Maid, 10, 2 * ONE_KB);

        store.put(&other, &other_value).unwrap();
        store.put(&key, &[1u8; 1000]).unwrap();

        let result = store.put(&key, &[2u8; 2 * ONE_KB + 1]);
        assert!(matches!(result, Err(Error::CapacityExceeded { .. })));
        assert_eq!(store.get(&key).unwrap(), vec![1u8; 1000]);
        assert_eq!(store.disk_usage(), 2 * ONE_KB as u64 + 1000);
    }

    #[test]
    fn test_remove_disk_store() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("new_permanent_store");
        let store = PermanentStore::new(&root, 2).unwrap();
        let (key, small_value) = key_value(Category::Anmaid, 11, 1);
        let (key1, large_value) = key_value(Category::Ansmid, 12, 2);

        store.put(&key, &small_value).unwrap();
        store.delete(&key).unwrap();
        fs::remove_dir_all(&root).unwrap();

        assert!(store.put(&key, &small_value).unwrap_err().is_io());
        assert!(store.get(&key).unwrap_err().is_io());
        assert!(store.delete(&key).unwrap_err().is_io());
        assert!(!root.exists());

        let store = PermanentStore::new(&root, 2).unwrap();
        store.put(&key1, &large_value).unwrap();
        store.delete(&key1).unwrap();
        fs::remove_dir_all(&root).unwrap();

        assert!(store.put(&key, &small_value).unwrap_err().is_io());
        assert!(store.get(&key).unwrap_err().is_io());
        assert!(store.delete(&key).unwrap_err().is_io());
        assert!(store.contains(&key).unwrap_err().is_io());
        assert!(!root.exists());
    }

    #[test]
    fn test_root_replaced_by_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("store");
        let store = PermanentStore::new(&root, DEFAULT_MAX).unwrap();
        let (key, value) = key_value(Category::Mid, 13, 10);

        fs::remove_dir_all(&root).unwrap();
        fs::write(&root, b"not a directory").unwrap();

        assert!(store.put(&key, &value).unwrap_err().is_io());
        assert!(store.get(&key).unwrap_err().is_io());
        assert_eq!(store.disk_usage(), 0);
    }

    #[test]
    fn test_failed_write_rolls_back_reservation() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, 1024 * 1024);
        let (kept, kept_value) = key_value(Category::Maid, 14, 100);
        store.put(&kept, &kept_value).unwrap();

        // A directory squatting on the entry path: the size check passes and
        // the reservation is taken, then the final rename fails.
        let key = Key::ImmutableData(Identity::digest(b"blocked by directory"));
        fs::create_dir_all(store.entry_path(&key)).unwrap();

        let result = store.put(&key, &[7u8; 64 * 1024]);
        assert!(result.unwrap_err().is_io());
        assert_eq!(store.disk_usage(), 100);
        assert_eq!(store.get(&kept).unwrap(), kept_value);
    }

    #[test]
    fn test_blocked_shard_dir_leaves_usage() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, DEFAULT_MAX);
        let (kept, kept_value) = key_value(Category::Pmid, 15, 200);
        store.put(&kept, &kept_value).unwrap();

        let key = Key::Mpid(Identity::from_bytes([0x5a; 64]));
        let shards = store.encoder().shard_dirs(&key);
        fs::write(&shards[0], b"not a directory").unwrap();

        assert!(store.put(&key, &[1u8; 10]).unwrap_err().is_io());
        assert_eq!(store.disk_usage(), 200);
        assert!(store.root().is_dir());
    }

    #[test]
    fn test_concurrent_disjoint_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, 1024 * 1024);
        let threads = 8u64;
        let per_thread = 20u64;

        std::thread::scope(|s| {
            for t in 0..threads {
                let store = &store;
                s.spawn(move || {
                    for i in 0..per_thread {
                        let seed = t * 1000 + i;
                        let size = 1 + (seed as usize % 300);
                        let (key, value) = key_value(category_for(seed), seed, size);
                        store.put(&key, &value).unwrap();
                        assert_eq!(store.get(&key).unwrap(), value);
                        if i % 3 == 0 {
                            store.delete(&key).unwrap();
                            assert!(matches!(store.get(&key), Err(Error::NotFound { .. })));
                        }
                    }
                });
            }
        });

        let mut expected = 0u64;
        for t in 0..threads {
            for i in 0..per_thread {
                let seed = t * 1000 + i;
                let (key, value) = key_value(category_for(seed), seed, 1 + (seed as usize % 300));
                if i % 3 == 0 {
                    assert!(!store.contains(&key).unwrap());
                } else {
                    assert_eq!(store.get(&key).unwrap(), value);
                    expected += value.len() as u64;
                }
            }
        }
        assert_eq!(store.disk_usage(), expected);
    }

    #[test]
    fn test_concurrent_puts_never_overshoot() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir, 2000);
        let accepted = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for t in 0..8u64 {
                let store = &store;
                let accepted = &accepted;
                s.spawn(move || {
                    for i in 0..10u64 {
                        let (key, value) = key_value(Category::ImmutableData, t * 100 + i, 100);
                        match store.put(&key, &value) {
                            Ok(()) => {
                                accepted.fetch_add(1, Ordering::SeqCst);
                            }
                            Err(Error::CapacityExceeded { .. }) => {}
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                });
            }
        });

        assert_eq!(accepted.load(Ordering::SeqCst), 20);
        assert_eq!(store.disk_usage(), 2000);
    }

    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Put(usize, usize),
        Delete(usize),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..6, 1usize..400).prop_map(|(k, size)| Op::Put(k, size)),
            (0usize..6).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Usage never exceeds the quota and always equals the bytes retrievable via get.
        #[test]
        fn prop_quota_invariant(
            max in 0u64..1500,
            ops in prop::collection::vec(arb_op(), 1..40)
        ) {
            let temp_dir = TempDir::new().unwrap();
            let store = PermanentStore::new(temp_dir.path(), max).unwrap();
            let keys: Vec<Key> = (0..6u64)
                .map(|i| Key::new(category_for(i), Identity::digest(&i.to_le_bytes())))
                .collect();
            let mut model: HashMap<usize, Vec<u8>> = HashMap::new();

            for (n, op) in ops.into_iter().enumerate() {
                match op {
                    Op::Put(k, size) => {
                        let value = vec![n as u8; size];
                        let old = model.get(&k).map_or(0, |v| v.len() as u64);
                        let used: u64 = model.values().map(|v| v.len() as u64).sum();
                        let fits = used - old + size as u64 <= max;
                        let result = store.put(&keys[k], &value);
                        prop_assert_eq!(result.is_ok(), fits);
                        if fits {
                            model.insert(k, value);
                        }
                    }
                    Op::Delete(k) => {
                        store.delete(&keys[k])?;
                        model.remove(&k);
                    }
                }

                let used: u64 = model.values().map(|v| v.len() as u64).sum();
                prop_assert!(store.disk_usage() <= max);
                prop_assert_eq!(store.disk_usage(), used);
            }

            for (k, key) in keys.iter().enumerate() {
                match model.get(&k) {
                    Some(value) => prop_assert_eq!(&store.get(key)?, value),
                    None => {
                        let missing = matches!(store.get(key), Err(Error::NotFound { .. }));
                        prop_assert!(missing, "expected {} to be absent", key);
                    }
                }
            }
        }
    }
}
