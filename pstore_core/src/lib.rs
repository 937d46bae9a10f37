//! # pstore core
//!
//! A persistent, content-addressed key/value store on the filesystem with a
//! hard byte quota.
//!
//! Keys pair one of a closed set of [`Category`] tags with a 512-bit
//! [`Identity`]. Each value is stored verbatim in its own file, sharded by
//! identity prefix. Total stored bytes are tracked against a fixed maximum,
//! and a put that would exceed it fails immediately: the store never blocks,
//! evicts, or drops data to make room.
//!
//! ## Features
//!
//! - Deterministic, collision-free key-to-path encoding
//! - Strict disk usage accounting with fail-fast admission
//! - Atomic entry writes (temp file + rename)
//! - Thread-safe: share one store between threads
//! - Optional reconciliation of disk usage with entries left by earlier runs
//!
//! ## Example
//!
//! ```no_run
//! use pstore_core::{Identity, Key, PermanentStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Open a store with a 1 MiB quota
//! let store = PermanentStore::new("./my-store", 1024 * 1024)?;
//!
//! let value = b"hello world";
//! let key = Key::ImmutableData(Identity::digest(value));
//!
//! store.put(&key, value)?;
//! assert_eq!(store.get(&key)?, value);
//!
//! store.delete(&key)?;
//! assert_eq!(store.disk_usage(), 0);
//! # Ok(())
//! # }
//! ```

mod disk_usage;
mod error;
mod identity;
mod key;
mod path;
mod reconcile;
mod store;

pub use disk_usage::DiskUsageLedger;
pub use error::{Error, Result};
pub use identity::{IDENTITY_SIZE, Identity};
pub use key::{Category, Key};
pub use path::{PathEncoder, SHARD_DEPTH};
pub use reconcile::ScanStats;
pub use store::{PermanentStore, StoreOptions};
