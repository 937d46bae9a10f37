//! Mapping keys to filesystem locations.
//!
//! An entry lives at `{root}/{id[0]}/{id[1]}/{id[2..]}.{category}`, with every
//! identity byte hex encoded. The first two identity bytes select the shard
//! directories, so each leaf directory holds a 1/65536 slice of the key space.
//! The category tag is part of the leaf name, which keeps categories disjoint
//! even when their identities coincide.

use crate::identity::{IDENTITY_SIZE, Identity};
use crate::key::{Category, Key};
use std::path::{Component, Path, PathBuf};

/// Number of shard directory levels between the root and an entry file.
pub const SHARD_DEPTH: usize = 2;

/// Separates the identity suffix from the category tag in a leaf name.
const CATEGORY_SEPARATOR: char = '.';

/// Deterministic, injective key-to-path encoding rooted at a store directory.
#[derive(Debug, Clone)]
pub struct PathEncoder {
    root: PathBuf,
}

impl PathEncoder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry file for `key`.
    pub fn encode(&self, key: &Key) -> PathBuf {
        self.shard_dir(key).join(leaf_name(key))
    }

    /// Directory that holds the entry file for `key`.
    pub fn shard_dir(&self, key: &Key) -> PathBuf {
        let bytes = key.identity().as_bytes();
        let mut dir = self.root.clone();
        for byte in &bytes[..SHARD_DEPTH] {
            dir.push(hex::encode([*byte]));
        }
        dir
    }

    /// Shard directories for `key`, outermost first.
    pub fn shard_dirs(&self, key: &Key) -> Vec<PathBuf> {
        let bytes = key.identity().as_bytes();
        let mut dirs = Vec::with_capacity(SHARD_DEPTH);
        let mut dir = self.root.clone();
        for byte in &bytes[..SHARD_DEPTH] {
            dir.push(hex::encode([*byte]));
            dirs.push(dir.clone());
        }
        dirs
    }

    /// Recover the key from an entry path under the root.
    ///
    /// Returns `None` for anything that is not an entry file name, including
    /// temporary files left by interrupted writes.
    pub fn decode(&self, path: &Path) -> Option<Key> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;

        if parts.len() != SHARD_DEPTH + 1 {
            return None;
        }

        let (suffix, tag) = parts[SHARD_DEPTH].split_once(CATEGORY_SEPARATOR)?;
        let category = Category::from_tag(tag)?;

        let mut hex_str = String::with_capacity(IDENTITY_SIZE * 2);
        for shard in &parts[..SHARD_DEPTH] {
            if shard.len() != 2 {
                return None;
            }
            hex_str.push_str(shard);
        }
        hex_str.push_str(suffix);

        // Only the canonical lowercase form produced by `encode` is accepted.
        if hex_str.chars().any(|c| c.is_ascii_uppercase()) {
            return None;
        }
        let identity = Identity::from_hex(&hex_str).ok()?;
        Some(Key::new(category, identity))
    }
}

fn leaf_name(key: &Key) -> String {
    let bytes = key.identity().as_bytes();
    format!(
        "{}{}{}",
        hex::encode(&bytes[SHARD_DEPTH..]),
        CATEGORY_SEPARATOR,
        key.category().tag()
    )
}
