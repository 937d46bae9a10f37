//! Keys: a content identity tagged with its category.

use crate::error::{Error, Result};
use crate::identity::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of content categories sharing the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Anmid,
    Ansmid,
    Antmid,
    Anmaid,
    Maid,
    Pmid,
    Mid,
    Smid,
    Tmid,
    Anmpid,
    Mpid,
    ImmutableData,
    MutableData,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 13] = [
        Category::Anmid,
        Category::Ansmid,
        Category::Antmid,
        Category::Anmaid,
        Category::Maid,
        Category::Pmid,
        Category::Mid,
        Category::Smid,
        Category::Tmid,
        Category::Anmpid,
        Category::Mpid,
        Category::ImmutableData,
        Category::MutableData,
    ];

    /// Stable name used in entry filenames and on the command line.
    pub fn tag(&self) -> &'static str {
        match self {
            Category::Anmid => "anmid",
            Category::Ansmid => "ansmid",
            Category::Antmid => "antmid",
            Category::Anmaid => "anmaid",
            Category::Maid => "maid",
            Category::Pmid => "pmid",
            Category::Mid => "mid",
            Category::Smid => "smid",
            Category::Tmid => "tmid",
            Category::Anmpid => "anmpid",
            Category::Mpid => "mpid",
            Category::ImmutableData => "immutable-data",
            Category::MutableData => "mutable-data",
        }
    }

    /// Parse a category from its tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.tag() == tag)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::from_tag(s).ok_or_else(|| Error::invalid_category(s))
    }
}

/// A store key. Two keys are equal iff they share category and identity bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "category", content = "identity", rename_all = "kebab-case")]
pub enum Key {
    Anmid(Identity),
    Ansmid(Identity),
    Antmid(Identity),
    Anmaid(Identity),
    Maid(Identity),
    Pmid(Identity),
    Mid(Identity),
    Smid(Identity),
    Tmid(Identity),
    Anmpid(Identity),
    Mpid(Identity),
    ImmutableData(Identity),
    MutableData(Identity),
}

impl Key {
    /// Build a key of the given category.
    pub fn new(category: Category, identity: Identity) -> Self {
        match category {
            Category::Anmid => Key::Anmid(identity),
            Category::Ansmid => Key::Ansmid(identity),
            Category::Antmid => Key::Antmid(identity),
            Category::Anmaid => Key::Anmaid(identity),
            Category::Maid => Key::Maid(identity),
            Category::Pmid => Key::Pmid(identity),
            Category::Mid => Key::Mid(identity),
            Category::Smid => Key::Smid(identity),
            Category::Tmid => Key::Tmid(identity),
            Category::Anmpid => Key::Anmpid(identity),
            Category::Mpid => Key::Mpid(identity),
            Category::ImmutableData => Key::ImmutableData(identity),
            Category::MutableData => Key::MutableData(identity),
        }
    }

    /// The category this key belongs to.
    pub fn category(&self) -> Category {
        match self {
            Key::Anmid(_) => Category::Anmid,
            Key::Ansmid(_) => Category::Ansmid,
            Key::Antmid(_) => Category::Antmid,
            Key::Anmaid(_) => Category::Anmaid,
            Key::Maid(_) => Category::Maid,
            Key::Pmid(_) => Category::Pmid,
            Key::Mid(_) => Category::Mid,
            Key::Smid(_) => Category::Smid,
            Key::Tmid(_) => Category::Tmid,
            Key::Anmpid(_) => Category::Anmpid,
            Key::Mpid(_) => Category::Mpid,
            Key::ImmutableData(_) => Category::ImmutableData,
            Key::MutableData(_) => Category::MutableData,
        }
    }

    /// The content identity carried by this key.
    pub fn identity(&self) -> &Identity {
        match self {
            Key::Anmid(id)
            | Key::Ansmid(id)
            | Key::Antmid(id)
            | Key::Anmaid(id)
            | Key::Maid(id)
            | Key::Pmid(id)
            | Key::Mid(id)
            | Key::Smid(id)
            | Key::Tmid(id)
            | Key::Anmpid(id)
            | Key::Mpid(id)
            | Key::ImmutableData(id)
            | Key::MutableData(id) => id,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full identities are 128 hex characters; 16 is plenty for messages.
        let hex = self.identity().to_hex();
        write!(f, "{}:{}", self.category(), &hex[..16])
    }
}
