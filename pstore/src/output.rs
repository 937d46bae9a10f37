//! Command results rendered as text or JSON.
//!
//! Every JSON document carries `success` and `result_code` next to the
//! command-specific fields, so scripts can branch without parsing text.

use anyhow::Result;
use pstore_core::{Category, Identity, Key};
use serde::Serialize;
use std::io::{self, Write};

/// Renders command results on stdout and failures on stderr.
#[derive(Debug, Clone, Copy)]
pub struct OutputWriter {
    json: bool,
}

/// Status fields wrapped around a command's own payload.
#[derive(Serialize)]
struct Envelope<'a, T> {
    success: bool,
    result_code: u8,
    #[serde(flatten)]
    payload: &'a T,
}

#[derive(Serialize)]
struct Failure {
    error: String,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Report a successful command. `text` is only rendered in text mode.
    pub fn success<T: Serialize>(&self, payload: &T, text: impl FnOnce() -> String) -> Result<()> {
        let mut stdout = io::stdout().lock();
        if self.json {
            let envelope = Envelope {
                success: true,
                result_code: 0,
                payload,
            };
            serde_json::to_writer_pretty(&mut stdout, &envelope)?;
            writeln!(stdout)?;
        } else {
            stdout.write_all(text().as_bytes())?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Report a failed command on stderr, including its context chain.
    pub fn failure(&self, error: &anyhow::Error, result_code: u8) {
        let message = format!("{:#}", error);
        let mut stderr = io::stderr().lock();
        if !self.json {
            let _ = writeln!(stderr, "Error: {}", message);
            return;
        }
        let envelope = Envelope {
            success: false,
            result_code,
            payload: &Failure { error: message },
        };
        if serde_json::to_writer_pretty(&mut stderr, &envelope).is_ok() {
            let _ = writeln!(stderr);
        }
    }
}

/// Key as shown to users.
#[derive(Debug, Clone, Serialize)]
pub struct KeyInfo {
    pub category: Category,
    pub identity: Identity,
}

impl From<Key> for KeyInfo {
    fn from(key: Key) -> Self {
        Self {
            category: key.category(),
            identity: *key.identity(),
        }
    }
}

/// Result of `put`.
#[derive(Debug, Serialize)]
pub struct Stored {
    #[serde(flatten)]
    pub key: KeyInfo,
    pub size: u64,
    pub disk_usage: u64,
}

/// Result of `get --output`.
#[derive(Debug, Serialize)]
pub struct Retrieved {
    #[serde(flatten)]
    pub key: KeyInfo,
    pub size: u64,
    pub destination: String,
}

/// Result of `delete`.
#[derive(Debug, Serialize)]
pub struct Deleted {
    #[serde(flatten)]
    pub key: KeyInfo,
    pub existed: bool,
    pub disk_usage: u64,
}

/// Result of `path`.
#[derive(Debug, Serialize)]
pub struct Located {
    #[serde(flatten)]
    pub key: KeyInfo,
    pub path: String,
    pub exists: bool,
}

/// Result of `usage`.
#[derive(Debug, Serialize)]
pub struct Usage {
    pub root: String,
    pub entries: usize,
    pub disk_usage: u64,
    pub max_disk_usage: u64,
    pub over_quota: bool,
}

/// Result of `ls`.
#[derive(Debug, Serialize)]
pub struct Listing {
    pub keys: Vec<KeyInfo>,
}
