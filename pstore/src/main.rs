mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::{Deleted, KeyInfo, Listing, Located, OutputWriter, Retrieved, Stored, Usage};
use pstore_core::{Category, Identity, Key, PermanentStore, StoreOptions};
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Default quota when neither flag nor environment variable is given (1 GiB).
const DEFAULT_MAX_DISK_USAGE: u64 = 1024 * 1024 * 1024;

const RESULT_ERROR: u8 = 1;
const RESULT_CAPACITY_EXCEEDED: u8 = 2;
const RESULT_NOT_FOUND: u8 = 3;

/// pstore - A quota-bounded permanent store
#[derive(Parser)]
#[command(name = "pstore")]
#[command(about = "Quota-bounded, content-addressed permanent store", long_about = None)]
#[command(version)]
struct Cli {
    /// Store root directory (defaults to PSTORE_ROOT env var or ./pstore)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Quota in bytes (defaults to PSTORE_MAX_DISK_USAGE env var or 1 GiB)
    #[arg(short, long, global = true)]
    max_disk_usage: Option<u64>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file (use - for stdin)
    Put {
        /// File to store
        file: PathBuf,

        /// Key category
        #[arg(short, long, default_value = "immutable-data")]
        category: String,

        /// Identity as 128 hex characters (defaults to the content digest)
        #[arg(short, long)]
        identity: Option<String>,
    },

    /// Retrieve a value
    Get {
        category: String,
        identity: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a value (absent keys are not an error)
    Delete { category: String, identity: String },

    /// Show where a key is stored on disk
    Path { category: String, identity: String },

    /// Show entry count and disk usage
    Usage,

    /// List stored keys
    Ls,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let out = OutputWriter::new(cli.json);

    // Determine store root: CLI arg > PSTORE_ROOT env var > ./pstore default
    let root = cli
        .root
        .or_else(|| std::env::var("PSTORE_ROOT").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./pstore"));

    let result = max_disk_usage(cli.max_disk_usage).and_then(|max| {
        let store = open_store(&root, max)?;
        match cli.command {
            Commands::Put {
                file,
                category,
                identity,
            } => cmd_put(&store, &out, &file, &category, identity.as_deref()),
            Commands::Get {
                category,
                identity,
                output,
            } => cmd_get(&store, &out, &category, &identity, output.as_deref()),
            Commands::Delete { category, identity } => {
                cmd_delete(&store, &out, &category, &identity)
            }
            Commands::Path { category, identity } => cmd_path(&store, &out, &category, &identity),
            Commands::Usage => cmd_usage(&store, &out),
            Commands::Ls => cmd_ls(&store, &out),
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = result_code(&err);
            out.failure(&err, code);
            ExitCode::from(code)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Resolve the quota: CLI arg > PSTORE_MAX_DISK_USAGE env var > default.
fn max_disk_usage(arg: Option<u64>) -> Result<u64> {
    if let Some(max) = arg {
        return Ok(max);
    }
    match std::env::var("PSTORE_MAX_DISK_USAGE") {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid PSTORE_MAX_DISK_USAGE: {}", value)),
        Err(_) => Ok(DEFAULT_MAX_DISK_USAGE),
    }
}

fn open_store(root: &Path, max: u64) -> Result<PermanentStore> {
    // Each invocation is a fresh process, so usage must be rebuilt from disk.
    // A store already over a lowered quota still opens so entries can be deleted.
    let options = StoreOptions::new(max)
        .reconcile(true)
        .allow_over_quota(true);
    debug!(root = %root.display(), max, "opening store");
    PermanentStore::with_options(root, options)
        .with_context(|| format!("Failed to open store at {}", root.display()))
}

fn result_code(err: &anyhow::Error) -> u8 {
    let store_error = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<pstore_core::Error>());
    match store_error {
        Some(pstore_core::Error::CapacityExceeded { .. }) => RESULT_CAPACITY_EXCEEDED,
        Some(pstore_core::Error::NotFound { .. }) => RESULT_NOT_FOUND,
        _ => RESULT_ERROR,
    }
}

fn parse_key(category: &str, identity: &str) -> Result<Key> {
    let category: Category = category
        .parse()
        .with_context(|| format!("Unknown category: {}", category))?;
    let identity =
        Identity::from_hex(identity).with_context(|| format!("Invalid identity: {}", identity))?;
    Ok(Key::new(category, identity))
}

fn read_input(file: &Path) -> Result<Vec<u8>> {
    if file == Path::new("-") {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            anyhow::bail!("Refusing to read value from a terminal; pipe data or pass a file");
        }
        let mut data = Vec::new();
        stdin
            .lock()
            .read_to_end(&mut data)
            .context("Failed to read stdin")?;
        return Ok(data);
    }
    std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn cmd_put(
    store: &PermanentStore,
    out: &OutputWriter,
    file: &Path,
    category: &str,
    identity: Option<&str>,
) -> Result<()> {
    let value = read_input(file)?;
    let category: Category = category
        .parse()
        .with_context(|| format!("Unknown category: {}", category))?;
    let identity = match identity {
        Some(hex) => Identity::from_hex(hex).with_context(|| format!("Invalid identity: {}", hex))?,
        None => Identity::digest(&value),
    };
    let key = Key::new(category, identity);

    store
        .put(&key, &value)
        .with_context(|| format!("Failed to store {}", file.display()))?;

    let output = Stored {
        key: key.into(),
        size: value.len() as u64,
        disk_usage: store.disk_usage(),
    };
    out.success(&output, || format!("{} {}\n", category, identity))
}

fn cmd_get(
    store: &PermanentStore,
    out: &OutputWriter,
    category: &str,
    identity: &str,
    output: Option<&Path>,
) -> Result<()> {
    let key = parse_key(category, identity)?;
    let value = store
        .get(&key)
        .with_context(|| format!("Failed to read {}", key))?;

    let Some(dest) = output else {
        if out.is_json() {
            anyhow::bail!("--output is required with --json");
        }
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(&value)?;
        handle.flush()?;
        return Ok(());
    };

    std::fs::write(dest, &value).with_context(|| format!("Failed to write {}", dest.display()))?;

    let output = Retrieved {
        key: key.into(),
        size: value.len() as u64,
        destination: dest.display().to_string(),
    };
    out.success(&output, || {
        format!("Wrote {} bytes to {}\n", value.len(), dest.display())
    })
}

fn cmd_delete(
    store: &PermanentStore,
    out: &OutputWriter,
    category: &str,
    identity: &str,
) -> Result<()> {
    let key = parse_key(category, identity)?;
    let existed = store.contains(&key)?;
    store
        .delete(&key)
        .with_context(|| format!("Failed to delete {}", key))?;

    let output = Deleted {
        key: key.into(),
        existed,
        disk_usage: store.disk_usage(),
    };
    out.success(&output, || {
        if existed {
            format!("Deleted {}\n", key)
        } else {
            format!("Not present: {}\n", key)
        }
    })
}

fn cmd_path(
    store: &PermanentStore,
    out: &OutputWriter,
    category: &str,
    identity: &str,
) -> Result<()> {
    let key = parse_key(category, identity)?;
    let path = store.entry_path(&key);
    let exists = store.contains(&key)?;

    let output = Located {
        key: key.into(),
        path: path.display().to_string(),
        exists,
    };
    out.success(&output, || format!("{}\n", path.display()))
}

fn cmd_usage(store: &PermanentStore, out: &OutputWriter) -> Result<()> {
    let stats = store.scan().context("Failed to scan store")?;

    let output = Usage {
        root: store.root().display().to_string(),
        entries: stats.entries,
        disk_usage: store.disk_usage(),
        max_disk_usage: store.max_disk_usage(),
        over_quota: store.disk_usage() > store.max_disk_usage(),
    };
    out.success(&output, || {
        let mut text = format!(
            "Root: {}\nEntries: {}\nUsed: {} bytes\nMax: {} bytes\n",
            output.root, output.entries, output.disk_usage, output.max_disk_usage
        );
        if output.over_quota {
            text.push_str("Over quota: puts are rejected until entries are deleted\n");
        }
        text
    })
}

fn cmd_ls(store: &PermanentStore, out: &OutputWriter) -> Result<()> {
    let keys = store.keys().context("Failed to list keys")?;

    let output = Listing {
        keys: keys.iter().copied().map(KeyInfo::from).collect(),
    };
    out.success(&output, || {
        keys.iter()
            .map(|key| format!("{} {}\n", key.category(), key.identity()))
            .collect()
    })
}
