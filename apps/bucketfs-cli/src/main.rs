//! bucketfs - browse and edit a bucket-backed file store from the shell.
//!
//! Run `bucketfs --help` for the command list. Use `/` or `.` for the store
//! root.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BUCKETFS_STORE_KEY` | `files` | File store key (overridden by `--store`) |
//! | `BUCKETFS_*` | | Connection settings, see `StorageConfig::from_env` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::convert::Infallible;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use bucketfs_core::{FileStorageProvider, InMemoryCacheStore, PathSearch, StorageConfig};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
/// Logs go to stderr so they never mix with command output.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    Ok(())
}

/// Browse and edit a bucket-backed file store
#[derive(Debug, Parser)]
#[command(name = "bucketfs", version, about, long_about = None)]
struct Cli {
    /// File store key
    #[arg(long = "store", global = true, env = "BUCKETFS_STORE_KEY", default_value = "files")]
    store_key: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Command {
    /// Create the bucket if it does not exist
    Init,
    /// List sub-paths
    Ls {
        #[arg(default_value = "/", value_parser = store_path)]
        path: String,
    },
    /// List files
    Files {
        #[arg(default_value = "/", value_parser = store_path)]
        path: String,
        /// Include files in all sub-paths
        #[arg(long)]
        all: bool,
    },
    /// Show one file as JSON
    Stat {
        #[arg(value_parser = store_path)]
        path: String,
        name: String,
    },
    /// Download a file to OUT or stdout
    Get {
        #[arg(value_parser = store_path)]
        path: String,
        name: String,
        out: Option<PathBuf>,
    },
    /// Upload a local file
    Put {
        #[arg(value_parser = store_path)]
        path: String,
        local: PathBuf,
        /// Stored file name (defaults to the local file name)
        #[arg(long)]
        name: Option<String>,
        /// Pick a free name instead of replacing an existing file
        #[arg(long)]
        unique: bool,
    },
    /// Create a path
    Mkdir {
        #[arg(value_parser = store_path)]
        path: String,
    },
    /// Delete a file
    Rm {
        #[arg(value_parser = store_path)]
        path: String,
        name: String,
    },
    /// Delete a path recursively
    Rmdir {
        #[arg(value_parser = store_path)]
        path: String,
    },
    /// Print a pre-signed download URL
    Url {
        #[arg(value_parser = store_path)]
        path: String,
        name: String,
    },
}

#[allow(clippy::unnecessary_wraps)]
fn store_path(arg: &str) -> Result<String, Infallible> {
    Ok(match arg {
        "/" | "." => String::new(),
        other => other.to_owned(),
    })
}

fn local_file_name(local: &Path) -> Result<String> {
    local
        .file_name()
        .and_then(|n| n.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("cannot take a file name from {}", local.display()))
}

fn display_name(path: &str, name: &str, separator: char) -> String {
    if path.is_empty() {
        name.to_owned()
    } else {
        format!("{path}{separator}{name}")
    }
}

fn run(provider: &FileStorageProvider, config: &StorageConfig, command: Command) -> Result<()> {
    let separator = config.directory_separator;
    let mut stdout = std::io::stdout().lock();
    match command {
        Command::Init => provider.initialize(),
        Command::Ls { path } => {
            for sub_path in provider.get_paths(&path)? {
                writeln!(stdout, "{sub_path}")?;
            }
        }
        Command::Files { path, all } => {
            let search = if all {
                PathSearch::AllPaths
            } else {
                PathSearch::TopLevelPathOnly
            };
            for file in provider.get_files(&path, search)? {
                let name = display_name(&file.path, &file.file_name, separator);
                writeln!(stdout, "{:>12}  {name}", file.content_length)?;
            }
        }
        Command::Stat { path, name } => {
            let file = provider.get_file(&path, &name)?.with_context(|| {
                format!("no such file: {}", display_name(&path, &name, separator))
            })?;
            let json = serde_json::json!({
                "storeKey": file.store_key,
                "path": file.path,
                "fileName": file.file_name,
                "contentLength": file.content_length,
            });
            writeln!(stdout, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        Command::Get { path, name, out } => {
            let content = provider.get_content(&path, &name)?;
            match out {
                Some(out) => std::fs::write(&out, &content)
                    .with_context(|| format!("failed to write {}", out.display()))?,
                None => stdout.write_all(&content)?,
            }
        }
        Command::Put {
            path,
            local,
            name,
            unique,
        } => {
            let name = match name {
                Some(name) => name,
                None => local_file_name(&local)?,
            };
            let file = File::open(&local)
                .with_context(|| format!("failed to open {}", local.display()))?;
            let stored = provider
                .add_file_from_stream(&path, &name, Box::new(file), unique)
                .with_context(|| format!("failed to upload {}", local.display()))?;
            writeln!(
                stdout,
                "{}",
                display_name(&stored.path, &stored.file_name, separator)
            )?;
        }
        Command::Mkdir { path } => provider.add_path(&path)?,
        Command::Rm { path, name } => provider.delete_file(&path, &name)?,
        Command::Rmdir { path } => provider.delete_path(&path)?,
        Command::Url { path, name } => {
            let url = provider.get_download_url(&path, &name);
            if url.is_empty() {
                bail!(
                    "no download URL for {}",
                    display_name(&path, &name, separator)
                );
            }
            writeln!(stdout, "{url}")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = StorageConfig::from_env();
    init_tracing(&config.log_level)?;

    if config.bucket.is_empty() {
        bail!("BUCKETFS_BUCKET is not set");
    }

    info!(
        store_key = %cli.store_key,
        bucket = %config.bucket,
        auth_mode = ?config.auth_mode(),
        "opening file store"
    );
    debug!(?config, "storage configuration");

    let provider = FileStorageProvider::connect(
        cli.store_key,
        &config,
        Arc::new(InMemoryCacheStore::new()),
    )
    .context("failed to create connection")?;

    run(&provider, &config, cli.command)
}
