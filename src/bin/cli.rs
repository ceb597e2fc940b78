//! archivekv CLI
//!
//! Command-line interface for inspecting and editing archive files.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use archivekv::{Archive, ArchiveConfig, ArchiveError, Codec, Storage, Value};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// archivekv CLI
#[derive(Parser, Debug)]
#[command(name = "archivekv-cli")]
#[command(about = "Inspect and edit compressed key-value dataset archives")]
#[command(version)]
struct Args {
    /// Archive file
    #[arg(short, long)]
    path: PathBuf,

    /// Value codec: json, utf-8 or structured
    #[arg(short, long, default_value = "json")]
    codec: String,

    /// Max encoded size of a key or value, in bytes
    #[arg(short, long)]
    limit: Option<usize>,

    /// zstd compression level
    #[arg(long, default_value_t = archivekv::config::DEFAULT_COMPRESSION_LEVEL)]
    level: i32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List keys in stored order
    List,

    /// Print the value of a key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key; the value is parsed as JSON, falling back to plain text
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete keys
    Delete {
        /// Keys to delete
        keys: Vec<String>,
    },

    /// Keep only the given keys
    Retain {
        /// Keys to keep
        keys: Vec<String>,
    },

    /// Print every entry as a JSON line: [key, value]
    Export,

    /// Merge JSON lines ([key, value], null value deletes) from a file, or stdin with "-"
    Import {
        /// Input file
        input: PathBuf,
    },

    /// Print entry count and sizes
    Stats,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,archivekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::KeyNotFound) => ExitCode::from(EXIT_KEY_NOT_FOUND),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Exit status of `get` for a key that is not stored
const EXIT_KEY_NOT_FOUND: u8 = 2;

/// How a successful command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Done,
    KeyNotFound,
}

fn run(args: Args) -> archivekv::Result<Outcome> {
    let codec: Codec = args.codec.parse()?;
    let mut builder = ArchiveConfig::builder()
        .codec(codec)
        .compression_level(args.level);
    if let Some(limit) = args.limit {
        builder = builder.entry_size_limit(limit);
    }

    tracing::debug!(path = %args.path.display(), %codec, "opening archive");
    let archive = Archive::open_path(&args.path, builder.build())?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let outcome = execute(&archive, args.command, &mut out)?;
    out.flush()?;
    Ok(outcome)
}

fn execute<S: Storage>(
    archive: &Archive<S>,
    command: Commands,
    out: &mut impl Write,
) -> archivekv::Result<Outcome> {
    match command {
        Commands::List => {
            for key in archive.keys()? {
                writeln!(out, "{}", key?)?;
            }
        }
        Commands::Get { key } => match archive.get(&key)? {
            Some(value) => writeln!(out, "{}", render(&value))?,
            None => {
                tracing::warn!(%key, "key not found");
                return Ok(Outcome::KeyNotFound);
            }
        },
        Commands::Set { key, value } => {
            archive.set(key, Some(parse_value(&value)))?;
        }
        Commands::Delete { keys } => archive.delete(keys)?,
        Commands::Retain { keys } => archive.retain(keys)?,
        Commands::Export => {
            for entry in archive {
                let (key, value) = entry?;
                let line = serde_json::to_string(&(key, render_json(&value)))?;
                writeln!(out, "{}", line)?;
            }
        }
        Commands::Import { input } => {
            let reader: Box<dyn BufRead> = if input.as_os_str() == "-" {
                Box::new(BufReader::new(io::stdin()))
            } else {
                Box::new(BufReader::new(File::open(&input)?))
            };
            let pairs = read_import(reader)?;
            let keys = archive.merge(pairs)?;
            tracing::info!(entries = keys.len(), "import merged");
        }
        Commands::Stats => {
            let stats = archive.stats()?;
            writeln!(out, "entries:      {}", stats.entries)?;
            writeln!(out, "raw bytes:    {}", stats.raw_bytes)?;
            writeln!(out, "stored bytes: {}", stats.stored_bytes)?;
            if stats.stored_bytes > 0 {
                writeln!(
                    out,
                    "ratio:        {:.2}",
                    stats.raw_bytes as f64 / stats.stored_bytes as f64
                )?;
            }
        }
    }

    Ok(Outcome::Done)
}

/// Parse lines of `[key, value]`
fn read_import(reader: impl BufRead) -> archivekv::Result<Vec<(String, Option<Value>)>> {
    let mut pairs = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (key, value): (String, serde_json::Value) = serde_json::from_str(&line)
            .map_err(|e| {
                ArchiveError::MalformedInput(format!("import line {}: {}", line_num + 1, e))
            })?;
        let value = match value {
            serde_json::Value::Null => None,
            other => Some(Value::from(other)),
        };
        pairs.push((key, value));
    }
    Ok(pairs)
}

fn parse_value(text: &str) -> Value {
    serde_json::from_str::<serde_json::Value>(text)
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(text))
}

/// Values print as plain text when they are strings, JSON otherwise
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => render_json(other).to_string(),
    }
}

/// 2^53 - 1
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Best-effort JSON view for display; non-JSON values degrade to text
fn render_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Undefined | Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
            serde_json::Value::from(*n as i64)
        }
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(value.to_string())),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Date(_) => serde_json::Value::String(value.to_string()),
        Value::Bytes(bytes) => serde_json::Value::from(bytes.clone()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(render_json).collect()),
        Value::Object(map) => serde_json::Value::Object(
            map.iter().map(|(k, v)| (k.clone(), render_json(v))).collect(),
        ),
    }
}
