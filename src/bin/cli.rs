//! StrataKV CLI
//!
//! Command-line driver for a StrataKV storage directory.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use stratakv::{Config, Engine, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// StrataKV CLI
#[derive(Parser, Debug)]
#[command(name = "stratakv-cli")]
#[command(about = "CLI for the StrataKV LSM key-value store")]
#[command(version)]
struct Args {
    /// Storage directory
    #[arg(short, long, env = "DB_PATH")]
    db_path: PathBuf,

    /// Memtable entries before flush
    #[arg(short, long, env = "STRATAKV_THRESHOLD", default_value = "100")]
    threshold: usize,

    /// Store flushed values uncompressed
    #[arg(long)]
    no_compression: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Set a key-value pair and persist it
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// Seconds until the key expires
        #[arg(long)]
        ttl: Option<f64>,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Load the storage directory and write a snapshot file
    Snapshot {
        /// Snapshot file to write
        file: PathBuf,
    },

    /// Run a short scripted walkthrough of the engine
    Demo {
        /// Snapshot file to save and reload
        #[arg(long, env = "FILEPATH")]
        snapshot: Option<PathBuf>,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stratakv=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    tracing::info!("StrataKV CLI v{}", stratakv::VERSION);
    tracing::info!("Storage directory: {}", args.db_path.display());

    let config = Config::builder()
        .db_path(&args.db_path)
        .threshold(args.threshold)
        .compression(!args.no_compression)
        .build();

    if let Err(e) = run(config, args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: Config, command: Commands) -> Result<()> {
    let mut engine = Engine::open(config)?;

    match command {
        Commands::Put { key, value, ttl } => {
            engine.load()?;
            let ttl = match ttl {
                Some(secs) if secs.is_finite() && secs >= 0.0 => Some(Duration::from_secs_f64(secs)),
                Some(secs) => {
                    return Err(stratakv::StrataError::Config(format!(
                        "ttl must be a non-negative number of seconds, got {}",
                        secs
                    )))
                }
                None => None,
            };
            engine.put(key, value, ttl)?;
            engine.flush()?;
            engine.persist()?;
            println!("OK");
        }
        Commands::Get { key } => {
            engine.load()?;
            print_value(&key, engine.get(&key)?);
        }
        Commands::Snapshot { file } => {
            engine.load()?;
            engine.save_snapshot(&file)?;
            println!("Snapshot written to {}", file.display());
        }
        Commands::Demo { snapshot } => demo(engine, snapshot)?,
    }

    Ok(())
}

fn demo(mut engine: Engine, snapshot: Option<PathBuf>) -> Result<()> {
    for i in 1..=4 {
        engine.put(format!("key{}", i), format!("value{}", i), None)?;
    }
    for key in ["key1", "key2", "key3", "key4", "key5"] {
        print_value(key, engine.get(key)?);
    }

    engine.put("key2", "new_value2", None)?;
    print_value("key2", engine.get("key2")?);

    engine.put("temp_key1", "temp_value1", Some(Duration::from_secs(1)))?;
    engine.put("temp_key2", "temp_value2", Some(Duration::from_secs(2)))?;
    println!("Waiting for temporary keys to expire...");
    thread::sleep(Duration::from_secs(2));
    print_value("temp_key1", engine.get("temp_key1")?);
    print_value("temp_key2", engine.get("temp_key2")?);

    engine.flush()?;
    let stats = engine.persist()?;
    println!(
        "Persisted {} segment(s), {} entries",
        stats.segments_written, stats.entries_written
    );

    engine.load()?;
    print_value("key1", engine.get("key1")?);
    print_value("key2", engine.get("key2")?);

    if let Some(path) = snapshot {
        engine.save_snapshot(&path)?;
        let mut restored = Engine::load_snapshot(&path)?;
        println!("Restored snapshot from {}", path.display());
        print_value("key1", restored.get("key1")?);
        print_value("key2", restored.get("key2")?);
    }

    engine.close()
}

fn print_value(key: &str, value: Option<Vec<u8>>) {
    match value {
        Some(v) => println!("{} = {}", key, String::from_utf8_lossy(&v)),
        None => println!("{} = (nil)", key),
    }
}
