//! geots CLI
//!
//! Reads and writes series in a local data directory. The server must not
//! be running on the same directory.

use clap::{Parser, Subcommand};
use geots::{Config, Engine, Page, Record, TimeSeriesDb};
use serde_json::{json, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// geots CLI
#[derive(Parser, Debug)]
#[command(name = "geots-cli")]
#[command(about = "CLI for a local geots data directory")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./geots_data")]
    data_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append a JSON document to a series
    Put {
        /// Series name
        name: String,

        /// JSON document
        json: String,

        /// Version to write (defaults to now in nanoseconds)
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        version: i64,
    },

    /// Read one version of a series (the latest by default)
    Get {
        /// Series name
        name: String,

        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        version: i64,
    },

    /// List versions of a series, newest first
    Points {
        /// Series name
        name: String,

        /// Exclusive upper bound (defaults to now)
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        start: i64,

        /// Exclusive lower bound
        #[arg(long, default_value = "0")]
        end: i64,

        /// Maximum number of points (0 = all)
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// List series with their latest document
    Keys {
        /// First series name (inclusive)
        #[arg(long, default_value = "")]
        start: String,

        /// Last series name (inclusive, empty = no bound)
        #[arg(long, default_value = "")]
        end: String,

        /// Maximum number of series (0 = all)
        #[arg(long, default_value = "50")]
        limit: usize,

        /// Walk names in descending order
        #[arg(long)]
        reverse: bool,
    },

    /// Check whether a series exists
    Exists {
        /// Series name
        name: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    let engine = match Engine::open(Config::builder().data_dir(&args.data_dir).build()) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: failed to open {}: {}", args.data_dir, e);
            std::process::exit(1);
        }
    };
    let db = TimeSeriesDb::new(engine);

    let outcome = run(&db, args.command);
    let closed = db.into_inner().close();

    if let Err(e) = outcome.and(closed) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(db: &TimeSeriesDb, command: Commands) -> geots::Result<()> {
    match command {
        Commands::Put { name, json, version } => {
            let document: Value = serde_json::from_str(&json)?;
            let record = db.put(name.as_bytes(), &serde_json::to_vec(&document)?, version)?;
            println!("{}", record.version);
        }
        Commands::Get { name, version } => {
            let record = db.get(name.as_bytes(), version)?;
            println!("{}", render(&record));
        }
        Commands::Points { name, start, end, limit } => {
            let page = db.data_points(name.as_bytes(), start, end, limit)?;
            print_page(&page, json!(page.cursor));
        }
        Commands::Keys { start, end, limit, reverse } => {
            let page = if reverse {
                db.reverse_keys(start.as_bytes(), end.as_bytes(), limit)?
            } else {
                db.keys(start.as_bytes(), end.as_bytes(), limit)?
            };
            print_page(&page, json!(String::from_utf8_lossy(&page.cursor)));
        }
        Commands::Exists { name } => {
            println!("{}", db.exists(name.as_bytes())?);
        }
    }
    Ok(())
}

fn print_page<C>(page: &Page<C>, cursor: Value) {
    for record in &page.records {
        println!("{}", render(record));
    }
    println!("{}", json!({ "cursor": cursor }));
}

/// One record as a JSON line; payloads that are not JSON are shown as text
fn render(record: &Record) -> Value {
    let data = serde_json::from_slice(&record.data)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&record.data).into_owned()));
    json!({
        "name": String::from_utf8_lossy(&record.name),
        "time": record.version,
        "data": data,
    })
}
