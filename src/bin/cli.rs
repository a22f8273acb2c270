//! AtlasDoc CLI
//!
//! Command-line interface for inspecting and editing an AtlasDoc data directory.

use std::process;

use atlasdoc::{Config, Database, Document, Filter, SortOrder, Value};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// AtlasDoc CLI
#[derive(Parser, Debug)]
#[command(name = "atlasdoc-cli")]
#[command(about = "CLI for the AtlasDoc embedded document store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./atlasdoc_data")]
    data_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert a document built from key=value fields
    Insert {
        /// Collection name
        collection: String,

        /// Fields as key=value
        fields: Vec<String>,
    },

    /// Find documents matching key=value conditions
    Find {
        /// Collection name
        collection: String,

        /// Conditions as key=value (none = all documents)
        conditions: Vec<String>,

        /// Field to sort by
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending instead of ascending
        #[arg(long)]
        desc: bool,

        /// Number of results to skip
        #[arg(long, default_value = "0")]
        skip: usize,

        /// Max number of results (0 = no limit)
        #[arg(long, default_value = "0")]
        limit: usize,
    },

    /// Get a document by id
    Get {
        /// Collection name
        collection: String,

        /// Document id
        id: String,
    },

    /// Merge key=value fields into a document
    Update {
        /// Collection name
        collection: String,

        /// Document id
        id: String,

        /// Fields as key=value
        fields: Vec<String>,
    },

    /// Delete a document by id
    Delete {
        /// Collection name
        collection: String,

        /// Document id
        id: String,
    },

    /// Count documents matching key=value conditions
    Count {
        /// Collection name
        collection: String,

        /// Conditions as key=value (none = all documents)
        conditions: Vec<String>,
    },

    /// List collections
    Collections,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,atlasdoc=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder().data_dir(&args.data_dir).build();
    let db = match Database::open(config) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&db, args.command) {
        tracing::error!("{}", e);
        process::exit(1);
    }

    if let Err(e) = db.close() {
        tracing::error!("Failed to close database: {}", e);
        process::exit(1);
    }
}

fn run(db: &Database, command: Commands) -> Result<(), String> {
    match command {
        Commands::Insert { collection, fields } => {
            let document = parse_fields(&fields)?;
            let stored = db.collection(&collection).insert(document).map_err(|e| e.to_string())?;
            println!("{}", stored);
        }
        Commands::Find {
            collection,
            conditions,
            sort,
            desc,
            skip,
            limit,
        } => {
            let filter = Filter::from(parse_fields(&conditions)?);
            let mut query = db.collection(&collection).find(filter).skip(skip).limit(limit);
            if let Some(field) = sort {
                let order = if desc { SortOrder::Desc } else { SortOrder::Asc };
                query = query.sort(field, order);
            }
            for document in query.exec().map_err(|e| e.to_string())? {
                println!("{}", document);
            }
        }
        Commands::Get { collection, id } => {
            match db.collection(&collection).find_by_id(&id).map_err(|e| e.to_string())? {
                Some(document) => println!("{}", document),
                None => return Err(format!("no document {} in '{}'", id, collection)),
            }
        }
        Commands::Update {
            collection,
            id,
            fields,
        } => {
            let patch = parse_fields(&fields)?;
            let updated = db
                .collection(&collection)
                .update_by_id(&id, patch)
                .map_err(|e| e.to_string())?;
            if !updated {
                return Err(format!("no document {} in '{}'", id, collection));
            }
            println!("updated {}", id);
        }
        Commands::Delete { collection, id } => {
            let deleted = db
                .collection(&collection)
                .delete_by_id(&id)
                .map_err(|e| e.to_string())?;
            println!("{}", if deleted { "deleted" } else { "not found" });
        }
        Commands::Count {
            collection,
            conditions,
        } => {
            let filter = Filter::from(parse_fields(&conditions)?);
            let count = db.collection(&collection).count(filter).map_err(|e| e.to_string())?;
            println!("{}", count);
        }
        Commands::Collections => {
            for name in db.collection_names().map_err(|e| e.to_string())? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

/// Parse `key=value` arguments into a document
fn parse_fields(fields: &[String]) -> Result<Document, String> {
    let mut document = Document::new();
    for field in fields {
        let (key, raw) = field
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got {:?}", field))?;
        if key.is_empty() {
            return Err(format!("empty key in {:?}", field));
        }
        document.insert(key, parse_value(raw));
    }
    Ok(document)
}

/// Parse a scalar: null, bool, integer, finite float, else string
///
/// Double quotes force a string (`name="42"`).
fn parse_value(raw: &str) -> Value {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Value::String(raw[1..raw.len() - 1].to_string());
    }

    match raw {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }

    match raw.parse::<f64>() {
        Ok(x) if x.is_finite() => Value::Float(x),
        _ => Value::String(raw.to_string()),
    }
}
