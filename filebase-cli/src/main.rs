use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use filebase_core::{
    Collection, EncodeOptions, FileBaseConfig, FileCollection, FileDatabase, Query, RemoveOptions,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "filebase")]
#[command(about = "FileBase CLI - query and edit FileBase document files")]
#[command(version)]
struct Cli {
    /// Document file (overrides the config's `path`)
    #[arg(long, global = true)]
    file: Option<PathBuf>,
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the document file with empty collections if it is missing
    Init {
        /// Collections to create
        collections: Vec<String>,
    },
    /// Print the document
    Show {
        /// Only print these top-level keys (comma separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
        /// Indentation width (0 = compact)
        #[arg(long, default_value_t = 2)]
        spaces: usize,
    },
    /// Print the records matching a query
    Find {
        collection: String,
        /// Query as a JSON object of exact field values
        #[arg(long, default_value = "{}")]
        query: String,
        /// Print only the first match
        #[arg(long)]
        one: bool,
    },
    /// Append records (JSON) to a collection
    Add {
        collection: String,
        records: Vec<String>,
    },
    /// Remove records matching a query
    Remove {
        collection: String,
        #[arg(long)]
        query: String,
        /// Only the first match
        #[arg(long)]
        one: bool,
        /// Drop the slots instead of leaving null holes
        #[arg(long)]
        compact: bool,
    },
    /// Replace records matching a query
    Update {
        collection: String,
        #[arg(long)]
        query: String,
        /// Replacement record (JSON)
        record: String,
        /// Only the first match
        #[arg(long)]
        one: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.file.as_deref(), cli.config.as_deref())?;
    let db = config.open_database();

    match cli.command {
        Commands::Init { collections } => init(&db, &collections).await,
        Commands::Show { only, spaces } => show(&db, &only, spaces).await,
        Commands::Find {
            collection,
            query,
            one,
        } => find(&db, &collection, &query, one).await,
        Commands::Add {
            collection,
            records,
        } => add(&db, &collection, &records).await,
        Commands::Remove {
            collection,
            query,
            one,
            compact,
        } => remove(&db, &collection, &query, one, compact).await,
        Commands::Update {
            collection,
            query,
            record,
            one,
        } => update(&db, &collection, &query, &record, one).await,
    }
}

fn resolve_config(file: Option<&Path>, config: Option<&Path>) -> Result<FileBaseConfig> {
    let mut resolved = match config {
        Some(path) => FileBaseConfig::from_file(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?,
        None => FileBaseConfig::new("filebase.json"),
    };
    if let Some(file) = file {
        resolved.path = file.to_path_buf();
    }
    Ok(resolved)
}

fn parse_json(text: &str, what: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("Invalid JSON in {}: {}", what, text))
}

fn parse_query(text: &str) -> Result<Query> {
    let json = parse_json(text, "query")?;
    Query::from_json(&json).with_context(|| format!("Invalid query: {}", text))
}

fn open_collection(db: &FileDatabase, name: &str) -> FileCollection<Value> {
    db.collection(name)
}

async fn load(db: &FileDatabase) -> Result<()> {
    db.ensure_loaded()
        .await
        .with_context(|| format!("Failed to open document: {}", db.path().display()))
}

async fn save(db: &FileDatabase) -> Result<()> {
    db.save()
        .await
        .with_context(|| format!("Failed to save document: {}", db.path().display()))
}

async fn init(db: &FileDatabase, collections: &[String]) -> Result<()> {
    for name in collections {
        open_collection(db, name);
    }
    load(db).await?;
    println!(
        "{} ready with collections: {}",
        db.path().display(),
        db.list_collections().join(", ")
    );
    Ok(())
}

async fn show(db: &FileDatabase, only: &[String], spaces: usize) -> Result<()> {
    load(db).await?;

    // The root is the only entry reported with an empty key
    let only_listed = |key: &str, value: &Value| -> Option<Value> {
        match value {
            Value::Object(map) if key.is_empty() => Some(Value::Object(
                map.iter()
                    .filter(|(k, _)| only.iter().any(|o| o == *k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )),
            _ => Some(value.clone()),
        }
    };
    let mut options = EncodeOptions::indented(spaces);
    if !only.is_empty() {
        options = options.with_replacer(&only_listed);
    }

    let text = db.file().read().to_text(&options)?;
    println!("{}", text);
    Ok(())
}

async fn find(db: &FileDatabase, collection: &str, query: &str, one: bool) -> Result<()> {
    let query = parse_query(query)?;
    let coll = open_collection(db, collection);

    let records = if one {
        coll.find_one(&query).await?.into_iter().collect()
    } else {
        coll.find(&query).await?
    };

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn add(db: &FileDatabase, collection: &str, records: &[String]) -> Result<()> {
    let records = records
        .iter()
        .map(|text| parse_json(text, "record"))
        .collect::<Result<Vec<_>>>()?;
    let coll = open_collection(db, collection);

    coll.add(&records)
        .await
        .with_context(|| format!("Failed to add records to {}", collection))?;
    save(db).await?;

    println!("Added {} records to '{}'", records.len(), collection);
    Ok(())
}

async fn remove(db: &FileDatabase, collection: &str, query: &str, one: bool, compact: bool) -> Result<()> {
    let query = parse_query(query)?;
    let coll = open_collection(db, collection);
    let options = if compact {
        RemoveOptions::compact()
    } else {
        RemoveOptions::default()
    };

    let touched = if one {
        usize::from(coll.remove_one(&query, options).await?)
    } else {
        coll.remove(&query, options).await?
    };
    save(db).await?;

    println!("Removed {} records from '{}'", touched, collection);
    Ok(())
}

async fn update(db: &FileDatabase, collection: &str, query: &str, record: &str, one: bool) -> Result<()> {
    let query = parse_query(query)?;
    let record = parse_json(record, "record")?;
    let coll = open_collection(db, collection);

    let touched = if one {
        usize::from(coll.update_one(&query, &record).await?)
    } else {
        coll.update(&query, &record).await?
    };
    save(db).await?;

    println!("Updated {} records in '{}'", touched, collection);
    Ok(())
}
