use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;

use assetbank::{AssetBank, BlobCodec};

#[derive(Parser)]
#[command(name = "assetbank", version, about = "Tagged asset repository tooling")]
struct Cli {
    /// Asset root directory
    #[arg(
        short = 'r',
        long = "root",
        global = true,
        value_name = "PATH",
        default_value = "assets"
    )]
    root: PathBuf,

    /// Asset file extension used within the root
    #[arg(long = "ext", global = true, value_name = "EXT", default_value = "tga")]
    extension: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// File an encoded asset under a tag, assigning the next ID
    Add {
        /// Tag to file the asset under
        tag: String,
        /// Path to the encoded asset file
        file: PathBuf,
    },
    /// Look up one asset by ID
    Get {
        id: u32,
        /// Write the asset bytes here; omit to print record info only
        #[arg(long = "out", value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Search assets by tag substring
    Search {
        /// Substring to match against tags; empty matches everything
        #[arg(default_value = "")]
        query: String,
        /// Matches to skip before the first result
        #[arg(long, default_value_t = 0)]
        skip: usize,
        /// Maximum results to return
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut bank = AssetBank::new(&cli.root, BlobCodec::new(&cli.extension));
    bank.initialize()?;

    match cli.command {
        Command::Add { tag, file } => cmd_add(&mut bank, &tag, &file),
        Command::Get { id, out } => cmd_get(&bank, id, out.as_deref()),
        Command::Search {
            query,
            skip,
            limit,
            json,
        } => cmd_search(&bank, &query, skip, limit, json),
    }
}

fn cmd_add(bank: &mut AssetBank<BlobCodec>, tag: &str, file: &Path) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let id = bank.add(tag, bytes)?;
    println!("stored asset {id} under tag `{tag}`");
    Ok(())
}

fn cmd_get(bank: &AssetBank<BlobCodec>, id: u32, out: Option<&Path>) -> Result<()> {
    let record = bank
        .record(id)
        .ok_or_else(|| anyhow!("no asset with id {id}"))?;
    match out {
        Some(path) => {
            fs::write(path, &record.handle)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "wrote asset {id} ({} bytes, tag `{}`) to {}",
                record.handle.len(),
                record.tag,
                path.display()
            );
        }
        None => println!(
            "asset {id}: tag `{}`, {} bytes",
            record.tag,
            record.handle.len()
        ),
    }
    Ok(())
}

#[derive(Serialize)]
struct SearchRow<'a> {
    id: u32,
    tag: &'a str,
    bytes: usize,
}

fn cmd_search(
    bank: &AssetBank<BlobCodec>,
    query: &str,
    skip: usize,
    limit: usize,
    json: bool,
) -> Result<()> {
    let total = bank.count_matches(query);
    let page = bank.search(query, skip, limit);

    if json {
        let rows: Vec<SearchRow> = page
            .records
            .iter()
            .map(|record| SearchRow {
                id: record.id,
                tag: &record.tag,
                bytes: record.handle.len(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if page.returned() == 0 {
        println!("no assets match `{query}`");
        return Ok(());
    }

    for record in &page.records {
        println!(
            "{:>6}  {}  ({} bytes)",
            record.id,
            record.tag,
            record.handle.len()
        );
    }
    let first = skip + 1;
    let last = skip + page.returned();
    println!(
        "showing {first}-{last} of {total} ({} remaining)",
        page.remaining
    );
    Ok(())
}
