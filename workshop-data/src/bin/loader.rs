//! `workshop-catalog-loader`: imports a product catalog CSV.
//!
//! ```text
//! name,product_type
//! Brake Pads,Spare Part
//! Engine Oil 5W-30,Consumable
//! ```
//!
//! `name` is matched case-insensitively against estimate lines. The
//! `product_type` text decides whether a line counts as a spare part.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use workshop_data::{LoadSummary, ProductCatalogLoader, ProductRecord};
use workshop_db_sqlite::SqliteRepository;

#[derive(Parser, Debug)]
#[command(name = "workshop-catalog-loader", version, about)]
struct Args {
    /// CSV file with `name` and `product_type` columns
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database file, created if missing
    #[arg(short, long, default_value = "workshop.db")]
    database: String,

    /// Apply migrations first
    #[arg(short, long)]
    migrate: bool,

    /// Directory of seed `.sql` files to apply after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,

    /// Validate the file and print what would be loaded, without a database
    #[arg(long)]
    dry_run: bool,
}

fn read_catalog(path: &Path) -> Result<Vec<ProductRecord>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    ProductCatalogLoader::parse(file).with_context(|| format!("invalid catalog {}", path.display()))
}

async fn prepare_database(args: &Args) -> Result<SqliteRepository> {
    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("cannot open database {}", args.database))?;

    if args.migrate {
        repo.run_migrations().await.context("migrations failed")?;
        info!(database = %args.database, "migrations applied");
    }
    if let Some(dir) = &args.seeds {
        repo.run_seeds(dir)
            .await
            .with_context(|| format!("seeding from {} failed", dir.display()))?;
        info!(dir = %dir.display(), "seeds applied");
    }
    Ok(repo)
}

fn print_summary(summary: &LoadSummary) {
    if summary.written() == 0 {
        println!("Catalog already up to date ({} products).", summary.unchanged);
    } else {
        println!(
            "Catalog loaded: {} added, {} updated, {} unchanged.",
            summary.added, summary.updated, summary.unchanged
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let records = read_catalog(&args.file)?;

    if args.dry_run {
        for record in &records {
            println!("{:<32} {}", record.name, record.product_type);
        }
        println!("{} products parsed; nothing written.", records.len());
        return Ok(());
    }

    let repo = prepare_database(&args).await?;
    let summary = ProductCatalogLoader::load(&repo, &records)
        .await
        .context("writing the catalog failed")?;
    print_summary(&summary);

    Ok(())
}
