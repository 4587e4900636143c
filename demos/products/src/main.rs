//! Product catalogue demo.
//!
//! Keeps a small product list in a ShelfDB image file.

use clap::{Parser, Subcommand};
use shelfdb_core::Database;
use shelfdb_products_demo::{Product, ProductRepository, RepositoryError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Manage a product catalogue.
#[derive(Parser)]
#[command(name = "products")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Catalogue image file
    #[arg(global = true, long, default_value = "products.json")]
    db: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a product
    Add {
        /// Catalogue number
        iid: String,
        /// Product name
        name: String,
        /// Brand name
        brand: String,
        /// Manufacturer
        company: String,
    },

    /// Show products with a catalogue number
    Get {
        /// Catalogue number
        iid: String,
    },

    /// List every product
    List,

    /// Change name, brand and company of a product
    Update {
        /// Catalogue number
        iid: String,
        /// New name
        name: String,
        /// New brand
        brand: String,
        /// New manufacturer
        company: String,
    },

    /// Remove products with a catalogue number
    Delete {
        /// Catalogue number
        iid: String,
    },
}

fn print_products(products: &[Product]) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(products)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db = Database::open(&cli.db)?;
    let repo = ProductRepository::new(&db)?;

    match cli.command {
        Commands::Add {
            iid,
            name,
            brand,
            company,
        } => {
            let created = repo.create(&mut Product::new(iid, name, brand, company))?;
            print_products(&[created])?;
        }
        Commands::Get { iid } => match repo.get_by_iid(&iid) {
            Ok(found) => print_products(&found)?,
            Err(RepositoryError::NoData) => println!("catalogue is empty"),
            Err(e) => return Err(e.into()),
        },
        Commands::List => print_products(&repo.list()?)?,
        Commands::Update {
            iid,
            name,
            brand,
            company,
        } => {
            let updated = repo.update(&Product::new(iid, name, brand, company))?;
            print_products(&[updated])?;
        }
        Commands::Delete { iid } => {
            let removed = repo.delete(&iid)?;
            println!("removed {removed} product(s)");
        }
    }

    Ok(())
}
