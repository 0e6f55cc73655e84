//! List the filters available in a directory of SED shards

use std::path::PathBuf;

use clap::Parser;
use mockcat::{discover, CatalogConfig, JsonShardStore};

/// Command line arguments for filter listing
#[derive(Parser, Debug)]
#[command(
    name = "List Filters",
    about = "Prints the filters provided by the SED shards of a directory",
    long_about = None
)]
struct Args {
    /// Directory holding the SED shards
    sed_dir: PathBuf,

    /// JSON configuration file with the shard naming and layout
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print one filter per line instead of a single list
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => CatalogConfig::load_from_file(path)?,
        None => CatalogConfig::default(),
    };

    let store = JsonShardStore::new();
    let filters = discover(&store, &args.sed_dir, &config.naming, &config.sed)?;

    if args.pretty {
        for filter in &filters {
            println!("{filter}");
        }
    } else {
        let names: Vec<String> = filters.iter().map(|f| format!("'{f}'")).collect();
        println!("[{}]", names.join(", "));
    }
    Ok(())
}
