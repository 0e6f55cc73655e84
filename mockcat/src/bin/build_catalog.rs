//! Build the mock galaxy catalog
//!
//! Resolves the requested filters against the SED shards, selects objects brighter
//! than the magnitude limit and joins their magnitudes onto the light-cone galaxy
//! properties. Writes `filter_catalog.dat`, `mock_galaxies.dat` and `mock_group.dat`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use mockcat::{
    parse_filter_list, AmbiguityPolicy, CatalogBuild, CatalogConfig, FilterName, JoinStrategy,
    JsonShardStore,
};

/// How to treat a filter listed by more than one shard group
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Ambiguity {
    Reject,
    FirstMatch,
}

/// How galaxy properties and magnitudes are matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Join {
    Concatenate,
    AlignById,
}

/// Command line arguments for the catalog build
#[derive(Parser, Debug)]
#[command(
    name = "Build Catalog",
    about = "Builds the joined mock galaxy catalog from SED and light-cone shards",
    long_about = None
)]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the SED shards
    #[arg(long)]
    sed_dir: Option<PathBuf>,

    /// Directory holding the mock light-cone shards
    #[arg(long)]
    light_cone_dir: Option<PathBuf>,

    /// Directory the catalogs are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Keep objects strictly brighter than this apparent magnitude
    #[arg(long)]
    magnitude_limit: Option<f64>,

    /// Filter used for the magnitude selection
    #[arg(long)]
    selection_filter: Option<String>,

    /// Filters to extract (comma or space separated); all available when omitted
    #[arg(long, default_value = "")]
    filters: String,

    /// Ambiguous filter handling
    #[arg(long, value_enum)]
    ambiguity: Option<Ambiguity>,

    /// Join strategy between galaxies and magnitudes
    #[arg(long, value_enum)]
    join: Option<Join>,

    /// Write the effective configuration to this file and continue
    #[arg(long)]
    save_config: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<(CatalogConfig, Vec<FilterName>, Option<PathBuf>), Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => CatalogConfig::load_from_file(path)?,
            None => CatalogConfig::default(),
        };

        if let Some(dir) = self.sed_dir {
            config.sed_dir = dir;
        }
        if let Some(dir) = self.light_cone_dir {
            config.light_cone_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(limit) = self.magnitude_limit {
            config.magnitude_limit = limit;
        }
        if let Some(filter) = self.selection_filter {
            config.selection_filter = FilterName::new(filter);
        }
        match self.ambiguity {
            Some(Ambiguity::Reject) => config.ambiguity = AmbiguityPolicy::Reject,
            Some(Ambiguity::FirstMatch) => config.ambiguity = AmbiguityPolicy::FirstMatch,
            None => {}
        }
        match self.join {
            Some(Join::Concatenate) => config.join = JoinStrategy::Concatenate,
            Some(Join::AlignById) => config.join = JoinStrategy::AlignById,
            None => {}
        }
        config.validate()?;

        Ok((config, parse_filter_list(&self.filters), self.save_config))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let (config, filters, save_config) = args.into_config()?;
    if let Some(path) = save_config {
        config.save_to_file(&path)?;
        log::info!("saved configuration to {}", path.display());
    }

    let store = JsonShardStore::new();
    let build = CatalogBuild::new(&store, &config);
    let output = build.run(&filters)?;

    println!(
        "Resolved {} filters into {} shard groups",
        output.resolved.requested.len(),
        output.resolved.groups.len()
    );
    for request in &output.resolved.groups {
        let names: Vec<&str> = request.filters.iter().map(FilterName::as_str).collect();
        println!("  {}: {}", request.group, names.join(" "));
    }
    println!(
        "Selected {} of {} objects with {} < {}",
        output.selected_ids.len(),
        output.magnitudes.len(),
        config.selection_filter.apparent_column(),
        config.magnitude_limit
    );
    if output.invalid_magnitude_rows > 0 {
        println!(
            "Skipped {} SED rows with invalid ids",
            output.invalid_magnitude_rows
        );
    }

    let report = output.galaxies.report;
    println!(
        "Joined {} galaxies ({} dropped: {} invalid ids, {} unmeasured)",
        report.output_rows(),
        report.dropped(),
        report.invalid_ids,
        report.unmeasured
    );

    for path in output.write_to(&config.output_dir)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
