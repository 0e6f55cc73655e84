//! Mock galaxy catalog assembly from sharded SED files
//!
//! This crate finds which SED shard groups provide a set of requested filters,
//! reads each group once, merges the magnitudes into one table keyed by sky id,
//! and joins that table onto galaxy properties read from mock light-cone shards.

pub mod assembler;
pub mod config;
pub mod error;
pub mod extractor;
pub mod filter_index;
pub mod filter_name;
pub mod light_cone;
pub mod pipeline;
pub mod resolver;
pub mod shard_group;
pub mod store;
pub mod table;
pub mod text;

// Re-exports for easier access
pub use assembler::{CatalogAssembler, JoinReport, JoinedCatalog, MagnitudeTable, Magnitudes};
pub use config::{
    AmbiguityPolicy, CatalogConfig, JoinStrategy, LightConeLayout, ScanOrder, SectionLayout,
    SedLayout, ShardNaming,
};
pub use error::{CatalogError, IdMismatch, Result};
pub use extractor::{GroupMagnitudes, MagnitudeExtractor};
pub use filter_index::{discover, FilterIndex, IndexEntry};
pub use filter_name::{parse_filter_list, FilterName};
pub use light_cone::{LightCone, MockCatalog};
pub use pipeline::{BuildOutput, CatalogBuild};
pub use resolver::{GroupRequest, ResolvedGroups, ShardResolver};
pub use shard_group::ShardGroup;
pub use store::{Column, JsonShardStore, MemoryShardStore, ShardHandle, ShardStore};
pub use table::{CatalogTable, ColumnKind, SkyId, TableColumn};
