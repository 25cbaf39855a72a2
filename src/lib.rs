//! cfgdiff - Semantic diff for network device configuration snapshots.
//!
//! Two snapshots of a device configuration are compared collection by
//! collection (firewall rules, interfaces, routes, users, ...). Entities are
//! paired by stable id, their fields normalized per a schema so that cosmetic
//! differences disappear, and every entity is classified as added, removed,
//! modified, reordered or unchanged.
//!
//! # Example
//!
//! ```no_run
//! use cfgdiff::{compute_diff, format_change_set, load_document};
//! use cfgdiff::{DiffConfig, OutputFormat, OutputOptions, SchemaRegistry};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let old = load_document(Path::new("old.yaml"))?;
//! let new = load_document(Path::new("new.yaml"))?;
//!
//! let set = compute_diff(&old, &new, &SchemaRegistry::builtin(), &DiffConfig::default());
//!
//! let output = format_change_set(&set, &OutputFormat::Terminal, &OutputOptions::default())?;
//! println!("{}", output);
//! # Ok(())
//! # }
//! ```

pub mod changeset;
pub mod diff;
pub mod error;
pub mod filter;
pub mod model;
pub mod normalize;
pub mod order;
pub mod output;
pub mod parser;
pub mod schema;

// Re-export commonly used types for convenience
pub use changeset::{
    Change, ChangeSet, ChangeSummary, CollectionDiff, CollectionStatus, Diagnostic, FieldDiff,
    Side,
};
pub use diff::{compare_collection, compute_diff, DiffConfig, ReorderBasis};
pub use error::{CfgDiffError, OutputError, ParseError, SchemaError};
pub use filter::{filter_changes, FilterConfig, PathPattern};
pub use model::{ConfigurationDocument, Entity};
pub use normalize::{
    normalize, normalize_ip, normalize_path, normalize_port, normalize_protocol,
    normalize_whitespace, NormKind, NormalizedValue,
};
pub use order::{detect_reorders, has_reorders, OrderChange};
pub use output::{format_change_set, OutputFormat, OutputOptions};
pub use parser::{document_from_value, load_document, parse_document, FormatHint};
pub use schema::{EntitySchema, IdExtractor, SchemaRegistry};
