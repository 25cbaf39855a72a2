//! Core comparison engine.
//!
//! This module pairs entities across the old and new snapshot of each
//! collection by stable id, normalizes the fields named by the collection's
//! schema, and classifies every entity as added, removed, modified,
//! reordered or unchanged.
//!
//! Identity problems (missing or duplicated ids) and structural problems
//! (a collection present on one side only) never abort the diff. They are
//! attached as diagnostics to the affected collection while every other
//! collection is compared normally.
//!
//! # Examples
//!
//! ```
//! use cfgdiff::{compute_diff, ConfigurationDocument, DiffConfig, Entity, SchemaRegistry};
//!
//! let old = ConfigurationDocument::new().with_collection(
//!     "rules",
//!     vec![Entity::from_pairs([("id", "r1"), ("source", "192.168.001.1")])],
//! );
//! let new = ConfigurationDocument::new().with_collection(
//!     "rules",
//!     vec![Entity::from_pairs([("id", "r1"), ("source", "192.168.1.1")])],
//! );
//!
//! let changes = compute_diff(&old, &new, &SchemaRegistry::builtin(), &DiffConfig::default());
//! assert!(changes.is_empty());
//! ```

use crate::changeset::{
    Change, ChangeSet, ChangeSummary, CollectionDiff, CollectionStatus, Diagnostic, FieldDiff,
    Side,
};
use crate::model::{ConfigurationDocument, Entity};
use crate::normalize::{normalize, NormKind};
use crate::order::{detect_moves, OrderChange};
use crate::schema::{EntitySchema, SchemaRegistry};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::thread;
use tracing::{debug, info, warn};

/// Which positions count when deciding whether an entity moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReorderBasis {
    /// Ordinal position within the collection, skipping entities left out
    /// for identity faults
    #[default]
    Absolute,
    /// Rank among the ids present on both sides; insertions and removals
    /// do not shift the entities around them
    Relative,
}

/// Configuration for the comparison engine.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Keep `Unchanged` records in the result
    pub include_unchanged: bool,
    /// Report pure position changes; when off they count as unchanged
    pub report_reorders: bool,
    /// Position basis for reorder detection
    pub reorder_basis: ReorderBasis,
    /// Treat a missing field as equal to an empty one
    pub treat_missing_as_empty: bool,
    /// Compare collections on scoped worker threads
    pub parallel: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            include_unchanged: false,
            report_reorders: true,
            reorder_basis: ReorderBasis::Absolute,
            treat_missing_as_empty: false,
            parallel: false,
        }
    }
}

/// Computes the change set between two documents.
///
/// Every collection named by either document is compared with the schema
/// that `registry` resolves for it. The result is ordered by collection
/// name, and within a collection by old position followed by additions in
/// new position order, regardless of `config.parallel`.
///
/// # Arguments
///
/// * `old` - The original snapshot
/// * `new` - The updated snapshot
/// * `registry` - Schemas for the collections
/// * `config` - Engine options
pub fn compute_diff(
    old: &ConfigurationDocument,
    new: &ConfigurationDocument,
    registry: &SchemaRegistry,
    config: &DiffConfig,
) -> ChangeSet {
    let names: BTreeSet<&str> = old.collection_names().chain(new.collection_names()).collect();

    let results: Vec<CollectionDiff> = if config.parallel && names.len() > 1 {
        thread::scope(|scope| {
            let handles: Vec<_> = names
                .iter()
                .map(|name| scope.spawn(move || diff_named(name, old, new, registry, config)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    } else {
        names
            .iter()
            .map(|name| diff_named(name, old, new, registry, config))
            .collect()
    };

    let change_set = ChangeSet::assemble(results, config.include_unchanged);
    info!(
        collections = change_set.collections.len(),
        added = change_set.summary.added,
        removed = change_set.summary.removed,
        modified = change_set.summary.modified,
        reordered = change_set.summary.reordered,
        unchanged = change_set.summary.unchanged,
        "diff complete"
    );
    change_set
}

fn diff_named(
    name: &str,
    old: &ConfigurationDocument,
    new: &ConfigurationDocument,
    registry: &SchemaRegistry,
    config: &DiffConfig,
) -> CollectionDiff {
    let Some(schema) = registry.resolve(name) else {
        warn!(collection = name, "no schema for collection, skipping");
        return CollectionDiff::skipped(name, CollectionStatus::Unsupported, Diagnostic::NoSchema);
    };

    match (old.collection(name), new.collection(name)) {
        (Some(old_entities), Some(new_entities)) => {
            compare_collection(&schema, old_entities, new_entities, config)
        }
        (Some(_), None) => {
            warn!(collection = name, "collection absent in new snapshot");
            CollectionDiff::skipped(
                name,
                CollectionStatus::AbsentInNew,
                Diagnostic::CollectionAbsent { side: Side::New },
            )
        }
        (None, Some(_)) => {
            warn!(collection = name, "collection absent in old snapshot");
            CollectionDiff::skipped(
                name,
                CollectionStatus::AbsentInOld,
                Diagnostic::CollectionAbsent { side: Side::Old },
            )
        }
        (None, None) => unreachable!("collection names come from the union of both documents"),
    }
}

/// An entity that survived identity checks.
struct Keyed<'a> {
    id: String,
    position: usize,
    entity: &'a Entity,
}

/// Compares one collection.
///
/// The returned changes are ordered by old position (paired and removed
/// entities), followed by added entities in new position order. Entities
/// with a missing or duplicated id are left out and reported in
/// `diagnostics`; they do not count toward the ordinals used for reorder
/// detection, though reported positions stay the raw indexes.
pub fn compare_collection(
    schema: &EntitySchema,
    old: &[Entity],
    new: &[Entity],
    config: &DiffConfig,
) -> CollectionDiff {
    let collection = schema.collection();
    debug!(
        collection,
        old = old.len(),
        new = new.len(),
        "comparing collection"
    );

    let mut diagnostics = Vec::new();
    let (old_keyed, old_ambiguous) = key_entities(schema, old, Side::Old, &mut diagnostics);
    let (new_keyed, new_ambiguous) = key_entities(schema, new, Side::New, &mut diagnostics);

    let ambiguous: HashSet<String> = old_ambiguous.into_iter().chain(new_ambiguous).collect();
    let old_keyed: Vec<Keyed> = old_keyed
        .into_iter()
        .filter(|k| !ambiguous.contains(&k.id))
        .collect();
    let new_keyed: Vec<Keyed> = new_keyed
        .into_iter()
        .filter(|k| !ambiguous.contains(&k.id))
        .collect();

    for diagnostic in &diagnostics {
        warn!(collection, %diagnostic, "identity fault");
    }

    let new_by_id: HashMap<&str, &Keyed> = new_keyed.iter().map(|k| (k.id.as_str(), k)).collect();
    let old_ids: HashSet<&str> = old_keyed.iter().map(|k| k.id.as_str()).collect();

    let moves: HashMap<String, OrderChange> = reorders(&old_keyed, &new_keyed, &new_by_id, config)
        .into_iter()
        .map(|m| (m.id.clone(), m))
        .collect();

    let mut changes = Vec::with_capacity(old_keyed.len() + new_keyed.len());

    for old_item in &old_keyed {
        let Some(new_item) = new_by_id.get(old_item.id.as_str()) else {
            changes.push(Change::Removed {
                id: old_item.id.clone(),
                position: old_item.position,
                entity: old_item.entity.clone(),
            });
            continue;
        };

        let fields = diff_fields(schema, old_item.entity, new_item.entity, config);
        let change = if !fields.is_empty() {
            Change::Modified {
                id: old_item.id.clone(),
                old_position: old_item.position,
                new_position: new_item.position,
                fields,
            }
        } else if config.report_reorders && moves.contains_key(&old_item.id) {
            Change::ReorderedOnly {
                id: old_item.id.clone(),
                old_position: old_item.position,
                new_position: new_item.position,
            }
        } else {
            Change::Unchanged {
                id: old_item.id.clone(),
                position: new_item.position,
            }
        };
        changes.push(change);
    }

    for new_item in &new_keyed {
        if !old_ids.contains(new_item.id.as_str()) {
            changes.push(Change::Added {
                id: new_item.id.clone(),
                position: new_item.position,
                entity: new_item.entity.clone(),
            });
        }
    }

    let summary = ChangeSummary::tally(&changes);
    debug!(
        collection,
        added = summary.added,
        removed = summary.removed,
        modified = summary.modified,
        reordered = summary.reordered,
        "collection compared"
    );

    CollectionDiff {
        collection: collection.to_string(),
        status: CollectionStatus::Compared,
        changes,
        diagnostics,
        summary,
    }
}

/// Extracts ids, reporting missing ones and returning duplicated ones.
fn key_entities<'a>(
    schema: &EntitySchema,
    entities: &'a [Entity],
    side: Side,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Vec<Keyed<'a>>, Vec<String>) {
    let mut keyed = Vec::with_capacity(entities.len());
    let mut positions: HashMap<String, Vec<usize>> = HashMap::new();

    for (position, entity) in entities.iter().enumerate() {
        match schema.stable_id(entity) {
            Some(id) => {
                positions.entry(id.clone()).or_default().push(position);
                keyed.push(Keyed {
                    id,
                    position,
                    entity,
                });
            }
            None => diagnostics.push(Diagnostic::MissingIdentity { side, position }),
        }
    }

    // Report duplicates in order of first appearance.
    let mut ambiguous = Vec::new();
    for item in &keyed {
        if let Some(found) = positions.remove(&item.id) {
            if found.len() > 1 {
                ambiguous.push(item.id.clone());
                diagnostics.push(Diagnostic::AmbiguousIdentity {
                    id: item.id.clone(),
                    side,
                    positions: found,
                });
            }
        }
    }

    (keyed, ambiguous)
}

/// Runs reorder detection on the configured position basis.
///
/// Reported positions are always the absolute ones.
fn reorders(
    old: &[Keyed],
    new: &[Keyed],
    new_by_id: &HashMap<&str, &Keyed>,
    config: &DiffConfig,
) -> Vec<OrderChange> {
    match config.reorder_basis {
        // `old` and `new` hold only entities with a clean identity, so the
        // enumeration index is the ordinal with faulty entities skipped.
        ReorderBasis::Absolute => detect_moves(
            old.iter().enumerate().map(|(ordinal, k)| (k.id.as_str(), ordinal)),
            new.iter().enumerate().map(|(ordinal, k)| (k.id.as_str(), ordinal)),
        ),
        ReorderBasis::Relative => {
            let common_old: Vec<&str> = old
                .iter()
                .map(|k| k.id.as_str())
                .filter(|id| new_by_id.contains_key(id))
                .collect();
            let common: HashSet<&str> = common_old.iter().copied().collect();
            let common_new = new
                .iter()
                .map(|k| k.id.as_str())
                .filter(|id| common.contains(id));

            let old_position: HashMap<&str, usize> =
                old.iter().map(|k| (k.id.as_str(), k.position)).collect();

            detect_moves(
                common_old.iter().enumerate().map(|(rank, id)| (*id, rank)),
                common_new.enumerate().map(|(rank, id)| (id, rank)),
            )
            .into_iter()
            .filter_map(|m| {
                Some(OrderChange {
                    old_position: *old_position.get(m.id.as_str())?,
                    new_position: new_by_id.get(m.id.as_str())?.position,
                    id: m.id,
                })
            })
            .collect()
        }
    }
}

/// Compares the schema's fields of two entities sharing an id.
///
/// Returns raw values for every field whose normalized forms differ, in
/// field-name order.
fn diff_fields(
    schema: &EntitySchema,
    old: &Entity,
    new: &Entity,
    config: &DiffConfig,
) -> Vec<FieldDiff> {
    schema
        .comparable_fields(old, new)
        .into_iter()
        .filter_map(|(field, kind)| {
            let old_raw = old.get(field);
            let new_raw = new.get(field);
            if values_equal(old_raw, new_raw, kind, config) {
                return None;
            }
            Some(FieldDiff {
                field: field.to_string(),
                kind,
                old: old_raw.map(str::to_string),
                new: new_raw.map(str::to_string),
            })
        })
        .collect()
}

/// Checks if two raw field values are equal after normalization.
fn values_equal(
    old: Option<&str>,
    new: Option<&str>,
    kind: NormKind,
    config: &DiffConfig,
) -> bool {
    let (old, new) = if config.treat_missing_as_empty {
        (Some(old.unwrap_or("")), Some(new.unwrap_or("")))
    } else {
        (old, new)
    };

    match (old, new) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b || normalize(kind, a) == normalize(kind, b),
        _ => false,
    }
}
