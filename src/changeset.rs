//! Typed change records and their deterministic aggregation.

use crate::model::Entity;
use crate::normalize::NormKind;
use serde::Serialize;
use std::fmt;

/// A single field that differs after normalization.
///
/// Values are the raw, unnormalized strings; `None` means the field is
/// absent on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: String,
    pub kind: NormKind,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Classification of one entity across the two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    /// Present only in the new snapshot
    Added {
        id: String,
        position: usize,
        entity: Entity,
    },
    /// Present only in the old snapshot
    Removed {
        id: String,
        position: usize,
        entity: Entity,
    },
    /// At least one compared field differs after normalization
    Modified {
        id: String,
        old_position: usize,
        new_position: usize,
        fields: Vec<FieldDiff>,
    },
    /// Same normalized fields, different position
    ReorderedOnly {
        id: String,
        old_position: usize,
        new_position: usize,
    },
    /// Same normalized fields, same position
    Unchanged { id: String, position: usize },
}

impl Change {
    pub fn id(&self) -> &str {
        match self {
            Change::Added { id, .. }
            | Change::Removed { id, .. }
            | Change::Modified { id, .. }
            | Change::ReorderedOnly { id, .. }
            | Change::Unchanged { id, .. } => id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Change::Added { .. } => "added",
            Change::Removed { .. } => "removed",
            Change::Modified { .. } => "modified",
            Change::ReorderedOnly { .. } => "reordered",
            Change::Unchanged { .. } => "unchanged",
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Change::Unchanged { .. })
    }
}

/// Which snapshot a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Old,
    New,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Old => f.write_str("old"),
            Side::New => f.write_str("new"),
        }
    }
}

/// A recoverable fault scoped to one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "diagnostic", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The id occurs more than once on one side; it is excluded from the diff.
    AmbiguousIdentity {
        id: String,
        side: Side,
        positions: Vec<usize>,
    },
    /// The entity has no stable id; it is excluded from the diff.
    MissingIdentity { side: Side, position: usize },
    /// The collection exists only in the other snapshot.
    CollectionAbsent { side: Side },
    /// No schema is registered for the collection and there is no fallback.
    NoSchema,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::AmbiguousIdentity { id, side, positions } => {
                let positions: Vec<String> = positions.iter().map(usize::to_string).collect();
                write!(
                    f,
                    "ambiguous identity '{}' in {} (positions {})",
                    id,
                    side,
                    positions.join(", ")
                )
            }
            Diagnostic::MissingIdentity { side, position } => {
                write!(f, "missing identity in {} at position {}", side, position)
            }
            Diagnostic::CollectionAbsent { side } => {
                write!(f, "collection absent in {}", side)
            }
            Diagnostic::NoSchema => f.write_str("no schema registered"),
        }
    }
}

/// How a collection was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Compared,
    AbsentInOld,
    AbsentInNew,
    Unsupported,
}

/// Change counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChangeSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub reordered: usize,
    pub unchanged: usize,
}

impl ChangeSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the given changes.
    pub fn tally<'a>(changes: impl IntoIterator<Item = &'a Change>) -> Self {
        let mut summary = Self::new();
        for change in changes {
            summary.record(change);
        }
        summary
    }

    pub fn record(&mut self, change: &Change) {
        match change {
            Change::Added { .. } => self.added += 1,
            Change::Removed { .. } => self.removed += 1,
            Change::Modified { .. } => self.modified += 1,
            Change::ReorderedOnly { .. } => self.reordered += 1,
            Change::Unchanged { .. } => self.unchanged += 1,
        }
    }

    /// Total number of changes (excluding unchanged).
    pub fn total_changes(&self) -> usize {
        self.added + self.removed + self.modified + self.reordered
    }

    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }

    pub(crate) fn absorb(&mut self, other: &ChangeSummary) {
        self.added += other.added;
        self.removed += other.removed;
        self.modified += other.modified;
        self.reordered += other.reordered;
        self.unchanged += other.unchanged;
    }
}

/// The comparison result for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionDiff {
    pub collection: String,
    pub status: CollectionStatus,
    pub changes: Vec<Change>,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: ChangeSummary,
}

impl CollectionDiff {
    /// A result with no entity changes, e.g. for an absent collection.
    pub fn skipped(
        collection: impl Into<String>,
        status: CollectionStatus,
        diagnostic: Diagnostic,
    ) -> Self {
        Self {
            collection: collection.into(),
            status,
            changes: Vec::new(),
            diagnostics: vec![diagnostic],
            summary: ChangeSummary::new(),
        }
    }

    pub fn change_for(&self, id: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.id() == id)
    }
}

/// The ordered result of diffing one pair of documents.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChangeSet {
    pub collections: Vec<CollectionDiff>,
    pub summary: ChangeSummary,
}

impl ChangeSet {
    /// Aggregates per-collection results.
    ///
    /// Collections are ordered by name whatever order they arrive in, so
    /// results computed concurrently assemble identically. Unchanged records
    /// are dropped unless `include_unchanged` is set; they are counted either
    /// way.
    pub fn assemble(mut collections: Vec<CollectionDiff>, include_unchanged: bool) -> Self {
        collections.sort_by(|a, b| a.collection.cmp(&b.collection));

        let mut summary = ChangeSummary::new();
        for diff in &mut collections {
            diff.summary = ChangeSummary::tally(&diff.changes);
            if !include_unchanged {
                diff.changes.retain(|c| !c.is_unchanged());
            }
            summary.absorb(&diff.summary);
        }

        Self {
            collections,
            summary,
        }
    }

    /// All retained changes in order, paired with their collection name.
    pub fn changes(&self) -> impl Iterator<Item = (&str, &Change)> {
        self.collections
            .iter()
            .flat_map(|d| d.changes.iter().map(move |c| (d.collection.as_str(), c)))
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = (&str, &Diagnostic)> {
        self.collections
            .iter()
            .flat_map(|d| d.diagnostics.iter().map(move |x| (d.collection.as_str(), x)))
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionDiff> {
        self.collections.iter().find(|d| d.collection == name)
    }

    /// True if nothing was added, removed, modified or reordered.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
    }

    pub fn has_diagnostics(&self) -> bool {
        self.collections.iter().any(|d| !d.diagnostics.is_empty())
    }
}
