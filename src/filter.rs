//! Path filtering for change sets.
//!
//! Every change has a path: `collection.id` for entity-level changes and
//! `collection.id.field` for each field of a modified entity. Flattened
//! nested fields contribute one segment per key, so `source.address` on rule
//! `r1` has the path `rules.r1.source.address`. Glob-style patterns select
//! which paths to ignore or to keep.
//!
//! # Pattern Syntax
//!
//! - `rules` - matches literal segment "rules"
//! - `*` - matches any single path segment
//! - `**` - matches any number of path segments (including zero)
//! - `rules.*.description` - the description field of any rule
//! - `**.description` - the description field anywhere
//!
//! # Examples
//!
//! ```
//! use cfgdiff::filter::PathPattern;
//!
//! let pattern = PathPattern::parse("**.description");
//! assert!(pattern.matches(&["rules".to_string(), "r1".to_string(), "description".to_string()]));
//!
//! let pattern = PathPattern::parse("users.*");
//! assert!(pattern.matches(&["users".to_string(), "admin".to_string()]));
//! ```

use crate::changeset::{Change, ChangeSet, ChangeSummary, CollectionDiff};

/// A single segment in a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    /// Matches an exact string
    Literal(String),
    /// Matches any single path segment (*)
    SingleWildcard,
    /// Matches any number of path segments (**)
    DoubleWildcard,
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    pub segments: Vec<PatternSegment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('.')
            .map(|s| match s {
                "**" => PatternSegment::DoubleWildcard,
                "*" => PatternSegment::SingleWildcard,
                _ => PatternSegment::Literal(s.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn matches(&self, path: &[String]) -> bool {
        Self::matches_from(&self.segments, path)
    }

    fn matches_from(pattern: &[PatternSegment], path: &[String]) -> bool {
        match (pattern.first(), path.first()) {
            (None, None) => true,
            (None, Some(_)) => false,
            (Some(_), None) => pattern
                .iter()
                .all(|s| matches!(s, PatternSegment::DoubleWildcard)),
            (Some(seg), Some(path_seg)) => match seg {
                PatternSegment::Literal(lit) => {
                    lit == path_seg && Self::matches_from(&pattern[1..], &path[1..])
                }
                PatternSegment::SingleWildcard => Self::matches_from(&pattern[1..], &path[1..]),
                PatternSegment::DoubleWildcard => {
                    Self::matches_from(&pattern[1..], path)
                        || Self::matches_from(pattern, &path[1..])
                }
            },
        }
    }
}

/// Which change paths to keep.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    /// Paths to exclude
    pub ignore_patterns: Vec<PathPattern>,
    /// If non-empty, only paths matching one of these are kept
    pub only_patterns: Vec<PathPattern>,
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore(mut self, pattern: &str) -> Self {
        self.ignore_patterns.push(PathPattern::parse(pattern));
        self
    }

    pub fn only(mut self, pattern: &str) -> Self {
        self.only_patterns.push(PathPattern::parse(pattern));
        self
    }

    pub fn has_filters(&self) -> bool {
        !self.ignore_patterns.is_empty() || !self.only_patterns.is_empty()
    }

    pub fn should_include(&self, path: &[String]) -> bool {
        if self.ignore_patterns.iter().any(|p| p.matches(path)) {
            return false;
        }
        self.only_patterns.is_empty() || self.only_patterns.iter().any(|p| p.matches(path))
    }
}

/// Filters a change set.
///
/// Entity-level changes are kept or dropped whole. A modified entity keeps
/// only its included fields; if none remain it is counted as unchanged.
/// Diagnostics are never filtered.
pub fn filter_changes(set: &ChangeSet, config: &FilterConfig) -> ChangeSet {
    if !config.has_filters() {
        return set.clone();
    }

    let collections: Vec<CollectionDiff> = set
        .collections
        .iter()
        .map(|diff| filter_collection(diff, config))
        .collect();

    let mut summary = ChangeSummary::new();
    for diff in &collections {
        summary.absorb(&diff.summary);
    }

    ChangeSet {
        collections,
        summary,
    }
}

fn filter_collection(diff: &CollectionDiff, config: &FilterConfig) -> CollectionDiff {
    let mut changes = Vec::with_capacity(diff.changes.len());
    let mut emptied = 0;

    for change in &diff.changes {
        let entity_path = vec![diff.collection.clone(), change.id().to_string()];
        match change {
            Change::Modified {
                id,
                old_position,
                new_position,
                fields,
            } => {
                let kept: Vec<_> = fields
                    .iter()
                    .filter(|f| {
                        let mut path = entity_path.clone();
                        path.extend(f.field.split('.').map(str::to_string));
                        config.should_include(&path)
                    })
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    emptied += 1;
                } else {
                    changes.push(Change::Modified {
                        id: id.clone(),
                        old_position: *old_position,
                        new_position: *new_position,
                        fields: kept,
                    });
                }
            }
            _ if config.should_include(&entity_path) => changes.push(change.clone()),
            _ => {}
        }
    }

    let tallied = ChangeSummary::tally(changes.iter().filter(|c| !c.is_unchanged()));
    CollectionDiff {
        collection: diff.collection.clone(),
        status: diff.status,
        changes,
        diagnostics: diff.diagnostics.clone(),
        summary: ChangeSummary {
            unchanged: diff.summary.unchanged + emptied,
            ..tallied
        },
    }
}
