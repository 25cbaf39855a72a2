//! Position-change detection for ordered, id-bearing collections.
//!
//! Firewall rules and NAT mappings are evaluated top to bottom, so moving an
//! entity is a real change even when none of its fields changed. This module
//! reports which ids present on both sides sit at a different position.
//! Ids present on only one side are additions or removals and are never
//! reported here.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A pure position change of an id present in both sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderChange {
    pub id: String,
    pub old_position: usize,
    pub new_position: usize,
}

/// Reports every id present in both sequences whose index differs.
///
/// Runs in O(n) time and space. The result is sorted by old position (ties
/// broken by id), so the output does not depend on hash iteration order.
/// If an id occurs more than once in a sequence, its first occurrence is
/// used.
///
/// # Examples
///
/// ```
/// use cfgdiff::order::detect_reorders;
///
/// let moves = detect_reorders(&["a", "b", "c"], &["c", "a", "b"]);
/// assert_eq!(moves.len(), 3);
/// assert_eq!(moves[0].id, "a");
/// assert_eq!((moves[0].old_position, moves[0].new_position), (0, 1));
///
/// assert!(detect_reorders(&["a", "b"], &["a", "c"]).is_empty());
/// ```
pub fn detect_reorders<S: AsRef<str>>(old_ids: &[S], new_ids: &[S]) -> Vec<OrderChange> {
    detect_moves(
        old_ids.iter().enumerate().map(|(i, id)| (id.as_ref(), i)),
        new_ids.iter().enumerate().map(|(i, id)| (id.as_ref(), i)),
    )
}

/// Returns true if [`detect_reorders`] would report anything.
pub fn has_reorders<S: AsRef<str>>(old_ids: &[S], new_ids: &[S]) -> bool {
    !detect_reorders(old_ids, new_ids).is_empty()
}

/// Same as [`detect_reorders`], but over explicit `(id, position)` pairs.
///
/// Lets callers supply positions that are not slice indices, e.g. absolute
/// ordinals of a collection with some entities filtered out, or ranks
/// among the ids common to both sides.
pub fn detect_moves<'a, I, J>(old: I, new: J) -> Vec<OrderChange>
where
    I: IntoIterator<Item = (&'a str, usize)>,
    J: IntoIterator<Item = (&'a str, usize)>,
{
    let new_index = position_index(new);

    let mut seen: HashSet<&str> = HashSet::new();
    let mut changes: Vec<OrderChange> = old
        .into_iter()
        .filter(|(id, _)| seen.insert(*id))
        .filter_map(|(id, old_position)| {
            let new_position = *new_index.get(id)?;
            (old_position != new_position).then(|| OrderChange {
                id: id.to_string(),
                old_position,
                new_position,
            })
        })
        .collect();

    changes.sort_by(|a, b| {
        a.old_position
            .cmp(&b.old_position)
            .then_with(|| a.id.cmp(&b.id))
    });
    changes
}

fn position_index<'a, I>(items: I) -> HashMap<&'a str, usize>
where
    I: IntoIterator<Item = (&'a str, usize)>,
{
    let mut index = HashMap::new();
    for (id, position) in items {
        index.entry(id).or_insert(position);
    }
    index
}
