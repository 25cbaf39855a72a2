//! Output formatting for change sets.
//!
//! Terminal output is colored, plain output is the same text without ANSI
//! codes, and JSON output is the serialized [`ChangeSet`].
//!
//! Each line carries a path of the form `collection.id` (or
//! `collection.id.field` for a modified field) and a leading symbol:
//!
//! ```text
//! + rules.r9: action=pass, protocol=tcp
//! - users.guest: shell=/bin/sh
//! • rules.r1.source: 10.0.0.1 → 10.0.0.2
//! ↕ rules.r2: position 0 → 2
//! ! rules: ambiguous identity 'r7' in new (positions 3, 5)
//! ```
//!
//! # Examples
//!
//! ```
//! use cfgdiff::{compute_diff, format_change_set, ConfigurationDocument, DiffConfig};
//! use cfgdiff::{Entity, OutputFormat, OutputOptions, SchemaRegistry};
//!
//! let old = ConfigurationDocument::new()
//!     .with_collection("rules", vec![Entity::from_pairs([("id", "r1"), ("protocol", "tcp")])]);
//! let new = ConfigurationDocument::new()
//!     .with_collection("rules", vec![Entity::from_pairs([("id", "r1"), ("protocol", "udp")])]);
//!
//! let set = compute_diff(&old, &new, &SchemaRegistry::builtin(), &DiffConfig::default());
//! let output = format_change_set(&set, &OutputFormat::Plain, &OutputOptions::default()).unwrap();
//! assert!(output.contains("rules.r1.protocol: tcp → udp"));
//! ```

use crate::changeset::{Change, ChangeSet, ChangeSummary, FieldDiff};
use crate::error::OutputError;
use crate::model::Entity;
use colored::*;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colored terminal output with ANSI escape codes
    Terminal,
    /// JSON representation of the change set
    Json,
    /// Plain text, no colors (suitable for piping)
    Plain,
}

/// Options for controlling text output.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Print collection diagnostics
    pub show_diagnostics: bool,
    /// Maximum length for displayed values (truncate if longer)
    pub max_value_length: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            show_diagnostics: true,
            max_value_length: 80,
        }
    }
}

/// Formats a change set according to the specified format and options.
///
/// Unchanged records are printed only if the change set retained them.
pub fn format_change_set(
    set: &ChangeSet,
    format: &OutputFormat,
    options: &OutputOptions,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Terminal => Ok(format_text(set, options, true)),
        OutputFormat::Json => format_json(set),
        OutputFormat::Plain => Ok(format_text(set, options, false)),
    }
}

fn format_json(set: &ChangeSet) -> Result<String, OutputError> {
    serde_json::to_string_pretty(set).map_err(|e| OutputError::JsonSerializationError { source: e })
}

fn format_text(set: &ChangeSet, options: &OutputOptions, color: bool) -> String {
    let mut lines = Vec::new();

    for (collection, change) in set.changes() {
        format_change(&mut lines, collection, change, options, color);
    }

    if options.show_diagnostics {
        for (collection, diagnostic) in set.diagnostics() {
            let text = format!("{}: {}", collection, diagnostic);
            lines.push(format!(
                "{} {}",
                paint("!", Color::BrightMagenta, color),
                paint(&text, Color::Magenta, color)
            ));
        }
    }

    if lines.is_empty() {
        let message = "No changes detected.";
        return if color {
            message.dimmed().to_string()
        } else {
            message.to_string()
        };
    }

    let mut output = lines.join("\n");
    output.push_str("\n\n");
    output.push_str(&format_summary(&set.summary));
    output
}

fn format_change(
    lines: &mut Vec<String>,
    collection: &str,
    change: &Change,
    options: &OutputOptions,
    color: bool,
) {
    let path = format!("{}.{}", collection, change.id());
    let max = options.max_value_length;

    match change {
        Change::Added { entity, .. } => lines.push(format!(
            "{} {}: {}",
            paint("+", Color::BrightGreen, color),
            paint(&path, Color::Green, color),
            paint(&entity_preview(entity, max), Color::Green, color)
        )),
        Change::Removed { entity, .. } => lines.push(format!(
            "{} {}: {}",
            paint("-", Color::BrightRed, color),
            paint(&path, Color::Red, color),
            paint(&entity_preview(entity, max), Color::Red, color)
        )),
        Change::Modified { fields, .. } => {
            for field in fields {
                lines.push(format_field(&path, field, max, color));
            }
        }
        Change::ReorderedOnly {
            old_position,
            new_position,
            ..
        } => lines.push(format!(
            "{} {}: position {} {} {}",
            paint("↕", Color::BrightCyan, color),
            paint(&path, Color::Cyan, color),
            old_position,
            paint("→", Color::BrightCyan, color),
            new_position
        )),
        Change::Unchanged { .. } => {
            let line = format!("  {}", path);
            lines.push(if color {
                line.dimmed().to_string()
            } else {
                line
            });
        }
    }
}

fn format_field(path: &str, field: &FieldDiff, max: usize, color: bool) -> String {
    let path = format!("{}.{}", path, field.field);
    let old = value_preview(field.old.as_deref(), max);
    let new = value_preview(field.new.as_deref(), max);
    format!(
        "{} {}: {} {} {}",
        paint("•", Color::BrightYellow, color),
        paint(&path, Color::Yellow, color),
        paint(&old, Color::Yellow, color),
        paint("→", Color::BrightYellow, color),
        paint(&new, Color::Yellow, color)
    )
}

fn paint(text: &str, c: Color, color: bool) -> String {
    if color {
        text.color(c).to_string()
    } else {
        text.to_string()
    }
}

fn value_preview(value: Option<&str>, max: usize) -> String {
    match value {
        Some(v) => truncate(v, max),
        None => "(absent)".to_string(),
    }
}

fn entity_preview(entity: &Entity, max: usize) -> String {
    let pairs: Vec<String> = entity
        .fields()
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    if pairs.is_empty() {
        return "{}".to_string();
    }
    truncate(&pairs.join(", "), max)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max).collect();
    short.push_str("...");
    short
}

fn format_summary(summary: &ChangeSummary) -> String {
    if summary.is_empty() {
        return "Summary: No changes".to_string();
    }

    let counts = [
        (summary.added, "added"),
        (summary.removed, "removed"),
        (summary.modified, "modified"),
        (summary.reordered, "reordered"),
        (summary.unchanged, "unchanged"),
    ];
    let parts: Vec<String> = counts
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{} {}", n, label))
        .collect();

    format!("Summary: {}", parts.join(", "))
}
