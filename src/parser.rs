//! Loading configuration snapshots from JSON, YAML and TOML.
//!
//! The loader reads an already-structured document model; it does not
//! understand vendor configuration formats. The expected shape is a
//! top-level map in which every array-valued key is a collection and every
//! array element is a map describing one entity:
//!
//! ```yaml
//! rules:
//!   - id: r1
//!     protocol: TCP
//!     source: { address: 192.168.001.0/24 }
//!     destination_port: "0443"
//! interfaces:
//!   - name: lan
//!     ipv4_address: 192.168.1.1
//! hostname: fw01          # not a collection, ignored
//! ```
//!
//! Entity fields are flattened to strings:
//! - scalars are kept as written; `null` leaves the field out
//! - nested maps become dotted keys (`source.address`)
//! - arrays of scalars are joined with `,`
//! - arrays containing maps become indexed keys (`members[0].name`)
//!
//! # Examples
//!
//! ```no_run
//! use cfgdiff::parser::load_document;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = load_document(Path::new("firewall-2024-05.yaml"))?;
//! println!("{} entities", doc.entity_count());
//! # Ok(())
//! # }
//! ```

use crate::error::ParseError;
use crate::model::{ConfigurationDocument, Entity};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Snapshot serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    Json,
    Yaml,
    Toml,
}

impl FormatHint {
    /// Detects the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_lowercase());

        match extension.as_deref() {
            Some("json") => Some(Self::Json),
            Some("yaml") | Some("yml") => Some(Self::Yaml),
            Some("toml") => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Loads a snapshot file into a [`ConfigurationDocument`].
///
/// The format is detected by extension (.json, .yaml, .yml, .toml). For an
/// unknown or missing extension, JSON, YAML and TOML are tried in turn.
///
/// # Errors
///
/// - `ParseError::FileNotFound` if the file does not exist
/// - `ParseError::ReadError` if it cannot be read
/// - `ParseError::JsonError` / `YamlError` / `TomlError` on syntax errors
/// - `ParseError::UnknownFormat` if no format accepts the content
/// - `ParseError::InvalidDocument` if the content has the wrong shape
pub fn load_document(path: &Path) -> Result<ConfigurationDocument, ParseError> {
    let shown = path.to_string_lossy().to_string();

    if !path.exists() {
        return Err(ParseError::file_not_found(shown));
    }

    let content =
        fs::read_to_string(path).map_err(|e| ParseError::read_error(shown.clone(), e))?;

    debug!(path = %shown, "loading snapshot");
    parse_document(&content, FormatHint::from_path(path)).map_err(|e| e.with_path(shown))
}

/// Parses snapshot content, optionally with a known format.
pub fn parse_document(
    content: &str,
    hint: Option<FormatHint>,
) -> Result<ConfigurationDocument, ParseError> {
    let value = match hint {
        Some(FormatHint::Json) => parse_json(content)?,
        Some(FormatHint::Yaml) => parse_yaml(content)?,
        Some(FormatHint::Toml) => parse_toml(content)?,
        None => parse_json(content)
            .or_else(|_| parse_yaml(content))
            .or_else(|_| parse_toml(content))
            .map_err(|_| ParseError::unknown_format(INPUT))?,
    };
    document_from_value(value)
}

const INPUT: &str = "<input>";

fn parse_json(content: &str) -> Result<Value, ParseError> {
    serde_json::from_str(content).map_err(|e| ParseError::json_error(INPUT, e))
}

fn parse_yaml(content: &str) -> Result<Value, ParseError> {
    serde_yaml::from_str(content).map_err(|e| ParseError::yaml_error(INPUT, e))
}

fn parse_toml(content: &str) -> Result<Value, ParseError> {
    toml::from_str(content).map_err(|e| ParseError::toml_error(INPUT, e))
}

/// Builds a document from a parsed value.
pub fn document_from_value(value: Value) -> Result<ConfigurationDocument, ParseError> {
    let Value::Object(root) = value else {
        return Err(ParseError::invalid_document(
            INPUT,
            "top level must be a map of collections",
        ));
    };

    let mut doc = ConfigurationDocument::new();
    for (name, value) in root {
        let Value::Array(items) = value else {
            debug!(key = %name, "skipping non-collection key");
            continue;
        };

        let entities = items
            .into_iter()
            .enumerate()
            .map(|(position, item)| match item {
                Value::Object(map) => {
                    let mut entity = Entity::new();
                    for (key, value) in map {
                        flatten_into(&mut entity, key, value);
                    }
                    Ok(entity)
                }
                other => Err(ParseError::invalid_document(
                    INPUT,
                    format!(
                        "{}[{}] must be a map, found {}",
                        name,
                        position,
                        type_name(&other)
                    ),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        doc.insert_collection(name, entities);
    }

    Ok(doc)
}

fn flatten_into(entity: &mut Entity, key: String, value: Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => entity.set(key, b.to_string()),
        Value::Number(n) => entity.set(key, n.to_string()),
        Value::String(s) => entity.set(key, s),
        Value::Object(map) => {
            for (sub, value) in map {
                flatten_into(entity, format!("{}.{}", key, sub), value);
            }
        }
        Value::Array(items) => {
            if items.iter().all(is_scalar) {
                let joined: Vec<String> = items.iter().filter_map(scalar_text).collect();
                entity.set(key, joined.join(","));
            } else {
                for (i, item) in items.into_iter().enumerate() {
                    flatten_into(entity, format!("{}[{}]", key, i), item);
                }
            }
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}
