//! Document model consumed by the diff engine.
//!
//! A [`ConfigurationDocument`] is a set of named, ordered collections
//! (`rules`, `interfaces`, `routes`, ...). Each collection is a list of
//! [`Entity`] values, and an entity is a flat map of field names to raw
//! string values. An entity's position is its index in its collection.
//!
//! A collection that is absent from a document is different from one that is
//! present but empty: the first usually means the feature is not configured
//! or not supported by the exporter, the second that it was emptied.

use serde::Serialize;
use std::collections::BTreeMap;

/// One diffable unit of configuration: a flat map of raw field values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Entity {
    fields: BTreeMap<String, String>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an entity from `(field, value)` pairs.
    ///
    /// ```
    /// use cfgdiff::Entity;
    ///
    /// let rule = Entity::from_pairs([("id", "r1"), ("source", "10.0.0.1")]);
    /// assert_eq!(rule.get("source"), Some("10.0.0.1"));
    /// ```
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Field names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// An immutable snapshot of a device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ConfigurationDocument {
    collections: BTreeMap<String, Vec<Entity>>,
}

impl ConfigurationDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: impl Into<String>, entities: Vec<Entity>) -> Self {
        self.insert_collection(name, entities);
        self
    }

    /// Inserts (or replaces) a collection. An empty `entities` vector marks
    /// the collection as present but empty.
    pub fn insert_collection(&mut self, name: impl Into<String>, entities: Vec<Entity>) {
        self.collections.insert(name.into(), entities);
    }

    /// Returns the collection, or `None` if it is absent.
    pub fn collection(&self, name: &str) -> Option<&[Entity]> {
        self.collections.get(name).map(Vec::as_slice)
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Collection names in sorted order.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn entity_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}
