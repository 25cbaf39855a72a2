//! Per-collection descriptors: how to identify an entity and how to compare
//! its fields.
//!
//! The engine does not discover fields by reflection. Each collection gets
//! an [`EntitySchema`] holding a stable-id extractor and a field →
//! [`NormKind`] table. Only fields named in the table are compared, unless
//! the schema opts into comparing every other field with a default kind.
//!
//! Stable ids must be persisted identifiers provided by the exporter. The
//! engine never derives a composite key from mutable fields; an entity
//! without an id is reported as an identity fault.
//!
//! # Schema files
//!
//! ```toml
//! fallback_id_field = "id"
//!
//! [collections.rules]
//! id_field = "id"
//! other_fields = "text"
//!
//! [collections.rules.fields]
//! source = "ip"
//! destination_port = "port"
//! ```

use crate::error::SchemaError;
use crate::model::Entity;
use crate::normalize::NormKind;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Strategy used to pull the stable id out of an entity.
pub type IdExtractor = Arc<dyn Fn(&Entity) -> Option<String> + Send + Sync>;

/// Descriptor for one entity collection.
#[derive(Clone)]
pub struct EntitySchema {
    collection: String,
    id_field: Option<String>,
    extractor: IdExtractor,
    fields: BTreeMap<String, NormKind>,
    other_fields: Option<NormKind>,
}

impl fmt::Debug for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("collection", &self.collection)
            .field("id_field", &self.id_field)
            .field("fields", &self.fields)
            .field("other_fields", &self.other_fields)
            .finish_non_exhaustive()
    }
}

impl EntitySchema {
    /// A schema whose stable id is the value of `id_field`.
    ///
    /// Blank ids count as missing.
    pub fn keyed_by(collection: impl Into<String>, id_field: impl Into<String>) -> Self {
        let id_field = id_field.into();
        let key = id_field.clone();
        Self {
            collection: collection.into(),
            id_field: Some(id_field),
            extractor: Arc::new(move |entity: &Entity| {
                entity
                    .get(&key)
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
            }),
            fields: BTreeMap::new(),
            other_fields: None,
        }
    }

    /// A schema with a custom id extractor.
    pub fn with_extractor<F>(collection: impl Into<String>, extractor: F) -> Self
    where
        F: Fn(&Entity) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            collection: collection.into(),
            id_field: None,
            extractor: Arc::new(extractor),
            fields: BTreeMap::new(),
            other_fields: None,
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: NormKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    /// Also compare fields missing from the table, using `kind`.
    pub fn compare_other_fields(mut self, kind: NormKind) -> Self {
        self.other_fields = Some(kind);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id_field(&self) -> Option<&str> {
        self.id_field.as_deref()
    }

    pub fn fields(&self) -> &BTreeMap<String, NormKind> {
        &self.fields
    }

    pub fn stable_id(&self, entity: &Entity) -> Option<String> {
        (self.extractor)(entity)
    }

    /// The kind used to compare `field`, or `None` if it is not compared.
    pub fn kind_for(&self, field: &str) -> Option<NormKind> {
        if self.id_field.as_deref() == Some(field) {
            return None;
        }
        self.fields.get(field).copied().or(self.other_fields)
    }

    /// Fields to compare between `old` and `new`, in name order.
    pub fn comparable_fields<'a>(
        &'a self,
        old: &'a Entity,
        new: &'a Entity,
    ) -> Vec<(&'a str, NormKind)> {
        let mut out: BTreeMap<&str, NormKind> = self
            .fields
            .iter()
            .filter(|(name, _)| self.id_field.as_deref() != Some(name.as_str()))
            .map(|(name, kind)| (name.as_str(), *kind))
            .collect();

        if let Some(kind) = self.other_fields {
            for name in old.field_names().chain(new.field_names()) {
                if self.id_field.as_deref() != Some(name) {
                    out.entry(name).or_insert(kind);
                }
            }
        }

        out.into_iter().collect()
    }
}

/// Collection name → schema, with an optional fallback for unknown
/// collections.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, EntitySchema>,
    fallback_id_field: Option<String>,
}

impl SchemaRegistry {
    /// An empty registry with no fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables for common firewall/router collections, with fallback id
    /// field `id` for everything else.
    ///
    /// Every built-in table also compares unlisted fields as text, so a
    /// field the table does not name (including flattened nested keys such
    /// as `source.any`) is never silently dropped.
    pub fn builtin() -> Self {
        use NormKind as K;

        Self::new()
            .with_fallback_id_field("id")
            .with(
                EntitySchema::keyed_by("rules", "id")
                    .field("action", K::Protocol)
                    .field("direction", K::Protocol)
                    .field("interface", K::Protocol)
                    .field("ip_protocol", K::Protocol)
                    .field("protocol", K::Protocol)
                    .field("source", K::Ip)
                    .field("source.address", K::Ip)
                    .field("source.network", K::Ip)
                    .field("source_port", K::Port)
                    .field("source.port", K::Port)
                    .field("destination", K::Ip)
                    .field("destination.address", K::Ip)
                    .field("destination.network", K::Ip)
                    .field("destination_port", K::Port)
                    .field("destination.port", K::Port)
                    .field("gateway", K::Ip)
                    .field("log", K::Protocol)
                    .field("disabled", K::Protocol)
                    .field("description", K::Text)
                    .compare_other_fields(K::Text),
            )
            .with(
                EntitySchema::keyed_by("nat", "id")
                    .field("interface", K::Protocol)
                    .field("protocol", K::Protocol)
                    .field("source", K::Ip)
                    .field("source.address", K::Ip)
                    .field("source.network", K::Ip)
                    .field("source_port", K::Port)
                    .field("source.port", K::Port)
                    .field("destination", K::Ip)
                    .field("destination.address", K::Ip)
                    .field("destination.network", K::Ip)
                    .field("destination_port", K::Port)
                    .field("destination.port", K::Port)
                    .field("target", K::Ip)
                    .field("local_port", K::Port)
                    .field("disabled", K::Protocol)
                    .field("description", K::Text)
                    .compare_other_fields(K::Text),
            )
            .with(
                EntitySchema::keyed_by("interfaces", "name")
                    .field("device", K::Protocol)
                    .field("description", K::Text)
                    .field("enabled", K::Protocol)
                    .field("ipv4_address", K::Ip)
                    .field("ipv4_subnet", K::Port)
                    .field("ipv6_address", K::Ip)
                    .field("ipv6_subnet", K::Port)
                    .field("gateway", K::Text)
                    .field("mac", K::Protocol)
                    .field("mtu", K::Port)
                    .compare_other_fields(K::Text),
            )
            .with(
                EntitySchema::keyed_by("routes", "id")
                    .field("network", K::Ip)
                    .field("gateway", K::Text)
                    .field("disabled", K::Protocol)
                    .field("description", K::Text)
                    .compare_other_fields(K::Text),
            )
            .with(
                EntitySchema::keyed_by("gateways", "name")
                    .field("interface", K::Protocol)
                    .field("address", K::Ip)
                    .field("monitor", K::Ip)
                    .field("protocol", K::Protocol)
                    .field("weight", K::Port)
                    .field("description", K::Text)
                    .compare_other_fields(K::Text),
            )
            .with(
                EntitySchema::keyed_by("aliases", "name")
                    .field("type", K::Protocol)
                    .field("content", K::Text)
                    .field("description", K::Text)
                    .compare_other_fields(K::Text),
            )
            .with(
                EntitySchema::keyed_by("users", "name")
                    .field("uid", K::Port)
                    .field("full_name", K::Text)
                    .field("groups", K::Text)
                    .field("shell", K::Path)
                    .field("home", K::Path)
                    .field("disabled", K::Protocol)
                    .field("description", K::Text)
                    .compare_other_fields(K::Text),
            )
    }

    pub fn with(mut self, schema: EntitySchema) -> Self {
        self.register(schema);
        self
    }

    pub fn register(&mut self, schema: EntitySchema) {
        self.schemas.insert(schema.collection.clone(), schema);
    }

    pub fn with_fallback_id_field(mut self, field: impl Into<String>) -> Self {
        self.fallback_id_field = Some(field.into());
        self
    }

    pub fn fallback_id_field(&self) -> Option<&str> {
        self.fallback_id_field.as_deref()
    }

    pub fn get(&self, collection: &str) -> Option<&EntitySchema> {
        self.schemas.get(collection)
    }

    /// The schema for `collection`: the registered one, otherwise one built
    /// from the fallback id field that compares every field as text.
    pub fn resolve(&self, collection: &str) -> Option<Cow<'_, EntitySchema>> {
        if let Some(schema) = self.schemas.get(collection) {
            return Some(Cow::Borrowed(schema));
        }
        self.fallback_id_field.as_ref().map(|id_field| {
            Cow::Owned(
                EntitySchema::keyed_by(collection, id_field.as_str())
                    .compare_other_fields(NormKind::Text),
            )
        })
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Overlays `other` on top of `self`; same-named schemas are replaced.
    pub fn merge(mut self, other: SchemaRegistry) -> Self {
        self.schemas.extend(other.schemas);
        if other.fallback_id_field.is_some() {
            self.fallback_id_field = other.fallback_id_field;
        }
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile =
            toml::from_str(content).map_err(|source| SchemaError::TomlError { source })?;

        let mut registry = Self {
            schemas: BTreeMap::new(),
            fallback_id_field: file.fallback_id_field,
        };

        for (collection, entry) in file.collections {
            let mut schema = EntitySchema::keyed_by(collection.as_str(), entry.id_field);
            for (field, kind) in entry.fields {
                let parsed = parse_kind(&collection, &field, &kind)?;
                schema = schema.field(field, parsed);
            }
            if let Some(kind) = entry.other_fields {
                schema = schema.compare_other_fields(parse_kind(&collection, "*", &kind)?);
            }
            registry.register(schema);
        }

        Ok(registry)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path).map_err(|source| SchemaError::ReadError {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    fallback_id_field: Option<String>,
    #[serde(default)]
    collections: BTreeMap<String, CollectionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CollectionEntry {
    id_field: String,
    other_fields: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

fn parse_kind(collection: &str, field: &str, kind: &str) -> Result<NormKind, SchemaError> {
    NormKind::parse(kind).ok_or_else(|| SchemaError::UnknownKind {
        collection: collection.to_string(),
        field: field.to_string(),
        kind: kind.to_string(),
    })
}
