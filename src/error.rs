//! Error types for cfgdiff.
//!
//! Only the file-facing layers (snapshot loading, schema loading, output)
//! return errors. The diff engine itself never fails: identity and
//! structural problems are reported as diagnostics on the result.

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read file {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    JsonError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    YamlError {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    TomlError {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not detect file format for {path}")]
    UnknownFormat { path: String },

    #[error("Invalid configuration document {path}: {message}")]
    InvalidDocument { path: String, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to read schema file {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid schema TOML: {source}")]
    TomlError {
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown normalization kind '{kind}' for field {collection}.{field}")]
    UnknownKind {
        collection: String,
        field: String,
        kind: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to serialize to JSON: {source}")]
    JsonSerializationError {
        #[source]
        source: serde_json::Error,
    },
}

/// Umbrella over the loader, schema and output errors.
///
/// The library functions return their own error types. This one lets a
/// caller that loads snapshots, reads a schema file and formats the result
/// in one function chain all three with `?`.
///
/// ```no_run
/// use cfgdiff::{
///     compute_diff, format_change_set, load_document, CfgDiffError, DiffConfig, OutputFormat,
///     OutputOptions, SchemaRegistry,
/// };
/// use std::path::Path;
///
/// fn report(old: &Path, new: &Path, schema: &Path) -> Result<String, CfgDiffError> {
///     let registry = SchemaRegistry::builtin().merge(SchemaRegistry::from_file(schema)?);
///     let set = compute_diff(
///         &load_document(old)?,
///         &load_document(new)?,
///         &registry,
///         &DiffConfig::default(),
///     );
///     Ok(format_change_set(&set, &OutputFormat::Plain, &OutputOptions::default())?)
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CfgDiffError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl ParseError {
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn read_error(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    pub fn json_error(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonError {
            path: path.into(),
            source,
        }
    }

    pub fn yaml_error(path: impl Into<String>, source: serde_yaml::Error) -> Self {
        Self::YamlError {
            path: path.into(),
            source,
        }
    }

    pub fn toml_error(path: impl Into<String>, source: toml::de::Error) -> Self {
        Self::TomlError {
            path: path.into(),
            source,
        }
    }

    pub fn unknown_format(path: impl Into<String>) -> Self {
        Self::UnknownFormat { path: path.into() }
    }

    pub fn invalid_document(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Re-labels the error with the path of the file it came from.
    pub(crate) fn with_path(self, path: impl Into<String>) -> Self {
        let path = path.into();
        match self {
            Self::FileNotFound { .. } => Self::FileNotFound { path },
            Self::ReadError { source, .. } => Self::ReadError { path, source },
            Self::JsonError { source, .. } => Self::JsonError { path, source },
            Self::YamlError { source, .. } => Self::YamlError { path, source },
            Self::TomlError { source, .. } => Self::TomlError { path, source },
            Self::UnknownFormat { .. } => Self::UnknownFormat { path },
            Self::InvalidDocument { message, .. } => Self::InvalidDocument { path, message },
        }
    }
}
