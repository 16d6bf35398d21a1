//! YAML document loading.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::errors::ConfigError;

/// Read and parse a YAML document from disk.
///
/// A missing file is `FileNotFound`. An empty document (or one holding only
/// `null`) yields `T::default()`, so every key falls back to its default.
pub fn load_document<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.display().to_string(),
    })?;
    let doc = parse_named(&content, &path.display().to_string())?;
    tracing::debug!(path = %path.display(), "loaded config document");
    Ok(doc)
}

/// Parse a YAML document from a string (for testing).
pub fn parse_document<T>(yaml: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    parse_named(yaml, "<string>")
}

fn parse_named<T>(yaml: &str, name: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let parse_err = |e: serde_yaml::Error| ConfigError::ParseError {
        path: name.to_string(),
        message: e.to_string(),
    };
    let value: serde_yaml::Value = if yaml.trim().is_empty() {
        serde_yaml::Value::Null
    } else {
        serde_yaml::from_str(yaml).map_err(parse_err)?
    };
    if value.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(value).map_err(parse_err)
}
