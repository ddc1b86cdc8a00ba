//! Text formats a configuration file can be stored in.

use std::ffi::OsStr;
use std::fmt::Display;
use std::path::Path;

use serde_json::{Map, Value as Json};

use super::ConfigError;

/// On-disk format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Yaml,
    Toml,
    Json,
}

impl Format {
    /// Picks a format from the file extension, defaulting to YAML.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Format::Toml,
            Some("json") => Format::Json,
            _ => Format::Yaml,
        }
    }

    /// Parses a whole document into its top-level mapping.
    ///
    /// An empty document is an empty mapping.
    pub(crate) fn parse(self, text: &str, path: &Path) -> Result<Map<String, Json>, ConfigError> {
        let document = match self {
            Format::Yaml => parse_yaml(text),
            Format::Toml => toml::from_str::<toml::Table>(text)
                .map(|table| toml_to_json(toml::Value::Table(table)))
                .map_err(|e| e.to_string()),
            Format::Json if text.trim().is_empty() => Ok(Json::Null),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
        .map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })?;

        match document {
            Json::Object(map) => Ok(map),
            Json::Null => Ok(Map::new()),
            _ => Err(ConfigError::NotAMapping(path.to_path_buf())),
        }
    }

    /// Serializes a plain structure. Output for equal input is always
    /// byte-for-byte identical.
    pub(crate) fn serialize(self, data: &Json, path: &Path) -> Result<String, ConfigError> {
        let serialize_error = |e: &dyn Display| ConfigError::Serialize {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        match self {
            Format::Yaml => serde_yaml::to_string(data).map_err(|e| serialize_error(&e)),
            Format::Toml => toml::to_string_pretty(data).map_err(|e| serialize_error(&e)),
            Format::Json => serde_json::to_string_pretty(data)
                .map(|mut text| {
                    text.push('\n');
                    text
                })
                .map_err(|e| serialize_error(&e)),
        }
    }
}

/// Parses YAML with aliases resolved and `<<` merge keys applied.
///
/// Scalar keys such as `404:` or `true:` are kept under their text.
fn parse_yaml(text: &str) -> Result<Json, String> {
    let mut document: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
    document.apply_merge().map_err(|e| e.to_string())?;
    stringify_keys(&mut document);
    serde_yaml::from_value(document).map_err(|e| e.to_string())
}

fn stringify_keys(value: &mut serde_yaml::Value) {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Mapping(mapping) => {
            *mapping = std::mem::take(mapping)
                .into_iter()
                .map(|(key, mut value)| {
                    stringify_keys(&mut value);
                    let key = match key {
                        Yaml::Null => Yaml::String("null".to_owned()),
                        Yaml::Bool(b) => Yaml::String(b.to_string()),
                        Yaml::Number(n) => Yaml::String(n.to_string()),
                        other => other,
                    };
                    (key, value)
                })
                .collect();
        }
        Yaml::Sequence(items) => items.iter_mut().for_each(stringify_keys),
        Yaml::Tagged(tagged) => stringify_keys(&mut tagged.value),
        _ => {}
    }
}

/// Datetimes become their RFC 3339 text and are written back as strings.
fn toml_to_json(value: toml::Value) -> Json {
    match value {
        toml::Value::String(s) => Json::String(s),
        toml::Value::Integer(i) => Json::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f).map_or(Json::Null, Json::Number),
        toml::Value::Boolean(b) => Json::Bool(b),
        toml::Value::Datetime(dt) => Json::String(dt.to_string()),
        toml::Value::Array(items) => Json::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Json::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}
