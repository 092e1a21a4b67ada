use crate::configuration::{Configuration, ConfigurationError};
use serde::Deserialize;
use serde_json::value::RawValue;
use std::fmt::Display;
use valu3::prelude::*;

#[derive(Debug)]
pub enum ConverterError {
    Json(valu3::Error),
    Yaml(serde_yaml::Error),
    Document(serde_json::Error),
    Configuration(ConfigurationError),
}

impl Display for ConverterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConverterError::Json(err) => write!(f, "Invalid JSON: {:?}", err),
            ConverterError::Yaml(err) => write!(f, "Invalid YAML: {}", err),
            ConverterError::Document(err) => write!(f, "Invalid document: {}", err),
            ConverterError::Configuration(err) => write!(f, "Invalid configuration: {}", err),
        }
    }
}

impl std::error::Error for ConverterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConverterError::Json(_) => None,
            ConverterError::Yaml(err) => Some(err),
            ConverterError::Document(err) => Some(err),
            ConverterError::Configuration(err) => Some(err),
        }
    }
}

impl From<ConfigurationError> for ConverterError {
    fn from(err: ConfigurationError) -> Self {
        ConverterError::Configuration(err)
    }
}

/// Turns configuration text into a [`Configuration`] and renders the documents an
/// engine produces.
pub trait ConverterProvider: Send + Sync {
    fn value(&self, text: &str) -> Result<Value, ConverterError>;

    /// JSON text of the `document` section as written in `text`.
    /// `None` keeps the canonical rendering built from [`ConverterProvider::value`].
    fn document_literal(&self, _text: &str) -> Result<Option<String>, ConverterError> {
        Ok(None)
    }

    fn configuration(&self, text: &str) -> Result<Configuration, ConverterError> {
        let value = self.value(text)?;
        let configuration = Configuration::try_from_value(&value)?;

        match self.document_literal(text)? {
            Some(document) => Ok(configuration.with_document(&document)),
            None => Ok(configuration),
        }
    }

    /// Parses the engine's current document text.
    fn document(&self, text: &str) -> Result<serde_json::Value, ConverterError> {
        serde_json::from_str(text).map_err(ConverterError::Document)
    }

    fn pretty(&self, text: &str) -> Result<String, ConverterError> {
        let document = self.document(text)?;
        serde_json::to_string_pretty(&document).map_err(ConverterError::Document)
    }
}

#[derive(Deserialize)]
struct DocumentSection<'a> {
    #[serde(borrow, default)]
    document: Option<&'a RawValue>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverterProvider;

impl ConverterProvider for JsonConverterProvider {
    fn value(&self, text: &str) -> Result<Value, ConverterError> {
        Value::json_to_value(text).map_err(ConverterError::Json)
    }

    fn document_literal(&self, text: &str) -> Result<Option<String>, ConverterError> {
        let section: DocumentSection =
            serde_json::from_str(text).map_err(ConverterError::Document)?;

        Ok(section.document.map(|document| document.get().to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlConverterProvider;

impl ConverterProvider for YamlConverterProvider {
    fn value(&self, text: &str) -> Result<Value, ConverterError> {
        serde_yaml::from_str::<Value>(text).map_err(ConverterError::Yaml)
    }

    fn document_literal(&self, text: &str) -> Result<Option<String>, ConverterError> {
        let tree: serde_yaml::Value = serde_yaml::from_str(text).map_err(ConverterError::Yaml)?;

        match tree.get("document") {
            Some(serde_yaml::Value::Null) | None => Ok(None),
            Some(document) => serde_json::to_string(document)
                .map(Some)
                .map_err(ConverterError::Document),
        }
    }
}
