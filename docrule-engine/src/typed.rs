use crate::configuration::Configuration;
use crate::rule_engine::{RuleEngine, RuleEngineError};
use serde::de::DeserializeOwned;
use std::ops::{Deref, DerefMut};

/// Maps the document tree produced by the engine's converter provider onto `TDoc`.
pub type DocumentConverter<TDoc> = fn(serde_json::Value) -> Result<TDoc, RuleEngineError>;

fn deserialize_tree<TDoc: DeserializeOwned>(
    tree: serde_json::Value,
) -> Result<TDoc, RuleEngineError> {
    serde_json::from_value(tree).map_err(RuleEngineError::Document)
}

/// A [`RuleEngine`] whose document can be read back as `TDoc`.
///
/// The document text is parsed by the engine's [`ConverterProvider`], so a provider set
/// with `set_converter_provider` also shapes what `document` returns. Every base
/// operation is reachable through `Deref`.
///
/// [`ConverterProvider`]: crate::converter::ConverterProvider
pub struct TypedRuleEngine<TDoc: DeserializeOwned> {
    engine: RuleEngine,
    converter: DocumentConverter<TDoc>,
}

impl<TDoc: DeserializeOwned> Default for TypedRuleEngine<TDoc> {
    fn default() -> Self {
        Self::from_engine(RuleEngine::new())
    }
}

impl<TDoc: DeserializeOwned> TypedRuleEngine<TDoc> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_engine(engine: RuleEngine) -> Self {
        Self {
            engine,
            converter: deserialize_tree::<TDoc>,
        }
    }

    pub fn from_configuration(configuration: Configuration) -> Self {
        Self::from_engine(RuleEngine::from_configuration(configuration))
    }

    pub fn from_json(text: &str) -> Result<Self, RuleEngineError> {
        Ok(Self::from_engine(RuleEngine::from_json(text)?))
    }

    pub fn with_converter(mut self, converter: DocumentConverter<TDoc>) -> Self {
        self.converter = converter;
        self
    }

    /// Deserializes the current document.
    pub fn document(&self) -> Result<TDoc, RuleEngineError> {
        (self.converter)(self.engine.document_tree()?)
    }

    pub fn into_inner(self) -> RuleEngine {
        self.engine
    }
}

impl<TDoc: DeserializeOwned> Deref for TypedRuleEngine<TDoc> {
    type Target = RuleEngine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

impl<TDoc: DeserializeOwned> DerefMut for TypedRuleEngine<TDoc> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{ConverterError, ConverterProvider, JsonConverterProvider};
    use serde::Deserialize;
    use std::collections::HashMap;
    use valu3::prelude::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Counter {
        count: i64,
    }

    const CONFIGURATION: &str = r#"{
        "document": {"count": 0},
        "rules": [
            {"condition": "input.add === true", "body": "document.count = document.count + 1"}
        ]
    }"#;

    #[test]
    fn test_typed_document() {
        let mut engine = TypedRuleEngine::<Counter>::from_json(CONFIGURATION).unwrap();
        assert_eq!(engine.document().unwrap(), Counter { count: 0 });

        let mut input = HashMap::new();
        input.insert("add".to_string(), Value::from(true));
        engine.execute_rules(input).unwrap();

        assert_eq!(engine.document().unwrap(), Counter { count: 1 });
    }

    #[test]
    fn test_unconfigured_document_fails_to_deserialize() {
        let engine = TypedRuleEngine::<Counter>::new();
        assert!(matches!(
            engine.document(),
            Err(RuleEngineError::Document(_))
        ));
    }

    /// Presents every document wrapped as `{"snapshot": <document>}`.
    struct SnapshotProvider;

    impl ConverterProvider for SnapshotProvider {
        fn value(&self, text: &str) -> Result<Value, ConverterError> {
            JsonConverterProvider.value(text)
        }

        fn document_literal(&self, text: &str) -> Result<Option<String>, ConverterError> {
            JsonConverterProvider.document_literal(text)
        }

        fn document(&self, text: &str) -> Result<serde_json::Value, ConverterError> {
            let document: serde_json::Value =
                serde_json::from_str(text).map_err(ConverterError::Document)?;
            Ok(serde_json::json!({ "snapshot": document }))
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Snapshot {
        snapshot: Counter,
    }

    #[test]
    fn test_document_goes_through_provider() {
        let mut engine = TypedRuleEngine::<Snapshot>::new();
        engine.set_converter_provider(Box::new(SnapshotProvider));
        engine.set_json_configuration(CONFIGURATION).unwrap();

        let mut input = HashMap::new();
        input.insert("add".to_string(), Value::from(true));
        engine.execute_rules(input).unwrap();

        assert_eq!(
            engine.document().unwrap(),
            Snapshot {
                snapshot: Counter { count: 1 }
            }
        );
        assert_eq!(
            engine.json_document_pretty_printed().unwrap(),
            "{\n  \"snapshot\": {\n    \"count\": 1\n  }\n}"
        );
    }

    #[test]
    fn test_custom_converter() {
        fn count_only(tree: serde_json::Value) -> Result<i64, RuleEngineError> {
            tree.get("count")
                .and_then(|v| v.as_i64())
                .ok_or(RuleEngineError::NotConfigured)
        }

        let engine = TypedRuleEngine::<i64>::from_json(CONFIGURATION)
            .unwrap()
            .with_converter(count_only);

        assert_eq!(engine.document().unwrap(), 0);
    }
}
