//! # docrule - Rule Configurations Compiled to Scripts
//!
//! `docrule-engine` turns a **JSON rule configuration** into a single [`Rhai`](https://rhai.rs)
//! script and runs it against caller input to transform a JSON **document**.
//!
//! ## Features
//! - **Fixed template**: document literal, pre-execution statements, rules, post-execution statements
//! - **Actions**: host functions registered by name and invoked from rule bodies
//! - **Input validation** before anything runs
//! - **Secure mode** by default; open mode exposes host functions such as `env`
//! - **Performance markers** around validation, compilation and execution
//!
//! ## Example
//!
//! ```rust
//! use docrule_engine::RuleEngine;
//! use std::collections::HashMap;
//! use valu3::prelude::*;
//!
//! let mut engine = RuleEngine::from_json(r#"{
//!     "document": {"count": 0},
//!     "rules": [
//!         {"condition": "input.add === true", "body": "document.count = document.count + 1"}
//!     ]
//! }"#).unwrap();
//!
//! let mut input = HashMap::new();
//! input.insert("add".to_string(), Value::from(true));
//! engine.execute_rules(input).unwrap();
//!
//! let count = engine.document_value().get("count").and_then(|v| v.to_i64());
//! assert_eq!(count, Some(1));
//! ```
//!
//! ## Modules
//!
//! - [`configuration`] - Rule file model and its parsing from a value tree.
//! - [`converter`] - JSON and YAML providers producing configurations and reading documents back.
//! - [`action`] - Named host actions and their registry.
//! - [`compiler`] - Emits the script text.
//! - [`validator`] - Parameter declarations and checks.
//! - [`executor`] - Runtime construction and script evaluation.
//! - [`monitoring`] - Phase markers.
//! - [`rule_engine`] - The engine tying everything together.
//! - [`typed`] - Typed view over the document.
pub mod action;
pub mod compiler;
pub mod configuration;
pub mod converter;
pub mod executor;
pub mod monitoring;
pub mod rule_engine;
pub mod typed;
pub mod validator;

pub use action::{Action, ActionError, ActionRegistry, LogAction, SetAction};
pub use configuration::{Configuration, ConfigurationError, Rule};
pub use converter::{ConverterError, ConverterProvider, JsonConverterProvider, YamlConverterProvider};
pub use docrule_script::SecurityMode;
pub use monitoring::PerformanceMarker;
pub use rule_engine::{RuleEngine, RuleEngineError};
pub use typed::TypedRuleEngine;
pub use validator::{InputValidationError, ParameterSpec, ParameterType};
pub use valu3;
