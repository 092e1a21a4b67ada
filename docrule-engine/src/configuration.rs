use crate::validator::ParameterSpec;
use std::fmt::Display;
use valu3::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    NotAnObject,
    InvalidList(&'static str),
    InvalidStatement { field: &'static str, index: usize },
    InvalidRule { index: usize, reason: String },
    InvalidParameter { index: usize, reason: String },
    InvalidDocument(String),
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::NotAnObject => write!(f, "Configuration must be an object"),
            ConfigurationError::InvalidList(field) => write!(f, "{} must be an array", field),
            ConfigurationError::InvalidStatement { field, index } => {
                write!(f, "{}[{}] must be a string", field, index)
            }
            ConfigurationError::InvalidRule { index, reason } => {
                write!(f, "rules[{}]: {}", index, reason)
            }
            ConfigurationError::InvalidParameter { index, reason } => {
                write!(f, "inputValidation[{}]: {}", index, reason)
            }
            ConfigurationError::InvalidDocument(reason) => write!(f, "document: {}", reason),
        }
    }
}

impl std::error::Error for ConfigurationError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub(crate) name: Option<String>,
    pub(crate) condition: String,
    pub(crate) body: Vec<String>,
    pub(crate) execution_actions: Vec<String>,
}

impl Rule {
    pub fn new(condition: &str) -> Self {
        Self {
            name: None,
            condition: condition.to_string(),
            body: Vec::new(),
            execution_actions: Vec::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_statement(mut self, statement: &str) -> Self {
        self.body.push(statement.to_string());
        self
    }

    pub fn with_action(mut self, action: &str) -> Self {
        self.execution_actions.push(action.to_string());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn body(&self) -> &[String] {
        &self.body
    }

    pub fn execution_actions(&self) -> &[String] {
        &self.execution_actions
    }

    /// Stable diagnostic label: `rule[<index>]`, followed by the name when there is one.
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => format!("rule[{}] {}", index, name.replace(['\n', '\r'], " ")),
            None => format!("rule[{}]", index),
        }
    }

    pub fn try_from_value(value: &Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err("rule must be an object".to_string());
        }

        let condition = match value.get("condition") {
            Some(Value::String(condition)) => condition.as_string(),
            Some(Value::Boolean(condition)) => condition.to_string(),
            Some(_) => return Err("condition must be a string".to_string()),
            None => return Err("condition does not exist".to_string()),
        };

        let name = match value.get("name") {
            Some(Value::String(name)) => Some(name.as_string()),
            Some(_) => return Err("name must be a string".to_string()),
            None => None,
        };

        let body = match value.get("body") {
            Some(Value::String(statement)) => vec![statement.as_string()],
            Some(Value::Array(statements)) => {
                let mut body = Vec::new();
                for statement in statements.into_iter() {
                    match statement {
                        Value::String(statement) => body.push(statement.as_string()),
                        _ => return Err("body statements must be strings".to_string()),
                    }
                }
                body
            }
            Some(_) => return Err("body must be a string or an array of strings".to_string()),
            None => Vec::new(),
        };

        let execution_actions = match value.get("executionActions") {
            Some(Value::Array(actions)) => {
                let mut names = Vec::new();
                for action in actions.into_iter() {
                    match action {
                        Value::String(action) => names.push(action.as_string()),
                        _ => return Err("executionActions must contain action names".to_string()),
                    }
                }
                names
            }
            Some(_) => return Err("executionActions must be an array".to_string()),
            None => Vec::new(),
        };

        Ok(Self {
            name,
            condition,
            body,
            execution_actions,
        })
    }
}

/// Parsed rule file. Built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    document: String,
    pre_execution: Vec<String>,
    rules: Vec<Rule>,
    post_execution: Vec<String>,
    input_validation: Vec<ParameterSpec>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new("{}")
    }
}

impl Configuration {
    /// `document` is the JSON text of the initial document; it is embedded as is.
    pub fn new(document: &str) -> Self {
        Self {
            document: document.to_string(),
            pre_execution: Vec::new(),
            rules: Vec::new(),
            post_execution: Vec::new(),
            input_validation: Vec::new(),
        }
    }

    /// Replaces the document literal, keeping every other section.
    pub fn with_document(mut self, document: &str) -> Self {
        self.document = document.to_string();
        self
    }

    pub fn with_pre_execution(mut self, statement: &str) -> Self {
        self.pre_execution.push(statement.to_string());
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_post_execution(mut self, statement: &str) -> Self {
        self.post_execution.push(statement.to_string());
        self
    }

    pub fn with_parameter(mut self, spec: ParameterSpec) -> Self {
        self.input_validation.push(spec);
        self
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn pre_execution(&self) -> &[String] {
        &self.pre_execution
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn post_execution(&self) -> &[String] {
        &self.post_execution
    }

    pub fn input_validation(&self) -> &[ParameterSpec] {
        &self.input_validation
    }

    /// Builds a configuration from a parsed tree. The document literal is rendered as
    /// canonical JSON with object keys sorted; providers that still hold the source text
    /// replace it with [`Configuration::with_document`].
    pub fn try_from_value(value: &Value) -> Result<Self, ConfigurationError> {
        if !value.is_object() {
            return Err(ConfigurationError::NotAnObject);
        }

        let document = match value.get("document") {
            Some(Value::Null) | None => "{}".to_string(),
            Some(document) => canonical_json(document)?,
        };

        let pre_execution = Self::statements(value, "preExecution")?;
        let post_execution = Self::statements(value, "postExecution")?;

        let mut rules = Vec::new();
        for (index, rule) in Self::list(value, "rules")?.into_iter().enumerate() {
            let rule = Rule::try_from_value(rule)
                .map_err(|reason| ConfigurationError::InvalidRule { index, reason })?;
            rules.push(rule);
        }

        let mut input_validation = Vec::new();
        for (index, spec) in Self::list(value, "inputValidation")?.into_iter().enumerate() {
            let spec = ParameterSpec::try_from_value(spec)
                .map_err(|reason| ConfigurationError::InvalidParameter { index, reason })?;
            input_validation.push(spec);
        }

        Ok(Self {
            document,
            pre_execution,
            rules,
            post_execution,
            input_validation,
        })
    }

    fn list<'a>(
        value: &'a Value,
        field: &'static str,
    ) -> Result<Vec<&'a Value>, ConfigurationError> {
        match value.get(field) {
            Some(Value::Array(items)) => Ok(items.into_iter().collect()),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(ConfigurationError::InvalidList(field)),
        }
    }

    fn statements(value: &Value, field: &'static str) -> Result<Vec<String>, ConfigurationError> {
        let mut statements = Vec::new();

        for (index, statement) in Self::list(value, field)?.into_iter().enumerate() {
            match statement {
                Value::String(statement) => statements.push(statement.as_string()),
                _ => return Err(ConfigurationError::InvalidStatement { field, index }),
            }
        }

        Ok(statements)
    }
}

fn canonical_json(value: &Value) -> Result<String, ConfigurationError> {
    let tree = serde_json::to_value(value)
        .map_err(|err| ConfigurationError::InvalidDocument(err.to_string()))?;

    serde_json::to_string(&sorted(tree))
        .map_err(|err| ConfigurationError::InvalidDocument(err.to_string()))
}

fn sorted(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(String, serde_json::Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sorted(value)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sorted).collect())
        }
        other => other,
    }
}
