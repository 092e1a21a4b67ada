use docrule_script::binding;
use docrule_script::bindings::Bindings;
use once_cell::sync::Lazy;
use std::{collections::HashMap, fmt::Display, sync::Arc};
use valu3::prelude::*;

static DOCRULE_TRUNCATE_LOG_VALUE: Lazy<usize> =
    Lazy::new(|| match std::env::var("DOCRULE_TRUNCATE_LOG_VALUE") {
        Ok(value) => value.parse::<usize>().unwrap_or(500),
        Err(_) => 500,
    });

#[derive(Debug, Clone, PartialEq)]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActionError {}

/// Host-side side effect invoked by name from compiled rule bodies.
pub trait Action: Send + Sync {
    fn execute(&self, document: &mut Value, input: &Value) -> Result<(), ActionError>;
}

impl<F> Action for F
where
    F: Fn(&mut Value, &Value) -> Result<(), ActionError> + Send + Sync,
{
    fn execute(&self, document: &mut Value, input: &Value) -> Result<(), ActionError> {
        (self)(document, input)
    }
}

#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering an existing name replaces the previous action.
    pub fn register(&mut self, name: &str, action: Arc<dyn Action>) {
        if self.actions.insert(name.to_string(), action).is_some() {
            log::debug!("Action {} replaced", name);
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(|name| name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub(crate) fn to_bindings(&self) -> Bindings {
        let mut bindings = HashMap::new();

        for (name, action) in self.actions.iter() {
            let action = action.clone();

            bindings.insert(
                name.clone(),
                binding!(move |mut document: Value, input: Value| -> Result<Value, String> {
                    action
                        .execute(&mut document, &input)
                        .map_err(|err| err.to_string())?;
                    Ok(document)
                }),
            );
        }

        Bindings { bindings }
    }
}

/// Logs the document as it is when the action runs.
pub struct LogAction {
    label: String,
}

impl LogAction {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

impl Default for LogAction {
    fn default() -> Self {
        Self::new("document")
    }
}

impl Action for LogAction {
    fn execute(&self, document: &mut Value, _input: &Value) -> Result<(), ActionError> {
        log::info!(
            "{}: {}",
            self.label,
            truncate(&document.to_json(JsonMode::Inline), *DOCRULE_TRUNCATE_LOG_VALUE)
        );
        Ok(())
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Writes a fixed value at a dotted path, creating intermediate objects.
pub struct SetAction {
    path: Vec<String>,
    value: Value,
}

impl SetAction {
    pub fn new(path: &str, value: Value) -> Self {
        Self {
            path: path.split('.').map(|segment| segment.to_string()).collect(),
            value,
        }
    }

    fn set_path(target: &mut Value, segments: &[String], value: Value) {
        match segments.split_first() {
            None => *target = value,
            Some((head, rest)) => {
                let mut child = match target.get(head.as_str()) {
                    Some(child) => child.clone(),
                    None => Value::Null,
                };

                if !rest.is_empty() && !child.is_object() {
                    child = HashMap::<String, Value>::new().to_value();
                }

                Self::set_path(&mut child, rest, value);

                if !target.is_object() {
                    *target = HashMap::<String, Value>::new().to_value();
                }

                target.insert(head.clone(), child);
            }
        }
    }
}

impl Action for SetAction {
    fn execute(&self, document: &mut Value, _input: &Value) -> Result<(), ActionError> {
        if self.path.iter().any(|segment| segment.is_empty()) {
            return Err(ActionError::new("path segments must not be empty"));
        }

        Self::set_path(document, &self.path, self.value.clone());
        Ok(())
    }
}
