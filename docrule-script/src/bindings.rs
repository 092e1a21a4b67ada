use std::collections::HashMap;
use std::sync::Arc;
use valu3::value::Value;

/// Host function reachable from scripts as `name(document, input)`; returns the next document.
pub type BindingFunction = Arc<dyn Fn(Value, Value) -> Result<Value, String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Bindings {
    pub bindings: HashMap<String, BindingFunction>,
}

#[macro_export]
macro_rules! binding {
    ($call:expr) => {
        std::sync::Arc::new($call) as $crate::bindings::BindingFunction
    };
}
