use crate::action::ActionRegistry;
use crate::compiler::ENTRY_POINT;
use docrule_script::{build_engine, Script, ScriptError, SecurityMode};
use rhai::Engine;
use std::sync::Arc;

/// Owns the scripting runtime for one rule engine.
///
/// The runtime is built lazily for the current security mode with every registered
/// action bound, and rebuilt after [`Executor::invalidate`] or a mode change.
#[derive(Default)]
pub struct Executor {
    mode: SecurityMode,
    engine: Option<Arc<Engine>>,
}

impl Executor {
    pub fn new(mode: SecurityMode) -> Self {
        Self { mode, engine: None }
    }

    pub fn mode(&self) -> SecurityMode {
        self.mode
    }

    /// Returns true when the mode actually changed.
    pub fn set_mode(&mut self, mode: SecurityMode) -> bool {
        if self.mode == mode {
            return false;
        }

        self.mode = mode;
        self.engine = None;
        true
    }

    pub fn invalidate(&mut self) {
        self.engine = None;
    }

    pub fn prepare(
        &mut self,
        source: &str,
        registry: &ActionRegistry,
    ) -> Result<Script, ScriptError> {
        let engine = match &self.engine {
            Some(engine) => engine.clone(),
            None => {
                let engine = build_engine(self.mode, Some(registry.to_bindings()));
                self.engine = Some(engine.clone());
                engine
            }
        };

        Script::try_build(engine, source)
    }

    pub fn execute(&self, script: &Script, input: &str) -> Result<String, ScriptError> {
        script.call_with_text(ENTRY_POINT, input)
    }
}
