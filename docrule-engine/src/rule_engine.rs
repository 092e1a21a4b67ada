use crate::{
    action::{Action, ActionRegistry},
    compiler::{compile_with_document, CompileError},
    configuration::Configuration,
    converter::{ConverterError, ConverterProvider, JsonConverterProvider},
    executor::Executor,
    monitoring::{PerformanceMarker, PerformanceMonitor, COMPILATION, EXECUTION, VALIDATION},
    validator::{validate, validate_strings, InputValidationError},
};
use docrule_script::{Script, ScriptError, SecurityMode};
use std::{collections::HashMap, fmt::Display, sync::Arc};
use valu3::prelude::*;

#[derive(Debug)]
pub enum RuleEngineError {
    Validation(InputValidationError),
    Compile(CompileError),
    Script(ScriptError),
    Converter(ConverterError),
    Document(serde_json::Error),
    NotConfigured,
}

impl Display for RuleEngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleEngineError::Validation(err) => write!(f, "Validation error: {}", err),
            RuleEngineError::Compile(err) => write!(f, "Compile error: {}", err),
            RuleEngineError::Script(err) => write!(f, "Script error: {}", err),
            RuleEngineError::Converter(err) => write!(f, "Converter error: {}", err),
            RuleEngineError::Document(err) => write!(f, "Document error: {}", err),
            RuleEngineError::NotConfigured => write!(f, "No configuration has been set"),
        }
    }
}

impl std::error::Error for RuleEngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuleEngineError::Validation(err) => Some(err),
            RuleEngineError::Compile(err) => Some(err),
            RuleEngineError::Script(err) => Some(err),
            RuleEngineError::Converter(err) => Some(err),
            RuleEngineError::Document(err) => Some(err),
            RuleEngineError::NotConfigured => None,
        }
    }
}

impl From<InputValidationError> for RuleEngineError {
    fn from(err: InputValidationError) -> Self {
        RuleEngineError::Validation(err)
    }
}

impl From<CompileError> for RuleEngineError {
    fn from(err: CompileError) -> Self {
        RuleEngineError::Compile(err)
    }
}

impl From<ScriptError> for RuleEngineError {
    fn from(err: ScriptError) -> Self {
        RuleEngineError::Script(err)
    }
}

impl From<ConverterError> for RuleEngineError {
    fn from(err: ConverterError) -> Self {
        RuleEngineError::Converter(err)
    }
}

/// Compiled text for the current configuration, document and action names.
/// The parsed script is dropped on its own when the runtime is rebuilt.
struct CompiledScript {
    source: String,
    script: Option<Script>,
}

/// Runs a rule configuration against input, carrying the document from call to call.
pub struct RuleEngine {
    configuration: Option<Configuration>,
    document: Option<String>,
    registry: ActionRegistry,
    converter: Box<dyn ConverterProvider>,
    executor: Executor,
    monitor: PerformanceMonitor,
    compiled: Option<CompiledScript>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self {
            configuration: None,
            document: None,
            registry: ActionRegistry::new(),
            converter: Box::new(JsonConverterProvider),
            executor: Executor::new(SecurityMode::Secure),
            monitor: PerformanceMonitor::new(),
            compiled: None,
        }
    }
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configuration(configuration: Configuration) -> Self {
        let mut engine = Self::new();
        engine.set_configuration(configuration);
        engine
    }

    pub fn from_json(text: &str) -> Result<Self, RuleEngineError> {
        let mut engine = Self::new();
        engine.set_json_configuration(text)?;
        Ok(engine)
    }

    /// Replaces the configuration and resets the document to its literal.
    pub fn set_configuration(&mut self, configuration: Configuration) {
        log::debug!(
            "Configuration set with {} rule(s) and {} parameter declaration(s)",
            configuration.rules().len(),
            configuration.input_validation().len()
        );

        self.document = Some(configuration.document().to_string());
        self.configuration = Some(configuration);
        self.compiled = None;
    }

    /// Parses `text` with the current converter provider. On failure the previous
    /// configuration is kept.
    pub fn set_json_configuration(&mut self, text: &str) -> Result<(), RuleEngineError> {
        let configuration = self.converter.configuration(text)?;
        self.set_configuration(configuration);
        Ok(())
    }

    pub fn set_converter_provider(&mut self, converter: Box<dyn ConverterProvider>) {
        self.converter = converter;
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    pub fn register_action(&mut self, name: &str, action: Arc<dyn Action>) {
        self.registry.register(name, action);
        self.executor.invalidate();
        self.compiled = None;
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn execute_rules(
        &mut self,
        parameters: HashMap<String, Value>,
    ) -> Result<String, RuleEngineError> {
        self.check_input(&parameters)?;
        self.run_parameters(&parameters)
    }

    /// Coerces every declared parameter to its declared type, then validates.
    /// Type failures and constraint violations are reported in one error.
    pub fn execute_rules_with_string_input(
        &mut self,
        parameters: HashMap<String, String>,
    ) -> Result<String, RuleEngineError> {
        let specs = self
            .configuration
            .as_ref()
            .ok_or(RuleEngineError::NotConfigured)?
            .input_validation();

        self.monitor.start(VALIDATION);
        let result = validate_strings(&parameters, specs);
        self.monitor.stop(VALIDATION);

        let values = rejected(result)?;
        self.run_parameters(&values)
    }

    /// Runs the rules against a raw JSON payload.
    ///
    /// Text that is not JSON is handed back unchanged and leaves the document as it
    /// was. A payload that is JSON but not an object is validated as if no
    /// parameter had been given.
    pub fn execute_json_input(&mut self, input: &str) -> Result<String, RuleEngineError> {
        let parsed = serde_json::from_str::<Value>(input);

        match &parsed {
            Ok(Value::Object(object)) => {
                let mut parameters = HashMap::new();
                for (key, value) in object.iter() {
                    parameters.insert(key.to_string(), value.clone());
                }
                self.check_input(&parameters)?;
            }
            Ok(_) => self.check_input(&HashMap::new())?,
            Err(err) => log::debug!("Input is not JSON, passing it through: {}", err),
        }

        self.run(input, parsed.is_ok())
    }

    fn check_input(&mut self, parameters: &HashMap<String, Value>) -> Result<(), RuleEngineError> {
        let configuration = self
            .configuration
            .as_ref()
            .ok_or(RuleEngineError::NotConfigured)?;

        self.monitor.start(VALIDATION);
        let result = validate(parameters, configuration.input_validation());
        self.monitor.stop(VALIDATION);

        rejected(result).map(|_| ())
    }

    fn run_parameters(
        &mut self,
        parameters: &HashMap<String, Value>,
    ) -> Result<String, RuleEngineError> {
        let input = serde_json::to_string(parameters).map_err(RuleEngineError::Document)?;
        self.run(&input, true)
    }

    fn run(&mut self, input: &str, keep_document: bool) -> Result<String, RuleEngineError> {
        let script = self.script()?;

        self.monitor.start(EXECUTION);
        let result = self.executor.execute(&script, input);
        self.monitor.stop(EXECUTION);

        let output = result?;

        if keep_document && self.document.as_deref() != Some(output.as_str()) {
            log::debug!("Document changed, compiled script invalidated");
            self.document = Some(output.clone());
            self.compiled = None;
        }

        Ok(output)
    }

    fn source(&mut self) -> Result<&mut CompiledScript, RuleEngineError> {
        if self.compiled.is_none() {
            let configuration = self
                .configuration
                .as_ref()
                .ok_or(RuleEngineError::NotConfigured)?;
            let document = self.document.as_deref().unwrap_or(configuration.document());

            self.compiled = Some(CompiledScript {
                source: compile_with_document(configuration, document, &self.registry)?,
                script: None,
            });
        }

        self.compiled.as_mut().ok_or(RuleEngineError::NotConfigured)
    }

    fn script(&mut self) -> Result<Script, RuleEngineError> {
        if let Some(script) = self.compiled.as_ref().and_then(|c| c.script.clone()) {
            return Ok(script);
        }

        self.monitor.start(COMPILATION);
        let script = self.build_script();
        self.monitor.stop(COMPILATION);

        script
    }

    fn build_script(&mut self) -> Result<Script, RuleEngineError> {
        let source = self.source()?.source.clone();
        let script = self.executor.prepare(&source, &self.registry)?;
        log::debug!("Script compiled:\n{}", source);

        if let Some(compiled) = self.compiled.as_mut() {
            compiled.script = Some(script.clone());
        }

        Ok(script)
    }

    /// Script text for the current configuration and document, compiling it if needed.
    pub fn compiled_script(&mut self) -> Result<&str, RuleEngineError> {
        if self.compiled.is_none() {
            self.monitor.start(COMPILATION);
            let result = self.source().map(|_| ());
            self.monitor.stop(COMPILATION);
            result?;
        }

        Ok(self.source()?.source.as_str())
    }

    /// Current document as compact JSON, or `null` before any configuration.
    pub fn json_document(&self) -> &str {
        self.document.as_deref().unwrap_or("null")
    }

    /// Current document parsed by the converter provider.
    pub fn document_tree(&self) -> Result<serde_json::Value, RuleEngineError> {
        Ok(self.converter.document(self.json_document())?)
    }

    /// Current document rendered by the converter provider.
    pub fn json_document_pretty_printed(&self) -> Result<String, RuleEngineError> {
        Ok(self.converter.pretty(self.json_document())?)
    }

    pub fn document_value(&self) -> Value {
        Value::json_to_value(self.json_document()).unwrap_or(Value::Null)
    }

    pub fn enable_performance_monitoring(&mut self) {
        self.monitor.enable();
    }

    pub fn disable_performance_monitoring(&mut self) {
        self.monitor.disable();
    }

    pub fn performance_monitoring(&self) -> &[PerformanceMarker] {
        self.monitor.markers()
    }

    pub fn print_performance_monitoring(&self) {
        self.monitor.print();
    }

    pub fn reset_performance_monitoring(&mut self) {
        self.monitor.reset();
    }

    pub fn enable_security(&mut self) {
        self.set_security_mode(SecurityMode::Secure);
    }

    pub fn disable_security(&mut self) {
        self.set_security_mode(SecurityMode::Open);
    }

    pub fn is_secure(&self) -> bool {
        self.executor.mode().is_secure()
    }

    fn set_security_mode(&mut self, mode: SecurityMode) {
        if self.executor.set_mode(mode) {
            log::debug!("Security mode changed to {:?}", mode);

            if let Some(compiled) = self.compiled.as_mut() {
                compiled.script = None;
            }
        }
    }
}

fn rejected<T>(result: Result<T, InputValidationError>) -> Result<T, RuleEngineError> {
    result.map_err(|err| {
        log::debug!("Input rejected: {}", err);
        RuleEngineError::Validation(err)
    })
}
