use rhai::{Dynamic, Engine, EvalAltResult, ParseError, Scope, AST};
use std::{fmt::Display, sync::Arc};

#[derive(Debug)]
pub enum ScriptError {
    EvalError(Box<EvalAltResult>),
    InvalidType(String),
    CompileError(String, ParseError),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::EvalError(err) => write!(f, "Eval error: {}", err),
            ScriptError::InvalidType(type_name) => {
                write!(f, "Invalid type: expected string result, got {}", type_name)
            }
            ScriptError::CompileError(_, err) => write!(f, "Compile error: {}", err),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScriptError::EvalError(err) => Some(err.as_ref()),
            ScriptError::InvalidType(_) => None,
            ScriptError::CompileError(_, err) => Some(err),
        }
    }
}

/// Parsed script bound to the engine that parsed it.
#[derive(Debug, Clone)]
pub struct Script {
    source: String,
    ast: AST,
    engine: Arc<Engine>,
}

impl Script {
    pub fn try_build(engine: Arc<Engine>, source: &str) -> Result<Self, ScriptError> {
        let ast = match engine.compile(source) {
            Ok(ast) => ast,
            Err(err) => return Err(ScriptError::CompileError(source.to_string(), err)),
        };

        Ok(Self {
            source: source.to_string(),
            ast,
            engine,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Calls a script-defined function with one text argument and expects text back.
    pub fn call_with_text(&self, function: &str, argument: &str) -> Result<String, ScriptError> {
        let mut scope = Scope::new();

        let result: Dynamic = self
            .engine
            .call_fn(&mut scope, &self.ast, function, (argument.to_string(),))
            .map_err(ScriptError::EvalError)?;

        result
            .into_string()
            .map_err(|type_name| ScriptError::InvalidType(type_name.to_string()))
    }
}
