pub mod bindings;
pub mod functions;
pub mod host;
pub mod preprocessor;
pub mod script;

use bindings::Bindings;
use functions::build_functions;
use host::register_host_functions;
use rhai::serde::{from_dynamic, to_dynamic};
use rhai::{Dynamic, Engine, EvalAltResult};
use std::sync::Arc;
use valu3::value::Value;

pub use preprocessor::ScriptPreprocessor;
pub use script::{Script, ScriptError};

/// Controls what a script may reach besides the registered bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityMode {
    /// Only bindings, the JSON bridge and the core language are available.
    #[default]
    Secure,
    /// Host functions (`env`, `envs`, `now`, `timestamp`, `log`) and stdout printing are exposed.
    Open,
}

impl SecurityMode {
    pub fn is_secure(&self) -> bool {
        matches!(self, SecurityMode::Secure)
    }
}

pub fn build_engine(mode: SecurityMode, bindings: Option<Bindings>) -> Arc<Engine> {
    let mut engine = build_functions();

    match mode {
        SecurityMode::Secure => {
            engine.disable_symbol("eval");
            engine.on_print(|text| log::info!("{}", text));
            engine.on_debug(|text, source, position| {
                log::debug!("{} ({}) {}", text, source.unwrap_or("script"), position)
            });
        }
        SecurityMode::Open => register_host_functions(&mut engine),
    }

    if let Some(bindings) = bindings {
        for (key, call) in bindings.bindings {
            let name = key.clone();

            engine.register_fn(
                key,
                move |document: Dynamic, input: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
                    let document: Value = from_dynamic(&document)?;
                    let input: Value = from_dynamic(&input)?;

                    let output = (call)(document, input)
                        .map_err(|err| format!("Action {} failed: {}", name, err))?;

                    to_dynamic(output)
                },
            );
        }
    }

    log::debug!(
        "Script engine built in {} mode",
        if mode.is_secure() { "secure" } else { "open" }
    );

    Arc::new(engine)
}
