use chrono::Utc;
use rhai::serde::to_dynamic;
use rhai::{Dynamic, Engine, EvalAltResult};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
enum LogLevel {
    Info,
    Debug,
    Warn,
    Error,
    Trace,
}

impl LogLevel {
    fn from_str(level: &str) -> Self {
        match level.to_ascii_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }

    fn log(self, message: &str) {
        match self {
            LogLevel::Info => log::info!("{}", message),
            LogLevel::Debug => log::debug!("{}", message),
            LogLevel::Warn => log::warn!("{}", message),
            LogLevel::Error => log::error!("{}", message),
            LogLevel::Trace => log::trace!("{}", message),
        }
    }
}

/// Host capabilities only exposed in open mode.
pub fn register_host_functions(engine: &mut Engine) {
    engine.register_fn("env", |name: &str| -> Dynamic {
        match std::env::var(name) {
            Ok(value) => Dynamic::from(value),
            Err(_) => Dynamic::UNIT,
        }
    });

    engine.register_fn("envs", || -> Result<Dynamic, Box<EvalAltResult>> {
        let envs = std::env::vars().collect::<HashMap<String, String>>();
        to_dynamic(envs)
    });

    engine.register_fn("now", || Utc::now().to_rfc3339());

    engine.register_fn("timestamp", || Utc::now().timestamp_millis());

    engine.register_fn("log", |level: &str, message: Dynamic| {
        LogLevel::from_str(level).log(&message.to_string())
    });
}
