use regex::Regex;
use rhai::{Dynamic, Engine, EvalAltResult};

/// Base engine shared by every security mode: custom operators plus the JSON bridge.
pub fn build_functions() -> Engine {
    let mut engine = Engine::new();

    match engine.register_custom_operator("starts_with", 80) {
        Ok(engine) => engine.register_fn("starts_with", |x: &str, y: &str| x.starts_with(y)),
        Err(_) => {
            panic!("Error on register custom operator starts_with");
        }
    };

    match engine.register_custom_operator("ends_with", 81) {
        Ok(engine) => engine.register_fn("ends_with", |x: &str, y: &str| x.ends_with(y)),
        Err(_) => {
            panic!("Error on register custom operator ends_with");
        }
    };

    match engine.register_custom_operator("search", 82) {
        Ok(engine) => engine.register_fn("search", |x: &str, y: &str| match Regex::new(x) {
            Ok(re) => re.is_match(y),
            Err(_) => false,
        }),
        Err(_) => {
            panic!("Error on register custom operator search");
        }
    };

    engine.register_fn(
        "json_parse",
        |text: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            let value = serde_json::from_str::<Dynamic>(text)
                .map_err(|err| format!("Invalid JSON: {}", err))?;
            Ok(value)
        },
    );

    // Object maps iterate in key order.
    engine.register_fn(
        "json_stringify",
        |value: Dynamic| -> Result<String, Box<EvalAltResult>> {
            serde_json::to_string(&value)
                .map_err(|err| format!("Cannot serialize document: {}", err).into())
        },
    );

    engine.register_fn("truthy", |value: Dynamic| is_truthy(&value));

    engine
}

/// ECMAScript truthiness: unit, `false`, zero, NaN and the empty string are false.
pub fn is_truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        return false;
    }

    if let Ok(value) = value.as_bool() {
        return value;
    }

    if let Ok(value) = value.as_int() {
        return value != 0;
    }

    if let Ok(value) = value.as_float() {
        return value != 0.0 && !value.is_nan();
    }

    if value.is_string() {
        return value
            .clone()
            .into_string()
            .map(|text| !text.is_empty())
            .unwrap_or(true);
    }

    true
}
