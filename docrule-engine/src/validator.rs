use regex::Regex;
use std::{collections::HashMap, fmt::Display};
use valu3::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl ParameterType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" => Some(ParameterType::String),
            "integer" | "int" => Some(ParameterType::Integer),
            "number" | "float" => Some(ParameterType::Number),
            "boolean" | "bool" => Some(ParameterType::Boolean),
            "object" => Some(ParameterType::Object),
            "array" => Some(ParameterType::Array),
            "any" => Some(ParameterType::Any),
            _ => None,
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ParameterType::Any, _) => true,
            (ParameterType::String, Value::String(_)) => true,
            (ParameterType::Integer, Value::Number(number)) => !number.is_float(),
            (ParameterType::Number, Value::Number(_)) => true,
            (ParameterType::Boolean, Value::Boolean(_)) => true,
            (ParameterType::Object, Value::Object(_)) => true,
            (ParameterType::Array, Value::Array(_)) => true,
            _ => false,
        }
    }

    /// Turns the string form of a parameter into a value of this type.
    fn coerce(&self, raw: &str) -> Option<Value> {
        match self {
            ParameterType::String | ParameterType::Any => Some(Value::from(raw)),
            ParameterType::Integer => raw.trim().parse::<i64>().ok().map(Value::from),
            ParameterType::Number => raw.trim().parse::<f64>().ok().map(Value::from),
            ParameterType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::from(true)),
                "false" => Some(Value::from(false)),
                _ => None,
            },
            ParameterType::Object | ParameterType::Array => Value::json_to_value(raw)
                .ok()
                .filter(|value| self.matches(value)),
        }
    }
}

impl Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParameterType::String => "string",
            ParameterType::Integer => "integer",
            ParameterType::Number => "number",
            ParameterType::Boolean => "boolean",
            ParameterType::Object => "object",
            ParameterType::Array => "array",
            ParameterType::Any => "any",
        };
        write!(f, "{}", name)
    }
}

/// Declared constraints for one input parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterType,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub allowed: Vec<Value>,
}

impl ParameterSpec {
    pub fn new(name: &str, kind: ParameterType) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            pattern: None,
            allowed: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_length(mut self, min_length: Option<usize>, max_length: Option<usize>) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn with_allowed(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = allowed;
        self
    }

    pub fn try_from_value(value: &Value) -> Result<Self, String> {
        let name = match value.get("name") {
            Some(Value::String(name)) => name.as_string(),
            _ => return Err("name must be a string".to_string()),
        };

        let kind = match value.get("type") {
            Some(Value::String(kind)) => match ParameterType::parse(kind.as_str()) {
                Some(kind) => kind,
                None => return Err(format!("unknown type {}", kind.as_str())),
            },
            None => ParameterType::Any,
            Some(_) => return Err("type must be a string".to_string()),
        };

        let mut spec = ParameterSpec::new(&name, kind);

        if let Some(required) = value.get("required") {
            match required.as_bool() {
                Some(required) => spec.required = *required,
                None => return Err("required must be a boolean".to_string()),
            }
        }

        spec.min = Self::number_field(value, "min")?;
        spec.max = Self::number_field(value, "max")?;
        spec.min_length = Self::number_field(value, "minLength")?.map(|n| n as usize);
        spec.max_length = Self::number_field(value, "maxLength")?.map(|n| n as usize);

        match value.get("pattern") {
            Some(Value::String(pattern)) => {
                let pattern = pattern.as_string();
                if let Err(err) = Regex::new(&pattern) {
                    return Err(format!("invalid pattern: {}", err));
                }
                spec.pattern = Some(pattern);
            }
            Some(_) => return Err("pattern must be a string".to_string()),
            None => {}
        }

        match value.get("allowed") {
            Some(Value::Array(allowed)) => {
                spec.allowed = allowed.into_iter().cloned().collect();
            }
            Some(_) => return Err("allowed must be an array".to_string()),
            None => {}
        }

        Ok(spec)
    }

    fn number_field(value: &Value, field: &str) -> Result<Option<f64>, String> {
        match value.get(field) {
            Some(Value::Number(number)) => match number.to_f64() {
                Some(number) => Ok(Some(number)),
                None => Err(format!("{} must be a number", field)),
            },
            Some(_) => Err(format!("{} must be a number", field)),
            None => Ok(None),
        }
    }

    fn check(&self, value: Option<&Value>, violations: &mut Vec<Violation>) {
        let value = match value {
            Some(Value::Null) | Some(Value::Undefined) | None => {
                if self.required {
                    violations.push(self.violation(Constraint::Required, "is required".to_string()));
                }
                return;
            }
            Some(value) => value,
        };

        if !self.kind.matches(value) {
            violations.push(self.violation(
                Constraint::Type(self.kind),
                format!("must be of type {}", self.kind),
            ));
            return;
        }

        if let Value::Number(number) = value {
            if let Some(number) = number.to_f64() {
                if let Some(min) = self.min {
                    if number < min {
                        violations.push(self.violation(
                            Constraint::Min(min),
                            format!("must be greater than or equal to {}", min),
                        ));
                    }
                }

                if let Some(max) = self.max {
                    if number > max {
                        violations.push(self.violation(
                            Constraint::Max(max),
                            format!("must be less than or equal to {}", max),
                        ));
                    }
                }
            }
        }

        let length = match value {
            Value::String(text) => Some(text.as_string().chars().count()),
            Value::Array(items) => Some(items.len()),
            _ => None,
        };

        if let Some(length) = length {
            if let Some(min_length) = self.min_length {
                if length < min_length {
                    violations.push(self.violation(
                        Constraint::MinLength(min_length),
                        format!("must have a length of at least {}", min_length),
                    ));
                }
            }

            if let Some(max_length) = self.max_length {
                if length > max_length {
                    violations.push(self.violation(
                        Constraint::MaxLength(max_length),
                        format!("must have a length of at most {}", max_length),
                    ));
                }
            }
        }

        if let (Some(pattern), Value::String(text)) = (&self.pattern, value) {
            let matched = match Regex::new(pattern) {
                Ok(re) => re.is_match(text.as_str()),
                Err(_) => false,
            };

            if !matched {
                violations.push(self.violation(
                    Constraint::Pattern(pattern.clone()),
                    format!("must match pattern {}", pattern),
                ));
            }
        }

        if !self.allowed.is_empty() && !self.allowed.contains(value) {
            violations.push(self.violation(
                Constraint::Allowed,
                "is not one of the allowed values".to_string(),
            ));
        }
    }

    fn violation(&self, constraint: Constraint, message: String) -> Violation {
        Violation {
            parameter: self.name.clone(),
            constraint,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Required,
    Type(ParameterType),
    Min(f64),
    Max(f64),
    MinLength(usize),
    MaxLength(usize),
    Pattern(String),
    Allowed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub parameter: String,
    pub constraint: Constraint,
    pub message: String,
}

impl Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.parameter, self.message)
    }
}

/// Every violated constraint found for one call's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValidationError {
    violations: Vec<Violation>,
}

impl InputValidationError {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn parameters(&self) -> Vec<&str> {
        let mut parameters: Vec<&str> = Vec::new();
        for violation in self.violations.iter() {
            if !parameters.contains(&violation.parameter.as_str()) {
                parameters.push(violation.parameter.as_str());
            }
        }
        parameters
    }
}

impl Display for InputValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(f, "Invalid input: {}", messages.join("; "))
    }
}

impl std::error::Error for InputValidationError {}

pub fn validate(
    parameters: &HashMap<String, Value>,
    specs: &[ParameterSpec],
) -> Result<(), InputValidationError> {
    let mut violations = Vec::new();

    for spec in specs {
        spec.check(parameters.get(&spec.name), &mut violations);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(InputValidationError { violations })
    }
}

/// Converts string parameters into typed values following the declared types.
/// Undeclared parameters are kept as strings.
pub fn coerce(
    parameters: &HashMap<String, String>,
    specs: &[ParameterSpec],
) -> Result<HashMap<String, Value>, InputValidationError> {
    let (values, violations) = coerce_values(parameters, specs);

    if violations.is_empty() {
        Ok(values)
    } else {
        Err(InputValidationError { violations })
    }
}

/// Coerces string parameters, then checks every declared constraint on the values that
/// could be coerced. Type failures and constraint violations are reported together.
pub fn validate_strings(
    parameters: &HashMap<String, String>,
    specs: &[ParameterSpec],
) -> Result<HashMap<String, Value>, InputValidationError> {
    let (values, mut violations) = coerce_values(parameters, specs);
    let uncoerced: Vec<String> = violations.iter().map(|v| v.parameter.clone()).collect();

    for spec in specs {
        if uncoerced.contains(&spec.name) {
            continue;
        }
        spec.check(values.get(&spec.name), &mut violations);
    }

    if violations.is_empty() {
        Ok(values)
    } else {
        sort_by_declaration(&mut violations, specs);
        Err(InputValidationError { violations })
    }
}

fn coerce_values(
    parameters: &HashMap<String, String>,
    specs: &[ParameterSpec],
) -> (HashMap<String, Value>, Vec<Violation>) {
    let mut values = HashMap::new();
    let mut violations = Vec::new();

    for (name, raw) in parameters.iter() {
        let spec = specs.iter().find(|spec| &spec.name == name);

        match spec {
            Some(spec) => match spec.kind.coerce(raw) {
                Some(value) => {
                    values.insert(name.clone(), value);
                }
                None => violations.push(spec.violation(
                    Constraint::Type(spec.kind),
                    format!("must be of type {}, got {:?}", spec.kind, raw),
                )),
            },
            None => {
                values.insert(name.clone(), Value::from(raw.as_str()));
            }
        }
    }

    sort_by_declaration(&mut violations, specs);
    (values, violations)
}

fn sort_by_declaration(violations: &mut [Violation], specs: &[ParameterSpec]) {
    violations.sort_by_key(|violation| {
        specs
            .iter()
            .position(|spec| spec.name == violation.parameter)
            .unwrap_or(usize::MAX)
    });
}
