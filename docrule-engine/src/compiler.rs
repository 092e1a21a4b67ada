use crate::{
    action::ActionRegistry,
    configuration::{Configuration, Rule},
};
use docrule_script::ScriptPreprocessor;
use std::fmt::Display;

/// Name of the function every compiled script defines.
pub const ENTRY_POINT: &str = "execute_rules";

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    UnregisteredAction { rule: String, action: String },
    InvalidActionName { rule: String, action: String },
    Document(String),
}

impl Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::UnregisteredAction { rule, action } => {
                write!(f, "{} references unregistered action {}", rule, action)
            }
            CompileError::InvalidActionName { rule, action } => {
                write!(f, "{} references invalid action name {:?}", rule, action)
            }
            CompileError::Document(reason) => write!(f, "Cannot embed document: {}", reason),
        }
    }
}

impl std::error::Error for CompileError {}

/// Emits the script for `configuration`, starting from its own document literal.
pub fn compile(
    configuration: &Configuration,
    registry: &ActionRegistry,
) -> Result<String, CompileError> {
    compile_with_document(configuration, configuration.document(), registry)
}

/// Emits the script for `configuration` with `document` as the initial document literal.
///
/// The output only depends on its inputs: the same configuration, document and
/// registered action names always produce the same text.
pub fn compile_with_document(
    configuration: &Configuration,
    document: &str,
    registry: &ActionRegistry,
) -> Result<String, CompileError> {
    let preprocessor = ScriptPreprocessor::new();
    let mut script = String::new();

    script.push_str(&format!("fn {}(input_json) {{\n", ENTRY_POINT));
    script.push_str(&format!("{}let input = ();\n", INDENT));
    script.push_str(&format!(
        "{}try {{ input = json_parse(input_json); }} catch (err) {{ return input_json; }}\n",
        INDENT
    ));
    script.push_str(&format!(
        "{}let document = json_parse({});\n",
        INDENT,
        quote_literal(document)?
    ));

    if !configuration.pre_execution().is_empty() {
        script.push_str(&format!("{}// pre-execution\n", INDENT));
        for statement in configuration.pre_execution() {
            push_statement(&mut script, 1, &preprocessor.process(statement));
        }
    }

    for (index, rule) in configuration.rules().iter().enumerate() {
        push_rule(&mut script, &preprocessor, index, rule, registry)?;
    }

    if !configuration.post_execution().is_empty() {
        script.push_str(&format!("{}// post-execution\n", INDENT));
        for statement in configuration.post_execution() {
            push_statement(&mut script, 1, &preprocessor.process(statement));
        }
    }

    script.push_str(&format!("{}return json_stringify(document);\n}}\n", INDENT));

    Ok(script)
}

fn push_rule(
    script: &mut String,
    preprocessor: &ScriptPreprocessor,
    index: usize,
    rule: &Rule,
    registry: &ActionRegistry,
) -> Result<(), CompileError> {
    let label = rule.label(index);

    script.push_str(&format!("{}// {}\n", INDENT, label));
    script.push_str(&format!(
        "{}if truthy({}) {{\n",
        INDENT,
        close_line(&preprocessor.process(rule.condition().trim()))
    ));

    for statement in rule.body() {
        push_statement(script, 2, &preprocessor.process(statement));
    }

    for action in rule.execution_actions() {
        if !is_identifier(action) {
            return Err(CompileError::InvalidActionName {
                rule: label,
                action: action.clone(),
            });
        }

        if !registry.contains(action) {
            return Err(CompileError::UnregisteredAction {
                rule: label,
                action: action.clone(),
            });
        }

        script.push_str(&format!(
            "{}{}document = {}(document, input);\n",
            INDENT, INDENT, action
        ));
    }

    script.push_str(&format!("{}}}\n", INDENT));

    Ok(())
}

fn push_statement(script: &mut String, depth: usize, statement: &str) {
    let statement = statement.trim();
    if statement.is_empty() {
        return;
    }

    script.push_str(&INDENT.repeat(depth));

    if statement.ends_with(';') || statement.ends_with('}') {
        script.push_str(statement);
    } else {
        script.push_str(&close_line(statement));
        script.push(';');
    }

    script.push('\n');
}

/// Moves whatever follows `code` onto a new line when its last line ends in a `//` comment.
fn close_line(code: &str) -> String {
    let last_line = code.lines().last().unwrap_or("");

    if last_line.contains("//") {
        format!("{}\n", code)
    } else {
        code.to_string()
    }
}

/// Quotes `text` as a script string literal. JSON string escaping is reused, except for
/// `\b` and `\f` which the script lexer does not know.
fn quote_literal(text: &str) -> Result<String, CompileError> {
    let quoted =
        serde_json::to_string(text).map_err(|err| CompileError::Document(err.to_string()))?;

    let mut literal = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            literal.push(ch);
            continue;
        }

        match chars.next() {
            Some('b') => literal.push_str("\\u0008"),
            Some('f') => literal.push_str("\\u000C"),
            Some(escaped) => {
                literal.push('\\');
                literal.push(escaped);
            }
            None => literal.push('\\'),
        }
    }

    Ok(literal)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
