/// Rewrites the ECMAScript spellings rule authors tend to write into rhai.
///
/// Handled rewrites, all outside string literals and comments:
/// - `===` / `!==` become `==` / `!=`
/// - `null` / `undefined` become `()`
/// - `var` becomes `let`
/// - `JSON.parse` / `JSON.stringify` become `json_parse` / `json_stringify`
/// - `'single quoted'` strings become `"double quoted"` strings
/// - `{ ... }` in expression position becomes an object map literal `#{ ... }`
pub struct ScriptPreprocessor;

impl Default for ScriptPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptPreprocessor {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&self, code: &str) -> String {
        let chars: Vec<char> = code.chars().collect();
        let mut result = String::with_capacity(code.len() + 8);
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            let next = chars.get(i + 1).copied();

            match ch {
                '"' | '`' => {
                    let end = Self::find_string_end(&chars, i);
                    result.extend(&chars[i..end]);
                    i = end;
                }
                '\'' => {
                    let end = Self::find_string_end(&chars, i);
                    result.push_str(&Self::requote(&chars[i..end]));
                    i = end;
                }
                '/' if next == Some('/') => {
                    let end = chars[i..]
                        .iter()
                        .position(|c| *c == '\n')
                        .map(|offset| i + offset)
                        .unwrap_or(chars.len());
                    result.extend(&chars[i..end]);
                    i = end;
                }
                '/' if next == Some('*') => {
                    let end = Self::find_block_comment_end(&chars, i);
                    result.extend(&chars[i..end]);
                    i = end;
                }
                '=' | '!' if next == Some('=') && chars.get(i + 2) == Some(&'=') => {
                    result.push(ch);
                    result.push('=');
                    i += 3;
                }
                '#' if next == Some('{') => {
                    result.push_str("#{");
                    i += 2;
                }
                '{' => {
                    if Self::in_expression_position(&result) {
                        result.push_str("#{");
                    } else {
                        result.push('{');
                    }
                    i += 1;
                }
                c if c.is_alphabetic() || c == '_' => {
                    let end = chars[i..]
                        .iter()
                        .position(|c| !(c.is_alphanumeric() || *c == '_'))
                        .map(|offset| i + offset)
                        .unwrap_or(chars.len());
                    let word: String = chars[i..end].iter().collect();
                    i = end;

                    if result.ends_with('.') {
                        result.push_str(&word);
                        continue;
                    }

                    match word.as_str() {
                        "null" | "undefined" => result.push_str("()"),
                        "var" => result.push_str("let"),
                        "JSON" => {
                            if let Some((name, consumed)) = Self::json_member(&chars, i) {
                                result.push_str(name);
                                i += consumed;
                            } else {
                                result.push_str(&word);
                            }
                        }
                        _ => result.push_str(&word),
                    }
                }
                c if c.is_ascii_digit() => {
                    let end = chars[i..]
                        .iter()
                        .position(|c| !(c.is_alphanumeric() || *c == '_' || *c == '.'))
                        .map(|offset| i + offset)
                        .unwrap_or(chars.len());
                    result.extend(&chars[i..end]);
                    i = end;
                }
                _ => {
                    result.push(ch);
                    i += 1;
                }
            }
        }

        result
    }

    /// Index just past the closing quote, or the end of input when unterminated.
    fn find_string_end(chars: &[char], start: usize) -> usize {
        let quote = chars[start];
        let mut i = start + 1;

        while i < chars.len() {
            match chars[i] {
                '\\' => i += 2,
                c if c == quote => return i + 1,
                _ => i += 1,
            }
        }

        chars.len()
    }

    fn find_block_comment_end(chars: &[char], start: usize) -> usize {
        let mut i = start + 2;

        while i + 1 < chars.len() {
            if chars[i] == '*' && chars[i + 1] == '/' {
                return i + 2;
            }
            i += 1;
        }

        chars.len()
    }

    fn requote(literal: &[char]) -> String {
        let inner = match literal.len() {
            0 | 1 => &literal[0..0],
            len if literal[len - 1] == '\'' => &literal[1..len - 1],
            len => &literal[1..len],
        };

        let mut quoted = String::with_capacity(inner.len() + 2);
        quoted.push('"');

        let mut i = 0;
        while i < inner.len() {
            match inner[i] {
                '\\' if inner.get(i + 1) == Some(&'\'') => {
                    quoted.push('\'');
                    i += 2;
                }
                '\\' => {
                    quoted.push('\\');
                    if let Some(escaped) = inner.get(i + 1) {
                        quoted.push(*escaped);
                    }
                    i += 2;
                }
                '"' => {
                    quoted.push_str("\\\"");
                    i += 1;
                }
                c => {
                    quoted.push(c);
                    i += 1;
                }
            }
        }

        quoted.push('"');
        quoted
    }

    /// A `{` opens an object literal when it follows an operator or `return`.
    fn in_expression_position(emitted: &str) -> bool {
        let trimmed = emitted.trim_end();

        match trimmed.chars().last() {
            Some('=') | Some('(') | Some(',') | Some(':') | Some('[') | Some('?') => true,
            Some(c) if c.is_alphanumeric() || c == '_' => {
                let word: String = trimmed
                    .chars()
                    .rev()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                word == "nruter"
            }
            _ => false,
        }
    }

    fn json_member(chars: &[char], start: usize) -> Option<(&'static str, usize)> {
        let rest: String = chars[start..].iter().take(11).collect();

        for (member, name) in [(".parse", "json_parse"), (".stringify", "json_stringify")] {
            if rest.starts_with(member) {
                let boundary = chars.get(start + member.len());
                if !matches!(boundary, Some(c) if c.is_alphanumeric() || *c == '_') {
                    return Some((name, member.len()));
                }
            }
        }

        None
    }
}
