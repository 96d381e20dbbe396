//! Interpolation Engine: `{{var}}` / `{{ var }}` / `{{var:type}}` templating
//! over `serde_json::Value` trees.
//!
//! Substitution is eager and all-or-nothing: if any placeholder fails to
//! resolve, the whole call fails and no partial result is returned.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InterpolationError {
    #[error("unknown variable '{var}' in step '{step}' field '{field}'")]
    UnknownVar {
        step: String,
        field: String,
        var: String,
    },
    #[error("missing input '{var}' in step '{step}' field '{field}'")]
    MissingInput {
        step: String,
        field: String,
        var: String,
    },
    #[error("could not coerce '{var}' to {expected_type} in step '{step}' field '{field}'")]
    TypeCoercion {
        step: String,
        field: String,
        var: String,
        expected_type: String,
    },
    #[error("invalid escape sequence in step '{step}' field '{field}': {message}")]
    EscapeError {
        step: String,
        field: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Placeholder { var: String, ty: Option<String> },
}

/// Scan a template string into literal/placeholder tokens, honoring the
/// `\{{ ... \}}` escape (which yields a literal `{{ ... }}` segment rather
/// than a placeholder).
fn scan(s: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = s.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && chars.get(i + 1) == Some(&'{') && chars.get(i + 2) == Some(&'{') {
            // Escaped opener: emit literal "{{" and scan for a matching
            // escaped closer "\}}", copying everything between verbatim.
            let close = find_escaped_close(&chars, i + 3)
                .ok_or_else(|| "unterminated escape: missing matching \\}}".to_string())?;
            literal.push_str("{{");
            literal.extend(&chars[i + 3..close]);
            literal.push_str("}}");
            i = close + 3;
            continue;
        }
        if chars[i] == '{' && chars.get(i + 1) == Some(&'{') {
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            let close = find_close(&chars, i + 2).ok_or_else(|| "unterminated '{{'".to_string())?;
            let inner: String = chars[i + 2..close].iter().collect();
            let inner = inner.trim();
            let (var, ty) = match inner.split_once(':') {
                Some((v, t)) => (v.trim().to_string(), Some(t.trim().to_string())),
                None => (inner.to_string(), None),
            };
            if var.is_empty() {
                return Err("empty placeholder".to_string());
            }
            tokens.push(Token::Placeholder { var, ty });
            i = close + 2;
            continue;
        }
        literal.push(chars[i]);
        i += 1;
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

fn find_close(chars: &[char], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '}' && chars[i + 1] == '}' {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn find_escaped_close(chars: &[char], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 2 < chars.len() {
        if chars[i] == '\\' && chars[i + 1] == '}' && chars[i + 2] == '}' {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn coerce(var: &str, ty: &str, value: &Value) -> Option<Value> {
    match ty {
        "string" | "str" => Some(Value::String(render_scalar(value))),
        "int" | "integer" => value
            .as_i64()
            .map(|v| Value::Number(v.into()))
            .or_else(|| {
                // A float that happens to be integrally valued narrows to int.
                value
                    .as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| Value::Number((f as i64).into()))
            })
            .or_else(|| value.as_str().and_then(|s| s.trim().parse::<i64>().ok()).map(|v| Value::Number(v.into())))
            .or_else(|| {
                value
                    .as_str()
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| Value::Number((f as i64).into()))
            }),
        "float" | "number" => value
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .or_else(|| {
                value
                    .as_str()
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
            }),
        "bool" | "boolean" => value.as_bool().map(Value::Bool).or_else(|| {
            value.as_str().and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(Value::Bool(true)),
                "false" | "0" | "no" => Some(Value::Bool(false)),
                _ => None,
            })
        }),
        _ => {
            let _ = var;
            None
        }
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn resolve_placeholder(
    step: &str,
    field: &str,
    var: &str,
    ty: Option<&str>,
    inputs: &HashMap<String, Value>,
) -> Result<Value, InterpolationError> {
    let raw = inputs.get(var).ok_or_else(|| InterpolationError::UnknownVar {
        step: step.to_string(),
        field: field.to_string(),
        var: var.to_string(),
    })?;
    if raw.is_null() {
        return Err(InterpolationError::MissingInput {
            step: step.to_string(),
            field: field.to_string(),
            var: var.to_string(),
        });
    }
    if let Some(ty) = ty {
        coerce(var, ty, raw).ok_or_else(|| InterpolationError::TypeCoercion {
            step: step.to_string(),
            field: field.to_string(),
            var: var.to_string(),
            expected_type: ty.to_string(),
        })
    } else {
        Ok(raw.clone())
    }
}

/// Interpolate a single template string. A template consisting of exactly
/// one placeholder and nothing else preserves the substituted value's
/// original JSON type; any other shape (literal text mixed with
/// placeholders, or multiple placeholders) renders to a `Value::String`.
pub fn interpolate_string(
    step: &str,
    field: &str,
    template: &str,
    inputs: &HashMap<String, Value>,
) -> Result<Value, InterpolationError> {
    let tokens = scan(template).map_err(|message| InterpolationError::EscapeError {
        step: step.to_string(),
        field: field.to_string(),
        message,
    })?;

    if let [Token::Placeholder { var, ty }] = tokens.as_slice() {
        return resolve_placeholder(step, field, var, ty.as_deref(), inputs);
    }

    let mut out = String::new();
    for token in &tokens {
        match token {
            Token::Literal(s) => out.push_str(s),
            Token::Placeholder { var, ty } => {
                let v = resolve_placeholder(step, field, var, ty.as_deref(), inputs)?;
                out.push_str(&render_scalar(&v));
            }
        }
    }
    Ok(Value::String(out))
}

/// Recursively interpolate every string leaf of a JSON value (objects,
/// arrays, and scalars), all-or-nothing.
pub fn interpolate_value(
    step: &str,
    field: &str,
    value: &Value,
    inputs: &HashMap<String, Value>,
) -> Result<Value, InterpolationError> {
    match value {
        Value::String(s) => interpolate_string(step, field, s, inputs),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(interpolate_value(step, field, item, inputs)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), interpolate_value(step, field, v, inputs)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> HashMap<String, Value> {
        let mut m = HashMap::new();
        m.insert("name".to_string(), Value::String("Ada".to_string()));
        m.insert("count".to_string(), Value::Number(3.into()));
        m.insert("missing".to_string(), Value::Null);
        m
    }

    #[test]
    fn whole_string_placeholder_preserves_type() {
        let v = interpolate_string("s", "f", "{{count}}", &inputs()).unwrap();
        assert_eq!(v, Value::Number(3.into()));
    }

    #[test]
    fn mixed_literal_and_placeholder_yields_string() {
        let v = interpolate_string("s", "f", "hello {{name}}!", &inputs()).unwrap();
        assert_eq!(v, Value::String("hello Ada!".to_string()));
    }

    #[test]
    fn spaced_placeholder_syntax() {
        let v = interpolate_string("s", "f", "{{ name }}", &inputs()).unwrap();
        assert_eq!(v, Value::String("Ada".to_string()));
    }

    #[test]
    fn typed_placeholder_coerces() {
        let mut inputs = inputs();
        inputs.insert("count_str".to_string(), Value::String("42".to_string()));
        let v = interpolate_string("s", "f", "{{count_str:int}}", &inputs).unwrap();
        assert_eq!(v, Value::Number(42.into()));
    }

    #[test]
    fn unknown_var_errors() {
        let err = interpolate_string("s", "f", "{{nope}}", &inputs()).unwrap_err();
        assert!(matches!(err, InterpolationError::UnknownVar { .. }));
    }

    #[test]
    fn missing_input_errors() {
        let err = interpolate_string("s", "f", "{{missing}}", &inputs()).unwrap_err();
        assert!(matches!(err, InterpolationError::MissingInput { .. }));
    }

    #[test]
    fn bad_type_coercion_errors() {
        let err = interpolate_string("s", "f", "{{name:int}}", &inputs()).unwrap_err();
        assert!(matches!(err, InterpolationError::TypeCoercion { .. }));
    }

    #[test]
    fn escaped_braces_are_literal() {
        let v = interpolate_string("s", "f", "use \\{{ name \\}} literally", &inputs()).unwrap();
        assert_eq!(v, Value::String("use {{ name }} literally".to_string()));
    }

    #[test]
    fn recursive_list_interpolation() {
        let template = serde_json::json!(["{{name}}", "{{count}}"]);
        let v = interpolate_value("s", "f", &template, &inputs()).unwrap();
        assert_eq!(v, serde_json::json!(["Ada", 3]));
    }

    #[test]
    fn eager_all_or_nothing_on_nested_error() {
        let template = serde_json::json!({"ok": "{{name}}", "bad": "{{nope}}"});
        let err = interpolate_value("s", "f", &template, &inputs()).unwrap_err();
        assert!(matches!(err, InterpolationError::UnknownVar { .. }));
    }
}
