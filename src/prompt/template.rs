//! Template engine for prompt rendering.
//!
//! Templates substitute `{name}` placeholders with values from a JSON field
//! map.
//!
//! # Syntax
//!
//! - `{field}` - value of `field`
//! - `{owner.field}` - same as `{field}`, for templates that name the owner
//! - `{address.city}` - walks into nested objects
//! - `{{` - renders as literal `{`
//! - `}}` - renders as literal `}`
//!
//! Strings render verbatim, numbers and booleans as their JSON text, `null` as
//! nothing, and arrays of scalars as a comma-separated list. Objects and
//! nested arrays cannot be rendered.
//!
//! Undefined variables are errors, never empty strings, so a typo in a field
//! name fails loudly instead of producing a silently broken prompt.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Prefix that may qualify owner fields.
const OWNER_PREFIX: &str = "owner";

/// Error type for template rendering failures.
///
/// Positions are character offsets of the opening `{`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A variable was referenced but not provided.
    #[error("undefined variable '{name}' at position {position} in template")]
    UndefinedVariable { name: String, position: usize },

    /// A `{` was found without a matching `}`.
    #[error("unmatched '{{' at position {position} in template")]
    UnmatchedBrace { position: usize },

    /// An empty variable name was found (e.g., `{}`).
    #[error("empty variable name '{{}}' at position {position} in template")]
    EmptyVariableName { position: usize },

    /// The variable holds an object or a nested array.
    #[error("variable '{name}' at position {position} is not a scalar value")]
    NonScalarValue { name: String, position: usize },
}

/// Render `template` against `context`.
///
/// ```
/// use agentry::prompt::render_template;
/// use serde_json::json;
/// use std::collections::BTreeMap;
///
/// let mut fields = BTreeMap::new();
/// fields.insert("role".to_string(), json!("Assistant"));
/// fields.insert("skills".to_string(), json!(["search", "summaries"]));
///
/// let text = render_template("You are {role}. Skills: {owner.skills}.", &fields).unwrap();
/// assert_eq!(text, "You are Assistant. Skills: search, summaries.");
/// ```
pub fn render_template(
    template: &str,
    context: &BTreeMap<String, Value>,
) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().enumerate().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '{' => {
                if let Some((_, '{')) = chars.peek() {
                    chars.next();
                    result.push('{');
                    continue;
                }

                let mut var_name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, c)) => var_name.push(c),
                        None => return Err(TemplateError::UnmatchedBrace { position: pos }),
                    }
                }

                let var_name = var_name.trim();
                if var_name.is_empty() {
                    return Err(TemplateError::EmptyVariableName { position: pos });
                }

                let value = lookup(context, var_name).ok_or_else(|| {
                    TemplateError::UndefinedVariable {
                        name: var_name.to_string(),
                        position: pos,
                    }
                })?;

                push_value(&mut result, value).map_err(|()| TemplateError::NonScalarValue {
                    name: var_name.to_string(),
                    position: pos,
                })?;
            }
            '}' => {
                // `}}` is an escape; a lone `}` is literal either way.
                if let Some((_, '}')) = chars.peek() {
                    chars.next();
                }
                result.push('}');
            }
            _ => result.push(ch),
        }
    }

    Ok(result)
}

/// Resolve a dotted path. A leading `owner.` is dropped unless the context
/// itself has an `owner` field.
fn lookup<'a>(context: &'a BTreeMap<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.').map(str::trim).peekable();
    let mut first = segments.next()?;

    if first == OWNER_PREFIX && segments.peek().is_some() && !context.contains_key(OWNER_PREFIX) {
        first = segments.next()?;
    }

    let mut value = context.get(first)?;
    for segment in segments {
        value = value.as_object()?.get(segment)?;
    }
    Some(value)
}

fn push_value(out: &mut String, value: &Value) -> Result<(), ()> {
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                push_scalar(out, item)?;
            }
            Ok(())
        }
        other => push_scalar(out, other),
    }
}

fn push_scalar(out: &mut String, value: &Value) -> Result<(), ()> {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Array(_) | Value::Object(_) => return Err(()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_simple_substitution() {
        let fields = ctx(&[("role", json!("Assistant")), ("goal", json!("Help users"))]);
        let result = render_template("You are {role}. Your goal: {goal}.", &fields).unwrap();
        assert_eq!(result, "You are Assistant. Your goal: Help users.");
    }

    #[test]
    fn test_no_variables() {
        let result = render_template("Just plain text", &BTreeMap::new()).unwrap();
        assert_eq!(result, "Just plain text");
    }

    #[test]
    fn test_escape_braces() {
        let result = render_template("Reply as {{\"answer\": ...}}", &BTreeMap::new()).unwrap();
        assert_eq!(result, "Reply as {\"answer\": ...}");
    }

    #[test]
    fn test_lone_closing_brace() {
        let result = render_template("a } b", &BTreeMap::new()).unwrap();
        assert_eq!(result, "a } b");
    }

    #[test]
    fn test_owner_prefix_alias() {
        let fields = ctx(&[("backstory", json!("AI assistant"))]);
        let result = render_template("{owner.backstory} / {backstory}", &fields).unwrap();
        assert_eq!(result, "AI assistant / AI assistant");
    }

    #[test]
    fn test_owner_field_named_owner_wins() {
        let fields = ctx(&[("owner", json!({"name": "Acme"})), ("name", json!("Bot"))]);
        let result = render_template("{owner.name}", &fields).unwrap();
        assert_eq!(result, "Acme");
    }

    #[test]
    fn test_nested_path() {
        let fields = ctx(&[("company", json!({"address": {"city": "Lisbon"}}))]);
        let result = render_template("Based in {company.address.city}", &fields).unwrap();
        assert_eq!(result, "Based in Lisbon");
    }

    #[test]
    fn test_scalar_formatting() {
        let fields = ctx(&[
            ("count", json!(3)),
            ("ratio", json!(0.5)),
            ("enabled", json!(true)),
            ("nothing", Value::Null),
            ("tags", json!(["a", 1, null, false])),
        ]);
        let result =
            render_template("{count}|{ratio}|{enabled}|{nothing}|{tags}", &fields).unwrap();
        assert_eq!(result, "3|0.5|true||a, 1, , false");
    }

    #[test]
    fn test_whitespace_in_variable_name() {
        let fields = ctx(&[("name", json!("Alice"))]);
        let result = render_template("Hello { name }!", &fields).unwrap();
        assert_eq!(result, "Hello Alice!");
    }

    #[test]
    fn test_undefined_variable_error() {
        let err = render_template("Hello {name}", &BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UndefinedVariable {
                name: "name".to_string(),
                position: 6
            }
        );
    }

    #[test]
    fn test_undefined_nested_path() {
        let fields = ctx(&[("company", json!({"name": "Acme"}))]);
        let err = render_template("{company.city}", &fields).unwrap_err();
        assert!(matches!(err, TemplateError::UndefinedVariable { .. }));

        let fields = ctx(&[("company", json!("Acme"))]);
        let err = render_template("{company.name}", &fields).unwrap_err();
        assert!(matches!(err, TemplateError::UndefinedVariable { .. }));
    }

    #[test]
    fn test_unmatched_brace_error() {
        let err = render_template("Hello {name", &BTreeMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::UnmatchedBrace { position: 6 });
    }

    #[test]
    fn test_error_position_counts_characters() {
        let err = render_template("Héllo {name", &BTreeMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::UnmatchedBrace { position: 6 });
    }

    #[test]
    fn test_empty_variable_name_error() {
        let err = render_template("Hello {}", &BTreeMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::EmptyVariableName { position: 6 });

        let err = render_template("Hello {  }", &BTreeMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::EmptyVariableName { position: 6 });
    }

    #[test]
    fn test_non_scalar_values_fail() {
        let fields = ctx(&[
            ("profile", json!({"a": 1})),
            ("matrix", json!([[1, 2], [3]])),
        ]);
        assert!(matches!(
            render_template("{profile}", &fields).unwrap_err(),
            TemplateError::NonScalarValue { .. }
        ));
        assert!(matches!(
            render_template("{matrix}", &fields).unwrap_err(),
            TemplateError::NonScalarValue { .. }
        ));
    }

    #[test]
    fn test_braces_and_unicode_in_values() {
        let fields = ctx(&[("code", json!("if x { y }")), ("text", json!("日本語 🎉"))]);
        let result = render_template("{code} {text}", &fields).unwrap();
        assert_eq!(result, "if x { y } 日本語 🎉");
    }

    #[test]
    fn test_error_display() {
        let err = TemplateError::UnmatchedBrace { position: 5 };
        assert_eq!(err.to_string(), "unmatched '{' at position 5 in template");

        let err = TemplateError::EmptyVariableName { position: 3 };
        assert_eq!(
            err.to_string(),
            "empty variable name '{}' at position 3 in template"
        );
    }
}
