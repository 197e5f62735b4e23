//! MiniJinja wrapper for template rendering.

use super::error::TemplateError;
use minijinja::{Environment, Value};
use std::collections::HashMap;
use std::collections::HashSet;

/// Recursion limit for template rendering, lower than MiniJinja's default to
/// bound pathological nesting.
const RECURSION_LIMIT: usize = 100;

/// Cap on the unknown-macro stubbing retry loop.
const MAX_STUB_RETRIES: usize = 50;

/// Renders a Jinja2 template with the given context.
///
/// Strict mode: undefined variables are an error.
pub(crate) fn render_jinja(
    template: &str,
    context: &HashMap<String, serde_json::Value>,
) -> Result<String, TemplateError> {
    let mut env = Environment::new();
    env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
    env.set_recursion_limit(RECURSION_LIMIT);
    env.add_template("sql", template)?;

    let tmpl = env.get_template("sql")?;
    let rendered = tmpl.render(Value::from_serialize(context))?;
    Ok(rendered)
}

/// Renders a Jinja2 template with dbt builtins available.
///
/// Lenient mode, with stub implementations of `ref()`, `source()`,
/// `config()`, `var()` and `is_incremental()`. Unknown macros are stubbed
/// on the fly so a file can still be rendered without the full project
/// context.
pub(crate) fn render_dbt(
    template: &str,
    context: &HashMap<String, serde_json::Value>,
) -> Result<String, TemplateError> {
    let mut stubbed: HashSet<String> = HashSet::new();

    for _ in 0..MAX_STUB_RETRIES {
        let mut env = Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Lenient);
        env.set_recursion_limit(RECURSION_LIMIT);
        register_dbt_builtins(&mut env, context);
        for name in &stubbed {
            register_passthrough_function(&mut env, name);
        }
        env.add_template("sql", template)?;

        let tmpl = env.get_template("sql")?;
        match tmpl.render(Value::from_serialize(context)) {
            Ok(rendered) => return Ok(rendered),
            Err(err) => match extract_unknown_function(&err) {
                Some(name) if !stubbed.contains(&name) => {
                    stubbed.insert(name);
                }
                _ => return Err(TemplateError::RenderError(err.to_string())),
            },
        }
    }

    Err(TemplateError::RenderError(format!(
        "too many unknown functions in template (limit: {MAX_STUB_RETRIES})"
    )))
}

fn register_dbt_builtins(env: &mut Environment<'_>, context: &HashMap<String, serde_json::Value>) {
    env.add_function("ref", |args: &[Value]| -> Value {
        // One-arg form is the model name; two-arg form is (project, model).
        args.last()
            .and_then(|v| v.as_str().map(Value::from))
            .unwrap_or_else(|| Value::from(""))
    });

    env.add_function("source", |args: &[Value]| -> Value {
        let parts: Vec<String> = args
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        Value::from(parts.join("."))
    });

    env.add_function("config", |_args: &[Value]| -> Value { Value::from("") });

    let vars = context.get("vars").cloned();
    env.add_function("var", move |args: &[Value]| -> Value {
        let Some(name) = args.first().and_then(|v| v.as_str().map(str::to_string)) else {
            return Value::from("");
        };
        if let Some(serde_json::Value::Object(map)) = &vars {
            if let Some(value) = map.get(&name) {
                return Value::from_serialize(value);
            }
        }
        // Fall back to the default argument, then to the variable name.
        args.get(1).cloned().unwrap_or_else(|| Value::from(name))
    });

    env.add_function("is_incremental", |_args: &[Value]| -> Value {
        Value::from(false)
    });
}

/// Registers a passthrough function that returns its first string argument,
/// or a placeholder identifier derived from the macro name.
fn register_passthrough_function(env: &mut Environment<'_>, name: &str) {
    let placeholder = format!("__{name}__");
    env.add_function(name.to_string(), move |args: &[Value]| -> Value {
        if let Some(text) = args.first().and_then(|v| v.as_str()) {
            return Value::from(text);
        }
        Value::from(placeholder.as_str())
    });
}

/// Extracts the function name from an "unknown function" error.
fn extract_unknown_function(err: &minijinja::Error) -> Option<String> {
    if err.kind() != minijinja::ErrorKind::UnknownFunction {
        return None;
    }

    // MiniJinja error format: "unknown function: <name> is unknown"
    const PREFIX: &str = "unknown function: ";
    const SUFFIX: &str = " is unknown";

    let msg = err.to_string();
    let start = msg.find(PREFIX)? + PREFIX.len();
    let remaining = &msg[start..];
    let end = remaining.find(SUFFIX)?;
    let name = &remaining[..end];

    if name.is_empty() || name.len() > 100 {
        return None;
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
    {
        return None;
    }

    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_simple_variable() {
        let mut ctx = HashMap::new();
        ctx.insert("table_name".to_string(), serde_json::json!("users"));

        let result = render_jinja("SELECT * FROM {{ table_name }}", &ctx).unwrap();
        assert_eq!(result, "SELECT * FROM users");
    }

    #[test]
    fn renders_conditional() {
        let mut ctx = HashMap::new();
        ctx.insert("active_only".to_string(), serde_json::json!(true));

        let template = "SELECT * FROM users{% if active_only %} WHERE active{% endif %}";
        let result = render_jinja(template, &ctx).unwrap();
        assert_eq!(result, "SELECT * FROM users WHERE active");
    }

    #[test]
    fn errors_on_undefined_variable_in_strict_mode() {
        let result = render_jinja("SELECT * FROM {{ missing }}", &HashMap::new());
        assert!(matches!(
            result.unwrap_err(),
            TemplateError::UndefinedVariable(_)
        ));
    }

    #[test]
    fn errors_on_syntax_error() {
        let result = render_jinja("SELECT * FROM {{ unclosed", &HashMap::new());
        assert!(matches!(result.unwrap_err(), TemplateError::SyntaxError(_)));
    }

    #[test]
    fn dbt_mode_renders_ref() {
        let result = render_dbt("SELECT * FROM {{ ref('users') }}", &HashMap::new()).unwrap();
        assert_eq!(result, "SELECT * FROM users");
    }

    #[test]
    fn dbt_mode_renders_source_as_dotted_path() {
        let result =
            render_dbt("SELECT * FROM {{ source('raw', 'events') }}", &HashMap::new()).unwrap();
        assert_eq!(result, "SELECT * FROM raw.events");
    }

    #[test]
    fn dbt_mode_resolves_vars_from_context() {
        let mut ctx = HashMap::new();
        ctx.insert(
            "vars".to_string(),
            serde_json::json!({ "start_date": "2024-01-01" }),
        );

        let result = render_dbt("SELECT '{{ var(\"start_date\") }}'", &ctx).unwrap();
        assert_eq!(result, "SELECT '2024-01-01'");
    }

    #[test]
    fn dbt_mode_stubs_unknown_macros() {
        let result = render_dbt("SELECT {{ my_macro('col') }}", &HashMap::new()).unwrap();
        assert_eq!(result, "SELECT col");
    }
}
