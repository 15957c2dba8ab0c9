//! Config template rendering.
//!
//! String values in a step's config may reference state keys with minijinja
//! syntax. They are rendered against the inherited state before the behavior
//! runs:
//! ```json
//! { "caption": "New post: {{ prompt }}", "channels": ["c1"] }
//! ```
//! Non-string values and strings without template markers pass through as-is.

use minijinja::Environment;
use serde_json::Value;

use crate::error::BehaviorError;
use crate::state::ExecutionState;

/// Render every templated string in `config` against `state`.
pub fn render_config(config: &Value, state: &ExecutionState) -> Result<Value, BehaviorError> {
  let env = Environment::new();
  let context = minijinja::Value::from_serialize(state.as_map());
  render_value(&env, "", config, &context)
}

fn render_value(
  env: &Environment,
  path: &str,
  value: &Value,
  context: &minijinja::Value,
) -> Result<Value, BehaviorError> {
  match value {
    Value::String(template) if is_template(template) => env
      .render_str(template, context.clone())
      .map(Value::String)
      .map_err(|e| BehaviorError::Template {
        key: path.to_string(),
        message: e.to_string(),
      }),
    Value::Array(items) => items
      .iter()
      .enumerate()
      .map(|(i, item)| render_value(env, &format!("{}[{}]", path, i), item, context))
      .collect::<Result<Vec<_>, _>>()
      .map(Value::Array),
    Value::Object(map) => {
      let mut rendered = serde_json::Map::with_capacity(map.len());
      for (key, item) in map {
        let child = if path.is_empty() {
          key.clone()
        } else {
          format!("{}.{}", path, key)
        };
        rendered.insert(key.clone(), render_value(env, &child, item, context)?);
      }
      Ok(Value::Object(rendered))
    }
    other => Ok(other.clone()),
  }
}

fn is_template(s: &str) -> bool {
  s.contains("{{") || s.contains("{%")
}
