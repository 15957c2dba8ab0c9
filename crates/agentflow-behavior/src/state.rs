use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The seed payload for a run was not a JSON object.
#[derive(Debug, thiserror::Error)]
#[error("payload must be a JSON object, got {found}")]
pub struct PayloadError {
  pub found: &'static str,
}

/// Accumulated key/value state visible to a step.
///
/// A snapshot is immutable. Merging a [`StateDelta`] produces a new snapshot
/// and leaves the original untouched, so sibling branches holding the same
/// parent snapshot never observe each other's writes. Cloning is cheap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionState {
  values: Arc<Map<String, Value>>,
}

impl ExecutionState {
  pub fn new() -> Self {
    Self::default()
  }

  /// Seed state from an external payload. `null` yields an empty state.
  pub fn from_payload(payload: Value) -> Result<Self, PayloadError> {
    match payload {
      Value::Null => Ok(Self::new()),
      Value::Object(map) => Ok(Self {
        values: Arc::new(map),
      }),
      other => Err(PayloadError {
        found: json_kind(&other),
      }),
    }
  }

  /// Merge a delta into a new snapshot, last write wins per key.
  pub fn merge(&self, delta: &StateDelta) -> Self {
    if delta.is_empty() {
      return self.clone();
    }
    let mut values = (*self.values).clone();
    for (key, value) in delta.iter() {
      values.insert(key.clone(), value.clone());
    }
    Self {
      values: Arc::new(values),
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  /// String value for `key`, if present and a string.
  pub fn get_str(&self, key: &str) -> Option<&str> {
    self.values.get(key).and_then(Value::as_str)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn keys(&self) -> impl Iterator<Item = &String> {
    self.values.keys()
  }

  pub fn as_map(&self) -> &Map<String, Value> {
    &self.values
  }

  /// The state as a JSON object.
  pub fn to_value(&self) -> Value {
    Value::Object((*self.values).clone())
  }
}

impl Serialize for ExecutionState {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.values.serialize(serializer)
  }
}

/// Partial state returned by a behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDelta(Map<String, Value>);

impl StateDelta {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a key, builder style.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.0.insert(key.into(), value.into());
    self
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    self.0.insert(key.into(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.0.iter()
  }

  pub fn into_map(self) -> Map<String, Value> {
    self.0
  }
}

impl From<Map<String, Value>> for StateDelta {
  fn from(map: Map<String, Value>) -> Self {
    Self(map)
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
