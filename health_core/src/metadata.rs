//! Immutable name/value pairs attached to subsystems for reporting

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// An immutable set of name/value pairs.
///
/// The monitor never interprets metadata; it is carried into snapshots so
/// renderers can expose it. Cloning is cheap, the pairs are shared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    values: Arc<HashMap<String, Value>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map<K, V>(src: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let values = src
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        Self {
            values: Arc::new(values),
        }
    }

    /// Builds metadata from a flat list alternating names and values.
    /// A trailing name without a value maps to `null`.
    pub fn from_pairs<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        let mut values = HashMap::new();
        let mut items = items.into_iter().map(Into::into);

        while let Some(name) = items.next() {
            let name = match name {
                Value::String(s) => s,
                other => other.to_string(),
            };
            values.insert(name, items.next().unwrap_or(Value::Null));
        }

        Self {
            values: Arc::new(values),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl std::fmt::Display for Metadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self.values.as_ref()).map_err(|_| std::fmt::Error)?;
        f.write_str(&json)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_map(iter)
    }
}
