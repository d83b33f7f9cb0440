//! Response envelope decoding
//!
//! Azure DevOps wraps collections as `{"count": n, "value": [...]}`, GitLab
//! returns bare arrays, and a handful of endpoints return a single object
//! where a list was expected. [`ListEnvelope`] names each shape explicitly.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// The known shapes of a list response
#[derive(Debug, Clone, PartialEq)]
pub enum ListEnvelope<T> {
    /// `{"count": n, "value": [...]}`
    Collection { count: Option<u64>, value: Vec<T> },
    /// `[...]`
    Array(Vec<T>),
    /// A single object
    Single(T),
    /// An empty body
    Empty,
    /// Anything that did not decode as one of the shapes above
    Unrecognized(Value),
}

impl<T: DeserializeOwned> ListEnvelope<T> {
    /// Decode a response body into one of the known shapes
    pub fn decode(body: Value) -> Self {
        match body {
            Value::Null => ListEnvelope::Empty,
            Value::Array(_) => match serde_json::from_value::<Vec<T>>(body.clone()) {
                Ok(items) => ListEnvelope::Array(items),
                Err(_) => ListEnvelope::Unrecognized(body),
            },
            Value::Object(ref map) if map.get("value").is_some_and(Value::is_array) => {
                let count = map.get("count").and_then(Value::as_u64);
                match serde_json::from_value::<Vec<T>>(map["value"].clone()) {
                    Ok(value) => ListEnvelope::Collection { count, value },
                    Err(_) => ListEnvelope::Unrecognized(body),
                }
            }
            Value::Object(_) => match serde_json::from_value::<T>(body.clone()) {
                Ok(item) => ListEnvelope::Single(item),
                Err(_) => ListEnvelope::Unrecognized(body),
            },
            other => ListEnvelope::Unrecognized(other),
        }
    }

    /// Flatten into a list, failing on an unrecognized shape
    pub fn into_items(self) -> ApiResult<Vec<T>> {
        match self {
            ListEnvelope::Collection { value, .. } => Ok(value),
            ListEnvelope::Array(items) => Ok(items),
            ListEnvelope::Single(item) => Ok(vec![item]),
            ListEnvelope::Empty => Ok(Vec::new()),
            ListEnvelope::Unrecognized(value) => Err(ApiError::InvalidResponse(format!(
                "unexpected list response shape: {}",
                truncate(&value.to_string(), 200)
            ))),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
