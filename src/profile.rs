//! Identity provider profile record

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ResolutionError;

/// Namespaced metadata section that carries provider-managed roles
pub const APP_METADATA: &str = "app_metadata";
/// Roles array inside [`APP_METADATA`]
pub const ROLES: &str = "roles";

/// Resolved identity for a token.
///
/// `raw_attributes` is the provider response as received; `subject_id` and
/// `roles` are derived from it once at construction. Role checks read `roles`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    pub subject_id: String,
    pub roles: BTreeSet<String>,
    pub raw_attributes: Map<String, Value>,
}

impl Profile {
    pub fn from_attributes(raw_attributes: Map<String, Value>) -> Self {
        let subject_id = ["user_id", "sub"]
            .iter()
            .find_map(|key| raw_attributes.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();

        let roles = raw_attributes
            .get(APP_METADATA)
            .and_then(|meta| meta.get(ROLES))
            .and_then(Value::as_array)
            .map(|roles| roles.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        Self {
            subject_id,
            roles,
            raw_attributes,
        }
    }

    /// Build a profile from a provider response body, which must be a JSON object
    pub fn from_json(value: Value) -> std::result::Result<Self, ResolutionError> {
        match value {
            Value::Object(map) => Ok(Self::from_attributes(map)),
            other => Err(ResolutionError::MalformedResponse(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// True for the placeholder returned when nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.raw_attributes.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
