use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SessionError;

/// Cached identity of the signed-in user.
///
/// This mirrors what the server said at hydration time. It is for display and for
/// picking a role-appropriate shell; every API call is still authorized server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProfile {
    pub id: Option<String>,
    pub role: Option<String>,
    pub permissions: Vec<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub hydrated_at: DateTime<Utc>,
    pub raw: Value,
}

impl SessionProfile {
    /// Builds a profile from a "who am I" payload, either the profile object itself
    /// or a wrapper whose `data` field holds it.
    pub fn from_payload(payload: Value) -> Result<Self, SessionError> {
        let body = match payload {
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Object(inner)) => inner,
                Some(other) => {
                    map.insert("data".to_string(), other);
                    map
                }
                None => map,
            },
            Value::Null => return Err(SessionError::InvalidProfile("empty payload".to_string())),
            other => {
                return Err(SessionError::InvalidProfile(format!(
                    "expected an object, got {}",
                    kind_of(&other)
                )))
            }
        };

        if body.is_empty() {
            return Err(SessionError::InvalidProfile("empty object".to_string()));
        }

        Ok(Self {
            id: scalar(&body, "id"),
            role: role_of(&body),
            permissions: permissions_of(&body),
            display_name: ["name", "full_name", "display_name", "username"]
                .iter()
                .find_map(|key| scalar(&body, key)),
            email: scalar(&body, "email"),
            hydrated_at: Utc::now(),
            raw: Value::Object(body),
        })
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Short label for the shell header.
    pub fn label(&self) -> String {
        let name = self
            .display_name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| "unknown user".to_string());
        match &self.role {
            Some(role) => format!("{} ({})", name, role),
            None => name,
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn scalar(body: &Map<String, Value>, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn named(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => scalar(map, "name").or_else(|| scalar(map, "code")),
        _ => None,
    }
}

fn role_of(body: &Map<String, Value>) -> Option<String> {
    if let Some(role) = body.get("role").and_then(named) {
        return Some(role);
    }
    match body.get("roles") {
        Some(Value::Array(roles)) => roles.iter().find_map(named),
        _ => None,
    }
}

fn permissions_of(body: &Map<String, Value>) -> Vec<String> {
    match body.get("permissions") {
        Some(Value::Array(items)) => items.iter().filter_map(named).collect(),
        _ => Vec::new(),
    }
}
