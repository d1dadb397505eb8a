use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque structured payload of a queued action. Must be a JSON object so
/// the dispatcher can extract folio fields and the remote side can parse it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionPayload(Value);

impl ActionPayload {
    pub fn new(value: Value) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    fn validate(value: &Value) -> Result<(), String> {
        if !value.is_object() {
            return Err("Action payload must be a JSON object".to_string());
        }
        Ok(())
    }
}

impl From<ActionPayload> for Value {
    fn from(payload: ActionPayload) -> Self {
        payload.0
    }
}
