use serde_json::{Map, Value};

/// A single record fetched from the document store: the store-assigned key
/// plus a flat map of field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Render a field as display text. Scalars print naturally; a missing,
    /// null, blank, or non-scalar field yields `None` so callers can
    /// substitute a placeholder.
    pub fn display_field(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }
}
