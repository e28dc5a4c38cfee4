//! JSON-schema rendering of a parameter, for emitters that speak JSON Schema.

use serde_json::{Map as JsonMap, Value as JsonValue};

use super::{Parameter, ParameterType};

impl ParameterType {
    /// JSON-schema `type` keyword for this tag
    pub fn schema_type(self) -> &'static str {
        match self {
            Self::String | Self::Multi | Self::Reference => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl Parameter {
    /// Render this parameter as a JSON-schema object.
    ///
    /// Each internal constraint contributes its keyword. Reference parameters
    /// holding a string pointer emit `$ref`; every other parameter emits a
    /// `type` (`"string"` when untyped) and uses its value as `default`.
    pub fn to_json_schema(&self) -> JsonValue {
        let mut schema = JsonMap::new();

        for constraint in &self.internals {
            let (keyword, value) = constraint.to_json_schema();
            schema.insert(keyword.to_string(), value);
        }

        match (self.kind, &self.value) {
            (Some(ParameterType::Reference), Some(JsonValue::String(pointer))) => {
                schema.insert("$ref".into(), JsonValue::String(pointer.clone()));
            }
            (kind, value) => {
                let kind = kind.unwrap_or(ParameterType::String);
                schema.insert("type".into(), kind.schema_type().into());
                if let Some(value) = value {
                    schema.insert("default".into(), value.clone());
                }
            }
        }

        if let Some(format) = &self.format {
            schema.insert("format".into(), format.clone().into());
        }
        if let Some(key) = &self.key {
            schema.insert("x-title".into(), key.clone().into());
        }
        if let Some(description) = &self.description {
            schema.insert("description".into(), description.clone().into());
        }
        if let Some(example) = &self.example {
            schema.insert("example".into(), example.clone());
        }

        JsonValue::Object(schema)
    }
}
