//! Property type checking and serialization

use crate::config::PropertyConfig;
use crate::value_objects::SerializedPropertyValue;
use chrono::DateTime;
use serde_json::Value;

/// Check a raw value against the declared property type and serialize it.
///
/// `null` is accepted for every type and means "unset". Types the repository does not know
/// (e.g. value object class names) accept any JSON value.
pub fn serialize_property_value(
    config: &PropertyConfig,
    value: &Value,
) -> Result<SerializedPropertyValue, String> {
    let type_name = config.property_type.as_str();
    if value.is_null() || matches_property_type(type_name, value) {
        Ok(SerializedPropertyValue::new(value.clone(), type_name))
    } else {
        Err(format!("expected a value of type \"{type_name}\", got {value}"))
    }
}

fn matches_property_type(type_name: &str, value: &Value) -> bool {
    match type_name {
        "string" => value.is_string(),
        "boolean" | "bool" => value.is_boolean(),
        "integer" | "int" => value.is_i64() || value.is_u64(),
        "float" | "double" => value.is_number(),
        "DateTime" => value
            .as_str()
            .map(|raw| DateTime::parse_from_rfc3339(raw).is_ok())
            .unwrap_or(false),
        array if array == "array" || array.starts_with("array<") => value.is_array(),
        _ => true,
    }
}
