// (C) Copyright IBM Corp. 2025.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Models for de/serialization of the configuration data exchanged with
//! the server, the bootstrap file and the persistent cache file, plus the
//! extraction into the normalized shape a cache snapshot is built from.

mod bootstrap;
pub(crate) mod config_value;
mod configuration;
mod feature;
mod property;
mod rule;
mod segment;
mod segment_rule;
mod segments;
mod value_type;

pub(crate) use bootstrap::{referenced_segment_ids, BootstrapJson};
pub(crate) use config_value::ConfigValue;
pub(crate) use configuration::{ConfigurationJson, Configurations};
pub(crate) use feature::Feature;
pub(crate) use property::Property;
pub(crate) use rule::Rule;
pub(crate) use segment::Segment;
pub(crate) use segment_rule::SegmentRule;
pub(crate) use value_type::ValueType;

use crate::{Error, Result, Value};

/// Casts a raw configuration value into the [`Value`] shape selected by the
/// owner's `data_type` and `format`.
///
/// YAML-formatted values are stored as strings and re-parsed on every call;
/// the other combinations pass the already-parsed shape through. Any
/// combination outside the table is an error (the evaluator turns it into
/// [`Value::Null`]).
pub(crate) fn type_casted_value(
    kind: ValueType,
    format: Option<&str>,
    value: &ConfigValue,
) -> Result<Value> {
    match kind {
        ValueType::Boolean => value
            .as_boolean()
            .map(Value::Boolean)
            .ok_or(Error::MismatchType),
        ValueType::Numeric => {
            if let Some(n) = value.as_i64() {
                Ok(Value::Int64(n))
            } else if let Some(n) = value.as_u64() {
                Ok(Value::UInt64(n))
            } else if let Some(n) = value.as_f64() {
                Ok(Value::Float64(n))
            } else {
                Err(Error::MismatchType)
            }
        }
        // Format is only delivered for STRING entities; an absent format
        // means plain text.
        ValueType::String => match format.unwrap_or("TEXT") {
            "TEXT" => value
                .as_string()
                .map(Value::String)
                .ok_or(Error::MismatchType),
            "JSON" => Ok(Value::Json(value.0.clone())),
            "YAML" => {
                let text = value.as_string().ok_or(Error::MismatchType)?;
                serde_yaml::from_str(&text)
                    .map(Value::Yaml)
                    .map_err(|e| Error::Other(format!("Cannot parse YAML value: {e}")))
            }
            other => Err(Error::Other(format!("Unknown STRING format '{other}'"))),
        },
        ValueType::SecretRef => Ok(Value::Json(value.0.clone())),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn config_value(value: serde_json::Value) -> ConfigValue {
        ConfigValue(value)
    }

    #[rstest]
    #[case(serde_json::json!(true), Value::Boolean(true))]
    #[case(serde_json::json!(false), Value::Boolean(false))]
    fn test_cast_boolean(#[case] raw: serde_json::Value, #[case] expected: Value) {
        let value = type_casted_value(ValueType::Boolean, None, &config_value(raw)).unwrap();
        assert_eq!(value, expected);
    }

    #[rstest]
    #[case(serde_json::json!(-42), Value::Int64(-42))]
    #[case(serde_json::json!(18446744073709551615u64), Value::UInt64(18446744073709551615))]
    #[case(serde_json::json!(1.5), Value::Float64(1.5))]
    fn test_cast_numeric(#[case] raw: serde_json::Value, #[case] expected: Value) {
        let value = type_casted_value(ValueType::Numeric, None, &config_value(raw)).unwrap();
        assert_eq!(value, expected);
    }

    #[rstest]
    #[case(None)]
    #[case(Some("TEXT"))]
    fn test_cast_text_string(#[case] format: Option<&str>) {
        let value =
            type_casted_value(ValueType::String, format, &config_value(serde_json::json!("hi")))
                .unwrap();
        assert_eq!(value, Value::String("hi".to_string()));
    }

    #[test]
    fn test_cast_json_passes_parsed_shape_through() {
        let raw = serde_json::json!({"key": [1, 2, 3]});
        let value =
            type_casted_value(ValueType::String, Some("JSON"), &config_value(raw.clone())).unwrap();
        assert_eq!(value, Value::Json(raw));
    }

    #[test]
    fn test_cast_yaml_reparses_the_string() {
        let raw = config_value(serde_json::json!("key: enabled\ncount: 2"));
        let value = type_casted_value(ValueType::String, Some("YAML"), &raw).unwrap();
        let Value::Yaml(yaml) = value else {
            panic!("expected a YAML value");
        };
        assert_eq!(yaml["key"], serde_yaml::Value::from("enabled"));
        assert_eq!(yaml["count"], serde_yaml::Value::from(2));
    }

    #[rstest]
    // shape does not match the declared type
    #[case(ValueType::Boolean, None, serde_json::json!("true"))]
    #[case(ValueType::Numeric, None, serde_json::json!("1"))]
    #[case(ValueType::String, None, serde_json::json!(1))]
    // broken YAML text
    #[case(ValueType::String, Some("YAML"), serde_json::json!("{unbalanced"))]
    // unknown format
    #[case(ValueType::String, Some("XML"), serde_json::json!("<a/>"))]
    fn test_cast_failures(
        #[case] kind: ValueType,
        #[case] format: Option<&str>,
        #[case] raw: serde_json::Value,
    ) {
        let result = type_casted_value(kind, format, &config_value(raw));
        assert!(result.is_err());
    }
}
