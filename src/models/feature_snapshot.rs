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

use std::collections::HashMap;

use crate::metering::{MeteringRecorder, SubjectId};
use crate::network::serialization::{type_casted_value, ConfigValue, Feature, ValueType};
use crate::segment_evaluation::TargetingRules;
use crate::{Result, Value};

use super::normalized_value;

/// A feature flag taken from one configuration snapshot. Evaluating it for
/// different entities always uses the same data; query the client again to
/// observe live updates.
#[derive(Debug)]
pub struct FeatureSnapshot {
    name: String,
    feature_id: String,
    kind: ValueType,
    format: Option<String>,
    enabled: bool,
    enabled_value: ConfigValue,
    disabled_value: ConfigValue,
    rollout_percentage: u32,
    segment_rules: TargetingRules,
    metering: Option<MeteringRecorder>,
}

impl FeatureSnapshot {
    pub(crate) fn new(
        feature: Feature,
        segment_rules: TargetingRules,
        metering: Option<MeteringRecorder>,
    ) -> Self {
        Self {
            name: feature.name,
            feature_id: feature.feature_id,
            kind: feature.r#type,
            format: feature.format,
            enabled: feature.enabled,
            enabled_value: feature.enabled_value,
            disabled_value: feature.disabled_value,
            rollout_percentage: feature.rollout_percentage,
            segment_rules,
            metering,
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_feature_id(&self) -> &str {
        &self.feature_id
    }

    /// Whether the feature flag is enabled. Disabled features are not
    /// evaluated and always yield the disabled value.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The enabled value in its configured shape, [`Value::Null`] if the
    /// stored value does not match the declared type.
    pub fn get_enabled_value(&self) -> Value {
        self.cast(&self.enabled_value)
            .unwrap_or_else(|_| Value::Null)
    }

    /// See [`FeatureSnapshot::get_enabled_value`].
    pub fn get_disabled_value(&self) -> Value {
        self.cast(&self.disabled_value)
            .unwrap_or_else(|_| Value::Null)
    }

    /// Evaluates the feature flag for an entity.
    ///
    /// `entity_id` identifies the subject of evaluation (a user, a device,
    /// an app instance, ...). `entity_attributes` is consulted by the
    /// targeting rules; without attributes no segment can match and the
    /// enabled/disabled values are served directly.
    ///
    /// Returns [`Value::Null`] when the entity id is empty, the feature
    /// data is malformed, or the configured value cannot be produced in
    /// the declared shape.
    pub fn get_current_value(
        &self,
        entity_id: &str,
        entity_attributes: &HashMap<String, Value>,
    ) -> Value {
        if entity_id.is_empty() {
            log::error!("Feature flag evaluation: entity id is empty");
            return Value::Null;
        }
        if !self.is_valid() {
            log::error!("Feature flag '{}' has malformed data", self.feature_id);
            return Value::Null;
        }

        let (value, segment_id) = match self.evaluate(entity_id, entity_attributes) {
            Ok((value, segment_id)) => (value, segment_id),
            Err(e) => {
                log::error!("Failed to evaluate feature '{}': {e}", self.feature_id);
                (Value::Null, None)
            }
        };
        self.record_evaluation(entity_id, segment_id.as_deref());
        value
    }

    fn is_valid(&self) -> bool {
        !(self.name.is_empty()
            || self.feature_id.is_empty()
            || self.enabled_value.is_null()
            || self.disabled_value.is_null())
    }

    fn evaluate(
        &self,
        entity_id: &str,
        entity_attributes: &HashMap<String, Value>,
    ) -> Result<(Value, Option<String>)> {
        if !self.enabled {
            return Ok((self.cast(&self.disabled_value)?, None));
        }

        if !self.segment_rules.is_empty() && !entity_attributes.is_empty() {
            if let Some((segment_rule, segment_id)) =
                self.segment_rules.find_applicable_rule(entity_attributes)
            {
                let segment_id = segment_id.to_string();
                let rollout_percentage =
                    segment_rule.rollout_percentage(self.rollout_percentage)?;
                let value = if self.should_rollout(rollout_percentage, entity_id) {
                    segment_rule.value(&self.enabled_value)?
                } else {
                    self.cast(&self.disabled_value)?
                };
                return Ok((value, Some(segment_id)));
            }
        }

        let value = if self.should_rollout(self.rollout_percentage, entity_id) {
            self.cast(&self.enabled_value)?
        } else {
            self.cast(&self.disabled_value)?
        };
        Ok((value, None))
    }

    // The explicit 100 short-circuit keeps full rollouts independent of
    // the hash check, which uses strict `<`.
    fn should_rollout(&self, rollout_percentage: u32, entity_id: &str) -> bool {
        rollout_percentage == 100 || {
            let tag = format!("{}:{}", entity_id, self.feature_id);
            normalized_value(&tag) < rollout_percentage
        }
    }

    fn cast(&self, value: &ConfigValue) -> Result<Value> {
        type_casted_value(self.kind, self.format.as_deref(), value)
    }

    fn record_evaluation(&self, entity_id: &str, segment_id: Option<&str>) {
        if let Some(metering) = &self.metering {
            metering.record_evaluation(
                SubjectId::Feature(self.feature_id.clone()),
                entity_id,
                segment_id,
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::network::serialization::fixtures::{segment, segment_rule};
    use crate::network::serialization::{Segment, SegmentRule};
    use rstest::*;

    pub(crate) fn feature_snapshot(
        kind: ValueType,
        enabled_value: serde_json::Value,
        disabled_value: serde_json::Value,
        enabled: bool,
        rollout_percentage: u32,
        segments: HashMap<String, Segment>,
        segment_rules: Vec<SegmentRule>,
    ) -> FeatureSnapshot {
        let feature = Feature {
            name: "F1".to_string(),
            feature_id: "f1".to_string(),
            r#type: kind,
            format: None,
            enabled_value: ConfigValue(enabled_value),
            disabled_value: ConfigValue(disabled_value),
            segment_rules: segment_rules.clone(),
            enabled,
            rollout_percentage,
        };
        let targeting_rules = TargetingRules::new(segments, segment_rules, kind, None);
        FeatureSnapshot::new(feature, targeting_rules, None)
    }

    fn beta_users_segment() -> HashMap<String, Segment> {
        HashMap::from([(
            "beta-users".to_string(),
            segment("beta-users", "email", "contains", &["ibm.com"]),
        )])
    }

    fn email_attributes(email: &str) -> HashMap<String, Value> {
        HashMap::from([("email".to_string(), Value::from(email))])
    }

    // A plain boolean feature without segment rules serves the enabled
    // value while enabled and the disabled value otherwise.
    #[rstest]
    #[case(true, Value::Boolean(true))]
    #[case(false, Value::Boolean(false))]
    fn test_boolean_feature_without_segments(#[case] enabled: bool, #[case] expected: Value) {
        let feature = feature_snapshot(
            ValueType::Boolean,
            serde_json::json!(true),
            serde_json::json!(false),
            enabled,
            100,
            HashMap::new(),
            Vec::new(),
        );
        assert_eq!(feature.get_current_value("user1", &HashMap::new()), expected);
    }

    // Rollout 0 never serves the enabled value through the hash check.
    #[test]
    fn test_rollout_zero_serves_disabled_value() {
        let feature = feature_snapshot(
            ValueType::Boolean,
            serde_json::json!(true),
            serde_json::json!(false),
            true,
            0,
            HashMap::new(),
            Vec::new(),
        );
        assert_eq!(
            feature.get_current_value("user1", &HashMap::new()),
            Value::Boolean(false)
        );
    }

    // Entity buckets: "a1:f1" hashes to 68, "a2:f1" to 29, so with a 50%
    // rollout a1 is excluded and a2 included.
    #[rstest]
    #[case("a1", Value::Int64(2))]
    #[case("a2", Value::Int64(-42))]
    fn test_partial_rollout_without_segment_match(#[case] entity_id: &str, #[case] expected: Value) {
        let feature = feature_snapshot(
            ValueType::Numeric,
            serde_json::json!(-42),
            serde_json::json!(2),
            true,
            50,
            HashMap::new(),
            Vec::new(),
        );
        assert_eq!(feature.get_current_value(entity_id, &HashMap::new()), expected);
    }

    // A `$default` rule value resolves to the feature's enabled value for
    // entities in the segment; entities outside the segment take the
    // regular path.
    #[rstest]
    #[case("x@ibm.com", Value::Boolean(true))]
    #[case("x@other.com", Value::Boolean(true))]
    fn test_segment_override_with_default_sentinels(#[case] email: &str, #[case] expected: Value) {
        let feature = feature_snapshot(
            ValueType::Boolean,
            serde_json::json!(true),
            serde_json::json!(false),
            true,
            100,
            beta_users_segment(),
            vec![segment_rule(
                &["beta-users"],
                serde_json::json!("$default"),
                1,
                Some(serde_json::json!("$default")),
            )],
        );
        assert_eq!(feature.get_current_value("u", &email_attributes(email)), expected);
    }

    // A matched rule serves its own value; a matched rule whose rollout
    // excludes the entity serves the disabled value.
    #[rstest]
    #[case("a2", Value::Int64(-48))]
    #[case("a1", Value::Int64(2))]
    fn test_segment_override_with_partial_rollout(#[case] entity_id: &str, #[case] expected: Value) {
        let mut attributes = email_attributes("x@ibm.com");
        attributes.insert("ignored".to_string(), Value::from("x"));
        let feature = feature_snapshot(
            ValueType::Numeric,
            serde_json::json!(-42),
            serde_json::json!(2),
            true,
            100,
            beta_users_segment(),
            vec![segment_rule(
                &["beta-users"],
                serde_json::json!(-48),
                1,
                Some(serde_json::json!(50)),
            )],
        );
        assert_eq!(feature.get_current_value(entity_id, &attributes), expected);
    }

    // Without attributes no segment matching is attempted, even when
    // segment rules exist.
    #[test]
    fn test_no_attributes_skips_segment_rules() {
        let feature = feature_snapshot(
            ValueType::Numeric,
            serde_json::json!(-42),
            serde_json::json!(2),
            true,
            100,
            beta_users_segment(),
            vec![segment_rule(&["beta-users"], serde_json::json!(-48), 1, None)],
        );
        assert_eq!(
            feature.get_current_value("u", &HashMap::new()),
            Value::Int64(-42)
        );
    }

    #[test]
    fn test_empty_entity_id_yields_null() {
        let feature = feature_snapshot(
            ValueType::Boolean,
            serde_json::json!(true),
            serde_json::json!(false),
            true,
            100,
            HashMap::new(),
            Vec::new(),
        );
        assert_eq!(feature.get_current_value("", &HashMap::new()), Value::Null);
    }

    // A value that does not match the declared data type is reported as
    // null instead of being coerced.
    #[test]
    fn test_mismatched_value_shape_yields_null() {
        let feature = feature_snapshot(
            ValueType::Numeric,
            serde_json::json!("not a number"),
            serde_json::json!(2),
            true,
            100,
            HashMap::new(),
            Vec::new(),
        );
        assert_eq!(feature.get_current_value("user1", &HashMap::new()), Value::Null);
        assert_eq!(feature.get_enabled_value(), Value::Null);
    }

    #[test]
    fn test_yaml_value_is_parsed_on_access() {
        let feature = {
            let feature = Feature {
                name: "F1".to_string(),
                feature_id: "f1".to_string(),
                r#type: ValueType::String,
                format: Some("YAML".to_string()),
                enabled_value: ConfigValue(serde_json::json!("mode: canary")),
                disabled_value: ConfigValue(serde_json::json!("mode: off")),
                segment_rules: Vec::new(),
                enabled: true,
                rollout_percentage: 100,
            };
            let targeting_rules =
                TargetingRules::new(HashMap::new(), Vec::new(), feature.r#type, feature.format.clone());
            FeatureSnapshot::new(feature, targeting_rules, None)
        };

        let Value::Yaml(yaml) = feature.get_current_value("user1", &HashMap::new()) else {
            panic!("expected a YAML value");
        };
        assert_eq!(yaml["mode"], serde_yaml::Value::from("canary"));
    }
}
