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

pub(crate) mod errors;
mod matches_attributes;
mod rule_operator;

use std::collections::HashMap;

use crate::network::serialization::{
    type_casted_value, ConfigValue, Segment, SegmentRule, ValueType,
};
use crate::{Error, Result, Value};
use matches_attributes::MatchesAttributes;

/// The segment rules of one feature or property, bundled with the segments
/// they reference. Rules are kept sorted by ascending `order`; the first
/// matching rule wins.
#[derive(Debug, Clone)]
pub(crate) struct TargetingRules {
    segments: HashMap<String, Segment>,
    segment_rules: Vec<SegmentRule>,
    kind: ValueType,
    format: Option<String>,
}

impl TargetingRules {
    pub(crate) fn new(
        segments: HashMap<String, Segment>,
        mut segment_rules: Vec<SegmentRule>,
        kind: ValueType,
        format: Option<String>,
    ) -> Self {
        segment_rules.sort_by(|a, b| a.order.cmp(&b.order));
        Self {
            segments,
            segment_rules,
            kind,
            format,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.segment_rules.is_empty()
    }

    /// Finds the first segment rule (in `order`) targeting a segment the
    /// entity belongs to. Returns the rule and the id of the matched
    /// segment. A targeted segment id that is not present in the snapshot
    /// is treated as a non-match.
    pub(crate) fn find_applicable_rule(
        &self,
        attributes: &HashMap<String, Value>,
    ) -> Option<(AppliedSegmentRule<'_>, &str)> {
        for segment_rule in &self.segment_rules {
            for targeted in &segment_rule.rules {
                for segment_id in &targeted.segments {
                    let Some(segment) = self.segments.get(segment_id) else {
                        continue;
                    };
                    if segment.matches_attributes(attributes) {
                        return Some((
                            AppliedSegmentRule {
                                segment_rule,
                                kind: self.kind,
                                format: self.format.as_deref(),
                            },
                            segment_id,
                        ));
                    }
                }
            }
        }
        None
    }
}

/// A matched segment rule, able to resolve its `"$default"` sentinels
/// against the owner's value and rollout percentage.
#[derive(Debug)]
pub(crate) struct AppliedSegmentRule<'a> {
    segment_rule: &'a SegmentRule,
    kind: ValueType,
    format: Option<&'a str>,
}

impl AppliedSegmentRule<'_> {
    /// The rollout percentage of this rule:
    /// * absent resolves to 100,
    /// * `"$default"` resolves to the given `default` (the owner's
    ///   top-level rollout percentage),
    /// * otherwise the rule's own value, which must be an integer in [0, 100].
    pub(crate) fn rollout_percentage(&self, default: u32) -> Result<u32> {
        match &self.segment_rule.rollout_percentage {
            None => Ok(100),
            Some(v) if v.is_default() => Ok(default),
            Some(v) => v
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v <= 100)
                .ok_or_else(|| {
                    Error::Other(format!(
                        "Invalid rollout percentage '{v}' in segment rule '{}'",
                        self.segment_rule.order
                    ))
                }),
        }
    }

    /// The value of this rule, cast to the owner's data type. `"$default"`
    /// resolves to the given `default` (the owner's own value).
    pub(crate) fn value(&self, default: &ConfigValue) -> Result<Value> {
        if self.segment_rule.value.is_default() {
            type_casted_value(self.kind, self.format, default)
        } else {
            type_casted_value(self.kind, self.format, &self.segment_rule.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::serialization::fixtures::{segment_rule, some_segments};
    use rstest::*;

    fn attributes(name: &str) -> HashMap<String, Value> {
        HashMap::from([("name".to_string(), Value::from(name))])
    }

    #[rstest]
    fn test_matching_rule_and_segment_reported_back(some_segments: HashMap<String, Segment>) {
        let rules = TargetingRules::new(
            some_segments,
            vec![segment_rule(
                &["some_segment_id_1", "some_segment_id_2"],
                serde_json::json!(-48),
                0,
                Some(serde_json::json!(100)),
            )],
            ValueType::Numeric,
            None,
        );

        let (rule, segment_id) = rules.find_applicable_rule(&attributes("peter")).unwrap();
        assert_eq!(segment_id, "some_segment_id_2");
        assert_eq!(rule.rollout_percentage(100).unwrap(), 100);
        let value = rule.value(&ConfigValue(serde_json::json!(1))).unwrap();
        assert_eq!(value, Value::Int64(-48));
    }

    #[rstest]
    fn test_no_matching_segment(some_segments: HashMap<String, Segment>) {
        let rules = TargetingRules::new(
            some_segments,
            vec![segment_rule(
                &["some_segment_id_1"],
                serde_json::json!(-48),
                0,
                None,
            )],
            ValueType::Numeric,
            None,
        );

        assert!(rules.find_applicable_rule(&attributes("jane")).is_none());
    }

    #[rstest]
    fn test_unknown_segment_id_is_a_non_match(some_segments: HashMap<String, Segment>) {
        let rules = TargetingRules::new(
            some_segments,
            vec![segment_rule(
                &["non_existing_segment_id"],
                serde_json::json!(-48),
                0,
                None,
            )],
            ValueType::Numeric,
            None,
        );

        assert!(rules.find_applicable_rule(&attributes("heinz")).is_none());
    }

    #[rstest]
    fn test_rules_are_evaluated_in_ascending_order(some_segments: HashMap<String, Segment>) {
        // both rules target segments matching "heinz"; the one with the
        // lower order wins although it is listed last
        let rules = TargetingRules::new(
            some_segments,
            vec![
                segment_rule(&["some_segment_id_1"], serde_json::json!(2), 2, None),
                segment_rule(&["some_segment_id_1"], serde_json::json!(1), 1, None),
            ],
            ValueType::Numeric,
            None,
        );

        let (rule, _) = rules.find_applicable_rule(&attributes("heinz")).unwrap();
        let value = rule.value(&ConfigValue(serde_json::json!(0))).unwrap();
        assert_eq!(value, Value::Int64(1));
    }

    #[rstest]
    fn test_rollout_percentage_sentinels(some_segments: HashMap<String, Segment>) {
        let cases = [
            (None, 100),
            (Some(serde_json::json!("$default")), 70),
            (Some(serde_json::json!(25)), 25),
        ];
        for (raw, expected) in cases {
            let rules = TargetingRules::new(
                some_segments.clone(),
                vec![segment_rule(
                    &["some_segment_id_1"],
                    serde_json::json!(-48),
                    0,
                    raw,
                )],
                ValueType::Numeric,
                None,
            );
            let (rule, _) = rules.find_applicable_rule(&attributes("heinz")).unwrap();
            assert_eq!(rule.rollout_percentage(70).unwrap(), expected);
        }
    }

    #[rstest]
    fn test_invalid_rollout_percentage_is_an_error(some_segments: HashMap<String, Segment>) {
        let rules = TargetingRules::new(
            some_segments,
            vec![segment_rule(
                &["some_segment_id_1"],
                serde_json::json!(-48),
                0,
                Some(serde_json::json!(101)),
            )],
            ValueType::Numeric,
            None,
        );
        let (rule, _) = rules.find_applicable_rule(&attributes("heinz")).unwrap();
        assert!(rule.rollout_percentage(100).is_err());
    }

    #[rstest]
    fn test_default_value_resolves_to_owner_value(some_segments: HashMap<String, Segment>) {
        let rules = TargetingRules::new(
            some_segments,
            vec![segment_rule(
                &["some_segment_id_1"],
                serde_json::json!("$default"),
                0,
                None,
            )],
            ValueType::Numeric,
            None,
        );
        let (rule, _) = rules.find_applicable_rule(&attributes("heinz")).unwrap();
        let value = rule.value(&ConfigValue(serde_json::json!(42))).unwrap();
        assert_eq!(value, Value::Int64(42));
    }
}
