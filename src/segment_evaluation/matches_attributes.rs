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

use crate::network::serialization::{Rule, Segment};
use crate::segment_evaluation::rule_operator::RuleOperator;
use crate::Value;

pub(crate) trait MatchesAttributes {
    fn matches_attributes(&self, attributes: &HashMap<String, Value>) -> bool;
}

impl MatchesAttributes for Segment {
    /// A [`Segment`] matches an entity iff ALL of its rules match.
    fn matches_attributes(&self, attributes: &HashMap<String, Value>) -> bool {
        self.rules
            .iter()
            .all(|rule| rule.matches_attributes(attributes))
    }
}

impl MatchesAttributes for Rule {
    /// A [`Rule`] matches an entity iff the entity carries the requested
    /// attribute, AND
    /// * for a positive operator, the attribute satisfies ANY candidate,
    /// * for a negative operator, the (already negated) check holds
    ///   against EVERY candidate.
    ///
    /// A check that cannot be evaluated (type mismatch, unknown operator)
    /// makes the whole rule evaluate to false.
    fn matches_attributes(&self, attributes: &HashMap<String, Value>) -> bool {
        let Some(attr_value) = attributes.get(&self.attribute_name) else {
            return false;
        };

        let negative = matches!(
            self.operator.as_str(),
            "isNot" | "notContains" | "notStartsWith" | "notEndsWith"
        );

        let mut any = false;
        let mut all = true;
        for candidate in &self.values {
            match attr_value.operate(&self.operator, candidate) {
                Ok(matched) => {
                    any |= matched;
                    all &= matched;
                }
                Err(e) => {
                    log::debug!(
                        "Operation '{}' '{}' '{}' failed to evaluate: {}",
                        self.attribute_name,
                        self.operator,
                        candidate,
                        e
                    );
                    return false;
                }
            }
        }
        if negative {
            all
        } else {
            any
        }
    }
}
