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

use serde::{Deserialize, Serialize};

use super::Rule;

/// A named predicate over entity attributes. An entity belongs to the
/// segment iff every rule matches.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct Segment {
    pub name: String,
    pub segment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    pub rules: Vec<Rule>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::HashMap;

    use super::*;
    use rstest::*;

    pub(crate) fn segment(segment_id: &str, attribute_name: &str, operator: &str, values: &[&str]) -> Segment {
        Segment {
            name: segment_id.to_string(),
            segment_id: segment_id.to_string(),
            description: None,
            tags: None,
            rules: vec![Rule {
                attribute_name: attribute_name.to_string(),
                operator: operator.to_string(),
                values: values.iter().map(|v| v.to_string()).collect(),
            }],
        }
    }

    #[fixture]
    pub(crate) fn some_segments() -> HashMap<String, Segment> {
        HashMap::from([
            (
                "some_segment_id_1".into(),
                segment("some_segment_id_1", "name", "is", &["heinz"]),
            ),
            (
                "some_segment_id_2".into(),
                segment("some_segment_id_2", "name", "is", &["peter"]),
            ),
        ])
    }
}
