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

use super::config_value::ConfigValue;
use super::segments::Segments;

/// An ordered override attached to a feature or property: if the entity
/// belongs to one of the targeted segments, the owner evaluates to this
/// rule's value instead.
///
/// Both `value` and `rollout_percentage` may carry the `"$default"`
/// sentinel, which refers back to the owner's own value/rollout.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct SegmentRule {
    pub rules: Vec<Segments>,
    pub value: ConfigValue,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout_percentage: Option<ConfigValue>,
}
