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
use super::{SegmentRule, ValueType};

pub(crate) fn default_rollout_percentage() -> u32 {
    100
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct Feature {
    pub name: String,
    pub feature_id: String,
    pub r#type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub enabled_value: ConfigValue,
    pub disabled_value: ConfigValue,
    pub segment_rules: Vec<SegmentRule>,
    pub enabled: bool,
    // An absent rollout percentage means the feature rolls out to everyone.
    #[serde(default = "default_rollout_percentage")]
    pub rollout_percentage: u32,
}
