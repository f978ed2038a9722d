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

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct Property {
    pub name: String,
    pub property_id: String,
    pub r#type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub value: ConfigValue,
    pub segment_rules: Vec<SegmentRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}
