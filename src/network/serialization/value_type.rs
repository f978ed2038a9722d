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

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The `type` attribute of features and properties. `SECRETREF` only occurs
/// on properties whose value references an external secret.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) enum ValueType {
    #[serde(rename = "BOOLEAN")]
    Boolean,
    #[serde(rename = "STRING")]
    String,
    #[serde(rename = "NUMERIC")]
    Numeric,
    #[serde(rename = "SECRETREF")]
    SecretRef,
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Boolean => write!(f, "BOOLEAN"),
            ValueType::String => write!(f, "STRING"),
            ValueType::Numeric => write!(f, "NUMERIC"),
            ValueType::SecretRef => write!(f, "SECRETREF"),
        }
    }
}
