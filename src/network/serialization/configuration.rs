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

use super::{Feature, Property, Segment};
use crate::errors::ConfigurationDataError;

/// Configuration data in the shape returned by the server's `/config`
/// endpoint. The persistent cache file on disk uses the same shape, so a
/// reformatted [`Configurations`] can be written back verbatim.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct ConfigurationJson {
    pub environments: Vec<Environment>,
    pub segments: Vec<Segment>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct Environment {
    #[serde(default)]
    pub name: String,
    pub environment_id: String,
    pub features: Vec<Feature>,
    pub properties: Vec<Property>,
}

impl ConfigurationJson {
    pub(crate) fn from_str(data: &str, origin: &str) -> Result<Self, ConfigurationDataError> {
        serde_json::from_str(data).map_err(|source| ConfigurationDataError::DeserializationError {
            origin: origin.to_string(),
            source,
        })
    }

    /// Extracts the normalized configuration from an API response or a
    /// persistent cache file. The server returns exactly the environment
    /// that was requested, so the first environment is taken.
    pub(crate) fn extract_configurations(self) -> Result<Configurations, ConfigurationDataError> {
        let environment = self
            .environments
            .into_iter()
            .next()
            .ok_or(ConfigurationDataError::NoEnvironments)?;

        Ok(Configurations {
            features: environment.features,
            properties: environment.properties,
            segments: self.segments,
        })
    }
}

/// The normalized shape all three sources (API response, bootstrap file,
/// persistent cache file) are extracted into before a cache snapshot is
/// built from it.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct Configurations {
    pub features: Vec<Feature>,
    pub properties: Vec<Property>,
    pub segments: Vec<Segment>,
}

impl Configurations {
    /// Reformats the normalized data back into the API shape, synthesizing
    /// a single environment named after the target environment id. The
    /// persistent file on disk always stays API-shaped.
    pub(crate) fn into_api_config(self, environment_id: &str) -> ConfigurationJson {
        ConfigurationJson {
            environments: vec![Environment {
                name: environment_id.to_string(),
                environment_id: environment_id.to_string(),
                features: self.features,
                properties: self.properties,
            }],
            segments: self.segments,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// An API-shaped payload with one feature, one property and two
    /// segments, only one of which is referenced by segment rules.
    pub(crate) fn api_payload() -> serde_json::Value {
        serde_json::json!({
            "environments": [
                {
                    "name": "Dev",
                    "environment_id": "dev",
                    "features": [
                        {
                            "name": "Cycle rentals",
                            "feature_id": "cycle-rentals",
                            "type": "BOOLEAN",
                            "enabled_value": true,
                            "disabled_value": false,
                            "enabled": true,
                            "rollout_percentage": 100,
                            "segment_rules": [
                                {
                                    "rules": [{"segments": ["beta-users"]}],
                                    "value": "$default",
                                    "order": 1,
                                    "rollout_percentage": "$default"
                                }
                            ]
                        }
                    ],
                    "properties": [
                        {
                            "name": "Limit",
                            "property_id": "limit",
                            "type": "NUMERIC",
                            "value": 1,
                            "segment_rules": [
                                {
                                    "rules": [{"segments": ["beta-users"]}],
                                    "value": 5,
                                    "order": 1
                                }
                            ]
                        }
                    ]
                }
            ],
            "segments": [
                {
                    "name": "Beta users",
                    "segment_id": "beta-users",
                    "rules": [
                        {
                            "attribute_name": "email",
                            "operator": "contains",
                            "values": ["ibm.com"]
                        }
                    ]
                },
                {
                    "name": "Unreferenced",
                    "segment_id": "unreferenced",
                    "rules": [
                        {
                            "attribute_name": "email",
                            "operator": "endsWith",
                            "values": ["@example.com"]
                        }
                    ]
                }
            ]
        })
    }
}
