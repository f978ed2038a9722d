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

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use super::configuration::Configurations;
use super::{Feature, Property, Segment, SegmentRule};
use crate::errors::ConfigurationDataError;

/// Configuration data in the shape of a bootstrap file (a full dump across
/// environments and collections, as exported from the service dashboard).
#[derive(Debug, Deserialize)]
pub(crate) struct BootstrapJson {
    pub environments: Vec<BootstrapEnvironment>,
    pub collections: Vec<Collection>,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BootstrapEnvironment {
    #[serde(default)]
    pub name: String,
    pub environment_id: String,
    pub features: Vec<BootstrapFeature>,
    pub properties: Vec<BootstrapProperty>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Collection {
    #[serde(default)]
    pub name: String,
    pub collection_id: String,
}

/// A feature in a bootstrap dump additionally lists the collections it is
/// assigned to.
#[derive(Debug, Deserialize)]
pub(crate) struct BootstrapFeature {
    #[serde(flatten)]
    pub feature: Feature,
    #[serde(default)]
    pub collections: Vec<Collection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BootstrapProperty {
    #[serde(flatten)]
    pub property: Property,
    #[serde(default)]
    pub collections: Vec<Collection>,
}

impl BootstrapJson {
    pub(crate) fn from_str(data: &str, origin: &str) -> Result<Self, ConfigurationDataError> {
        serde_json::from_str(data).map_err(|source| ConfigurationDataError::DeserializationError {
            origin: origin.to_string(),
            source,
        })
    }

    /// Extracts the normalized configuration for one collection inside one
    /// environment:
    /// * the environment must exist,
    /// * the collection must exist in the top-level collection list,
    /// * only features/properties assigned to the collection are kept,
    /// * exactly the segments referenced by the kept segment rules are
    ///   picked; a dangling reference fails the whole extraction.
    pub(crate) fn extract_configurations(
        self,
        collection_id: &str,
        environment_id: &str,
    ) -> Result<Configurations, ConfigurationDataError> {
        let environment = self
            .environments
            .into_iter()
            .find(|e| e.environment_id == environment_id)
            .ok_or_else(|| {
                ConfigurationDataError::EnvironmentNotFound(environment_id.to_string())
            })?;

        if !self
            .collections
            .iter()
            .any(|c| c.collection_id == collection_id)
        {
            return Err(ConfigurationDataError::CollectionNotFound(
                collection_id.to_string(),
            ));
        }

        let in_collection =
            |collections: &[Collection]| collections.iter().any(|c| c.collection_id == collection_id);

        let features: Vec<Feature> = environment
            .features
            .into_iter()
            .filter(|f| in_collection(&f.collections))
            .map(|f| f.feature)
            .collect();

        let properties: Vec<Property> = environment
            .properties
            .into_iter()
            .filter(|p| in_collection(&p.collections))
            .map(|p| p.property)
            .collect();

        let all_segments: HashMap<&str, &Segment> = self
            .segments
            .iter()
            .map(|s| (s.segment_id.as_str(), s))
            .collect();

        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        let referencing = features
            .iter()
            .map(|f| (f.feature_id.as_str(), &f.segment_rules))
            .chain(
                properties
                    .iter()
                    .map(|p| (p.property_id.as_str(), &p.segment_rules)),
            );
        for (resource_id, segment_rules) in referencing {
            for segment_id in referenced_segment_ids(segment_rules) {
                if !seen.insert(segment_id.clone()) {
                    continue;
                }
                let segment = all_segments.get(segment_id.as_str()).ok_or_else(|| {
                    ConfigurationDataError::MissingSegments {
                        resource_id: resource_id.to_string(),
                        segment_id: segment_id.clone(),
                    }
                })?;
                segments.push((*segment).clone());
            }
        }

        Ok(Configurations {
            features,
            properties,
            segments,
        })
    }
}

pub(crate) fn referenced_segment_ids(segment_rules: &[SegmentRule]) -> Vec<String> {
    segment_rules
        .iter()
        .flat_map(|segment_rule| {
            segment_rule
                .rules
                .iter()
                .flat_map(|targeted| &targeted.segments)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// A bootstrap dump with two environments and two collections. In "dev":
    /// * feature "f1" and property "p1" belong to collection "ecommerce"
    ///   and reference segment "beta-users",
    /// * feature "f2" belongs to another collection and references a
    ///   segment that only exists for it.
    pub(crate) fn bootstrap_payload() -> serde_json::Value {
        serde_json::json!({
            "environments": [
                {
                    "name": "Dev",
                    "environment_id": "dev",
                    "features": [
                        {
                            "name": "F1",
                            "feature_id": "f1",
                            "type": "BOOLEAN",
                            "enabled_value": true,
                            "disabled_value": false,
                            "enabled": true,
                            "segment_rules": [
                                {
                                    "rules": [{"segments": ["beta-users"]}],
                                    "value": "$default",
                                    "order": 1
                                }
                            ],
                            "collections": [{"collection_id": "ecommerce"}]
                        },
                        {
                            "name": "F2",
                            "feature_id": "f2",
                            "type": "NUMERIC",
                            "enabled_value": 1,
                            "disabled_value": 0,
                            "enabled": true,
                            "segment_rules": [
                                {
                                    "rules": [{"segments": ["mobile-users"]}],
                                    "value": 2,
                                    "order": 1
                                }
                            ],
                            "collections": [{"collection_id": "mobile"}]
                        }
                    ],
                    "properties": [
                        {
                            "name": "P1",
                            "property_id": "p1",
                            "type": "NUMERIC",
                            "value": 1,
                            "segment_rules": [
                                {
                                    "rules": [{"segments": ["beta-users"]}],
                                    "value": 5,
                                    "order": 1
                                }
                            ],
                            "collections": [{"collection_id": "ecommerce"}]
                        }
                    ]
                },
                {
                    "name": "Prod",
                    "environment_id": "prod",
                    "features": [],
                    "properties": []
                }
            ],
            "collections": [
                {"name": "E-Commerce", "collection_id": "ecommerce"},
                {"name": "Mobile", "collection_id": "mobile"}
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
                    "name": "Mobile users",
                    "segment_id": "mobile-users",
                    "rules": [
                        {
                            "attribute_name": "platform",
                            "operator": "is",
                            "values": ["ios", "android"]
                        }
                    ]
                }
            ]
        })
    }
}
