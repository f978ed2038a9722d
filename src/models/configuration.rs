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

use crate::errors::ConfigurationDataError;
use crate::metering::MeteringRecorder;
use crate::network::serialization::{
    referenced_segment_ids, Configurations, Feature, Property, Segment, SegmentRule,
};
use crate::segment_evaluation::TargetingRules;
use crate::{Error, Result};

use super::feature_snapshot::FeatureSnapshot;
use super::property_snapshot::PropertySnapshot;

/// One immutable configuration snapshot: everything needed to evaluate
/// features and properties. Readers only ever see a whole snapshot; a
/// refresh replaces it wholesale.
#[derive(Debug, Default, Clone)]
pub(crate) struct Configuration {
    pub(crate) features: HashMap<String, (Feature, TargetingRules)>,
    pub(crate) properties: HashMap<String, (Property, TargetingRules)>,
    pub(crate) segments: HashMap<String, Segment>,
}

impl Configuration {
    /// Builds a snapshot from normalized configuration data, indexing by id
    /// and attaching to every feature/property the segments its rules
    /// reference. A reference to a segment that is not part of the data
    /// fails the whole snapshot (the caller keeps the previous one).
    pub(crate) fn new(
        configurations: Configurations,
    ) -> std::result::Result<Self, ConfigurationDataError> {
        let segments: HashMap<String, Segment> = configurations
            .segments
            .into_iter()
            .map(|segment| (segment.segment_id.clone(), segment))
            .collect();

        let features = configurations
            .features
            .into_iter()
            .map(|feature| {
                let targeting_rules = Self::targeting_rules_for(
                    &segments,
                    &feature.segment_rules,
                    &feature.feature_id,
                    feature.r#type,
                    feature.format.clone(),
                )?;
                Ok((feature.feature_id.clone(), (feature, targeting_rules)))
            })
            .collect::<std::result::Result<_, ConfigurationDataError>>()?;

        let properties = configurations
            .properties
            .into_iter()
            .map(|property| {
                let targeting_rules = Self::targeting_rules_for(
                    &segments,
                    &property.segment_rules,
                    &property.property_id,
                    property.r#type,
                    property.format.clone(),
                )?;
                Ok((property.property_id.clone(), (property, targeting_rules)))
            })
            .collect::<std::result::Result<_, ConfigurationDataError>>()?;

        Ok(Configuration {
            features,
            properties,
            segments,
        })
    }

    fn targeting_rules_for(
        segments: &HashMap<String, Segment>,
        segment_rules: &[SegmentRule],
        resource_id: &str,
        kind: crate::network::serialization::ValueType,
        format: Option<String>,
    ) -> std::result::Result<TargetingRules, ConfigurationDataError> {
        let referenced: HashSet<String> = referenced_segment_ids(segment_rules).into_iter().collect();
        let mut subset = HashMap::with_capacity(referenced.len());
        for segment_id in referenced {
            let segment = segments.get(&segment_id).ok_or_else(|| {
                ConfigurationDataError::MissingSegments {
                    resource_id: resource_id.to_string(),
                    segment_id: segment_id.clone(),
                }
            })?;
            subset.insert(segment_id, segment.clone());
        }
        Ok(TargetingRules::new(
            subset,
            segment_rules.to_vec(),
            kind,
            format,
        ))
    }

    pub(crate) fn get_feature(
        &self,
        feature_id: &str,
        metering: Option<MeteringRecorder>,
    ) -> Result<FeatureSnapshot> {
        let (feature, targeting_rules) =
            self.features
                .get(feature_id)
                .ok_or_else(|| Error::FeatureDoesNotExist {
                    feature_id: feature_id.to_string(),
                })?;
        Ok(FeatureSnapshot::new(
            feature.clone(),
            targeting_rules.clone(),
            metering,
        ))
    }

    pub(crate) fn get_property(
        &self,
        property_id: &str,
        metering: Option<MeteringRecorder>,
    ) -> Result<PropertySnapshot> {
        let (property, targeting_rules) =
            self.properties
                .get(property_id)
                .ok_or_else(|| Error::PropertyDoesNotExist {
                    property_id: property_id.to_string(),
                })?;
        Ok(PropertySnapshot::new(
            property.clone(),
            targeting_rules.clone(),
            metering,
        ))
    }

    pub(crate) fn get_features(
        &self,
        metering: Option<&MeteringRecorder>,
    ) -> HashMap<String, FeatureSnapshot> {
        self.features
            .iter()
            .map(|(id, (feature, targeting_rules))| {
                (
                    id.clone(),
                    FeatureSnapshot::new(feature.clone(), targeting_rules.clone(), metering.cloned()),
                )
            })
            .collect()
    }

    pub(crate) fn get_properties(
        &self,
        metering: Option<&MeteringRecorder>,
    ) -> HashMap<String, PropertySnapshot> {
        self.properties
            .iter()
            .map(|(id, (property, targeting_rules))| {
                (
                    id.clone(),
                    PropertySnapshot::new(property.clone(), targeting_rules.clone(), metering.cloned()),
                )
            })
            .collect()
    }
}
