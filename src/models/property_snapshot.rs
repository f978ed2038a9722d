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

use crate::metering::{MeteringRecorder, SubjectId};
use crate::network::serialization::{type_casted_value, ConfigValue, Property, ValueType};
use crate::segment_evaluation::TargetingRules;
use crate::{Result, Value};

/// A property taken from one configuration snapshot.
///
/// Unlike a feature flag a property has no on/off state and no rollout
/// gating: it evaluates to its value, or to a segment rule's override.
#[derive(Debug)]
pub struct PropertySnapshot {
    name: String,
    property_id: String,
    kind: ValueType,
    format: Option<String>,
    value: ConfigValue,
    segment_rules: TargetingRules,
    metering: Option<MeteringRecorder>,
}

impl PropertySnapshot {
    pub(crate) fn new(
        property: Property,
        segment_rules: TargetingRules,
        metering: Option<MeteringRecorder>,
    ) -> Self {
        Self {
            name: property.name,
            property_id: property.property_id,
            kind: property.r#type,
            format: property.format,
            value: property.value,
            segment_rules,
            metering,
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_property_id(&self) -> &str {
        &self.property_id
    }

    pub(crate) fn data_type(&self) -> ValueType {
        self.kind
    }

    /// The property value in its configured shape, [`Value::Null`] if the
    /// stored value does not match the declared type.
    pub fn get_value(&self) -> Value {
        self.cast(&self.value).unwrap_or_else(|_| Value::Null)
    }

    /// Evaluates the property for an entity: the default value, or the
    /// override of the first segment rule (in ascending order) targeting a
    /// segment the entity belongs to.
    ///
    /// Returns [`Value::Null`] when the entity id is empty, the property
    /// data is malformed, or the configured value cannot be produced in
    /// the declared shape.
    pub fn get_current_value(
        &self,
        entity_id: &str,
        entity_attributes: &HashMap<String, Value>,
    ) -> Value {
        if entity_id.is_empty() {
            log::error!("Property evaluation: entity id is empty");
            return Value::Null;
        }
        if !self.is_valid() {
            log::error!("Property '{}' has malformed data", self.property_id);
            return Value::Null;
        }

        let (value, segment_id) = match self.evaluate(entity_attributes) {
            Ok((value, segment_id)) => (value, segment_id),
            Err(e) => {
                log::error!("Failed to evaluate property '{}': {e}", self.property_id);
                (Value::Null, None)
            }
        };
        self.record_evaluation(entity_id, segment_id.as_deref());
        value
    }

    fn is_valid(&self) -> bool {
        !(self.name.is_empty() || self.property_id.is_empty() || self.value.is_null())
    }

    fn evaluate(
        &self,
        entity_attributes: &HashMap<String, Value>,
    ) -> Result<(Value, Option<String>)> {
        if !self.segment_rules.is_empty() && !entity_attributes.is_empty() {
            if let Some((segment_rule, segment_id)) =
                self.segment_rules.find_applicable_rule(entity_attributes)
            {
                let segment_id = segment_id.to_string();
                let value = segment_rule.value(&self.value)?;
                return Ok((value, Some(segment_id)));
            }
        }
        Ok((self.cast(&self.value)?, None))
    }

    fn cast(&self, value: &ConfigValue) -> Result<Value> {
        type_casted_value(self.kind, self.format.as_deref(), value)
    }

    fn record_evaluation(&self, entity_id: &str, segment_id: Option<&str>) {
        if let Some(metering) = &self.metering {
            metering.record_evaluation(
                SubjectId::Property(self.property_id.clone()),
                entity_id,
                segment_id,
            );
        }
    }
}
