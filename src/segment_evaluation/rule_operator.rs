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

use super::errors::CheckOperatorErrorDetail;
use crate::Value;

pub(crate) trait RuleOperator {
    fn operate(
        &self,
        operator: &str,
        value: &str,
    ) -> std::result::Result<bool, CheckOperatorErrorDetail> {
        match operator {
            "is" => self.is(value),
            "contains" => self.contains(value),
            "startsWith" => self.starts_with(value),
            "endsWith" => self.ends_with(value),
            "greaterThan" => self.greater_than(value),
            "greaterThanEquals" => self.greater_than_equals(value),
            "lesserThan" => self.lesser_than(value),
            "lesserThanEquals" => self.lesser_than_equals(value),
            // Counterpart operators
            "isNot" => self.is(value).map(std::ops::Not::not),
            "notContains" => self.contains(value).map(std::ops::Not::not),
            "notStartsWith" => self.starts_with(value).map(std::ops::Not::not),
            "notEndsWith" => self.ends_with(value).map(std::ops::Not::not),
            _ => Err(CheckOperatorErrorDetail::OperatorNotImplemented),
        }
    }

    fn is(&self, value: &str) -> std::result::Result<bool, CheckOperatorErrorDetail>;
    fn contains(&self, value: &str) -> std::result::Result<bool, CheckOperatorErrorDetail>;
    fn starts_with(&self, value: &str) -> std::result::Result<bool, CheckOperatorErrorDetail>;
    fn ends_with(&self, value: &str) -> std::result::Result<bool, CheckOperatorErrorDetail>;
    fn greater_than(&self, value: &str) -> std::result::Result<bool, CheckOperatorErrorDetail>;
    fn greater_than_equals(&self, value: &str)
        -> std::result::Result<bool, CheckOperatorErrorDetail>;
    fn lesser_than(&self, value: &str) -> std::result::Result<bool, CheckOperatorErrorDetail>;
    fn lesser_than_equals(&self, value: &str)
        -> std::result::Result<bool, CheckOperatorErrorDetail>;
}

/// The numeric reading of an attribute value for the comparison operators.
/// String attributes are parsed, matching how the server-side rules are
/// authored.
fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float64(data) => Some(*data),
        Value::Int64(data) => Some(*data as f64),
        Value::UInt64(data) => Some(*data as f64),
        Value::String(data) => data.parse().ok(),
        _ => None,
    }
}

/// Numeric comparison with both sides parsed as floats. If either side
/// fails to parse the check is false.
fn compare_floats(
    attribute_value: &Value,
    reference_value: &str,
    cmp: fn(&f64, &f64) -> bool,
) -> std::result::Result<bool, CheckOperatorErrorDetail> {
    match (as_float(attribute_value), reference_value.parse::<f64>()) {
        (Some(attribute), Ok(reference)) => Ok(cmp(&attribute, &reference)),
        _ => Ok(false),
    }
}

impl RuleOperator for Value {
    fn is(&self, value: &str) -> std::result::Result<bool, CheckOperatorErrorDetail> {
        match self {
            Value::String(data) => Ok(*data == value),
            Value::Boolean(data) => {
                let data = if *data { "true" } else { "false" };
                Ok(data == value)
            }
            Value::Float64(_) | Value::Int64(_) | Value::UInt64(_) => {
                compare_floats(self, value, f64::eq)
            }
            _ => Ok(false),
        }
    }

    fn contains(&self, value: &str) -> std::result::Result<bool, CheckOperatorErrorDetail> {
        match self {
            Value::String(data) => Ok(data.contains(value)),
            _ => Err(CheckOperatorErrorDetail::StringExpected),
        }
    }

    fn starts_with(&self, value: &str) -> std::result::Result<bool, CheckOperatorErrorDetail> {
        match self {
            Value::String(data) => Ok(data.starts_with(value)),
            _ => Err(CheckOperatorErrorDetail::StringExpected),
        }
    }

    fn ends_with(&self, value: &str) -> std::result::Result<bool, CheckOperatorErrorDetail> {
        match self {
            Value::String(data) => Ok(data.ends_with(value)),
            _ => Err(CheckOperatorErrorDetail::StringExpected),
        }
    }

    fn greater_than(&self, value: &str) -> std::result::Result<bool, CheckOperatorErrorDetail> {
        compare_floats(self, value, f64::gt)
    }

    fn greater_than_equals(
        &self,
        value: &str,
    ) -> std::result::Result<bool, CheckOperatorErrorDetail> {
        compare_floats(self, value, f64::ge)
    }

    fn lesser_than(&self, value: &str) -> std::result::Result<bool, CheckOperatorErrorDetail> {
        compare_floats(self, value, f64::lt)
    }

    fn lesser_than_equals(
        &self,
        value: &str,
    ) -> std::result::Result<bool, CheckOperatorErrorDetail> {
        compare_floats(self, value, f64::le)
    }
}
