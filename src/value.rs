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

use crate::{Error, Result};

/// An evaluated feature or property value.
///
/// Which variant is constructed is decided by the `data_type` and `format`
/// of the owning feature or property: `BOOLEAN` yields [`Value::Boolean`],
/// `NUMERIC` one of the numeric variants, `STRING`+`TEXT` a
/// [`Value::String`], `STRING`+`JSON` a [`Value::Json`] and `STRING`+`YAML`
/// a [`Value::Yaml`]. [`Value::Null`] is returned whenever evaluation could
/// not produce a value of the configured shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Float64(f64),
    Int64(i64),
    UInt64(u64),
    String(String),
    Json(serde_json::Value),
    Yaml(serde_yaml::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt64(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(data) => Ok(data),
            _ => Err(Error::MismatchType),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Float64(data) => Ok(data),
            Value::Int64(data) => Ok(data as f64),
            Value::UInt64(data) => Ok(data as f64),
            _ => Err(Error::MismatchType),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Int64(data) => Ok(data),
            Value::UInt64(data) => i64::try_from(data).map_err(|_| Error::MismatchType),
            _ => Err(Error::MismatchType),
        }
    }
}

impl TryFrom<Value> for u64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::UInt64(data) => Ok(data),
            Value::Int64(data) => u64::try_from(data).map_err(|_| Error::MismatchType),
            _ => Err(Error::MismatchType),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(data) => Ok(data),
            _ => Err(Error::MismatchType),
        }
    }
}
