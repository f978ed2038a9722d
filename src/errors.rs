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

use std::sync::PoisonError;

use thiserror::Error;

use crate::network::errors::NetworkError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot acquire cache lock")]
    CannotAcquireLock,

    #[error("Feature '{feature_id}' does not exist")]
    FeatureDoesNotExist { feature_id: String },

    #[error("Property '{property_id}' does not exist")]
    PropertyDoesNotExist { property_id: String },

    #[error("Inner type cannot be converted to requested type")]
    MismatchType,

    #[error("Client is not configured")]
    ClientNotConfigured,

    #[error("GetSecret() cannot be called on a '{data_type}' property")]
    NotASecretReference { data_type: String },

    #[error("Missing 'id' in the evaluated value of secret property '{property_id}'")]
    MissingSecretId { property_id: String },

    #[error(transparent)]
    ConfigurationDataError(#[from] ConfigurationDataError),

    #[error(transparent)]
    NetworkError(#[from] NetworkError),

    #[error("{0}")]
    Other(String),
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_value: PoisonError<T>) -> Self {
        Error::CannotAcquireLock
    }
}

/// Failures while turning raw configuration data (API response, bootstrap
/// file or persistent cache file) into an installable snapshot. The caller
/// keeps the previous snapshot whenever one of these is returned.
#[derive(Debug, Error)]
pub enum ConfigurationDataError {
    #[error("Cannot deserialize configuration data from '{origin}': {source}")]
    DeserializationError {
        origin: String,
        source: serde_json::Error,
    },

    #[error("Configuration data contains no environments")]
    NoEnvironments,

    #[error("Environment '{0}' not found in the configuration data")]
    EnvironmentNotFound(String),

    #[error("Collection '{0}' not found in the configuration data")]
    CollectionNotFound(String),

    #[error("Segment '{segment_id}' referenced by '{resource_id}' not found")]
    MissingSegments {
        resource_id: String,
        segment_id: String,
    },
}
