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
use std::sync::Arc;

use crate::cache::ConfigurationCache;
use crate::{Error, Result, Value};

/// Contract for the external secrets-manager collaborator. A `SECRETREF`
/// property evaluates to a reference carrying the secret id; resolving the
/// actual secret goes through this trait.
pub trait SecretsManager: Send + Sync + std::fmt::Debug {
    /// Resolves a secret by its id and returns the secret data.
    fn get_secret(&self, secret_id: &str) -> Result<serde_json::Value>;
}

/// Handle to a `SECRETREF` property, obtained from
/// [`AppConfiguration::get_secret`](crate::AppConfiguration::get_secret).
#[derive(Debug)]
pub struct SecretProperty {
    property_id: String,
    cache: Arc<ConfigurationCache>,
}

impl SecretProperty {
    pub(crate) fn new(property_id: String, cache: Arc<ConfigurationCache>) -> Self {
        Self { property_id, cache }
    }

    pub fn get_property_id(&self) -> &str {
        &self.property_id
    }

    /// Evaluates the underlying property for the entity and resolves the
    /// referenced secret through the attached secrets manager.
    ///
    /// The evaluated property value must be an object carrying the secret
    /// reference in its `id` field.
    pub fn get_current_value(
        &self,
        entity_id: &str,
        entity_attributes: &HashMap<String, Value>,
    ) -> Result<serde_json::Value> {
        if entity_id.is_empty() {
            return Err(Error::Other(
                "SecretProperty evaluation: entity id is empty".to_string(),
            ));
        }

        let snapshot = self
            .cache
            .snapshot()?
            .ok_or(Error::ClientNotConfigured)?;
        let property = snapshot.get_property(&self.property_id, None)?;
        let value = property.get_current_value(entity_id, entity_attributes);

        let Value::Json(serde_json::Value::Object(reference)) = value else {
            return Err(Error::MissingSecretId {
                property_id: self.property_id.clone(),
            });
        };
        let secret_id = reference
            .get("id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| Error::MissingSecretId {
                property_id: self.property_id.clone(),
            })?;

        self.cache
            .secret_manager(&self.property_id)?
            .get_secret(secret_id)
    }
}
