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
use std::sync::{Arc, Mutex};

use crate::models::Configuration;
use crate::secrets::SecretsManager;
use crate::{Error, Result};

/// The in-memory configuration cache.
///
/// The snapshot is either entirely absent (before the first successful
/// seed or fetch) or fully populated. Installing a new snapshot replaces
/// the previous one wholesale under the mutex, so concurrent readers see
/// either the old or the new maps, never a mixture.
///
/// Secret-manager handles are the only per-property state attached after a
/// snapshot install; they survive snapshot replacement.
#[derive(Debug, Default)]
pub(crate) struct ConfigurationCache {
    snapshot: Mutex<Option<Arc<Configuration>>>,
    secret_managers: Mutex<HashMap<String, Arc<dyn SecretsManager>>>,
}

impl ConfigurationCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Atomically replaces the current snapshot.
    pub(crate) fn install(&self, configuration: Configuration) -> Result<()> {
        *self.snapshot.lock()? = Some(Arc::new(configuration));
        Ok(())
    }

    /// The current snapshot, if any was installed yet.
    pub(crate) fn snapshot(&self) -> Result<Option<Arc<Configuration>>> {
        Ok(self.snapshot.lock()?.clone())
    }

    pub(crate) fn has_data(&self) -> bool {
        self.snapshot
            .lock()
            .map(|snapshot| snapshot.is_some())
            .unwrap_or(false)
    }

    pub(crate) fn attach_secret_manager(
        &self,
        property_id: &str,
        secrets_manager: Arc<dyn SecretsManager>,
    ) -> Result<()> {
        self.secret_managers
            .lock()?
            .insert(property_id.to_string(), secrets_manager);
        Ok(())
    }

    pub(crate) fn secret_manager(&self, property_id: &str) -> Result<Arc<dyn SecretsManager>> {
        self.secret_managers
            .lock()?
            .get(property_id)
            .cloned()
            .ok_or_else(|| Error::Other(format!(
                "No secrets manager attached for property '{property_id}'"
            )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::serialization::fixtures::api_payload;
    use crate::network::serialization::ConfigurationJson;

    fn configuration() -> Configuration {
        let configurations = ConfigurationJson::from_str(&api_payload().to_string(), "test")
            .unwrap()
            .extract_configurations()
            .unwrap();
        Configuration::new(configurations).unwrap()
    }

    #[test]
    fn test_cache_starts_empty() {
        let cache = ConfigurationCache::new();
        assert!(!cache.has_data());
        assert!(cache.snapshot().unwrap().is_none());
    }

    #[test]
    fn test_install_replaces_the_whole_snapshot() {
        let cache = ConfigurationCache::new();
        cache.install(configuration()).unwrap();
        assert!(cache.has_data());
        assert_eq!(cache.snapshot().unwrap().unwrap().features.len(), 1);

        cache.install(Configuration::default()).unwrap();
        let snapshot = cache.snapshot().unwrap().unwrap();
        assert!(snapshot.features.is_empty());
        assert!(snapshot.properties.is_empty());
        assert!(snapshot.segments.is_empty());
    }

    // A reader holding the previous snapshot keeps consistent data while
    // an installer replaces it; a fresh read observes the new snapshot.
    #[test]
    fn test_concurrent_readers_observe_whole_snapshots() {
        let cache = Arc::new(ConfigurationCache::new());
        cache.install(configuration()).unwrap();

        let previous = cache.snapshot().unwrap().unwrap();

        let writer = {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    cache.install(Configuration::default()).unwrap();
                }
            })
        };

        for _ in 0..100 {
            let snapshot = cache.snapshot().unwrap().unwrap();
            let features = snapshot.features.len();
            let properties = snapshot.properties.len();
            // every observed snapshot is one of the two installed states
            assert!(
                (features == 1 && properties == 1) || (features == 0 && properties == 0),
                "torn snapshot observed: {features} features, {properties} properties"
            );
        }
        writer.join().unwrap();

        // the handle taken before the install still sees the old data
        assert_eq!(previous.features.len(), 1);
    }
}
