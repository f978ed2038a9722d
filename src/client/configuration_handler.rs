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
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cache::ConfigurationCache;
use crate::metering::{MeteringRecorder, MeteringThreadHandle};
use crate::models::{Configuration, FeatureSnapshot, PropertySnapshot};
use crate::network::live_update::WebsocketWorker;
use crate::network::serialization::{BootstrapJson, ConfigurationJson, ValueType};
use crate::network::ServerClient;
use crate::persistence;
use crate::secrets::{SecretProperty, SecretsManager};
use crate::utils::ThreadHandle;
use crate::{Error, Result};

use super::ConfigurationId;

/// Callback invoked after every successful snapshot install triggered by a
/// fetch.
pub type ConfigurationUpdateListener = Box<dyn Fn() + Send + Sync>;

pub(crate) const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(120);

/// Owns the configuration cache and drives the live-update loop:
/// seed (persistent cache / bootstrap file), fetch with scheduled retry,
/// and the websocket subscription that triggers refetches.
pub(crate) struct ConfigurationHandler {
    configuration_id: ConfigurationId,
    server_client: Arc<dyn ServerClient>,
    cache: Arc<ConfigurationCache>,

    persistent_cache_directory: Option<PathBuf>,
    bootstrap_file: Option<PathBuf>,
    live_config_update_enabled: bool,

    listener: Mutex<Option<ConfigurationUpdateListener>>,
    retry_interval: Mutex<Duration>,
    pending_retry: Mutex<Option<ThreadHandle<()>>>,
    websocket_connected: Arc<AtomicBool>,
    websocket_thread: Mutex<Option<ThreadHandle<()>>>,
    metering: Option<(MeteringThreadHandle, MeteringRecorder)>,
}

impl ConfigurationHandler {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        configuration_id: ConfigurationId,
        server_client: Arc<dyn ServerClient>,
        cache: Arc<ConfigurationCache>,
        persistent_cache_directory: Option<PathBuf>,
        bootstrap_file: Option<PathBuf>,
        live_config_update_enabled: bool,
        metering: Option<(MeteringThreadHandle, MeteringRecorder)>,
    ) -> Self {
        Self {
            configuration_id,
            server_client,
            cache,
            persistent_cache_directory,
            bootstrap_file,
            live_config_update_enabled,
            listener: Mutex::new(None),
            retry_interval: Mutex::new(DEFAULT_RETRY_INTERVAL),
            pending_retry: Mutex::new(None),
            websocket_connected: Arc::new(AtomicBool::new(false)),
            websocket_thread: Mutex::new(None),
            metering,
        }
    }

    /// The seed phase, followed by fetch + subscribe when live updates are
    /// enabled:
    /// 1. a non-empty persistent cache file is installed into the cache,
    /// 2. otherwise the bootstrap file is installed (and mirrored to the
    ///    persistent directory),
    /// 3. with live updates enabled, one fetch plus the websocket
    ///    subscription.
    pub(crate) fn load_data(self: &Arc<Self>) {
        let mut seeded_from_persistent_cache = false;
        if let Some(directory) = &self.persistent_cache_directory {
            let content = persistence::read_configuration_file(directory);
            if content != persistence::EMPTY_CACHE {
                match ConfigurationJson::from_str(&content, persistence::CONFIGURATION_FILE)
                    .and_then(|json| json.extract_configurations())
                    .and_then(Configuration::new)
                {
                    Ok(configuration) => {
                        // Updating the cache is enough here; the listener
                        // only announces fetched updates.
                        if self.cache.install(configuration).is_ok() {
                            seeded_from_persistent_cache = true;
                        }
                    }
                    Err(e) => {
                        log::error!("Cannot seed the cache from the persistent file: {e}")
                    }
                }
            }
        }

        if let Some(bootstrap_file) = self.bootstrap_file.clone() {
            log::info!(
                "Bootstrap file provided, file path is: {}",
                bootstrap_file.display()
            );
            // A persistent cache that seeded above takes precedence; the
            // bootstrap file is only consulted when it did not.
            if !seeded_from_persistent_cache {
                self.seed_from_bootstrap(&bootstrap_file);
            }
        }

        if self.live_config_update_enabled {
            self.fetch_from_api();
            self.start_websocket();
        }
    }

    /// A single forced fetch, without re-running the seed phase. Works in
    /// every mode, including bootstrap-only setups.
    pub(crate) fn fetch(self: &Arc<Self>) {
        self.fetch_from_api();
    }

    fn seed_from_bootstrap(self: &Arc<Self>, bootstrap_file: &std::path::Path) {
        let content = match std::fs::read_to_string(bootstrap_file) {
            Ok(content) => content,
            Err(e) => {
                log::error!(
                    "Cannot read bootstrap file '{}': {e}",
                    bootstrap_file.display()
                );
                return;
            }
        };

        let result = BootstrapJson::from_str(&content, &bootstrap_file.display().to_string())
            .and_then(|json| {
                json.extract_configurations(
                    &self.configuration_id.collection_id,
                    &self.configuration_id.environment_id,
                )
            });
        let configurations = match result {
            Ok(configurations) => configurations,
            Err(e) => {
                log::error!("Error occurred while reading bootstrap configurations - {e}");
                return;
            }
        };

        match Configuration::new(configurations.clone()) {
            Ok(configuration) => {
                if let Some(directory) = self.persistent_cache_directory.clone() {
                    let api_config =
                        configurations.into_api_config(&self.configuration_id.environment_id);
                    std::thread::spawn(move || {
                        persistence::store_configuration_file(&directory, &api_config)
                    });
                }
                // Seed installs are not fetch-triggered, so the listener
                // is not invoked for them.
                if let Err(e) = self.cache.install(configuration) {
                    log::error!("Cannot install the bootstrap configuration: {e}");
                }
            }
            Err(e) => log::error!("Error occurred while reading bootstrap configurations - {e}"),
        }
    }

    /// One fetch against the server. A success installs and announces a
    /// new snapshot (and mirrors the raw body to the persistent
    /// directory); transient failures schedule a retry; everything else
    /// is logged and dropped.
    pub(crate) fn fetch_from_api(self: &Arc<Self>) {
        log::debug!("Fetching configuration data");
        match self.server_client.get_configuration() {
            Ok(config_json) => {
                log::debug!("Fetch configuration API successful");
                self.cancel_pending_retry();

                if let Some(directory) = self.persistent_cache_directory.clone() {
                    let raw_body = config_json.clone();
                    std::thread::spawn(move || {
                        persistence::store_configuration_file(&directory, &raw_body)
                    });
                }

                match config_json
                    .extract_configurations()
                    .and_then(Configuration::new)
                {
                    Ok(configuration) => {
                        if self.cache.install(configuration).is_ok() {
                            self.notify_listener();
                        }
                    }
                    Err(e) => {
                        log::error!("Error occurred while reading fetched configurations - {e}")
                    }
                }
            }
            Err(e) if e.is_transient() => {
                log::error!("Configuration fetch failed: {e}");
                self.schedule_retry();
            }
            Err(e) => log::error!("Configuration fetch failed, not retrying: {e}"),
        }
    }

    /// Schedules a single retry fetch. Any previously scheduled retry is
    /// cancelled first; a successful fetch cancels the pending retry.
    fn schedule_retry(self: &Arc<Self>) {
        let interval = self
            .retry_interval
            .lock()
            .map(|i| *i)
            .unwrap_or(DEFAULT_RETRY_INTERVAL);
        let handler = Arc::downgrade(self);
        let handle = ThreadHandle::new(move |terminator| {
            match terminator.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(handler) = handler.upgrade() {
                        log::info!("Retrying scheduled configuration fetch");
                        handler.fetch_from_api();
                    }
                }
                // Cancelled.
                _ => {}
            }
        });

        if let Ok(mut pending_retry) = self.pending_retry.lock() {
            *pending_retry = Some(handle);
            log::info!("Configuration fetch retry scheduled in {interval:?}");
        }
    }

    fn cancel_pending_retry(&self) {
        if let Ok(mut pending_retry) = self.pending_retry.lock() {
            pending_retry.take();
        }
    }

    fn start_websocket(self: &Arc<Self>) {
        let Ok(mut websocket_thread) = self.websocket_thread.lock() else {
            return;
        };
        if websocket_thread.is_some() {
            // already subscribed; the reader reconnects on its own
            return;
        }

        log::debug!("Starting websocket subscription");
        let handler = Arc::downgrade(self);
        let worker = WebsocketWorker::new(
            self.server_client.clone(),
            self.websocket_connected.clone(),
            Box::new(move || {
                if let Some(handler) = handler.upgrade() {
                    handler.fetch_from_api();
                }
            }),
        );
        *websocket_thread = Some(ThreadHandle::new(move |terminator| worker.run(terminator)));
    }

    pub(crate) fn register_listener(&self, listener: ConfigurationUpdateListener) -> Result<()> {
        *self.listener.lock()? = Some(listener);
        Ok(())
    }

    fn notify_listener(&self) {
        let Ok(listener) = self.listener.lock() else {
            return;
        };
        if let Some(listener) = listener.as_ref() {
            // user code must not tear down the update loop
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(listener)).is_err() {
                log::error!("Configuration update listener panicked");
            }
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.websocket_connected.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn set_retry_interval(&self, interval: Duration) {
        if let Ok(mut retry_interval) = self.retry_interval.lock() {
            *retry_interval = interval;
        }
    }

    fn metering_recorder(&self) -> Option<MeteringRecorder> {
        self.metering.as_ref().map(|(_, recorder)| recorder.clone())
    }

    pub(crate) fn get_feature(&self, feature_id: &str) -> Result<FeatureSnapshot> {
        let snapshot = self.cache.snapshot()?.ok_or(Error::ClientNotConfigured)?;
        snapshot.get_feature(feature_id, self.metering_recorder())
    }

    pub(crate) fn get_features(&self) -> Result<HashMap<String, FeatureSnapshot>> {
        let snapshot = self.cache.snapshot()?.ok_or(Error::ClientNotConfigured)?;
        Ok(snapshot.get_features(self.metering_recorder().as_ref()))
    }

    pub(crate) fn get_property(&self, property_id: &str) -> Result<PropertySnapshot> {
        let snapshot = self.cache.snapshot()?.ok_or(Error::ClientNotConfigured)?;
        snapshot.get_property(property_id, self.metering_recorder())
    }

    pub(crate) fn get_properties(&self) -> Result<HashMap<String, PropertySnapshot>> {
        let snapshot = self.cache.snapshot()?.ok_or(Error::ClientNotConfigured)?;
        Ok(snapshot.get_properties(self.metering_recorder().as_ref()))
    }

    pub(crate) fn get_secret(
        &self,
        property_id: &str,
        secrets_manager: Arc<dyn SecretsManager>,
    ) -> Result<SecretProperty> {
        let property = self.get_property(property_id)?;
        if property.data_type() != ValueType::SecretRef {
            log::error!(
                "Invalid operation: GetSecret() cannot be called on a '{}' property",
                property.data_type()
            );
            return Err(Error::NotASecretReference {
                data_type: property.data_type().to_string(),
            });
        }
        self.cache
            .attach_secret_manager(property_id, secrets_manager)?;
        Ok(SecretProperty::new(
            property_id.to_string(),
            self.cache.clone(),
        ))
    }
}
