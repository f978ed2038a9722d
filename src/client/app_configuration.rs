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
use std::sync::{Arc, Mutex, OnceLock};

use crate::cache::ConfigurationCache;
use crate::metering::{start_metering, MeteringClient, DEFAULT_TRANSMIT_INTERVAL};
use crate::models::{FeatureSnapshot, PropertySnapshot};
use crate::network::{IamTokenProvider, ServerClientImpl, TokenProvider, UrlBuilder};
use crate::secrets::{SecretProperty, SecretsManager};
use crate::{Error, Result};

use super::configuration_handler::ConfigurationUpdateListener;
use super::{ConfigurationHandler, ConfigurationId};

/// Options accepted by [`AppConfiguration::set_context`].
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Directory for the on-disk mirror of the last successful fetch
    /// (`appconfiguration.json`).
    pub persistent_cache_directory: Option<PathBuf>,
    /// Path to a `.json` file used to seed the cache, e.g. for air-gapped
    /// deployments.
    pub bootstrap_file: Option<PathBuf>,
    /// Deprecated alias for [`ContextOptions::bootstrap_file`].
    pub configuration_file: Option<PathBuf>,
    /// Whether to keep the cache live via fetch + websocket. When
    /// disabled, a bootstrap file is required.
    pub live_config_update_enabled: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            persistent_cache_directory: None,
            bootstrap_file: None,
            configuration_file: None,
            live_config_update_enabled: true,
        }
    }
}

#[derive(Default)]
struct FacadeState {
    region: String,
    guid: String,
    apikey: String,
    use_private_endpoint: bool,
    override_service_url: Option<String>,
    token_provider_override: Option<Arc<dyn TokenProvider>>,
    metering_client: Option<Arc<dyn MeteringClient>>,
    is_initialized: bool,
    handler: Option<Arc<ConfigurationHandler>>,
}

/// The client facade: wire it with [`init`](AppConfiguration::init) and
/// [`set_context`](AppConfiguration::set_context), then query features and
/// properties. The cache keeps itself live in the background.
///
/// One instance per process is the intended shape (see
/// [`AppConfiguration::instance`]); independent instances can still be
/// constructed for tests or special setups.
pub struct AppConfiguration {
    cache: Arc<ConfigurationCache>,
    state: Mutex<FacadeState>,
}

impl Default for AppConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfiguration {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(ConfigurationCache::new()),
            state: Mutex::new(FacadeState::default()),
        }
    }

    /// The process-wide instance.
    pub fn instance() -> &'static AppConfiguration {
        static INSTANCE: OnceLock<AppConfiguration> = OnceLock::new();
        INSTANCE.get_or_init(AppConfiguration::new)
    }

    /// Routes all traffic through the private endpoints, reachable only
    /// from within the cloud's private network. Must be called before
    /// [`init`](AppConfiguration::init).
    pub fn use_private_endpoint(&self, use_private_endpoint: bool) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.is_initialized {
            log::error!("UsePrivateEndpoint must be called before Init");
            return;
        }
        state.use_private_endpoint = use_private_endpoint;
    }

    /// Overrides the default service URL. Must be called before
    /// [`init`](AppConfiguration::init).
    ///
    /// NOTE: To be used for development purposes only.
    pub fn override_service_url(&self, url: &str) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.is_initialized {
            log::error!("OverrideServiceUrl must be called before Init");
            return;
        }
        state.override_service_url = Some(url.to_string());
    }

    /// Registers the collaborator receiving batched evaluation usages.
    /// Takes effect on the next [`set_context`](AppConfiguration::set_context).
    pub fn register_metering_client(&self, client: Arc<dyn MeteringClient>) {
        if let Ok(mut state) = self.state.lock() {
            state.metering_client = Some(client);
        }
    }

    /// Replaces the IAM token minter, so tests can run against servers
    /// that do not validate tokens. Takes effect on the next
    /// [`set_context`](AppConfiguration::set_context).
    #[cfg(feature = "test_utils")]
    pub fn override_token_provider(&self, token_provider: Arc<dyn TokenProvider>) {
        if let Ok(mut state) = self.state.lock() {
            state.token_provider_override = Some(token_provider);
        }
    }

    /// Wires credentials and endpoints. All three inputs are required;
    /// missing ones are logged and leave the instance unusable.
    pub fn init(&self, region: &str, guid: &str, apikey: &str) {
        if region.is_empty() || guid.is_empty() || apikey.is_empty() {
            if region.is_empty() {
                log::error!("Provide a valid region in the Init method");
            }
            if guid.is_empty() {
                log::error!("Provide a valid guid in the Init method");
            }
            if apikey.is_empty() {
                log::error!("Provide a valid apikey in the Init method");
            }
            return;
        }
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.region = region.to_string();
        state.guid = guid.to_string();
        state.apikey = apikey.to_string();
        state.is_initialized = true;

        if std::env::var("ENABLE_DEBUG").as_deref() == Ok("true") {
            log::set_max_level(log::LevelFilter::Debug);
        }
    }

    /// Selects the collection and environment to work with and runs the
    /// seed phase (persistent cache, bootstrap file, then fetch +
    /// subscribe unless live updates are disabled).
    ///
    /// The first call blocks until the cache is seeded; later calls seed
    /// in the background since readers already have data to work with.
    pub fn set_context(&self, collection_id: &str, environment_id: &str, options: ContextOptions) {
        log::debug!("Setting the context");
        let handler = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            if !state.is_initialized {
                log::error!("Invalid action: SetContext can only be called after a successful Init");
                return;
            }
            if collection_id.is_empty() {
                log::error!("Provide a valid collection id in the SetContext method");
                return;
            }
            if environment_id.is_empty() {
                log::error!("Provide a valid environment id in the SetContext method");
                return;
            }

            let mut options = options;
            if options.bootstrap_file.is_none() {
                if let Some(configuration_file) = options.configuration_file.take() {
                    log::info!(
                        "ContextOptions.configuration_file is deprecated, use bootstrap_file"
                    );
                    options.bootstrap_file = Some(configuration_file);
                }
            }
            if !options.live_config_update_enabled && options.bootstrap_file.is_none() {
                log::error!(
                    "A bootstrap file is required when live configuration updates are disabled"
                );
                return;
            }
            if let Some(bootstrap_file) = &options.bootstrap_file {
                if bootstrap_file.extension().and_then(|e| e.to_str()) != Some("json") {
                    log::error!(
                        "Bootstrap file '{}' must be a .json file",
                        bootstrap_file.display()
                    );
                    return;
                }
            }

            let configuration_id = ConfigurationId::new(
                state.guid.clone(),
                environment_id.to_string(),
                collection_id.to_string(),
            );
            let url_builder = match UrlBuilder::new(
                &state.region,
                &configuration_id,
                state.use_private_endpoint,
                state.override_service_url.as_deref(),
            ) {
                Ok(url_builder) => Arc::new(url_builder),
                Err(e) => {
                    log::error!("Cannot build the service URLs: {e}");
                    return;
                }
            };
            let token_provider: Arc<dyn TokenProvider> = match &state.token_provider_override {
                Some(token_provider) => token_provider.clone(),
                None => Arc::new(IamTokenProvider::new(&state.apikey, url_builder.iam_url())),
            };
            let server_client = Arc::new(ServerClientImpl::new(
                url_builder,
                token_provider,
                configuration_id.clone(),
            ));

            let metering = state.metering_client.clone().map(|client| {
                start_metering(
                    collection_id.to_string(),
                    environment_id.to_string(),
                    DEFAULT_TRANSMIT_INTERVAL,
                    client,
                )
            });

            let handler = Arc::new(ConfigurationHandler::new(
                configuration_id,
                server_client,
                self.cache.clone(),
                options.persistent_cache_directory,
                options.bootstrap_file,
                options.live_config_update_enabled,
                metering,
            ));
            state.handler = Some(handler.clone());
            handler
        };

        // The state lock is released: seeding may do I/O and readers must
        // stay unblocked. An already-populated cache is refreshed in the
        // background instead of blocking this caller again.
        if self.cache.has_data() {
            std::thread::spawn(move || handler.load_data());
        } else {
            handler.load_data();
        }
    }

    /// Forces an asynchronous fetch against the server, regardless of
    /// whether live updates are enabled.
    pub fn fetch_configurations(&self) {
        match self.handler() {
            Ok(handler) => {
                std::thread::spawn(move || handler.fetch());
            }
            Err(_) => {
                log::error!("Invalid action: FetchConfigurations can only be called after a successful SetContext")
            }
        }
    }

    /// Stores the callback invoked after every snapshot install triggered
    /// by a fetch. A later registration replaces the previous one.
    pub fn register_configuration_update_listener<F: Fn() + Send + Sync + 'static>(
        &self,
        listener: F,
    ) {
        match self.handler() {
            Ok(handler) => {
                let listener: ConfigurationUpdateListener = Box::new(listener);
                if handler.register_listener(listener).is_err() {
                    log::error!("Cannot register the configuration update listener");
                }
            }
            Err(_) => {
                log::error!("Invalid action: RegisterConfigurationUpdateListener can only be called after a successful SetContext")
            }
        }
    }

    pub fn get_feature(&self, feature_id: &str) -> Result<FeatureSnapshot> {
        self.handler()?.get_feature(feature_id)
    }

    pub fn get_features(&self) -> Result<HashMap<String, FeatureSnapshot>> {
        self.handler()?.get_features()
    }

    pub fn get_property(&self, property_id: &str) -> Result<PropertySnapshot> {
        self.handler()?.get_property(property_id)
    }

    pub fn get_properties(&self) -> Result<HashMap<String, PropertySnapshot>> {
        self.handler()?.get_properties()
    }

    /// Validates that the property references a secret and attaches the
    /// secrets-manager collaborator used to resolve it.
    pub fn get_secret(
        &self,
        property_id: &str,
        secrets_manager: Arc<dyn SecretsManager>,
    ) -> Result<SecretProperty> {
        self.handler()?.get_secret(property_id, secrets_manager)
    }

    /// Whether the monitoring websocket is currently connected.
    pub fn is_connected(&self) -> bool {
        self.handler()
            .map(|handler| handler.is_connected())
            .unwrap_or(false)
    }

    /// Raises or lowers the log level at runtime. Equivalent to running
    /// with `ENABLE_DEBUG=true`.
    pub fn enable_debug(&self, enabled: bool) {
        if enabled {
            log::set_max_level(log::LevelFilter::Debug);
        } else {
            log::set_max_level(log::LevelFilter::Info);
        }
    }

    fn handler(&self) -> Result<Arc<ConfigurationHandler>> {
        self.state
            .lock()?
            .handler
            .clone()
            .ok_or(Error::ClientNotConfigured)
    }
}
