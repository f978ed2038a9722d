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

use url::Url;

use super::errors::NetworkError;
use super::NetworkResult;
use crate::client::ConfigurationId;

const BASE_DOMAIN: &str = ".apprapp.cloud.ibm.com";
const PRIVATE_ENDPOINT_PREFIX: &str = "private.";
const SERVICE_PATH: &str = "/apprapp";
const CONFIG_PATH: &str = "/feature/v1/instances/";
const WEBSOCKET_PATH: &str = "/wsfeature";

/// Builds all service endpoints once, from the region (or a dev override)
/// and the configuration coordinates.
///
/// Public instances live at `https://{region}.apprapp.cloud.ibm.com`;
/// private endpoints insert the `private.` prefix between scheme and host.
/// The same prefix rule applies to a dev override URL and to the IAM
/// endpoints.
#[derive(Debug)]
pub(crate) struct UrlBuilder {
    config_url: String,
    websocket_url: Url,
    iam_url: String,
}

impl UrlBuilder {
    pub(crate) fn new(
        region: &str,
        configuration_id: &ConfigurationId,
        use_private_endpoint: bool,
        override_service_url: Option<&str>,
    ) -> NetworkResult<Self> {
        let (http_base, ws_base, iam_url) = match override_service_url {
            // Dev-only escape hatch. A plain http override also downgrades
            // the websocket to ws, so local test servers work.
            Some(override_url) => {
                let (scheme, host) = override_url
                    .split_once("://")
                    .ok_or_else(|| NetworkError::UrlParseError(override_url.to_string()))?;
                let ws_scheme = if scheme == "http" { "ws" } else { "wss" };
                if use_private_endpoint {
                    (
                        format!("{scheme}://{PRIVATE_ENDPOINT_PREFIX}{host}"),
                        format!("{ws_scheme}://{PRIVATE_ENDPOINT_PREFIX}{host}"),
                        "https://private.iam.test.cloud.ibm.com".to_string(),
                    )
                } else {
                    (
                        override_url.to_string(),
                        format!("{ws_scheme}://{host}"),
                        "https://iam.test.cloud.ibm.com".to_string(),
                    )
                }
            }
            None => {
                if use_private_endpoint {
                    (
                        format!("https://{PRIVATE_ENDPOINT_PREFIX}{region}{BASE_DOMAIN}"),
                        format!("wss://{PRIVATE_ENDPOINT_PREFIX}{region}{BASE_DOMAIN}"),
                        "https://private.iam.cloud.ibm.com".to_string(),
                    )
                } else {
                    (
                        format!("https://{region}{BASE_DOMAIN}"),
                        format!("wss://{region}{BASE_DOMAIN}"),
                        "https://iam.cloud.ibm.com".to_string(),
                    )
                }
            }
        };

        let config_url = format!(
            "{http_base}{SERVICE_PATH}{CONFIG_PATH}{}/config",
            configuration_id.guid
        );

        let websocket_url = format!("{ws_base}{SERVICE_PATH}{WEBSOCKET_PATH}");
        let mut websocket_url = Url::parse(&websocket_url)
            .map_err(|_| NetworkError::UrlParseError(websocket_url.clone()))?;
        websocket_url
            .query_pairs_mut()
            .append_pair("instance_id", &configuration_id.guid)
            .append_pair("collection_id", &configuration_id.collection_id)
            .append_pair("environment_id", &configuration_id.environment_id);

        Ok(Self {
            config_url,
            websocket_url,
            iam_url,
        })
    }

    pub(crate) fn config_url(&self) -> &str {
        &self.config_url
    }

    pub(crate) fn websocket_url(&self) -> &Url {
        &self.websocket_url
    }

    pub(crate) fn iam_url(&self) -> &str {
        &self.iam_url
    }
}
