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

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use tungstenite::client::IntoClientRequest;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::WebSocket;

use super::errors::NetworkError;
use super::serialization::ConfigurationJson;
use super::url_builder::UrlBuilder;
use super::{NetworkResult, TokenProvider};
use crate::client::ConfigurationId;

pub(crate) const USER_AGENT: &str =
    concat!("appconfiguration-rust-sdk/", env!("CARGO_PKG_VERSION"));

// The request is retried in place before a failure is reported to the
// caller (which then decides about the scheduled retry).
const MAX_NUMBER_OF_RETRIES: u32 = 3;

fn intrinsic_retry_delay(attempt: u32) -> Duration {
    // 0.5s, 1s, 1.5s
    Duration::from_millis(500 * u64::from(attempt + 1))
}

/// Blocking read access to one websocket connection.
pub(crate) trait WebsocketReader: Send {
    fn read_msg(&mut self) -> tungstenite::error::Result<tungstenite::Message>;
}

impl WebsocketReader for WebSocket<MaybeTlsStream<TcpStream>> {
    fn read_msg(&mut self) -> tungstenite::error::Result<tungstenite::Message> {
        self.read()
    }
}

/// The server as the live-update loop sees it: one configuration fetch and
/// one monitoring-websocket factory.
pub(crate) trait ServerClient: Send + Sync {
    fn get_configuration(&self) -> NetworkResult<ConfigurationJson>;

    fn get_configuration_monitoring_websocket(&self) -> NetworkResult<Box<dyn WebsocketReader>>;
}

#[derive(Debug)]
pub(crate) struct ServerClientImpl {
    url_builder: Arc<UrlBuilder>,
    token_provider: Arc<dyn TokenProvider>,
    configuration_id: ConfigurationId,
}

impl ServerClientImpl {
    pub(crate) fn new(
        url_builder: Arc<UrlBuilder>,
        token_provider: Arc<dyn TokenProvider>,
        configuration_id: ConfigurationId,
    ) -> Self {
        Self {
            url_builder,
            token_provider,
            configuration_id,
        }
    }

    fn retry_after(response: &reqwest::blocking::Response) -> Option<Duration> {
        response
            .headers()
            .get("Retry-After")?
            .to_str()
            .ok()?
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }
}

impl ServerClient for ServerClientImpl {
    /// Fetches the configuration for the configured collection and
    /// environment.
    ///
    /// Network failures and 5xx responses are retried up to three times
    /// with short exponential delays; a 429 waits for `Retry-After` when
    /// the server provides it. Everything that is not a 200 after the
    /// retries is reported as an error for the caller to classify.
    fn get_configuration(&self) -> NetworkResult<ConfigurationJson> {
        let token = self.token_provider.get_access_token()?;
        let client = Client::new();

        let mut attempt = 0;
        loop {
            let result = client
                .get(self.url_builder.config_url())
                .query(&[
                    ("action", "sdkConfig"),
                    ("collection_id", &self.configuration_id.collection_id),
                    ("environment_id", &self.configuration_id.environment_id),
                ])
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .bearer_auth(&token)
                .send();

            let (error, delay) = match result {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::OK {
                        return response.json().map_err(NetworkError::ReqwestError);
                    }
                    if status.as_u16() == 429 {
                        let delay = Self::retry_after(&response)
                            .unwrap_or_else(|| intrinsic_retry_delay(attempt));
                        (NetworkError::UnexpectedStatus(429), delay)
                    } else if status.is_server_error() {
                        (
                            NetworkError::UnexpectedStatus(status.as_u16()),
                            intrinsic_retry_delay(attempt),
                        )
                    } else {
                        // Client errors, redirects and unexpected success
                        // codes are not worth retrying in place.
                        return Err(NetworkError::UnexpectedStatus(status.as_u16()));
                    }
                }
                Err(e) => (NetworkError::ReqwestError(e), intrinsic_retry_delay(attempt)),
            };

            attempt += 1;
            if attempt >= MAX_NUMBER_OF_RETRIES {
                return Err(error);
            }
            log::debug!("Configuration fetch failed ({error}), retrying in {delay:?}");
            std::thread::sleep(delay);
        }
    }

    /// Opens the monitoring websocket. A handshake rejected by the server
    /// is reported with its status code so the caller can distinguish
    /// permanent client errors from transient conditions.
    fn get_configuration_monitoring_websocket(&self) -> NetworkResult<Box<dyn WebsocketReader>> {
        let token = self.token_provider.get_access_token()?;

        let mut request = self
            .url_builder
            .websocket_url()
            .as_str()
            .into_client_request()
            .map_err(NetworkError::TungsteniteError)?;
        let headers = request.headers_mut();
        headers.insert(
            "User-Agent",
            USER_AGENT
                .parse()
                .map_err(|_| NetworkError::InvalidHeaderValue("User-Agent".to_string()))?,
        );
        headers.insert(
            "Authorization",
            format!("Bearer {token}")
                .parse()
                .map_err(|_| NetworkError::InvalidHeaderValue("Authorization".to_string()))?,
        );

        match tungstenite::connect(request) {
            Ok((socket, _response)) => Ok(Box::new(socket)),
            Err(tungstenite::Error::Http(response)) => {
                Err(NetworkError::HandshakeStatus(response.status().as_u16()))
            }
            Err(e) => Err(NetworkError::TungsteniteError(e)),
        }
    }
}
