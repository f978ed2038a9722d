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

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    TungsteniteError(#[from] tungstenite::Error),

    #[error("Server responded with status code {0}")]
    UnexpectedStatus(u16),

    #[error("Websocket handshake rejected with status code {0}")]
    HandshakeStatus(u16),

    #[error("Cannot parse '{0}' as URL")]
    UrlParseError(String),

    #[error("Invalid header value for '{0}'")]
    InvalidHeaderValue(String),
}

impl NetworkError {
    /// Whether a fetch failing with this error should be retried on the
    /// scheduled-retry timer. Rate limiting and server errors are
    /// transient; client errors and unexpected success codes are not.
    pub(crate) fn is_transient(&self) -> bool {
        match self {
            NetworkError::UnexpectedStatus(status) => {
                *status == 429 || (500..=599).contains(status)
            }
            NetworkError::ReqwestError(_) => true,
            _ => false,
        }
    }
}
