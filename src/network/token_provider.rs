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

use reqwest::blocking::Client;
use serde::Deserialize;

use super::NetworkResult;

/// Contract for the collaborator that mints IAM bearer tokens. Token
/// caching/renewal is the collaborator's concern; this crate requests a
/// token whenever it opens a connection.
pub trait TokenProvider: std::fmt::Debug + Send + Sync {
    fn get_access_token(&self) -> NetworkResult<String>;
}

/// Token provider exchanging an API key for a bearer token at the IAM
/// endpoint.
#[derive(Debug)]
pub(crate) struct IamTokenProvider {
    apikey: String,
    iam_url: String,
}

impl IamTokenProvider {
    pub(crate) fn new(apikey: &str, iam_url: &str) -> Self {
        Self {
            apikey: apikey.to_string(),
            iam_url: iam_url.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

impl TokenProvider for IamTokenProvider {
    fn get_access_token(&self) -> NetworkResult<String> {
        let mut form_data = HashMap::new();
        form_data.insert("response_type".to_string(), "cloud_iam".to_string());
        form_data.insert(
            "grant_type".to_string(),
            "urn:ibm:params:oauth:grant-type:apikey".to_string(),
        );
        form_data.insert("apikey".to_string(), self.apikey.clone());

        let client = Client::new();
        let response = client
            .post(format!("{}/identity/token", self.iam_url))
            .header("Accept", "application/json")
            .header("User-Agent", super::http_client::USER_AGENT)
            .form(&form_data)
            .send()?
            .error_for_status()?;

        Ok(response.json::<AccessTokenResponse>()?.access_token)
    }
}
