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

//! Client SDK to evaluate feature flags and dynamic properties from a
//! remote App Configuration service.
//!
//! # Overview
//!
//! The SDK keeps an in-memory copy of the configuration assigned to one
//! collection and environment, and keeps it live: a websocket subscription
//! announces server-side changes, every change triggers a refetch, and
//! each refetch atomically replaces the cache snapshot. Evaluation (which
//! value an entity sees, including segment targeting and percentage
//! rollouts) always runs locally against the cache.
//!
//! The cache can also be seeded from disk: a *bootstrap file* for offline
//! or air-gapped starts, and a *persistent cache* directory mirroring the
//! last successful fetch across process restarts.
//!
//! # Usage
//!
//! ```no_run
//! use appconfiguration::{AppConfiguration, ContextOptions, Value};
//! use std::collections::HashMap;
//!
//! let client = AppConfiguration::instance();
//! client.init("us-south", "guid", "apikey");
//! client.set_context("ecommerce", "production", ContextOptions::default());
//!
//! // Evaluate a feature flag for one of your entities
//! let feature = client.get_feature("ab-testing").unwrap();
//! let attributes = HashMap::from([("email".to_string(), Value::from("x@ibm.com"))]);
//! match feature.get_current_value("user-123", &attributes) {
//!     Value::Boolean(true) => println!("feature is on for user-123"),
//!     _ => println!("user-123 keeps the legacy workflow"),
//! }
//!
//! // Observe live updates
//! client.register_configuration_update_listener(|| {
//!     println!("configuration changed, re-query to observe the new values");
//! });
//! ```

mod cache;
mod client;
mod errors;
mod metering;
mod models;
mod network;
mod persistence;
mod secrets;
mod segment_evaluation;
mod utils;
mod value;

pub use client::{AppConfiguration, ConfigurationId, ContextOptions};
pub use errors::{ConfigurationDataError, Error, Result};
pub use metering::{EvaluationUsage, MeteringClient, DEFAULT_SEGMENT_ID};
pub use models::{FeatureSnapshot, PropertySnapshot};
pub use network::{NetworkError, NetworkResult, TokenProvider};
pub use secrets::{SecretProperty, SecretsManager};
pub use value::Value;
