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

//! Runtime models.
//!
//! All configuration data is converted into these models when a snapshot
//! is installed; evaluation only ever runs on them. They are internal, so
//! they can evolve without breaking the public API.

mod configuration;
mod feature_snapshot;
mod property_snapshot;

pub(crate) use configuration::Configuration;
pub use feature_snapshot::FeatureSnapshot;
pub use property_snapshot::PropertySnapshot;

use std::io::Cursor;

use murmur3::murmur3_32;

/// Deterministic bucket in [0, 99] for rollout gating.
///
/// The hash must agree across processes and SDK implementations:
/// MurmurHash3 32-bit, seed 0, over the UTF-8 bytes of
/// `"{entity_id}:{feature_id}"`.
pub(crate) fn normalized_value(key: &str) -> u32 {
    // Reading from an in-memory cursor cannot fail.
    let hash = murmur3_32(&mut Cursor::new(key), 0).expect("Cannot hash the value.");
    (f64::from(hash) / 2_f64.powi(32) * 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_value_is_deterministic() {
        let first = normalized_value("user123:flag");
        let second = normalized_value("user123:flag");
        assert_eq!(first, second);
        assert!(first < 100);
    }

    #[test]
    fn test_normalized_value_known_buckets() {
        // Reference buckets shared with the other SDK implementations.
        assert_eq!(normalized_value("a1:f1"), 68);
        assert_eq!(normalized_value("a2:f1"), 29);
    }
}
