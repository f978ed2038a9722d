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

//! The persistent cache file: an on-disk mirror of the last successful
//! fetch in API shape, used to survive process restarts.

use std::path::Path;
use std::sync::Mutex;

use crate::network::serialization::ConfigurationJson;

/// Name of the single file kept inside the configured persistent
/// directory.
pub(crate) const CONFIGURATION_FILE: &str = "appconfiguration.json";

/// Content representing an empty cache.
pub(crate) const EMPTY_CACHE: &str = "{}";

// Serializes concurrent readers/writers of the persistent file.
static FILE_MUTEX: Mutex<()> = Mutex::new(());

/// Reads the persistent cache file from the given directory. A missing or
/// unreadable file reads as [`EMPTY_CACHE`].
pub(crate) fn read_configuration_file(directory: &Path) -> String {
    let _guard = FILE_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let path = directory.join(CONFIGURATION_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            log::debug!("Cannot read persistent file '{}': {e}", path.display());
            EMPTY_CACHE.to_string()
        }
    }
}

/// Writes the configuration to the persistent cache file, pretty-printed.
/// Failures are logged; persistence is best-effort.
pub(crate) fn store_configuration_file(directory: &Path, configuration: &ConfigurationJson) {
    let _guard = FILE_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let content = match serde_json::to_string_pretty(configuration) {
        Ok(content) => content,
        Err(e) => {
            log::error!("Cannot serialize configuration for the persistent file: {e}");
            return;
        }
    };
    let path = directory.join(CONFIGURATION_FILE);
    if let Err(e) = std::fs::write(&path, content) {
        log::error!("Cannot write persistent file '{}': {e}", path.display());
    }
}
