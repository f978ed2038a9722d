mod common;

use std::collections::HashMap;

use appconfiguration::{ContextOptions, Value};

use common::*;

fn bootstrap_payload() -> serde_json::Value {
    serde_json::json!({
        "environments": [
            {
                "name": "Dev",
                "environment_id": "dev",
                "features": [
                    {
                        "name": "Cycle rentals",
                        "feature_id": "cycle-rentals",
                        "type": "BOOLEAN",
                        "enabled_value": true,
                        "disabled_value": false,
                        "enabled": true,
                        "segment_rules": [],
                        "collections": [{"collection_id": "ecommerce"}]
                    }
                ],
                "properties": []
            }
        ],
        "collections": [{"name": "E-Commerce", "collection_id": "ecommerce"}],
        "segments": []
    })
}

/// Bootstrap-only mode: the cache is seeded from the file, and neither
/// HTTP nor websocket activity happens (nothing listens on the port the
/// client is pointed at, so any network attempt would be observable as an
/// error and a dead cache).
#[test]
fn test_bootstrap_only_mode() {
    let dir = tempfile::tempdir().unwrap();
    let bootstrap_file = dir.path().join("bootstrap.json");
    std::fs::write(&bootstrap_file, bootstrap_payload().to_string()).unwrap();

    // port 1 is never listening
    let client = create_client(1);
    client.set_context(
        "ecommerce",
        "dev",
        ContextOptions {
            bootstrap_file: Some(bootstrap_file),
            live_config_update_enabled: false,
            ..Default::default()
        },
    );

    let feature = client.get_feature("cycle-rentals").unwrap();
    assert_eq!(
        feature.get_current_value("user1", &HashMap::new()),
        Value::Boolean(true)
    );
    assert!(!client.is_connected());
}
