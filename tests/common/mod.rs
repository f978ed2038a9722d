use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use appconfiguration::{AppConfiguration, NetworkResult, TokenProvider};
use tungstenite::WebSocket;

#[derive(Debug)]
pub struct MockTokenProvider {}

impl TokenProvider for MockTokenProvider {
    fn get_access_token(&self) -> NetworkResult<String> {
        Ok("mock_token".into())
    }
}

/// A client wired against a local mock server.
pub fn create_client(port: u16) -> AppConfiguration {
    let client = AppConfiguration::new();
    client.override_service_url(&format!("http://127.0.0.1:{port}"));
    client.override_token_provider(Arc::new(MockTokenProvider {}));
    client.init("us-south", "guid", "apikey");
    client
}

/// The payload served for the first fetch: one feature, one property, two
/// segments.
pub fn api_payload() -> serde_json::Value {
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
                        "rollout_percentage": 100,
                        "segment_rules": [
                            {
                                "rules": [{"segments": ["beta-users"]}],
                                "value": "$default",
                                "order": 1,
                                "rollout_percentage": "$default"
                            }
                        ]
                    }
                ],
                "properties": [
                    {
                        "name": "Limit",
                        "property_id": "limit",
                        "type": "NUMERIC",
                        "value": 1,
                        "segment_rules": [
                            {
                                "rules": [{"segments": ["beta-users"]}],
                                "value": 5,
                                "order": 1
                            }
                        ]
                    }
                ]
            }
        ],
        "segments": [
            {
                "name": "Beta users",
                "segment_id": "beta-users",
                "rules": [
                    {
                        "attribute_name": "email",
                        "operator": "contains",
                        "values": ["ibm.com"]
                    }
                ]
            },
            {
                "name": "Trial users",
                "segment_id": "trial-users",
                "rules": [
                    {
                        "attribute_name": "email",
                        "operator": "endsWith",
                        "values": ["@trial.com"]
                    }
                ]
            }
        ]
    })
}

/// A later payload without any features or properties.
pub fn api_payload_empty() -> serde_json::Value {
    serde_json::json!({
        "environments": [
            {
                "name": "Dev",
                "environment_id": "dev",
                "features": [],
                "properties": []
            }
        ],
        "segments": []
    })
}

fn read_request(stream: &mut TcpStream) -> Vec<String> {
    let buf_reader = BufReader::new(&*stream);
    buf_reader
        .lines()
        .map(|result| result.unwrap())
        .take_while(|line| !line.is_empty())
        .collect()
}

/// Accepts one connection and serves the configuration payload.
pub fn handle_config_request(server: &TcpListener, json_payload: String) {
    let (mut stream, _) = server.accept().unwrap();

    let http_request = read_request(&mut stream);
    assert!(
        http_request[0]
            .starts_with("GET /apprapp/feature/v1/instances/guid/config?action=sdkConfig"),
        "unexpected request line: {}",
        http_request[0]
    );
    assert!(http_request[0].contains("collection_id=ecommerce"));
    assert!(http_request[0].contains("environment_id=dev"));

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
        json_payload.len(),
        json_payload
    );
    stream.write_all(response.as_bytes()).unwrap();
}

/// Accepts one connection and rejects it with the given status line.
pub fn handle_request_with_error(server: &TcpListener, status_line: &str) {
    let (mut stream, _) = server.accept().unwrap();
    let _ = read_request(&mut stream);
    let response = format!("HTTP/1.1 {status_line}\r\nContent-Length: 0\r\n\r\n");
    stream.write_all(response.as_bytes()).unwrap();
}

/// Accepts one connection as a websocket and immediately sends the
/// server's keepalive message.
pub fn handle_websocket(server: &TcpListener) -> WebSocket<TcpStream> {
    let (stream, _) = server.accept().unwrap();
    let mut websocket = tungstenite::accept(stream).unwrap();
    websocket
        .send(tungstenite::Message::text("test message".to_string()))
        .unwrap();
    websocket
}

pub fn local_server() -> (TcpListener, u16) {
    let server = TcpListener::bind(("127.0.0.1", 0)).expect("Failed to bind");
    let port = server.local_addr().unwrap().port();
    (server, port)
}
