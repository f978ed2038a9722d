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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use crate::network::errors::NetworkError;
use crate::network::http_client::ServerClient;

/// Keepalive payload periodically sent by the server. Not documented as a
/// stable protocol constant, but relied upon by every SDK implementation.
pub(crate) const SERVER_HEARTBEAT: &str = "test message";

pub(crate) const RECONNECT_DELAY: Duration = Duration::from_secs(15);

/// The websocket subscription loop.
///
/// Keeps one monitoring websocket open; every frame that is not the
/// keepalive is a change notification and triggers the configured refetch
/// callback (synchronously, on this worker's thread). Read errors and
/// close frames drop the connection, wait [`RECONNECT_DELAY`] and
/// reconnect; a handshake rejected with a client error (except 429) gives
/// up permanently.
pub(crate) struct WebsocketWorker {
    server_client: Arc<dyn ServerClient>,
    connected: Arc<AtomicBool>,
    on_change_notification: Box<dyn Fn() + Send>,
}

impl WebsocketWorker {
    pub(crate) fn new(
        server_client: Arc<dyn ServerClient>,
        connected: Arc<AtomicBool>,
        on_change_notification: Box<dyn Fn() + Send>,
    ) -> Self {
        Self {
            server_client,
            connected,
            on_change_notification,
        }
    }

    pub(crate) fn run(&self, thread_termination_receiver: Receiver<()>) {
        'outer: loop {
            if Self::terminated(&thread_termination_receiver) {
                break;
            }

            // Reconnecting drops any previous socket before this point.
            match self.server_client.get_configuration_monitoring_websocket() {
                Ok(mut socket) => {
                    self.connected.store(true, Ordering::SeqCst);
                    log::debug!("Websocket connected");

                    loop {
                        if Self::terminated(&thread_termination_receiver) {
                            break 'outer;
                        }
                        match socket.read_msg() {
                            Ok(tungstenite::Message::Text(payload)) => {
                                if payload.as_str() != SERVER_HEARTBEAT {
                                    log::debug!("Websocket change notification received");
                                    (self.on_change_notification)();
                                }
                            }
                            Ok(tungstenite::Message::Close(_)) => {
                                log::info!("Websocket closed by the server");
                                break;
                            }
                            Ok(_) => {
                                // Not part of the protocol; ignored.
                            }
                            Err(e) => {
                                log::error!("Websocket read failed: {e}");
                                break;
                            }
                        }
                    }
                }
                Err(NetworkError::HandshakeStatus(status))
                    if (400..500).contains(&status) && status != 429 =>
                {
                    log::error!(
                        "Websocket handshake rejected with client error {status}, giving up"
                    );
                    self.connected.store(false, Ordering::SeqCst);
                    return;
                }
                Err(e) => {
                    log::error!("Websocket connect failed: {e}");
                }
            }

            self.connected.store(false, Ordering::SeqCst);

            match thread_termination_receiver.recv_timeout(RECONNECT_DELAY) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => break,
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn terminated(receiver: &Receiver<()>) -> bool {
        !matches!(receiver.try_recv(), Err(TryRecvError::Empty))
    }
}
