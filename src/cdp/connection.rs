//! CDP WebSocket connection implementation
//!
//! One connection per page target. Writes go through a locked sink; a reader task owns the
//! stream half and routes responses to the waiting caller by command id.

use super::traits::{CdpConnection, CdpError as CdpErrorResponse, CdpResponse};
use super::types::*;
use crate::Error;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// CDP timeout configuration
#[derive(Debug, Clone)]
struct CdpTimeoutConfig {
    /// Default timeout for most commands (seconds)
    default_timeout_secs: u64,
    /// Timeout for page navigation commands (seconds)
    navigation_timeout_secs: u64,
    /// Timeout for screenshot commands (seconds)
    screenshot_timeout_secs: u64,
}

impl Default for CdpTimeoutConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 30,
            navigation_timeout_secs: 60,
            screenshot_timeout_secs: 90,
        }
    }
}

impl CdpTimeoutConfig {
    /// Get timeout duration for a specific command method
    fn timeout_for(&self, method: &str) -> tokio::time::Duration {
        let secs = if method.starts_with("Page.navigate") || method.starts_with("Page.reload") {
            self.navigation_timeout_secs
        } else if method == "Page.captureScreenshot" {
            self.screenshot_timeout_secs
        } else {
            self.default_timeout_secs
        };
        tokio::time::Duration::from_secs(secs)
    }
}

/// Pending command response
#[derive(Debug)]
struct PendingCommand {
    /// Response channel sender
    sender: oneshot::Sender<CdpResponse>,
    /// Command method (for logging)
    method: String,
}

type PendingMap = Arc<Mutex<HashMap<u64, PendingCommand>>>;

/// CDP WebSocket connection implementation
pub struct CdpWebSocketConnection {
    /// WebSocket URL
    url: String,
    /// Write half of the WebSocket
    sink: Mutex<Option<SplitSink<WsStream, Message>>>,
    /// Next command ID
    next_id: AtomicU64,
    /// Pending commands (ID -> response sender)
    pending: PendingMap,
    /// Cleared by the reader task when the socket goes away
    is_active: Arc<AtomicBool>,
    /// Timeout configuration
    timeout_config: CdpTimeoutConfig,
}

impl std::fmt::Debug for CdpWebSocketConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpWebSocketConnection")
            .field("url", &self.url)
            .field("is_active", &self.is_active.load(Ordering::SeqCst))
            .finish()
    }
}

impl CdpWebSocketConnection {
    /// Connect to a target WebSocket URL
    ///
    /// # Arguments
    /// * `url` - WebSocket URL (e.g., "ws://localhost:9222/devtools/page/ABC123")
    pub async fn connect<S: Into<String>>(url: S) -> Result<Arc<Self>, Error> {
        let url = url.into();
        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::websocket(format!("Failed to connect to {}: {}", url, e)))?;
        let (sink, stream) = ws_stream.split();

        let connection = Arc::new(Self {
            url,
            sink: Mutex::new(Some(sink)),
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
            is_active: Arc::new(AtomicBool::new(true)),
            timeout_config: CdpTimeoutConfig::default(),
        });

        let pending = Arc::clone(&connection.pending);
        let is_active = Arc::clone(&connection.is_active);
        tokio::spawn(async move {
            Self::read_loop(stream, pending, is_active).await;
        });

        info!("WebSocket connection established");
        Ok(connection)
    }

    /// Route incoming frames until the socket closes
    async fn read_loop(mut stream: SplitStream<WsStream>, pending: PendingMap, is_active: Arc<AtomicBool>) {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => Self::dispatch(&text, &pending).await,
                Ok(Message::Close(_)) => {
                    info!("WebSocket close frame received");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket read error: {}", e);
                    break;
                }
            }
        }

        is_active.store(false, Ordering::SeqCst);

        // Dropping the senders wakes every waiter with a closed-channel error.
        let mut pending = pending.lock().await;
        if !pending.is_empty() {
            warn!("Connection closed with {} commands in flight", pending.len());
        }
        pending.clear();
    }

    /// Handle one text frame
    async fn dispatch(text: &str, pending: &PendingMap) {
        if let Ok(response) = serde_json::from_str::<CdpRpcResponse>(text) {
            let waiter = pending.lock().await.remove(&response.id);
            match waiter {
                Some(command) => {
                    debug!("Response for command {}: {}", response.id, command.method);
                    let _ = command.sender.send(CdpResponse {
                        id: response.id,
                        result: Some(response.result),
                        error: response.error.map(|e| CdpErrorResponse {
                            code: e.code,
                            message: e.message,
                            data: e.data,
                        }),
                    });
                }
                None => warn!("Received response for unknown command ID: {}", response.id),
            }
            return;
        }

        match serde_json::from_str::<CdpNotification>(text) {
            Ok(event) => debug!("Ignoring CDP event {}", event.method),
            Err(_) => warn!("Unknown message format: {}", text),
        }
    }
}

#[async_trait]
impl CdpConnection for CdpWebSocketConnection {
    async fn send_command(&self, method: &str, params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
        };
        let json = serde_json::to_string(&request)
            .map_err(|e| Error::cdp(format!("Failed to serialize request: {}", e)))?;

        debug!("Sending CDP command {}: {}", id, method);

        let (sender, receiver) = oneshot::channel();
        self.pending.lock().await.insert(
            id,
            PendingCommand {
                sender,
                method: method.to_string(),
            },
        );

        {
            let mut sink = self.sink.lock().await;
            let sink = sink
                .as_mut()
                .ok_or_else(|| Error::websocket("WebSocket sink not available"))?;
            if let Err(e) = sink.send(Message::Text(json)).await {
                self.pending.lock().await.remove(&id);
                return Err(Error::websocket(format!("Failed to send message: {}", e)));
            }
        }

        let timeout_duration = self.timeout_config.timeout_for(method);
        match tokio::time::timeout(timeout_duration, receiver).await {
            Ok(Ok(response)) => {
                if let Some(error) = &response.error {
                    return Err(Error::cdp(format!(
                        "{}: {} (code: {})",
                        method, error.message, error.code
                    )));
                }
                Ok(response)
            }
            Ok(Err(_)) => Err(Error::websocket(format!(
                "Connection closed before command {} ({}) was answered",
                id, method
            ))),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(Error::timeout(format!(
                    "Command {} ({}) timed out after {:?}",
                    id, method, timeout_duration
                )))
            }
        }
    }

    async fn close(&self) -> Result<(), Error> {
        info!("Closing CDP WebSocket connection to {}", self.url);

        self.is_active.store(false, Ordering::SeqCst);

        if let Some(mut sink) = self.sink.lock().await.take() {
            sink.close()
                .await
                .map_err(|e| Error::websocket(format!("Failed to close WebSocket: {}", e)))?;
        }

        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
