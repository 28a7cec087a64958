use crate::{CoreResult, SolverError};

use std::{
    collections::HashMap,
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, instrument, trace, warn};

/// Protocol event pushed by the browser outside of a command reply.
#[derive(Debug, Clone)]
pub struct CdpEvent {
    /// Event method, e.g. `Page.frameNavigated`.
    pub method: String,
    /// Event parameters as delivered.
    pub params: Value,
    /// Session the event belongs to, if target-scoped.
    pub session_id: Option<String>,
}

/// Transport over which DevTools commands travel.
///
/// Pluggable so that page logic can be exercised against a scripted
/// in-memory transport in tests.
#[async_trait]
pub trait CdpTransport: Send + Sync {
    /// Send a protocol command and wait for its reply.
    ///
    /// `session_id` targets a specific attached page session; `None`
    /// addresses the browser endpoint itself.
    async fn send_command(
        &self,
        session_id: Option<&str>,
        method: &str,
        params: Value,
    ) -> CoreResult<Value>;

    /// Subscribe to protocol events.
    fn subscribe(&self) -> broadcast::Receiver<CdpEvent>;
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<CoreResult<Value>>>>>;

/// Real transport speaking the DevTools protocol over a WebSocket.
///
/// Commands are correlated to replies through monotonically increasing
/// ids; everything without an `id` is forwarded on the event bus.
pub struct WsTransport {
    outgoing: mpsc::Sender<Message>,
    pending: PendingMap,
    events: broadcast::Sender<CdpEvent>,
    next_id: AtomicU64,
    command_timeout: Duration,
}

impl WsTransport {
    /// Connect to the browser's WebSocket debugger URL.
    #[instrument(skip(ws_url))]
    pub async fn connect(ws_url: &str, command_timeout: Duration) -> CoreResult<Self> {
        let (stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| SolverError::Browser {
                reason: format!("WebSocket connect failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
        let (mut sink, mut source) = stream.split();

        let (outgoing, mut outgoing_rx) = mpsc::channel::<Message>(64);
        let (events, _) = broadcast::channel(256);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        // Writer: drains queued frames until the transport is dropped.
        tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                if let Err(e) = sink.send(frame).await {
                    warn!(error = %e, "DevTools socket write failed");
                    break;
                }
            }
        });

        // Reader: routes replies to their waiters and events to the bus.
        let pending_reader = Arc::clone(&pending);
        let event_bus = events.clone();
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "DevTools socket read failed");
                        break;
                    }
                };

                let message: Value = match serde_json::from_str(&text) {
                    Ok(value) => value,
                    Err(e) => {
                        trace!(error = %e, "Skipping unparseable DevTools frame");
                        continue;
                    }
                };

                if let Some(id) = message.get("id").and_then(Value::as_u64) {
                    if let Some(waiter) = pending_reader.lock().await.remove(&id) {
                        let _ = waiter.send(Self::reply_from(&message));
                    }
                } else if let Some(method) = message.get("method").and_then(Value::as_str) {
                    let _ = event_bus.send(CdpEvent {
                        method: method.to_string(),
                        params: message.get("params").cloned().unwrap_or(Value::Null),
                        session_id: message
                            .get("sessionId")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    });
                }
            }

            // Fail any waiter still outstanding when the socket dies.
            for (_, waiter) in pending_reader.lock().await.drain() {
                let _ = waiter.send(Err(SolverError::Browser {
                    reason: "DevTools connection closed".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                }));
            }
            debug!("DevTools reader stopped");
        });

        Ok(Self {
            outgoing,
            pending,
            events,
            next_id: AtomicU64::new(1),
            command_timeout,
        })
    }

    #[cfg(test)]
    pub(crate) async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    fn reply_from(message: &Value) -> CoreResult<Value> {
        if let Some(error) = message.get("error") {
            return Err(SolverError::Protocol {
                reason: error.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(message.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl CdpTransport for WsTransport {
    #[instrument(skip(self, params), fields(method = method))]
    async fn send_command(
        &self,
        session_id: Option<&str>,
        method: &str,
        params: Value,
    ) -> CoreResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut command = json!({ "id": id, "method": method, "params": params });
        if let (Some(session), Some(map)) = (session_id, command.as_object_mut()) {
            map.insert("sessionId".to_string(), Value::String(session.to_string()));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(id, reply_tx);

        let frame = Message::Text(command.to_string());
        if self.outgoing.send(frame).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(SolverError::Browser {
                reason: "DevTools connection closed".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        match tokio::time::timeout(self.command_timeout, reply_rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(SolverError::Browser {
                reason: "DevTools reply channel dropped".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(SolverError::CommandTimeout {
                    method: method.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.subscribe()
    }
}
