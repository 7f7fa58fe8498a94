use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, State, ConnectInfo},
    http::HeaderMap,
    response::IntoResponse,
};
use futures_util::{stream::StreamExt, SinkExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc::Sender;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::state::AppState;
use crate::traits::{split_command, CommandTrait, HostTrait, Reply, Session};

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    /// A user message addressed to a registered command, e.g. `sovits.filter 你好`.
    Command { text: String },
    /// A bot reply produced elsewhere, delivered through the reply pipeline.
    Reply {
        #[serde(default)]
        trigger: Option<String>,
        #[serde(default)]
        content: Value,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ServerMessage {
    Hello { session_id: String },
    Text { text: String },
    Audio { path: String },
    Reply { content: Value },
}

impl ServerMessage {
    fn from_reply(reply: Reply) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        if let Some(text) = reply.text {
            out.push(ServerMessage::Text { text });
        }
        if let Some(path) = reply.audio {
            out.push(ServerMessage::Audio {
                path: path.to_string_lossy().into_owned(),
            });
        }
        out
    }
}

struct RegisteredCommand {
    description: String,
    handler: Arc<dyn CommandTrait>,
}

/// Chat host backed by WebSocket connections, one session per connection.
#[derive(Default)]
pub struct WsHost {
    commands: RwLock<HashMap<String, RegisteredCommand>>,
    sessions: RwLock<HashMap<String, Sender<ServerMessage>>>,
}

impl WsHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, session_id: &str, tx: Sender<ServerMessage>) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.to_string(), tx);
    }

    pub fn detach(&self, session_id: &str) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
    }

    /// Registered commands as `(name, description)`, sorted by name.
    pub fn commands(&self) -> Vec<(String, String)> {
        let commands = self.commands.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<(String, String)> = commands
            .iter()
            .map(|(name, c)| (name.clone(), c.description.clone()))
            .collect();
        list.sort();
        list
    }

    /// Splits `name args` and runs the matching command.
    pub async fn dispatch(&self, session: &Session) -> Reply {
        let (name, args) = split_command(&session.content);

        let handler = self
            .commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|c| c.handler.clone());

        match handler {
            Some(handler) => {
                info!("Session {} runs command {}", session.id, name);
                handler.execute(session, args).await
            }
            None => {
                let available: Vec<String> = self.commands().into_iter().map(|(n, _)| n).collect();
                Reply::text(format!(
                    "Unknown command: {}. Available: {}",
                    name,
                    available.join(", ")
                ))
            }
        }
    }
}

#[async_trait]
impl HostTrait for WsHost {
    fn register_command(&self, name: &str, description: &str, handler: Arc<dyn CommandTrait>) {
        debug!("Registering command {}", name);
        self.commands
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name.to_string(),
                RegisteredCommand {
                    description: description.to_string(),
                    handler,
                },
            );
    }

    fn has_command(&self, name: &str) -> bool {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    async fn send(&self, session_id: &str, reply: Reply) -> anyhow::Result<()> {
        let tx = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
            .with_context(|| format!("Session {} is not connected", session_id))?;

        for msg in ServerMessage::from_reply(reply) {
            tx.send(msg)
                .await
                .with_context(|| format!("Session {} closed", session_id))?;
        }
        Ok(())
    }
}

pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    info!("WebSocket handshake attempt from {}", addr);
    debug!("WebSocket handshake headers: {:?}", headers);

    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: AppState) {
    let session_id = Uuid::new_v4().to_string();
    info!("WebSocket connection established with {} (session {})", addr, session_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::channel::<ServerMessage>(32);
    state.host.attach(&session_id, tx.clone());

    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Error serializing message: {}", e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(text.into())).await {
                error!("Error sending message: {}", e);
                break;
            }
        }
    });

    let _ = tx
        .send(ServerMessage::Hello {
            session_id: session_id.clone(),
        })
        .await;

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                error!("Error receiving message from {}: {}", addr, e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                debug!("Received text message from {}: {}", addr, text.as_str());
                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(ClientMessage::Command { text }) => {
                        let session = Session {
                            id: session_id.clone(),
                            content: text,
                        };
                        let reply = state.host.dispatch(&session).await;
                        if let Err(e) = state.host.send(&session_id, reply).await {
                            error!("Failed to deliver command reply: {}", e);
                        }
                    }
                    Ok(ClientMessage::Reply { trigger, content }) => {
                        let session = Session {
                            id: session_id.clone(),
                            content: trigger.unwrap_or_default(),
                        };
                        let content = state
                            .auto_convert
                            .around(&session, async move { content })
                            .await;
                        let _ = tx.send(ServerMessage::Reply { content }).await;
                    }
                    Err(e) => {
                        error!("Error deserializing message from {}: {}", addr, e);
                        let _ = tx
                            .send(ServerMessage::Text {
                                text: format!("Invalid message: {}", e),
                            })
                            .await;
                    }
                }
            }
            Message::Binary(_) => {
                warn!("Ignoring binary frame from {}", addr);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => {
                info!("Connection closed by {}", addr);
                break;
            }
        }
    }

    state.host.detach(&session_id);
    writer_handle.abort();
}
