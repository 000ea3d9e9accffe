//! Server network layer handling WebSocket connections and the event loop

use crate::client_manager::{ClientManager, ConnectionId, ConnectionTx};
use crate::coordinator::{Coordinator, Outbound};
use crate::quiz_store::{MemoryQuizStore, QuizStore};
use crate::registry::SessionRegistry;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientPacket, ServerPacket};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server is already running")]
    AlreadyRunning,
}

/// Floor for `ServerConfig::reap_interval`; tokio intervals cannot tick at zero
const MIN_REAP_INTERVAL: Duration = Duration::from_millis(10);

/// Runtime settings for the quiz server
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `127.0.0.1:8080`
    pub bind_addr: String,
    pub max_connections: usize,
    /// Sessions without any action for this long are ended
    pub idle_timeout: Duration,
    /// How often idle sessions are looked for, never more often than every 10ms
    pub reap_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_connections: 256,
            idle_timeout: Duration::from_secs(60 * 60),
            reap_interval: Duration::from_secs(60),
        }
    }
}

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        addr: SocketAddr,
        sender: ConnectionTx,
        reply: oneshot::Sender<Option<ConnectionId>>,
    },
    PacketReceived {
        connection_id: ConnectionId,
        packet: ClientPacket,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
    Shutdown,
}

/// Main server coordinating connections and quiz sessions
pub struct Server<Q = MemoryQuizStore> {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    config: ServerConfig,
    clients: ClientManager,
    coordinator: Coordinator<Q>,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server<MemoryQuizStore> {
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        Self::with_quiz_store(config, MemoryQuizStore::new()).await
    }
}

impl<Q: QuizStore + Send + 'static> Server<Q> {
    pub async fn with_quiz_store(config: ServerConfig, quizzes: Q) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on ws://{}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: ClientManager::new(config.max_connections),
            coordinator: Coordinator::new(SessionRegistry::new(), quizzes),
            config,
            server_tx,
            server_rx,
        })
    }

    /// Address actually bound, useful when the configured port is 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn quizzes_mut(&mut self) -> &mut Q {
        self.coordinator.quizzes_mut()
    }

    /// Sender that can stop the loop with `ServerMessage::Shutdown`
    pub fn control_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that accepts sockets and upgrades them to WebSockets
    fn spawn_acceptor(&self, listener: TcpListener) {
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let server_tx = server_tx.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, addr, server_tx).await;
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn dispatch(&self, deliveries: Vec<Outbound>) {
        for Outbound { to, packet } in deliveries {
            self.clients.send(to, packet);
        }
    }

    fn handle_message(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::Connected {
                addr,
                sender,
                reply,
            } => {
                let connection_id = self.clients.add_connection(addr, sender);
                if reply.send(connection_id).is_err() {
                    // Socket died during the handshake
                    if let Some(id) = connection_id {
                        self.clients.remove_connection(id);
                    }
                }
            }
            ServerMessage::PacketReceived {
                connection_id,
                packet,
            } => {
                if self.clients.contains(connection_id) {
                    debug!("<- {}: {:?}", connection_id, packet);
                    let deliveries = self.coordinator.handle(connection_id, packet, Instant::now());
                    self.dispatch(deliveries);
                }
            }
            ServerMessage::Disconnected { connection_id } => {
                if self.clients.remove_connection(connection_id) {
                    let deliveries = self.coordinator.disconnect(connection_id, Instant::now());
                    self.dispatch(deliveries);
                }
            }
            ServerMessage::Shutdown => return false,
        }
        true
    }

    /// Main server loop: routes connection events and reaps idle sessions
    pub async fn run(mut self) -> Result<(), ServerError> {
        let listener = self.listener.take().ok_or(ServerError::AlreadyRunning)?;
        self.spawn_acceptor(listener);

        let mut reap_interval = interval(self.config.reap_interval.max(MIN_REAP_INTERVAL));
        reap_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    let keep_running = match message {
                        Some(message) => self.handle_message(message),
                        None => false,
                    };
                    if !keep_running {
                        info!("Server shutting down");
                        break;
                    }
                },

                _ = reap_interval.tick() => {
                    let deliveries = self
                        .coordinator
                        .reap_idle(Instant::now(), self.config.idle_timeout);
                    self.dispatch(deliveries);

                    debug!(
                        "{} connections, {} sessions",
                        self.clients.len(),
                        self.coordinator.registry().len()
                    );
                },
            }
        }

        Ok(())
    }
}

/// Drives one socket from handshake to close
///
/// Inbound frames are decoded here and forwarded in receive order; outbound
/// packets are written by a separate task fed from the connection's channel.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    let (mut ws_sink, mut ws_source) = ws_stream.split();

    let (sender, mut outbound_rx) = mpsc::unbounded_channel::<ServerPacket>();
    let (reply_tx, reply_rx) = oneshot::channel();
    if server_tx
        .send(ServerMessage::Connected {
            addr,
            sender,
            reply: reply_tx,
        })
        .is_err()
    {
        return;
    }

    let connection_id = match reply_rx.await {
        Ok(Some(id)) => id,
        _ => {
            if let Ok(text) = serde_json::to_string(&ServerPacket::error("Server full")) {
                let _ = ws_sink.send(Message::Text(text)).await;
            }
            let _ = ws_sink.close().await;
            return;
        }
    };

    tokio::spawn(async move {
        while let Some(packet) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&packet) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode packet for {}: {}", connection_id, e);
                    continue;
                }
            };
            if let Err(e) = ws_sink.send(Message::Text(text)).await {
                debug!("Write to connection {} failed: {}", connection_id, e);
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    while let Some(frame) = ws_source.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientPacket>(&text) {
                Ok(packet) => {
                    if server_tx
                        .send(ServerMessage::PacketReceived {
                            connection_id,
                            packet,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Malformed packet from connection {}: {}", connection_id, e);
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {
                warn!("Ignoring binary frame from connection {}", connection_id);
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Read from connection {} failed: {}", connection_id, e);
                break;
            }
        }
    }

    let _ = server_tx.send(ServerMessage::Disconnected { connection_id });
}
