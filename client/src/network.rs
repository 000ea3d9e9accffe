use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use shared::{ClientPacket, ServerPacket};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("malformed packet: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("connection closed by server")]
    Closed,

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("server rejected request: {0}")]
    Server(String),

    #[error("session ended: {0}")]
    SessionEnded(String),

    #[error("not joined to a session")]
    NotJoined,
}

/// One WebSocket connection to the quiz server
pub struct QuizConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    fake_ping_ms: u64,
}

impl QuizConnection {
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        info!("Connecting to {}...", url);
        let (stream, _) = connect_async(url)
            .await
            .map_err(|source| ClientError::Connect {
                url: url.to_string(),
                source,
            })?;

        Ok(Self {
            stream,
            fake_ping_ms: 0,
        })
    }

    /// Delays every send and receive by half of `ms` to mimic a slow link
    pub fn with_fake_ping(mut self, ms: u64) -> Self {
        self.fake_ping_ms = ms;
        self
    }

    async fn simulate_latency(&self) {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }
    }

    pub async fn send(&mut self, packet: &ClientPacket) -> Result<(), ClientError> {
        self.simulate_latency().await;

        let text = serde_json::to_string(packet)?;
        debug!("-> {}", text);
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Next packet from the server, skipping control frames
    pub async fn recv(&mut self) -> Result<ServerPacket, ClientError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    self.simulate_latency().await;
                    debug!("<- {}", text);
                    return Ok(serde_json::from_str(&text)?);
                }
                Some(Ok(Message::Close(_))) | None => return Err(ClientError::Closed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Waits for the first packet `select` accepts
    ///
    /// `error` and `session_ended` packets abort the wait. Anything else
    /// `select` passes over is logged and dropped.
    pub async fn expect<T, F>(
        &mut self,
        what: &'static str,
        wait: Duration,
        mut select: F,
    ) -> Result<T, ClientError>
    where
        F: FnMut(ServerPacket) -> Option<T>,
    {
        let result = timeout(wait, async {
            loop {
                let packet = match self.recv().await {
                    Ok(packet) => packet,
                    Err(e) => return Err(e),
                };
                match packet {
                    ServerPacket::Error { message } => return Err(ClientError::Server(message)),
                    ServerPacket::SessionEnded { reason } => {
                        return Err(ClientError::SessionEnded(reason))
                    }
                    packet => {
                        let description = format!("{:?}", packet);
                        match select(packet) {
                            Some(value) => return Ok(value),
                            None => debug!("Skipping {} while waiting for {}", description, what),
                        }
                    }
                }
            }
        })
        .await;

        result.unwrap_or(Err(ClientError::Timeout(what)))
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
