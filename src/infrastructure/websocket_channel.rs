// WebSocket transport for the push channel
use crate::application::errors::PushError;
use crate::application::push_channel::{PushConnection, PushConnector};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    handshake_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(url: String, handshake_timeout: Duration) -> Self {
        Self {
            url,
            handshake_timeout,
        }
    }
}

#[async_trait]
impl PushConnector for WebSocketConnector {
    async fn connect(&self) -> Result<Box<dyn PushConnection>, PushError> {
        tracing::debug!(url = %self.url, "Opening push channel");
        let handshake =
            tokio::time::timeout(self.handshake_timeout, connect_async(self.url.as_str()))
                .await
                .map_err(|_| PushError::HandshakeTimeout)?;
        let (stream, _response) = handshake.map_err(|e| PushError::Channel(e.to_string()))?;

        Ok(Box::new(WebSocketConnection { stream }))
    }
}

pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl PushConnection for WebSocketConnection {
    async fn send_text(&mut self, text: &str) -> Result<(), PushError> {
        self.stream
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| PushError::Channel(e.to_string()))
    }

    async fn next_text(&mut self) -> Option<Result<String, PushError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Ok(Message::Close(frame)) => {
                    tracing::debug!(frame = ?frame, "Push channel close frame");
                    return None;
                }
                // Pings are answered by tungstenite itself.
                Ok(_) => continue,
                Err(e) => return Some(Err(PushError::Channel(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "Push channel close failed");
        }
    }
}
