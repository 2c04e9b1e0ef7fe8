// Push channel lifecycle - connect, greet, parse frames, reconnect with backoff
use crate::application::errors::PushError;
use crate::domain::vehicle::Vehicle;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const EVENT_BUFFER: usize = 100;

/// Opens duplex text channels to the push endpoint.
#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn PushConnection>, PushError>;
}

#[async_trait]
pub trait PushConnection: Send {
    async fn send_text(&mut self, text: &str) -> Result<(), PushError>;

    /// Next text frame; `None` once the peer has closed the channel.
    async fn next_text(&mut self) -> Option<Result<String, PushError>>;

    async fn close(&mut self);
}

/// What the manager forwards to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Snapshot(Vec<Vehicle>),
    Malformed(PushError),
    Disconnected(PushError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Delay before the next connect after `failures` consecutive failures,
    /// or `None` once `max_attempts` connects have failed in a row.
    pub fn delay_for(&self, failures: u32) -> Option<Duration> {
        if failures >= self.max_attempts {
            return None;
        }
        let factor = 2u32.saturating_pow(failures.saturating_sub(1));
        Some(self.initial_backoff.saturating_mul(factor).min(self.max_backoff))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
            max_attempts: 8,
        }
    }
}

#[derive(Deserialize)]
struct PushFrame {
    data: Vec<Vehicle>,
}

/// Validate a text frame as `{ "data": Vehicle[] }`.
pub fn parse_frame(text: &str) -> Result<Vec<Vehicle>, PushError> {
    serde_json::from_str::<PushFrame>(text)
        .map(|frame| frame.data)
        .map_err(|e| PushError::MalformedPayload {
            reason: e.to_string(),
        })
}

pub struct PushChannelManager {
    connector: Arc<dyn PushConnector>,
    greeting: String,
    policy: ReconnectPolicy,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl PushChannelManager {
    pub fn new(
        connector: Arc<dyn PushConnector>,
        greeting: String,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            connector,
            greeting,
            policy,
            shutdown: None,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Spawn the channel loop. Returns `None` if a channel is already running.
    pub fn start(&mut self) -> Option<mpsc::Receiver<PushEvent>> {
        if self.is_running() {
            tracing::warn!("Push channel already running");
            return None;
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let channel = ChannelLoop {
            connector: self.connector.clone(),
            greeting: self.greeting.clone(),
            policy: self.policy,
            events: tx,
            shutdown: shutdown_rx,
        };

        self.shutdown = Some(shutdown_tx);
        self.task = Some(tokio::spawn(channel.run()));
        Some(rx)
    }

    /// Close the channel and wait for the loop to exit.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Push channel task ended abnormally");
            }
        }
    }
}

struct ChannelLoop {
    connector: Arc<dyn PushConnector>,
    greeting: String,
    policy: ReconnectPolicy,
    events: mpsc::Sender<PushEvent>,
    shutdown: watch::Receiver<bool>,
}

enum Exit {
    Shutdown,
    Dropped(PushError),
}

impl ChannelLoop {
    async fn run(mut self) {
        let mut failures = 0u32;

        loop {
            let connected = tokio::select! {
                _ = self.shutdown.changed() => return,
                result = self.connector.connect() => result,
            };

            let failure = match connected {
                Ok(mut connection) => {
                    failures = 0;
                    tracing::info!("Push channel connected");
                    match self.serve(connection.as_mut()).await {
                        Exit::Shutdown => {
                            connection.close().await;
                            tracing::info!("Push channel closed");
                            return;
                        }
                        Exit::Dropped(err) => {
                            connection.close().await;
                            err
                        }
                    }
                }
                Err(err) => err,
            };

            tracing::warn!(error = %failure, "Push channel down");
            if self.events.send(PushEvent::Disconnected(failure)).await.is_err() {
                return;
            }

            failures += 1;
            let Some(delay) = self.policy.delay_for(failures) else {
                tracing::error!(
                    failures,
                    "Giving up on push channel, live updates stay paused"
                );
                return;
            };
            tracing::info!(
                failures,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting push channel"
            );

            tokio::select! {
                _ = self.shutdown.changed() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn serve(&mut self, connection: &mut dyn PushConnection) -> Exit {
        if let Err(err) = connection.send_text(&self.greeting).await {
            return Exit::Dropped(err);
        }

        loop {
            let frame = tokio::select! {
                _ = self.shutdown.changed() => return Exit::Shutdown,
                frame = connection.next_text() => frame,
            };

            let event = match frame {
                Some(Ok(text)) => match parse_frame(&text) {
                    Ok(vehicles) => {
                        tracing::debug!(vehicles = vehicles.len(), "Push snapshot received");
                        PushEvent::Snapshot(vehicles)
                    }
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            payload = %text,
                            "Dropping malformed push frame"
                        );
                        PushEvent::Malformed(err)
                    }
                },
                Some(Err(err)) => return Exit::Dropped(err),
                None => return Exit::Dropped(PushError::Closed),
            };

            if self.events.send(event).await.is_err() {
                return Exit::Shutdown;
            }
        }
    }
}
