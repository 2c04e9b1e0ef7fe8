use crate::application::push_channel::ReconnectPolicy;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_ENDPOINT_HOST: &str = "case-study-26cf.onrender.com";

#[derive(Debug, Deserialize, Clone)]
pub struct FleetConfig {
    pub api: ApiSettings,
    pub push: PushSettings,
    pub session: SessionSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PushSettings {
    pub url: String,
    pub greeting: String,
    pub handshake_timeout_secs: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    pub tick_ms: u64,
    pub notification_ttl_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PushSettings {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            max_attempts: self.max_attempts,
        }
    }
}

impl SessionSettings {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }
}

/// Defaults, then `config/fleet.toml` if present, then `FLEET_*` variables
/// (`FLEET_API__BASE_URL`, `FLEET_PUSH__MAX_ATTEMPTS`, ...).
pub fn load_fleet_config() -> anyhow::Result<FleetConfig> {
    let settings = with_defaults()?
        .add_source(config::File::with_name("config/fleet").required(false))
        .add_source(environment())
        .build()?;

    Ok(settings.try_deserialize()?)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("FLEET")
        .prefix_separator("_")
        .separator("__")
}

fn with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("api.base_url", format!("https://{}", DEFAULT_ENDPOINT_HOST))?
        .set_default("api.request_timeout_secs", 10)?
        .set_default("push.url", format!("wss://{}", DEFAULT_ENDPOINT_HOST))?
        .set_default("push.greeting", "Hello")?
        .set_default("push.handshake_timeout_secs", 10)?
        .set_default("push.initial_backoff_ms", 1000)?
        .set_default("push.max_backoff_ms", 10_000)?
        .set_default("push.max_attempts", 8)?
        .set_default("session.tick_ms", 1000)?
        .set_default("session.notification_ttl_ms", 6000)?
        .set_default("server.bind", "127.0.0.1:8080")
}
