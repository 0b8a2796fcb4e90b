use std::{env, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 3113;
pub const DEFAULT_ROOM_PARAM: &str = "room_id";
pub const DEFAULT_USER_PARAM: &str = "user_id";
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Runtime settings for the hub, read from `ROOMCAST_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    pub port: u16,
    /// Query parameter carrying the room id on the upgrade request.
    pub room_param: String,
    /// Query parameter carrying the user id on the upgrade request.
    pub user_param: String,
    /// Frames a connection may have queued before it counts as a slow consumer.
    pub outbound_queue: usize,
    pub heartbeat_interval: Duration,
    pub idle_timeout: Duration,
    /// Admin routes are only mounted when this is set.
    pub admin_token: Option<String>,
    pub log_json: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            room_param: DEFAULT_ROOM_PARAM.to_string(),
            user_param: DEFAULT_USER_PARAM.to_string(),
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            heartbeat_interval: DEFAULT_HEARTBEAT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            admin_token: None,
            log_json: false,
        }
    }
}

impl HubConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset keys fall back
    /// to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = parse_or("ROOMCAST_PORT", &lookup, defaults.port)?;
        let room_param = non_empty_or("ROOMCAST_ROOM_PARAM", &lookup, defaults.room_param)?;
        let user_param = non_empty_or("ROOMCAST_USER_PARAM", &lookup, defaults.user_param)?;
        let outbound_queue = positive_or(
            "ROOMCAST_OUTBOUND_QUEUE",
            &lookup,
            defaults.outbound_queue as u64,
        )? as usize;
        let heartbeat_interval = Duration::from_secs(positive_or(
            "ROOMCAST_HEARTBEAT_SECONDS",
            &lookup,
            defaults.heartbeat_interval.as_secs(),
        )?);
        let idle_timeout = Duration::from_secs(positive_or(
            "ROOMCAST_IDLE_TIMEOUT_SECONDS",
            &lookup,
            defaults.idle_timeout.as_secs(),
        )?);
        let admin_token = lookup("ROOMCAST_ADMIN_TOKEN").filter(|t| !t.is_empty());
        let log_json = lookup("ROOMCAST_LOG_JSON")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.log_json);

        let config = Self {
            port,
            room_param,
            user_param,
            outbound_queue,
            heartbeat_interval,
            idle_timeout,
            admin_token,
            log_json,
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks. `from_lookup` and `Server::run` call this; a config
    /// built by hand and passed straight to `Server::serve` is not checked.
    ///
    /// Pongs answering the heartbeat are what keep a listen-only client's read
    /// side inside the idle timeout, so the first ping has to go out before
    /// the timeout fires.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval >= self.idle_timeout {
            return Err(ConfigError::HeartbeatNotBelowIdle {
                heartbeat: self.heartbeat_interval,
                idle: self.idle_timeout,
            });
        }
        Ok(())
    }
}

fn parse_or<F, T>(name: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

fn positive_or<F>(name: &'static str, lookup: &F, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(name, lookup, default)? {
        0 => Err(ConfigError::Zero { name }),
        n => Ok(n),
    }
}

fn non_empty_or<F>(name: &'static str, lookup: &F, default: String) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if value.trim().is_empty() => Err(ConfigError::Empty { name }),
        Some(value) => Ok(value.trim().to_string()),
        None => Ok(default),
    }
}
