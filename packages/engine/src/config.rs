use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Engine configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix for generated room names ("room" yields names like "room-a3f9c1").
    pub room_name_prefix: String,
    /// Capacity of the per-listener broadcast channels used for push fan-out.
    pub channel_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            room_name_prefix: env::var("TINCAN_ROOM_PREFIX")
                .unwrap_or_else(|_| "room".to_string()),
            channel_capacity: env::var("TINCAN_CHANNEL_CAPACITY")
                .unwrap_or_else(|_| "256".to_string())
                .parse()
                .context("TINCAN_CHANNEL_CAPACITY must be a valid number")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            room_name_prefix: "room".to_string(),
            channel_capacity: 256,
        }
    }
}
