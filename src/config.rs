use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::coordinator::PlaybackSettings;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: u64,
    pub bot_channel_id: u64,
    pub admin_role_id: Option<u64>,

    // Audio
    pub default_volume: f32,
    pub skip_vote_fraction: f64,
    pub max_playlist_size: usize,

    // Paths
    pub data_dir: PathBuf,

    // Límites
    pub max_playback_duration: u64, // En segundos
    pub source_timeout: u64,        // En segundos
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: required("DISCORD_TOKEN")?,
            application_id: required("APPLICATION_ID")?.parse()?,
            guild_id: required("GUILD_ID")?.parse()?,
            bot_channel_id: required("BOT_CHANNEL_ID")?.parse()?,
            admin_role_id: match std::env::var("ADMIN_ROLE_ID") {
                Ok(val) if !val.trim().is_empty() => Some(val.trim().parse()?),
                _ => None,
            },

            // Audio
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,
            skip_vote_fraction: std::env::var("SKIP_VOTE_FRACTION")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,
            max_playlist_size: std::env::var("MAX_PLAYLIST_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            // Paths
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "/app/data".to_string())
                .into(),

            // Límites
            max_playback_duration: std::env::var("MAX_PLAYBACK_DURATION")
                .unwrap_or_else(|_| "86400".to_string()) // 24 horas
                .parse()?,
            source_timeout: std::env::var("SOURCE_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Volume must be between 0.0 and 2.0
    /// - Skip vote fraction must be in (0.0, 1.0]
    /// - Durations, timeouts and playlist size must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN must not be empty");
        }

        if !(0.0..=2.0).contains(&self.default_volume) {
            anyhow::bail!(
                "Default volume must be between 0.0 and 2.0, got: {}",
                self.default_volume
            );
        }

        if !(self.skip_vote_fraction > 0.0 && self.skip_vote_fraction <= 1.0) {
            anyhow::bail!(
                "Skip vote fraction must be in (0.0, 1.0], got: {}",
                self.skip_vote_fraction
            );
        }

        if self.max_playback_duration == 0 {
            anyhow::bail!("Max playback duration must be greater than 0");
        }

        if self.source_timeout == 0 {
            anyhow::bail!("Source timeout must be greater than 0");
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("Max playlist size must be greater than 0");
        }

        Ok(())
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            max_duration: Duration::from_secs(self.max_playback_duration),
            vote_fraction: self.skip_vote_fraction,
        }
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout)
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The Discord token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {}, status channel: {}, admin role: {})\n  \
            Audio: {}% vol, skip quorum {}% of listeners, playlists up to {}\n  \
            Limits: {}s max playback, {}s source timeout\n  \
            Data: {}",
            self.application_id,
            self.guild_id,
            self.bot_channel_id,
            self.admin_role_id
                .map_or("-".to_string(), |id| id.to_string()),
            (self.default_volume * 100.0) as u32,
            (self.skip_vote_fraction * 100.0) as u32,
            self.max_playlist_size,
            self.max_playback_duration,
            self.source_timeout,
            self.data_dir.display()
        )
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} no está configurado", key))
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            application_id: 0,
            guild_id: 0,
            bot_channel_id: 0,
            admin_role_id: None,

            // Audio defaults
            default_volume: 0.5,
            skip_vote_fraction: 0.5,
            max_playlist_size: 100,

            // Path defaults
            data_dir: "/app/data".into(),

            // Limit defaults
            max_playback_duration: 86400, // 24 hours
            source_timeout: 30,
        }
    }
}
