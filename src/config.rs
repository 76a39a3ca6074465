//! Application configuration management.

use std::path::{Path, PathBuf};

use color_eyre::Result;
use serde::{Deserialize, Serialize};

use crate::client::auth::{parse_expiry, Session};
use crate::client::models::Quality;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// OAuth credentials
    #[serde(default)]
    pub session: SessionConfig,

    /// Player configuration
    #[serde(default)]
    pub player: PlayerConfig,

    /// What was playing when the app last quit
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// UI configuration
    #[serde(default)]
    pub ui: UiConfig,

    /// Where this config was loaded from and will be saved to
    #[serde(skip)]
    path: Option<PathBuf>,
}

/// Stored OAuth session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// OAuth client id used for device login
    #[serde(default)]
    pub client_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(default)]
    pub token_type: String,

    #[serde(default)]
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: String,

    /// RFC 3339 expiry of the access token
    #[serde(default)]
    pub expiry_time: String,
}

/// Player configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Audio quality index (0-4)
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Volume times ten (0-10)
    #[serde(default = "default_volume")]
    pub last_volume: i32,
}

/// Last playing track and list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub last_playing_song_id: Option<String>,

    /// Textual form of the playback context source
    #[serde(default)]
    pub last_playing_list_id: Option<String>,
}

/// UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Show the queue panel
    #[serde(default = "default_true")]
    pub show_queue: bool,

    /// Show album art (requires sixel/kitty support)
    #[serde(default = "default_true")]
    pub show_album_art: bool,

    /// Scratch directory for downloaded images
    #[serde(default = "default_image_cache_dir")]
    pub image_cache_dir: PathBuf,
}

fn default_quality() -> u8 {
    Quality::default().index()
}

fn default_volume() -> i32 {
    8
}

fn default_true() -> bool {
    true
}

fn default_image_cache_dir() -> PathBuf {
    PathBuf::from("tmp_img")
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            last_volume: default_volume(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_queue: true,
            show_album_art: true,
            image_cache_dir: default_image_cache_dir(),
        }
    }
}

impl Config {
    /// Get the default configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine config directory"))?;

        Ok(config_dir.join("tide-tui").join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            toml::from_str::<Config>(&contents)?
        } else {
            Self::default()
        };

        config.player.last_volume = config.player.last_volume.clamp(0, 10);
        config.player.quality = Quality::from_index(config.player.quality).index();
        config.path = Some(path);

        Ok(config)
    }

    /// Save configuration to the file it was loaded from.
    pub fn save(&self) -> Result<()> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => Self::config_path()?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        Ok(())
    }

    /// Saved volume as linear gain.
    pub fn volume(&self) -> f32 {
        self.player.last_volume as f32 / 10.0
    }

    /// Store a linear gain, truncated to tenths. Returns the stored value.
    pub fn set_volume(&mut self, volume: f32) -> i32 {
        self.player.last_volume = ((volume.clamp(0.0, 1.0) * 10.0) as i32).clamp(0, 10);
        self.player.last_volume
    }

    pub fn quality(&self) -> Quality {
        Quality::from_index(self.player.quality)
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.player.quality = quality.index();
    }

    /// Build the API session from the stored tokens.
    pub fn session(&self) -> Session {
        Session {
            token_type: self.session.token_type.clone(),
            access_token: self.session.access_token.clone(),
            refresh_token: self.session.refresh_token.clone(),
            expiry_time: parse_expiry(&self.session.expiry_time),
            quality: self.quality(),
            ..Session::default()
        }
    }

    /// Copy the tokens of a live session into the stored settings.
    pub fn store_tokens(&mut self, session: &Session) {
        self.session.token_type = session.token_type.clone();
        self.session.access_token = session.access_token.clone();
        self.session.refresh_token = session.refresh_token.clone();
        self.session.expiry_time = session
            .expiry_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
    }

    /// Forget the stored tokens, keeping the client credentials.
    pub fn clear_tokens(&mut self) {
        self.session = SessionConfig {
            client_id: std::mem::take(&mut self.session.client_id),
            client_secret: self.session.client_secret.take(),
            ..SessionConfig::default()
        };
    }

    /// Remember the playing track and its list for the next start.
    pub fn remember_playing(&mut self, song_id: Option<String>, list_id: Option<String>) {
        self.playback.last_playing_song_id = song_id;
        self.playback.last_playing_list_id = list_id;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn test_volume_is_stored_in_tenths() {
        let mut config = Config::default();
        assert_eq!(config.set_volume(0.47), 4);
        assert_eq!(config.player.last_volume, 4);
        assert_eq!(config.volume(), 0.4);
        assert_eq!(config.set_volume(1.5), 10);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().join("none.toml").as_path())).unwrap();
        assert_eq!(config.player.last_volume, 8);
        assert_eq!(config.quality(), Quality::HighLossless);
        assert_eq!(config.ui.image_cache_dir, PathBuf::from("tmp_img"));
        assert!(config.playback.last_playing_song_id.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::load(Some(path.as_path())).unwrap();
        config.set_volume(0.3);
        config.set_quality(Quality::HiRes);
        config.remember_playing(Some(String::from("77")), Some(String::from("album:5")));
        config.save().unwrap();

        let reloaded = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(reloaded.player.last_volume, 3);
        assert_eq!(reloaded.quality(), Quality::HiRes);
        assert_eq!(
            reloaded.playback.last_playing_song_id.as_deref(),
            Some("77")
        );
        assert_eq!(
            reloaded.playback.last_playing_list_id.as_deref(),
            Some("album:5")
        );
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[player]\nquality = 9\nlast_volume = 40\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.player.last_volume, 10);
        assert_eq!(config.player.quality, Quality::default().index());
    }

    #[test]
    fn test_tokens_round_trip_through_session() {
        let mut config = Config::default();
        config.session.client_id = String::from("client");

        let session = Session {
            token_type: String::from("Bearer"),
            access_token: String::from("access"),
            refresh_token: String::from("refresh"),
            expiry_time: Some(Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap()),
            ..Session::default()
        };
        config.store_tokens(&session);

        let restored = config.session();
        assert_eq!(restored.access_token, "access");
        assert_eq!(restored.refresh_token, "refresh");
        assert_eq!(restored.expiry_time, session.expiry_time);

        config.clear_tokens();
        assert!(config.session.access_token.is_empty());
        assert_eq!(config.session.client_id, "client");
    }
}
