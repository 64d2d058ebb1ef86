//! Configuration file support for Repflow.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/repflow/config.toml`.

use crate::events::MotivationTheme;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Max heart rate used when neither a measured value nor an age is configured
pub const FALLBACK_MAX_HEART_RATE: u32 = 190;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub motivation: MotivationConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    /// Summary log written after each completed session
    pub fn summaries_path(&self) -> PathBuf {
        self.data_dir.join("wal").join("sessions.wal")
    }

    /// One-rep-max table
    pub fn maxes_path(&self) -> PathBuf {
        self.data_dir.join("maxes.json")
    }
}

/// Session execution parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_countdown_seconds")]
    pub countdown_seconds: u32,

    /// Measured maximum heart rate
    #[serde(default)]
    pub max_heart_rate: Option<u32>,

    /// Used to estimate max heart rate (220 - age) when none is measured
    #[serde(default)]
    pub age: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: default_countdown_seconds(),
            max_heart_rate: None,
            age: None,
        }
    }
}

impl SessionConfig {
    pub fn effective_max_heart_rate(&self) -> u32 {
        match (self.max_heart_rate, self.age) {
            (Some(max), _) if max > 0 => max,
            (_, Some(age)) if age < 220 => 220 - age,
            _ => FALLBACK_MAX_HEART_RATE,
        }
    }
}

/// Motivational messages and audio cues
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MotivationConfig {
    #[serde(default)]
    pub theme: MotivationTheme,

    #[serde(default = "default_audio_enabled")]
    pub audio_enabled: bool,

    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for MotivationConfig {
    fn default() -> Self {
        Self {
            theme: MotivationTheme::default(),
            audio_enabled: default_audio_enabled(),
            volume: default_volume(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("repflow")
}

fn default_countdown_seconds() -> u32 {
    5
}

fn default_audio_enabled() -> bool {
    true
}

fn default_volume() -> f32 {
    0.8
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.motivation.volume) {
            return Err(Error::Config(format!(
                "volume must be between 0.0 and 1.0, got {}",
                self.motivation.volume
            )));
        }
        if let Some(max) = self.session.max_heart_rate {
            if max == 0 || max > 250 {
                return Err(Error::Config(format!(
                    "max_heart_rate must be between 1 and 250, got {}",
                    max
                )));
            }
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("repflow").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.countdown_seconds, 5);
        assert_eq!(config.motivation.theme, MotivationTheme::Default);
        assert!(config.motivation.audio_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip_through_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.session.countdown_seconds = 3;
        config.session.age = Some(40);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.session.countdown_seconds, 3);
        assert_eq!(loaded.session.age, Some(40));
        assert_eq!(loaded.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[motivation]
theme = "coach"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.motivation.theme, MotivationTheme::Coach);
        assert_eq!(config.session.countdown_seconds, 5); // default
        assert_eq!(config.motivation.volume, 0.8); // default
    }

    #[test]
    fn test_effective_max_heart_rate() {
        let mut session = SessionConfig::default();
        assert_eq!(session.effective_max_heart_rate(), FALLBACK_MAX_HEART_RATE);

        session.age = Some(30);
        assert_eq!(session.effective_max_heart_rate(), 190);

        session.age = Some(50);
        assert_eq!(session.effective_max_heart_rate(), 170);

        session.max_heart_rate = Some(182);
        assert_eq!(session.effective_max_heart_rate(), 182);
    }

    #[test]
    fn test_invalid_volume_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[motivation]\nvolume = 4.0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
