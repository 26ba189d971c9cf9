//! Application Configuration
//!
//! Capture, autofocus, recognition and teardown settings stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture settings
    pub capture: CaptureSettings,
    /// Autofocus cycle settings
    pub autofocus: AutofocusSettings,
    /// Recognition settings
    pub recognition: RecognitionSettings,
    /// Session lifecycle settings
    pub session: SessionSettings,
}

/// Capture-related settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Recognize successive frames without per-attempt user action
    pub continuous: bool,
    /// Invert luminance before recognition (light text on dark background)
    pub reverse_image: bool,
    /// Play a cue when a single-shot recognition starts
    pub beep: bool,
    /// Region of interest within each frame
    pub framing: FramingSettings,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            continuous: false,
            reverse_image: false,
            beep: true,
            framing: FramingSettings::default(),
        }
    }
}

/// Centered framing rectangle, sized relative to the frame and clamped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingSettings {
    pub width_fraction: f32,
    pub height_fraction: f32,
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for FramingSettings {
    fn default() -> Self {
        Self {
            width_fraction: 0.6,
            height_fraction: 0.2,
            min_width: 50,
            min_height: 20,
            max_width: 800,
            max_height: 600,
        }
    }
}

/// Autofocus cycle timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutofocusSettings {
    /// Delay before the next pass after a converged pass
    pub success_interval_ms: u64,
    /// Delay before the next pass after a failed pass
    pub failure_interval_ms: u64,
    /// Delay before a user-requested pass, so quick shutter presses are not slowed down
    pub user_focus_delay_ms: u64,
}

impl Default for AutofocusSettings {
    fn default() -> Self {
        Self {
            success_interval_ms: 4000,
            failure_interval_ms: 1500,
            user_focus_delay_ms: 350,
        }
    }
}

impl AutofocusSettings {
    /// Interval before the next cycle pass
    pub fn interval(&self, success: bool) -> Duration {
        if success {
            Duration::from_millis(self.success_interval_ms)
        } else {
            Duration::from_millis(self.failure_interval_ms)
        }
    }

    pub fn user_focus_delay(&self) -> Duration {
        Duration::from_millis(self.user_focus_delay_ms)
    }
}

/// Recognition-related settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Results with a lower mean confidence are rejected (0 accepts everything)
    pub min_mean_confidence: i32,
    /// Maximum number of concurrent recognition calls
    pub pool_size: usize,
    /// Reset engine state after every continuous recognition
    pub clear_after_continuous: bool,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            min_mean_confidence: 0,
            pool_size: 2,
            clear_after_continuous: true,
        }
    }
}

/// Session lifecycle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Upper bound on the wait for background workers at shutdown
    pub teardown_timeout_ms: u64,
    /// Upper bound on the wait for a state query reply
    pub query_timeout_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            teardown_timeout_ms: 500,
            query_timeout_ms: 250,
        }
    }
}

impl SessionSettings {
    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("org", "ocrcapture", "ocr-capture")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        // Check capture defaults
        assert!(!config.capture.continuous);
        assert!(!config.capture.reverse_image);
        assert!(config.capture.beep);
        assert!((config.capture.framing.width_fraction - 0.6).abs() < 0.001);
        assert_eq!(config.capture.framing.max_width, 800);

        // Check autofocus defaults
        assert_eq!(config.autofocus.success_interval_ms, 4000);
        assert_eq!(config.autofocus.failure_interval_ms, 1500);
        assert_eq!(config.autofocus.user_focus_delay_ms, 350);

        // Check recognition defaults
        assert_eq!(config.recognition.min_mean_confidence, 0);
        assert_eq!(config.recognition.pool_size, 2);
        assert!(config.recognition.clear_after_continuous);

        // Check session defaults
        assert_eq!(config.session.teardown_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_autofocus_interval_policy() {
        let settings = AutofocusSettings {
            success_interval_ms: 10,
            failure_interval_ms: 3,
            user_focus_delay_ms: 1,
        };
        assert_eq!(settings.interval(true), Duration::from_millis(10));
        assert_eq!(settings.interval(false), Duration::from_millis(3));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.capture.continuous = true;
        config.recognition.min_mean_confidence = 60;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            "[recognition]\nmin_mean_confidence = 75\n\n[capture]\ncontinuous = true\n",
        )
        .unwrap();

        assert_eq!(parsed.recognition.min_mean_confidence, 75);
        assert_eq!(parsed.recognition.pool_size, 2);
        assert!(parsed.capture.continuous);
        assert_eq!(parsed.autofocus, AutofocusSettings::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AppConfig::default();
        config.session.teardown_timeout_ms = 750;

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.session.teardown_timeout_ms, 750);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
