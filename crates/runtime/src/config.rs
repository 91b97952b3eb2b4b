//! Application configuration

use crate::RuntimeError;
use motor_control::MotorConfig;
use roi_mask::{GateConfig, MaskParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Base name of the optional configuration file (`roi-guard.toml`, `.json`, ...)
pub const DEFAULT_CONFIG_NAME: &str = "roi-guard";

/// Environment variable prefix; nested keys use `__`
pub const ENV_PREFIX: &str = "ROI_GUARD";

/// Application configuration
///
/// Passed by value to the components that need it; only the orchestrator
/// writes it back to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Region document location
    pub regions_path: PathBuf,

    /// Mask selected at startup; first mask by name when unset
    pub mask: Option<String>,

    /// Detection gate thresholds
    pub confidence_threshold: f32,
    pub overlap_threshold: f64,

    /// Rasterization binarization
    pub mask_threshold: u8,
    pub mask_max_value: u8,

    /// Occupancy grid (runtime frame) resolution
    pub frame_width: u32,
    pub frame_height: u32,

    /// Resolution the regions were authored at
    pub reference_width: u32,
    pub reference_height: u32,

    /// Detector input resolution
    pub inference_width: u32,
    pub inference_height: u32,

    /// Motor board serial link
    pub serial_port: String,
    pub baud_rate: u32,

    /// Motor behavior
    pub motor_speed: u8,
    pub auto_resume: bool,
    pub auto_screenshot: bool,
    pub screenshots_dir: PathBuf,

    /// Stop the motor when no frame arrives for this long
    pub watchdog_ms: Option<u64>,

    /// Logging
    pub log_level: String,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            regions_path: PathBuf::from("regions.json"),
            mask: None,
            confidence_threshold: 0.45,
            overlap_threshold: 0.10,
            mask_threshold: 127,
            mask_max_value: 255,
            frame_width: 1280,
            frame_height: 720,
            reference_width: roi_regions::REFERENCE_WIDTH,
            reference_height: roi_regions::REFERENCE_HEIGHT,
            inference_width: 640,
            inference_height: 360,
            serial_port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            motor_speed: 255,
            auto_resume: false,
            auto_screenshot: true,
            screenshots_dir: PathBuf::from("screenshots"),
            watchdog_ms: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load from an optional file layered under the environment
    ///
    /// Without an explicit path, `roi-guard.{toml,json,yaml,...}` in the
    /// working directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self, RuntimeError> {
        let file = match path {
            Some(p) => ::config::File::from(p).required(true),
            None => ::config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config: AppConfig = ::config::Config::builder()
            .add_source(file)
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        let invalid = |msg: String| Err(RuntimeError::InvalidConfig(msg));

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return invalid(format!(
                "confidence_threshold {} outside [0, 1]",
                self.confidence_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return invalid(format!(
                "overlap_threshold {} outside [0, 1]",
                self.overlap_threshold
            ));
        }
        if self.mask_max_value <= self.mask_threshold {
            return invalid(format!(
                "mask_max_value {} must exceed mask_threshold {}",
                self.mask_max_value, self.mask_threshold
            ));
        }
        for (name, (w, h)) in [
            ("frame", self.frame_size()),
            ("reference", self.reference_size()),
            ("inference", self.inference_size()),
        ] {
            if w == 0 || h == 0 {
                return invalid(format!("{} resolution {}x{} is empty", name, w, h));
            }
        }
        if self.watchdog_ms == Some(0) {
            return invalid("watchdog_ms must be positive".to_string());
        }
        Ok(())
    }

    /// Write as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), RuntimeError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Merge the operator-tunable settings into the JSON file at `path`
    ///
    /// Only `motor_speed`, `confidence_threshold` and `overlap_threshold` are
    /// written. Every other key keeps what the file already says, so
    /// command-line overrides for a single run never reach disk.
    pub fn save_operator_settings(&self, path: &Path) -> Result<(), RuntimeError> {
        let mut root = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str::<serde_json::Value>(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                serde_json::Value::Object(serde_json::Map::new())
            }
            Err(e) => return Err(e.into()),
        };
        let Some(fields) = root.as_object_mut() else {
            return Err(RuntimeError::InvalidConfig(format!(
                "{} is not a JSON object",
                path.display()
            )));
        };
        fields.insert("motor_speed".into(), serde_json::json!(self.motor_speed));
        fields.insert(
            "confidence_threshold".into(),
            serde_json::json!(self.confidence_threshold),
        );
        fields.insert(
            "overlap_threshold".into(),
            serde_json::json!(self.overlap_threshold),
        );

        std::fs::write(path, serde_json::to_string_pretty(&root)?)?;
        debug!("Saved operator settings to {}", path.display());
        Ok(())
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    pub fn reference_size(&self) -> (u32, u32) {
        (self.reference_width, self.reference_height)
    }

    pub fn inference_size(&self) -> (u32, u32) {
        (self.inference_width, self.inference_height)
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            confidence_threshold: self.confidence_threshold,
            overlap_threshold: self.overlap_threshold,
        }
    }

    pub fn mask_params(&self) -> MaskParams {
        MaskParams {
            threshold: self.mask_threshold,
            max_value: self.mask_max_value,
        }
    }

    pub fn motor_config(&self) -> MotorConfig {
        MotorConfig {
            speed: self.motor_speed,
            auto_resume: self.auto_resume,
            auto_snapshot: self.auto_screenshot,
        }
    }

    pub fn watchdog(&self) -> Option<Duration> {
        self.watchdog_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gate_config(), GateConfig::default());
        assert_eq!(config.mask_params(), MaskParams::default());
        assert_eq!(config.motor_config(), MotorConfig::default());
        assert_eq!(config.watchdog(), None);
    }

    #[test]
    fn test_load_toml_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guard.toml");
        std::fs::write(
            &path,
            "motor_speed = 180\nauto_resume = true\nmask = \"line-2\"\nwatchdog_ms = 500\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.motor_speed, 180);
        assert!(config.auto_resume);
        assert_eq!(config.mask.as_deref(), Some("line-2"));
        assert_eq!(config.watchdog(), Some(Duration::from_millis(500)));
        assert_eq!(config.baud_rate, 9600);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guard.json");
        std::fs::write(&path, r#"{ "overlap_threshold": 1.5 }"#).unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(RuntimeError::InvalidConfig(_))
        ));

        let config = AppConfig {
            mask_threshold: 200,
            mask_max_value: 100,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            frame_width: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_then_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guard.json");
        let config = AppConfig {
            motor_speed: 42,
            confidence_threshold: 0.5,
            ..AppConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.motor_speed, 42);
        assert_eq!(loaded.confidence_threshold, 0.5);
    }

    #[test]
    fn test_operator_settings_merged_into_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guard.json");
        std::fs::write(
            &path,
            r#"{"serial_port": "/dev/ttyUSB1", "motor_speed": 200, "custom": 1}"#,
        )
        .unwrap();

        let mut config = AppConfig::load(Some(&path)).unwrap();
        config.serial_port = "/dev/ttyACM9".to_string();
        config.regions_path = PathBuf::from("/tmp/other.json");
        config.mask = Some("night".to_string());
        config.motor_speed = 90;
        config.overlap_threshold = 0.3;
        config.save_operator_settings(&path).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["serial_port"], "/dev/ttyUSB1");
        assert_eq!(saved["custom"], 1);
        assert_eq!(saved["motor_speed"], 90);
        assert!(saved.get("regions_path").is_none());
        assert!(saved.get("mask").is_none());

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.serial_port, "/dev/ttyUSB1");
        assert_eq!(loaded.motor_speed, 90);
        assert_eq!(loaded.overlap_threshold, 0.3);
        assert_eq!(loaded.mask, None);
    }

    #[test]
    fn test_operator_settings_create_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.json");
        let config = AppConfig {
            motor_speed: 10,
            ..AppConfig::default()
        };
        config.save_operator_settings(&path).unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.motor_speed, 10);
        assert_eq!(loaded.serial_port, AppConfig::default().serial_port);
    }
}
