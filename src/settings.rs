//! Settings management for the VTO server
//!
//! Handles loading/saving of the XML settings file.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::garment::GarmentCalibration;
use crate::placement::{PlacementConfig, PlacementState, StepConfig};

/// Environment variable holding the image model API key
pub const API_KEY_ENV: &str = "AI_INTEGRATIONS_GEMINI_API_KEY";
/// Environment variable overriding the image model base URL
pub const BASE_URL_ENV: &str = "AI_INTEGRATIONS_GEMINI_BASE_URL";

/// Placement defaults and input step sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSettings {
    #[serde(rename = "defaultOffsetX")]
    pub default_offset_x: f32,

    #[serde(rename = "defaultOffsetY")]
    pub default_offset_y: f32,

    #[serde(rename = "defaultScale")]
    pub default_scale: f32,

    /// Garment scale floor (must be > 0)
    #[serde(rename = "minScale")]
    pub min_scale: f32,

    /// Pixels per arrow key press
    #[serde(rename = "moveStep")]
    pub move_step: f32,

    #[serde(rename = "keyScaleStep")]
    pub key_scale_step: f32,

    #[serde(rename = "buttonScaleStep")]
    pub button_scale_step: f32,

    #[serde(rename = "wheelScaleStep")]
    pub wheel_scale_step: f32,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        let placement = PlacementConfig::default();
        let steps = StepConfig::default();
        Self {
            default_offset_x: placement.default_state.offset_x,
            default_offset_y: placement.default_state.offset_y,
            default_scale: placement.default_state.scale,
            min_scale: placement.min_scale,
            move_step: steps.move_step,
            key_scale_step: steps.key_scale_step,
            button_scale_step: steps.button_scale_step,
            wheel_scale_step: steps.wheel_scale_step,
        }
    }
}

impl PlacementSettings {
    pub fn placement_config(&self) -> PlacementConfig {
        PlacementConfig {
            default_state: PlacementState::new(
                self.default_offset_x,
                self.default_offset_y,
                self.default_scale,
            ),
            min_scale: self.min_scale,
        }
    }

    pub fn step_config(&self) -> StepConfig {
        StepConfig {
            move_step: self.move_step,
            key_scale_step: self.key_scale_step,
            button_scale_step: self.button_scale_step,
            wheel_scale_step: self.wheel_scale_step,
        }
    }

    /// Keep the scale floor positive and the default above it
    pub fn clamp(&mut self) {
        let fallback = PlacementConfig::default().min_scale;
        if !self.min_scale.is_finite() || self.min_scale <= 0.0 {
            self.min_scale = fallback;
        }
        if !self.default_scale.is_finite() {
            self.default_scale = PlacementState::DEFAULT.scale;
        }
        self.default_scale = self.default_scale.max(self.min_scale);
    }
}

/// Hosted image model settings (API key comes from the environment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    #[serde(rename = "model")]
    pub model: String,

    #[serde(rename = "baseUrl", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: crate::generation::gemini::DEFAULT_MODEL.to_string(),
            base_url: None,
            timeout_secs: 60,
        }
    }
}

/// Body-part segmentation model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationSettings {
    /// Whether the segmentation model may be loaded
    #[serde(rename = "enabled")]
    pub enabled: bool,

    /// ONNX part segmentation model file
    #[serde(rename = "modelPath", skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,

    /// Side of the square model input in pixels
    #[serde(rename = "inputSize")]
    pub input_size: u32,

    #[serde(rename = "intraThreads")]
    pub intra_threads: usize,

    /// Use the silhouette heuristic when the ONNX model cannot be loaded
    #[serde(rename = "silhouetteFallback")]
    pub silhouette_fallback: bool,

    /// Backdrop colour distance for the silhouette fallback
    #[serde(rename = "silhouetteThreshold")]
    pub silhouette_threshold: f32,
}

impl Default for SegmentationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model_path: None,
            input_size: 512,
            intra_threads: 4,
            silhouette_fallback: false,
            silhouette_threshold: crate::segmentation::silhouette::DEFAULT_THRESHOLD,
        }
    }
}

impl SegmentationSettings {
    /// Model file, if one is configured
    pub fn model_path(&self) -> Option<PathBuf> {
        self.model_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    pub fn clamp(&mut self) {
        if self.input_size < 32 {
            self.input_size = Self::default().input_size;
        }
        self.intra_threads = self.intra_threads.max(1);
        if !self.silhouette_threshold.is_finite() || self.silhouette_threshold <= 0.0 {
            self.silhouette_threshold = crate::segmentation::silhouette::DEFAULT_THRESHOLD;
        }
    }
}

/// Try-on session lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Sessions untouched for this long are dropped
    #[serde(rename = "idleTtlSecs")]
    pub idle_ttl_secs: u64,

    /// How often idle sessions are swept
    #[serde(rename = "sweepIntervalSecs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 30 * 60,
            sweep_interval_secs: 60,
        }
    }
}

impl SessionSettings {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Log output settings (`VTO_LOG` still overrides the level)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    #[serde(rename = "level")]
    pub level: String,

    #[serde(rename = "json")]
    pub json: bool,

    /// Log file; rotated files get a date suffix
    #[serde(rename = "file", skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// "daily", "hourly" or "never"
    #[serde(rename = "rotation")]
    pub rotation: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
            rotation: "daily".to_string(),
        }
    }
}

/// Server settings stored in the XML settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "VtoServer")]
pub struct ServerSettings {
    /// HTTP port (default 5000)
    #[serde(rename = "port", default = "default_port")]
    pub port: u16,

    #[serde(rename = "bindAddress", default = "default_bind_address")]
    pub bind_address: String,

    /// Whether permissive CORS headers are sent
    #[serde(rename = "corsEnabled", default = "default_true")]
    pub cors_enabled: bool,

    /// Largest accepted request body; photos arrive as data URLs
    #[serde(rename = "maxBodyBytes", default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// JSON file with the product catalog
    #[serde(rename = "catalogPath", default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<String>,

    /// Seed the built-in products into an empty catalog
    #[serde(rename = "seedCatalog", default = "default_true")]
    pub seed_catalog: bool,

    #[serde(rename = "placement", default)]
    pub placement: PlacementSettings,

    #[serde(rename = "calibration", default)]
    pub calibration: GarmentCalibration,

    #[serde(rename = "generation", default)]
    pub generation: GenerationSettings,

    #[serde(rename = "segmentation", default)]
    pub segmentation: SegmentationSettings,

    #[serde(rename = "sessions", default)]
    pub sessions: SessionSettings,

    #[serde(rename = "logging", default)]
    pub logging: LoggingSettings,
}

fn default_port() -> u16 {
    5000
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_true() -> bool {
    true
}

/// 25 MiB
fn default_max_body_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            cors_enabled: true,
            max_body_bytes: default_max_body_bytes(),
            catalog_path: None,
            seed_catalog: true,
            placement: PlacementSettings::default(),
            calibration: GarmentCalibration::default(),
            generation: GenerationSettings::default(),
            segmentation: SegmentationSettings::default(),
            sessions: SessionSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ServerSettings {
    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("VtoServer");
            p.push("settings.xml");
            p
        })
    }

    /// Load settings from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        let mut settings: Self = from_str(&contents).map_err(SettingsError::XmlParse)?;
        settings.placement.clamp();
        settings.segmentation.clamp();
        settings.catalog_path = settings.catalog_path.filter(|p| !p.trim().is_empty());
        settings.generation.base_url = settings
            .generation
            .base_url
            .filter(|u| !u.trim().is_empty());
        Ok(settings)
    }

    /// Load from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to load settings from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save settings to an XML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(SettingsError::Io)?;
        }

        let xml = to_string(self).map_err(SettingsError::XmlWrite)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);

        fs::write(path, formatted).map_err(SettingsError::Io)?;
        Ok(())
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let Some(path) = Self::default_path() else {
            return Err(SettingsError::NoConfigDir);
        };
        self.save_to_file(&path)?;
        Ok(path)
    }

    /// API key for the image model, if any
    pub fn generation_api_key() -> Option<String> {
        std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty())
    }

    /// Base URL for the image model, environment first
    pub fn generation_base_url(&self) -> Option<String> {
        std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|u| !u.is_empty())
            .or_else(|| self.generation.base_url.clone())
    }
}

/// Settings-related errors
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    XmlParse(quick_xml::DeError),
    XmlWrite(quick_xml::SeError),
    NoConfigDir,
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::XmlParse(e) => write!(f, "XML parse error: {}", e),
            SettingsError::XmlWrite(e) => write!(f, "XML write error: {}", e),
            SettingsError::NoConfigDir => write!(f, "Could not find config directory"),
        }
    }
}

impl std::error::Error for SettingsError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("vto-settings-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_default_settings() {
        let settings = ServerSettings::default();
        assert_eq!(settings.port, 5000);
        assert!(settings.cors_enabled);
        assert!(settings.seed_catalog);
        assert_eq!(settings.placement.min_scale, 0.1);
        assert_eq!(
            settings.placement.placement_config().default_state,
            PlacementState::DEFAULT
        );
        assert_eq!(settings.placement.step_config(), StepConfig::default());
        assert!(settings.segmentation.enabled);
        assert!(!settings.segmentation.silhouette_fallback);
        assert_eq!(settings.segmentation.model_path(), None);
        assert_eq!(settings.sessions.idle_ttl(), Duration::from_secs(1800));
        assert_eq!(settings.logging.rotation, "daily");
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("settings.xml");
        let mut settings = ServerSettings::default();
        settings.port = 8088;
        settings.catalog_path = Some("/srv/catalog.json".to_string());
        settings.placement.move_step = 5.0;
        settings.calibration.scale_factor = 0.6;
        settings.segmentation.model_path = Some("/srv/models/parts.onnx".to_string());
        settings.sessions.idle_ttl_secs = 600;
        settings.logging.file = Some("/var/log/vto/server.log".to_string());
        settings.save_to_file(&path).unwrap();

        let loaded = ServerSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let path = temp_path("partial.xml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "<VtoServer><port>7000</port></VtoServer>").unwrap();

        let loaded = ServerSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded.port, 7000);
        assert_eq!(loaded.bind_address, "0.0.0.0");
        assert_eq!(loaded.placement, PlacementSettings::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_placement_clamping() {
        let mut placement = PlacementSettings {
            min_scale: -1.0,
            default_scale: 0.01,
            ..PlacementSettings::default()
        };
        placement.clamp();
        assert_eq!(placement.min_scale, 0.1);
        assert_eq!(placement.default_scale, 0.1);
    }

    #[test]
    fn test_nested_sections_load() {
        let path = temp_path("nested.xml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            "<VtoServer>\
             <segmentation><modelPath>/models/parts.onnx</modelPath><inputSize>8</inputSize>\
             <intraThreads>0</intraThreads><silhouetteFallback>true</silhouetteFallback></segmentation>\
             <sessions><idleTtlSecs>120</idleTtlSecs><sweepIntervalSecs>0</sweepIntervalSecs></sessions>\
             <logging><level>debug</level><rotation>hourly</rotation></logging>\
             </VtoServer>",
        )
        .unwrap();

        let loaded = ServerSettings::load_from_file(&path).unwrap();
        assert!(loaded.segmentation.enabled);
        assert_eq!(
            loaded.segmentation.model_path(),
            Some(PathBuf::from("/models/parts.onnx"))
        );
        assert_eq!(loaded.segmentation.input_size, 512);
        assert_eq!(loaded.segmentation.intra_threads, 1);
        assert!(loaded.segmentation.silhouette_fallback);
        assert_eq!(loaded.sessions.idle_ttl(), Duration::from_secs(120));
        assert_eq!(loaded.sessions.sweep_interval(), Duration::from_secs(1));
        assert_eq!(loaded.logging.level, "debug");
        assert_eq!(loaded.logging.rotation, "hourly");
        assert!(!loaded.logging.json);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ServerSettings::load_from_file(&temp_path("missing.xml")).unwrap_err();
        assert!(matches!(err, SettingsError::Io(_)));
    }
}
