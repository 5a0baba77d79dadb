use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::backend::BackendRole;
use crate::compliance::CompliancePolicy;
use crate::detect::ComplianceCategory;
use crate::error::ConfigError;
use crate::frame::DEFAULT_JPEG_QUALITY;
use crate::quality::QualityThresholds;

const DEFAULT_PRIMARY_URL: &str = "http://localhost:9001";
const DEFAULT_CLOUD_URL: &str = "https://detect.roboflow.com";
const DEFAULT_MODEL: &str = "ppe-detection-soydn";
const DEFAULT_MODEL_VERSION: &str = "1";
const DEFAULT_CONFIDENCE: f64 = 0.4;
const DEFAULT_OVERLAP: f64 = 0.3;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DIAGNOSTIC_FLOOR: usize = 0;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct InspectorConfigFile {
    backend: Option<BackendConfigFile>,
    policy: Option<PolicyConfigFile>,
    diagnostics: Option<DiagnosticsConfigFile>,
    quality: Option<QualityThresholds>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct BackendConfigFile {
    primary_url: Option<String>,
    cloud_url: Option<String>,
    model: Option<String>,
    version: Option<String>,
    api_key: Option<String>,
    confidence: Option<f64>,
    overlap: Option<f64>,
    timeout_secs: Option<u64>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PolicyConfigFile {
    required: Option<Vec<ComplianceCategory>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DiagnosticsConfigFile {
    floor: Option<usize>,
}

/// Connection and request settings shared by both backends.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub primary_url: String,
    pub cloud_url: String,
    pub model: String,
    pub version: String,
    pub api_key: String,
    /// Backend-side confidence threshold, also the policy gate.
    pub confidence: f64,
    /// Backend-side NMS overlap threshold.
    pub overlap: f64,
    /// Per-request timeout.
    pub timeout: Duration,
    pub jpeg_quality: u8,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            cloud_url: DEFAULT_CLOUD_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            version: DEFAULT_MODEL_VERSION.to_string(),
            api_key: String::new(),
            confidence: DEFAULT_CONFIDENCE,
            overlap: DEFAULT_OVERLAP,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl BackendConfig {
    /// Base URL for a backend role.
    pub fn endpoint(&self, role: BackendRole) -> &str {
        match role {
            BackendRole::Primary => &self.primary_url,
            BackendRole::Secondary => &self.cloud_url,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("api_key"));
        }
        validate_url("primary_url", &self.primary_url)?;
        validate_url("cloud_url", &self.cloud_url)?;
        if self.model.trim().is_empty() {
            return Err(ConfigError::Missing("model"));
        }
        if self.version.trim().is_empty() {
            return Err(ConfigError::Missing("version"));
        }
        validate_unit("confidence", self.confidence)?;
        validate_unit("overlap", self.overlap)?;
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid("timeout", "must be greater than zero"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::invalid("jpeg_quality", "must be within 1..=100"));
        }
        Ok(())
    }
}

/// Everything one inspection session needs. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectorConfig {
    pub backend: BackendConfig,
    pub policy: CompliancePolicy,
    pub quality: QualityThresholds,
    /// A diagnostic report is attached when canonical detections are at or below this count.
    pub diagnostic_floor: usize,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            policy: CompliancePolicy::default(),
            quality: QualityThresholds::default(),
            diagnostic_floor: DEFAULT_DIAGNOSTIC_FLOOR,
        }
    }
}

impl InspectorConfig {
    /// Load from the TOML file named by `PPE_CONFIG` (if set), then apply
    /// `PPE_*` environment overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("PPE_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Same as [`InspectorConfig::load`] with an explicit file path.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.validate()?;
        self.policy.validate()?;
        self.quality.validate()?;
        Ok(())
    }

    fn from_file(file: InspectorConfigFile) -> Result<Self, ConfigError> {
        let defaults = BackendConfig::default();
        let backend = file.backend.unwrap_or_default();
        let backend = BackendConfig {
            primary_url: backend.primary_url.unwrap_or(defaults.primary_url),
            cloud_url: backend.cloud_url.unwrap_or(defaults.cloud_url),
            model: backend.model.unwrap_or(defaults.model),
            version: backend.version.unwrap_or(defaults.version),
            api_key: backend.api_key.unwrap_or(defaults.api_key),
            confidence: backend.confidence.unwrap_or(defaults.confidence),
            overlap: backend.overlap.unwrap_or(defaults.overlap),
            timeout: backend
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            jpeg_quality: backend.jpeg_quality.unwrap_or(defaults.jpeg_quality),
        };
        let policy = match file.policy.and_then(|policy| policy.required) {
            Some(required) => CompliancePolicy::requiring(required),
            None => CompliancePolicy::default(),
        };
        Ok(Self {
            backend,
            policy,
            quality: file.quality.unwrap_or_default(),
            diagnostic_floor: file
                .diagnostics
                .and_then(|diagnostics| diagnostics.floor)
                .unwrap_or(DEFAULT_DIAGNOSTIC_FLOOR),
        })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = env_value("PPE_PRIMARY_URL") {
            self.backend.primary_url = url;
        }
        if let Some(url) = env_value("PPE_CLOUD_URL") {
            self.backend.cloud_url = url;
        }
        if let Some(model) = env_value("PPE_MODEL") {
            self.backend.model = model;
        }
        if let Some(version) = env_value("PPE_MODEL_VERSION") {
            self.backend.version = version;
        }
        if let Some(key) = env_value("PPE_API_KEY") {
            self.backend.api_key = key;
        }
        if let Some(confidence) = env_value("PPE_CONFIDENCE") {
            self.backend.confidence = confidence
                .parse()
                .map_err(|_| ConfigError::invalid("PPE_CONFIDENCE", "must be a number"))?;
        }
        if let Some(overlap) = env_value("PPE_OVERLAP") {
            self.backend.overlap = overlap
                .parse()
                .map_err(|_| ConfigError::invalid("PPE_OVERLAP", "must be a number"))?;
        }
        if let Some(timeout) = env_value("PPE_TIMEOUT_SECS") {
            let seconds: u64 = timeout.parse().map_err(|_| {
                ConfigError::invalid("PPE_TIMEOUT_SECS", "must be an integer number of seconds")
            })?;
            self.backend.timeout = Duration::from_secs(seconds);
        }
        if let Some(required) = env_value("PPE_REQUIRED_CATEGORIES") {
            let mut categories = Vec::new();
            for name in split_csv(&required) {
                let category = ComplianceCategory::parse(&name).ok_or_else(|| {
                    ConfigError::invalid(
                        "PPE_REQUIRED_CATEGORIES",
                        format!("unknown category '{}'", name),
                    )
                })?;
                categories.push(category);
            }
            self.policy = CompliancePolicy::requiring(categories);
        }
        if let Some(floor) = env_value("PPE_DIAGNOSTIC_FLOOR") {
            self.diagnostic_floor = floor.parse().map_err(|_| {
                ConfigError::invalid("PPE_DIAGNOSTIC_FLOOR", "must be a non-negative integer")
            })?;
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<InspectorConfigFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn validate_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| ConfigError::invalid(name, format!("'{}' is not a valid url: {}", value, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(name, format!("'{}' is not an http(s) url", value)));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::invalid(name, format!("'{}' has no host", value)));
    }
    Ok(())
}

fn validate_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(name, format!("{} is outside [0, 1]", value)));
    }
    Ok(())
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
