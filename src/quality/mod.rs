//! Frame-quality diagnostics.
//!
//! Used to explain a low or empty detection count: is the scene really empty,
//! or is the frame too dark, flat or blurred for the detector?
//!
//! All four statistics come from the luminance channel:
//! - brightness: mean luminance
//! - contrast: luminance standard deviation
//! - sharpness: variance of the discrete Laplacian
//! - edge density: share of pixels on a Canny edge

mod edges;
mod report;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::frame::Frame;

pub use report::{ContrastLevel, DiagnosticReport, Focus, Lighting, QualityFlag, SceneContent};

/// Calibration constants for the quality grades.
///
/// Camera placement and lighting differ per site, so every bound is
/// configurable (`[quality]` in the config file).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityThresholds {
    pub very_dark: f64,
    pub dark: f64,
    pub very_bright: f64,
    pub low_contrast: f64,
    pub good_contrast: f64,
    pub blurry: f64,
    /// Edge density percentages.
    pub edge_blank: f64,
    pub edge_sparse: f64,
    pub edge_busy: f64,
    /// Canny hysteresis thresholds on the Sobel gradient magnitude.
    pub canny_low: f64,
    pub canny_high: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            very_dark: 50.0,
            dark: 100.0,
            very_bright: 200.0,
            low_contrast: 20.0,
            good_contrast: 100.0,
            blurry: 100.0,
            edge_blank: 5.0,
            edge_sparse: 10.0,
            edge_busy: 30.0,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

impl QualityThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("quality.very_dark", self.very_dark),
            ("quality.dark", self.dark),
            ("quality.very_bright", self.very_bright),
            ("quality.low_contrast", self.low_contrast),
            ("quality.good_contrast", self.good_contrast),
            ("quality.blurry", self.blurry),
            ("quality.edge_blank", self.edge_blank),
            ("quality.edge_sparse", self.edge_sparse),
            ("quality.edge_busy", self.edge_busy),
            ("quality.canny_low", self.canny_low),
            ("quality.canny_high", self.canny_high),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(name, "must be a finite, non-negative number"));
            }
        }
        if self.canny_low <= 0.0 {
            return Err(ConfigError::invalid("quality.canny_low", "must be positive"));
        }
        ordered("quality.dark", self.very_dark, self.dark, "very_dark")?;
        ordered("quality.very_bright", self.dark, self.very_bright, "dark")?;
        ordered("quality.good_contrast", self.low_contrast, self.good_contrast, "low_contrast")?;
        ordered("quality.edge_sparse", self.edge_blank, self.edge_sparse, "edge_blank")?;
        ordered("quality.edge_busy", self.edge_sparse, self.edge_busy, "edge_sparse")?;
        ordered("quality.canny_high", self.canny_low, self.canny_high, "canny_low")?;
        Ok(())
    }
}

fn ordered(name: &'static str, lower: f64, upper: f64, lower_name: &str) -> Result<(), ConfigError> {
    if upper < lower {
        return Err(ConfigError::invalid(
            name,
            format!("must not be below {} ({})", lower_name, lower),
        ));
    }
    Ok(())
}

/// Computes a [`DiagnosticReport`] for a frame. Never fails.
#[derive(Clone, Debug, Default)]
pub struct FrameQualityAnalyzer {
    thresholds: QualityThresholds,
}

impl FrameQualityAnalyzer {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    pub fn analyze(&self, frame: &Frame) -> DiagnosticReport {
        let gray = frame.luminance();
        let pixels = gray.as_raw();
        let count = pixels.len() as f64;

        let mean = pixels.iter().map(|p| f64::from(*p)).sum::<f64>() / count;
        let variance = pixels
            .iter()
            .map(|p| {
                let d = f64::from(*p) - mean;
                d * d
            })
            .sum::<f64>()
            / count;

        let sharpness = edges::laplacian_variance(&gray);
        let edge_density_percent = edges::edge_density_percent(
            &gray,
            self.thresholds.canny_low,
            self.thresholds.canny_high,
        );

        DiagnosticReport::grade(
            frame.width(),
            frame.height(),
            mean,
            variance.sqrt(),
            sharpness,
            edge_density_percent,
            &self.thresholds,
        )
    }

    /// Decode and analyze compressed image bytes. Undecodable input yields
    /// [`DiagnosticReport::unreadable`].
    pub fn analyze_bytes(&self, bytes: &[u8]) -> DiagnosticReport {
        match Frame::decode(bytes) {
            Ok(frame) => self.analyze(&frame),
            Err(e) => {
                log::warn!("frame could not be decoded for diagnosis: {}", e);
                DiagnosticReport::unreadable()
            }
        }
    }
}
