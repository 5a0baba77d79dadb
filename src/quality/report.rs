use std::fmt;

use serde::Serialize;

use super::QualityThresholds;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lighting {
    VeryDark,
    Dark,
    Good,
    VeryBright,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContrastLevel {
    Low,
    Acceptable,
    Good,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Focus {
    Blurry,
    Sharp,
}

/// What the edge density suggests about the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneContent {
    /// Likely a blank or uniform scene.
    Blank,
    /// Few objects; inconclusive.
    Sparse,
    Moderate,
    /// Objects or people likely present.
    Busy,
}

/// A problem with the frame worth reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    Unreadable,
    VeryDark,
    Dark,
    Glare,
    LowContrast,
    Blurry,
    BlankScene,
    FewObjects,
}

impl QualityFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityFlag::Unreadable => "unreadable",
            QualityFlag::VeryDark => "very dark",
            QualityFlag::Dark => "dark",
            QualityFlag::Glare => "very bright/glare",
            QualityFlag::LowContrast => "low contrast",
            QualityFlag::Blurry => "blurry",
            QualityFlag::BlankScene => "likely blank/uniform scene",
            QualityFlag::FewObjects => "few objects, inconclusive",
        }
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image statistics explaining a low or empty detection count.
///
/// Qualitative levels are `None` only for an unreadable frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub width: u32,
    pub height: u32,
    /// Mean luminance, 0 to 255.
    pub brightness: f64,
    /// Luminance standard deviation.
    pub contrast: f64,
    /// Variance of the Laplacian of the luminance.
    pub sharpness: f64,
    /// Percentage of pixels on an edge.
    pub edge_density_percent: f64,
    pub lighting: Option<Lighting>,
    pub contrast_level: Option<ContrastLevel>,
    pub focus: Option<Focus>,
    pub scene_content: Option<SceneContent>,
    pub flags: Vec<QualityFlag>,
    pub recommendations: Vec<String>,
}

impl DiagnosticReport {
    pub fn unreadable() -> Self {
        Self {
            width: 0,
            height: 0,
            brightness: 0.0,
            contrast: 0.0,
            sharpness: 0.0,
            edge_density_percent: 0.0,
            lighting: None,
            contrast_level: None,
            focus: None,
            scene_content: None,
            flags: vec![QualityFlag::Unreadable],
            recommendations: vec!["frame could not be decoded; check the frame source".to_string()],
        }
    }

    pub fn has_flag(&self, flag: QualityFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Grade raw statistics against `thresholds`.
    pub(crate) fn grade(
        width: u32,
        height: u32,
        brightness: f64,
        contrast: f64,
        sharpness: f64,
        edge_density_percent: f64,
        thresholds: &QualityThresholds,
    ) -> Self {
        let t = thresholds;
        let lighting = if brightness < t.very_dark {
            Lighting::VeryDark
        } else if brightness < t.dark {
            Lighting::Dark
        } else if brightness > t.very_bright {
            Lighting::VeryBright
        } else {
            Lighting::Good
        };
        let contrast_level = if contrast < t.low_contrast {
            ContrastLevel::Low
        } else if contrast > t.good_contrast {
            ContrastLevel::Good
        } else {
            ContrastLevel::Acceptable
        };
        let focus = if sharpness < t.blurry {
            Focus::Blurry
        } else {
            Focus::Sharp
        };
        let scene_content = if edge_density_percent < t.edge_blank {
            SceneContent::Blank
        } else if edge_density_percent < t.edge_sparse {
            SceneContent::Sparse
        } else if edge_density_percent > t.edge_busy {
            SceneContent::Busy
        } else {
            SceneContent::Moderate
        };

        let mut flags = Vec::new();
        let mut recommendations = Vec::new();
        match lighting {
            Lighting::VeryDark => flags.push(QualityFlag::VeryDark),
            Lighting::Dark => flags.push(QualityFlag::Dark),
            Lighting::VeryBright => flags.push(QualityFlag::Glare),
            Lighting::Good => {}
        }
        match lighting {
            Lighting::VeryDark | Lighting::Dark => {
                recommendations.push("frame is too dark; improve lighting".to_string())
            }
            Lighting::VeryBright => recommendations
                .push("frame is washed out; reduce glare or exposure".to_string()),
            Lighting::Good => {}
        }
        if contrast_level == ContrastLevel::Low {
            flags.push(QualityFlag::LowContrast);
            recommendations.push("low contrast; check background and clothing".to_string());
        }
        if focus == Focus::Blurry {
            flags.push(QualityFlag::Blurry);
            recommendations.push("image is blurry; check focus or reduce motion".to_string());
        }
        match scene_content {
            SceneContent::Blank => flags.push(QualityFlag::BlankScene),
            SceneContent::Sparse => flags.push(QualityFlag::FewObjects),
            SceneContent::Moderate | SceneContent::Busy => {}
        }
        if matches!(scene_content, SceneContent::Blank | SceneContent::Sparse) {
            recommendations
                .push("very few objects in view; make sure the person is in frame".to_string());
        }

        Self {
            width,
            height,
            brightness,
            contrast,
            sharpness,
            edge_density_percent,
            lighting: Some(lighting),
            contrast_level: Some(contrast_level),
            focus: Some(focus),
            scene_content: Some(scene_content),
            flags,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(brightness: f64, contrast: f64, sharpness: f64, edges: f64) -> DiagnosticReport {
        DiagnosticReport::grade(
            640,
            480,
            brightness,
            contrast,
            sharpness,
            edges,
            &QualityThresholds::default(),
        )
    }

    #[test]
    fn lighting_bands() {
        assert_eq!(grade(49.9, 50.0, 500.0, 20.0).lighting, Some(Lighting::VeryDark));
        assert_eq!(grade(50.0, 50.0, 500.0, 20.0).lighting, Some(Lighting::Dark));
        assert_eq!(grade(100.0, 50.0, 500.0, 20.0).lighting, Some(Lighting::Good));
        assert_eq!(grade(200.0, 50.0, 500.0, 20.0).lighting, Some(Lighting::Good));
        assert_eq!(grade(200.1, 50.0, 500.0, 20.0).lighting, Some(Lighting::VeryBright));
    }

    #[test]
    fn contrast_focus_and_scene_bands() {
        let r = grade(150.0, 19.0, 99.0, 4.0);
        assert_eq!(r.contrast_level, Some(ContrastLevel::Low));
        assert_eq!(r.focus, Some(Focus::Blurry));
        assert_eq!(r.scene_content, Some(SceneContent::Blank));

        let r = grade(150.0, 60.0, 100.0, 7.0);
        assert_eq!(r.contrast_level, Some(ContrastLevel::Acceptable));
        assert_eq!(r.focus, Some(Focus::Sharp));
        assert_eq!(r.scene_content, Some(SceneContent::Sparse));

        let r = grade(150.0, 101.0, 100.0, 31.0);
        assert_eq!(r.contrast_level, Some(ContrastLevel::Good));
        assert_eq!(r.scene_content, Some(SceneContent::Busy));
        assert_eq!(grade(150.0, 60.0, 500.0, 20.0).scene_content, Some(SceneContent::Moderate));
    }

    #[test]
    fn good_frame_has_no_flags_or_recommendations() {
        let r = grade(150.0, 60.0, 500.0, 20.0);
        assert!(r.flags.is_empty());
        assert!(r.recommendations.is_empty());
    }

    #[test]
    fn poor_frame_collects_every_problem() {
        let r = grade(30.0, 5.0, 10.0, 1.0);
        assert_eq!(
            r.flags,
            vec![
                QualityFlag::VeryDark,
                QualityFlag::LowContrast,
                QualityFlag::Blurry,
                QualityFlag::BlankScene
            ]
        );
        assert_eq!(r.recommendations.len(), 4);
    }

    #[test]
    fn unreadable_report_is_zeroed_and_flagged() {
        let r = DiagnosticReport::unreadable();
        assert_eq!((r.width, r.height), (0, 0));
        assert_eq!(r.brightness, 0.0);
        assert_eq!(r.edge_density_percent, 0.0);
        assert_eq!(r.lighting, None);
        assert!(r.has_flag(QualityFlag::Unreadable));
        assert_eq!(QualityFlag::Unreadable.to_string(), "unreadable");
    }
}
