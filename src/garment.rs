//! Garment views and their image assets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four photographed sides of a garment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GarmentView {
    #[default]
    Front,
    Back,
    Left,
    Right,
}

impl GarmentView {
    pub const ALL: [GarmentView; 4] = [
        GarmentView::Front,
        GarmentView::Back,
        GarmentView::Left,
        GarmentView::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GarmentView::Front => "front",
            GarmentView::Back => "back",
            GarmentView::Left => "left",
            GarmentView::Right => "right",
        }
    }
}

impl fmt::Display for GarmentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GarmentView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "front" => Ok(GarmentView::Front),
            "back" => Ok(GarmentView::Back),
            "left" => Ok(GarmentView::Left),
            "right" => Ok(GarmentView::Right),
            other => Err(format!("Unknown garment view: {}", other)),
        }
    }
}

/// Image resource for each garment view.
///
/// Exactly four views; unknown keys are rejected when deserialising.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GarmentImages {
    pub front: String,
    pub back: String,
    pub left: String,
    pub right: String,
}

impl GarmentImages {
    pub fn get(&self, view: GarmentView) -> &str {
        match view {
            GarmentView::Front => &self.front,
            GarmentView::Back => &self.back,
            GarmentView::Left => &self.left,
            GarmentView::Right => &self.right,
        }
    }

    /// Check that every view points at something
    pub fn validate(&self) -> Result<(), String> {
        for view in GarmentView::ALL {
            if self.get(view).trim().is_empty() {
                return Err(format!("Missing image for {} view", view));
            }
        }
        Ok(())
    }
}

/// Currently composited garment view.
///
/// Switching views never touches placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewSelector {
    current: GarmentView,
}

impl ViewSelector {
    pub fn current(&self) -> GarmentView {
        self.current
    }

    pub fn select(&mut self, view: GarmentView) {
        self.current = view;
    }

    /// Image for the selected view
    pub fn image<'a>(&self, images: &'a GarmentImages) -> &'a str {
        images.get(self.current)
    }
}

/// Per-garment adjustment of the auto-placement seed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarmentCalibration {
    /// Multiplier on the estimated scale
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f32,
    /// Vertical shift as a fraction of container height
    #[serde(default)]
    pub vertical_offset: f32,
}

fn default_scale_factor() -> f32 {
    1.0
}

impl Default for GarmentCalibration {
    fn default() -> Self {
        Self {
            scale_factor: default_scale_factor(),
            vertical_offset: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images() -> GarmentImages {
        GarmentImages {
            front: "f.png".into(),
            back: "b.png".into(),
            left: "l.png".into(),
            right: "r.png".into(),
        }
    }

    #[test]
    fn test_selector_maps_views() {
        let imgs = images();
        let mut selector = ViewSelector::default();
        assert_eq!(selector.image(&imgs), "f.png");
        selector.select(GarmentView::Right);
        assert_eq!(selector.image(&imgs), "r.png");
    }

    #[test]
    fn test_view_parse() {
        assert_eq!("Back".parse::<GarmentView>(), Ok(GarmentView::Back));
        assert!("top".parse::<GarmentView>().is_err());
    }

    #[test]
    fn test_images_reject_unknown_keys() {
        let json = r#"{"front":"a","back":"b","left":"c","right":"d","top":"e"}"#;
        assert!(serde_json::from_str::<GarmentImages>(json).is_err());
        let json = r#"{"front":"a","back":"b","left":"c"}"#;
        assert!(serde_json::from_str::<GarmentImages>(json).is_err());
    }

    #[test]
    fn test_images_validate() {
        let mut imgs = images();
        assert!(imgs.validate().is_ok());
        imgs.left = " ".into();
        assert!(imgs.validate().is_err());
    }
}
