//! Layout configuration.
//!
//! Two presets match the two views of a template: [`LayoutConfig::tree_view`]
//! for structural graphs (trees grow downward, siblings spread sideways) and
//! [`LayoutConfig::timeline`] for the timeline (time runs left to right,
//! independent trees stack vertically).

use serde::{Deserialize, Serialize};

use super::Orientation;

/// Spacing and orientation for one layout pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Which axis siblings and trees are spread along.
    pub orientation: Orientation,
    /// Node extent along the layout axis.
    pub node_breadth: f64,
    /// Node extent along the fixed axis.
    pub node_thickness: f64,
    /// Gap between adjacent sibling subtrees.
    pub sibling_spacing: f64,
    /// Gap between independent trees that would otherwise overlap.
    pub tree_spacing: f64,
    /// Fixed-axis distance between depths (structural view).
    pub level_spacing: f64,
    /// Fixed-axis units per second of offset (timeline view).
    pub time_scale: f64,
    /// Layout-axis coordinate trees are centered on.
    pub center: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::tree_view()
    }
}

impl LayoutConfig {
    /// Preset for structural graphs.
    pub fn tree_view() -> Self {
        Self {
            orientation: Orientation::Horizontal,
            node_breadth: 120.0,
            node_thickness: 60.0,
            sibling_spacing: 30.0,
            tree_spacing: 60.0,
            level_spacing: 120.0,
            time_scale: 0.0,
            center: 0.0,
        }
    }

    /// Preset for the timeline.
    pub fn timeline() -> Self {
        Self {
            orientation: Orientation::Vertical,
            node_breadth: 40.0,
            node_thickness: 40.0,
            sibling_spacing: 20.0,
            tree_spacing: 40.0,
            level_spacing: 0.0,
            time_scale: 1.0,
            center: 0.0,
        }
    }

    /// Compact preset for tests and previews.
    pub fn compact() -> Self {
        Self {
            node_breadth: 10.0,
            node_thickness: 10.0,
            sibling_spacing: 5.0,
            tree_spacing: 5.0,
            level_spacing: 20.0,
            ..Self::tree_view()
        }
    }

    /// Replace negative or non-finite values with zero.
    pub fn sanitized(mut self) -> Self {
        for value in [
            &mut self.node_breadth,
            &mut self.node_thickness,
            &mut self.sibling_spacing,
            &mut self.tree_spacing,
            &mut self.level_spacing,
            &mut self.time_scale,
        ] {
            if !value.is_finite() || *value < 0.0 {
                *value = 0.0;
            }
        }
        if !self.center.is_finite() {
            self.center = 0.0;
        }
        self
    }
}

/// Layout configuration for both views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Structural view.
    pub tree: LayoutConfig,
    /// Timeline view.
    pub timeline: LayoutConfig,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            tree: LayoutConfig::tree_view(),
            timeline: LayoutConfig::timeline(),
        }
    }
}

impl LayoutSettings {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(Self {
            tree: settings.tree.sanitized(),
            timeline: settings.timeline.sanitized(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_differ_in_orientation() {
        assert_eq!(LayoutConfig::tree_view().orientation, Orientation::Horizontal);
        assert_eq!(LayoutConfig::timeline().orientation, Orientation::Vertical);
        assert_eq!(LayoutConfig::default(), LayoutConfig::tree_view());
    }

    #[test]
    fn test_sanitized_clamps() {
        let config = LayoutConfig {
            sibling_spacing: -5.0,
            tree_spacing: f64::NAN,
            ..LayoutConfig::tree_view()
        }
        .sanitized();
        assert_eq!(config.sibling_spacing, 0.0);
        assert_eq!(config.tree_spacing, 0.0);
        assert_eq!(config.node_breadth, 120.0);
    }

    #[test]
    fn test_settings_from_partial_json() {
        let settings =
            LayoutSettings::from_json(r#"{"tree": {"sibling_spacing": 50.0}}"#)
                .unwrap();
        assert_eq!(settings.tree.sibling_spacing, 50.0);
        assert_eq!(settings.tree.node_breadth, 120.0);
        assert_eq!(settings.timeline, LayoutConfig::timeline());
    }
}
