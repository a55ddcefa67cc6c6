//! Engine configuration.
//!
//! Every tunable has a default; a JSON file only needs the keys it
//! overrides.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::measure::NodeMetrics;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub node: NodeMetrics,
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub lod: LodConfig,
    pub router: RouterConfig,
    pub interaction: InteractionConfig,
    pub minimap: MinimapConfig,
}

impl EngineConfig {
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let node = &self.node;
        if node.width <= 0.0 || node.header_height <= 0.0 || node.row_height <= 0.0 {
            return Err(ConfigError::Invalid(
                "node dimensions must be positive".to_string(),
            ));
        }
        self.layout.validate(node)?;
        if self.viewport.wheel_sensitivity <= 0.0 {
            return Err(ConfigError::Invalid(
                "viewport.wheel_sensitivity must be positive".to_string(),
            ));
        }
        let lod = &self.lod;
        if lod.low_threshold > lod.medium_threshold
            || lod.interacting_low_threshold > lod.interacting_medium_threshold
        {
            return Err(ConfigError::Invalid(
                "lod low thresholds must not exceed medium thresholds".to_string(),
            ));
        }
        if lod.pop_min > lod.pop_max {
            return Err(ConfigError::Invalid(
                "lod.pop_min must not exceed lod.pop_max".to_string(),
            ));
        }
        Ok(())
    }
}

/// Grid packing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Column-count density `k` in `ceil(sqrt(n * k))`.
    pub density: f64,
    /// Horizontal distance between column origins.
    pub column_spacing: f64,
    pub row_gap: f64,
    pub margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            density: 1.2,
            column_spacing: 340.0,
            row_gap: 80.0,
            margin: 40.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self, node: &NodeMetrics) -> Result<(), ConfigError> {
        if !(self.density > 0.0) {
            return Err(ConfigError::Invalid(
                "layout.density must be positive".to_string(),
            ));
        }
        if self.column_spacing < node.width {
            return Err(ConfigError::Invalid(format!(
                "layout.column_spacing ({}) must be at least node.width ({})",
                self.column_spacing, node.width
            )));
        }
        if self.row_gap < 0.0 || self.margin < 0.0 {
            return Err(ConfigError::Invalid(
                "layout gaps must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub wheel_sensitivity: f64,
    /// Scale change per toolbar/keyboard zoom step.
    pub zoom_step: f64,
    /// Screen padding kept around content by fit-to-screen.
    pub fit_padding: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            wheel_sensitivity: 0.001,
            zoom_step: 0.1,
            fit_padding: 40.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    pub low_threshold: f64,
    pub medium_threshold: f64,
    pub interacting_low_threshold: f64,
    pub interacting_medium_threshold: f64,
    /// Screen-space margin around the viewport that still counts as visible.
    pub buffer_px: f64,
    /// Above this many visible tables, edges are only computed with a focus.
    pub edge_budget: usize,
    pub pop_min: f64,
    pub pop_max: f64,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            low_threshold: 0.35,
            medium_threshold: 0.6,
            interacting_low_threshold: 0.4,
            interacting_medium_threshold: 0.8,
            buffer_px: 200.0,
            edge_budget: 200,
            pop_min: 1.0,
            pop_max: 2.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub min_curve: f64,
    /// Fraction of the horizontal distance used as control-point offset.
    pub curvature: f64,
    pub stroke_width: f64,
    pub simplified_stroke_width: f64,
    /// Width of the invisible stroke used for edge hit testing.
    pub hit_stroke_width: f64,
    pub hit_samples: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            min_curve: 60.0,
            curvature: 0.5,
            stroke_width: 1.5,
            simplified_stroke_width: 3.0,
            hit_stroke_width: 15.0,
            hit_samples: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub search_debounce_ms: u64,
    pub interaction_idle_ms: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: 300,
            interaction_idle_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MinimapConfig {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for MinimapConfig {
    fn default() -> Self {
        Self {
            width: 200.0,
            height: 150.0,
            padding: 8.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json(r#"{ "layout": { "density": 1.5 } }"#).unwrap();
        assert_eq!(config.layout.density, 1.5);
        assert_eq!(config.layout.row_gap, 80.0);
        assert_eq!(config.lod.edge_budget, 200);
    }

    #[test]
    fn test_spacing_narrower_than_node_rejected() {
        let err = EngineConfig::from_json(r#"{ "layout": { "column_spacing": 10.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let input = r#"{ "lod": { "low_threshold": 0.9, "medium_threshold": 0.5 } }"#;
        assert!(EngineConfig::from_json(input).is_err());
    }
}
