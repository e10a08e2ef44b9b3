use std::path::Path;

use miette::{Context, IntoDiagnostic, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::CoverOffset,
    paint::{Color, ColorStop},
    text::FontSpec,
};

/// Typography and line budget of one text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextStyle {
    pub font: FontSpec,
    /// distance between the tops of consecutive lines, in pixels
    pub line_height: f64,
    pub max_lines: usize,
    /// wrap width as a fraction of the canvas width
    pub max_width_ratio: f64,
}

/// Layout policy of a preview card. Ratios are fractions of the canvas size,
/// everything else is in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RenderConfig {
    /// left edge of both text blocks
    pub margin_x_ratio: f64,
    /// top of the first title line
    pub title_y_ratio: f64,
    pub title: TextStyle,
    pub subtitle: TextStyle,
    /// space between the title's used height and the subtitle
    pub subtitle_gap: f64,
    pub text_color: Color,
    /// overlay stops along the bottom (offset 0) to top (offset 1) line
    pub overlay_stops: Vec<ColorStop>,
    /// which part of the background survives the cover crop
    pub image_offset: CoverOffset,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            margin_x_ratio: 0.06,
            title_y_ratio: 0.5,
            title: TextStyle {
                font: FontSpec::new("Inter-var", 600, 128.0),
                line_height: 132.0,
                max_lines: 2,
                max_width_ratio: 0.7,
            },
            subtitle: TextStyle {
                font: FontSpec::new("Inter-var", 500, 48.0),
                line_height: 54.0,
                max_lines: 1,
                max_width_ratio: 0.7,
            },
            subtitle_gap: 54.0,
            text_color: Color::WHITE,
            overlay_stops: vec![
                ColorStop::new(0.0, Color::BLACK),
                ColorStop::new(1.0, Color::TRANSPARENT),
            ],
            image_offset: CoverOffset::CENTER,
        }
    }
}

impl RenderConfig {
    /// Read a JSON config; fields left out keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&contents)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to parse config {}", path.display()))
    }

    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(RenderConfig);
        serde_json::to_string_pretty(&schema).into_diagnostic()
    }
}
