use crate::ir::Point;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Host-supplied canvas configuration: zoom bounds, zoom steps and the size
/// of the visible surface in screen pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    pub width: f32,
    pub height: f32,
    pub zoom_step: f32,
    pub wheel_zoom_step: f32,
}

impl CanvasConfig {
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Bounds must be finite and positive; a bad bound falls back to its
    /// default. An inverted pair is swapped.
    pub fn normalize_scale_bounds(&mut self) {
        let defaults = Self::default();
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            tracing::warn!(min_scale = self.min_scale, "invalid minScale, using default");
            self.min_scale = defaults.min_scale;
        }
        if !(self.max_scale.is_finite() && self.max_scale > 0.0) {
            tracing::warn!(max_scale = self.max_scale, "invalid maxScale, using default");
            self.max_scale = defaults.max_scale;
        }
        if self.min_scale > self.max_scale {
            std::mem::swap(&mut self.min_scale, &mut self.max_scale);
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.5,
            max_scale: 3.0,
            width: 800.0,
            height: 500.0,
            zoom_step: 1.2,
            wheel_zoom_step: 1.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_min_width: f32,
    pub node_padding_x: f32,
    pub header_height: f32,
    pub field_row_height: f32,
    pub anchor_y: f32,
    pub grid_columns: usize,
    pub grid_spacing_x: f32,
    pub grid_spacing_y: f32,
    pub grid_origin: Point,
    pub fast_text: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_min_width: 150.0,
            node_padding_x: 10.0,
            header_height: 30.0,
            field_row_height: 20.0,
            anchor_y: 50.0,
            grid_columns: 3,
            grid_spacing_x: 200.0,
            grid_spacing_y: 200.0,
            grid_origin: Point::new(100.0, 100.0),
            fast_text: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub export_padding: f32,
    pub export_max_dimension: u32,
    pub font_family: String,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            export_padding: 40.0,
            export_max_dimension: 8192,
            font_family: "Inter".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub canvas: CanvasConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::modern();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            canvas: CanvasConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    title_font_size: Option<f32>,
    field_font_size: Option<f32>,
    label_font_size: Option<f32>,
    entity_fill: Option<String>,
    entity_border: Option<String>,
    title_color: Option<String>,
    field_color: Option<String>,
    line_color: Option<String>,
    edge_label_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanvasConfigFile {
    min_scale: Option<f32>,
    max_scale: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    zoom_step: Option<f32>,
    wheel_zoom_step: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_min_width: Option<f32>,
    node_padding_x: Option<f32>,
    header_height: Option<f32>,
    field_row_height: Option<f32>,
    anchor_y: Option<f32>,
    grid_columns: Option<usize>,
    grid_spacing_x: Option<f32>,
    grid_spacing_y: Option<f32>,
    grid_origin: Option<Point>,
    fast_text: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    export_padding: Option<f32>,
    export_max_dimension: Option<u32>,
    font_family: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    canvas: Option<CanvasConfigFile>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match Theme::from_name(theme_name) {
            Some(theme) => config.theme = theme,
            None => tracing::warn!(theme = theme_name, "unknown theme, keeping default"),
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.title_font_size {
            config.theme.title_font_size = v;
        }
        if let Some(v) = vars.field_font_size {
            config.theme.field_font_size = v;
        }
        if let Some(v) = vars.label_font_size {
            config.theme.label_font_size = v;
        }
        if let Some(v) = vars.entity_fill {
            config.theme.entity_fill = v;
        }
        if let Some(v) = vars.entity_border {
            config.theme.entity_border = v;
        }
        if let Some(v) = vars.title_color {
            config.theme.title_color = v;
        }
        if let Some(v) = vars.field_color {
            config.theme.field_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.edge_label_color {
            config.theme.edge_label_color = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
    }

    if let Some(canvas) = parsed.canvas {
        if let Some(v) = canvas.min_scale {
            config.canvas.min_scale = v;
        }
        if let Some(v) = canvas.max_scale {
            config.canvas.max_scale = v;
        }
        if let Some(v) = canvas.width {
            config.canvas.width = v;
        }
        if let Some(v) = canvas.height {
            config.canvas.height = v;
        }
        if let Some(v) = canvas.zoom_step {
            config.canvas.zoom_step = v;
        }
        if let Some(v) = canvas.wheel_zoom_step {
            config.canvas.wheel_zoom_step = v;
        }
        config.canvas.normalize_scale_bounds();
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.node_min_width {
            config.layout.node_min_width = v;
        }
        if let Some(v) = layout.node_padding_x {
            config.layout.node_padding_x = v;
        }
        if let Some(v) = layout.header_height {
            config.layout.header_height = v;
        }
        if let Some(v) = layout.field_row_height {
            config.layout.field_row_height = v;
        }
        if let Some(v) = layout.anchor_y {
            config.layout.anchor_y = v;
        }
        if let Some(v) = layout.grid_columns {
            config.layout.grid_columns = v.max(1);
        }
        if let Some(v) = layout.grid_spacing_x {
            config.layout.grid_spacing_x = v;
        }
        if let Some(v) = layout.grid_spacing_y {
            config.layout.grid_spacing_y = v;
        }
        if let Some(v) = layout.grid_origin {
            config.layout.grid_origin = v;
        }
        if let Some(v) = layout.fast_text {
            config.layout.fast_text = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.export_padding {
            config.render.export_padding = v;
        }
        if let Some(v) = render.export_max_dimension {
            config.render.export_max_dimension = v;
        }
        if let Some(v) = render.font_family {
            config.render.font_family = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_host_contract() {
        let config = Config::default();
        assert_eq!(config.canvas.min_scale, 0.5);
        assert_eq!(config.canvas.max_scale, 3.0);
        assert_eq!(config.canvas.zoom_step, 1.2);
    }

    #[test]
    fn parses_canvas_section_in_camel_case() {
        let config = parse_config(
            r#"{"canvas": {"minScale": 0.25, "maxScale": 4, "width": 1024, "height": 768}}"#,
        )
        .unwrap();
        assert_eq!(config.canvas.min_scale, 0.25);
        assert_eq!(config.canvas.max_scale, 4.0);
        assert_eq!(config.canvas.width, 1024.0);
        assert_eq!(config.canvas.height, 768.0);
    }

    #[test]
    fn swaps_inverted_scale_bounds() {
        let config = parse_config(r#"{"canvas": {"minScale": 3, "maxScale": 0.5}}"#).unwrap();
        assert_eq!(config.canvas.min_scale, 0.5);
        assert_eq!(config.canvas.max_scale, 3.0);
    }

    #[test]
    fn theme_variables_override_named_theme() {
        let config = parse_config(
            r##"{"theme": "classic", "themeVariables": {"lineColor": "#FF0000", "background": "#000000"}}"##,
        )
        .unwrap();
        assert_eq!(config.theme.line_color, "#FF0000");
        assert_eq!(config.theme.entity_border, Theme::classic().entity_border);
        assert_eq!(config.render.background, "#000000");
    }

    #[test]
    fn non_positive_scale_bounds_fall_back_to_defaults() {
        let config = parse_config(r#"{"canvas": {"minScale": 0, "maxScale": -2}}"#).unwrap();
        assert_eq!(config.canvas.min_scale, 0.5);
        assert_eq!(config.canvas.max_scale, 3.0);
        assert_eq!(config.canvas.clamp_scale(-5.0), 0.5);

        let config = parse_config(r#"{"canvas": {"minScale": -1, "maxScale": 0.25}}"#).unwrap();
        assert_eq!(config.canvas.min_scale, 0.25);
        assert_eq!(config.canvas.max_scale, 0.5);
    }

    #[test]
    fn layout_section_sets_padding_and_grid_origin() {
        let config = parse_config(
            r#"{"layout": {"nodePaddingX": 16, "gridOrigin": {"x": 40, "y": 60}}}"#,
        )
        .unwrap();
        assert_eq!(config.layout.node_padding_x, 16.0);
        assert_eq!(config.layout.grid_origin, Point::new(40.0, 60.0));
    }
}
