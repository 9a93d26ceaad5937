use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub title_font_size: f32,
    pub field_font_size: f32,
    pub label_font_size: f32,
    pub entity_fill: String,
    pub entity_border: String,
    pub entity_border_width: f32,
    pub entity_corner_radius: f32,
    pub title_color: String,
    pub field_color: String,
    pub line_color: String,
    pub line_width: f32,
    pub edge_label_color: String,
    pub background: String,
}

impl Theme {
    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            title_font_size: 14.0,
            field_font_size: 12.0,
            label_font_size: 12.0,
            entity_fill: "#FFFFFF".to_string(),
            entity_border: "#2563EB".to_string(),
            entity_border_width: 2.0,
            entity_corner_radius: 8.0,
            title_color: "#1E293B".to_string(),
            field_color: "#64748B".to_string(),
            line_color: "#CBD5E1".to_string(),
            line_width: 2.0,
            edge_label_color: "#64748B".to_string(),
            background: "#F1F5F9".to_string(),
        }
    }

    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            title_font_size: 16.0,
            field_font_size: 13.0,
            label_font_size: 12.0,
            entity_fill: "#ECECFF".to_string(),
            entity_border: "#9370DB".to_string(),
            entity_border_width: 1.4,
            entity_corner_radius: 4.0,
            title_color: "#333333".to_string(),
            field_color: "#333333".to_string(),
            line_color: "#333333".to_string(),
            line_width: 1.4,
            edge_label_color: "#333333".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "modern" => Some(Self::modern()),
            "classic" | "default" | "base" => Some(Self::classic()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::modern()
    }
}
