use crate::config::LayoutConfig;
use crate::ir::{EntityNode, Point};
use crate::text_metrics::text_width;
use crate::theme::Theme;

use super::NodeGeometry;

/// Box size for an entity: wide enough for its title and every field,
/// never narrower than the configured minimum.
pub(crate) fn node_geometry(node: &EntityNode, theme: &Theme, config: &LayoutConfig) -> NodeGeometry {
    let title = text_width(&node.name, theme.title_font_size, &theme.font_family, config.fast_text);
    let widest_field = node
        .fields
        .iter()
        .map(|field| text_width(field, theme.field_font_size, &theme.font_family, config.fast_text))
        .fold(0.0f32, f32::max);
    let width = (title.max(widest_field) + config.node_padding_x * 2.0)
        .max(config.node_min_width)
        .ceil();
    let height = config.header_height + node.fields.len() as f32 * config.field_row_height;
    NodeGeometry {
        width,
        height,
        anchor: Point::new(width / 2.0, config.anchor_y),
    }
}
