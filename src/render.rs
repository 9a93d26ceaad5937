use crate::ir::{DiagramModel, Point, RelationshipEdge};
use crate::layout::{Bounds, LayoutState, ViewTransform};
use crate::text_metrics::text_width;
use crate::theme::Theme;
use anyhow::Result;
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::path::Path;

// Labels sit slightly above the line they annotate.
const LABEL_RISE: f32 = 5.0;
const LABEL_PAD_X: f32 = 4.0;
const LABEL_PAD_Y: f32 = 2.0;
const LABEL_NUDGE_ATTEMPTS: usize = 6;

/// Everything needed to draw one frame. Built from state by
/// [`render_scene`]; drawing never feeds back into state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub width: f32,
    pub height: f32,
    pub transform: ViewTransform,
    pub nodes: Vec<NodeBox>,
    pub edges: Vec<EdgeSegment>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Scene {
    pub fn edge(&self, source: &str, target: &str) -> Option<&EdgeSegment> {
        self.edges
            .iter()
            .find(|edge| edge.source == source && edge.target == target)
    }

    pub fn node(&self, id: &str) -> Option<&NodeBox> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// World-space box around nodes and edge labels.
    pub fn content_bounds(&self, theme: &Theme) -> Option<Bounds> {
        let nodes = self
            .nodes
            .iter()
            .map(|node| Bounds::from_rect(node.origin, node.width, node.height));
        let labels = self
            .edges
            .iter()
            .filter(|edge| !edge.label.is_empty())
            .map(|edge| label_box(edge, theme));
        nodes.chain(labels).reduce(Bounds::union)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeBox {
    pub id: String,
    pub name: String,
    pub fields: Vec<String>,
    pub origin: Point,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeSegment {
    pub index: usize,
    pub source: String,
    pub target: String,
    pub from: Point,
    pub to: Point,
    pub label: String,
    pub label_at: Point,
    pub label_width: f32,
    pub cardinality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Diagnostic {
    DanglingEdge {
        index: usize,
        source: String,
        target: String,
        missing: Vec<String>,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingEdge {
                index,
                source,
                target,
                missing,
            } => write!(
                f,
                "edge {index} ({source} -> {target}) references unknown node(s): {}",
                missing.join(", ")
            ),
        }
    }
}

/// Segment for one edge from the current anchors of its endpoints.
pub fn edge_segment(
    index: usize,
    edge: &RelationshipEdge,
    layout: &LayoutState,
    theme: &Theme,
) -> Result<EdgeSegment, Diagnostic> {
    match (layout.anchor(&edge.source), layout.anchor(&edge.target)) {
        (Some(from), Some(to)) => Ok(EdgeSegment {
            index,
            source: edge.source.clone(),
            target: edge.target.clone(),
            from,
            to,
            label: edge.label.clone(),
            label_at: from.midpoint(to) - Point::new(0.0, LABEL_RISE),
            label_width: text_width(
                &edge.label,
                theme.label_font_size,
                &theme.font_family,
                layout.fast_text(),
            ),
            cardinality: edge.cardinality.as_str().to_string(),
        }),
        (from, to) => {
            let missing = [(&edge.source, from), (&edge.target, to)]
                .into_iter()
                .filter(|(_, anchor)| anchor.is_none())
                .map(|(id, _)| id.clone())
                .collect();
            Err(Diagnostic::DanglingEdge {
                index,
                source: edge.source.clone(),
                target: edge.target.clone(),
                missing,
            })
        }
    }
}

/// Maps model and layout state to drawn primitives. Dangling edges are
/// reported in `diagnostics` and left out; everything else still renders.
pub fn render_scene(model: &DiagramModel, layout: &LayoutState, theme: &Theme) -> Scene {
    let mut edges = Vec::with_capacity(model.edges().len());
    let mut diagnostics = Vec::new();
    for (index, edge) in model.edges().iter().enumerate() {
        match edge_segment(index, edge, layout, theme) {
            Ok(segment) => edges.push(segment),
            Err(diagnostic) => {
                tracing::warn!(%diagnostic, "dropping edge from render");
                diagnostics.push(diagnostic);
            }
        }
    }
    assemble_scene(model, layout, edges, diagnostics, theme)
}

/// Builds a scene around precomputed edge segments.
pub(crate) fn assemble_scene(
    model: &DiagramModel,
    layout: &LayoutState,
    mut edges: Vec<EdgeSegment>,
    diagnostics: Vec<Diagnostic>,
    theme: &Theme,
) -> Scene {
    let nodes = layout
        .draw_order()
        .iter()
        .filter_map(|id| {
            let node = model.node(id)?;
            let origin = layout.position(id)?;
            let geometry = layout.geometry(id)?;
            Some(NodeBox {
                id: node.id.clone(),
                name: node.name.clone(),
                fields: node.fields.clone(),
                origin,
                width: geometry.width,
                height: geometry.height,
            })
        })
        .collect();
    spread_edge_labels(&mut edges, theme);
    Scene {
        width: layout.canvas().width,
        height: layout.canvas().height,
        transform: layout.transform(),
        nodes,
        edges,
        diagnostics,
    }
}

fn label_box(edge: &EdgeSegment, theme: &Theme) -> Bounds {
    let width = edge.label_width + LABEL_PAD_X * 2.0;
    let height = theme.label_font_size + LABEL_PAD_Y * 2.0;
    Bounds::from_rect(
        Point::new(edge.label_at.x - width / 2.0, edge.label_at.y - height / 2.0),
        width,
        height,
    )
}

// Nudges labels downwards until they stop colliding with earlier ones.
fn spread_edge_labels(edges: &mut [EdgeSegment], theme: &Theme) {
    let mut occupied: Vec<Bounds> = Vec::new();
    for edge in edges.iter_mut().filter(|edge| !edge.label.is_empty()) {
        let base = edge.label_at;
        let step = theme.label_font_size + LABEL_PAD_Y * 2.0 + 2.0;
        for attempt in 0..LABEL_NUDGE_ATTEMPTS {
            edge.label_at = base + Point::new(0.0, attempt as f32 * step);
            let candidate = label_box(edge, theme);
            if !occupied.iter().any(|taken| candidate.intersects(taken)) {
                break;
            }
            if attempt + 1 == LABEL_NUDGE_ATTEMPTS {
                edge.label_at = base;
            }
        }
        occupied.push(label_box(edge, theme));
    }
}

/// SVG of the live view: canvas-sized, scene transform applied.
pub fn render_svg(scene: &Scene, theme: &Theme) -> String {
    write_svg(scene, theme, scene.width, scene.height, scene.transform, &theme.background)
}

pub(crate) fn write_svg(
    scene: &Scene,
    theme: &Theme,
    width: f32,
    height: f32,
    transform: ViewTransform,
    background: &str,
) -> String {
    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    );
    let _ = write!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(background)
    );
    let _ = write!(
        svg,
        "<g transform=\"translate({:.2} {:.2}) scale({:.4})\">",
        transform.offset.x, transform.offset.y, transform.scale
    );

    for edge in &scene.edges {
        let _ = write!(
            svg,
            "<g class=\"link\"><line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{}\"/>",
            edge.from.x,
            edge.from.y,
            edge.to.x,
            edge.to.y,
            theme.line_color,
            theme.line_width
        );
        if !edge.label.is_empty() {
            let _ = write!(
                svg,
                "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                edge.label_at.x,
                edge.label_at.y,
                escape_xml(&theme.font_family),
                theme.label_font_size,
                theme.edge_label_color,
                escape_xml(&edge.label)
            );
        }
        svg.push_str("</g>");
    }

    for node in &scene.nodes {
        let _ = write!(
            svg,
            "<g class=\"node\" transform=\"translate({:.2} {:.2})\">",
            node.origin.x, node.origin.y
        );
        let _ = write!(
            svg,
            "<rect width=\"{:.2}\" height=\"{:.2}\" rx=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
            node.width,
            node.height,
            theme.entity_corner_radius,
            theme.entity_fill,
            theme.entity_border,
            theme.entity_border_width
        );
        let _ = write!(
            svg,
            "<text x=\"{:.2}\" y=\"20\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"{}\">{}</text>",
            node.width / 2.0,
            escape_xml(&theme.font_family),
            theme.title_font_size,
            theme.title_color,
            escape_xml(&node.name)
        );
        for (idx, field) in node.fields.iter().enumerate() {
            let _ = write!(
                svg,
                "<text x=\"10\" y=\"{}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                40 + idx * 20,
                escape_xml(&theme.font_family),
                theme.field_font_size,
                theme.field_color,
                escape_xml(field)
            );
        }
        svg.push_str("</g>");
    }

    svg.push_str("</g></svg>");
    svg
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CanvasConfig, LayoutConfig};
    use crate::ir::{Cardinality, EntityNode, RelationshipEdge};
    use crate::model::default_model;

    fn layout_for(model: &DiagramModel) -> LayoutState {
        let config = LayoutConfig {
            fast_text: true,
            ..LayoutConfig::default()
        };
        LayoutState::new(model, &CanvasConfig::default(), &config, &Theme::modern())
    }

    #[test]
    fn one_segment_per_edge_at_node_anchors() {
        let model = default_model();
        let layout = layout_for(&model);
        let scene = render_scene(&model, &layout, &Theme::modern());
        assert_eq!(scene.nodes.len(), 4);
        assert_eq!(scene.edges.len(), 4);
        for edge in &scene.edges {
            assert_eq!(Some(edge.from), layout.anchor(&edge.source));
            assert_eq!(Some(edge.to), layout.anchor(&edge.target));
        }
        assert!(scene.diagnostics.is_empty());
    }

    #[test]
    fn dangling_edge_is_reported_and_skipped() {
        let node = |id: &str| EntityNode {
            id: id.to_string(),
            name: id.to_string(),
            fields: vec![],
            position: Point::ORIGIN,
        };
        let edge = |source: &str, target: &str| RelationshipEdge {
            source: source.to_string(),
            target: target.to_string(),
            label: "rel".to_string(),
            cardinality: Cardinality::OneToMany,
        };
        let model = DiagramModel::new(
            vec![node("a"), node("b")],
            vec![edge("a", "b"), edge("a", "ghost"), edge("b", "a")],
        );
        let layout = layout_for(&model);
        let scene = render_scene(&model, &layout, &Theme::modern());
        assert_eq!(scene.nodes.len(), 2);
        assert_eq!(scene.edges.len(), 2);
        assert_eq!(
            scene.diagnostics,
            vec![Diagnostic::DanglingEdge {
                index: 1,
                source: "a".to_string(),
                target: "ghost".to_string(),
                missing: vec!["ghost".to_string()],
            }]
        );
    }

    #[test]
    fn overlapping_labels_are_spread() {
        let node = |id: &str, x: f32| EntityNode {
            id: id.to_string(),
            name: id.to_string(),
            fields: vec![],
            position: Point::new(x, 0.0),
        };
        let edge = |source: &str, target: &str| RelationshipEdge {
            source: source.to_string(),
            target: target.to_string(),
            label: "links".to_string(),
            cardinality: Cardinality::OneToMany,
        };
        let model = DiagramModel::new(
            vec![node("a", 0.0), node("b", 400.0)],
            vec![edge("a", "b"), edge("b", "a")],
        );
        let layout = layout_for(&model);
        let scene = render_scene(&model, &layout, &Theme::modern());
        assert_ne!(scene.edges[0].label_at, scene.edges[1].label_at);
        assert_eq!(scene.edges[0].from, scene.edges[1].to);
    }

    #[test]
    fn label_boxes_use_layout_text_measurement() {
        let model = default_model();
        let theme = Theme::modern();
        for fast_text in [true, false] {
            let config = LayoutConfig {
                fast_text,
                ..LayoutConfig::default()
            };
            let layout = LayoutState::new(&model, &CanvasConfig::default(), &config, &theme);
            let scene = render_scene(&model, &layout, &theme);
            let owns = scene.edge("users", "projects").unwrap();
            let measured = text_width("owns", theme.label_font_size, &theme.font_family, fast_text);
            assert_eq!(owns.label_width, measured);
            let bounds = label_box(owns, &theme);
            assert!((bounds.width() - (measured + LABEL_PAD_X * 2.0)).abs() < 1e-4);
        }
    }

    #[test]
    fn svg_contains_names_fields_and_labels() {
        let model = default_model();
        let layout = layout_for(&model);
        let svg = render_svg(&render_scene(&model, &layout, &Theme::modern()), &Theme::modern());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(">Users<"));
        assert!(svg.contains(">created_at<"));
        assert!(svg.contains(">owns<"));
        assert_eq!(svg.matches("<line ").count(), 4);
    }

    #[test]
    fn svg_escapes_markup() {
        assert_eq!(escape_xml("<a & 'b'>"), "&lt;a &amp; &apos;b&apos;&gt;");
    }
}
