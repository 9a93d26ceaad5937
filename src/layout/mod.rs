use std::collections::HashMap;

use crate::config::{CanvasConfig, LayoutConfig};
use crate::ir::{DiagramModel, Point};
use crate::theme::Theme;

mod sizing;
mod types;

pub use types::{Bounds, LayoutSnapshot, NodeGeometry, ViewTransform};

/// Authoritative node positions and view transform. Every mutation is
/// applied immediately; reads always see the latest committed state.
#[derive(Debug, Clone)]
pub struct LayoutState {
    draw_order: Vec<String>,
    positions: HashMap<String, Point>,
    geometry: HashMap<String, NodeGeometry>,
    transform: ViewTransform,
    canvas: CanvasConfig,
    fast_text: bool,
}

impl LayoutState {
    pub fn new(
        model: &DiagramModel,
        canvas: &CanvasConfig,
        config: &LayoutConfig,
        theme: &Theme,
    ) -> Self {
        let mut positions = HashMap::with_capacity(model.nodes().len());
        let mut geometry = HashMap::with_capacity(model.nodes().len());
        for node in model.nodes() {
            positions.insert(node.id.clone(), node.position);
            geometry.insert(node.id.clone(), sizing::node_geometry(node, theme, config));
        }
        let mut canvas = canvas.clone();
        canvas.normalize_scale_bounds();
        Self {
            draw_order: model.nodes().iter().map(|node| node.id.clone()).collect(),
            positions,
            geometry,
            transform: ViewTransform::IDENTITY,
            canvas,
            fast_text: config.fast_text,
        }
    }

    pub fn canvas(&self) -> &CanvasConfig {
        &self.canvas
    }

    /// Whether text is estimated instead of measured from fonts.
    pub fn fast_text(&self) -> bool {
        self.fast_text
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn position(&self, id: &str) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn geometry(&self, id: &str) -> Option<NodeGeometry> {
        self.geometry.get(id).copied()
    }

    /// World-space point where edges attach to the node.
    pub fn anchor(&self, id: &str) -> Option<Point> {
        let position = self.position(id)?;
        let geometry = self.geometry(id)?;
        Some(position + geometry.anchor)
    }

    /// Node ids, bottom-most first.
    pub fn draw_order(&self) -> &[String] {
        &self.draw_order
    }

    /// Returns false, without touching anything, when the id is unknown.
    pub fn move_node(&mut self, id: &str, position: Point) -> bool {
        match self.positions.get_mut(id) {
            Some(slot) => {
                *slot = position;
                true
            }
            None => {
                tracing::trace!(node = id, "move for unknown node ignored");
                false
            }
        }
    }

    /// Moves the node to the top of the draw order.
    pub fn raise(&mut self, id: &str) {
        if let Some(idx) = self.draw_order.iter().position(|candidate| candidate == id) {
            let id = self.draw_order.remove(idx);
            self.draw_order.push(id);
        }
    }

    /// Scale is clamped to the canvas bounds, offset is taken as is.
    /// Non-finite components keep their previous value.
    pub fn set_transform(&mut self, scale: f32, offset_x: f32, offset_y: f32) {
        if scale.is_finite() {
            self.transform.scale = self.canvas.clamp_scale(scale);
        }
        if offset_x.is_finite() {
            self.transform.offset.x = offset_x;
        }
        if offset_y.is_finite() {
            self.transform.offset.y = offset_y;
        }
    }

    pub fn reset_transform(&mut self) {
        self.transform = ViewTransform::IDENTITY;
    }

    pub fn pan_by(&mut self, delta: Point) {
        let offset = self.transform.offset + delta;
        self.set_transform(self.transform.scale, offset.x, offset.y);
    }

    /// Multiplies the scale by `factor` keeping the world point under
    /// `screen_anchor` fixed. Returns whether the scale changed.
    pub fn zoom_at(&mut self, factor: f32, screen_anchor: Point) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let current = self.transform.scale;
        let next = self.canvas.clamp_scale(current * factor);
        if (next - current).abs() <= f32::EPSILON {
            return false;
        }
        let world = self.transform.to_world(screen_anchor);
        let offset = screen_anchor - world.scale(next);
        self.set_transform(next, offset.x, offset.y);
        true
    }

    pub fn node_bounds(&self, id: &str) -> Option<Bounds> {
        let position = self.position(id)?;
        let geometry = self.geometry(id)?;
        Some(Bounds::from_rect(position, geometry.width, geometry.height))
    }

    /// World-space box around every node, `None` for an empty diagram.
    pub fn bounds(&self) -> Option<Bounds> {
        self.draw_order
            .iter()
            .filter_map(|id| self.node_bounds(id))
            .reduce(Bounds::union)
    }

    /// Top-most node whose box contains the world point.
    pub fn hit_test(&self, world: Point) -> Option<&str> {
        self.draw_order
            .iter()
            .rev()
            .find(|id| {
                self.node_bounds(id)
                    .is_some_and(|bounds| bounds.contains(world))
            })
            .map(String::as_str)
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            positions: self
                .positions
                .iter()
                .map(|(id, position)| (id.clone(), *position))
                .collect(),
            transform: self.transform,
        }
    }

    /// Applies a saved snapshot. Ids no longer in the diagram are skipped.
    pub fn restore(&mut self, snapshot: &LayoutSnapshot) {
        for (id, position) in &snapshot.positions {
            self.move_node(id, *position);
        }
        self.set_transform(
            snapshot.transform.scale,
            snapshot.transform.offset.x,
            snapshot.transform.offset.y,
        );
    }
}
