use std::collections::HashMap;

use crate::config::{Config, RenderConfig};
use crate::export::{ExportError, ExportImage, ExportJob, export_scene};
use crate::ir::{DiagramModel, Point, Project};
use crate::layout::{LayoutSnapshot, LayoutState, ViewTransform};
use crate::model::build_model;
use crate::render::{Diagnostic, EdgeSegment, Scene, assemble_scene, edge_segment};
use crate::task::{Task, TaskScope};
use crate::theme::Theme;

/// Pointer input in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
    Cancel,
    LostCapture,
    /// Negative `delta` scrolls up, which zooms in.
    Wheel { at: Point, delta: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub node: String,
    /// Pointer position relative to the node origin, in world units.
    pub grab_offset: Point,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Panning {
        last: Point,
    },
    DraggingNode(DragSession),
}

/// Interactive diagram surface: owns the model, the layout state, the
/// pointer state machine and the per-edge geometry kept in step with it.
#[derive(Debug)]
pub struct Canvas {
    model: DiagramModel,
    layout: LayoutState,
    theme: Theme,
    render: RenderConfig,
    project_name: String,
    state: InteractionState,
    fullscreen: bool,
    segments: Vec<Option<EdgeSegment>>,
    diagnostics: Vec<Diagnostic>,
    incident: HashMap<String, Vec<usize>>,
    pending_move: Option<Point>,
    tasks: TaskScope,
}

impl Canvas {
    pub fn new(project: Option<&Project>, config: &Config) -> Self {
        let model = build_model(project, &config.layout);
        let name = project.map(|p| p.name.clone()).unwrap_or_default();
        Self::from_model(model, name, config)
    }

    pub fn from_model(model: DiagramModel, project_name: impl Into<String>, config: &Config) -> Self {
        let layout = LayoutState::new(&model, &config.canvas, &config.layout, &config.theme);
        let mut incident: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, edge) in model.edges().iter().enumerate() {
            incident.entry(edge.source.clone()).or_default().push(idx);
            if edge.target != edge.source {
                incident.entry(edge.target.clone()).or_default().push(idx);
            }
        }
        let mut canvas = Self {
            model,
            layout,
            theme: config.theme.clone(),
            render: config.render.clone(),
            project_name: project_name.into(),
            state: InteractionState::Idle,
            fullscreen: false,
            segments: Vec::new(),
            diagnostics: Vec::new(),
            incident,
            pending_move: None,
            tasks: TaskScope::new(),
        };
        canvas.rebuild_segments();
        canvas
    }

    pub fn model(&self) -> &DiagramModel {
        &self.model
    }

    pub fn layout(&self) -> &LayoutState {
        &self.layout
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.render
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn transform(&self) -> ViewTransform {
        self.layout.transform()
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Zoom level as shown next to the zoom buttons.
    pub fn zoom_percent(&self) -> u32 {
        (self.layout.transform().scale * 100.0).round() as u32
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
    }

    /// Applies one event immediately. Returns whether anything visible
    /// changed.
    pub fn handle(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Down(at) => self.pointer_down(at),
            PointerEvent::Move(at) => self.pointer_move(at),
            PointerEvent::Up | PointerEvent::Cancel | PointerEvent::LostCapture => {
                self.end_session(event)
            }
            PointerEvent::Wheel { at, delta } => self.wheel(at, delta),
        }
    }

    /// Frame-coalesced input: moves are folded into a single pending move
    /// that [`Canvas::frame`] applies. Any other event applies the pending
    /// move first so ordering is preserved.
    pub fn queue(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Move(at) => self.pending_move = Some(at),
            other => {
                self.flush_pending();
                self.handle(other);
            }
        }
    }

    /// Applies pending input and returns the scene for this frame.
    pub fn frame(&mut self) -> Scene {
        self.flush_pending();
        self.scene()
    }

    pub fn scene(&self) -> Scene {
        assemble_scene(
            &self.model,
            &self.layout,
            self.segments.iter().flatten().cloned().collect(),
            self.diagnostics.clone(),
            &self.theme,
        )
    }

    pub fn zoom_in(&mut self) -> bool {
        let step = self.layout.canvas().zoom_step;
        let center = self.layout.canvas().center();
        self.layout.zoom_at(step, center)
    }

    pub fn zoom_out(&mut self) -> bool {
        let step = self.layout.canvas().zoom_step;
        let center = self.layout.canvas().center();
        self.layout.zoom_at(1.0 / step, center)
    }

    pub fn reset_view(&mut self) {
        self.layout.reset_transform();
    }

    pub fn set_transform(&mut self, scale: f32, offset_x: f32, offset_y: f32) {
        self.layout.set_transform(scale, offset_x, offset_y);
    }

    /// Programmatic move, with the same unknown-id tolerance as a drag.
    pub fn move_node(&mut self, id: &str, position: Point) -> bool {
        if !self.layout.move_node(id, position) {
            return false;
        }
        self.refresh_incident(id);
        true
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        self.layout.snapshot()
    }

    pub fn restore(&mut self, snapshot: &LayoutSnapshot) {
        self.layout.restore(snapshot);
        self.rebuild_segments();
    }

    pub fn export_png(&self) -> Result<ExportImage, ExportError> {
        export_scene(&self.scene(), &self.theme, &self.render, &self.project_name)
    }

    /// Snapshots the current scene into a job that can run later. The
    /// returned task stays empty if the canvas is torn down first.
    pub fn request_export(&self) -> (Task<Result<ExportImage, ExportError>>, ExportJob) {
        let (task, completer) = self.tasks.issue();
        let job = ExportJob::new(
            self.scene(),
            self.theme.clone(),
            self.render.clone(),
            self.project_name.clone(),
            completer,
        );
        (task, job)
    }

    /// Drops any live session and cancels outstanding tasks.
    pub fn teardown(&mut self) {
        self.state = InteractionState::Idle;
        self.pending_move = None;
        self.tasks.teardown();
    }

    fn pointer_down(&mut self, at: Point) -> bool {
        if self.state != InteractionState::Idle {
            return false;
        }
        let world = self.layout.transform().to_world(at);
        let hit = self.layout.hit_test(world).map(str::to_string);
        match hit {
            Some(node) => {
                let Some(origin) = self.layout.position(&node) else {
                    return false;
                };
                self.layout.raise(&node);
                tracing::debug!(node = %node, "drag started");
                self.state = InteractionState::DraggingNode(DragSession {
                    grab_offset: world - origin,
                    node,
                });
                true
            }
            None => {
                tracing::debug!(x = at.x, y = at.y, "pan started");
                self.state = InteractionState::Panning { last: at };
                false
            }
        }
    }

    fn pointer_move(&mut self, at: Point) -> bool {
        match &mut self.state {
            InteractionState::Idle => false,
            InteractionState::Panning { last } => {
                let delta = at - *last;
                *last = at;
                self.layout.pan_by(delta);
                true
            }
            InteractionState::DraggingNode(session) => {
                let world = self.layout.transform().to_world(at);
                let position = world - session.grab_offset;
                let node = session.node.clone();
                self.move_node(&node, position)
            }
        }
    }

    fn end_session(&mut self, event: PointerEvent) -> bool {
        let previous = std::mem::take(&mut self.state);
        if previous != InteractionState::Idle {
            tracing::debug!(?event, "interaction ended");
        }
        false
    }

    fn wheel(&mut self, at: Point, delta: f32) -> bool {
        if matches!(self.state, InteractionState::DraggingNode(_)) || delta == 0.0 || !delta.is_finite() {
            return false;
        }
        let step = self.layout.canvas().wheel_zoom_step;
        let factor = if delta < 0.0 { step } else { 1.0 / step };
        self.layout.zoom_at(factor, at)
    }

    fn flush_pending(&mut self) {
        if let Some(at) = self.pending_move.take() {
            self.pointer_move(at);
        }
    }

    // Only edges touching the moved node change; everything else is reused.
    fn refresh_incident(&mut self, id: &str) {
        let Some(indices) = self.incident.get(id) else {
            return;
        };
        for &idx in indices {
            if let Some(edge) = self.model.edges().get(idx) {
                self.segments[idx] = edge_segment(idx, edge, &self.layout, &self.theme).ok();
            }
        }
    }

    fn rebuild_segments(&mut self) {
        self.diagnostics.clear();
        self.segments = self
            .model
            .edges()
            .iter()
            .enumerate()
            .map(|(idx, edge)| match edge_segment(idx, edge, &self.layout, &self.theme) {
                Ok(segment) => Some(segment),
                Err(diagnostic) => {
                    tracing::warn!(%diagnostic, "dropping edge from render");
                    self.diagnostics.push(diagnostic);
                    None
                }
            })
            .collect();
    }
}

impl Drop for Canvas {
    fn drop(&mut self) {
        self.tasks.teardown();
    }
}
