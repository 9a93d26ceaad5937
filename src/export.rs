use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::RenderConfig;
use crate::ir::{DiagramModel, Point};
use crate::layout::{LayoutState, ViewTransform};
use crate::render::{Scene, render_scene, write_svg};
use crate::task::Completer;
use crate::theme::Theme;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PNG export is not available in this build")]
    Unsupported,
    #[error("diagram has no entities to export")]
    EmptyDiagram,
    #[error("failed to build SVG tree: {0}")]
    Svg(String),
    #[error("cannot allocate a {width}x{height} raster")]
    Allocation { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    Encode(String),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportImage {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl ExportImage {
    /// Writes the image into `dir` under its file name. The bytes land in a
    /// temporary sibling first and are renamed into place, so a failed write
    /// leaves no partial file behind.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let target = dir.join(&self.file_name);
        self.write_as(&target)?;
        Ok(target)
    }

    pub fn write_as(&self, target: &Path) -> Result<(), ExportError> {
        let file_name = target
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("diagram.png");
        let staging = target.with_file_name(format!(".{file_name}.partial"));
        if let Err(err) = std::fs::write(&staging, &self.png) {
            let _ = std::fs::remove_file(&staging);
            return Err(err.into());
        }
        if let Err(err) = std::fs::rename(&staging, target) {
            let _ = std::fs::remove_file(&staging);
            return Err(err.into());
        }
        tracing::debug!(path = %target.display(), bytes = self.png.len(), "diagram exported");
        Ok(())
    }
}

/// `Task Manager App` -> `Task_Manager_App_diagram.png`.
pub fn export_file_name(project_name: &str) -> String {
    let trimmed = project_name.trim();
    if trimmed.is_empty() {
        return "diagram.png".to_string();
    }
    format!("{}_diagram.png", WHITESPACE_RE.replace_all(trimmed, "_"))
}

pub fn export_png(
    model: &DiagramModel,
    layout: &LayoutState,
    theme: &Theme,
    render: &RenderConfig,
    project_name: &str,
) -> Result<ExportImage, ExportError> {
    export_scene(&render_scene(model, layout, theme), theme, render, project_name)
}

/// SVG framing every node at the scene's current scale, ignoring the pan
/// offset. Returns the document and its pixel size.
pub fn export_svg(scene: &Scene, theme: &Theme, render: &RenderConfig) -> Result<(String, u32, u32), ExportError> {
    let bounds = scene.content_bounds(theme).ok_or(ExportError::EmptyDiagram)?;
    let scale = scene.transform.scale;
    let pad = render.export_padding.max(0.0);
    let width = ((bounds.width() + pad * 2.0) * scale).ceil().max(1.0);
    let height = ((bounds.height() + pad * 2.0) * scale).ceil().max(1.0);
    let (width_px, height_px) = (width as u32, height as u32);
    if width_px > render.export_max_dimension || height_px > render.export_max_dimension {
        return Err(ExportError::Allocation {
            width: width_px,
            height: height_px,
        });
    }
    let transform = ViewTransform {
        scale,
        offset: (Point::new(pad, pad) - bounds.min).scale(scale),
    };
    let svg = write_svg(scene, theme, width, height, transform, &render.background);
    Ok((svg, width_px, height_px))
}

pub fn export_scene(
    scene: &Scene,
    theme: &Theme,
    render: &RenderConfig,
    project_name: &str,
) -> Result<ExportImage, ExportError> {
    let (svg, width, height) = export_svg(scene, theme, render)?;
    let png = rasterize(&svg, width, height, render)?;
    Ok(ExportImage {
        file_name: export_file_name(project_name),
        width,
        height,
        png,
    })
}

#[cfg(feature = "png")]
fn rasterize(svg: &str, width: u32, height: u32, render: &RenderConfig) -> Result<Vec<u8>, ExportError> {
    let mut opt = usvg::Options::default();
    opt.font_family = render.font_family.clone();
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|err| ExportError::Svg(err.to_string()))?;
    let mut pixmap =
        resvg::tiny_skia::Pixmap::new(width, height).ok_or(ExportError::Allocation { width, height })?;
    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap
        .encode_png()
        .map_err(|err| ExportError::Encode(err.to_string()))
}

#[cfg(not(feature = "png"))]
fn rasterize(_svg: &str, _width: u32, _height: u32, _render: &RenderConfig) -> Result<Vec<u8>, ExportError> {
    Err(ExportError::Unsupported)
}

/// Export captured from a canvas, runnable after the canvas has moved on.
#[derive(Debug)]
pub struct ExportJob {
    scene: Scene,
    theme: Theme,
    render: RenderConfig,
    project_name: String,
    completer: Completer<Result<ExportImage, ExportError>>,
}

impl ExportJob {
    pub(crate) fn new(
        scene: Scene,
        theme: Theme,
        render: RenderConfig,
        project_name: String,
        completer: Completer<Result<ExportImage, ExportError>>,
    ) -> Self {
        Self {
            scene,
            theme,
            render,
            project_name,
            completer,
        }
    }

    /// Runs the export and hands the result to the owning task. Skips the
    /// work entirely when the task is already dead.
    pub fn run(self) -> bool {
        if !self.completer.is_live() {
            tracing::debug!("export skipped, requester is gone");
            return false;
        }
        let result = export_scene(&self.scene, &self.theme, &self.render, &self.project_name);
        if let Err(err) = &result {
            tracing::warn!(error = %err, "diagram export failed");
        }
        self.completer.complete(result)
    }
}
