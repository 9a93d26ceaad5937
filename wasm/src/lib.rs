use erd_canvas::export::export_svg;
use erd_canvas::{Canvas, Config, LayoutSnapshot, Point, PointerEvent, Theme, export_file_name, parse_project, render_svg};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanvasOptions {
    theme: Option<String>,
    font_family: Option<String>,
    min_scale: Option<f32>,
    max_scale: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    fast_text: Option<bool>,
}

fn build_config(options: CanvasOptions) -> Config {
    let mut config = Config::default();
    if let Some(theme) = options.theme.as_deref().and_then(Theme::from_name) {
        config.render.background = theme.background.clone();
        config.theme = theme;
    }
    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(min_scale) = options.min_scale {
        config.canvas.min_scale = min_scale;
    }
    if let Some(max_scale) = options.max_scale {
        config.canvas.max_scale = max_scale;
    }
    config.canvas.normalize_scale_bounds();
    if let Some(width) = options.width {
        config.canvas.width = width;
    }
    if let Some(height) = options.height {
        config.canvas.height = height;
    }
    // No system fonts inside the browser sandbox.
    config.layout.fast_text = options.fast_text.unwrap_or(true);
    config
}

fn to_js(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[wasm_bindgen]
pub struct ErdCanvas {
    canvas: Canvas,
}

#[wasm_bindgen]
impl ErdCanvas {
    #[wasm_bindgen(constructor)]
    pub fn new(project_json: Option<String>, options_json: Option<String>) -> Result<ErdCanvas, JsValue> {
        let options = match options_json {
            Some(raw) => serde_json::from_str::<CanvasOptions>(&raw).map_err(to_js)?,
            None => CanvasOptions::default(),
        };
        let project = project_json.as_deref().map(parse_project).transpose().map_err(to_js)?;
        Ok(Self {
            canvas: Canvas::new(project.as_ref(), &build_config(options)),
        })
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.canvas.queue(PointerEvent::Down(Point::new(x, y)));
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.canvas.queue(PointerEvent::Move(Point::new(x, y)));
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) {
        self.canvas.queue(PointerEvent::Up);
    }

    #[wasm_bindgen(js_name = pointerCancel)]
    pub fn pointer_cancel(&mut self) {
        self.canvas.queue(PointerEvent::Cancel);
    }

    #[wasm_bindgen(js_name = lostCapture)]
    pub fn lost_capture(&mut self) {
        self.canvas.queue(PointerEvent::LostCapture);
    }

    pub fn wheel(&mut self, x: f32, y: f32, delta: f32) {
        self.canvas.queue(PointerEvent::Wheel {
            at: Point::new(x, y),
            delta,
        });
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&mut self) -> bool {
        self.canvas.zoom_in()
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&mut self) -> bool {
        self.canvas.zoom_out()
    }

    #[wasm_bindgen(js_name = resetView)]
    pub fn reset_view(&mut self) {
        self.canvas.reset_view();
    }

    #[wasm_bindgen(js_name = toggleFullscreen)]
    pub fn toggle_fullscreen(&mut self) -> bool {
        self.canvas.toggle_fullscreen();
        self.canvas.is_fullscreen()
    }

    #[wasm_bindgen(js_name = zoomPercent)]
    pub fn zoom_percent(&self) -> u32 {
        self.canvas.zoom_percent()
    }

    /// Applies queued input and returns the SVG for this animation frame.
    #[wasm_bindgen(js_name = frameSvg)]
    pub fn frame_svg(&mut self) -> String {
        let scene = self.canvas.frame();
        render_svg(&scene, self.canvas.theme())
    }

    /// Fit-all SVG for the host to rasterize, plus the download name.
    #[wasm_bindgen(js_name = exportSvg)]
    pub fn export_svg(&self) -> Result<String, JsValue> {
        let (svg, _, _) = export_svg(&self.canvas.scene(), self.canvas.theme(), self.canvas.render_config())
            .map_err(to_js)?;
        Ok(svg)
    }

    #[wasm_bindgen(js_name = exportFileName)]
    pub fn export_file_name(&self) -> String {
        export_file_name(self.canvas.project_name())
    }

    pub fn snapshot(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.canvas.snapshot()).map_err(to_js)
    }

    pub fn restore(&mut self, snapshot_json: &str) -> Result<(), JsValue> {
        let snapshot: LayoutSnapshot = serde_json::from_str(snapshot_json).map_err(to_js)?;
        self.canvas.restore(&snapshot);
        Ok(())
    }
}
