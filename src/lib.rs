#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod export;
pub mod interaction;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod model;
pub mod parser;
pub mod render;
pub mod store;
pub mod task;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{CanvasConfig, Config, LayoutConfig, RenderConfig, load_config};
pub use export::{ExportError, ExportImage, export_file_name, export_png};
pub use interaction::{Canvas, DragSession, InteractionState, PointerEvent};
pub use ir::{Cardinality, DiagramModel, EntityNode, Point, Project, RelationshipEdge};
pub use layout::{LayoutSnapshot, LayoutState, ViewTransform};
pub use model::{build_model, default_model};
pub use parser::parse_project;
pub use render::{Diagnostic, Scene, render_scene, render_svg};
pub use theme::Theme;
