use crate::config::load_config;
use crate::export::{export_scene, export_svg};
use crate::interaction::Canvas;
use crate::ir::Project;
use crate::layout::LayoutSnapshot;
use crate::layout_dump::write_scene_dump;
use crate::parser::parse_project;
use crate::render::write_output_svg;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_PROJECT_NAME: &str = "Untitled Project";

#[derive(Parser, Debug)]
#[command(name = "erdc", version, about = "Render a project's entity-relationship diagram")]
pub struct Args {
    /// Project record (JSON/JSON5) or '-' for stdin. Omit for the default schema.
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. SVG goes to stdout when omitted; PNG uses `<name>_diagram.png`.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (canvas bounds, theme, layout)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Saved layout snapshot (node positions and view transform) to apply
    #[arg(short = 'l', long = "layout")]
    pub layout: Option<PathBuf>,

    /// Zoom scale, clamped to the configured bounds
    #[arg(short = 's', long = "scale")]
    pub scale: Option<f32>,

    /// Canvas width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Canvas height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Write the rendered scene geometry as JSON
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.canvas.width = width;
    }
    if let Some(height) = args.height {
        config.canvas.height = height;
    }

    let project = read_project(args.input.as_deref())?;
    let mut canvas = Canvas::new(Some(&project), &config);

    if let Some(path) = args.layout.as_deref() {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading layout {}", path.display()))?;
        let snapshot: LayoutSnapshot = serde_json::from_str(&raw)
            .with_context(|| format!("decoding layout {}", path.display()))?;
        canvas.restore(&snapshot);
    }
    if let Some(scale) = args.scale {
        let transform = canvas.transform();
        canvas.set_transform(scale, transform.offset.x, transform.offset.y);
    }

    let scene = canvas.frame();
    if let Some(path) = args.dump_layout.as_deref() {
        write_scene_dump(path, &scene)?;
    }

    match args.output_format {
        OutputFormat::Svg => {
            let (svg, _, _) = export_svg(&scene, &config.theme, &config.render)?;
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let image = export_scene(&scene, &config.theme, &config.render, canvas.project_name())?;
            match args.output.as_deref() {
                Some(path) => image.write_as(path)?,
                None => {
                    let path = image.write_to(Path::new("."))?;
                    eprintln!("wrote {}", path.display());
                }
            }
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("ERDC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_project(path: Option<&Path>) -> Result<Project> {
    let raw = match path {
        None => return Ok(Project::new(DEFAULT_PROJECT_NAME, "")),
        Some(path) if path == Path::new("-") => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading project {}", path.display()))?,
    };
    let mut project = parse_project(&raw)?;
    if project.name.trim().is_empty() {
        project.name = path
            .and_then(|p| p.file_stem())
            .and_then(|stem| stem.to_str())
            .filter(|stem| *stem != "-")
            .unwrap_or(DEFAULT_PROJECT_NAME)
            .to_string();
    }
    Ok(project)
}
