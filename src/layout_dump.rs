use crate::render::Scene;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct SceneDump {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub offset: [f32; 2],
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fields: usize,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub source: String,
    pub target: String,
    pub label: String,
    pub cardinality: String,
    pub points: [[f32; 2]; 2],
}

impl SceneDump {
    pub fn from_scene(scene: &Scene) -> Self {
        let nodes = scene
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                name: node.name.clone(),
                x: node.origin.x,
                y: node.origin.y,
                width: node.width,
                height: node.height,
                fields: node.fields.len(),
            })
            .collect();
        let edges = scene
            .edges
            .iter()
            .map(|edge| EdgeDump {
                source: edge.source.clone(),
                target: edge.target.clone(),
                label: edge.label.clone(),
                cardinality: edge.cardinality.clone(),
                points: [[edge.from.x, edge.from.y], [edge.to.x, edge.to.y]],
            })
            .collect();
        Self {
            width: scene.width,
            height: scene.height,
            scale: scene.transform.scale,
            offset: [scene.transform.offset.x, scene.transform.offset.y],
            nodes,
            edges,
            diagnostics: scene.diagnostics.iter().map(ToString::to_string).collect(),
        }
    }
}

pub fn write_scene_dump(path: &Path, scene: &Scene) -> anyhow::Result<()> {
    let dump = SceneDump::from_scene(scene);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
