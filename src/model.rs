use std::collections::HashSet;

use crate::config::LayoutConfig;
use crate::layout::Bounds;
use crate::ir::{
    Cardinality, DiagramModel, EntityNode, EntitySpec, Point, Project, RelationshipEdge,
    RelationshipSpec,
};

const DEFAULT_ENTITIES: [(&str, &str, (f32, f32), [&str; 4]); 4] = [
    ("users", "Users", (100.0, 100.0), ["id", "name", "email", "created_at"]),
    ("projects", "Projects", (300.0, 100.0), ["id", "title", "description", "user_id"]),
    ("tasks", "Tasks", (500.0, 100.0), ["id", "title", "status", "project_id"]),
    ("comments", "Comments", (300.0, 300.0), ["id", "content", "task_id", "user_id"]),
];

const DEFAULT_RELATIONSHIPS: [(&str, &str, &str); 4] = [
    ("users", "projects", "owns"),
    ("projects", "tasks", "contains"),
    ("tasks", "comments", "has"),
    ("users", "comments", "writes"),
];

/// Builds the diagram for a project. A missing project yields an empty
/// model; a project without a usable schema gets the default one.
pub fn build_model(project: Option<&Project>, config: &LayoutConfig) -> DiagramModel {
    let Some(project) = project else {
        tracing::debug!("no project supplied, building empty diagram");
        return DiagramModel::empty();
    };

    let Some(entities) = project.entities.as_deref() else {
        tracing::debug!(project = %project.name, "project has no schema, using default");
        return default_model();
    };

    if let Err(reason) = validate_entities(entities) {
        tracing::warn!(project = %project.name, %reason, "malformed schema, using default");
        return default_model();
    }

    let nodes = place_entities(entities, config);
    let edges = project
        .relationships
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(relationship_edge)
        .collect();
    DiagramModel::new(nodes, edges)
}

pub fn default_model() -> DiagramModel {
    let nodes = DEFAULT_ENTITIES
        .iter()
        .map(|(id, name, (x, y), fields)| EntityNode {
            id: id.to_string(),
            name: name.to_string(),
            fields: fields.iter().map(|field| field.to_string()).collect(),
            position: Point::new(*x, *y),
        })
        .collect();
    let edges = DEFAULT_RELATIONSHIPS
        .iter()
        .map(|(source, target, label)| RelationshipEdge {
            source: source.to_string(),
            target: target.to_string(),
            label: label.to_string(),
            cardinality: Cardinality::OneToMany,
        })
        .collect();
    DiagramModel::new(nodes, edges)
}

fn validate_entities(entities: &[EntitySpec]) -> Result<(), String> {
    if entities.is_empty() {
        return Err("entity list is empty".to_string());
    }
    let mut seen = HashSet::new();
    for entity in entities {
        let id = entity.id.trim();
        if id.is_empty() {
            return Err("entity with blank id".to_string());
        }
        if !seen.insert(id) {
            return Err(format!("duplicate entity id '{id}'"));
        }
    }
    Ok(())
}

/// Explicit positions win; the rest fill grid cells row-major, skipping
/// any cell whose box would overlap an explicitly placed entity.
fn place_entities(entities: &[EntitySpec], config: &LayoutConfig) -> Vec<EntityNode> {
    let columns = config.grid_columns.max(1);
    let box_at = |origin: Point, fields: usize| {
        let height = config.header_height + fields as f32 * config.field_row_height;
        Bounds::from_rect(origin, config.node_min_width, height)
    };
    let cell_origin = |cell: usize| {
        let col = (cell % columns) as f32;
        let row = (cell / columns) as f32;
        config.grid_origin + Point::new(col * config.grid_spacing_x, row * config.grid_spacing_y)
    };
    let explicit: Vec<Bounds> = entities
        .iter()
        .filter_map(|entity| entity.position.map(|p| box_at(p, entity.fields.len())))
        .collect();

    let mut next_cell = 0usize;
    entities
        .iter()
        .map(|entity| {
            let position = match entity.position {
                Some(position) => position,
                None => {
                    let mut origin = cell_origin(next_cell);
                    while explicit
                        .iter()
                        .any(|taken| taken.intersects(&box_at(origin, entity.fields.len())))
                    {
                        next_cell += 1;
                        origin = cell_origin(next_cell);
                    }
                    next_cell += 1;
                    origin
                }
            };
            let id = entity.id.trim().to_string();
            let name = if entity.name.trim().is_empty() {
                id.clone()
            } else {
                entity.name.clone()
            };
            EntityNode {
                id,
                name,
                fields: entity.fields.clone(),
                position,
            }
        })
        .collect()
}

fn relationship_edge(spec: &RelationshipSpec) -> RelationshipEdge {
    RelationshipEdge {
        source: spec.source.trim().to_string(),
        target: spec.target.trim().to_string(),
        label: spec.label.clone(),
        cardinality: spec.cardinality.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, position: Option<Point>) -> EntitySpec {
        EntitySpec {
            id: id.to_string(),
            name: id.to_uppercase(),
            fields: vec!["id".to_string()],
            position,
        }
    }

    #[test]
    fn missing_project_builds_empty_model() {
        let model = build_model(None, &LayoutConfig::default());
        assert!(model.is_empty());
        assert!(model.edges().is_empty());
    }

    #[test]
    fn project_without_schema_gets_default() {
        let project = Project::new("Task Manager", "Web Application");
        let model = build_model(Some(&project), &LayoutConfig::default());
        let names: Vec<&str> = model.nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["Users", "Projects", "Tasks", "Comments"]);
        assert_eq!(model.edges().len(), 4);
        assert_eq!(
            model.node("projects").map(|n| n.position),
            Some(Point::new(300.0, 100.0))
        );
    }

    #[test]
    fn duplicate_ids_fall_back_to_default() {
        let mut project = Project::new("Broken", "API");
        project.entities = Some(vec![entity("a", None), entity("a", None)]);
        let model = build_model(Some(&project), &LayoutConfig::default());
        assert!(model.contains("users"));
        assert!(!model.contains("a"));
    }

    #[test]
    fn empty_entity_list_falls_back_to_default() {
        let mut project = Project::new("Empty", "API");
        project.entities = Some(Vec::new());
        let model = build_model(Some(&project), &LayoutConfig::default());
        assert_eq!(model.nodes().len(), 4);
    }

    #[test]
    fn unpositioned_entities_fill_grid_without_overlap() {
        let config = LayoutConfig::default();
        let mut project = Project::new("Grid", "API");
        project.entities = Some(vec![
            entity("a", Some(Point::new(100.0, 100.0))),
            entity("b", None),
            entity("c", None),
            entity("d", None),
        ]);
        let model = build_model(Some(&project), &config);
        let positions: Vec<Point> = model.nodes().iter().map(|n| n.position).collect();
        assert_eq!(positions[0], Point::new(100.0, 100.0));
        assert_eq!(positions[1], Point::new(300.0, 100.0));
        assert_eq!(positions[2], Point::new(500.0, 100.0));
        assert_eq!(positions[3], Point::new(100.0, 300.0));
    }

    #[test]
    fn off_grid_explicit_entity_reserves_the_cells_it_covers() {
        let config = LayoutConfig::default();
        let mut project = Project::new("Grid", "API");
        project.entities = Some(vec![
            entity("a", Some(Point::new(110.0, 105.0))),
            entity("b", None),
            entity("c", None),
        ]);
        let model = build_model(Some(&project), &config);
        let boxes: Vec<Bounds> = model
            .nodes()
            .iter()
            .map(|n| {
                let height = config.header_height + n.fields.len() as f32 * config.field_row_height;
                Bounds::from_rect(n.position, config.node_min_width, height)
            })
            .collect();
        assert_eq!(model.nodes()[1].position, Point::new(300.0, 100.0));
        for (i, a) in boxes.iter().enumerate() {
            for b in &boxes[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn blank_name_uses_id() {
        let mut project = Project::new("Names", "API");
        project.entities = Some(vec![EntitySpec {
            id: "orders".to_string(),
            ..EntitySpec::default()
        }]);
        let model = build_model(Some(&project), &LayoutConfig::default());
        assert_eq!(model.nodes()[0].name, "orders");
    }

    #[test]
    fn dangling_relationships_are_kept_for_diagnosis() {
        let mut project = Project::new("Dangling", "API");
        project.entities = Some(vec![entity("a", None)]);
        project.relationships = Some(vec![RelationshipSpec {
            source: "a".to_string(),
            target: "ghost".to_string(),
            label: "haunts".to_string(),
            cardinality: Cardinality::Other("one-to-ghost".to_string()),
        }]);
        let model = build_model(Some(&project), &LayoutConfig::default());
        assert_eq!(model.edges().len(), 1);
        assert_eq!(model.edges()[0].cardinality.as_str(), "one-to-ghost");
    }
}
