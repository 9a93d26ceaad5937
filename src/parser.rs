use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ir::{EntitySpec, Point, Project, RelationshipSpec};

/// Decodes a project record from JSON or JSON5. Only undecodable text is an
/// error; a schema section with the wrong shape is dropped so the model
/// builder falls back to its default schema.
pub fn parse_project(input: &str) -> Result<Project> {
    let value = match serde_json::from_str::<Value>(input) {
        Ok(value) => value,
        Err(json_err) => json5::from_str::<Value>(input)
            .map_err(|json5_err| anyhow!("invalid project record: {json_err} ({json5_err})"))?,
    };
    project_from_value(&value)
}

pub fn project_from_value(value: &Value) -> Result<Project> {
    let Some(object) = value.as_object() else {
        return Err(anyhow!("project record must be an object"));
    };

    let name = string_field(value, "name")
        .or_else(|| string_field(value, "title"))
        .unwrap_or_default();
    let kind = string_field(value, "type").unwrap_or_default();
    let id = match object.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    };

    let entities = object.get("entities").and_then(|raw| {
        let normalized = match raw {
            Value::Array(items) => Value::Array(items.iter().map(normalize_entity).collect()),
            other => other.clone(),
        };
        lenient_list::<EntitySpec>("entities", &normalized)
    });
    let relationships = object
        .get("relationships")
        .and_then(|raw| lenient_list::<RelationshipSpec>("relationships", raw));

    Ok(Project {
        id,
        name,
        kind,
        entities,
        relationships,
    })
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn lenient_list<T: DeserializeOwned>(section: &str, raw: &Value) -> Option<Vec<T>> {
    match serde_json::from_value::<Vec<T>>(raw.clone()) {
        Ok(items) => Some(items),
        Err(err) => {
            tracing::warn!(section, error = %err, "ignoring malformed schema section");
            None
        }
    }
}

// Entities may carry flat `x`/`y` keys instead of a `position` object.
fn normalize_entity(entry: &Value) -> Value {
    let mut entry = entry.clone();
    if let Some(object) = entry.as_object_mut()
        && !object.contains_key("position")
        && let (Some(x), Some(y)) = (
            object.get("x").and_then(Value::as_f64),
            object.get("y").and_then(Value::as_f64),
        )
    {
        let position = Point::new(x as f32, y as f32);
        if let Ok(position) = serde_json::to_value(position) {
            object.insert("position".to_string(), position);
        }
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Cardinality;

    #[test]
    fn parses_minimal_record() {
        let project = parse_project(r#"{"name": "Task App", "type": "Web Application"}"#).unwrap();
        assert_eq!(project.name, "Task App");
        assert_eq!(project.kind, "Web Application");
        assert!(project.entities.is_none());
        assert!(project.relationships.is_none());
    }

    #[test]
    fn accepts_title_alias_and_json5() {
        let project = parse_project("{title: 'Task Management Web Application', id: 1,}").unwrap();
        assert_eq!(project.name, "Task Management Web Application");
        assert_eq!(project.id.as_deref(), Some("1"));
    }

    #[test]
    fn parses_schema_with_flat_coordinates() {
        let project = parse_project(
            r#"{
                "name": "Shop",
                "entities": [
                    {"id": "orders", "name": "Orders", "fields": ["id"], "x": 10, "y": 20},
                    {"id": "items", "name": "Items", "fields": ["id", "order_id"]}
                ],
                "relationships": [
                    {"source": "orders", "target": "items", "relationship": "contains", "type": "one-to-many"}
                ]
            }"#,
        )
        .unwrap();
        let entities = project.entities.unwrap();
        assert_eq!(entities[0].position, Some(Point::new(10.0, 20.0)));
        assert_eq!(entities[1].position, None);
        let relationships = project.relationships.unwrap();
        assert_eq!(relationships[0].label, "contains");
        assert_eq!(relationships[0].cardinality, Cardinality::OneToMany);
    }

    #[test]
    fn malformed_schema_section_is_dropped() {
        let project =
            parse_project(r#"{"name": "Odd", "entities": "not-a-list", "relationships": [{}]}"#)
                .unwrap();
        assert!(project.entities.is_none());
        assert!(project.relationships.is_none());
    }

    #[test]
    fn rejects_non_object_and_garbage() {
        assert!(parse_project("[1, 2, 3]").is_err());
        assert!(parse_project("{{{").is_err());
    }
}
