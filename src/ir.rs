use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn scale(self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    pub fn midpoint(self, other: Point) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Relationship cardinality. Tags other than the known ones are carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToMany,
    Other(String),
}

impl Cardinality {
    pub fn as_str(&self) -> &str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany => "many-to-many",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::OneToMany
    }
}

impl From<String> for Cardinality {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "one-to-one" => Self::OneToOne,
            "one-to-many" => Self::OneToMany,
            "many-to-many" => Self::ManyToMany,
            _ => Self::Other(tag),
        }
    }
}

impl From<Cardinality> for String {
    fn from(value: Cardinality) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityNode {
    pub id: String,
    pub name: String,
    pub fields: Vec<String>,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipEdge {
    pub source: String,
    pub target: String,
    pub label: String,
    pub cardinality: Cardinality,
}

impl RelationshipEdge {
    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// Immutable diagram produced by the model builder. Nodes keep their
/// declaration order, which is also the draw order.
#[derive(Debug, Clone, Default)]
pub struct DiagramModel {
    nodes: Vec<EntityNode>,
    edges: Vec<RelationshipEdge>,
    index: HashMap<String, usize>,
}

impl DiagramModel {
    pub fn new(nodes: Vec<EntityNode>, edges: Vec<RelationshipEdge>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.clone(), idx))
            .collect();
        Self {
            nodes,
            edges,
            index,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[EntityNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[RelationshipEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&EntityNode> {
        self.index.get(id).map(|idx| &self.nodes[*idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub position: Option<Point>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSpec {
    pub source: String,
    pub target: String,
    #[serde(default, alias = "relationship")]
    pub label: String,
    #[serde(default, alias = "type")]
    pub cardinality: Cardinality,
}

/// Project record handed over by the host application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "title")]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<EntitySpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<RelationshipSpec>>,
}

impl Project {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Storage key: the explicit id when present, the display name otherwise.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(self.name.as_str())
    }
}
