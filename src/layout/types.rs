use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ir::Point;

/// Pan offset and zoom scale applied to the whole diagram surface.
/// `screen = world * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f32,
    pub offset: Point,
}

impl ViewTransform {
    pub const IDENTITY: ViewTransform = ViewTransform {
        scale: 1.0,
        offset: Point::ORIGIN,
    };

    pub fn to_screen(&self, world: Point) -> Point {
        world.scale(self.scale) + self.offset
    }

    pub fn to_world(&self, screen: Point) -> Point {
        (screen - self.offset).scale(1.0 / self.scale)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn from_rect(origin: Point, width: f32, height: f32) -> Self {
        Self {
            min: origin,
            max: Point::new(origin.x + width, origin.y + height),
        }
    }

    pub fn union(self, other: Bounds) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    pub fn include(self, point: Point) -> Self {
        self.union(Bounds {
            min: point,
            max: point,
        })
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Strict overlap; boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }
}

/// Size of an entity box and where edges attach, relative to its origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeGeometry {
    pub width: f32,
    pub height: f32,
    pub anchor: Point,
}

/// Serializable positions and transform, read by the saved-project store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub positions: BTreeMap<String, Point>,
    pub transform: ViewTransform,
}
