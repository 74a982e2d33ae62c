//! Terrain features.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::TerrainId;
use crate::rules::RuleId;

/// Kind of terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainKind {
    Forest,
    Hill,
    Building,
    Obstacle,
    Field,
}

/// Axis-aligned footprint, in inches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// Bounds spanning two corners in any order.
    #[must_use]
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Whether a point lies inside (edges included).
    #[must_use]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// A piece of terrain and the rules it confers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainFeature {
    pub id: TerrainId,
    pub name: String,
    pub kind: TerrainKind,
    pub bounds: Bounds,
    pub rules: Vec<RuleId>,
}

impl TerrainFeature {
    /// Create a feature with no rules.
    pub fn new(id: TerrainId, name: impl Into<String>, kind: TerrainKind, bounds: Bounds) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            bounds,
            rules: Vec::new(),
        }
    }

    /// Attach a special rule (builder pattern).
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rules.push(RuleId::new(rule));
        self
    }
}
