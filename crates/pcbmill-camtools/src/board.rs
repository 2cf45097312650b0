//! Board model: parsed layers and drill holes in one coordinate system

use serde::{Deserialize, Serialize};

use crate::geometry::{bounding_box, BoundingBox, Point, Polygon};

/// Role of a Gerber layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    /// Copper features to isolate
    Copper,
    /// Board edge contours to cut out
    Outline,
}

/// A resolved layer; owns its polygons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub kind: LayerKind,
    pub polygons: Vec<Polygon>,
}

impl Layer {
    pub fn new(name: impl Into<String>, kind: LayerKind, polygons: Vec<Polygon>) -> Self {
        Self {
            name: name.into(),
            kind,
            polygons,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        bounding_box(&self.polygons)
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

/// One drill hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrillHole {
    pub position: Point,
    /// Finished diameter in mm
    pub diameter: f64,
    pub plated: bool,
    /// Excellon tool index the hole was drilled with
    pub tool: u32,
}

impl DrillHole {
    pub fn bounding_box(&self) -> BoundingBox {
        let r = self.diameter / 2.0;
        BoundingBox::new(
            self.position.x - r,
            self.position.y - r,
            self.position.x + r,
            self.position.y + r,
        )
    }
}

/// Layers plus drill holes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardModel {
    pub layers: Vec<Layer>,
    pub holes: Vec<DrillHole>,
}

impl BoardModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn with_holes(mut self, holes: Vec<DrillHole>) -> Self {
        self.holes.extend(holes);
        self
    }

    pub fn copper_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.kind == LayerKind::Copper)
    }

    pub fn outline_layer(&self) -> Option<&Layer> {
        self.layers.iter().find(|l| l.kind == LayerKind::Outline)
    }

    /// Combined extent of every layer and hole
    pub fn bounds(&self) -> BoundingBox {
        let layers = self
            .layers
            .iter()
            .fold(BoundingBox::empty(), |acc, l| acc.union(&l.bounding_box()));
        self.holes
            .iter()
            .fold(layers, |acc, h| acc.union(&h.bounding_box()))
    }
}
