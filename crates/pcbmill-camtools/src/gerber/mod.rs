//! Gerber (RS-274X) parser
//!
//! Text is split into blocks by [`lexer`], interpreted by a
//! [`parser::ParserState`] created per call and resolved into one [`Layer`]:
//! the dark-minus-clear copper image for copper layers, or the closed board
//! contours for outline layers.

pub mod aperture;
pub mod lexer;
pub mod macros;
pub mod outline;
pub mod parser;

use std::collections::HashMap;
use std::rc::Rc;

use tracing::info;

use pcbmill_core::{ParseError, Units};

use crate::board::{Layer, LayerKind};

pub use aperture::Aperture;
pub use macros::{ApertureMacro, ShapeResolver};
use parser::ParserState;

/// Gerber parser configured for one layer kind
///
/// # Examples
///
/// ```
/// use pcbmill_camtools::{GerberParser, LayerKind};
///
/// let text = "%FSLAX26Y26*%\n%MOMM*%\n%ADD10R,10X5*%\nD10*\nX5000000Y2500000D03*\nM02*\n";
/// let layer = GerberParser::new(LayerKind::Copper).parse("top", text).unwrap();
/// assert_eq!(layer.polygons.len(), 1);
/// ```
#[derive(Clone)]
pub struct GerberParser {
    kind: LayerKind,
    units_hint: Units,
    resolvers: HashMap<String, Rc<dyn ShapeResolver>>,
}

impl GerberParser {
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            units_hint: Units::Millimeters,
            resolvers: HashMap::new(),
        }
    }

    /// Units assumed until the file sets `%MO`
    pub fn with_units_hint(mut self, units: Units) -> Self {
        self.units_hint = units;
        self
    }

    /// Register a named shape usable in `%AD` like a macro
    ///
    /// A `%AM` of the same name in the file replaces it for that parse.
    pub fn with_resolver(
        mut self,
        name: impl Into<String>,
        resolver: impl ShapeResolver + 'static,
    ) -> Self {
        self.resolvers.insert(name.into(), Rc::new(resolver));
        self
    }

    /// Parse a complete Gerber buffer into a layer named `name`
    pub fn parse(&self, name: &str, text: &str) -> Result<Layer, ParseError> {
        let blocks = lexer::tokenize(text)?;
        let state = ParserState::new(self.kind, self.units_hint, self.resolvers.clone());
        let polygons = state.run(&blocks)?;
        info!(
            layer = name,
            kind = ?self.kind,
            blocks = blocks.len(),
            polygons = polygons.len(),
            "Parsed Gerber layer"
        );
        Ok(Layer::new(name, self.kind, polygons))
    }
}
