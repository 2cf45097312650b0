//! Aperture definitions (`%AD`)

use std::collections::HashMap;
use std::rc::Rc;

use pcbmill_core::{GeometryError, ParseError, EPSILON};

use super::macros::ShapeResolver;
use crate::arc_expander::ArcExpander;
use crate::geometry::{shapes, Point, Polygon};

/// A defined aperture; dimensions in millimeters
#[derive(Clone)]
pub enum Aperture {
    Circle {
        diameter: f64,
        hole: Option<f64>,
    },
    Rectangle {
        width: f64,
        height: f64,
        hole: Option<f64>,
    },
    Obround {
        width: f64,
        height: f64,
        hole: Option<f64>,
    },
    Polygon {
        outer_diameter: f64,
        vertices: u32,
        rotation: f64,
        hole: Option<f64>,
    },
    /// Macro instance; `params` stay in file units and results are scaled
    Macro {
        name: String,
        params: Vec<f64>,
        scale: f64,
        resolver: Rc<dyn ShapeResolver>,
    },
}

impl std::fmt::Debug for Aperture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Circle { diameter, hole } => f
                .debug_struct("Circle")
                .field("diameter", diameter)
                .field("hole", hole)
                .finish(),
            Self::Rectangle { width, height, hole } => f
                .debug_struct("Rectangle")
                .field("width", width)
                .field("height", height)
                .field("hole", hole)
                .finish(),
            Self::Obround { width, height, hole } => f
                .debug_struct("Obround")
                .field("width", width)
                .field("height", height)
                .field("hole", hole)
                .finish(),
            Self::Polygon {
                outer_diameter,
                vertices,
                rotation,
                hole,
            } => f
                .debug_struct("Polygon")
                .field("outer_diameter", outer_diameter)
                .field("vertices", vertices)
                .field("rotation", rotation)
                .field("hole", hole)
                .finish(),
            Self::Macro { name, params, .. } => f
                .debug_struct("Macro")
                .field("name", name)
                .field("params", params)
                .finish(),
        }
    }
}

impl Aperture {
    fn hole(&self) -> Option<f64> {
        match self {
            Self::Circle { hole, .. }
            | Self::Rectangle { hole, .. }
            | Self::Obround { hole, .. }
            | Self::Polygon { hole, .. } => hole.filter(|d| *d > EPSILON),
            Self::Macro { .. } => None,
        }
    }

    /// Convex outline at the origin, used for strokes; `None` for macros
    pub fn convex_outline(&self) -> Option<Vec<Point>> {
        let origin = Point::origin();
        match self {
            Self::Circle { diameter, .. } => Some(shapes::circle(origin, *diameter)),
            Self::Rectangle { width, height, .. } => {
                Some(shapes::rectangle(origin, *width, *height))
            }
            Self::Obround { width, height, .. } => Some(shapes::obround(origin, *width, *height)),
            Self::Polygon {
                outer_diameter,
                vertices,
                rotation,
                ..
            } => Some(shapes::regular_polygon(
                origin,
                *outer_diameter,
                *vertices,
                *rotation,
            )),
            Self::Macro { .. } => None,
        }
    }

    /// Diameter of a circular aperture
    pub fn circle_diameter(&self) -> Option<f64> {
        match self {
            Self::Circle { diameter, .. } => Some(*diameter),
            _ => None,
        }
    }

    /// Flashed shape centered at `at`
    pub fn flash(&self, at: Point) -> Result<Vec<Polygon>, GeometryError> {
        if let Self::Macro {
            params,
            scale,
            resolver,
            ..
        } = self
        {
            let scale = *scale;
            return Ok(resolver
                .resolve(params)?
                .iter()
                .map(|p| p.map_points(|pt| pt * scale + at))
                .collect());
        }

        let outline = match self.convex_outline() {
            Some(points) => points,
            None => return Ok(Vec::new()),
        };
        let outer: Vec<Point> = outline.into_iter().map(|p| p + at).collect();
        let holes = match self.hole() {
            Some(d) => vec![ArcExpander::default().inscribed_circle(at, d / 2.0)],
            None => Vec::new(),
        };
        Ok(vec![Polygon::new(outer, holes)?])
    }
}

fn parse_modifier(line: usize, text: &str) -> Result<f64, ParseError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber {
            line,
            value: text.to_string(),
        })
}

/// Parse the body of an `%AD` command (after `AD`), e.g. `D10C,0.5X0.2`
///
/// `scale` converts file units to millimeters. Unknown template names are
/// looked up in `resolvers`.
pub fn parse_definition(
    line: usize,
    body: &str,
    scale: f64,
    resolvers: &HashMap<String, Rc<dyn ShapeResolver>>,
) -> Result<(u32, Aperture), ParseError> {
    let rest = body
        .strip_prefix('D')
        .ok_or_else(|| ParseError::InvalidParameter {
            line,
            reason: format!("aperture definition without D code: AD{}", body),
        })?;
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let code = rest[..digits_end]
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidNumber {
            line,
            value: rest[..digits_end].to_string(),
        })?;
    if code < 10 {
        return Err(ParseError::InvalidParameter {
            line,
            reason: format!("aperture number D{} is reserved", code),
        });
    }

    let template = &rest[digits_end..];
    let (name, modifiers) = match template.split_once(',') {
        Some((name, mods)) => (name, mods),
        None => (template, ""),
    };
    let values = if modifiers.trim().is_empty() {
        Vec::new()
    } else {
        modifiers
            .split('X')
            .map(|m| parse_modifier(line, m))
            .collect::<Result<Vec<f64>, _>>()?
    };
    let get = |i: usize| values.get(i).copied();
    let need = |i: usize| {
        get(i).ok_or_else(|| ParseError::InvalidParameter {
            line,
            reason: format!("aperture D{} {} is missing parameter {}", code, name, i + 1),
        })
    };
    let mm = |v: f64| v * scale;

    let aperture = match name {
        "C" => Aperture::Circle {
            diameter: mm(need(0)?),
            hole: get(1).map(mm),
        },
        "R" => Aperture::Rectangle {
            width: mm(need(0)?),
            height: mm(need(1)?),
            hole: get(2).map(mm),
        },
        "O" => Aperture::Obround {
            width: mm(need(0)?),
            height: mm(need(1)?),
            hole: get(2).map(mm),
        },
        "P" => {
            let vertices = need(1)?;
            if !(3.0..=12.0).contains(&vertices) {
                return Err(ParseError::InvalidParameter {
                    line,
                    reason: format!("polygon aperture D{} needs 3 to 12 vertices", code),
                });
            }
            Aperture::Polygon {
                outer_diameter: mm(need(0)?),
                vertices: vertices as u32,
                rotation: get(2).unwrap_or(0.0),
                hole: get(3).map(mm),
            }
        }
        _ => {
            let resolver = resolvers
                .get(name)
                .cloned()
                .ok_or_else(|| ParseError::UnknownCommand {
                    line,
                    command: format!("AD{}", body),
                })?;
            Aperture::Macro {
                name: name.to_string(),
                params: values.clone(),
                scale,
                resolver,
            }
        }
    };

    if let Some(size) = match &aperture {
        Aperture::Circle { diameter, .. } => Some(*diameter),
        Aperture::Rectangle { width, height, .. } | Aperture::Obround { width, height, .. } => {
            Some(width.min(*height))
        }
        Aperture::Polygon { outer_diameter, .. } => Some(*outer_diameter),
        Aperture::Macro { .. } => None,
    } {
        if !size.is_finite() || size < 0.0 {
            return Err(ParseError::InvalidParameter {
                line,
                reason: format!("aperture D{} has a negative size", code),
            });
        }
    }

    Ok((code, aperture))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{total_area, Containment};

    fn no_macros() -> HashMap<String, Rc<dyn ShapeResolver>> {
        HashMap::new()
    }

    #[test]
    fn test_parse_circle_with_hole() {
        let (code, ap) = parse_definition(3, "D10C,0.5X0.2", 1.0, &no_macros()).unwrap();
        assert_eq!(code, 10);
        let flash = ap.flash(Point::new(1.0, 1.0)).unwrap();
        assert_eq!(flash.len(), 1);
        assert_eq!(flash[0].holes.len(), 1);
        assert_eq!(flash[0].contains(Point::new(1.0, 1.0)), Containment::Outside);
    }

    #[test]
    fn test_inch_rectangle_is_scaled() {
        let (_, ap) = parse_definition(1, "D11R,0.1X0.05", 25.4, &no_macros()).unwrap();
        let flash = ap.flash(Point::origin()).unwrap();
        assert!((total_area(&flash) - 2.54 * 1.27).abs() < 1e-9);
    }

    #[test]
    fn test_missing_parameter() {
        let err = parse_definition(5, "D12R,1.0", 1.0, &no_macros()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidParameter { line: 5, .. }));
    }

    #[test]
    fn test_unknown_template() {
        let err = parse_definition(8, "D13THERMAL80,1", 1.0, &no_macros()).unwrap_err();
        assert!(matches!(err, ParseError::UnknownCommand { line: 8, .. }));
    }
}
