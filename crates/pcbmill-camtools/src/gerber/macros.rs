//! Aperture macros
//!
//! `%AM` bodies are parsed once into statements with pre-parsed arithmetic
//! expressions and evaluated per aperture instance. Macro evaluation sits
//! behind [`ShapeResolver`] so callers can register their own shapes.

use std::collections::HashMap;

use pcbmill_core::{GeometryError, ParseError};

use crate::arc_expander::ArcExpander;
use crate::geometry::{
    shapes, subtract, union, FillRule, Point, Polygon, EPSILON, MAX_OVERLAY_VERTICES,
};

/// Resolves aperture parameters into polygons at the origin
///
/// Parameters and returned coordinates are in the units of the file the
/// aperture was defined in; the parser scales the result to millimeters.
pub trait ShapeResolver {
    fn resolve(&self, params: &[f64]) -> Result<Vec<Polygon>, GeometryError>;
}

/// Binary operator of a macro expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

/// Arithmetic expression of a macro body
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(u32),
    Negate(Box<Expr>),
    Binary(Box<Expr>, Op, Box<Expr>),
}

impl Expr {
    fn eval(&self, vars: &HashMap<u32, f64>) -> f64 {
        match self {
            Expr::Number(v) => *v,
            // Undefined variables evaluate to zero.
            Expr::Variable(n) => vars.get(n).copied().unwrap_or(0.0),
            Expr::Negate(e) => -e.eval(vars),
            Expr::Binary(a, op, b) => {
                let (a, b) = (a.eval(vars), b.eval(vars));
                match op {
                    Op::Add => a + b,
                    Op::Sub => a - b,
                    Op::Mul => a * b,
                    Op::Div => {
                        if b.abs() < f64::EPSILON {
                            tracing::warn!("Division by zero in aperture macro, using 0");
                            0.0
                        } else {
                            a / b
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Variable(u32),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' => {}
            '+' | '-' | '/' => tokens.push(Token::Op(c)),
            'x' | 'X' => tokens.push(Token::Op('x')),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '$' => {
                let mut num = String::new();
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    num.push(d);
                }
                let n = num
                    .parse::<u32>()
                    .map_err(|_| "invalid variable after $".to_string())?;
                tokens.push(Token::Variable(n));
            }
            '0'..='9' | '.' => {
                let mut num = String::from(c);
                while let Some(d) = chars.next_if(|p| p.is_ascii_digit() || *p == '.') {
                    num.push(d);
                }
                let v = num
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number: {}", num))?;
                tokens.push(Token::Number(v));
            }
            _ => return Err(format!("unexpected character in expression: {}", c)),
        }
    }
    Ok(tokens)
}

fn parse_additive(tokens: &[Token]) -> Result<(Expr, &[Token]), String> {
    let (mut left, mut rest) = parse_multiplicative(tokens)?;
    while let Some(Token::Op(c @ ('+' | '-'))) = rest.first() {
        let op = if *c == '+' { Op::Add } else { Op::Sub };
        let (right, tail) = parse_multiplicative(&rest[1..])?;
        left = Expr::Binary(Box::new(left), op, Box::new(right));
        rest = tail;
    }
    Ok((left, rest))
}

fn parse_multiplicative(tokens: &[Token]) -> Result<(Expr, &[Token]), String> {
    let (mut left, mut rest) = parse_unary(tokens)?;
    while let Some(Token::Op(c @ ('x' | '/'))) = rest.first() {
        let op = if *c == 'x' { Op::Mul } else { Op::Div };
        let (right, tail) = parse_unary(&rest[1..])?;
        left = Expr::Binary(Box::new(left), op, Box::new(right));
        rest = tail;
    }
    Ok((left, rest))
}

fn parse_unary(tokens: &[Token]) -> Result<(Expr, &[Token]), String> {
    match tokens.first() {
        Some(Token::Op('+')) => parse_unary(&tokens[1..]),
        Some(Token::Op('-')) => {
            let (e, rest) = parse_unary(&tokens[1..])?;
            Ok((Expr::Negate(Box::new(e)), rest))
        }
        Some(Token::LParen) => {
            let (e, rest) = parse_additive(&tokens[1..])?;
            match rest.first() {
                Some(Token::RParen) => Ok((e, &rest[1..])),
                _ => Err("missing closing parenthesis".to_string()),
            }
        }
        Some(Token::Number(v)) => Ok((Expr::Number(*v), &tokens[1..])),
        Some(Token::Variable(n)) => Ok((Expr::Variable(*n), &tokens[1..])),
        _ => Err("expected a value".to_string()),
    }
}

/// Parse one macro expression such as `$1x0.5+($2-1)`
pub fn parse_expression(text: &str) -> Result<Expr, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Expr::Number(0.0));
    }
    let tokens = tokenize(text)?;
    let (expr, rest) = parse_additive(&tokens)?;
    if !rest.is_empty() {
        return Err("unexpected tokens in expression".to_string());
    }
    Ok(expr)
}

/// Macro primitive codes that can be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrimitiveCode {
    Circle,
    VectorLine,
    CenterLine,
    Outline,
    Polygon,
    Thermal,
}

impl PrimitiveCode {
    fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Circle),
            2 | 20 => Some(Self::VectorLine),
            21 => Some(Self::CenterLine),
            4 => Some(Self::Outline),
            5 => Some(Self::Polygon),
            7 => Some(Self::Thermal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Assign { var: u32, expr: Expr },
    Primitive { code: PrimitiveCode, args: Vec<Expr> },
}

/// A parsed `%AM` definition
#[derive(Debug, Clone, PartialEq)]
pub struct ApertureMacro {
    pub name: String,
    statements: Vec<Statement>,
}

impl ApertureMacro {
    /// Parse the body words of an `%AM` block; `line` is used for errors
    pub fn parse(name: &str, body: &[String], line: usize) -> Result<Self, ParseError> {
        let mut statements = Vec::new();
        let invalid = |reason: String| ParseError::InvalidParameter { line, reason };

        for word in body {
            let word = word.trim();
            if word.is_empty() || word == "0" || word.starts_with("0 ") {
                continue;
            }
            if let Some(assign) = word.strip_prefix('$') {
                let (var, expr) = assign
                    .split_once('=')
                    .ok_or_else(|| invalid(format!("malformed macro statement '{}'", word)))?;
                let var = var
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| invalid(format!("invalid macro variable '${}'", var)))?;
                let expr = parse_expression(expr)
                    .map_err(|e| invalid(format!("macro {}: {}", name, e)))?;
                statements.push(Statement::Assign { var, expr });
                continue;
            }

            let mut fields = word.split(',');
            let code_text = fields.next().unwrap_or_default().trim();
            let code = code_text
                .parse::<u32>()
                .ok()
                .and_then(PrimitiveCode::from_code)
                .ok_or_else(|| ParseError::UnknownCommand {
                    line,
                    command: format!("AM primitive {}", code_text),
                })?;
            let args = fields
                .map(parse_expression)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| invalid(format!("macro {}: {}", name, e)))?;
            statements.push(Statement::Primitive { code, args });
        }

        Ok(Self {
            name: name.to_string(),
            statements,
        })
    }
}

fn arg(values: &[f64], index: usize) -> f64 {
    values.get(index).copied().unwrap_or(0.0)
}

/// Vertex count field of a primitive, bounded by the overlay budget
fn vertex_count(value: f64) -> Result<usize, GeometryError> {
    if value.is_nan() {
        return Err(GeometryError::InvalidParameter {
            name: "vertex count".to_string(),
            reason: "not a number".to_string(),
        });
    }
    if value > MAX_OVERLAY_VERTICES as f64 {
        return Err(GeometryError::TooComplex {
            vertices: value as usize,
            limit: MAX_OVERLAY_VERTICES,
        });
    }
    Ok(value.max(0.0) as usize)
}

fn primitive_shape(
    code: PrimitiveCode,
    v: &[f64],
) -> Result<(bool, Vec<Polygon>), GeometryError> {
    let exposure_on = arg(v, 0) != 0.0;
    let shape = match code {
        PrimitiveCode::Circle => {
            let pts = shapes::circle(Point::new(arg(v, 2), arg(v, 3)), arg(v, 1));
            vec![Polygon::simple(shapes::rotate_points(&pts, arg(v, 4)))?]
        }
        PrimitiveCode::VectorLine => {
            let width = arg(v, 1);
            let start = Point::new(arg(v, 2), arg(v, 3));
            let end = Point::new(arg(v, 4), arg(v, 5));
            let normal = (end - start).normalized().perp() * (width / 2.0);
            let pts = vec![start - normal, end - normal, end + normal, start + normal];
            vec![Polygon::simple(shapes::rotate_points(&pts, arg(v, 6)))?]
        }
        PrimitiveCode::CenterLine => {
            let pts = shapes::rectangle(Point::new(arg(v, 3), arg(v, 4)), arg(v, 1), arg(v, 2));
            vec![Polygon::simple(shapes::rotate_points(&pts, arg(v, 5)))?]
        }
        PrimitiveCode::Outline => {
            let count = vertex_count(arg(v, 1))?;
            // start point plus `count` vertices, each an x,y pair
            let needed = 2 + 2 * (count + 1);
            if v.len() < needed {
                return Err(GeometryError::InvalidParameter {
                    name: "outline vertex count".to_string(),
                    reason: format!(
                        "{} vertices need {} values, found {}",
                        count,
                        needed,
                        v.len()
                    ),
                });
            }
            let pts: Vec<Point> = (0..=count)
                .map(|i| Point::new(arg(v, 2 + 2 * i), arg(v, 3 + 2 * i)))
                .collect();
            let rotation = arg(v, 4 + 2 * count);
            vec![Polygon::simple(shapes::rotate_points(&pts, rotation))?]
        }
        PrimitiveCode::Polygon => {
            let pts = shapes::regular_polygon(
                Point::new(arg(v, 2), arg(v, 3)),
                arg(v, 4),
                vertex_count(arg(v, 1))?.max(3) as u32,
                0.0,
            );
            vec![Polygon::simple(shapes::rotate_points(&pts, arg(v, 5)))?]
        }
        PrimitiveCode::Thermal => return Ok((true, thermal(v)?)),
    };
    Ok((exposure_on, shape))
}

/// Thermal: ring with a cross-shaped gap; parameters have no exposure field
fn thermal(v: &[f64]) -> Result<Vec<Polygon>, GeometryError> {
    let center = Point::new(arg(v, 0), arg(v, 1));
    let outer = arg(v, 2);
    let inner = arg(v, 3);
    let gap = arg(v, 4);
    let rotation = arg(v, 5);

    let ring = Polygon::new(
        shapes::circle(center, outer),
        if inner > EPSILON {
            vec![ArcExpander::default().inscribed_circle(center, inner / 2.0)]
        } else {
            Vec::new()
        },
    )?;
    let bars = [
        Polygon::simple(shapes::rectangle(center, outer * 2.0, gap))?,
        Polygon::simple(shapes::rectangle(center, gap, outer * 2.0))?,
    ];
    let cut = subtract(&[ring], &bars, FillRule::NonZero)?;
    Ok(cut
        .iter()
        .map(|p| p.map_points(|pt| pt.rotate(rotation.to_radians())))
        .collect())
}

impl ShapeResolver for ApertureMacro {
    fn resolve(&self, params: &[f64]) -> Result<Vec<Polygon>, GeometryError> {
        let mut vars: HashMap<u32, f64> = params
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as u32 + 1, v))
            .collect();
        let mut result: Vec<Polygon> = Vec::new();

        for statement in &self.statements {
            match statement {
                Statement::Assign { var, expr } => {
                    let value = expr.eval(&vars);
                    vars.insert(*var, value);
                }
                Statement::Primitive { code, args } => {
                    let values: Vec<f64> = args.iter().map(|e| e.eval(&vars)).collect();
                    let (exposure_on, shape) = primitive_shape(*code, &values)?;
                    result = if exposure_on {
                        union(&result, &shape, FillRule::NonZero)?
                    } else {
                        subtract(&result, &shape, FillRule::NonZero)?
                    };
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{total_area, Containment};

    fn words(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_expression_precedence() {
        let vars: HashMap<u32, f64> = [(1, 2.0), (2, 3.0)].into_iter().collect();
        let e = parse_expression("$1+$2x2").unwrap();
        assert_eq!(e.eval(&vars), 8.0);
        let e = parse_expression("($1+$2)x2").unwrap();
        assert_eq!(e.eval(&vars), 10.0);
        let e = parse_expression("-$1/4").unwrap();
        assert_eq!(e.eval(&vars), -0.5);
        assert!(parse_expression("1+").is_err());
        assert!(parse_expression("(1").is_err());
    }

    #[test]
    fn test_center_line_macro_with_parameters() {
        let m = ApertureMacro::parse("BOX", &words(&["0 box", "21,1,$1,$2,0,0,0"]), 1).unwrap();
        let polys = m.resolve(&[2.0, 1.0]).unwrap();
        assert!((total_area(&polys) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_exposure_off_cuts_hole() {
        let m = ApertureMacro::parse(
            "DONUT",
            &words(&["1,1,$1,0,0", "$2=$1/2", "1,0,$2,0,0"]),
            1,
        )
        .unwrap();
        let polys = m.resolve(&[2.0]).unwrap();
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].holes.len(), 1);
        assert_eq!(polys[0].contains(Point::origin()), Containment::Outside);
    }

    #[test]
    fn test_outline_primitive() {
        let m = ApertureMacro::parse(
            "TRI",
            &words(&["4,1,3,0,0,1,0,0,1,0,0,0"]),
            1,
        )
        .unwrap();
        let polys = m.resolve(&[]).unwrap();
        assert!((total_area(&polys) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_thermal_has_four_spokes_removed() {
        let m = ApertureMacro::parse("TH", &words(&["7,0,0,2,1,0.2,0"]), 1).unwrap();
        let polys = m.resolve(&[]).unwrap();
        assert_eq!(polys.len(), 4);
    }

    #[test]
    fn test_moire_is_rejected() {
        let err = ApertureMacro::parse("M", &words(&["6,0,0,5,0.5,0.5,2,0.1,6,0"]), 9)
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownCommand {
                line: 9,
                command: "AM primitive 6".to_string()
            }
        );
    }

    #[test]
    fn test_oversized_vertex_counts_rejected() {
        let huge = format!("4,1,{},0,0,1,0,0,1,0", "9".repeat(40));
        let m = ApertureMacro::parse("BIG", &words(&[huge.as_str()]), 1).unwrap();
        let err = m.resolve(&[]).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::TooComplex {
                limit: MAX_OVERLAY_VERTICES,
                ..
            }
        ));

        let m = ApertureMacro::parse("POLY", &words(&["5,1,10000000,0,0,1,0"]), 1).unwrap();
        assert!(matches!(
            m.resolve(&[]).unwrap_err(),
            GeometryError::TooComplex { .. }
        ));
    }

    #[test]
    fn test_outline_count_must_match_coordinates() {
        let m = ApertureMacro::parse("SHORT", &words(&["4,1,5,0,0,1,0,0,1,0"]), 1).unwrap();
        assert!(matches!(
            m.resolve(&[]).unwrap_err(),
            GeometryError::InvalidParameter { .. }
        ));
    }
}
