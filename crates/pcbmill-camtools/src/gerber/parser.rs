//! RS-274X interpreter
//!
//! [`ParserState`] carries every graphics mode through the block stream and
//! accumulates the image. It is created per parse call, so parsing is
//! re-entrant.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;
use std::rc::Rc;

use regex::Regex;
use tracing::{debug, warn};

use pcbmill_core::{GeometryError, ParseError, Units, EPSILON};

use super::aperture::{self, Aperture};
use super::lexer::Block;
use super::macros::{ApertureMacro, ShapeResolver};
use super::outline;
use crate::board::LayerKind;
use crate::geometry::{
    flatten_elements, polygons_from_loops, shapes, signed_area, subtract, union, Arc,
    ArcDirection, BoundaryElement, FillRule, Point, Polygon, Segment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZeroOmission {
    Leading,
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Notation {
    Absolute,
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interpolation {
    Linear,
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuadrantMode {
    Single,
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Dark,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Interpolate,
    Move,
    Flash,
}

/// Digits of one axis from `%FS`
#[derive(Debug, Clone, Copy)]
struct AxisFormat {
    integer: usize,
    decimal: usize,
}

#[derive(Debug, Clone, Copy)]
struct CoordinateFormat {
    omission: ZeroOmission,
    x: AxisFormat,
    y: AxisFormat,
}

/// Open `%SR` block
struct StepRepeat {
    x_count: u32,
    y_count: u32,
    dx: f64,
    dy: f64,
    outer_image: Vec<Polygon>,
    outline_start: usize,
}

/// Raw fields of a word command
#[derive(Debug, Default)]
struct WordFields<'a> {
    g: Option<u32>,
    x: Option<&'a str>,
    y: Option<&'a str>,
    i: Option<&'a str>,
    j: Option<&'a str>,
    d: Option<u32>,
}

fn word_regex() -> &'static Regex {
    static WORD_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    WORD_REGEX.get_or_init(|| {
        Regex::new(
            r"^(?:G0*(\d+))?(?:X([+-]?[\d.]+))?(?:Y([+-]?[\d.]+))?(?:I([+-]?[\d.]+))?(?:J([+-]?[\d.]+))?(?:D0*(\d+))?$",
        )
        .expect("invalid regex pattern")
    })
}

fn format_regex() -> &'static Regex {
    static FORMAT_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    FORMAT_REGEX.get_or_init(|| {
        Regex::new(r"^FS([LTD]?)([AI])(?:N\d+)?(?:G\d+)?X(\d)(\d)Y(\d)(\d)")
            .expect("invalid regex pattern")
    })
}

fn step_repeat_regex() -> &'static Regex {
    static SR_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    SR_REGEX.get_or_init(|| {
        Regex::new(r"^SR(?:X(\d+))?(?:Y(\d+))?(?:I([+-]?[\d.]+))?(?:J([+-]?[\d.]+))?$")
            .expect("invalid regex pattern")
    })
}

/// Interpreter state for one Gerber file
pub struct ParserState {
    kind: LayerKind,
    units: Units,
    format: Option<CoordinateFormat>,
    notation: Notation,
    interpolation: Interpolation,
    quadrant: QuadrantMode,
    polarity: Polarity,
    resolvers: HashMap<String, Rc<dyn ShapeResolver>>,
    apertures: HashMap<u32, Aperture>,
    current_aperture: Option<u32>,
    position: Point,
    last_operation: Option<Operation>,
    in_region: bool,
    contour: Vec<BoundaryElement>,
    region_loops: Vec<Vec<Point>>,
    image: Vec<Polygon>,
    batch: Vec<Polygon>,
    batch_polarity: Polarity,
    outline_elements: Vec<BoundaryElement>,
    step_repeat: Option<StepRepeat>,
    finished: bool,
    line: usize,
}

impl ParserState {
    pub fn new(
        kind: LayerKind,
        units: Units,
        resolvers: HashMap<String, Rc<dyn ShapeResolver>>,
    ) -> Self {
        Self {
            kind,
            units,
            format: None,
            notation: Notation::Absolute,
            interpolation: Interpolation::Linear,
            quadrant: QuadrantMode::Single,
            polarity: Polarity::Dark,
            resolvers,
            apertures: HashMap::new(),
            current_aperture: None,
            position: Point::origin(),
            last_operation: None,
            in_region: false,
            contour: Vec::new(),
            region_loops: Vec::new(),
            image: Vec::new(),
            batch: Vec::new(),
            batch_polarity: Polarity::Dark,
            outline_elements: Vec::new(),
            step_repeat: None,
            finished: false,
            line: 0,
        }
    }

    /// Run every block, then resolve the final polygons
    pub fn run(mut self, blocks: &[Block]) -> Result<Vec<Polygon>, ParseError> {
        for block in blocks {
            if self.finished {
                break;
            }
            self.line = block.line();
            match block {
                Block::Word { text, .. } => self.word(text)?,
                Block::Extended { words, .. } => self.extended(words)?,
            }
        }
        self.finish()
    }

    fn geometry(&self, source: GeometryError) -> ParseError {
        ParseError::InvalidGeometry {
            line: self.line,
            source,
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> ParseError {
        ParseError::InvalidParameter {
            line: self.line,
            reason: reason.into(),
        }
    }

    fn unknown(&self, command: &str) -> ParseError {
        ParseError::UnknownCommand {
            line: self.line,
            command: command.to_string(),
        }
    }

    // ---- extended commands ----

    fn extended(&mut self, words: &[String]) -> Result<(), ParseError> {
        let Some(first) = words.first() else {
            return Ok(());
        };
        if let Some(name) = first.strip_prefix("AM") {
            let definition = ApertureMacro::parse(name, &words[1..], self.line)?;
            debug!(line = self.line, name, "Aperture macro defined");
            self.resolvers
                .insert(name.to_string(), Rc::new(definition));
            return Ok(());
        }
        for word in words {
            self.extended_word(word)?;
        }
        Ok(())
    }

    fn extended_word(&mut self, word: &str) -> Result<(), ParseError> {
        let code = word.get(..2).unwrap_or(word);
        match code {
            "FS" => self.format_spec(word),
            "MO" => {
                self.units = match &word[2..] {
                    "MM" => Units::Millimeters,
                    "IN" => Units::Inches,
                    other => return Err(self.invalid(format!("unknown unit mode '{}'", other))),
                };
                debug!(line = self.line, units = %self.units, "Unit mode");
                Ok(())
            }
            "AD" => {
                let (number, definition) = aperture::parse_definition(
                    self.line,
                    &word[2..],
                    self.units.to_mm_factor(),
                    &self.resolvers,
                )?;
                debug!(line = self.line, number, ?definition, "Aperture defined");
                self.apertures.insert(number, definition);
                Ok(())
            }
            "LP" => {
                self.polarity = match &word[2..] {
                    "D" => Polarity::Dark,
                    "C" => Polarity::Clear,
                    other => return Err(self.invalid(format!("unknown polarity '{}'", other))),
                };
                Ok(())
            }
            "SR" => self.step_repeat_command(word),
            "LN" | "IN" | "TF" | "TA" | "TO" | "TD" => {
                debug!(line = self.line, command = word, "Ignoring attribute");
                Ok(())
            }
            "IP" if word == "IPPOS" => Ok(()),
            "LM" if word == "LMN" => Ok(()),
            "LR" if identity_value(&word[2..], 0.0) => Ok(()),
            "LS" if identity_value(&word[2..], 1.0) => Ok(()),
            _ => Err(self.unknown(word)),
        }
    }

    fn format_spec(&mut self, word: &str) -> Result<(), ParseError> {
        let caps = format_regex()
            .captures(word)
            .ok_or_else(|| self.invalid(format!("malformed format statement '{}'", word)))?;
        let digit = |i: usize| -> usize {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };
        let omission = match caps.get(1).map(|m| m.as_str()) {
            Some("T") => ZeroOmission::Trailing,
            _ => ZeroOmission::Leading,
        };
        self.notation = match caps.get(2).map(|m| m.as_str()) {
            Some("I") => Notation::Incremental,
            _ => Notation::Absolute,
        };
        self.format = Some(CoordinateFormat {
            omission,
            x: AxisFormat {
                integer: digit(3),
                decimal: digit(4),
            },
            y: AxisFormat {
                integer: digit(5),
                decimal: digit(6),
            },
        });
        debug!(line = self.line, format = ?self.format, "Coordinate format");
        Ok(())
    }

    fn step_repeat_command(&mut self, word: &str) -> Result<(), ParseError> {
        let caps = step_repeat_regex()
            .captures(word)
            .ok_or_else(|| self.invalid(format!("malformed step and repeat '{}'", word)))?;
        // any open block ends here
        self.close_step_repeat()?;

        let count = |i: usize| -> u32 {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(1)
        };
        let distance = |i: usize| -> Result<f64, ParseError> {
            match caps.get(i) {
                Some(m) => m
                    .as_str()
                    .parse::<f64>()
                    .map(|v| self.units.to_mm(v))
                    .map_err(|_| ParseError::InvalidNumber {
                        line: self.line,
                        value: m.as_str().to_string(),
                    }),
                None => Ok(0.0),
            }
        };
        let (x_count, y_count) = (count(1), count(2));
        if x_count == 0 || y_count == 0 {
            return Err(self.invalid("step and repeat count must be at least 1"));
        }
        if x_count == 1 && y_count == 1 {
            return Ok(());
        }
        let (dx, dy) = (distance(3)?, distance(4)?);
        self.flush()?;
        self.step_repeat = Some(StepRepeat {
            x_count,
            y_count,
            dx,
            dy,
            outer_image: std::mem::take(&mut self.image),
            outline_start: self.outline_elements.len(),
        });
        Ok(())
    }

    fn close_step_repeat(&mut self) -> Result<(), ParseError> {
        let Some(sr) = self.step_repeat.take() else {
            return Ok(());
        };
        self.flush()?;
        let block = std::mem::replace(&mut self.image, sr.outer_image);
        let drawn: Vec<BoundaryElement> = self.outline_elements[sr.outline_start..].to_vec();

        let mut copies = Vec::new();
        for ix in 0..sr.x_count {
            for iy in 0..sr.y_count {
                let shift = Point::new(ix as f64 * sr.dx, iy as f64 * sr.dy);
                copies.extend(block.iter().map(|p| p.translated(shift)));
                if ix == 0 && iy == 0 {
                    continue;
                }
                self.outline_elements
                    .extend(drawn.iter().map(|e| translate_element(e, shift)));
            }
        }
        debug!(
            line = self.line,
            x = sr.x_count,
            y = sr.y_count,
            "Step and repeat block replicated"
        );
        self.image = union(&self.image, &copies, FillRule::NonZero).map_err(|e| self.geometry(e))?;
        Ok(())
    }

    // ---- word commands ----

    fn word(&mut self, text: &str) -> Result<(), ParseError> {
        if text.starts_with("G04") || text == "G4" || text.starts_with("G4 ") {
            return Ok(());
        }
        match text {
            "M02" | "M2" | "M00" | "M0" | "M01" | "M1" => {
                self.finished = true;
                return Ok(());
            }
            _ => {}
        }

        let caps = word_regex()
            .captures(text)
            .ok_or_else(|| self.unknown(text))?;
        let number = |i: usize| -> Option<u32> { caps.get(i).and_then(|m| m.as_str().parse().ok()) };
        let fields = WordFields {
            g: number(1),
            x: caps.get(2).map(|m| m.as_str()),
            y: caps.get(3).map(|m| m.as_str()),
            i: caps.get(4).map(|m| m.as_str()),
            j: caps.get(5).map(|m| m.as_str()),
            d: number(6),
        };
        if caps.get(1).is_some() && fields.g.is_none() || caps.get(6).is_some() && fields.d.is_none()
        {
            return Err(self.unknown(text));
        }

        if let Some(g) = fields.g {
            self.g_code(g, text)?;
        }

        let has_coordinates =
            fields.x.is_some() || fields.y.is_some() || fields.i.is_some() || fields.j.is_some();
        let operation = match fields.d {
            Some(1) => Some(Operation::Interpolate),
            Some(2) => Some(Operation::Move),
            Some(3) => Some(Operation::Flash),
            Some(code) if code >= 10 => {
                if !self.apertures.contains_key(&code) {
                    return Err(ParseError::UndefinedAperture {
                        line: self.line,
                        code,
                    });
                }
                self.current_aperture = Some(code);
                None
            }
            Some(_) => return Err(self.unknown(text)),
            None if has_coordinates => Some(self.last_operation.unwrap_or(Operation::Move)),
            None => None,
        };

        if let Some(operation) = operation {
            self.operation(operation, &fields)?;
            self.last_operation = Some(operation);
        }
        Ok(())
    }

    fn g_code(&mut self, code: u32, text: &str) -> Result<(), ParseError> {
        match code {
            1 => self.interpolation = Interpolation::Linear,
            2 => self.interpolation = Interpolation::Clockwise,
            3 => self.interpolation = Interpolation::CounterClockwise,
            36 => {
                self.in_region = true;
                self.contour.clear();
                self.region_loops.clear();
            }
            37 => self.end_region()?,
            54 | 55 => {}
            70 => self.units = Units::Inches,
            71 => self.units = Units::Millimeters,
            74 => self.quadrant = QuadrantMode::Single,
            75 => self.quadrant = QuadrantMode::Multi,
            90 => self.notation = Notation::Absolute,
            91 => self.notation = Notation::Incremental,
            _ => return Err(self.unknown(text)),
        }
        Ok(())
    }

    fn decode(&self, text: &str, axis: fn(&CoordinateFormat) -> AxisFormat) -> Result<f64, ParseError> {
        let format = self
            .format
            .ok_or(ParseError::MissingFormat { line: self.line })?;
        let invalid = || ParseError::InvalidNumber {
            line: self.line,
            value: text.to_string(),
        };

        let value = if text.contains('.') {
            text.parse::<f64>().map_err(|_| invalid())?
        } else {
            let (negative, digits) = match text.as_bytes().first() {
                Some(b'-') => (true, &text[1..]),
                Some(b'+') => (false, &text[1..]),
                _ => (false, text),
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let axis = axis(&format);
            let total = axis.integer + axis.decimal;
            let padded = match format.omission {
                ZeroOmission::Leading => digits.to_string(),
                ZeroOmission::Trailing => format!("{:0<width$}", digits, width = total),
            };
            let raw = padded.parse::<f64>().map_err(|_| invalid())?;
            let magnitude = raw / 10f64.powi(axis.decimal as i32);
            if negative {
                -magnitude
            } else {
                magnitude
            }
        };
        Ok(self.units.to_mm(value))
    }

    fn target(&self, fields: &WordFields) -> Result<Point, ParseError> {
        let x = fields.x.map(|t| self.decode(t, |f| f.x)).transpose()?;
        let y = fields.y.map(|t| self.decode(t, |f| f.y)).transpose()?;
        Ok(match self.notation {
            Notation::Absolute => Point::new(
                x.unwrap_or(self.position.x),
                y.unwrap_or(self.position.y),
            ),
            Notation::Incremental => Point::new(
                self.position.x + x.unwrap_or(0.0),
                self.position.y + y.unwrap_or(0.0),
            ),
        })
    }

    fn operation(&mut self, operation: Operation, fields: &WordFields) -> Result<(), ParseError> {
        let target = self.target(fields)?;
        match operation {
            Operation::Interpolate => self.interpolate(target, fields)?,
            Operation::Move => {
                if self.in_region {
                    self.close_contour();
                }
            }
            Operation::Flash => self.flash(target)?,
        }
        self.position = target;
        Ok(())
    }

    fn interpolate(&mut self, target: Point, fields: &WordFields) -> Result<(), ParseError> {
        let start = self.position;
        // a single-quadrant arc never sweeps a full circle
        let closed_quadrant_arc = !matches!(self.interpolation, Interpolation::Linear)
            && matches!(self.quadrant, QuadrantMode::Single)
            && start.approx_eq(target);
        let element = match self.interpolation {
            _ if closed_quadrant_arc => BoundaryElement::Segment(Segment::new(start, target)),
            Interpolation::Linear => BoundaryElement::Segment(Segment::new(start, target)),
            Interpolation::Clockwise => {
                BoundaryElement::Arc(self.arc(start, target, ArcDirection::Clockwise, fields)?)
            }
            Interpolation::CounterClockwise => BoundaryElement::Arc(self.arc(
                start,
                target,
                ArcDirection::CounterClockwise,
                fields,
            )?),
        };
        let zero_length =
            matches!(element, BoundaryElement::Segment(s) if s.length() <= EPSILON);

        if self.in_region {
            if !zero_length {
                self.contour.push(element);
            }
            return Ok(());
        }
        if self.kind == LayerKind::Outline {
            if !zero_length {
                self.outline_elements.push(element);
            }
            return Ok(());
        }

        let aperture = self.aperture()?;
        let polygons = match element {
            BoundaryElement::Segment(s) => {
                let Some(shape) = aperture.convex_outline() else {
                    return Err(self.invalid("macro apertures cannot be used for drawing"));
                };
                if aperture.circle_diameter().is_some_and(|d| d <= EPSILON) {
                    return Ok(());
                }
                let hull = shapes::stroke(&shape, s.start, s.end);
                vec![Polygon::simple(hull).map_err(|e| self.geometry(e))?]
            }
            BoundaryElement::Arc(a) => {
                let diameter = aperture.circle_diameter().ok_or_else(|| {
                    self.invalid("arcs can only be drawn with a circular aperture")
                })?;
                if diameter <= EPSILON {
                    return Ok(());
                }
                shapes::arc_stroke(&a, diameter).map_err(|e| self.geometry(e))?
            }
        };
        self.add(polygons)
    }

    fn arc(
        &self,
        start: Point,
        end: Point,
        direction: ArcDirection,
        fields: &WordFields,
    ) -> Result<Arc, ParseError> {
        let ambiguous = |reason: &str| ParseError::AmbiguousArc {
            line: self.line,
            reason: reason.to_string(),
        };
        if fields.i.is_none() && fields.j.is_none() {
            return Err(ambiguous("arc without center offset"));
        }
        let i = fields.i.map(|t| self.decode(t, |f| f.x)).transpose()?.unwrap_or(0.0);
        let j = fields.j.map(|t| self.decode(t, |f| f.y)).transpose()?.unwrap_or(0.0);

        let radii_match = |center: Point| {
            let r0 = start.distance(center);
            let r1 = end.distance(center);
            (r0 - r1).abs() <= 1e-3 + 1e-3 * r0.max(r1)
        };

        match self.quadrant {
            QuadrantMode::Multi => {
                let center = start + Point::new(i, j);
                if !radii_match(center) {
                    return Err(ambiguous("start and end radii differ"));
                }
                Ok(Arc::new(start, end, center, direction))
            }
            QuadrantMode::Single => {
                let (i, j) = (i.abs(), j.abs());
                let mut candidates: Vec<Point> = Vec::new();
                for (si, sj) in [(1.0, 1.0), (-1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)] {
                    let center = start + Point::new(si * i, sj * j);
                    if candidates.iter().any(|c| c.approx_eq(center)) {
                        continue;
                    }
                    let arc = Arc::new(start, end, center, direction);
                    if radii_match(center) && arc.sweep().abs() <= FRAC_PI_2 + 1e-6 {
                        candidates.push(center);
                    }
                }
                match candidates.as_slice() {
                    [center] => Ok(Arc::new(start, end, *center, direction)),
                    [] => Err(ambiguous("no single-quadrant center matches the arc")),
                    _ => Err(ambiguous("several single-quadrant centers match the arc")),
                }
            }
        }
    }

    fn flash(&mut self, at: Point) -> Result<(), ParseError> {
        if self.in_region {
            return Err(self.invalid("flash inside a region"));
        }
        if self.kind == LayerKind::Outline {
            warn!(line = self.line, "Ignoring flash on outline layer");
            return Ok(());
        }
        let polygons = self.aperture()?.flash(at).map_err(|e| self.geometry(e))?;
        self.add(polygons)
    }

    fn aperture(&self) -> Result<&Aperture, ParseError> {
        let code = self
            .current_aperture
            .ok_or_else(|| self.invalid("no aperture selected"))?;
        self.apertures
            .get(&code)
            .ok_or(ParseError::UndefinedAperture {
                line: self.line,
                code,
            })
    }

    fn close_contour(&mut self) {
        if self.contour.is_empty() {
            return;
        }
        let mut points = flatten_elements(&self.contour);
        if signed_area(&points) < 0.0 {
            points.reverse();
        }
        self.region_loops.push(points);
        self.contour.clear();
    }

    fn end_region(&mut self) -> Result<(), ParseError> {
        if !self.in_region {
            return Err(self.invalid("G37 without G36"));
        }
        self.close_contour();
        self.in_region = false;
        let loops = std::mem::take(&mut self.region_loops);
        let polygons =
            polygons_from_loops(&loops, FillRule::NonZero).map_err(|e| self.geometry(e))?;
        self.add(polygons)
    }

    // ---- image accumulation ----

    fn add(&mut self, polygons: Vec<Polygon>) -> Result<(), ParseError> {
        if polygons.is_empty() {
            return Ok(());
        }
        if self.polarity != self.batch_polarity {
            self.flush()?;
            self.batch_polarity = self.polarity;
        }
        self.batch.extend(polygons);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ParseError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.batch);
        self.image = match self.batch_polarity {
            Polarity::Dark => union(&self.image, &batch, FillRule::NonZero),
            Polarity::Clear => subtract(&self.image, &batch, FillRule::NonZero),
        }
        .map_err(|e| self.geometry(e))?;
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Polygon>, ParseError> {
        if self.in_region {
            return Err(self.invalid("region not closed with G37"));
        }
        self.close_step_repeat()?;
        self.flush()?;

        match self.kind {
            LayerKind::Copper => Ok(self.image),
            LayerKind::Outline => {
                let contours = outline::close_contours(&self.outline_elements)?;
                if self.image.is_empty() {
                    return Ok(contours);
                }
                union(&contours, &self.image, FillRule::NonZero).map_err(|e| self.geometry(e))
            }
        }
    }
}

fn identity_value(text: &str, identity: f64) -> bool {
    text.parse::<f64>()
        .is_ok_and(|v| (v - identity).abs() <= EPSILON)
}

fn translate_element(element: &BoundaryElement, shift: Point) -> BoundaryElement {
    match element {
        BoundaryElement::Segment(s) => {
            BoundaryElement::Segment(Segment::new(s.start + shift, s.end + shift))
        }
        BoundaryElement::Arc(a) => BoundaryElement::Arc(Arc::new(
            a.start + shift,
            a.end + shift,
            a.center + shift,
            a.direction,
        )),
    }
}
