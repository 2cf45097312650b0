//! Board outline assembly
//!
//! Outline layers draw the board edge as centerlines. The drawn pieces are
//! chained end to end into closed contours; contours nested inside others
//! become holes (cutouts), alternating by depth.

use pcbmill_core::ParseError;

use crate::geometry::{flatten_elements, BoundaryElement, Point, Polygon, Ring, Winding};

/// Endpoint distance under which two outline pieces are considered joined
pub const CHAIN_TOLERANCE: f64 = 1e-3;

/// Chain loose elements into closed vertex loops
pub fn chain_contours(elements: &[BoundaryElement]) -> Result<Vec<Vec<Point>>, ParseError> {
    let mut remaining: Vec<BoundaryElement> = elements.to_vec();
    let mut loops = Vec::new();

    while !remaining.is_empty() {
        let first = remaining.remove(0);
        let start = first.start();
        let mut chain = vec![first];
        let mut end = first.end();

        loop {
            // a lone full-circle arc is already closed
            if (chain.len() > 1 || is_closed_arc(&chain[0])) && end_meets(end, start) {
                break;
            }
            let next = remaining
                .iter()
                .enumerate()
                .filter_map(|(i, e)| {
                    let forward = e.start().distance(end);
                    let backward = e.end().distance(end);
                    let (dist, reverse) = if forward <= backward {
                        (forward, false)
                    } else {
                        (backward, true)
                    };
                    (dist <= CHAIN_TOLERANCE).then_some((i, dist, reverse))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match next {
                Some((index, _, reverse)) => {
                    let element = remaining.remove(index);
                    let element = if reverse { element.reversed() } else { element };
                    end = element.end();
                    chain.push(element);
                }
                None => return Err(ParseError::OpenOutline { x: end.x, y: end.y }),
            }
        }

        loops.push(flatten_elements(&chain));
    }

    Ok(loops)
}

fn end_meets(end: Point, start: Point) -> bool {
    end.distance(start) <= CHAIN_TOLERANCE
}

fn is_closed_arc(element: &BoundaryElement) -> bool {
    matches!(element, BoundaryElement::Arc(a) if a.is_full_circle())
}

/// Nest closed loops into polygons with holes by containment depth
///
/// Loops at even depth are board material; odd depth loops cut holes in
/// their innermost enclosing even loop. Degenerate loops are dropped.
pub fn nest_contours(loops: &[Vec<Point>]) -> Vec<Polygon> {
    let mut rings: Vec<Ring> = loops
        .iter()
        .filter_map(|l| Ring::cleaned(l).ok())
        .map(|r| r.oriented(Winding::CounterClockwise))
        .collect();
    rings.sort_by(|a, b| b.signed_area().total_cmp(&a.signed_area()));

    // parent[i] = innermost larger ring containing ring i
    let mut parent: Vec<Option<usize>> = vec![None; rings.len()];
    let mut depth: Vec<usize> = vec![0; rings.len()];
    for i in 0..rings.len() {
        let probe = rings[i].points[0];
        for j in (0..i).rev() {
            if rings[j].contains(probe).is_covered() {
                parent[i] = Some(j);
                depth[i] = depth[j] + 1;
                break;
            }
        }
    }

    let mut polygons: Vec<(usize, Polygon)> = Vec::new();
    for (i, ring) in rings.iter().enumerate() {
        if depth[i] % 2 == 0 {
            polygons.push((
                i,
                Polygon {
                    outer: ring.clone(),
                    holes: Vec::new(),
                },
            ));
        }
    }
    for (i, ring) in rings.iter().enumerate() {
        if depth[i] % 2 == 1 {
            if let Some(p) = parent[i] {
                if let Some((_, polygon)) = polygons.iter_mut().find(|(idx, _)| *idx == p) {
                    polygon.holes.push(ring.clone().oriented(Winding::Clockwise));
                }
            }
        }
    }
    polygons.into_iter().map(|(_, p)| p).collect()
}

/// Chain and nest in one step
pub fn close_contours(elements: &[BoundaryElement]) -> Result<Vec<Polygon>, ParseError> {
    let loops = chain_contours(elements)?;
    Ok(nest_contours(&loops))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Arc, ArcDirection, Segment};

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundaryElement {
        BoundaryElement::Segment(Segment::new(Point::new(x0, y0), Point::new(x1, y1)))
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<BoundaryElement> {
        vec![
            seg(x0, y0, x1, y0),
            seg(x1, y0, x1, y1),
            seg(x1, y1, x0, y1),
            seg(x0, y1, x0, y0),
        ]
    }

    #[test]
    fn test_chains_out_of_order_and_reversed_pieces() {
        let elements = vec![
            seg(0.0, 0.0, 50.0, 0.0),
            seg(0.0, 0.0, 0.0, 30.0),
            seg(50.0, 30.0, 50.0, 0.0),
            seg(0.0, 30.0, 50.0, 30.0),
        ];
        let polygons = close_contours(&elements).unwrap();
        assert_eq!(polygons.len(), 1);
        assert!((polygons[0].area() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_gap_is_bridged() {
        let mut elements = square(0.0, 0.0, 10.0, 10.0);
        elements[3] = seg(0.0, 10.0, 0.0, 0.0005);
        let polygons = close_contours(&elements).unwrap();
        assert_eq!(polygons.len(), 1);
    }

    #[test]
    fn test_open_outline_reports_dangling_end() {
        let elements = vec![seg(0.0, 0.0, 10.0, 0.0), seg(10.0, 0.0, 10.0, 10.0)];
        let err = close_contours(&elements).unwrap_err();
        assert_eq!(err, ParseError::OpenOutline { x: 10.0, y: 10.0 });
    }

    #[test]
    fn test_inner_contour_becomes_hole() {
        let mut elements = square(0.0, 0.0, 40.0, 40.0);
        elements.extend(square(10.0, 10.0, 20.0, 20.0));
        let polygons = close_contours(&elements).unwrap();
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].holes.len(), 1);
        assert!((polygons[0].area() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_circle_outline() {
        let start = Point::new(10.0, 0.0);
        let arc = Arc::new(start, start, Point::origin(), ArcDirection::CounterClockwise);
        let polygons = close_contours(&[BoundaryElement::Arc(arc)]).unwrap();
        assert_eq!(polygons.len(), 1);
        assert!((polygons[0].area() - std::f64::consts::PI * 100.0).abs() < 0.5);
    }
}
