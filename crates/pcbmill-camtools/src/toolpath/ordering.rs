//! Visit ordering for loops and drill hits

use std::cmp::Ordering;

use crate::geometry::{Point, EPSILON};

/// Chooses the order in which closed loops (or single points) are machined
pub trait PathOrdering {
    /// Order `loops` starting from `start`
    ///
    /// Returns `(loop index, entry vertex index)` pairs covering every
    /// non-empty loop exactly once. A loop is left at its entry vertex.
    fn order_loops(&self, start: Point, loops: &[Vec<Point>]) -> Vec<(usize, usize)>;

    /// Order single points starting from `start`
    fn order_points(&self, start: Point, points: &[Point]) -> Vec<usize> {
        let loops: Vec<Vec<Point>> = points.iter().map(|&p| vec![p]).collect();
        self.order_loops(start, &loops)
            .into_iter()
            .map(|(index, _)| index)
            .collect()
    }
}

/// Greedy nearest-neighbour tour
///
/// Equidistant candidates (within `EPSILON`) resolve to the lexicographically
/// smaller point, then to the lower index.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighbor;

impl NearestNeighbor {
    fn closer(a: (f64, Point), b: (f64, Point)) -> Ordering {
        if (a.0 - b.0).abs() <= EPSILON {
            a.1.lex_cmp(b.1)
        } else {
            a.0.total_cmp(&b.0)
        }
    }
}

impl PathOrdering for NearestNeighbor {
    fn order_loops(&self, start: Point, loops: &[Vec<Point>]) -> Vec<(usize, usize)> {
        let mut remaining: Vec<usize> = (0..loops.len()).filter(|&i| !loops[i].is_empty()).collect();
        let mut order = Vec::with_capacity(remaining.len());
        let mut current = start;

        while !remaining.is_empty() {
            let mut best: Option<(usize, usize, f64, Point)> = None;
            for (slot, &index) in remaining.iter().enumerate() {
                for (vertex, &p) in loops[index].iter().enumerate() {
                    let candidate = (current.distance(p), p);
                    let better = match best {
                        None => true,
                        Some((_, _, d, q)) => Self::closer(candidate, (d, q)) == Ordering::Less,
                    };
                    if better {
                        best = Some((slot, vertex, candidate.0, p));
                    }
                }
            }
            let Some((slot, vertex, _, p)) = best else {
                break;
            };
            order.push((remaining.remove(slot), vertex));
            current = p;
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_visit_nearest_first() {
        let points = [
            Point::new(10.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(5.0, 0.0),
        ];
        let order = NearestNeighbor.order_points(Point::origin(), &points);
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_tie_breaks_lexicographically() {
        let points = [Point::new(0.0, 1.0), Point::new(0.0, -1.0), Point::new(-1.0, 0.0)];
        let order = NearestNeighbor.order_points(Point::origin(), &points);
        assert_eq!(order[0], 2);
        assert_eq!(order[1], 1);
    }

    #[test]
    fn test_loop_entry_is_nearest_vertex() {
        let square = vec![
            Point::new(10.0, 10.0),
            Point::new(12.0, 10.0),
            Point::new(12.0, 12.0),
            Point::new(10.0, 12.0),
        ];
        let far = vec![Point::new(50.0, 50.0), Point::new(51.0, 50.0), Point::new(51.0, 51.0)];
        let order = NearestNeighbor.order_loops(Point::new(13.0, 13.0), &[far, square]);
        assert_eq!(order, vec![(1, 2), (0, 0)]);
    }
}
