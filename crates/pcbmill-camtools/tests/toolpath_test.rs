use pcbmill_camtools::geometry::Containment;
use pcbmill_camtools::toolpath::isolation::isolation_rings;
use pcbmill_camtools::{
    BoardModel, DrillHole, DrillParameters, GcodeEmitter, GerberParser, IsolationParameters,
    LayerKind, Point, ToolpathMove, ToolpathPlanner,
};
use pcbmill_core::Tool;

const COPPER: &str = "%FSLAX26Y26*%\n%MOMM*%\n%ADD10R,2X2*%\n%ADD11C,0.4*%\nD10*\nX0Y0D03*\nX10000000Y0D03*\nD11*\nX0Y0D02*\nG01*\nX0Y8000000D01*\nX6000000Y8000000D01*\nM02*\n";

fn hole(x: f64, y: f64, diameter: f64, tool: u32) -> DrillHole {
    DrillHole {
        position: Point::new(x, y),
        diameter,
        plated: true,
        tool,
    }
}

fn drill_bit(number: u32, diameter: f64) -> Tool {
    Tool::drill(number, diameter, 100.0)
}

#[test]
fn test_isolation_keeps_clearance_from_copper() {
    let layer = GerberParser::new(LayerKind::Copper)
        .parse("top", COPPER)
        .unwrap();
    let radius = 0.1;
    let params = IsolationParameters {
        pass_count: 2,
        ..IsolationParameters::default()
    };
    let rings = isolation_rings(&layer, radius, &params).unwrap();
    assert!(rings.len() >= 2);

    for ring in &rings {
        let closed = ring.closed_points();
        let midpoints = closed.windows(2).map(|w| (w[0] + w[1]) * 0.5);
        for p in ring.points.iter().copied().chain(midpoints) {
            for poly in &layer.polygons {
                assert_eq!(poly.contains(p), Containment::Outside);
                assert!(poly.boundary_distance(p) >= radius - 1e-4);
            }
        }
    }
}

#[test]
fn test_drill_groups_are_contiguous_and_ascending() {
    let holes = [
        hole(0.0, 0.0, 1.0, 2),
        hole(5.0, 0.0, 0.8, 1),
        hole(10.0, 0.0, 1.0, 2),
        hole(15.0, 0.0, 0.8, 1),
        hole(20.0, 0.0, 3.0, 3),
    ];
    let path = ToolpathPlanner::new()
        .plan_drilling(&holes, &DrillParameters::default(), drill_bit, None)
        .unwrap();

    let diameters: Vec<f64> = path.sections.iter().map(|s| s.tool.diameter).collect();
    assert_eq!(diameters, vec![0.8, 1.0, 3.0]);
    assert_eq!(path.stats().tool_changes, 2);
    assert_eq!(path.stats().plunge_count, holes.len());
    assert!(path.is_well_formed());
}

#[test]
fn test_large_holes_are_milled() {
    let holes = [hole(0.0, 0.0, 0.8, 1), hole(20.0, 0.0, 3.0, 2)];
    let params = DrillParameters {
        mill_holes_above: Some(2.0),
        ..DrillParameters::default()
    };
    let mill = Tool::mill(1, 1.0, 200.0, 50.0);
    let path = ToolpathPlanner::new()
        .plan_drilling(&holes, &params, drill_bit, Some(&mill))
        .unwrap();

    assert_eq!(path.sections.len(), 2);
    assert_eq!(path.sections[1].tool, mill);
    assert!(path.sections[1]
        .moves
        .iter()
        .any(|m| matches!(m, ToolpathMove::Arc { .. })));
}

#[test]
fn test_planning_is_deterministic() {
    let layer = GerberParser::new(LayerKind::Copper)
        .parse("top", COPPER)
        .unwrap();
    let board = BoardModel::new()
        .with_layer(layer)
        .with_holes(vec![hole(3.0, 3.0, 0.8, 1), hole(1.0, 1.0, 0.8, 1)]);
    let tool = Tool::mill(1, 0.2, 300.0, 60.0);
    let planner = ToolpathPlanner::new();

    let first = planner
        .plan_isolation(&board, &tool, &IsolationParameters::default())
        .unwrap();
    let second = planner
        .plan_isolation(&board, &tool, &IsolationParameters::default())
        .unwrap();
    assert_eq!(first, second);

    let emitter = GcodeEmitter::default();
    assert_eq!(emitter.emit(&first), emitter.emit(&second));

    let drills = planner
        .plan_drilling(&board.holes, &DrillParameters::default(), drill_bit, None)
        .unwrap();
    assert_eq!(
        drills.sections[0].moves[0],
        ToolpathMove::Rapid {
            to: Point::new(1.0, 1.0)
        }
    );
}
