use pcbmill::{
    BoardInputs, Dialect, Error, InputKind, MillingConfig, MirrorAxis, OriginMode, ParseError,
    PathKind, Pipeline,
};

const COPPER: &str = "%FSLAX26Y26*%\n%MOMM*%\n%ADD10R,10X5*%\nD10*\nX15000000Y12500000D03*\nM02*\n";

const OUTLINE: &str = "%FSLAX26Y26*%\n%MOMM*%\n%ADD10C,0.1*%\nD10*\nX0Y0D02*\nG01*\nX50000000Y0D01*\nX50000000Y30000000D01*\nX0Y30000000D01*\nX0Y0D01*\nM02*\n";

const DRILL: &str = "M48\nMETRIC\nT1C0.8\nT2C1.0\n%\nT1\nX40.0Y5.0\nX10.0Y5.0\nT2\nX25.0Y25.0\nM30\n";

fn full_board() -> BoardInputs<'static> {
    BoardInputs::new()
        .with_copper(COPPER)
        .with_outline(OUTLINE)
        .with_drill(DRILL)
}

#[test]
fn test_full_board_produces_every_program() {
    let pipeline = Pipeline::new(MillingConfig::default()).unwrap();
    let programs = pipeline.run(&full_board()).unwrap();

    let kinds: Vec<PathKind> = programs.toolpaths.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![PathKind::Isolation, PathKind::Drill, PathKind::Outline]);
    assert!(programs.toolpaths.iter().all(|t| t.is_well_formed()));

    let isolation = programs.isolation.as_deref().unwrap();
    assert!(isolation.contains("G1 Z-0.0500"));
    let outline = programs.outline.as_deref().unwrap();
    assert!(outline.contains("G1 Z-1.6000"));
    let drill = programs.drill.as_deref().unwrap();
    assert!(drill.contains("G1 Z-1.7000"));
    assert!(drill.contains("G0 X10.0000 Y5.0000"));

    let combined = &programs.combined;
    assert!(combined.starts_with("; pcbmill combined program"));
    assert!(combined.trim_end().ends_with("M2"));
    assert!(combined.matches("\nM0\n").count() >= 2);
}

#[test]
fn test_missing_inputs_are_skipped() {
    let pipeline = Pipeline::new(MillingConfig::default()).unwrap();
    let programs = pipeline
        .run(&BoardInputs::new().with_drill(DRILL))
        .unwrap();
    assert!(programs.isolation.is_none());
    assert!(programs.outline.is_none());
    assert!(programs.drill.is_some());
    assert_eq!(programs.board.holes.len(), 3);
}

#[test]
fn test_invalid_config_rejected_before_parsing() {
    let config = MillingConfig {
        tool_diameter: 0.0,
        ..MillingConfig::default()
    };
    let err = Pipeline::new(config).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_parse_error_names_input_and_line() {
    let pipeline = Pipeline::new(MillingConfig::default()).unwrap();
    let bad = "%FSLAX26Y26*%\n%MOMM*%\nG99*\nM02*\n";
    let err = pipeline
        .run(&BoardInputs::new().with_copper(bad).with_drill(DRILL))
        .unwrap_err();
    match err {
        Error::Input { input, source } => {
            assert_eq!(input, InputKind::Copper);
            assert!(matches!(source, ParseError::UnknownCommand { line: 3, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_undefined_drill_tool_reported() {
    let pipeline = Pipeline::new(MillingConfig::default()).unwrap();
    let bad = "M48\nMETRIC\nT1C0.8\n%\nT9\nX0Y0\nM30\n";
    let err = pipeline
        .run(&BoardInputs::new().with_drill(bad))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Input {
            input: InputKind::Drill,
            source: ParseError::UndefinedTool { line: 5, tool: 9 },
        }
    ));
}

#[test]
fn test_output_is_byte_identical_across_runs() {
    let pipeline = Pipeline::new(MillingConfig::default()).unwrap();
    let first = pipeline.run(&full_board()).unwrap();
    let second = pipeline.run(&full_board()).unwrap();
    assert_eq!(first.combined, second.combined);
    assert_eq!(first, second);
}

#[test]
fn test_usbcnc_dialect() {
    let config = MillingConfig {
        dialect: Dialect::UsbCnc,
        ..MillingConfig::default()
    };
    let programs = Pipeline::new(config).unwrap().run(&full_board()).unwrap();
    let combined = &programs.combined;
    assert!(combined.starts_with("(pcbmill combined program)"));
    assert!(combined.contains("G90.1"));
    assert!(combined.contains(" M6\n"));
    assert!(!combined.contains("\nM0\n"));
    assert!(combined.trim_end().ends_with("M30"));
}

#[test]
fn test_mirror_around_fixed_line() {
    let config = MillingConfig {
        mirror_axis: MirrorAxis::Y,
        mirror_reference: Some(50.0),
        ..MillingConfig::default()
    };
    let programs = Pipeline::new(config)
        .unwrap()
        .run(&BoardInputs::new().with_drill(DRILL))
        .unwrap();
    let xs: Vec<f64> = programs.board.holes.iter().map(|h| h.position.x).collect();
    assert!((xs[0] - 60.0).abs() < 1e-9);
    assert!((xs[1] - 90.0).abs() < 1e-9);
    assert!(programs.combined.contains("G0 X90.0000 Y5.0000"));
}

#[test]
fn test_lower_left_origin() {
    let mut config = MillingConfig::default();
    config.placement.origin = OriginMode::LowerLeft;
    config.placement.offset_x = 5.0;
    let programs = Pipeline::new(config)
        .unwrap()
        .run(&BoardInputs::new().with_copper(COPPER))
        .unwrap();
    // pad spans (10, 10)..(20, 15) in the file
    let bounds = programs.board.bounds();
    assert!((bounds.min_x - 5.0).abs() < 1e-9);
    assert!(bounds.min_y.abs() < 1e-9);
    assert!((bounds.max_x - 15.0).abs() < 1e-9);
}

#[test]
fn test_results_serialize_to_json() {
    let pipeline = Pipeline::new(MillingConfig::default()).unwrap();
    let programs = pipeline
        .run(&BoardInputs::new().with_drill(DRILL))
        .unwrap();
    let json: serde_json::Value = serde_json::to_value(&programs).unwrap();
    assert_eq!(json["board"]["holes"].as_array().map(Vec::len), Some(3));
    assert!(json["isolation"].is_null());
    assert_eq!(json["drill"].as_str(), programs.drill.as_deref());
}
