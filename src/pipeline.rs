//! End-to-end conversion: parse, transform, plan, emit
//!
//! Every stage finishes before the next starts and hands over an owned,
//! immutable result. The run stops at the first error.

use serde::Serialize;
use tracing::{info, info_span};

use pcbmill_camtools::toolpath::{CutSide, TabPlacement};
use pcbmill_camtools::{
    BoardModel, DrillParameters, ExcellonParser, GcodeEmitter, GcodeOptions, GerberParser,
    IsolationParameters, JoinStyle, LayerKind, Mirror, OutlineParameters, PathKind, Point, Toolpath,
    ToolpathPlanner, Transform,
};
use pcbmill_core::{Error, InputKind, Result};
use pcbmill_settings::{JoinKind, MillingConfig, OriginMode, OutlineSide};

/// Raw input buffers; any of them may be absent
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardInputs<'a> {
    pub copper: Option<&'a str>,
    pub outline: Option<&'a str>,
    pub drill: Option<&'a str>,
}

impl<'a> BoardInputs<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_copper(mut self, text: &'a str) -> Self {
        self.copper = Some(text);
        self
    }

    pub fn with_outline(mut self, text: &'a str) -> Self {
        self.outline = Some(text);
        self
    }

    pub fn with_drill(mut self, text: &'a str) -> Self {
        self.drill = Some(text);
        self
    }
}

/// Programs produced by one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedPrograms {
    /// Board after mirroring and placement
    pub board: BoardModel,
    pub isolation: Option<String>,
    pub outline: Option<String>,
    pub drill: Option<String>,
    /// Every available toolpath in one program: isolation, drill, outline
    pub combined: String,
    /// The planned toolpaths in the same order
    pub toolpaths: Vec<Toolpath>,
}

/// Validated configuration plus the stages it drives
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: MillingConfig,
    planner: ToolpathPlanner,
}

impl Pipeline {
    /// Validate `config`; no parsing happens with an invalid configuration
    pub fn new(config: MillingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            planner: ToolpathPlanner::new(),
        })
    }

    pub fn config(&self) -> &MillingConfig {
        &self.config
    }

    pub fn run(&self, inputs: &BoardInputs) -> Result<GeneratedPrograms> {
        let board = self.parse(inputs)?;
        let board = {
            let _span = info_span!("transform").entered();
            self.transform().apply(&board)
        };

        let _span = info_span!("plan").entered();
        let isolation = match inputs.copper {
            Some(_) => Some(self.planner.plan_isolation(
                &board,
                &self.config.isolation_tool(),
                &self.isolation_parameters(),
            )?),
            None => None,
        };
        let drill = match inputs.drill {
            Some(_) => {
                let mill = self.config.isolation_tool();
                let mill = self.config.drilling.mill_holes_above.map(|_| &mill);
                Some(self.planner.plan_drilling(
                    &board.holes,
                    &self.drill_parameters(),
                    |number, diameter| self.config.drill_tool(number, diameter),
                    mill,
                )?)
            }
            None => None,
        };
        let outline = match inputs.outline {
            Some(_) => Some(self.planner.plan_outline(
                &board,
                &self.config.outline_tool(),
                &self.outline_parameters(),
            )?),
            None => None,
        };
        drop(_span);

        let _span = info_span!("emit").entered();
        let emitter = GcodeEmitter::new(GcodeOptions {
            dialect: self.config.dialect,
            safe_z: self.config.machine.safe_z,
            tool_change_z: self.config.machine.tool_change_z,
            coolant: self.config.machine.coolant,
        });
        let toolpaths: Vec<Toolpath> = [isolation, drill, outline].into_iter().flatten().collect();
        let program_for = |kind| {
            toolpaths
                .iter()
                .find(|t| t.kind == kind)
                .map(|t| emitter.emit(t))
        };
        let isolation = program_for(PathKind::Isolation);
        let outline = program_for(PathKind::Outline);
        let drill = program_for(PathKind::Drill);
        let refs: Vec<&Toolpath> = toolpaths.iter().collect();
        let combined = emitter.emit_combined(&refs);
        info!(
            toolpaths = toolpaths.len(),
            combined_bytes = combined.len(),
            "Generated G-code"
        );

        Ok(GeneratedPrograms {
            board,
            isolation,
            outline,
            drill,
            combined,
            toolpaths,
        })
    }

    fn parse(&self, inputs: &BoardInputs) -> Result<BoardModel> {
        let _span = info_span!("parse").entered();
        let units = self.config.units_hint;
        let mut board = BoardModel::new();

        if let Some(text) = inputs.copper {
            let layer = GerberParser::new(LayerKind::Copper)
                .with_units_hint(units)
                .parse("copper", text)
                .map_err(|e| Error::input(InputKind::Copper, e))?;
            board = board.with_layer(layer);
        }
        if let Some(text) = inputs.outline {
            let layer = GerberParser::new(LayerKind::Outline)
                .with_units_hint(units)
                .parse("outline", text)
                .map_err(|e| Error::input(InputKind::Outline, e))?;
            board = board.with_layer(layer);
        }
        if let Some(text) = inputs.drill {
            let holes = ExcellonParser::new()
                .with_units_hint(units)
                .parse(text)
                .map_err(|e| Error::input(InputKind::Drill, e))?;
            board = board.with_holes(holes);
        }
        info!(
            layers = board.layers.len(),
            holes = board.holes.len(),
            "Board model built"
        );
        Ok(board)
    }

    fn transform(&self) -> Transform {
        let placement = &self.config.placement;
        Transform::new(Mirror::new(
            self.config.mirror_axis,
            self.config.mirror_reference,
        ))
        .with_origin_at_lower_left(placement.origin == OriginMode::LowerLeft)
        .with_translation(Point::new(placement.offset_x, placement.offset_y))
    }

    fn join_style(&self) -> JoinStyle {
        match self.config.join_style {
            JoinKind::Round => JoinStyle::Round,
            JoinKind::Miter => JoinStyle::Miter {
                limit: self.config.miter_limit,
            },
        }
    }

    fn isolation_parameters(&self) -> IsolationParameters {
        IsolationParameters {
            pass_count: self.config.pass_count,
            stepover: self.config.stepover,
            cut_depth: self.config.cut_depth,
            safe_z: self.config.machine.safe_z,
            join: self.join_style(),
        }
    }

    fn outline_parameters(&self) -> OutlineParameters {
        let outline = &self.config.outline;
        let tabs = &self.config.tabs;
        OutlineParameters {
            depth: outline.depth,
            depth_per_pass: outline.depth_per_pass,
            side: match outline.side {
                OutlineSide::Inside => CutSide::Inside,
                OutlineSide::Outside => CutSide::Outside,
            },
            safe_z: self.config.machine.safe_z,
            join: JoinStyle::Round,
            tabs: self.config.leave_tabs.then(|| TabPlacement {
                positions: tabs.positions.iter().map(|&p| Point::from(p)).collect(),
                width: tabs.width,
                height: tabs.height,
            }),
        }
    }

    fn drill_parameters(&self) -> DrillParameters {
        let drilling = &self.config.drilling;
        DrillParameters {
            depth: drilling.depth,
            peck_depth: drilling.peck_depth,
            safe_z: self.config.machine.safe_z,
            tool_table: self.config.drill_tool_table.clone(),
            mill_holes_above: drilling.mill_holes_above,
            ..DrillParameters::default()
        }
    }
}
