//! G-code synthesis.
//!
//! Turns an ordered sequence of artwork into machine moves. Shapes are cut in
//! the order they are stored, each polygon ring as its own path, exterior
//! first. Drill data is drilled tool by tool in tool-table order.

use crate::error::{require_positive, CamToolError, CamToolResult, ParameterError};
use pcbkit_core::{Artwork, DrillSet, GeometryError, GeometrySet, Point, Units};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::{debug, warn};

/// Tool number preferred for polygonal artwork.
pub const IMPLICIT_TOOL_NUMBER: u32 = 1;

/// Fewest decimals that keep coordinates within 1e-4 of their value.
pub const MIN_DECIMALS: usize = 4;

/// Largest supported number of decimals.
pub const MAX_DECIMALS: usize = 8;

/// Parameters for G-code output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolpathParameters {
    /// Cut depth; negative is below the stock surface
    pub cut_z: f64,
    /// Height for travel moves
    pub travel_z: f64,
    /// Feed rate for cutting moves (units/min)
    pub feed_rate: f64,
    /// Feed rate for plunges, defaults to `feed_rate`
    pub plunge_rate: Option<f64>,
    /// Tool diameter for polygonal artwork
    pub tool_diameter: f64,
    /// Emit a tool-change sequence before each new tool
    pub toolchange: bool,
    /// Height the tool change happens at
    pub toolchange_z: f64,
    /// Step down to `cut_z` in several passes
    pub multi_depth: bool,
    /// Maximum depth of one pass when `multi_depth` is set
    pub depth_per_pass: f64,
    /// Spindle speed (RPM), omitted from `M03` when unset
    pub spindle_speed: Option<f64>,
    /// Decimals for coordinates and feeds
    pub decimals: usize,
}

impl Default for ToolpathParameters {
    fn default() -> Self {
        Self {
            cut_z: -0.05,
            travel_z: 2.0,
            feed_rate: 120.0,
            plunge_rate: None,
            tool_diameter: 0.2,
            toolchange: false,
            toolchange_z: 15.0,
            multi_depth: false,
            depth_per_pass: 0.8,
            spindle_speed: None,
            decimals: 4,
        }
    }
}

impl ToolpathParameters {
    pub fn validate(&self) -> CamToolResult<()> {
        if !self.cut_z.is_finite() {
            return Err(ParameterError::InvalidValue {
                name: "cut_z".to_string(),
                reason: "must be a finite number".to_string(),
            }
            .into());
        }
        require_positive("travel_z", self.travel_z)?;
        require_positive("feed_rate", self.feed_rate)?;
        require_positive("tool_diameter", self.tool_diameter)?;
        if let Some(plunge) = self.plunge_rate {
            require_positive("plunge_rate", plunge)?;
        }
        if let Some(speed) = self.spindle_speed {
            require_positive("spindle_speed", speed)?;
        }
        if self.toolchange {
            require_positive("toolchange_z", self.toolchange_z)?;
        }
        if self.multi_depth {
            require_positive("depth_per_pass", self.depth_per_pass)?;
        }
        if self.travel_z <= self.cut_z {
            return Err(ParameterError::Incompatible(format!(
                "travel_z ({}) must be above cut_z ({})",
                self.travel_z, self.cut_z
            ))
            .into());
        }
        if !(MIN_DECIMALS..=MAX_DECIMALS).contains(&self.decimals) {
            return Err(ParameterError::OutOfRange {
                name: "decimals".to_string(),
                value: self.decimals as f64,
                min: MIN_DECIMALS as f64,
                max: MAX_DECIMALS as f64,
            }
            .into());
        }
        Ok(())
    }

    /// Z levels to cut at, ending exactly at `cut_z`.
    ///
    /// With multi-depth enabled, levels step down from the stock surface in
    /// equal increments no larger than `depth_per_pass`.
    pub fn depth_levels(&self) -> Vec<f64> {
        if !self.multi_depth || self.cut_z >= 0.0 || self.depth_per_pass <= 0.0 {
            return vec![self.cut_z];
        }
        let total = -self.cut_z;
        let passes = ((total / self.depth_per_pass) - 1e-9).ceil().max(1.0) as usize;
        (1..=passes)
            .map(|pass| {
                if pass == passes {
                    self.cut_z
                } else {
                    self.cut_z * pass as f64 / passes as f64
                }
            })
            .collect()
    }

    fn plunge_feed(&self) -> f64 {
        self.plunge_rate.unwrap_or(self.feed_rate)
    }
}

/// One line of machine output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MachineMove {
    Comment(String),
    Units(Units),
    /// `G90`
    Absolute,
    /// `G94`
    FeedPerMinute,
    SetFeed(f64),
    SpindleOn(Option<f64>),
    SpindleOff,
    RapidZ(f64),
    RapidXY(Point),
    Plunge { z: f64, feed: f64 },
    Feed { to: Point, feed: f64 },
    /// `T<n> M06`
    ToolSelect(u32),
    /// `M00`, wait for the operator
    Pause,
}

fn num(value: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, value);
    // "-0.0000" reads badly on most controllers
    if s.starts_with('-') && s[1..].chars().all(|c| c == '0' || c == '.') {
        s[1..].to_string()
    } else {
        s
    }
}

impl MachineMove {
    /// Text of this move with `decimals` digits after the point.
    pub fn render(&self, decimals: usize) -> String {
        match self {
            MachineMove::Comment(text) => format!("; {}", text),
            MachineMove::Units(units) => units.gcode_word().to_string(),
            MachineMove::Absolute => "G90".to_string(),
            MachineMove::FeedPerMinute => "G94".to_string(),
            MachineMove::SetFeed(feed) => format!("F{}", num(*feed, decimals)),
            MachineMove::SpindleOn(Some(speed)) => format!("M03 S{}", num(*speed, 0)),
            MachineMove::SpindleOn(None) => "M03".to_string(),
            MachineMove::SpindleOff => "M05".to_string(),
            MachineMove::RapidZ(z) => format!("G00 Z{}", num(*z, decimals)),
            MachineMove::RapidXY(p) => {
                format!("G00 X{} Y{}", num(p.x, decimals), num(p.y, decimals))
            }
            MachineMove::Plunge { z, feed } => {
                format!("G01 Z{} F{}", num(*z, decimals), num(*feed, decimals))
            }
            MachineMove::Feed { to, feed } => format!(
                "G01 X{} Y{} F{}",
                num(to.x, decimals),
                num(to.y, decimals),
                num(*feed, decimals)
            ),
            MachineMove::ToolSelect(n) => format!("T{} M06", n),
            MachineMove::Pause => "M00".to_string(),
        }
    }
}

/// Serialize moves, one per line.
pub fn to_gcode(moves: &[MachineMove], decimals: usize) -> String {
    let mut gcode = String::new();
    for m in moves {
        // Writing to a String cannot fail
        let _ = writeln!(gcode, "{}", m.render(decimals));
    }
    gcode
}

/// Serialize moves with an optional preamble and postamble copied verbatim.
///
/// A newline is added after either block only when it does not already end
/// with one.
pub fn render_program(
    moves: &[MachineMove],
    preamble: Option<&str>,
    postamble: Option<&str>,
    decimals: usize,
) -> String {
    let mut program = String::new();
    if let Some(pre) = preamble {
        push_block(&mut program, pre);
    }
    program.push_str(&to_gcode(moves, decimals));
    if let Some(post) = postamble {
        push_block(&mut program, post);
    }
    program
}

fn push_block(program: &mut String, block: &str) {
    program.push_str(block);
    if !block.is_empty() && !block.ends_with('\n') {
        program.push('\n');
    }
}

/// Generator for G-code from artwork
pub struct GcodeSynthesizer {
    params: ToolpathParameters,
}

/// A cutting tool as seen by one program.
#[derive(Debug, Clone, PartialEq)]
enum ToolId {
    /// The end mill for polygonal artwork
    Implicit,
    Drill { key: String, diameter: f64 },
}

struct EmitState {
    moves: Vec<MachineMove>,
    current_tool: Option<ToolId>,
    current_z: Option<f64>,
    /// Tool numbers handed out so far
    numbers: Vec<(ToolId, u32)>,
}

impl EmitState {
    /// Number for `tool`: its earlier number, else `preferred` or the next
    /// number no other tool holds.
    fn tool_number(&mut self, tool: &ToolId, preferred: u32) -> u32 {
        if let Some((_, n)) = self.numbers.iter().find(|(t, _)| t == tool) {
            return *n;
        }
        let mut n = preferred.max(1);
        while self.numbers.iter().any(|(_, used)| *used == n) {
            n += 1;
        }
        self.numbers.push((tool.clone(), n));
        n
    }

    fn rapid_z(&mut self, z: f64) {
        if self.current_z != Some(z) {
            self.moves.push(MachineMove::RapidZ(z));
            self.current_z = Some(z);
        }
    }
}

impl GcodeSynthesizer {
    pub fn new(params: ToolpathParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ToolpathParameters {
        &self.params
    }

    /// Moves for `artwork`, cut in order. All artwork must share one unit.
    pub fn synthesize(&self, artwork: &[Artwork]) -> CamToolResult<Vec<MachineMove>> {
        self.params.validate()?;
        let p = &self.params;

        let units = artwork.first().map(Artwork::units).unwrap_or_default();
        if let Some(other) = artwork.iter().find(|a| a.units() != units) {
            return Err(CamToolError::Geometry(GeometryError::UnitMismatch {
                expected: units,
                found: other.units(),
            }));
        }

        let mut state = EmitState {
            moves: Vec::new(),
            current_tool: None,
            current_z: None,
            numbers: Vec::new(),
        };
        let levels = p.depth_levels();

        // Header
        state
            .moves
            .push(MachineMove::Comment("Generated by PCBKit".to_string()));
        state.moves.push(MachineMove::Comment(format!(
            "Cut depth: {} {}, travel height: {} {}",
            num(p.cut_z, p.decimals),
            units,
            num(p.travel_z, p.decimals),
            units
        )));
        if levels.len() > 1 {
            state.moves.push(MachineMove::Comment(format!(
                "Depth passes: {}",
                levels.len()
            )));
        }
        state.moves.push(MachineMove::Units(units));
        state.moves.push(MachineMove::Absolute);
        state.moves.push(MachineMove::FeedPerMinute);
        state.moves.push(MachineMove::SetFeed(p.feed_rate));
        state.rapid_z(p.travel_z);
        state.moves.push(MachineMove::SpindleOn(p.spindle_speed));

        for art in artwork {
            state
                .moves
                .push(MachineMove::Comment(format!("Artwork: {}", art.name())));
            match art {
                Artwork::Polygonal(set) => self.emit_geometry(&mut state, set, &levels),
                Artwork::Drill(drills) => self.emit_drills(&mut state, drills, &levels)?,
            }
        }

        // Footer
        state.rapid_z(p.travel_z);
        state.moves.push(MachineMove::SpindleOff);

        debug!(
            "Synthesized {} moves from {} artwork items",
            state.moves.len(),
            artwork.len()
        );
        Ok(state.moves)
    }

    /// Synthesize and serialize in one step.
    pub fn generate(
        &self,
        artwork: &[Artwork],
        preamble: Option<&str>,
        postamble: Option<&str>,
    ) -> CamToolResult<String> {
        let moves = self.synthesize(artwork)?;
        Ok(render_program(
            &moves,
            preamble,
            postamble,
            self.params.decimals,
        ))
    }

    fn tool_change(&self, state: &mut EmitState, tool: ToolId, preferred: u32, diameter: f64) {
        if state.current_tool.as_ref() == Some(&tool) {
            return;
        }
        let number = state.tool_number(&tool, preferred);
        if self.params.toolchange {
            state.rapid_z(self.params.toolchange_z);
            state.moves.push(MachineMove::SpindleOff);
            state.moves.push(MachineMove::Comment(format!(
                "Tool change: T{} diameter {}",
                number,
                num(diameter, self.params.decimals)
            )));
            state.moves.push(MachineMove::ToolSelect(number));
            state.moves.push(MachineMove::Pause);
            state
                .moves
                .push(MachineMove::SpindleOn(self.params.spindle_speed));
            state.rapid_z(self.params.travel_z);
        }
        state.current_tool = Some(tool);
    }

    fn emit_geometry(&self, state: &mut EmitState, set: &GeometrySet, levels: &[f64]) {
        let p = &self.params;
        for (index, shape) in set.shapes.iter().enumerate() {
            for ring in shape.rings() {
                if ring.len() < 2 {
                    warn!(
                        "Skipping path with {} vertices in shape {} of '{}'",
                        ring.len(),
                        index,
                        set.name
                    );
                    continue;
                }
                self.tool_change(state, ToolId::Implicit, IMPLICIT_TOOL_NUMBER, p.tool_diameter);
                self.emit_path(state, ring, shape.is_closed(), levels);
            }
        }
    }

    fn emit_path(&self, state: &mut EmitState, path: &[Point], closed: bool, levels: &[f64]) {
        let p = &self.params;
        let start = path[0];

        state.rapid_z(p.travel_z);
        state.moves.push(MachineMove::RapidXY(start));
        for (i, &z) in levels.iter().enumerate() {
            state.moves.push(MachineMove::Plunge {
                z,
                feed: p.plunge_feed(),
            });
            state.current_z = Some(z);
            for &to in &path[1..] {
                state.moves.push(MachineMove::Feed {
                    to,
                    feed: p.feed_rate,
                });
            }
            if closed {
                state.moves.push(MachineMove::Feed {
                    to: start,
                    feed: p.feed_rate,
                });
            } else if i + 1 < levels.len() {
                state.rapid_z(p.travel_z);
                state.moves.push(MachineMove::RapidXY(start));
            }
        }
        state.rapid_z(p.travel_z);
    }

    fn emit_drills(
        &self,
        state: &mut EmitState,
        drills: &DrillSet,
        levels: &[f64],
    ) -> CamToolResult<()> {
        drills.validate()?;
        let p = &self.params;
        for (index, tool) in drills.tools.iter().enumerate() {
            let mut points = drills.points_for_tool(&tool.key).peekable();
            if points.peek().is_none() {
                continue;
            }
            let preferred = tool_key_number(&tool.key).unwrap_or(index as u32 + 1);
            let id = ToolId::Drill {
                key: tool.key.clone(),
                diameter: tool.diameter,
            };
            self.tool_change(state, id, preferred, tool.diameter);

            for point in points {
                state.rapid_z(p.travel_z);
                state.moves.push(MachineMove::RapidXY(point.position));
                for &z in levels {
                    state.moves.push(MachineMove::Plunge {
                        z,
                        feed: p.plunge_feed(),
                    });
                    state.current_z = Some(z);
                    state.rapid_z(p.travel_z);
                }
            }
        }
        Ok(())
    }
}

/// Number written in a drill tool key such as `"3"` or `"T03"`.
fn tool_key_number(key: &str) -> Option<u32> {
    let key = key.trim();
    let digits = key
        .strip_prefix('T')
        .or_else(|| key.strip_prefix('t'))
        .unwrap_or(key);
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}
