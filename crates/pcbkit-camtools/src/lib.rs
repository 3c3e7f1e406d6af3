//! # PCBKit CAM Tools
//!
//! Toolpath engines for PCB fabrication. Each engine reads geometry from the
//! `pcbkit-core` store and produces new geometry or machine moves.
//!
//! ## Engines
//!
//! - **Offset kernel**: grow and shrink polygonal regions
//! - **Isolation**: multi-pass isolation routing around copper
//! - **Cutout**: board outline paths with retention bridges
//! - **Paint**: pocket clearing, standard and seed strategies
//! - **Mirror**: double-sided registration and alignment holes
//! - **G-code**: machine moves and program text
//!
//! ## Supporting Infrastructure
//!
//! - **Worker**: request values, a background worker and a parallel batch runner

pub mod cutout;
pub mod error;
pub mod gcode;
pub mod isolation;
pub mod mirror;
pub mod offset;
pub mod paint;
pub mod worker;

pub use cutout::{cutout, CutoutParameters, GapPlacement};
pub use error::{CamToolError, CamToolResult, ParameterError, ParameterResult};
pub use gcode::{render_program, to_gcode, GcodeSynthesizer, MachineMove, ToolpathParameters};
pub use isolation::{isolate, IsolationOutput, IsolationParameters};
pub use mirror::{
    generate_alignment_holes, mirror, mirror_artwork, mirror_point, AxisReference, MirrorAxis,
    ALIGNMENT_TOOL_KEY,
};
pub use offset::buffer;
pub use paint::{clear_polygon, clear_polygon_with_progress, paint, PaintMethod, PaintParameters};
pub use worker::{
    execute, run_batch, BatchReport, EngineRequest, EngineResponse, EngineWorker, JobHandle,
    JobResult,
};
