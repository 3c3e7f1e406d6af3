//! # PCBKit
//!
//! A Rust toolpath geometry engine for PCB fabrication on a CNC mill:
//! - Multi-pass isolation routing around copper
//! - Board cutouts with retention bridges
//! - Pocket clearing (standard and seed strategies)
//! - Mirroring and alignment holes for double-sided boards
//! - G-code synthesis with multi-depth and tool changes
//!
//! ## Architecture
//!
//! PCBKit is organized as a workspace with multiple crates:
//!
//! 1. **pcbkit-core** - Geometry store, units, cancellation, shared types
//! 2. **pcbkit-camtools** - Offset kernel, engines, G-code, engine worker
//! 3. **pcbkit-settings** - Engine defaults and config persistence
//! 4. **pcbkit** - Job pipeline and the command line binary

pub mod job;

pub use job::{run_job, Job, JobFailure, JobOutput, Operation, Program};

pub use pcbkit_camtools::{
    CamToolError, CutoutParameters, EngineRequest, EngineResponse, GapPlacement,
    IsolationParameters, MirrorAxis, PaintMethod, PaintParameters, ToolpathParameters,
};
pub use pcbkit_core::{Artwork, CancelToken, DrillSet, GeometrySet, Point, Shape, Units};
pub use pcbkit_settings::{Config, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
///
/// Logs go to stderr so generated G-code can be piped from stdout.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
