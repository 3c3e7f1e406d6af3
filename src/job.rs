//! Job pipeline
//!
//! A job names its input artwork and a list of operations. Operations run as
//! one parallel batch; every piece of artwork they produce is then turned into
//! its own G-code program.

use anyhow::{bail, Context, Result};
use pcbkit_camtools::{
    run_batch, AxisReference, CutoutParameters, EngineRequest, EngineResponse, IsolationParameters,
    MirrorAxis, PaintParameters,
};
use pcbkit_core::{Artwork, CancelToken, GeometrySet, Point};
use pcbkit_settings::Config;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One engine operation on named artwork. Parameters left out come from the
/// config, converted into the artwork's units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Isolate {
        artwork: String,
        #[serde(default)]
        params: Option<IsolationParameters>,
    },
    Cutout {
        artwork: String,
        #[serde(default)]
        params: Option<CutoutParameters>,
    },
    Paint {
        artwork: String,
        /// Selects the polygon; also the seed for seed clearing
        seed: Point,
        #[serde(default)]
        params: Option<PaintParameters>,
    },
    Mirror {
        artwork: String,
        #[serde(default)]
        axis: Option<MirrorAxis>,
        /// Defaults to the centre of the artwork bounds
        #[serde(default)]
        reference: Option<AxisReference>,
    },
    AlignmentHoles {
        artwork: String,
        #[serde(default)]
        axis: Option<MirrorAxis>,
        #[serde(default)]
        reference: Option<AxisReference>,
        /// Defaults to the configured alignment holes
        #[serde(default)]
        holes: Option<Vec<Point>>,
    },
}

impl Operation {
    pub fn artwork(&self) -> &str {
        match self {
            Operation::Isolate { artwork, .. }
            | Operation::Cutout { artwork, .. }
            | Operation::Paint { artwork, .. }
            | Operation::Mirror { artwork, .. }
            | Operation::AlignmentHoles { artwork, .. } => artwork,
        }
    }
}

/// Input artwork plus the operations to run on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub artwork: Vec<Artwork>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

/// A finished G-code program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Name of the artwork the program cuts
    pub name: String,
    pub gcode: String,
}

/// An operation that produced no output.
#[derive(Debug, Clone, PartialEq)]
pub struct JobFailure {
    /// Index into [`Job::operations`]
    pub operation: usize,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct JobOutput {
    pub programs: Vec<Program>,
    pub failures: Vec<JobFailure>,
}

impl Job {
    /// Parse a job from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid job file")
    }

    fn find(&self, name: &str) -> Result<&Artwork> {
        self.artwork
            .iter()
            .find(|a| a.name() == name)
            .with_context(|| format!("No artwork named '{}'", name))
    }

    fn geometry(&self, name: &str) -> Result<&GeometrySet> {
        match self.find(name)?.as_geometry() {
            Some(set) => Ok(set),
            None => bail!("Artwork '{}' is drill data, not geometry", name),
        }
    }

    /// Mirror reference: explicit, or the centre of the artwork bounds.
    fn reference(&self, name: &str, reference: Option<AxisReference>) -> Result<AxisReference> {
        if let Some(reference) = reference {
            return Ok(reference);
        }
        let bounds = self
            .find(name)?
            .bounds()
            .with_context(|| format!("Artwork '{}' is empty; give a mirror reference", name))?;
        Ok(AxisReference::BoxCenter(bounds))
    }

    /// Engine requests for every operation, in order.
    pub fn requests(&self, config: &Config) -> Result<Vec<EngineRequest>> {
        self.operations
            .iter()
            .enumerate()
            .map(|(index, op)| {
                self.request(op, config)
                    .with_context(|| format!("Operation {} ({})", index, op.artwork()))
            })
            .collect()
    }

    fn request(&self, op: &Operation, config: &Config) -> Result<EngineRequest> {
        let target = self.find(op.artwork())?;
        let mut defaults = config.clone();
        defaults.convert_units(target.units());

        let request = match op {
            Operation::Isolate { artwork, params } => EngineRequest::Isolate {
                source: self.geometry(artwork)?.clone(),
                params: params.clone().unwrap_or(defaults.isolation),
            },
            Operation::Cutout { artwork, params } => EngineRequest::Cutout {
                source: self.find(artwork)?.clone(),
                params: params.clone().unwrap_or(defaults.cutout),
            },
            Operation::Paint {
                artwork,
                seed,
                params,
            } => EngineRequest::Paint {
                source: self.geometry(artwork)?.clone(),
                point: *seed,
                params: params.clone().unwrap_or(defaults.paint),
            },
            Operation::Mirror {
                artwork,
                axis,
                reference,
            } => EngineRequest::Mirror {
                source: self.find(artwork)?.clone(),
                axis: axis.unwrap_or(defaults.mirror.axis),
                reference: self.reference(artwork, *reference)?,
            },
            Operation::AlignmentHoles {
                artwork,
                axis,
                reference,
                holes,
            } => {
                let holes = holes
                    .clone()
                    .unwrap_or_else(|| defaults.mirror.alignment_holes.clone());
                if holes.is_empty() {
                    bail!("No alignment holes given or configured");
                }
                EngineRequest::AlignmentHoles {
                    holes,
                    axis: axis.unwrap_or(defaults.mirror.axis),
                    reference: self.reference(artwork, *reference)?,
                    drill_diameter: defaults.mirror.alignment_drill_diameter,
                    units: defaults.units,
                }
            }
        };
        Ok(request)
    }
}

/// Run every operation of `job`, then synthesize one program per result.
///
/// A job that cannot be turned into requests is an error. Engine and
/// synthesis failures are collected in [`JobOutput::failures`] and do not
/// stop other operations or programs.
pub fn run_job(job: &Job, config: &Config, cancel: &CancelToken) -> Result<JobOutput> {
    config.validate()?;
    let requests = job.requests(config)?;
    info!("Running {} operations", requests.len());

    let mut output = JobOutput::default();
    let report = run_batch(&requests, cancel);
    for (index, err) in &report.failed {
        output.failures.push(JobFailure {
            operation: *index,
            message: err.to_string(),
        });
    }

    // Each result remembers the operation that produced it
    let artwork: Vec<(usize, Artwork)> = report
        .completed
        .into_iter()
        .flat_map(|(index, response)| {
            response
                .into_artwork()
                .into_iter()
                .map(move |art| (index, art))
        })
        .filter(|(_, art)| !art.is_empty())
        .collect();

    let synth_requests: Vec<EngineRequest> = artwork
        .iter()
        .map(|(_, art)| {
            let mut defaults = config.clone();
            defaults.convert_units(art.units());
            EngineRequest::Synthesize {
                artwork: vec![art.clone()],
                params: defaults.gcode,
                preamble: defaults.preamble,
                postamble: defaults.postamble,
            }
        })
        .collect();

    let report = run_batch(&synth_requests, cancel);
    for (index, err) in report.failed {
        let (operation, art) = &artwork[index];
        output.failures.push(JobFailure {
            operation: *operation,
            message: format!("G-code synthesis failed for '{}': {}", art.name(), err),
        });
    }
    for (index, response) in report.completed {
        if let EngineResponse::Program(gcode) = response {
            output.programs.push(Program {
                name: artwork[index].1.name().to_string(),
                gcode,
            });
        }
    }
    output.failures.sort_by_key(|f| f.operation);

    info!(
        "Job finished: {} programs, {} failed operations",
        output.programs.len(),
        output.failures.len()
    );
    Ok(output)
}
