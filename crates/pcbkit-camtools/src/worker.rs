//! Engine requests, the background worker and the batch runner.
//!
//! Every engine operation is described by an [`EngineRequest`] value, so a
//! front end can queue work without holding closures. [`execute`] is the
//! pure dispatcher; [`EngineWorker`] runs requests on a background thread and
//! [`run_batch`] runs independent requests in parallel.

use crate::cutout::{cutout, CutoutParameters};
use crate::error::{CamToolError, CamToolResult};
use crate::gcode::{GcodeSynthesizer, ToolpathParameters};
use crate::isolation::{isolate, IsolationParameters};
use crate::mirror::{generate_alignment_holes, mirror_artwork, AxisReference, MirrorAxis};
use crate::paint::{paint, PaintParameters};
use pcbkit_core::{
    thread_safe_map, Artwork, CancelToken, DrillSet, GeometrySet, Point, ThreadSafeMap, Units,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What to compute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EngineRequest {
    Isolate {
        source: GeometrySet,
        params: IsolationParameters,
    },
    Cutout {
        source: Artwork,
        params: CutoutParameters,
    },
    Paint {
        source: GeometrySet,
        point: Point,
        params: PaintParameters,
    },
    Mirror {
        source: Artwork,
        axis: MirrorAxis,
        reference: AxisReference,
    },
    AlignmentHoles {
        holes: Vec<Point>,
        axis: MirrorAxis,
        reference: AxisReference,
        drill_diameter: f64,
        units: Units,
    },
    Synthesize {
        artwork: Vec<Artwork>,
        params: ToolpathParameters,
        #[serde(default)]
        preamble: Option<String>,
        #[serde(default)]
        postamble: Option<String>,
    },
}

impl EngineRequest {
    /// Short operation name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineRequest::Isolate { .. } => "isolate",
            EngineRequest::Cutout { .. } => "cutout",
            EngineRequest::Paint { .. } => "paint",
            EngineRequest::Mirror { .. } => "mirror",
            EngineRequest::AlignmentHoles { .. } => "alignment_holes",
            EngineRequest::Synthesize { .. } => "synthesize",
        }
    }
}

/// Result of an engine request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EngineResponse {
    /// One or more geometry sets, in generation order
    Geometry(Vec<GeometrySet>),
    /// Transformed artwork
    Artwork(Artwork),
    /// Drill data
    Drills(DrillSet),
    /// G-code text
    Program(String),
}

impl EngineResponse {
    /// Artwork carried by the response, flattened. Programs carry none.
    pub fn into_artwork(self) -> Vec<Artwork> {
        match self {
            EngineResponse::Geometry(sets) => sets.into_iter().map(Artwork::Polygonal).collect(),
            EngineResponse::Artwork(art) => vec![art],
            EngineResponse::Drills(drills) => vec![Artwork::Drill(drills)],
            EngineResponse::Program(_) => Vec::new(),
        }
    }
}

/// Run a request to completion on the calling thread.
pub fn execute(request: &EngineRequest, cancel: &CancelToken) -> CamToolResult<EngineResponse> {
    match request {
        EngineRequest::Isolate { source, params } => {
            let output = isolate(source, params, cancel)?;
            Ok(EngineResponse::Geometry(output.into_sets()))
        }
        EngineRequest::Cutout { source, params } => {
            Ok(EngineResponse::Geometry(vec![cutout(source, params)?]))
        }
        EngineRequest::Paint {
            source,
            point,
            params,
        } => Ok(EngineResponse::Geometry(vec![paint(
            source, *point, params, cancel,
        )?])),
        EngineRequest::Mirror {
            source,
            axis,
            reference,
        } => {
            let mut mirrored = source.clone();
            mirror_artwork(&mut mirrored, *axis, reference);
            Ok(EngineResponse::Artwork(mirrored))
        }
        EngineRequest::AlignmentHoles {
            holes,
            axis,
            reference,
            drill_diameter,
            units,
        } => Ok(EngineResponse::Drills(generate_alignment_holes(
            holes,
            *axis,
            reference,
            *drill_diameter,
            *units,
        )?)),
        EngineRequest::Synthesize {
            artwork,
            params,
            preamble,
            postamble,
        } => {
            let synthesizer = GcodeSynthesizer::new(params.clone());
            let program =
                synthesizer.generate(artwork, preamble.as_deref(), postamble.as_deref())?;
            Ok(EngineResponse::Program(program))
        }
    }
}

/// Outcome of a batch. Indices refer to the input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<(usize, EngineResponse)>,
    pub failed: Vec<(usize, CamToolError)>,
}

impl BatchReport {
    /// True when some requests failed while others completed.
    pub fn is_partial_failure(&self) -> bool {
        !self.failed.is_empty() && !self.completed.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Run independent requests in parallel.
///
/// Results keep input order. A failing request is reported in
/// [`BatchReport::failed`] and does not stop the others.
pub fn run_batch(requests: &[EngineRequest], cancel: &CancelToken) -> BatchReport {
    let results: Vec<(usize, CamToolResult<EngineResponse>)> = requests
        .par_iter()
        .enumerate()
        .map(|(index, request)| (index, execute(request, cancel)))
        .collect();

    let mut report = BatchReport::default();
    for (index, result) in results {
        match result {
            Ok(response) => report.completed.push((index, response)),
            Err(e) => {
                warn!(
                    "Batch request {} ({}) failed: {}",
                    index,
                    requests[index].kind(),
                    e
                );
                report.failed.push((index, e));
            }
        }
    }
    info!(
        "Batch finished: {} completed, {} failed",
        report.completed.len(),
        report.failed.len()
    );
    report
}

/// Handle returned by [`EngineWorker::submit`].
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub id: Uuid,
    pub cancel: CancelToken,
}

/// Finished job.
#[derive(Debug)]
pub struct JobResult {
    pub id: Uuid,
    pub result: CamToolResult<EngineResponse>,
}

struct QueuedJob {
    id: Uuid,
    request: EngineRequest,
    cancel: CancelToken,
}

/// Background thread that executes requests in submission order.
pub struct EngineWorker {
    sender: Option<mpsc::Sender<QueuedJob>>,
    results: mpsc::Receiver<JobResult>,
    handle: Option<JoinHandle<()>>,
    pending: ThreadSafeMap<Uuid, CancelToken>,
}

impl EngineWorker {
    pub fn spawn() -> CamToolResult<Self> {
        let (job_tx, job_rx) = mpsc::channel::<QueuedJob>();
        let (result_tx, result_rx) = mpsc::channel::<JobResult>();
        let pending: ThreadSafeMap<Uuid, CancelToken> = thread_safe_map();
        let worker_pending = pending.clone();

        let handle = thread::Builder::new()
            .name("pcbkit-engine".to_string())
            .spawn(move || {
                for job in job_rx {
                    let result = if job.cancel.is_cancelled() {
                        Err(CamToolError::Cancelled)
                    } else {
                        debug!("Running job {} ({})", job.id, job.request.kind());
                        execute(&job.request, &job.cancel)
                    };
                    worker_pending.lock().remove(&job.id);
                    if result_tx
                        .send(JobResult {
                            id: job.id,
                            result,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                debug!("Engine worker stopped");
            })?;

        Ok(Self {
            sender: Some(job_tx),
            results: result_rx,
            handle: Some(handle),
            pending,
        })
    }

    /// Queue a request. The returned token cancels this job only.
    pub fn submit(&self, request: EngineRequest) -> CamToolResult<JobHandle> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(CamToolError::WorkerDisconnected)?;
        let id = Uuid::new_v4();
        let cancel = CancelToken::new();
        self.pending.lock().insert(id, cancel.clone());
        if sender
            .send(QueuedJob {
                id,
                request,
                cancel: cancel.clone(),
            })
            .is_err()
        {
            self.pending.lock().remove(&id);
            return Err(CamToolError::WorkerDisconnected);
        }
        Ok(JobHandle { id, cancel })
    }

    /// Cancel a queued or running job. Returns false if it already finished.
    pub fn cancel(&self, id: Uuid) -> bool {
        match self.pending.lock().get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of jobs queued or running.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Block until the next job finishes.
    pub fn recv(&self) -> CamToolResult<JobResult> {
        self.results
            .recv()
            .map_err(|_| CamToolError::WorkerDisconnected)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<JobResult> {
        self.results.recv_timeout(timeout).ok()
    }

    pub fn try_recv(&self) -> Option<JobResult> {
        self.results.try_recv().ok()
    }

    /// Stop accepting jobs and wait for queued ones to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Engine worker thread panicked");
            }
        }
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
