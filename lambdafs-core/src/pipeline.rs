//! The stage runner: wires Source -> ... -> Sink over bounded channels, runs
//! every stage on its own thread and settles one outcome from their events.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use log::{debug, warn};

use crate::channel::channel;
use crate::completion::Completion;
use crate::error::{LambdaError, Result};
use crate::progress::{ProgressEvent, ProgressFn};
use crate::stage::{Stage, StageEvent, StageEvents, StageIo, StageKind};

/// Chunks buffered between two stages before the upstream one blocks.
pub const DEFAULT_CHANNEL_DEPTH: usize = 2;

/// What a finished run did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub stages: Vec<StageKind>,
    /// Bytes each stage reported, in stage order.
    pub bytes: Vec<u64>,
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    channel_depth: usize,
    progress: Option<Arc<ProgressFn>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            channel_depth: DEFAULT_CHANNEL_DEPTH,
            progress: None,
        }
    }

    pub fn channel_depth(mut self, depth: usize) -> Self {
        self.channel_depth = depth.max(1);
        self
    }

    pub fn progress(mut self, progress: Option<Arc<ProgressFn>>) -> Self {
        self.progress = progress;
        self
    }

    /// Append a stage; the first is the source and the last the sink.
    pub fn stage<S: Stage + 'static>(self, stage: S) -> Self {
        self.boxed_stage(Box::new(stage))
    }

    pub fn boxed_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|stage| stage.kind()).collect()
    }

    /// Run every stage to completion or first failure.
    ///
    /// Settles Success when the sink reports completion and Failure on the
    /// first error from any stage; whatever arrives after that is ignored.
    /// Every stage thread has exited, and so released its resources, by the
    /// time this returns.
    pub fn run(self) -> Result<Report> {
        let Pipeline {
            stages,
            channel_depth,
            progress,
        } = self;

        if stages.len() < 2 {
            return Err(LambdaError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "a pipeline needs at least a source and a sink",
            )));
        }

        let kinds: Vec<StageKind> = stages.iter().map(|stage| stage.kind()).collect();
        let sink = kinds.len() - 1;
        let (events_tx, events_rx) = flume::unbounded();

        let mut ios = Vec::with_capacity(stages.len());
        let mut upstream = None;
        for (index, stage) in stages.iter().enumerate() {
            let events = StageEvents::new(index, events_tx.clone());
            let (output, next) = if index == sink {
                (None, None)
            } else {
                let (writer, reader) = channel(channel_depth, stage.chunk_size(), events.clone());
                (Some(writer), Some(reader))
            };
            ios.push(StageIo::new(upstream.take(), output, events));
            upstream = next;
        }
        // Once every stage is gone the event loop must see a disconnect.
        drop(events_tx);

        let mut completion = Completion::new();
        let mut handles = Vec::with_capacity(stages.len());
        for ((stage, io), kind) in stages.into_iter().zip(ios).zip(kinds.iter().copied()) {
            let spawned = thread::Builder::new()
                .name(format!("lambdafs-{kind}"))
                .spawn(move || drive(stage, io));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    // Unspawned stages drop their channel ends here, which
                    // unwinds the ones already running.
                    completion.fail(LambdaError::Io(err));
                    break;
                }
            }
        }

        debug!("pipeline started: {kinds:?}");
        let mut bytes = vec![0u64; kinds.len()];

        while completion.is_running() {
            let Ok(event) = events_rx.recv() else { break };
            match event {
                StageEvent::Data { index, bytes: n } => {
                    bytes[index] += n;
                    if let Some(progress) = &progress {
                        progress(&ProgressEvent {
                            stage: kinds[index],
                            bytes: n,
                            total: bytes[index],
                        });
                    }
                }
                StageEvent::Failed { index, error } => {
                    warn!("{} stage failed: {error}", kinds[index]);
                    completion.fail(LambdaError::stage(kinds[index], error));
                }
                StageEvent::Panicked { index } => {
                    warn!("{} stage panicked", kinds[index]);
                    completion.fail(LambdaError::StagePanicked { stage: kinds[index] });
                }
                StageEvent::Done { index } => {
                    debug!("{} stage done", kinds[index]);
                    if index == sink {
                        completion.succeed(());
                    }
                }
            }
        }

        // Teardown: a failure cascades through the channels, so every thread
        // exits on its own.
        for handle in handles {
            if handle.join().is_err() {
                completion.fail(LambdaError::Incomplete);
            }
        }

        for event in events_rx.try_iter() {
            if let StageEvent::Failed { index, error } = event {
                debug!("ignoring {} failure after settlement: {error}", kinds[index]);
            }
        }

        completion
            .into_outcome()
            .unwrap_or(Err(LambdaError::Incomplete))
            .map(|()| Report { stages: kinds, bytes })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of a stage thread. The terminal event is sent before the channel
/// ends in `io` are dropped, so the pipeline always hears about a failure
/// before any downstream stage can react to it.
fn drive(stage: Box<dyn Stage>, mut io: StageIo) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| stage.run(&mut io)));
    match outcome {
        Ok(Ok(())) => match io.close() {
            Ok(()) => io.events().done(),
            Err(error) => io.events().failed(error),
        },
        Ok(Err(error)) => io.events().failed(error),
        Err(_) => io.events().panicked(),
    }
    drop(io);
}
