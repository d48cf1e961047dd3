//! Byte-count events for progress reporting. Observers never affect the
//! outcome of an operation.

use crate::stage::{StageKind, StageRole};

/// Bytes handed downstream by one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: StageKind,
    /// Bytes in this event.
    pub bytes: u64,
    /// Bytes reported by this stage so far.
    pub total: u64,
}

pub type ProgressFn = dyn Fn(&ProgressEvent) + Send + Sync;

/// Running totals of bytes read from the input and written by the codec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Throughput {
    pub read: u64,
    pub written: u64,
}

impl Throughput {
    pub fn observe(&mut self, event: &ProgressEvent) {
        match event.stage.role() {
            StageRole::Source | StageRole::Archiver => self.read += event.bytes,
            StageRole::Codec => self.written += event.bytes,
            StageRole::Sink => {}
        }
    }

    pub fn read_mib(&self) -> f64 {
        mib(self.read)
    }

    pub fn written_mib(&self) -> f64 {
        mib(self.written)
    }
}

pub fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
