//! The uniform stage abstraction the pipeline wires together.

use std::fmt;
use std::io::{self, Write};

use flume::Sender;

use crate::channel::{ChannelReader, ChannelWriter};

/// Default output chunk size for stages that don't pick one (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Position a stage plays in Source -> [Archiver] -> [Codec] -> Sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageRole {
    Source,
    Archiver,
    Codec,
    Sink,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    FileReader,
    /// Archives a directory into a tar stream.
    Packer,
    GzipEncoder,
    GzipDecoder,
    BrotliEncoder,
    BrotliDecoder,
    FileWriter,
    /// Extracts a tar stream into a directory.
    Unpacker,
    /// Stages defined outside this crate.
    Custom { name: &'static str, role: StageRole },
}

impl StageKind {
    pub fn role(self) -> StageRole {
        match self {
            StageKind::FileReader => StageRole::Source,
            StageKind::Packer | StageKind::Unpacker => StageRole::Archiver,
            StageKind::GzipEncoder
            | StageKind::GzipDecoder
            | StageKind::BrotliEncoder
            | StageKind::BrotliDecoder => StageRole::Codec,
            StageKind::FileWriter => StageRole::Sink,
            StageKind::Custom { role, .. } => role,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::FileReader => "file-reader",
            StageKind::Packer => "packer",
            StageKind::GzipEncoder => "gzip-encoder",
            StageKind::GzipDecoder => "gzip-decoder",
            StageKind::BrotliEncoder => "brotli-encoder",
            StageKind::BrotliDecoder => "brotli-decoder",
            StageKind::FileWriter => "file-writer",
            StageKind::Unpacker => "unpacker",
            StageKind::Custom { name, .. } => *name,
        };
        f.write_str(name)
    }
}

/// One unit of the chain. Every kind of stage (reader, archiver, codec,
/// writer) exposes this same surface, so the pipeline never branches on
/// concrete types.
pub trait Stage: Send {
    fn kind(&self) -> StageKind;

    /// Size of the chunks this stage hands downstream.
    fn chunk_size(&self) -> usize {
        DEFAULT_CHUNK_SIZE
    }

    /// Move bytes from `io`'s input to its output until the input ends.
    ///
    /// Returning `Ok` means the stage's own work succeeded; the pipeline then
    /// drains leftover input, sends the end marker and reports completion.
    fn run(self: Box<Self>, io: &mut StageIo) -> io::Result<()>;
}

pub(crate) enum StageEvent {
    Data { index: usize, bytes: u64 },
    Failed { index: usize, error: io::Error },
    Panicked { index: usize },
    Done { index: usize },
}

/// A stage's handle on the pipeline's event channel.
#[derive(Clone)]
pub struct StageEvents {
    index: usize,
    tx: Sender<StageEvent>,
}

impl StageEvents {
    pub(crate) fn new(index: usize, tx: Sender<StageEvent>) -> Self {
        Self { index, tx }
    }

    /// Report `bytes` produced by this stage.
    pub fn data(&self, bytes: u64) {
        // The pipeline stops listening once settled.
        let _ = self.tx.send(StageEvent::Data {
            index: self.index,
            bytes,
        });
    }

    pub(crate) fn failed(&self, error: io::Error) {
        let _ = self.tx.send(StageEvent::Failed {
            index: self.index,
            error,
        });
    }

    pub(crate) fn panicked(&self) {
        let _ = self.tx.send(StageEvent::Panicked { index: self.index });
    }

    pub(crate) fn done(&self) {
        let _ = self.tx.send(StageEvent::Done { index: self.index });
    }
}

/// The channel ends handed to a running stage. Sources have no input and
/// sinks have no output.
pub struct StageIo {
    input: Option<ChannelReader>,
    output: Option<ChannelWriter>,
    events: StageEvents,
}

impl StageIo {
    pub(crate) fn new(input: Option<ChannelReader>, output: Option<ChannelWriter>, events: StageEvents) -> Self {
        Self { input, output, events }
    }

    pub fn reader(&mut self) -> io::Result<&mut ChannelReader> {
        self.input.as_mut().ok_or_else(no_input)
    }

    pub fn writer(&mut self) -> io::Result<&mut ChannelWriter> {
        self.output.as_mut().ok_or_else(no_output)
    }

    /// Both ends at once, for transform stages.
    pub fn split(&mut self) -> io::Result<(&mut ChannelReader, &mut ChannelWriter)> {
        match (self.input.as_mut(), self.output.as_mut()) {
            (Some(input), Some(output)) => Ok((input, output)),
            (None, _) => Err(no_input()),
            (_, None) => Err(no_output()),
        }
    }

    pub fn events(&self) -> &StageEvents {
        &self.events
    }

    /// Drain leftover input to its end marker, then end the output.
    pub(crate) fn close(&mut self) -> io::Result<()> {
        if let Some(input) = self.input.as_mut() {
            let leftover = input.drain()?;
            if leftover > 0 {
                log::debug!("discarded {leftover} trailing bytes");
            }
        }
        if let Some(output) = self.output.as_mut() {
            output.flush()?;
            output.finish()?;
        }
        Ok(())
    }
}

fn no_input() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "stage has no upstream")
}

fn no_output() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "stage has no downstream")
}
