//! LambdaFS core: turns a file or directory tree into a gzip/brotli artifact
//! (tarballing directories first) and back.
//!
//! An operation is a chain of [`Stage`]s, Source -> [Archiver] -> [Codec] ->
//! Sink, each on its own thread and linked by bounded channels. The
//! [`Pipeline`] settles exactly one outcome per run: success once the sink
//! finishes, or the first error any stage reports.

mod archive;
mod capabilities;
mod channel;
mod classify;
mod codec;
mod completion;
mod coordinator;
mod error;
mod file;
mod pipeline;
mod progress;
mod settings;
mod stage;

pub use archive::{pack_tree, Packer, Unpacker};
pub use capabilities::Capabilities;
pub use channel::{ChannelReader, ChannelWriter};
pub use classify::{deflate_output, detect, inflate_output, Codec, EntryKind, Format, PathSpec, Placement};
pub use codec::{CodecStage, Direction};
pub use completion::Completion;
pub use coordinator::{Coordinator, Flavor, Plan, ARTIFACT_MODE, RESTORED_FILE_MODE};
pub use error::{LambdaError, Result};
pub use file::{FileReader, FileWriter};
pub use pipeline::{Pipeline, Report, DEFAULT_CHANNEL_DEPTH};
pub use progress::{mib, ProgressEvent, ProgressFn, Throughput};
pub use settings::PipelineSettings;
pub use stage::{Stage, StageEvents, StageIo, StageKind, StageRole, DEFAULT_CHUNK_SIZE};

pub use stream_codecs::{BrotliBackend, BrotliPreference};
