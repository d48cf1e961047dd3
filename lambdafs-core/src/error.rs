use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::classify::Codec;
use crate::stage::StageKind;

/// Errors settled by a deflate/inflate operation.
#[derive(Debug, Error)]
pub enum LambdaError {
    #[error("input path does not exist: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// A stage failed. Displays as the underlying error, unchanged.
    #[error("{source}")]
    Stage {
        stage: StageKind,
        #[source]
        source: io::Error,
    },

    #[error("{codec} codec is not available in this environment")]
    CodecUnavailable { codec: Codec },

    #[error("path has no file name: {}", path.display())]
    InvalidPath { path: PathBuf },

    #[error("{stage} stage panicked")]
    StagePanicked { stage: StageKind },

    #[error("pipeline stopped before its sink completed")]
    Incomplete,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LambdaError {
    pub(crate) fn stage(stage: StageKind, source: io::Error) -> Self {
        Self::Stage { stage, source }
    }

    /// Stage that produced this error, if any.
    pub fn failed_stage(&self) -> Option<StageKind> {
        match self {
            Self::Stage { stage, .. } | Self::StagePanicked { stage } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying I/O error, for stage and I/O failures.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Stage { source, .. } | Self::Io(source) => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LambdaError>;
