//! Deflate and inflate: plans the stage chain for one input path and runs it
//! to a single outcome.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use stream_codecs::BrotliOptions;

use crate::archive::{Packer, Unpacker};
use crate::capabilities::Capabilities;
use crate::classify::{self, Codec, Format, PathSpec, Placement};
use crate::codec::{CodecStage, Direction};
use crate::error::{LambdaError, Result};
use crate::file::{FileReader, FileWriter};
use crate::pipeline::Pipeline;
use crate::progress::ProgressFn;
use crate::settings::PipelineSettings;
use crate::stage::{Stage, StageKind};

/// Mode of compressed and archived artifacts.
pub const ARTIFACT_MODE: u32 = 0o644;
/// Mode of raw files restored by inflate.
pub const RESTORED_FILE_MODE: u32 = 0o700;

/// Which deflate form to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flavor {
    /// gzip throughput preset, artifact under the scratch dir.
    Library,
    /// brotli maximum-ratio preset, artifact next to the input.
    Cli,
}

/// Everything decided before any stage exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    /// The stat'ed input. `None` for a cache hit, which never looks at it.
    pub input: Option<PathSpec>,
    pub output: PathBuf,
    pub format: Format,
    pub direction: Direction,
    pub flavor: Flavor,
    /// Stage kinds, source first. Empty for a cache hit.
    pub stages: Vec<StageKind>,
    /// Inflate output already exists; nothing will run.
    pub cached: bool,
}

pub struct Coordinator {
    settings: PipelineSettings,
    capabilities: Capabilities,
    progress: Option<Arc<ProgressFn>>,
}

impl Coordinator {
    /// Probe codec implementations once and keep `settings` for every
    /// operation run through this coordinator.
    pub fn new(settings: PipelineSettings) -> Self {
        let capabilities = Capabilities::negotiate(settings.brotli_preference);
        Self::with_capabilities(settings, capabilities)
    }

    pub fn with_capabilities(settings: PipelineSettings, capabilities: Capabilities) -> Self {
        Self {
            settings,
            capabilities,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<ProgressFn>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Fail now, rather than mid-operation, if `codec` can't be run.
    pub fn require(&self, codec: Codec) -> Result<()> {
        self.capabilities.require(codec)
    }

    /// Library deflate: `<name>.gz` or `<name>.tar.gz` under the scratch dir.
    pub fn deflate(&self, path: &Path) -> Result<PathBuf> {
        let plan = self.plan_deflate(path, Flavor::Library)?;
        self.execute(&plan)?;
        Ok(plan.output)
    }

    /// Command-line deflate: `<name>.br` or `<name>.tar.br` beside the input.
    pub fn compress(&self, path: &Path) -> Result<PathBuf> {
        let plan = self.plan_deflate(path, Flavor::Cli)?;
        self.execute(&plan)?;
        Ok(plan.output)
    }

    /// Restore `path` under the scratch dir, decoding and unpacking as its
    /// name says. An existing output is returned untouched.
    pub fn inflate(&self, path: &Path) -> Result<PathBuf> {
        let plan = self.plan_inflate(path)?;
        if plan.cached {
            info!("inflate {}: using existing {}", path.display(), plan.output.display());
            return Ok(plan.output);
        }
        self.execute(&plan)?;
        Ok(plan.output)
    }

    pub fn plan_deflate(&self, path: &Path, flavor: Flavor) -> Result<Plan> {
        let input = PathSpec::stat(path)?;
        let (codec, placement) = match flavor {
            Flavor::Library => (Codec::Gzip, Placement::Scratch(self.settings.scratch_dir())),
            Flavor::Cli => (Codec::Brotli, Placement::Beside),
        };
        self.capabilities.require(codec)?;

        let output = classify::deflate_output(&input, codec, &placement)?;
        let archived = input.needs_archive();
        let stages = vec![
            if archived { StageKind::Packer } else { StageKind::FileReader },
            encoder_kind(codec),
            StageKind::FileWriter,
        ];

        Ok(Plan {
            input: Some(input),
            output,
            format: Format {
                codec: Some(codec),
                archived,
            },
            direction: Direction::Encode,
            flavor,
            stages,
            cached: false,
        })
    }

    pub fn plan_inflate(&self, path: &Path) -> Result<Plan> {
        let (output, format) = classify::inflate_output(path, &self.settings.scratch_dir())?;

        if fs::symlink_metadata(&output).is_ok() {
            return Ok(Plan {
                input: None,
                output,
                format,
                direction: Direction::Decode,
                flavor: Flavor::Library,
                stages: Vec::new(),
                cached: true,
            });
        }

        let input = PathSpec::stat(path)?;
        if let Some(codec) = format.codec {
            self.capabilities.require(codec)?;
        }

        let mut stages = vec![StageKind::FileReader];
        stages.extend(format.codec.map(decoder_kind));
        stages.push(if format.archived {
            StageKind::Unpacker
        } else {
            StageKind::FileWriter
        });

        Ok(Plan {
            input: Some(input),
            output,
            format,
            direction: Direction::Decode,
            flavor: Flavor::Library,
            stages,
            cached: false,
        })
    }

    fn execute(&self, plan: &Plan) -> Result<()> {
        let input = plan.input.as_ref().ok_or(LambdaError::Incomplete)?;
        if let Some(parent) = plan.output.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut pipeline = Pipeline::new()
            .channel_depth(self.settings.channel_depth)
            .progress(self.progress.clone());
        for kind in &plan.stages {
            pipeline = pipeline.boxed_stage(self.build_stage(*kind, input, plan)?);
        }

        let verb = match plan.direction {
            Direction::Encode => "deflate",
            Direction::Decode => "inflate",
        };
        info!("{verb} {} -> {}", input.path().display(), plan.output.display());
        debug!("{verb} stages: {:?}", plan.stages);

        let started = Instant::now();
        let report = pipeline.run()?;
        info!(
            "{verb} {} done in {:.2?} ({} bytes in)",
            plan.output.display(),
            started.elapsed(),
            report.bytes.first().copied().unwrap_or_default()
        );
        Ok(())
    }

    fn build_stage(&self, kind: StageKind, input: &PathSpec, plan: &Plan) -> Result<Box<dyn Stage>> {
        let read_chunk = self.settings.read_chunk_size;
        let codec_chunk = self.settings.codec_chunk_size;

        let stage: Box<dyn Stage> = match kind {
            StageKind::FileReader => Box::new(FileReader::new(input.path(), read_chunk)),
            StageKind::Packer => Box::new(Packer::new(input.path(), read_chunk)),
            StageKind::GzipEncoder => Box::new(CodecStage::gzip_encoder(self.settings.gzip_level, codec_chunk)),
            StageKind::GzipDecoder => Box::new(CodecStage::gzip_decoder(codec_chunk)),
            StageKind::BrotliEncoder => {
                let opts = match plan.flavor {
                    Flavor::Cli => BrotliOptions::max_ratio(input.size().unwrap_or(0)),
                    Flavor::Library => BrotliOptions::default(),
                };
                let backend = self.capabilities.brotli()?.clone();
                Box::new(CodecStage::brotli_encoder(opts, backend, codec_chunk))
            }
            StageKind::BrotliDecoder => {
                let backend = self.capabilities.brotli()?.clone();
                Box::new(CodecStage::brotli_decoder(backend, codec_chunk))
            }
            StageKind::FileWriter => {
                let mode = match plan.direction {
                    Direction::Encode => ARTIFACT_MODE,
                    Direction::Decode => RESTORED_FILE_MODE,
                };
                Box::new(FileWriter::new(&plan.output, mode))
            }
            StageKind::Unpacker => Box::new(Unpacker::new(&plan.output)),
            StageKind::Custom { name, .. } => {
                return Err(LambdaError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cannot build custom stage {name}"),
                )))
            }
        };
        Ok(stage)
    }
}

fn encoder_kind(codec: Codec) -> StageKind {
    match codec {
        Codec::Gzip => StageKind::GzipEncoder,
        Codec::Brotli => StageKind::BrotliEncoder,
    }
}

fn decoder_kind(codec: Codec) -> StageKind {
    match codec {
        Codec::Gzip => StageKind::GzipDecoder,
        Codec::Brotli => StageKind::BrotliDecoder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator(scratch: &Path) -> Coordinator {
        let settings = PipelineSettings::default().with_scratch_dir(scratch);
        Coordinator::with_capabilities(settings, Capabilities::gzip_only())
    }

    #[test]
    fn deflate_plans_archive_for_directories_only() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let tree = dir.path().join("tree");
        let file = dir.path().join("file.txt");
        fs::create_dir(&tree)?;
        fs::write(&file, b"data")?;
        let coord = coordinator(&dir.path().join("scratch"));

        let plan = coord.plan_deflate(&tree, Flavor::Library)?;
        assert_eq!(
            plan.stages,
            [StageKind::Packer, StageKind::GzipEncoder, StageKind::FileWriter]
        );
        assert_eq!(plan.output, dir.path().join("scratch/tree.tar.gz"));

        let plan = coord.plan_deflate(&file, Flavor::Library)?;
        assert_eq!(
            plan.stages,
            [StageKind::FileReader, StageKind::GzipEncoder, StageKind::FileWriter]
        );
        assert_eq!(plan.output, dir.path().join("scratch/file.txt.gz"));
        Ok(())
    }

    #[test]
    fn missing_brotli_is_reported_before_anything_runs() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let file = dir.path().join("file.txt");
        fs::write(&file, b"data")?;
        let coord = coordinator(dir.path());

        let err = coord.compress(&file).unwrap_err();
        assert!(matches!(err, LambdaError::CodecUnavailable { codec: Codec::Brotli }), "{err:?}");
        assert!(!dir.path().join("file.txt.br").exists());
        assert!(coord.require(Codec::Brotli).is_err());
        Ok(())
    }

    #[test]
    fn cache_hit_skips_the_input_entirely() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        fs::write(dir.path().join("ghost"), b"already here")?;
        let coord = coordinator(dir.path());

        // The input doesn't exist; the existing output is enough.
        let plan = coord.plan_inflate(Path::new("/nowhere/ghost.tar.br"))?;
        assert!(plan.cached);
        assert!(plan.stages.is_empty());
        assert_eq!(coord.inflate(Path::new("/nowhere/ghost.tar.br"))?, dir.path().join("ghost"));
        Ok(())
    }
}
