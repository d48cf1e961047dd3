use anyhow::Result;
use lambdafs_core::{
    Capabilities, Coordinator, FileReader, FileWriter, Flavor, LambdaError, Pipeline, PipelineSettings, Stage,
    StageIo, StageKind, StageRole,
};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tempfile::TempDir;

fn touch(dir: &Path, name: &str) -> Result<std::path::PathBuf> {
    let path = dir.join(name);
    fs::write(&path, b"")?;
    Ok(path)
}

#[test]
fn test_inflate_selects_stages_from_suffix() -> Result<()> {
    use StageKind as K;

    let work = TempDir::new()?;
    let scratch = TempDir::new()?;
    let coord = Coordinator::new(PipelineSettings::default().with_scratch_dir(scratch.path()));

    let cases: &[(&str, &[StageKind])] = &[
        ("a.tar.br", &[K::FileReader, K::BrotliDecoder, K::Unpacker]),
        ("a.tar.gz", &[K::FileReader, K::GzipDecoder, K::Unpacker]),
        ("a.tgz", &[K::FileReader, K::GzipDecoder, K::Unpacker]),
        ("a.tbr", &[K::FileReader, K::BrotliDecoder, K::Unpacker]),
        ("a.tar", &[K::FileReader, K::Unpacker]),
        ("a.br", &[K::FileReader, K::BrotliDecoder, K::FileWriter]),
        ("a.gz", &[K::FileReader, K::GzipDecoder, K::FileWriter]),
        ("a.txt", &[K::FileReader, K::FileWriter]),
    ];

    for (name, expected) in cases {
        let input = touch(work.path(), name)?;
        let plan = coord.plan_inflate(&input)?;
        assert!(!plan.cached, "{name}");
        assert_eq!(plan.stages, *expected, "{name}");
    }
    Ok(())
}

#[test]
fn test_deflate_naming() -> Result<()> {
    let work = TempDir::new()?;
    let scratch = TempDir::new()?;
    let project = work.path().join("project");
    fs::create_dir(&project)?;
    let notes = touch(work.path(), "notes.txt")?;
    let coord = Coordinator::new(PipelineSettings::default().with_scratch_dir(scratch.path()));

    let name = |path: &Path| path.file_name().unwrap().to_string_lossy().into_owned();

    let plan = coord.plan_deflate(&project, Flavor::Library)?;
    assert!(name(&plan.output).starts_with("project"));
    assert!(name(&plan.output).ends_with(".tar.gz"));

    let plan = coord.plan_deflate(&notes, Flavor::Library)?;
    assert!(name(&plan.output).starts_with("notes.txt"));
    assert!(name(&plan.output).ends_with(".gz"));

    if coord.capabilities().brotli.is_some() {
        let plan = coord.plan_deflate(&project, Flavor::Cli)?;
        assert_eq!(plan.output, work.path().join("project.tar.br"));
        let plan = coord.plan_deflate(&notes, Flavor::Cli)?;
        assert_eq!(plan.output, work.path().join("notes.txt.br"));
    }
    Ok(())
}

#[test]
fn test_brotli_input_without_brotli_is_unavailable() -> Result<()> {
    let work = TempDir::new()?;
    let scratch = TempDir::new()?;
    let input = touch(work.path(), "a.tar.br")?;
    let settings = PipelineSettings::default().with_scratch_dir(scratch.path());
    let coord = Coordinator::with_capabilities(settings, Capabilities::gzip_only());

    let err = coord.inflate(&input).unwrap_err();
    assert!(matches!(err, LambdaError::CodecUnavailable { .. }), "{err:?}");
    assert!(!scratch.path().join("a").exists());
    Ok(())
}

const TICKER: StageKind = StageKind::Custom {
    name: "ticker",
    role: StageRole::Source,
};

/// Emits `good` bytes and then fails.
struct FailingSource {
    good: usize,
}

impl Stage for FailingSource {
    fn kind(&self) -> StageKind {
        TICKER
    }

    fn chunk_size(&self) -> usize {
        1024
    }

    fn run(self: Box<Self>, io: &mut StageIo) -> io::Result<()> {
        let writer = io.writer()?;
        writer.write_all(&vec![b'x'; self.good])?;
        writer.flush()?;
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "source went away"))
    }
}

/// A sink that would happily report success on whatever it got.
struct Lenient;

impl Stage for Lenient {
    fn kind(&self) -> StageKind {
        StageKind::Custom {
            name: "lenient",
            role: StageRole::Sink,
        }
    }

    fn run(self: Box<Self>, io: &mut StageIo) -> io::Result<()> {
        let reader = io.reader()?;
        while let Ok(chunk) = reader.fill_buf() {
            if chunk.is_empty() {
                break;
            }
            let n = chunk.len();
            reader.consume(n);
        }
        Ok(())
    }
}

#[test]
fn test_source_error_is_the_settled_failure() -> Result<()> {
    let err = Pipeline::new()
        .stage(FailingSource { good: 10_000 })
        .stage(Lenient)
        .run()
        .unwrap_err();

    assert_eq!(err.failed_stage(), Some(TICKER));
    assert_eq!(err.io_error().map(io::Error::kind), Some(io::ErrorKind::ConnectionReset));
    Ok(())
}

#[test]
fn test_sink_error_is_the_settled_failure() -> Result<()> {
    let work = TempDir::new()?;
    let input = work.path().join("in");
    fs::write(&input, vec![1u8; 64 * 1024])?;

    let err = Pipeline::new()
        .stage(FileReader::new(&input, 1024))
        .stage(FileWriter::new(work.path().join("no/such/dir/out"), 0o644))
        .run()
        .unwrap_err();

    assert_eq!(err.failed_stage(), Some(StageKind::FileWriter));
    assert_eq!(err.io_error().map(io::Error::kind), Some(io::ErrorKind::NotFound));
    Ok(())
}
