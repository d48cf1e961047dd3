//! Plain file endpoints: the chunked reader every non-archived operation
//! starts from and the writer most of them end in.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

use crate::stage::{Stage, StageIo, StageKind};

/// Source stage: streams one file in fixed-size chunks.
#[derive(Debug)]
pub struct FileReader {
    path: PathBuf,
    chunk_size: usize,
}

impl FileReader {
    pub fn new(path: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            path: path.into(),
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Stage for FileReader {
    fn kind(&self) -> StageKind {
        StageKind::FileReader
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn run(self: Box<Self>, io: &mut StageIo) -> io::Result<()> {
        let writer = io.writer()?;
        let mut file = File::open(&self.path)?;
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let n = match file.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            writer.write_all(&buf[..n])?;
        }
    }
}

/// Sink stage: writes its input to a file created with `mode` (unix).
#[derive(Debug)]
pub struct FileWriter {
    path: PathBuf,
    mode: u32,
}

impl FileWriter {
    pub fn new(path: impl Into<PathBuf>, mode: u32) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    fn open(&self) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(self.mode);
        }
        options.open(&self.path)
    }
}

impl Stage for FileWriter {
    fn kind(&self) -> StageKind {
        StageKind::FileWriter
    }

    fn run(self: Box<Self>, io: &mut StageIo) -> io::Result<()> {
        let events = io.events().clone();
        let reader = io.reader()?;
        let mut file = self.open()?;

        loop {
            let chunk = reader.fill_buf()?;
            if chunk.is_empty() {
                break;
            }
            file.write_all(chunk)?;
            let n = chunk.len();
            reader.consume(n);
            events.data(n as u64);
        }

        // Completion is only reported once the data is on disk and the
        // handle is closed.
        file.sync_all()?;
        drop(file);
        Ok(())
    }
}
