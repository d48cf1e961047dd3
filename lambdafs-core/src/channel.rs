//! Bounded byte channels linking adjacent stages.
//!
//! A stream is only complete once [`Frame::End`] arrives. A channel whose
//! sender disappears without sending it reads as an error, so no stage can
//! finish normally on a truncated stream.

use std::fmt;
use std::io::{self, BufRead, Read, Write};
use std::mem;

use flume::{Receiver, Sender};

use crate::stage::StageEvents;

pub(crate) enum Frame {
    Chunk(Vec<u8>),
    End,
}

/// Create a linked writer/reader pair holding at most `depth` chunks in flight.
pub(crate) fn channel(depth: usize, chunk_size: usize, events: StageEvents) -> (ChannelWriter, ChannelReader) {
    let (tx, rx) = flume::bounded(depth.max(1));
    (ChannelWriter::new(tx, chunk_size, events), ChannelReader::new(rx))
}

fn upstream_aborted() -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "upstream stage stopped before finishing its stream",
    )
}

fn downstream_closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "downstream stage is no longer reading")
}

/// Input side of a stage.
pub struct ChannelReader {
    rx: Receiver<Frame>,
    chunk: Vec<u8>,
    pos: usize,
    ended: bool,
}

impl ChannelReader {
    fn new(rx: Receiver<Frame>) -> Self {
        Self {
            rx,
            chunk: Vec::new(),
            pos: 0,
            ended: false,
        }
    }

    /// Whether the upstream's end marker has been received.
    pub fn is_ended(&self) -> bool {
        self.ended && self.pos == self.chunk.len()
    }

    /// Discard everything up to the end marker.
    pub fn drain(&mut self) -> io::Result<u64> {
        io::copy(self, &mut io::sink())
    }
}

impl fmt::Debug for ChannelReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelReader")
            .field("buffered", &(self.chunk.len() - self.pos))
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}

impl BufRead for ChannelReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.pos == self.chunk.len() && !self.ended {
            match self.rx.recv() {
                Ok(Frame::Chunk(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Ok(Frame::End) => self.ended = true,
                Err(_) => return Err(upstream_aborted()),
            }
        }
        Ok(&self.chunk[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.chunk.len());
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

/// Output side of a stage. Bytes are batched into chunks of `chunk_size`
/// before they are handed downstream.
pub struct ChannelWriter {
    tx: Sender<Frame>,
    pending: Vec<u8>,
    chunk_size: usize,
    events: StageEvents,
    finished: bool,
}

impl ChannelWriter {
    fn new(tx: Sender<Frame>, chunk_size: usize, events: StageEvents) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            tx,
            pending: Vec::with_capacity(chunk_size),
            chunk_size,
            events,
            finished: false,
        }
    }

    fn send_pending(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = mem::replace(&mut self.pending, Vec::with_capacity(self.chunk_size));
        let len = chunk.len() as u64;
        self.tx.send(Frame::Chunk(chunk)).map_err(|_| downstream_closed())?;
        self.events.data(len);
        Ok(())
    }

    /// Flush buffered bytes and send the end marker.
    pub(crate) fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.send_pending()?;
        self.tx.send(Frame::End).map_err(|_| downstream_closed())?;
        self.finished = true;
        Ok(())
    }
}

impl fmt::Debug for ChannelWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelWriter")
            .field("pending", &self.pending.len())
            .field("chunk_size", &self.chunk_size)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream already finished"));
        }
        let room = self.chunk_size - self.pending.len();
        let n = room.min(buf.len());
        self.pending.extend_from_slice(&buf[..n]);
        if self.pending.len() >= self.chunk_size {
            self.send_pending()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_pending()
    }
}
