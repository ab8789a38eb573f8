//! # Lazy byte-stream reading.
//!
//! [`ByteStream`] reads a source in fixed-size chunks, yielding to the
//! scheduler between chunks so a large file does not monopolize the thread.
//! The stream is finite: `next_chunk` returns `None` once the source is
//! drained.

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;

use crate::error::TaskError;
use crate::signal::yield_now;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Sequential chunk reader over any [`Read`] source.
#[derive(Debug)]
pub struct ByteStream<R> {
    source: R,
    chunk_size: usize,
    finished: bool,
}

impl ByteStream<File> {
    /// Opens a file as a chunked byte stream.
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?, chunk_size))
    }
}

impl<R: Read> ByteStream<R> {
    /// Wraps a reader. A zero `chunk_size` falls back to 64 KiB.
    pub fn new(source: R, chunk_size: usize) -> Self {
        ByteStream {
            source,
            chunk_size: if chunk_size == 0 {
                DEFAULT_CHUNK_SIZE
            } else {
                chunk_size
            },
            finished: false,
        }
    }

    /// Reads the next chunk, yielding once before touching the source.
    ///
    /// Returns `None` at end of stream. A `WouldBlock` from a non-blocking
    /// source is handled with a cooperative wait, not a thread block.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TaskError> {
        if self.finished {
            return Ok(None);
        }
        yield_now().await;

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => yield_now().await,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        if filled == 0 {
            self.finished = true;
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }

    /// Drains the stream, collecting every chunk.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>, TaskError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_are_sequential_and_finite() {
        let data: Vec<u8> = (0..=255).collect();
        let handle = crate::watch(async move {
            let mut stream = ByteStream::new(&data[..], 100);
            let mut chunks = Vec::new();
            while let Some(chunk) = stream.next_chunk().await? {
                chunks.push(chunk);
            }
            Ok(chunks)
        });

        let chunks = handle.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[2].len(), 56);
        assert_eq!(chunks[0][0], 0);
        assert_eq!(chunks[2][55], 255);
    }

    #[test]
    fn read_to_end_round_trips() {
        let data = b"cooperative".to_vec();
        let expect = data.clone();
        let handle = crate::watch(async move {
            let mut stream = ByteStream::new(&data[..], 4);
            stream.read_to_end().await
        });
        assert_eq!(handle.unwrap(), expect);
    }
}
