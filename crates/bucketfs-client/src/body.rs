//! Seekable request bodies streamed in bounded chunks.

use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

use bytes::Bytes;
use sha2::{Digest, Sha256};

/// Largest slice of the content handed to the transport per read.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// A readable, rewindable content source.
pub trait ContentSource: Read + Seek + Send {}

impl<T: Read + Seek + Send> ContentSource for T {}

/// Owned content source passed into uploads.
pub type ContentStream = Box<dyn ContentSource>;

/// Request body with a known length.
///
/// The source is rewound before every full pass over it (hashing, sending), so
/// a caller may hand over a stream that has already been read.
pub struct RequestBody {
    source: ContentStream,
    length: u64,
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBody")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

impl RequestBody {
    /// Wrap a seekable stream. Its length is taken from its end position.
    pub fn new(mut source: ContentStream) -> io::Result<Self> {
        let length = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;
        Ok(Self { source, length })
    }

    /// Wrap an in-memory buffer.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes: Bytes = bytes.into();
        let length = bytes.len() as u64;
        Self {
            source: Box::new(Cursor::new(bytes)),
            length,
        }
    }

    /// Content length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Whether the body has no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Hex SHA-256 of the whole content, read chunk by chunk.
    pub fn sha256_hex(&mut self) -> io::Result<String> {
        self.source.seek(SeekFrom::Start(0))?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = self.source.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        self.source.seek(SeekFrom::Start(0))?;
        Ok(hex::encode(hasher.finalize()))
    }

    /// Rewind and turn the body into a reader that yields at most
    /// [`CHUNK_SIZE`] bytes per read and stops after `len()` bytes.
    pub fn into_reader(mut self) -> io::Result<ChunkedReader> {
        self.source.seek(SeekFrom::Start(0))?;
        Ok(ChunkedReader {
            source: self.source,
            remaining: self.length,
        })
    }

    /// Read the whole content into memory.
    pub fn into_bytes(self) -> io::Result<Bytes> {
        let mut reader = self.into_reader()?;
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        Ok(Bytes::from(out))
    }
}

/// Reader over a [`RequestBody`] that never hands out more than [`CHUNK_SIZE`]
/// bytes at once.
pub struct ChunkedReader {
    source: ContentStream,
    remaining: u64,
}

impl fmt::Debug for ChunkedReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedReader")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let limit = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(CHUNK_SIZE)
            .min(buf.len());
        let n = self.source.read(&mut buf[..limit])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}
