//! Length-Prefixed Frames
//!
//! Supervisor and worker exchange rkyv archives over plain pipes. Every
//! archive is preceded by its length so the reader knows where one message
//! ends and the next begins.

use rkyv::ser::serializers::AllocSerializer;
use rkyv::validation::validators::DefaultValidator;
use rkyv::{Archive, CheckBytes, Deserialize, Infallible, Serialize};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use thiserror::Error;

/// Upper bound on a single frame payload (8 MB).
///
/// A measurement window of 1 s at sub-microsecond latency stays far below
/// this once samples are batched.
pub const MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;

/// Size of the little-endian length header.
const HEADER_LEN: usize = 4;

/// Errors raised while encoding or decoding frames
#[derive(Debug, Error)]
pub enum FrameError {
    /// Reading or writing the pipe failed
    #[error("pipe I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// rkyv could not serialize the message
    #[error("failed to encode message: {0}")]
    Encode(String),

    /// The frame is not a valid archive of the expected type
    #[error("failed to decode message: {0}")]
    Decode(String),

    /// Length header above [`MAX_FRAME_SIZE`]
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    Oversized {
        /// Announced or encoded length
        size: usize,
        /// [`MAX_FRAME_SIZE`]
        max: usize,
    },

    /// Length header of zero
    #[error("received an empty frame")]
    Empty,

    /// End of stream before a length header
    #[error("peer closed the pipe")]
    Closed,
}

/// Encode `message` and write it as one frame.
///
/// ```text
/// +-----------------+------------------+
/// | u32 length (LE) | rkyv archive     |
/// +-----------------+------------------+
/// ```
pub fn write_frame<W, T>(writer: &mut BufWriter<W>, message: &T) -> Result<(), FrameError>
where
    W: Write,
    T: Serialize<AllocSerializer<256>>,
{
    let payload =
        rkyv::to_bytes::<_, 256>(message).map_err(|e| FrameError::Encode(e.to_string()))?;

    if payload.len() > MAX_FRAME_SIZE {
        return Err(FrameError::Oversized {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(&payload)?;
    // The peer blocks on this frame; never leave it sitting in our buffer.
    writer.flush()?;
    Ok(())
}

/// Read one frame and decode it into `T`.
///
/// A clean end of stream before the header yields [`FrameError::Closed`].
pub fn read_frame<R, T>(reader: &mut BufReader<R>) -> Result<T, FrameError>
where
    R: Read,
    T: Archive,
    T::Archived: for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<T, Infallible>,
{
    let mut header = [0u8; HEADER_LEN];
    if let Err(e) = reader.read_exact(&mut header) {
        return Err(match e.kind() {
            ErrorKind::UnexpectedEof => FrameError::Closed,
            _ => FrameError::Io(e),
        });
    }

    let len = u32::from_le_bytes(header) as usize;
    if len == 0 {
        return Err(FrameError::Empty);
    }
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::Oversized {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    // rkyv needs an aligned buffer to validate the archive in place
    let mut buf = rkyv::AlignedVec::with_capacity(len);
    buf.resize(len, 0);
    reader.read_exact(&mut buf)?;

    let archived =
        rkyv::check_archived_root::<T>(&buf).map_err(|e| FrameError::Decode(e.to_string()))?;
    archived
        .deserialize(&mut Infallible)
        .map_err(|_: std::convert::Infallible| FrameError::Decode("unreachable".to_string()))
}

/// Sending half of a frame channel
pub struct FrameWriter<W: Write> {
    inner: BufWriter<W>,
}

impl<W: Write> FrameWriter<W> {
    /// Wrap a raw writer (pipe, stdout, buffer).
    pub fn new(writer: W) -> Self {
        Self {
            inner: BufWriter::with_capacity(64 * 1024, writer),
        }
    }

    /// Send one message.
    pub fn send<T>(&mut self, message: &T) -> Result<(), FrameError>
    where
        T: Serialize<AllocSerializer<256>>,
    {
        write_frame(&mut self.inner, message)
    }
}

/// Receiving half of a frame channel
pub struct FrameReader<R: Read> {
    inner: BufReader<R>,
}

impl<R: Read> FrameReader<R> {
    /// Wrap a raw reader (pipe, stdin, cursor).
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::with_capacity(64 * 1024, reader),
        }
    }

    /// Block until the next message arrives.
    pub fn recv<T>(&mut self) -> Result<T, FrameError>
    where
        T: Archive,
        T::Archived: for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<T, Infallible>,
    {
        read_frame(&mut self.inner)
    }
}
