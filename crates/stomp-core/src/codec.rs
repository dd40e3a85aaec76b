//! Incremental frame codec.
//!
//! Frames travel as text terminated by a single NUL byte. [`FrameCodec`]
//! accumulates bytes until it sees the terminator, then yields the collected
//! text and starts over. The buffer grows by doubling and is unbounded unless
//! a limit is configured with [`FrameCodec::with_max_frame_size`].
//!
//! The same state backs two entry points: [`FrameCodec::decode_byte`] for
//! byte-at-a-time feeding, and the [`Decoder`] impl used by
//! `tokio_util::codec::FramedRead` in the transport.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::errors::CodecError;

/// Byte that ends every frame on the wire.
pub const FRAME_TERMINATOR: u8 = 0;

/// Starting capacity of the reassembly buffer.
const INITIAL_CAPACITY: usize = 1024;

/// Per-connection frame reassembler. Strictly sequential.
#[derive(Debug)]
pub struct FrameCodec {
    buffer: Vec<u8>,
    max_frame_size: Option<usize>,
}

impl FrameCodec {
    /// Create an unbounded codec.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(INITIAL_CAPACITY),
            max_frame_size: None,
        }
    }

    /// Create a codec that rejects frames longer than `limit` bytes.
    pub fn with_max_frame_size(limit: usize) -> Self {
        Self {
            max_frame_size: Some(limit),
            ..Self::new()
        }
    }

    /// Configured frame size limit, if any.
    pub fn max_frame_size(&self) -> Option<usize> {
        self.max_frame_size
    }

    /// Number of bytes buffered for the frame in progress.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one byte. Returns the completed frame text when `byte` is the
    /// terminator, `None` otherwise.
    pub fn decode_byte(&mut self, byte: u8) -> Result<Option<String>, CodecError> {
        if byte == FRAME_TERMINATOR {
            return Ok(Some(self.take_frame()));
        }
        self.ensure_room(1)?;
        if self.buffer.len() == self.buffer.capacity() {
            self.buffer.reserve(self.buffer.capacity().max(INITIAL_CAPACITY));
        }
        self.buffer.push(byte);
        Ok(None)
    }

    /// Encode a frame text for the wire: the text followed by one NUL.
    pub fn encode(frame: &str) -> Bytes {
        let mut out = BytesMut::with_capacity(frame.len() + 1);
        out.extend_from_slice(frame.as_bytes());
        out.extend_from_slice(&[FRAME_TERMINATOR]);
        out.freeze()
    }

    fn ensure_room(&mut self, additional: usize) -> Result<(), CodecError> {
        if let Some(limit) = self.max_frame_size {
            if self.buffer.len() + additional > limit {
                self.buffer.clear();
                return Err(CodecError::FrameTooLarge { limit });
            }
        }
        Ok(())
    }

    fn take_frame(&mut self) -> String {
        let frame = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        frame
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, CodecError> {
        if src.is_empty() {
            return Ok(None);
        }
        let terminator = src.iter().position(|b| *b == FRAME_TERMINATOR);
        let take = terminator.unwrap_or(src.len());
        self.ensure_room(take)?;
        self.buffer.extend_from_slice(&src[..take]);

        if terminator.is_some() {
            src.advance(take + 1);
            Ok(Some(self.take_frame()))
        } else {
            src.advance(take);
            Ok(None)
        }
    }
}
