//! Byte stream primitives: LEB128 varints, zigzag signed varints and raw spans.
//!
//! [`CodedOutput`] appends to a growable buffer and never fails;
//! [`CodedInput`] reads from a borrowed slice and reports truncation as
//! [`IoError::UnexpectedEof`] and bad varints as [`ProtocolError::MalformedVarint`].

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{IoError, ProtocolError, SerializationError};

/// Longest LEB128 encoding of a `u64`.
const MAX_VARINT_LEN: usize = 10;

#[inline]
const fn zigzag_encode_64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
const fn zigzag_decode_64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

#[inline]
const fn zigzag_encode_32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
const fn zigzag_decode_32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

// -----------------------------------------------------------------------------
// CodedOutput

/// Append-only output buffer.
///
/// # Examples
///
/// ```
/// use vc_codec::io::{CodedInput, CodedOutput};
///
/// let mut out = CodedOutput::new();
/// out.write_varint_i32(-3);
/// out.write_str("abc");
///
/// let bytes = out.into_bytes();
/// let mut input = CodedInput::new(&bytes);
/// assert_eq!(input.read_varint_i32().unwrap(), -3);
/// assert_eq!(input.read_string().unwrap(), "abc");
/// assert!(input.is_at_end());
/// ```
#[derive(Default, Debug, Clone)]
pub struct CodedOutput {
    buf: Vec<u8>,
}

impl CodedOutput {
    /// Creates an empty output buffer.
    #[inline]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates an empty output buffer with the given capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn write_u8(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Writes raw bytes without a length prefix.
    #[inline]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_varint_u64(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buf.push((value as u8) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
    }

    #[inline]
    pub fn write_varint_u32(&mut self, value: u32) {
        self.write_varint_u64(u64::from(value));
    }

    #[inline]
    pub fn write_varint_i64(&mut self, value: i64) {
        self.write_varint_u64(zigzag_encode_64(value));
    }

    #[inline]
    pub fn write_varint_i32(&mut self, value: i32) {
        self.write_varint_u32(zigzag_encode_32(value));
    }

    /// Writes a varint length followed by the bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_varint_u64(bytes.len() as u64);
        self.write_raw(bytes);
    }

    #[inline]
    pub fn write_str(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Copies the buffered bytes into `writer` and flushes it.
    #[cfg(feature = "std")]
    pub fn write_to<W: std::io::Write>(&self, mut writer: W) -> Result<(), IoError> {
        writer.write_all(&self.buf)?;
        writer.flush()?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// CodedInput

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct CodedInput<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> CodedInput<'a> {
    #[inline]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    #[inline]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub const fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn eof(&self, needed: usize) -> SerializationError {
        IoError::UnexpectedEof {
            needed,
            remaining: self.remaining(),
        }
        .into()
    }

    pub fn read_u8(&mut self) -> Result<u8, SerializationError> {
        match self.buf.get(self.pos) {
            Some(byte) => {
                self.pos += 1;
                Ok(*byte)
            }
            None => Err(self.eof(1)),
        }
    }

    /// Reads a single byte that must be `0` or `1`.
    pub fn read_bool(&mut self) -> Result<bool, SerializationError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::InvalidBool(other).into()),
        }
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8], SerializationError> {
        if len > self.remaining() {
            return Err(self.eof(len));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_varint_u64(&mut self) -> Result<u64, SerializationError> {
        let mut result: u64 = 0;
        for index in 0..MAX_VARINT_LEN {
            let byte = self.read_u8()?;
            // The tenth byte may only carry the single remaining bit.
            if index == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(ProtocolError::MalformedVarint.into());
            }
            result |= u64::from(byte & 0x7F) << (7 * index);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(ProtocolError::MalformedVarint.into())
    }

    pub fn read_varint_u32(&mut self) -> Result<u32, SerializationError> {
        let value = self.read_varint_u64()?;
        u32::try_from(value).map_err(|_| ProtocolError::MalformedVarint.into())
    }

    #[inline]
    pub fn read_varint_i64(&mut self) -> Result<i64, SerializationError> {
        self.read_varint_u64().map(zigzag_decode_64)
    }

    #[inline]
    pub fn read_varint_i32(&mut self) -> Result<i32, SerializationError> {
        self.read_varint_u32().map(zigzag_decode_32)
    }

    /// Reads a varint length followed by that many bytes.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], SerializationError> {
        let len = self.read_varint_u64()?;
        let len = usize::try_from(len).map_err(|_| ProtocolError::MalformedVarint)?;
        self.read_raw(len)
    }

    pub fn read_str(&mut self) -> Result<&'a str, SerializationError> {
        let bytes = self.read_bytes()?;
        core::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8.into())
    }

    #[inline]
    pub fn read_string(&mut self) -> Result<String, SerializationError> {
        self.read_str().map(String::from)
    }
}

// -----------------------------------------------------------------------------
// Tests
