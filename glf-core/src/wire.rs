//! Little-endian cursor helpers shared by the record codecs.
//!
//! Fixed-layout structs go through `bincode` (fixed-width integers, little
//! endian, no padding), everything variable-length is written field by field.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DecodeError, EncodeError};

pub(crate) struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a fixed-layout struct
    pub fn put_fixed<T: Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        bincode::serialize_into(&mut self.buf, value)?;
        Ok(())
    }

    /// Write `(len: u32, bytes)`
    pub fn put_len_prefixed(&mut self, field: &'static str, bytes: &[u8]) -> Result<(), EncodeError> {
        self.put_u32(checked_u32(field, bytes.len())?);
        self.put_bytes(bytes);
        Ok(())
    }

    /// Overwrite a u32 previously written at `offset`
    pub fn patch_u32(&mut self, offset: usize, v: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

pub(crate) fn checked_u32(field: &'static str, len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::TooLarge {
        field,
        len,
        max: u32::MAX as usize,
    })
}

pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::Truncated {
                expected: n,
                actual: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn bool(&mut self) -> Result<bool, DecodeError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::Malformed(format!(
                "invalid boolean value {other}"
            ))),
        }
    }

    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub fn f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    /// Read a fixed-layout struct of `size` bytes
    pub fn fixed<T: DeserializeOwned>(&mut self, size: usize) -> Result<T, DecodeError> {
        let bytes = self.take(size)?;
        Ok(bincode::deserialize(bytes)?)
    }

    /// Read `(len: u32, bytes)`
    pub fn len_prefixed(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    /// Read `count` little-endian f64 values, checking the byte budget first
    pub fn f64_array(&mut self, count: usize) -> Result<Vec<f64>, DecodeError> {
        let bytes = self.take(sized(count, 8)?)?;
        Ok(bytes
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect())
    }

    /// Read `count` little-endian i16 values, checking the byte budget first
    pub fn i16_array(&mut self, count: usize) -> Result<Vec<i16>, DecodeError> {
        let bytes = self.take(sized(count, 2)?)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    /// All bytes must have been consumed
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::Malformed(format!("{n} trailing bytes after record body"))),
        }
    }
}

fn sized(count: usize, element: usize) -> Result<usize, DecodeError> {
    count
        .checked_mul(element)
        .ok_or_else(|| DecodeError::Malformed(format!("element count {count} overflows")))
}
