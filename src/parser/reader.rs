//! Byte cursor and LEB128 / little-endian float decoding.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io;

use super::DecodeError;

pub struct Reader {
    bytes: Vec<u8>,
    pos: usize,
}

impl Reader {
    pub fn new(bytes: Vec<u8>) -> Reader {
        Reader { bytes, pos: 0 }
    }
}

impl Reader {
    // Basic operations --------------------------------------------------------
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        self.next().ok_or(DecodeError::UnexpectedEof)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::UnexpectedEof)?;
        if end > self.bytes.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        let vec = self.bytes[self.pos..end].to_vec();
        self.pos = end;
        Ok(vec)
    }

    /// Split off the next `len` bytes as an independent reader.
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader, DecodeError> {
        Ok(Reader::new(self.read_bytes(len)?))
    }

    // Read and interpret types ------------------------------------------------

    // le
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        io::Cursor::new(bytes)
            .read_u32::<LittleEndian>()
            .map_err(|_| DecodeError::UnexpectedEof)
    }

    pub fn read_vu64(&mut self) -> Result<u64, DecodeError> {
        decode_unsigned(&mut || self.read_byte(), 64)
    }

    pub fn read_vu32(&mut self) -> Result<u32, DecodeError> {
        read_vu32(&mut || self.read_byte())
    }

    pub fn read_vs64(&mut self) -> Result<i64, DecodeError> {
        decode_signed(&mut || self.read_byte(), 64)
    }

    pub fn read_vs32(&mut self) -> Result<i32, DecodeError> {
        read_vs32(&mut || self.read_byte())
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        read_f32(&mut || self.read_byte())
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        read_f64(&mut || self.read_byte())
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_u8vec()?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }

    pub fn read_u8vec(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_vu32()?;
        self.read_bytes(len as usize)
    }
}

impl Iterator for Reader {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos < self.bytes.len() {
            let byte = self.bytes[self.pos];
            self.pos += 1;
            Some(byte)
        } else {
            None
        }
    }
}

/// Decode one unsigned LEB128 varint of at most `bits` significant bits.
pub fn decode_unsigned<F>(next: &mut F, bits: u32) -> Result<u64, DecodeError>
where
    F: FnMut() -> Result<u8, DecodeError>,
{
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        let byte = next()?;
        if shift >= bits {
            return Err(DecodeError::IntegerOverflow);
        }
        // the last group may only carry the bits still left below `bits`
        if bits - shift < 7 && u64::from(byte & 0x7f) >> (bits - shift) != 0 {
            return Err(DecodeError::IntegerOverflow);
        }
        result |= u64::from(byte & 0x7f) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
}

/// Decode one signed LEB128 varint, sign-extending from bit 0x40 of the last byte.
pub fn decode_signed<F>(next: &mut F, bits: u32) -> Result<i64, DecodeError>
where
    F: FnMut() -> Result<u8, DecodeError>,
{
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let byte = next()?;
        if shift >= bits {
            return Err(DecodeError::IntegerOverflow);
        }
        result |= i64::from(byte & 0x7f) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            if shift < 64 && byte & 0x40 != 0 {
                result |= -1i64 << shift;
            }
            return Ok(result);
        }
    }
}

pub fn read_vu32<F>(next: &mut F) -> Result<u32, DecodeError>
where
    F: FnMut() -> Result<u8, DecodeError>,
{
    let value = decode_unsigned(next, 32)?;
    u32::try_from(value).map_err(|_| DecodeError::IntegerOverflow)
}

pub fn read_vs32<F>(next: &mut F) -> Result<i32, DecodeError>
where
    F: FnMut() -> Result<u8, DecodeError>,
{
    let value = decode_signed(next, 32)?;
    i32::try_from(value).map_err(|_| DecodeError::IntegerOverflow)
}

pub fn read_f32<F>(next: &mut F) -> Result<f32, DecodeError>
where
    F: FnMut() -> Result<u8, DecodeError>,
{
    let mut buf = [0u8; 4];
    for byte in buf.iter_mut() {
        *byte = next()?;
    }
    // from_bits keeps NaN payloads intact
    let bits = io::Cursor::new(buf)
        .read_u32::<LittleEndian>()
        .map_err(|_| DecodeError::UnexpectedEof)?;
    Ok(f32::from_bits(bits))
}

pub fn read_f64<F>(next: &mut F) -> Result<f64, DecodeError>
where
    F: FnMut() -> Result<u8, DecodeError>,
{
    let mut buf = [0u8; 8];
    for byte in buf.iter_mut() {
        *byte = next()?;
    }
    let bits = io::Cursor::new(buf)
        .read_u64::<LittleEndian>()
        .map_err(|_| DecodeError::UnexpectedEof)?;
    Ok(f64::from_bits(bits))
}
