use std::io::{Cursor, Read, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{DecodeError, DecodeResult};

/// Scale of the 16-bit fixed-point "half" encoding (2^-14). This is not an IEEE half.
pub const HALF_SCALE: f32 = 1.0 / 16384.0;

pub fn half_to_f32(raw: u16) -> f32 {
    f32::from(raw) * HALF_SCALE
}

pub fn weight_from_byte(raw: u8) -> f32 {
    f32::from(raw) / 255.0
}

/// Little-endian reader over an in-memory container.
///
/// Every read checks the remaining length up front and fails with
/// [`DecodeError::Truncated`] instead of consuming a partial value.
#[derive(Debug, Clone)]
pub struct BinCursor<'a> {
    cur: Cursor<&'a [u8]>,
}

impl<'a> BinCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> BinCursor<'a> {
        BinCursor {
            cur: Cursor::new(bytes),
        }
    }

    /// Creates a second cursor over the same buffer, positioned at `offset`.
    pub fn at(bytes: &'a [u8], offset: u64) -> DecodeResult<BinCursor<'a>> {
        let mut cursor = BinCursor::new(bytes);
        cursor.seek(SeekFrom::Start(offset))?;
        Ok(cursor)
    }

    pub fn tell(&self) -> u64 {
        self.cur.position()
    }

    pub fn size(&self) -> u64 {
        self.cur.get_ref().len() as u64
    }

    pub fn remaining(&self) -> u64 {
        self.size().saturating_sub(self.tell())
    }

    pub fn is_at_end(&self) -> bool {
        self.tell() == self.size()
    }

    /// Moves the cursor, refusing to land outside `0..=size`.
    pub fn seek(&mut self, pos: SeekFrom) -> DecodeResult<u64> {
        let size = self.size();

        let target: i64 = match pos {
            SeekFrom::Start(offset) => i64::try_from(offset).unwrap_or(i64::MAX),
            SeekFrom::Current(delta) => (self.tell() as i64).saturating_add(delta),
            SeekFrom::End(delta) => (size as i64).saturating_add(delta),
        };

        if target < 0 || target as u64 > size {
            return Err(DecodeError::SeekOutOfBounds { target, size });
        }

        self.cur.set_position(target as u64);

        Ok(target as u64)
    }

    pub fn skip(&mut self, len: usize) -> DecodeResult<()> {
        self.ensure(len)?;
        self.cur.set_position(self.tell() + len as u64);
        Ok(())
    }

    fn ensure(&self, wanted: usize) -> DecodeResult<()> {
        if (wanted as u64) > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.tell(),
                wanted: wanted as u64,
                size: self.size(),
            });
        }

        Ok(())
    }

    pub fn i32(&mut self) -> DecodeResult<i32> {
        self.ensure(4)?;
        Ok(self.cur.read_i32::<LittleEndian>()?)
    }

    pub fn i32s(&mut self, count: usize) -> DecodeResult<Vec<i32>> {
        self.ensure(count.saturating_mul(4))?;
        let mut values = vec![0; count];
        self.cur.read_i32_into::<LittleEndian>(&mut values)?;
        Ok(values)
    }

    /// Reads a fixed block of `N` int32 fields, the shape most section headers take.
    pub fn i32_array<const N: usize>(&mut self) -> DecodeResult<[i32; N]> {
        self.ensure(N * 4)?;
        let mut values = [0; N];
        self.cur.read_i32_into::<LittleEndian>(&mut values)?;
        Ok(values)
    }

    pub fn u16(&mut self) -> DecodeResult<u16> {
        self.ensure(2)?;
        Ok(self.cur.read_u16::<LittleEndian>()?)
    }

    pub fn u16s(&mut self, count: usize) -> DecodeResult<Vec<u16>> {
        self.ensure(count.saturating_mul(2))?;
        let mut values = vec![0; count];
        self.cur.read_u16_into::<LittleEndian>(&mut values)?;
        Ok(values)
    }

    pub fn half(&mut self) -> DecodeResult<f32> {
        Ok(half_to_f32(self.u16()?))
    }

    pub fn halfs<const N: usize>(&mut self) -> DecodeResult<[f32; N]> {
        let mut values = [0.0; N];
        for value in values.iter_mut() {
            *value = self.half()?;
        }
        Ok(values)
    }

    pub fn f32s<const N: usize>(&mut self) -> DecodeResult<[f32; N]> {
        self.ensure(N * 4)?;
        let mut values = [0.0; N];
        self.cur.read_f32_into::<LittleEndian>(&mut values)?;
        Ok(values)
    }

    pub fn u8s<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        self.ensure(N)?;
        let mut values = [0; N];
        self.cur.read_exact(&mut values)?;
        Ok(values)
    }

    /// Reads a `len`-byte, null-padded ASCII field.
    ///
    /// The cursor always ends up `len` bytes further on, wherever the terminator was.
    pub fn fixed_string(&mut self, len: usize) -> DecodeResult<String> {
        self.ensure(len)?;

        let start = self.tell() as usize;
        let bytes = &self.cur.get_ref()[start..start + len];

        let text = bytes
            .iter()
            .take_while(|&&b| b != 0)
            .filter(|b| b.is_ascii())
            .map(|&b| b as char)
            .collect();

        self.cur.set_position((start + len) as u64);

        Ok(text)
    }
}
