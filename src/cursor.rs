use crate::error::{Result, WavError};

/// Bounded little-endian view over a byte slice with an explicit read
/// position. Nested chunks are parsed through sub-cursors handed out by
/// [`ChunkCursor::slice_bounded`], so a malformed inner chunk can never
/// read past its declared extent.
#[derive(Debug)]
pub struct ChunkCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ChunkCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes left before this cursor's own bound.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(WavError::InvalidContainer(format!(
                "read of {} bytes past chunk bound ({} remaining)",
                len,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Reads `len` bytes and decodes them as ASCII text.
    pub fn read_fixed_text(&mut self, len: usize) -> Result<String> {
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Advances the position by `len` bytes without reading them.
    pub fn seek_forward(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    /// Hands out a sub-cursor over the next `len` bytes without copying,
    /// advancing this cursor past them.
    pub fn slice_bounded(&mut self, len: usize) -> Result<ChunkCursor<'a>> {
        Ok(ChunkCursor::new(self.take(len)?))
    }
}

// ================================== TESTS ==================================
