use crate::error::DecodeError;

/// Single-bit reader over a byte slice, most significant bit first.
///
/// Only used to walk the bounding-box bitmap of the transformed 'glyf'
/// table, one bit per glyph.
pub(crate) struct BitReader<'a> {
    bytes: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> BitReader<'a> {
        BitReader { bytes, bit_pos: 0 }
    }

    pub fn read_bit(&mut self) -> Result<bool, DecodeError> {
        let byte = self
            .bytes
            .get(self.bit_pos >> 3)
            .ok_or(DecodeError::Truncated)?;
        let bit = (byte >> (7 - (self.bit_pos & 7))) & 1;
        self.bit_pos += 1;
        Ok(bit != 0)
    }
}
