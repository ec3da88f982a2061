/* Copyright 2015 Google Inc. All Rights Reserved.

   Distributed under MIT license.
   See file LICENSE for detail or copy at https://opensource.org/licenses/MIT
*/

//! Readers for the WOFF2 variable-length integer types: 255UInt16 and
//! UIntBase128.

use bytes::Buf;

use crate::error::DecodeError;

const WORD_CODE: u8 = 253;
const ONE_MORE_BYTE_CODE_2: u8 = 254;
const ONE_MORE_BYTE_CODE_1: u8 = 255;
const LOWEST_U_CODE: u16 = 253;

/// Fallible reads of the WOFF2 variable-length integers from any [`Buf`].
pub trait BufVariableExt {
    /// Read a 255UInt16: one byte, with 253/254/255 escaping into one or two
    /// extra bytes.
    fn try_get_255_u16(&mut self) -> Result<u16, DecodeError>;

    /// Read a UIntBase128: up to 5 bytes of 7 value bits each, high bit set
    /// on all but the final byte.
    fn try_get_base128_u32(&mut self) -> Result<u32, DecodeError>;

    /// Transfer the next `n` bytes into the end of `buf`.
    fn try_read_bytes_into(&mut self, n: usize, buf: &mut Vec<u8>) -> Result<(), DecodeError>;
}

impl<T: Buf> BufVariableExt for T {
    fn try_get_255_u16(&mut self) -> Result<u16, DecodeError> {
        let code = self.try_get_u8()?;
        match code {
            WORD_CODE => Ok(self.try_get_u16()?),
            ONE_MORE_BYTE_CODE_1 => Ok(self.try_get_u8()? as u16 + LOWEST_U_CODE),
            ONE_MORE_BYTE_CODE_2 => Ok(self.try_get_u8()? as u16 + LOWEST_U_CODE * 2),
            _ => Ok(code as u16),
        }
    }

    fn try_get_base128_u32(&mut self) -> Result<u32, DecodeError> {
        let mut accumulator: u32 = 0;
        for i in 0..5 {
            let code = self.try_get_u8()?;

            // Leading zeros are invalid.
            if i == 0 && code == 0x80 {
                return Err(DecodeError::MalformedVarInt);
            }
            // If any of the top seven bits are set then we're about to overflow.
            if accumulator & 0xFE00_0000 != 0 {
                return Err(DecodeError::MalformedVarInt);
            }

            accumulator = (accumulator << 7) | (code & 0x7F) as u32;
            if code & 0x80 == 0 {
                return Ok(accumulator);
            }
        }
        Err(DecodeError::MalformedVarInt)
    }

    fn try_read_bytes_into(&mut self, n: usize, buf: &mut Vec<u8>) -> Result<(), DecodeError> {
        let orig_len = buf.len();
        buf.resize(orig_len + n, 0);
        self.try_copy_to_slice(&mut buf[orig_len..])?;
        Ok(())
    }
}
