use bytes::Buf;
use font_types::Tag;

use crate::error::DecodeError;

pub const WOFF2_SIGNATURE: u32 = 0x774F_4632; // 'wOF2'
pub const TTCF_FLAVOR: u32 = 0x7474_6366; // 'ttcf'

pub const WOFF2_HEADER_SIZE: usize = 48;

/// The fixed 48-byte WOFF2 header.
///
/// <https://www.w3.org/TR/WOFF2/#woff20Header>
#[derive(Debug, PartialEq)]
pub struct Woff2Header {
    /// The "sfnt version" of the wrapped font; echoed into the output.
    pub flavor: Tag,
    /// Total size of the WOFF2 file.
    pub length: u32,
    /// Number of entries in the table directory.
    pub num_tables: u16,
    /// Total size needed for the uncompressed font data. A hint only; the
    /// reconstructed 'glyf'/'loca' tables may make the real size differ.
    pub total_sfnt_size: u32,
    /// Length of the compressed data block.
    pub total_compressed_size: u32,
    /// Offset and length of the (compressed) extended metadata block.
    pub meta_offset: u32,
    pub meta_length: u32,
    /// Offset and length of the private data block.
    pub priv_offset: u32,
    pub priv_length: u32,
}

impl Woff2Header {
    /// Parse and validate the header. `input_len` is the length of the whole
    /// input region, used to check the header's own length field.
    pub fn parse(input: &mut impl Buf, input_len: usize) -> Result<Woff2Header, DecodeError> {
        let signature = input.try_get_u32()?;
        if signature != WOFF2_SIGNATURE {
            return Err(DecodeError::BadSignature);
        }

        let flavor = input.try_get_u32()?;
        if flavor == TTCF_FLAVOR {
            return Err(DecodeError::UnsupportedCollection);
        }

        let length = input.try_get_u32()?;
        let num_tables = input.try_get_u16()?;
        let _reserved = input.try_get_u16()?;
        let total_sfnt_size = input.try_get_u32()?;
        let total_compressed_size = input.try_get_u32()?;
        let _major_version = input.try_get_u16()?;
        let _minor_version = input.try_get_u16()?;
        let meta_offset = input.try_get_u32()?;
        let meta_length = input.try_get_u32()?;
        let _meta_orig_length = input.try_get_u32()?;
        let priv_offset = input.try_get_u32()?;
        let priv_length = input.try_get_u32()?;

        let header = Woff2Header {
            flavor: Tag::from_be_bytes(flavor.to_be_bytes()),
            length,
            num_tables,
            total_sfnt_size,
            total_compressed_size,
            meta_offset,
            meta_length,
            priv_offset,
            priv_length,
        };

        if header.length as usize > input_len {
            return Err(DecodeError::InvalidLength);
        }
        if header.num_tables == 0 {
            return Err(DecodeError::Malformed("table directory is empty"));
        }
        // A zero-length block must not claim a position in the file.
        if header.meta_length == 0 && header.meta_offset != 0 {
            return Err(DecodeError::InconsistentBlockOffset);
        }
        if header.priv_length == 0 && header.priv_offset != 0 {
            return Err(DecodeError::InconsistentBlockOffset);
        }

        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&WOFF2_SIGNATURE.to_be_bytes());
        bytes.extend_from_slice(b"\x00\x01\x00\x00"); // flavor: TrueType
        bytes.extend_from_slice(&48u32.to_be_bytes()); // length
        bytes.extend_from_slice(&1u16.to_be_bytes()); // numTables
        bytes.extend_from_slice(&0u16.to_be_bytes()); // reserved
        bytes.extend_from_slice(&12u32.to_be_bytes()); // totalSfntSize
        bytes.extend_from_slice(&0u32.to_be_bytes()); // totalCompressedSize
        bytes.extend_from_slice(&[0; 4]); // major/minor version
        bytes.extend_from_slice(&[0; 12]); // meta offset/length/origLength
        bytes.extend_from_slice(&[0; 8]); // priv offset/length
        bytes
    }

    #[test]
    fn accepts_minimal_header() {
        let bytes = header_bytes();
        let header = Woff2Header::parse(&mut &bytes[..], bytes.len()).unwrap();
        assert_eq!(header.flavor, Tag::from_be_bytes([0, 1, 0, 0]));
        assert_eq!(header.num_tables, 1);
        assert_eq!(header.total_sfnt_size, 12);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut bytes = header_bytes();
        bytes[0] = b'w';
        bytes[1] = b'O';
        bytes[2] = b'F';
        bytes[3] = b'F';
        assert_eq!(
            Woff2Header::parse(&mut &bytes[..], bytes.len()),
            Err(DecodeError::BadSignature)
        );
    }

    #[test]
    fn rejects_collections() {
        let mut bytes = header_bytes();
        bytes[4..8].copy_from_slice(b"ttcf");
        assert_eq!(
            Woff2Header::parse(&mut &bytes[..], bytes.len()),
            Err(DecodeError::UnsupportedCollection)
        );
    }

    #[test]
    fn rejects_length_past_input() {
        let bytes = header_bytes();
        assert_eq!(
            Woff2Header::parse(&mut &bytes[..], bytes.len() - 1),
            Err(DecodeError::InvalidLength)
        );
    }

    #[test]
    fn rejects_offset_without_length() {
        let mut bytes = header_bytes();
        // metaOffset nonzero while metaLength stays zero
        bytes[28..32].copy_from_slice(&64u32.to_be_bytes());
        assert_eq!(
            Woff2Header::parse(&mut &bytes[..], bytes.len()),
            Err(DecodeError::InconsistentBlockOffset)
        );
    }

    #[test]
    fn rejects_truncated_header() {
        let bytes = header_bytes();
        assert_eq!(
            Woff2Header::parse(&mut &bytes[..20], bytes.len()),
            Err(DecodeError::Truncated)
        );
    }
}
