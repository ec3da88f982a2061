use bytes::Buf;
use font_types::Tag;

use crate::error::DecodeError;
use crate::table_tags::{GLYF, KNOWN_TABLE_TAGS, LOCA};
use crate::variable_length::BufVariableExt as _;

/// The two transformation-version bits of a directory entry's flag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationVersion {
    Version0,
    Version1,
    Version2,
    Version3,
}

impl TransformationVersion {
    fn from_flags(flags: u8) -> TransformationVersion {
        match (flags & 0xC0) >> 6 {
            0 => TransformationVersion::Version0,
            1 => TransformationVersion::Version1,
            2 => TransformationVersion::Version2,
            _ => TransformationVersion::Version3,
        }
    }
}

/// One entry of the WOFF2 table directory.
///
/// <https://www.w3.org/TR/WOFF2/#table_dir_format>
#[derive(Debug, Clone, PartialEq)]
pub struct TableDirectoryEntry {
    pub transformation_version: TransformationVersion,
    pub tag: Tag,
    /// Length of the table once reconstructed.
    pub original_length: u32,
    /// Length of the table inside the decompressed blob, present only for
    /// transformed tables.
    pub transform_length: Option<u32>,
    /// Byte offset of this table inside the decompressed blob.
    pub blob_offset: u64,
}

impl TableDirectoryEntry {
    pub fn has_transformation(&self) -> bool {
        self.transform_length.is_some()
    }

    /// The number of bytes this table occupies in the decompressed blob.
    pub fn blob_length(&self) -> u32 {
        self.transform_length.unwrap_or(self.original_length)
    }

    /// Slice this table's bytes out of the decompressed blob.
    pub fn blob_data<'a>(&self, blob: &'a [u8]) -> Result<&'a [u8], DecodeError> {
        let start = self.blob_offset as usize;
        let end = start + self.blob_length() as usize;
        blob.get(start..end).ok_or(DecodeError::Truncated)
    }
}

/// The parsed table directory plus the expected size of the decompressed
/// blob it describes.
#[derive(Debug, PartialEq)]
pub struct TableDirectory {
    pub entries: Vec<TableDirectoryEntry>,
    /// Sum of each table's length inside the decompressed blob.
    pub total_length_of_all_tables: u64,
}

impl TableDirectory {
    pub fn parse(input: &mut impl Buf, num_tables: u16) -> Result<TableDirectory, DecodeError> {
        let mut entries = Vec::with_capacity(num_tables as usize);
        let mut total_length_of_all_tables: u64 = 0;

        for _ in 0..num_tables {
            let flags = input.try_get_u8()?;
            let transformation_version = TransformationVersion::from_flags(flags);

            let tag_index = flags & 0x3F;
            let tag = if tag_index == 0x3F {
                // Four explicit tag bytes follow.
                let mut raw = [0u8; 4];
                input.try_copy_to_slice(&mut raw)?;
                Tag::from_be_bytes(raw)
            } else {
                *KNOWN_TABLE_TAGS
                    .get(tag_index as usize)
                    .ok_or(DecodeError::UnknownTag(tag_index))?
            };

            let original_length = input.try_get_base128_u32()?;

            // The transform length is present for transformed 'glyf'/'loca'
            // (version 0) and for any other table with a nonzero version.
            let is_glyf_or_loca = tag == GLYF || tag == LOCA;
            let has_transform_length = if is_glyf_or_loca {
                transformation_version == TransformationVersion::Version0
            } else {
                transformation_version != TransformationVersion::Version0
            };

            let transform_length = if has_transform_length {
                Some(input.try_get_base128_u32()?)
            } else {
                None
            };

            let blob_length = transform_length.unwrap_or(original_length);
            let blob_offset = total_length_of_all_tables;
            total_length_of_all_tables += blob_length as u64;

            entries.push(TableDirectoryEntry {
                transformation_version,
                tag,
                original_length,
                transform_length,
                blob_offset,
            });
        }

        let directory = TableDirectory {
            entries,
            total_length_of_all_tables,
        };
        directory.check_glyf_loca_coupling()?;
        Ok(directory)
    }

    /// Both 'glyf' and 'loca' must be present together, transformed (or not)
    /// together, and with the same transformation version. A transformed
    /// 'loca' is reconstructed entirely from 'glyf', so it must not claim
    /// any bytes of its own.
    fn check_glyf_loca_coupling(&self) -> Result<(), DecodeError> {
        let glyf = self.find(GLYF);
        let loca = self.find(LOCA);

        match (glyf, loca) {
            (None, None) => {}
            (Some(glyf), Some(loca)) => {
                if glyf.transformation_version != loca.transformation_version {
                    return Err(DecodeError::CouplingViolation);
                }
                if glyf.has_transformation() != loca.has_transformation() {
                    return Err(DecodeError::CouplingViolation);
                }
                if loca.has_transformation() && loca.transform_length != Some(0) {
                    return Err(DecodeError::Malformed(
                        "transformed 'loca' must have a zero transform length",
                    ));
                }
            }
            _ => return Err(DecodeError::CouplingViolation),
        }
        Ok(())
    }

    pub fn find(&self, tag: Tag) -> Option<&TableDirectoryEntry> {
        self.entries.iter().find(|entry| entry.tag == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_base128(out: &mut Vec<u8>, mut value: u32) {
        let mut bytes = [0u8; 5];
        let mut count = 0;
        loop {
            bytes[count] = (value & 0x7F) as u8;
            count += 1;
            value >>= 7;
            if value == 0 {
                break;
            }
        }
        for i in (0..count).rev() {
            let continuation = if i == 0 { 0 } else { 0x80 };
            out.push(bytes[i] | continuation);
        }
    }

    #[test]
    fn parses_known_tag_entry() {
        let mut bytes = vec![0x00]; // version 0, tag index 0 = 'cmap'
        push_base128(&mut bytes, 20);
        let directory = TableDirectory::parse(&mut &bytes[..], 1).unwrap();
        let entry = &directory.entries[0];
        assert_eq!(entry.tag, Tag::new(b"cmap"));
        assert_eq!(entry.transformation_version, TransformationVersion::Version0);
        assert_eq!(entry.original_length, 20);
        assert_eq!(entry.transform_length, None);
        assert_eq!(directory.total_length_of_all_tables, 20);
    }

    #[test]
    fn parses_explicit_tag_entry() {
        let mut bytes = vec![0x3F];
        bytes.extend_from_slice(b"ZXYW");
        push_base128(&mut bytes, 7);
        let directory = TableDirectory::parse(&mut &bytes[..], 1).unwrap();
        assert_eq!(directory.entries[0].tag, Tag::new(b"ZXYW"));
        assert_eq!(directory.entries[0].original_length, 7);
    }

    #[test]
    fn transformed_glyf_and_loca_carry_transform_lengths() {
        let mut bytes = vec![10]; // version 0, 'glyf'
        push_base128(&mut bytes, 100); // original length
        push_base128(&mut bytes, 60); // transform length
        bytes.push(11); // version 0, 'loca'
        push_base128(&mut bytes, 14);
        push_base128(&mut bytes, 0);
        let directory = TableDirectory::parse(&mut &bytes[..], 2).unwrap();
        assert_eq!(directory.entries[0].transform_length, Some(60));
        assert_eq!(directory.entries[1].transform_length, Some(0));
        assert_eq!(directory.entries[1].blob_offset, 60);
        assert_eq!(directory.total_length_of_all_tables, 60);
    }

    #[test]
    fn transformed_other_table_carries_transform_length() {
        let mut bytes = vec![0x40 | 3]; // version 1, 'hmtx'
        push_base128(&mut bytes, 32);
        push_base128(&mut bytes, 18);
        let directory = TableDirectory::parse(&mut &bytes[..], 1).unwrap();
        assert_eq!(directory.entries[0].transform_length, Some(18));
        assert_eq!(directory.total_length_of_all_tables, 18);
    }

    #[test]
    fn rejects_glyf_without_loca() {
        let mut bytes = vec![0xC0 | 10]; // version 3, 'glyf' alone
        push_base128(&mut bytes, 8);
        assert_eq!(
            TableDirectory::parse(&mut &bytes[..], 1),
            Err(DecodeError::CouplingViolation)
        );
    }

    #[test]
    fn rejects_mismatched_transform_versions() {
        let mut bytes = vec![10]; // version 0, 'glyf'
        push_base128(&mut bytes, 8);
        push_base128(&mut bytes, 8);
        bytes.push(0xC0 | 11); // version 3, 'loca'
        push_base128(&mut bytes, 4);
        assert_eq!(
            TableDirectory::parse(&mut &bytes[..], 2),
            Err(DecodeError::CouplingViolation)
        );
    }

    #[test]
    fn rejects_transformed_loca_with_payload() {
        let mut bytes = vec![10];
        push_base128(&mut bytes, 8);
        push_base128(&mut bytes, 8);
        bytes.push(11);
        push_base128(&mut bytes, 4);
        push_base128(&mut bytes, 4); // transform length must be zero
        assert!(matches!(
            TableDirectory::parse(&mut &bytes[..], 2),
            Err(DecodeError::Malformed(_))
        ));
    }
}
