//! Assembly of the output SFNT container: offset table, table directory,
//! and 4-byte aligned table payloads.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/otff#table-directory>

use bytes::BufMut;
use font_types::Tag;

pub const SFNT_HEADER_SIZE: usize = 12;
pub const SFNT_ENTRY_SIZE: usize = 16;

/// Builds the SFNT byte buffer. Directory slots are laid out up front in
/// input order and filled in as each table's payload is appended.
pub(crate) struct SfntAssembler {
    out: Vec<u8>,
    next_slot: usize,
}

impl SfntAssembler {
    /// Write the 12-byte offset table and reserve `num_tables` directory
    /// slots. `size_hint` pre-sizes the buffer; it is not trusted.
    pub fn new(flavor: Tag, num_tables: u16, size_hint: usize) -> SfntAssembler {
        let directory_size = SFNT_HEADER_SIZE + num_tables as usize * SFNT_ENTRY_SIZE;
        let mut out = Vec::with_capacity(size_hint.max(directory_size));

        // searchRange is the largest power of two at most numTables, times
        // the entry size; entrySelector is its log2.
        let mut entry_selector: u32 = 0;
        while 1u32 << (entry_selector + 1) <= num_tables as u32 {
            entry_selector += 1;
        }
        let search_range: u32 = (1 << entry_selector) << 4;
        let range_shift = ((num_tables as u32) << 4) - search_range;

        out.put_slice(&flavor.to_be_bytes());
        out.put_u16(num_tables);
        out.put_u16(search_range as u16);
        out.put_u16(entry_selector as u16);
        out.put_u16(range_shift as u16);
        out.resize(directory_size, 0);

        SfntAssembler {
            out,
            next_slot: SFNT_HEADER_SIZE,
        }
    }

    /// Fill the next directory slot and append the table payload, padded to
    /// a 4-byte boundary. Checksums are left zero for the consumer to
    /// recompute or ignore.
    pub fn append_table(&mut self, tag: Tag, data: &[u8]) {
        let offset = self.out.len();
        log::trace!("placing '{}' at offset {} ({} bytes)", tag, offset, data.len());

        let mut slot = &mut self.out[self.next_slot..];
        slot.put_slice(&tag.to_be_bytes());
        slot.put_u32(0); // checksum
        slot.put_u32(offset as u32);
        slot.put_u32(data.len() as u32);
        self.next_slot += SFNT_ENTRY_SIZE;

        self.out.extend_from_slice(data);
        let padded = self.out.len().div_ceil(4) * 4;
        self.out.resize(padded, 0);
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }
}
