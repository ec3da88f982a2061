use std::error::Error;
use std::io::{Read, Write};

use brotli_decompressor::DecompressorWriter;

use crate::directory::TableDirectory;
use crate::error::DecodeError;
use crate::glyf::{reconstruct_glyf_and_loca, GlyfAndLoca};
use crate::header::{Woff2Header, WOFF2_SIGNATURE};
use crate::sfnt::{SfntAssembler, SFNT_ENTRY_SIZE, SFNT_HEADER_SIZE};
use crate::table_tags::{GLYF, LOCA};

/// True if the data starts with the WOFF2 signature.
pub fn is_woff2(data: &[u8]) -> bool {
    data.len() >= 4 && u32::from_be_bytes([data[0], data[1], data[2], data[3]]) == WOFF2_SIGNATURE
}

// Scratch-buffer size for the streaming decompressor; the output vector
// itself is pre-sized from the header's hint.
const BROTLI_BUFFER_SIZE: usize = 8 * 1024;

fn inflate_brotli(compressed: &[u8], size_hint: usize) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut decompressed = Vec::with_capacity(size_hint);
    {
        let mut writer = DecompressorWriter::new(&mut decompressed, BROTLI_BUFFER_SIZE);
        writer.write_all(compressed)?;
        // close() runs the decoder to the end of the stream, so a payload
        // that stops mid-stream fails here rather than truncating silently.
        writer.close()?;
    }
    Ok(decompressed)
}

/// Decode a WOFF2 font into the equivalent SFNT (TrueType/OpenType) bytes.
pub fn decode_woff2(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    decode_woff2_with_brotli(data, &mut inflate_brotli)
}

/// Like [`decode_woff2`], reading the input from `reader` first.
pub fn decode_woff2_from_reader<R: Read>(reader: &mut R) -> Result<Vec<u8>, DecodeError> {
    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(|_| DecodeError::Truncated)?;
    decode_woff2(&data)
}

/// Decode a WOFF2 font with the Brotli decompressor supplied by the caller.
///
/// The decompressor receives the compressed block and a size hint and must
/// return the decompressed bytes, failing closed on malformed input.
#[allow(clippy::type_complexity)]
pub fn decode_woff2_with_brotli(
    data: &[u8],
    decompress: &mut dyn FnMut(&[u8], usize) -> Result<Vec<u8>, Box<dyn Error>>,
) -> Result<Vec<u8>, DecodeError> {
    // Parsing functions take `&mut input` and consume from the front of the
    // slice; `data` itself keeps the whole region.
    let mut input = data;

    let header = Woff2Header::parse(&mut input, data.len())?;
    let directory = TableDirectory::parse(&mut input, header.num_tables)?;
    log::debug!(
        "'{}' flavored WOFF2 with {} tables, {} compressed bytes",
        header.flavor,
        header.num_tables,
        header.total_compressed_size
    );

    // The compressed block sits immediately after the directory.
    let compressed = input
        .get(..header.total_compressed_size as usize)
        .ok_or(DecodeError::Truncated)?;
    let blob = decompress(compressed, header.total_sfnt_size as usize)
        .map_err(|_| DecodeError::Malformed("brotli stream failed to decompress"))?;
    if blob.len() as u64 != directory.total_length_of_all_tables {
        return Err(DecodeError::DecompressedSizeMismatch {
            expected: directory.total_length_of_all_tables,
            actual: blob.len(),
        });
    }

    // Reconstruct transformed 'glyf'/'loca' up front; the directory walk
    // below then places the products wherever the two slots appear.
    let reconstructed: Option<GlyfAndLoca> = match directory.find(GLYF) {
        Some(glyf_entry) if glyf_entry.has_transformation() => Some(reconstruct_glyf_and_loca(
            glyf_entry.blob_data(&blob)?,
        )?),
        _ => None,
    };

    let mut assembler = SfntAssembler::new(
        header.flavor,
        header.num_tables,
        sfnt_size_hint(&header, &directory),
    );
    for entry in &directory.entries {
        if !entry.has_transformation() {
            assembler.append_table(entry.tag, entry.blob_data(&blob)?);
            continue;
        }
        if entry.tag != GLYF && entry.tag != LOCA {
            return Err(DecodeError::UnsupportedTransformation(entry.tag));
        }
        // The coupling checks guarantee reconstruction ran whenever a
        // transformed 'glyf' or 'loca' slot is reached.
        let tables = reconstructed
            .as_ref()
            .ok_or(DecodeError::CouplingViolation)?;
        if entry.tag == GLYF {
            assembler.append_table(entry.tag, &tables.glyf);
        } else {
            assembler.append_table(entry.tag, &tables.loca);
        }
    }

    Ok(assembler.finish())
}

/// Initial output size: the header's hint, floored at what the directory
/// alone requires.
fn sfnt_size_hint(header: &Woff2Header, directory: &TableDirectory) -> usize {
    let directory_size =
        SFNT_HEADER_SIZE + directory.entries.len() * SFNT_ENTRY_SIZE;
    (header.total_sfnt_size as usize).max(directory_size)
}
