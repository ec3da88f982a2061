//! Pure Rust WOFF2 decoder.
//!
//! Turns a [WOFF2](https://www.w3.org/TR/WOFF2/) font file back into the
//! uncompressed SFNT (TrueType/OpenType) container it wraps: the Brotli
//! payload is inflated, the transformed 'glyf' and 'loca' tables are
//! reconstructed, and everything else is copied through unchanged.
//!
//! ```no_run
//! let woff = std::fs::read("font.woff2").unwrap();
//! let sfnt = unwoff2::decode_woff2(&woff).unwrap();
//! std::fs::write("font.ttf", sfnt).unwrap();
//! ```
//!
//! Directory checksums in the output are written as zero; consumers are
//! expected to recompute or ignore them. Font collections and the
//! transformed 'hmtx' table are rejected.

mod bits;
mod decode;
mod directory;
mod error;
mod glyf;
mod header;
mod sfnt;
mod table_tags;
mod triplet;
mod variable_length;

pub use decode::{decode_woff2, decode_woff2_from_reader, decode_woff2_with_brotli, is_woff2};
pub use error::DecodeError;
