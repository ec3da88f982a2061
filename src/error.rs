use font_types::Tag;
use thiserror::Error;

/// Why a WOFF2 decode was rejected.
///
/// Every error is fatal to the decode; no partial output is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Ran off the end of the input or of a sub-stream.
    #[error("unexpected end of data")]
    Truncated,

    /// The header signature is not 'wOF2'.
    #[error("invalid WOFF2 signature")]
    BadSignature,

    /// The flavor field indicates a TrueType collection.
    #[error("font collections are not supported")]
    UnsupportedCollection,

    /// The header's length field exceeds the input size.
    #[error("WOFF2 length field larger than the input")]
    InvalidLength,

    /// A zero-length metadata or private block with a nonzero offset.
    #[error("inconsistent block offset in WOFF2 header")]
    InconsistentBlockOffset,

    /// A UIntBase128 value with a leading zero, an overflow, or no
    /// terminator within 5 bytes.
    #[error("malformed UIntBase128 value")]
    MalformedVarInt,

    /// A table directory entry referenced a known-tag index past the
    /// dictionary.
    #[error("unknown table tag index {0}")]
    UnknownTag(u8),

    /// 'glyf' and 'loca' must be present together and share a
    /// transformation version.
    #[error("mismatched 'glyf'/'loca' tables")]
    CouplingViolation,

    /// Brotli output length differs from the sum of the directory's table
    /// lengths.
    #[error("decompressed size is {actual}, expected {expected}")]
    DecompressedSizeMismatch { expected: u64, actual: usize },

    /// The seven sub-stream sizes do not partition the transformed 'glyf'
    /// table.
    #[error("sub-stream sizes do not match the transformed 'glyf' table")]
    SubStreamSizeMismatch,

    /// Any other invariant breach; carries a short hint about where.
    #[error("malformed font data: {0}")]
    Malformed(&'static str),

    /// A transformed table this decoder does not reconstruct.
    #[error("unsupported transformation of '{0}' table")]
    UnsupportedTransformation(Tag),
}

impl From<bytes::TryGetError> for DecodeError {
    fn from(_: bytes::TryGetError) -> Self {
        DecodeError::Truncated
    }
}
