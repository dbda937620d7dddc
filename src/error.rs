use thiserror::Error;

/// Conditions the container format itself can raise. Fatal variants abort
/// the whole read or write; there is no partial result.
#[derive(Debug, Error)]
pub enum WavError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Missing/short header, magic mismatch, wrong PCM code, cue-table size
    /// mismatch, digit-less label, or a read past a chunk boundary.
    #[error("invalid wav file: {0}")]
    InvalidContainer(String),

    /// A sub-chunk declared more bytes than its enclosing region has left.
    #[error("chunk {label} is of size: {size} but remaining chunk size is {remaining}")]
    TruncatedChunk {
        label: String,
        size: usize,
        remaining: usize,
    },

    /// The IART annotation payload did not decode. Never escapes the
    /// reader: collapsed to a default Metadata at its single call site.
    #[error("annotation payload could not be decoded: {0}")]
    AnnotationDecode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WavError>;
