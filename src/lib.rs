pub mod cue;
pub mod cursor;
pub mod error;
mod filename;
pub mod metadata;
mod prelude;
pub mod reader;
pub mod writer;

use error::Result;
use std::path::Path;

pub use cue::CuePoint;
pub use cursor::ChunkCursor;
pub use error::WavError;
pub use metadata::Metadata;
pub use reader::WavFileReader;
pub use writer::WavFileWriter;

// Chunk identifiers
pub const RIFF: &str = "RIFF";
pub const WAVE: &str = "WAVE";
pub const FMT: &str = "fmt ";
pub const DATA_LABEL: &str = "data";
pub const CUE_LABEL: &str = "cue ";
pub const LIST_LABEL: &str = "LIST";
pub const ADTL_LABEL: &str = "adtl";
pub const LABEL_LABEL: &str = "labl";
pub const INFO_LABEL: &str = "INFO";
pub const IART_LABEL: &str = "IART";

// Fixed layout of the canonical 44-byte header
pub const WAV_HEADER_SIZE: usize = 44;
pub const PCM_POSITION: usize = 20;
pub const BITS_PER_SAMPLE_POSITION: usize = 34;
pub const AUDIO_LENGTH_POSITION: usize = 40;
pub const PCM_FORMAT: u16 = 1;
pub const FMT_CHUNK_SIZE: u32 = 16;

// Chunk structures
pub const LABEL_SIZE: usize = 4;
pub const CHUNK_HEADER_SIZE: usize = 8;
pub const CUE_HEADER_SIZE: usize = 4;
pub const CUE_ENTRY_SIZE: usize = 24;

// Writer output format
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_CHANNELS: u16 = 1;
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;

pub fn debug_println(args: std::fmt::Arguments) {
    if cfg!(debug_assertions) {
        println!("{}", args);
    }
}

// Helper macro to use it like println!
#[macro_export]
macro_rules! dprintln {
    ($($arg:tt)*) => {
        $crate::debug_println(format_args!($($arg)*))
    };
}

/// One fully-read container: the reconciled annotation record plus the
/// raw PCM payload, exactly as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WavFile {
    pub metadata: Metadata,
    pub audio: Vec<u8>,
}

pub fn read_wav(path: impl AsRef<Path>) -> Result<WavFile> {
    Ok(WavFileReader::open(path)?.read())
}

pub fn read_metadata(path: impl AsRef<Path>) -> Result<Metadata> {
    Ok(WavFileReader::open(path)?.read_metadata())
}

pub fn duration(path: impl AsRef<Path>) -> Result<f64> {
    Ok(WavFileReader::open(path)?.duration())
}

pub fn write_wav(file: &WavFile, dest: impl AsRef<Path>) -> Result<()> {
    WavFileWriter.write(file, dest)
}
