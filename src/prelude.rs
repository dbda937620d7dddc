pub use crate::dprintln; // Make the macro available
pub use crate::*;
pub use anyhow::{Result as R, anyhow};
pub use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

pub use crate::error::WavError;
pub use std::io::{Cursor, Read, Seek, SeekFrom, Write};
