use crate::error::Result;
use crate::prelude::*;
use std::fs::File;
use std::path::Path;

/// Serializes a [`WavFile`] back into the container layout: canonical
/// header, raw audio, cue position table, adtl label table, INFO/IART
/// annotation chunk, in that fixed order. The destination is created or
/// overwritten in a single pass; nothing is read back.
///
/// The header always declares mono 16-bit 44100 Hz regardless of what the
/// source file declared; the audio bytes themselves pass through
/// untouched.
pub struct WavFileWriter;

impl WavFileWriter {
    pub fn write(&self, data: &WavFile, dest: impl AsRef<Path>) -> Result<()> {
        let cue_chunk = make_cue_chunk(&data.metadata.markers)?;
        let label_chunk = make_label_chunk(&data.metadata.markers)?;
        let annotation_chunk = make_annotation_chunk(&data.metadata)?;
        let metadata_size = cue_chunk.len() + label_chunk.len() + annotation_chunk.len();

        let mut file = File::create(dest)?;
        file.write_all(&make_header(data.audio.len(), metadata_size)?)?;
        file.write_all(&data.audio)?;
        file.write_all(&cue_chunk)?;
        file.write_all(&label_chunk)?;
        file.write_all(&annotation_chunk)?;
        Ok(())
    }
}

/// Alignment used for the annotation JSON: pads to the *next* multiple of
/// 4 even when the length is already aligned. Files in the field carry
/// this padding, and the reader strips trailing NULs, so it stays.
fn word_aligned_length(length: usize) -> usize {
    length + (4 - length % 4)
}

/// Alignment used for cue labels: pads to a multiple of 4 only when the
/// length is not already one.
fn padded_label_length(length: usize) -> usize {
    if length % 4 != 0 {
        length + 4 - length % 4
    } else {
        length
    }
}

pub(crate) fn make_header(audio_size: usize, metadata_size: usize) -> Result<Vec<u8>> {
    let byte_rate =
        u32::from(DEFAULT_BITS_PER_SAMPLE) * DEFAULT_SAMPLE_RATE * u32::from(DEFAULT_CHANNELS) / 8;
    let block_align = DEFAULT_CHANNELS * DEFAULT_BITS_PER_SAMPLE / 8;

    let mut header = Cursor::new(Vec::with_capacity(WAV_HEADER_SIZE));
    header.write_all(RIFF.as_bytes())?;
    header.write_u32::<LittleEndian>((audio_size + WAV_HEADER_SIZE - 8 + metadata_size) as u32)?;
    header.write_all(WAVE.as_bytes())?;
    header.write_all(FMT.as_bytes())?;
    header.write_u32::<LittleEndian>(FMT_CHUNK_SIZE)?;
    header.write_u16::<LittleEndian>(PCM_FORMAT)?;
    header.write_u16::<LittleEndian>(DEFAULT_CHANNELS)?;
    header.write_u32::<LittleEndian>(DEFAULT_SAMPLE_RATE)?;
    header.write_u32::<LittleEndian>(byte_rate)?;
    header.write_u16::<LittleEndian>(block_align)?;
    header.write_u16::<LittleEndian>(DEFAULT_BITS_PER_SAMPLE)?;
    header.write_all(DATA_LABEL.as_bytes())?;
    header.write_u32::<LittleEndian>(audio_size as u32)?;
    Ok(header.into_inner())
}

/// The cue position table: ids are the marker indices; the chunk-start
/// and block-start fields are always zero for uncompressed PCM.
pub(crate) fn make_cue_chunk(cues: &[CuePoint]) -> Result<Vec<u8>> {
    let payload_size = CUE_HEADER_SIZE + CUE_ENTRY_SIZE * cues.len();
    let mut chunk = Cursor::new(Vec::with_capacity(CHUNK_HEADER_SIZE + payload_size));
    chunk.write_all(CUE_LABEL.as_bytes())?;
    chunk.write_u32::<LittleEndian>(payload_size as u32)?;
    chunk.write_u32::<LittleEndian>(cues.len() as u32)?;
    for (index, cue) in cues.iter().enumerate() {
        chunk.write_u32::<LittleEndian>(index as u32)?;
        chunk.write_u32::<LittleEndian>(cue.location)?;
        chunk.write_all(DATA_LABEL.as_bytes())?;
        chunk.write_u32::<LittleEndian>(0)?;
        chunk.write_u32::<LittleEndian>(0)?;
        chunk.write_u32::<LittleEndian>(cue.location)?;
    }
    Ok(chunk.into_inner())
}

/// The adtl label table: one labl sub-chunk per marker, text NUL-padded
/// to word alignment, sub-chunk size covering the id plus the padded
/// text.
pub(crate) fn make_label_chunk(cues: &[CuePoint]) -> Result<Vec<u8>> {
    let text_size: usize = cues
        .iter()
        .map(|cue| padded_label_length(cue.label.len()))
        .sum();
    // per marker: 8 for the labl header plus 4 for the cue id
    let payload_size = LABEL_SIZE + 12 * cues.len() + text_size;

    let mut chunk = Cursor::new(Vec::with_capacity(CHUNK_HEADER_SIZE + payload_size));
    chunk.write_all(LIST_LABEL.as_bytes())?;
    chunk.write_u32::<LittleEndian>(payload_size as u32)?;
    chunk.write_all(ADTL_LABEL.as_bytes())?;
    for (index, cue) in cues.iter().enumerate() {
        let padded = padded_label_length(cue.label.len());
        chunk.write_all(LABEL_LABEL.as_bytes())?;
        chunk.write_u32::<LittleEndian>((4 + padded) as u32)?;
        chunk.write_u32::<LittleEndian>(index as u32)?;
        chunk.write_all(cue.label.as_bytes())?;
        for _ in cue.label.len()..padded {
            chunk.write_u8(0)?;
        }
    }
    Ok(chunk.into_inner())
}

/// The INFO/IART annotation chunk carrying the metadata record as JSON.
pub(crate) fn make_annotation_chunk(metadata: &Metadata) -> Result<Vec<u8>> {
    let json = serde_json::to_string(metadata)?;
    let padded = word_aligned_length(json.len());

    let mut chunk = Cursor::new(Vec::with_capacity(CHUNK_HEADER_SIZE + 12 + padded));
    chunk.write_all(LIST_LABEL.as_bytes())?;
    chunk.write_u32::<LittleEndian>((12 + padded) as u32)?;
    chunk.write_all(INFO_LABEL.as_bytes())?;
    chunk.write_all(IART_LABEL.as_bytes())?;
    chunk.write_u32::<LittleEndian>(padded as u32)?;
    chunk.write_all(json.as_bytes())?;
    for _ in json.len()..padded {
        chunk.write_u8(0)?;
    }
    Ok(chunk.into_inner())
}

// ================================== TESTS ==================================
