use crate::error::Result;
use crate::prelude::*;
use memmap2::Mmap;
use std::collections::BTreeMap;
use std::fs::File;
use std::ops::Range;
use std::path::Path;

// Threshold for memory mapping instead of reading into a buffer
const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Whole-file working buffer. The reader owns it for the duration of a
/// parse; nothing it hands out aliases into it except the audio slice
/// taken at [`WavFileReader::read`] time, which is copied out.
enum FileBuffer {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl std::ops::Deref for FileBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileBuffer::Mapped(map) => map,
            FileBuffer::Owned(bytes) => bytes,
        }
    }
}

/// Header fields the format pins to fixed byte offsets.
struct Header {
    total_data_length: u32,
    total_audio_length: u32,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
}

/// Sub-chunk dispatch for the metadata-region scan.
enum ChunkKind {
    Cue,
    List,
    Unknown,
}

impl ChunkKind {
    fn from_label(label: &str) -> Self {
        match label {
            CUE_LABEL => ChunkKind::Cue,
            LIST_LABEL => ChunkKind::List,
            _ => ChunkKind::Unknown,
        }
    }
}

/// Parses a cue-annotated PCM WAV file: canonical 44-byte header, raw
/// audio payload, then the metadata region holding the cue position
/// table, the adtl label table and the INFO/IART annotation chunk.
pub struct WavFileReader {
    data: FileBuffer,
    metadata: Metadata,
    total_audio_length: u32,
    total_data_length: u32,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
}

impl WavFileReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        // Only use mmap for large files
        let data = if file_size > MMAP_THRESHOLD {
            FileBuffer::Mapped(unsafe { Mmap::map(&file)? })
        } else {
            let mut bytes = vec![0u8; file_size as usize];
            file.read_exact(&mut bytes)?;
            FileBuffer::Owned(bytes)
        };

        Self::parse(data)
    }

    /// Parses an in-memory container, taking ownership of the buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::parse(FileBuffer::Owned(bytes))
    }

    fn parse(data: FileBuffer) -> Result<Self> {
        let header = parse_header(&data)?;

        let mut metadata = Metadata::default();
        let mut cues = Vec::new();
        if let Some(region) = metadata_region(&data, &header) {
            dprintln!("metadata region: {} bytes", region.len());
            (metadata, cues) = parse_metadata_region(&data[region])?;
        }
        reconcile_cues(&mut metadata, &cues);

        Ok(Self {
            data,
            metadata,
            total_audio_length: header.total_audio_length,
            total_data_length: header.total_data_length,
            sample_rate: header.sample_rate,
            channels: header.channels,
            bits_per_sample: header.bits_per_sample,
        })
    }

    /// Full read: reconciled metadata plus a verbatim copy of the audio
    /// payload. Consumes the reader and with it the working buffer.
    pub fn read(self) -> WavFile {
        let start = WAV_HEADER_SIZE.min(self.data.len());
        let end = (WAV_HEADER_SIZE + self.total_audio_length as usize).min(self.data.len());
        WavFile {
            metadata: self.metadata,
            audio: self.data[start..end].to_vec(),
        }
    }

    pub fn read_metadata(&self) -> Metadata {
        self.metadata.clone()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Playback length in seconds. The divisor is a fixed 44100 Hz no
    /// matter what rate the header declares; files produced by the writer
    /// are always 44100 Hz mono, and existing consumers depend on this
    /// exact arithmetic (integer division included).
    pub fn duration(&self) -> f64 {
        let bytes_per_sample = u32::from(self.bits_per_sample / 8);
        if bytes_per_sample == 0 {
            return 0.0;
        }
        f64::from(self.total_audio_length / bytes_per_sample) / f64::from(DEFAULT_SAMPLE_RATE)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn total_audio_length(&self) -> u32 {
        self.total_audio_length
    }

    pub fn total_data_length(&self) -> u32 {
        self.total_data_length
    }
}

fn parse_header(data: &[u8]) -> Result<Header> {
    if data.len() < WAV_HEADER_SIZE {
        return Err(WavError::InvalidContainer(format!(
            "file too small to be a valid WAV: {} bytes",
            data.len()
        )));
    }

    let mut cursor = ChunkCursor::new(&data[..WAV_HEADER_SIZE]);
    let riff = cursor.read_fixed_text(LABEL_SIZE)?;
    let total_data_length = cursor.read_u32()?;
    let wave = cursor.read_fixed_text(LABEL_SIZE)?;
    let fmt = cursor.read_fixed_text(LABEL_SIZE)?;

    // PCM format code, channels and sample rate sit at fixed offsets of
    // the canonical 44-byte header
    cursor.seek_forward(PCM_POSITION - cursor.position())?;
    let pcm = cursor.read_u16()?;
    let channels = cursor.read_u16()?;
    let sample_rate = cursor.read_u32()?;
    cursor.seek_forward(BITS_PER_SAMPLE_POSITION - cursor.position())?;
    let bits_per_sample = cursor.read_u16()?;
    cursor.seek_forward(AUDIO_LENGTH_POSITION - cursor.position())?;
    let total_audio_length = cursor.read_u32()?;

    if riff != RIFF || wave != WAVE || fmt != FMT || pcm != PCM_FORMAT {
        return Err(WavError::InvalidContainer(
            "missing RIFF/WAVE signature or non-PCM format".to_string(),
        ));
    }

    Ok(Header {
        total_data_length,
        total_audio_length,
        sample_rate,
        channels,
        bits_per_sample,
    })
}

/// Byte range of the metadata region, if the header lengths declare one.
/// The 36 accounts for the header fields counted inside the RIFF length
/// beyond the 8-byte tag+size. A region running past the physical end of
/// the file is clamped; the scan simply ends early.
fn metadata_region(data: &[u8], header: &Header) -> Option<Range<usize>> {
    let audio = header.total_audio_length as usize;
    let total = header.total_data_length as usize;
    if total <= audio + 36 {
        return None;
    }
    let start = (WAV_HEADER_SIZE + audio).min(data.len());
    let end = (start + (total - audio - 36)).min(data.len());
    Some(start..end)
}

/// Single linear scan over the region's sub-chunks. Cue positions and
/// labels accumulate in two id-keyed maps resolved afterwards; the
/// annotation chunk replaces the metadata record wholesale.
fn parse_metadata_region(region: &[u8]) -> Result<(Metadata, Vec<CuePoint>)> {
    let mut metadata = Metadata::default();
    let mut locations: BTreeMap<u32, u32> = BTreeMap::new();
    let mut labels: BTreeMap<u32, String> = BTreeMap::new();

    let mut cursor = ChunkCursor::new(region);
    while cursor.remaining() > CHUNK_HEADER_SIZE {
        let label = cursor.read_fixed_text(LABEL_SIZE)?;
        let size = cursor.read_u32()? as usize;

        if cursor.remaining() < size {
            return Err(WavError::TruncatedChunk {
                label,
                size,
                remaining: cursor.remaining(),
            });
        }

        let mut chunk = cursor.slice_bounded(size)?;
        match ChunkKind::from_label(&label) {
            ChunkKind::Cue => parse_cues(&mut chunk, &mut locations)?,
            ChunkKind::List => parse_list(&mut chunk, &mut labels, &mut metadata)?,
            ChunkKind::Unknown => {}
        }
    }

    Ok((metadata, resolve_cues(&locations, &labels)))
}

/// The cue position table: a count, then 24-byte records of which only
/// the id and the sample offset matter here.
fn parse_cues(chunk: &mut ChunkCursor, locations: &mut BTreeMap<u32, u32>) -> Result<()> {
    if chunk.remaining() == 0 {
        return Ok(());
    }
    let count = chunk.read_u32()? as usize;
    if chunk.remaining() != CUE_ENTRY_SIZE * count {
        return Err(WavError::InvalidContainer(format!(
            "cue table declares {} cues but holds {} payload bytes",
            count,
            chunk.remaining()
        )));
    }
    for _ in 0..count {
        let id = chunk.read_u32()?;
        let location = chunk.read_u32()?;
        // chunk-id, chunk-start, block-start and in-block offset are unused
        chunk.seek_forward(CUE_ENTRY_SIZE - 8)?;
        locations.insert(id, location);
    }
    Ok(())
}

/// LIST chunks carry either the adtl label table or the INFO annotation;
/// any other list subtype is skipped whole.
fn parse_list(
    chunk: &mut ChunkCursor,
    labels: &mut BTreeMap<u32, String>,
    metadata: &mut Metadata,
) -> Result<()> {
    if chunk.remaining() < LABEL_SIZE {
        return Ok(());
    }
    match chunk.read_fixed_text(LABEL_SIZE)?.as_str() {
        ADTL_LABEL => parse_labels(chunk, labels),
        INFO_LABEL => parse_annotation(chunk, metadata),
        _ => Ok(()),
    }
}

fn parse_labels(chunk: &mut ChunkCursor, labels: &mut BTreeMap<u32, String>) -> Result<()> {
    while chunk.remaining() > CHUNK_HEADER_SIZE {
        let label = chunk.read_fixed_text(LABEL_SIZE)?;
        let size = chunk.read_u32()? as usize;
        if label != LABEL_LABEL {
            chunk.seek_forward(size)?;
            continue;
        }

        let id = chunk.read_u32()?;
        let text_len = size.checked_sub(4).ok_or_else(|| {
            WavError::InvalidContainer(format!(
                "labl sub-chunk of size {} cannot hold a cue id",
                size
            ))
        })?;
        let text = chunk.read_fixed_text(text_len)?;
        // strip the trailing NULs used to pad to double word alignment
        let trimmed = text.trim_matches('\0');
        let numeric = cue::numeric_content(trimmed);
        if numeric.is_empty() {
            return Err(WavError::InvalidContainer(format!(
                "cue label {:?} has no numeric content to join on",
                trimmed
            )));
        }
        labels.insert(id, numeric);
    }
    Ok(())
}

fn parse_annotation(chunk: &mut ChunkCursor, metadata: &mut Metadata) -> Result<()> {
    while chunk.remaining() > CHUNK_HEADER_SIZE {
        let label = chunk.read_fixed_text(LABEL_SIZE)?;
        let size = chunk.read_u32()? as usize;
        if label != IART_LABEL {
            chunk.seek_forward(size)?;
            continue;
        }

        let text = chunk.read_fixed_text(size)?;
        // A payload that does not decode makes the file metadata-less,
        // not unreadable: the failure collapses to the default record
        // here and nowhere else, losing any partial data.
        *metadata = match decode_annotation(&text) {
            Ok(decoded) => decoded,
            Err(error) => {
                dprintln!("annotation decode failed: {}", error);
                Metadata::default()
            }
        };
    }
    Ok(())
}

fn decode_annotation(text: &str) -> Result<Metadata> {
    // the writer pads the JSON with trailing NULs to word-align it
    Ok(serde_json::from_str(text.trim_end_matches('\0'))?)
}

fn resolve_cues(locations: &BTreeMap<u32, u32>, labels: &BTreeMap<u32, String>) -> Vec<CuePoint> {
    // ids present in only one table are incomplete markers and dropped
    locations
        .iter()
        .filter_map(|(id, &location)| {
            labels
                .get(id)
                .map(|label| CuePoint::new(location, label.clone()))
        })
        .collect()
}

/// Merges chunk-derived cues into the metadata's own marker list. A
/// metadata marker takes its position from the first parsed cue sharing
/// its label; parsed cues matching no marker are appended. The result is
/// left unsorted; callers apply the CuePoint ordering when they need it.
fn reconcile_cues(metadata: &mut Metadata, cues: &[CuePoint]) {
    for marker in metadata.markers.iter_mut() {
        if let Some(parsed) = cues.iter().find(|cue| cue.label == marker.label) {
            marker.location = parsed.location;
            marker.label = parsed.label.clone();
        }
    }
    for cue in cues {
        if !metadata.markers.contains(cue) {
            metadata.markers.push(cue.clone());
        }
    }
}

// ================================== TESTS ==================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{make_annotation_chunk, make_cue_chunk, make_header, make_label_chunk};

    /// Header + audio + the given raw metadata chunks, with consistent
    /// length bookkeeping.
    fn build_file(audio: &[u8], metadata_chunks: &[Vec<u8>]) -> Vec<u8> {
        let metadata_size: usize = metadata_chunks.iter().map(Vec::len).sum();
        let mut bytes = make_header(audio.len(), metadata_size).unwrap();
        bytes.extend_from_slice(audio);
        for chunk in metadata_chunks {
            bytes.extend_from_slice(chunk);
        }
        bytes
    }

    fn test_markers() -> Vec<CuePoint> {
        vec![
            CuePoint::new(0, "1"),
            CuePoint::new(537586, "2"),
            CuePoint::new(1168141, "3"),
        ]
    }

    #[test]
    fn test_joins_cue_table_with_label_table_by_id() {
        let markers = test_markers();
        let bytes = build_file(
            &[0u8; 64],
            &[
                make_cue_chunk(&markers).unwrap(),
                make_label_chunk(&markers).unwrap(),
            ],
        );
        let reader = WavFileReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.metadata().markers, markers);
    }

    #[test]
    fn test_plain_wav_yields_empty_metadata() {
        let bytes = build_file(&[0u8; 128], &[]);
        let reader = WavFileReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.read_metadata(), Metadata::default());
    }

    #[test]
    fn test_rejects_non_wav_input() {
        let text = b"this text file is long enough to clear the header length check";
        let result = WavFileReader::from_bytes(text.to_vec());
        assert!(matches!(result, Err(WavError::InvalidContainer(_))));
    }

    #[test]
    fn test_rejects_short_file() {
        let result = WavFileReader::from_bytes(b"RIFF".to_vec());
        assert!(matches!(result, Err(WavError::InvalidContainer(_))));
    }

    #[test]
    fn test_rejects_non_pcm_format() {
        let mut bytes = build_file(&[0u8; 16], &[]);
        bytes[PCM_POSITION] = 3; // IEEE float
        let result = WavFileReader::from_bytes(bytes);
        assert!(matches!(result, Err(WavError::InvalidContainer(_))));
    }

    #[test]
    fn test_truncated_chunk_names_the_offender() {
        // a cue chunk declaring far more bytes than the region holds
        let mut chunk = Vec::new();
        chunk.extend_from_slice(CUE_LABEL.as_bytes());
        chunk.extend_from_slice(&1000u32.to_le_bytes());
        chunk.extend_from_slice(&[0u8; 8]);
        let bytes = build_file(&[0u8; 16], &[chunk]);
        match WavFileReader::from_bytes(bytes) {
            Err(WavError::TruncatedChunk { label, size, .. }) => {
                assert_eq!(label, CUE_LABEL);
                assert_eq!(size, 1000);
            }
            other => panic!("expected TruncatedChunk, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_cue_table_size_mismatch_is_invalid() {
        let mut chunk = Vec::new();
        chunk.extend_from_slice(CUE_LABEL.as_bytes());
        chunk.extend_from_slice(&12u32.to_le_bytes()); // count + 8 bytes: not 24 per cue
        chunk.extend_from_slice(&2u32.to_le_bytes());
        chunk.extend_from_slice(&[0u8; 8]);
        let bytes = build_file(&[0u8; 16], &[chunk]);
        assert!(matches!(
            WavFileReader::from_bytes(bytes),
            Err(WavError::InvalidContainer(_))
        ));
    }

    #[test]
    fn test_label_without_digits_is_invalid() {
        let markers = vec![CuePoint::new(42, "intro")];
        let bytes = build_file(
            &[0u8; 16],
            &[
                make_cue_chunk(&markers).unwrap(),
                make_label_chunk(&markers).unwrap(),
            ],
        );
        assert!(matches!(
            WavFileReader::from_bytes(bytes),
            Err(WavError::InvalidContainer(_))
        ));
    }

    #[test]
    fn test_unmatched_ids_are_dropped() {
        // cue table has ids 0 and 7; label table only labels id 0
        let cue_markers = vec![CuePoint::new(10, "1"), CuePoint::new(20, "2")];
        let mut cue_chunk = make_cue_chunk(&cue_markers).unwrap();
        // rewrite the second record's id from 1 to 7
        let second_id_offset = 8 + 4 + CUE_ENTRY_SIZE;
        cue_chunk[second_id_offset..second_id_offset + 4].copy_from_slice(&7u32.to_le_bytes());
        let label_chunk = make_label_chunk(&cue_markers[..1]).unwrap();
        let bytes = build_file(&[0u8; 16], &[cue_chunk, label_chunk]);
        let reader = WavFileReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.metadata().markers, vec![CuePoint::new(10, "1")]);
    }

    #[test]
    fn test_unknown_chunks_are_skipped() {
        let markers = test_markers();
        let mut junk = Vec::new();
        junk.extend_from_slice(b"JUNK");
        junk.extend_from_slice(&8u32.to_le_bytes());
        junk.extend_from_slice(&[0xAB; 8]);
        let bytes = build_file(
            &[0u8; 16],
            &[
                junk,
                make_cue_chunk(&markers).unwrap(),
                make_label_chunk(&markers).unwrap(),
            ],
        );
        let reader = WavFileReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.metadata().markers, markers);
    }

    #[test]
    fn test_annotation_chunk_populates_metadata() {
        let mut metadata = Metadata {
            language: "en".into(),
            version: "ulb".into(),
            slug: "1jn".into(),
            book_number: "63".into(),
            chapter: "3".into(),
            ..Default::default()
        };
        metadata.markers = test_markers();
        let bytes = build_file(
            &[0u8; 16],
            &[
                make_cue_chunk(&metadata.markers).unwrap(),
                make_label_chunk(&metadata.markers).unwrap(),
                make_annotation_chunk(&metadata).unwrap(),
            ],
        );
        let reader = WavFileReader::from_bytes(bytes).unwrap();
        assert_eq!(*reader.metadata(), metadata);
    }

    #[test]
    fn test_bad_annotation_json_falls_back_to_default() {
        let mut annotation = Vec::new();
        let payload = b"{definitely not json";
        annotation.extend_from_slice(LIST_LABEL.as_bytes());
        annotation.extend_from_slice(&(12 + payload.len() as u32).to_le_bytes());
        annotation.extend_from_slice(INFO_LABEL.as_bytes());
        annotation.extend_from_slice(IART_LABEL.as_bytes());
        annotation.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        annotation.extend_from_slice(payload);
        let bytes = build_file(&[0u8; 16], &[annotation]);
        let reader = WavFileReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.read_metadata(), Metadata::default());
    }

    #[test]
    fn test_markers_take_position_from_matching_cue() {
        // annotation declares marker "2" at a stale position; the cue
        // table corrects it, and the unmatched cue "3" is appended
        let annotation_metadata = Metadata {
            markers: vec![CuePoint::new(999, "2")],
            ..Default::default()
        };
        let parsed = vec![CuePoint::new(537586, "2"), CuePoint::new(1168141, "3")];
        let bytes = build_file(
            &[0u8; 16],
            &[
                make_cue_chunk(&parsed).unwrap(),
                make_label_chunk(&parsed).unwrap(),
                make_annotation_chunk(&annotation_metadata).unwrap(),
            ],
        );
        let reader = WavFileReader::from_bytes(bytes).unwrap();
        assert_eq!(
            reader.metadata().markers,
            vec![CuePoint::new(537586, "2"), CuePoint::new(1168141, "3")]
        );
    }

    #[test]
    fn test_duration_uses_fixed_rate_divisor() {
        let audio_length = 1525587u32 * 2;
        let mut bytes = make_header(audio_length as usize, 0).unwrap();
        // declare a different sample rate; duration must not care
        bytes[24..28].copy_from_slice(&48000u32.to_le_bytes());
        let reader = WavFileReader::from_bytes(bytes).unwrap();
        assert!((reader.duration() - 34.5938).abs() < 0.0001);
        assert_eq!(reader.sample_rate(), 48000);
    }

    #[test]
    fn test_audio_payload_is_copied_verbatim() {
        let audio: Vec<u8> = (0..200u32).map(|value| (value % 251) as u8).collect();
        let bytes = build_file(&audio, &[]);
        let wav = WavFileReader::from_bytes(bytes).unwrap().read();
        assert_eq!(wav.audio, audio);
    }

    #[test]
    fn test_open_reads_from_disk() {
        let markers = test_markers();
        let bytes = build_file(
            &[7u8; 32],
            &[
                make_cue_chunk(&markers).unwrap(),
                make_label_chunk(&markers).unwrap(),
            ],
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        std::fs::write(&path, &bytes).unwrap();
        let reader = WavFileReader::open(&path).unwrap();
        assert_eq!(reader.metadata().markers, markers);
        assert_eq!(reader.read().audio, vec![7u8; 32]);
    }
}
