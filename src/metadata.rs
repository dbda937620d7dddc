use crate::cue::CuePoint;
use serde::{Deserialize, Serialize};

/// The annotation record embedded in the LIST/INFO/IART chunk as JSON.
///
/// Every descriptive field is a string and defaults to "" — absent data is
/// the empty string, never an omitted or null value. Consumers rely on
/// that. `markers` keeps insertion order; callers sort by the CuePoint
/// ordering when a canonical order is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub anthology: String,
    pub language: String,
    pub version: String,
    // older payloads carried the slug under "book"
    #[serde(alias = "book")]
    pub slug: String,
    #[serde(rename = "book_number")]
    pub book_number: String,
    pub mode: String,
    pub chapter: String,
    pub startv: String,
    pub endv: String,
    pub contributor: String,
    pub markers: Vec<CuePoint>,
}

// ================================== TESTS ==================================
