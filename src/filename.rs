use crate::metadata::Metadata;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // language _ [anthology] version _ b## _ slug [_c##] [_v##[-##]] [_t##]
    static ref FILENAME: Regex = Regex::new(concat!(
        r"([a-zA-Z]{2,3}(?:-[\da-zA-Z]+)*)",
        r"_",
        r"(?:_(nt|ot|obs))?",
        r"([\da-zA-Z]{2,3})",
        r"_b(\d{2})",
        r"_([\da-zA-Z]+)",
        r"(?:_c(\d{2,3}))?",
        r"(?:_v(\d{2,3})(?:-(\d{2,3}))?)?",
        r"(?:_t(\d{2}))?",
        r".*",
    ))
    .unwrap();
}

fn pad_start(value: &str, width: usize) -> String {
    if value.len() >= width {
        value.to_string()
    } else {
        format!("{}{}", "0".repeat(width - value.len()), value)
    }
}

impl Metadata {
    /// Derives the canonical filename:
    /// `language_version_b{book}_slug_c{chapter}_v{start}[-{end}]_{take}.wav`.
    /// The verse range collapses to a single verse when start == end.
    pub fn to_filename(&self, take_info: &str, chapter_width: usize, verse_width: usize) -> String {
        let padded_start = pad_start(&self.startv, verse_width);
        let padded_end = pad_start(&self.endv, verse_width);
        let verses = if self.startv != self.endv {
            format!("v{}-{}", padded_start, padded_end)
        } else {
            format!("v{}", padded_start)
        };
        format!(
            "{}_{}_b{}_{}_c{}_{}_{}.wav",
            self.language,
            self.version,
            pad_start(&self.book_number, 2),
            self.slug,
            pad_start(&self.chapter, chapter_width),
            verses,
            take_info
        )
    }

    /// Parses a filename into a Metadata record. Verse end defaults to the
    /// start verse; a missing anthology tag is inferred from the book
    /// number (above 39 is new-testament). A name that does not match the
    /// grammar yields the all-default record.
    pub fn from_filename(name: &str) -> Metadata {
        let mut metadata = Metadata::default();
        let Some(captures) = FILENAME.captures(name) else {
            return metadata;
        };

        let group = |i: usize| captures.get(i).map(|m| m.as_str().to_string());

        metadata.language = group(1).unwrap_or_default();
        metadata.version = group(3).unwrap_or_default();
        metadata.book_number = group(4).unwrap_or_else(|| "0".to_string());
        metadata.slug = group(5).unwrap_or_default();
        metadata.chapter = group(6).unwrap_or_default();
        metadata.startv = group(7).unwrap_or_default();
        metadata.endv = group(8).unwrap_or_else(|| metadata.startv.clone());

        let book_number = metadata.book_number.parse::<u32>().unwrap_or(0);
        let inferred = if book_number > 39 { "nt" } else { "ot" };
        metadata.anthology = group(2).unwrap_or_else(|| inferred.to_string());

        metadata
    }
}

// ================================== TESTS ==================================
