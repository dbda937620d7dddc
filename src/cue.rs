use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

lazy_static! {
    static ref DIGIT_RUNS: Regex = Regex::new(r"\d+").unwrap();
}

/// Concatenation of all digit runs in `text`, e.g. "v2b10" -> "210".
/// Empty when the text contains no digits.
pub fn numeric_content(text: &str) -> String {
    DIGIT_RUNS
        .find_iter(text)
        .map(|m| m.as_str())
        .collect::<String>()
}

/// A named sample-offset position within the audio payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuePoint {
    pub location: u32,
    pub label: String,
}

impl CuePoint {
    pub fn new(location: u32, label: impl Into<String>) -> Self {
        Self {
            location,
            label: label.into(),
        }
    }
}

/// Canonical marker ordering: location first, then label. Labels carrying
/// digits compare by the integer value of their concatenated digit runs so
/// that "2" sorts before "10"; otherwise labels compare lexically.
impl Ord for CuePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.location
            .cmp(&other.location)
            .then_with(|| compare_labels(&self.label, &other.label))
    }
}

impl PartialOrd for CuePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_labels(a: &str, b: &str) -> Ordering {
    let a_num = numeric_content(a);
    let b_num = numeric_content(b);
    if !a_num.is_empty() && !b_num.is_empty() {
        match (a_num.parse::<u64>(), b_num.parse::<u64>()) {
            (Ok(a_val), Ok(b_val)) => a_val.cmp(&b_val),
            _ => a.cmp(b),
        }
    } else {
        a.cmp(b)
    }
}

// ================================== TESTS ==================================
