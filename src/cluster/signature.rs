//! Structural page signatures

use crate::crawler::PageRecord;
use crate::url::path_depth;
use serde::Serialize;
use std::fmt;

/// Longest title pattern kept in a signature, in characters
const TITLE_PATTERN_LIMIT: usize = 60;

/// Meta description length class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionBucket {
    Empty,
    Short,
    Ok,
    Long,
}

impl DescriptionBucket {
    pub fn from_length(length: usize) -> Self {
        match length {
            0 => DescriptionBucket::Empty,
            1..=69 => DescriptionBucket::Short,
            70..=160 => DescriptionBucket::Ok,
            _ => DescriptionBucket::Long,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DescriptionBucket::Empty => "empty",
            DescriptionBucket::Short => "short",
            DescriptionBucket::Ok => "ok",
            DescriptionBucket::Long => "long",
        }
    }
}

/// Body word count class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WordBucket {
    Thin,
    Mid,
    Long,
}

impl WordBucket {
    pub fn from_count(words: usize) -> Self {
        match words {
            0..=299 => WordBucket::Thin,
            300..=799 => WordBucket::Mid,
            _ => WordBucket::Long,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WordBucket::Thin => "thin",
            WordBucket::Mid => "mid",
            WordBucket::Long => "long",
        }
    }
}

/// The five values that put two pages in the same template cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClusterSignature {
    pub depth: usize,
    pub title_pattern: String,
    pub h1_count: usize,
    pub description: DescriptionBucket,
    pub words: WordBucket,
}

impl ClusterSignature {
    pub fn of(page: &PageRecord) -> Self {
        Self {
            depth: path_depth(&page.url),
            title_pattern: title_pattern(&page.title),
            h1_count: page.h1_count,
            description: DescriptionBucket::from_length(page.description_length),
            words: WordBucket::from_count(page.word_count),
        }
    }
}

/// Renders as `depth|title pattern|h1N|description|words`
impl fmt::Display for ClusterSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|h1{}|{}|{}",
            self.depth,
            self.title_pattern,
            self.h1_count,
            self.description.as_str(),
            self.words.as_str()
        )
    }
}

/// Replaces digit runs with `{#}`, collapses whitespace and truncates
///
/// # Example
///
/// ```
/// use sitegauge::cluster::title_pattern;
///
/// assert_eq!(title_pattern("  Product   123 "), "Product {#}");
/// ```
pub fn title_pattern(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut in_digits = false;
    let mut in_space = false;

    for c in title.chars() {
        if c.is_ascii_digit() {
            if !in_digits {
                out.push_str("{#}");
            }
            in_digits = true;
            in_space = false;
        } else if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
            in_digits = false;
        } else {
            out.push(c);
            in_digits = false;
            in_space = false;
        }
    }

    out.trim().chars().take(TITLE_PATTERN_LIMIT).collect()
}
