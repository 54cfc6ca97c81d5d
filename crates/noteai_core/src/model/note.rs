//! Note domain model.
//!
//! # Responsibility
//! - Define the note record returned by repositories and services.
//! - Validate titles and normalize tags.
//! - Derive the rendered projection (`rendered_text`, character count,
//!   reading time) from markdown content.
//!
//! # Invariants
//! - `id` is stable and never reused for another note.
//! - `current_version` equals the version of the newest committed snapshot.
//! - A note belongs to exactly one owner for its whole lifetime.
//! - `title` is trimmed and holds 1..=200 characters.
//! - `tags` are lowercase, unique and sorted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of a note.
pub type NoteId = Uuid;

/// Identifier of the user owning a note.
pub type OwnerId = Uuid;

/// Monotonic per-note version counter. The first committed snapshot is `1`.
pub type VersionNumber = u64;

pub const TITLE_MAX_CHARS: usize = 200;
const EXCERPT_MAX_CHARS: usize = 200;
const CJK_CHARS_PER_MINUTE: usize = 300;
const LATIN_WORDS_PER_MINUTE: usize = 200;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*]\(([^)]+)\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\*_`#>~\[\]\(\)]+"#).expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static CJK_CHAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{4e00}-\u{9fff}]").expect("valid cjk regex"));
static LATIN_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]+").expect("valid word regex"));

/// Publication state of a live note. Deletion is a separate tombstone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl NoteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl Display for NoteStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| {
            format!("unknown note status `{value}`; expected draft|published|archived")
        })
    }
}

/// Persisted note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub owner_id: OwnerId,
    pub title: String,
    /// Raw markdown source text of the current version.
    pub content: String,
    /// Rendered plain-text excerpt; `None` for blank content.
    pub rendered_text: Option<String>,
    /// Normalized tags, sorted.
    pub tags: Vec<String>,
    pub status: NoteStatus,
    pub is_public: bool,
    pub is_favorite: bool,
    /// Character count of `content`.
    pub word_count: u32,
    pub reading_minutes: u32,
    pub current_version: VersionNumber,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Last-edited time in epoch milliseconds.
    pub updated_at: i64,
}

/// Rendered projection derived from markdown content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePreview {
    pub rendered_text: Option<String>,
    pub word_count: u32,
    pub reading_minutes: u32,
}

impl NotePreview {
    /// Derives the projection stored alongside note content.
    ///
    /// Rules:
    /// - images are dropped, links keep their label, markdown symbols are
    ///   stripped and whitespace collapsed;
    /// - the excerpt keeps the first 200 chars and appends `...` when cut;
    /// - `word_count` is the number of characters in `content`;
    /// - reading time is `cjk / 300 + latin_words / 200` minutes, summed
    ///   before truncation and never below one minute.
    pub fn derive(content: &str) -> Self {
        let without_images = MARKDOWN_IMAGE_RE.replace_all(content, " ");
        let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
        let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
        let normalized = WHITESPACE_RE.replace_all(&without_symbols, " ");
        let trimmed = normalized.trim();

        let rendered_text = if trimmed.is_empty() {
            None
        } else if trimmed.chars().count() > EXCERPT_MAX_CHARS {
            let mut excerpt: String = trimmed.chars().take(EXCERPT_MAX_CHARS).collect();
            excerpt.push_str("...");
            Some(excerpt)
        } else {
            Some(trimmed.to_string())
        };

        let cjk_chars = CJK_CHAR_RE.find_iter(content).count();
        let latin_words = LATIN_WORD_RE.find_iter(content).count();

        Self {
            rendered_text,
            word_count: saturating_u32(content.chars().count()),
            reading_minutes: saturating_u32(reading_minutes(cjk_chars, latin_words)),
        }
    }
}

/// Whole minutes for `cjk_chars / 300 + latin_words / 200`, at least 1.
fn reading_minutes(cjk_chars: usize, latin_words: usize) -> usize {
    // Summed over a common denominator so fractions add before truncation.
    let weighted = cjk_chars
        .saturating_mul(LATIN_WORDS_PER_MINUTE)
        .saturating_add(latin_words.saturating_mul(CJK_CHARS_PER_MINUTE));
    (weighted / (CJK_CHARS_PER_MINUTE * LATIN_WORDS_PER_MINUTE)).max(1)
}

/// Trims a title and checks its length.
///
/// Returns `None` for blank titles or titles over 200 characters.
pub fn normalize_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    let chars = trimmed.chars().count();
    if chars == 0 || chars > TITLE_MAX_CHARS {
        return None;
    }
    Some(trimmed.to_string())
}

/// Normalizes one tag value: trimmed, lowercase, non-empty.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tag values.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{normalize_tags, normalize_title, NotePreview, NoteStatus};

    #[test]
    fn preview_strips_markdown_and_keeps_link_labels() {
        let preview =
            NotePreview::derive("# Title\n\n![cover](a.png) see [docs](https://x.io) **now**");
        assert_eq!(
            preview.rendered_text.as_deref(),
            Some("Title see docs now")
        );
    }

    #[test]
    fn preview_truncates_long_content_with_ellipsis() {
        let preview = NotePreview::derive(&"word ".repeat(100));
        let text = preview.rendered_text.expect("excerpt should exist");
        assert!(text.ends_with("..."));
        assert_eq!(text.chars().count(), 203);
    }

    #[test]
    fn blank_content_has_no_excerpt_and_one_minute_minimum() {
        let preview = NotePreview::derive("  \n ");
        assert_eq!(preview.rendered_text, None);
        assert_eq!(preview.word_count, 4);
        assert_eq!(preview.reading_minutes, 1);
    }

    #[test]
    fn word_count_is_character_count() {
        let preview = NotePreview::derive("你好 world");
        assert_eq!(preview.word_count, 8);
    }

    #[test]
    fn reading_time_sums_fractions_before_truncating() {
        // 450/300 + 100/200 = 1.5 + 0.5 = 2 minutes.
        let content = format!("{} {}", "字".repeat(450), "word ".repeat(100));
        assert_eq!(NotePreview::derive(&content).reading_minutes, 2);

        // 600/300 + 200/200 = 3 minutes.
        let content = format!("{} {}", "字".repeat(600), "word ".repeat(200));
        assert_eq!(NotePreview::derive(&content).reading_minutes, 3);

        // 299/300 + 199/200 truncates to 1.
        let content = format!("{} {}", "字".repeat(299), "word ".repeat(199));
        assert_eq!(NotePreview::derive(&content).reading_minutes, 1);
    }

    #[test]
    fn title_is_trimmed_and_bounded() {
        assert_eq!(normalize_title("  Plan  ").as_deref(), Some("Plan"));
        assert_eq!(normalize_title("   "), None);
        assert_eq!(normalize_title(&"t".repeat(201)), None);
        assert!(normalize_title(&"t".repeat(200)).is_some());
    }

    #[test]
    fn tags_are_lowercased_deduplicated_and_sorted() {
        let tags = vec![
            " Rust ".to_string(),
            "rust".to_string(),
            "".to_string(),
            "Notes".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["notes", "rust"]);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Published".parse::<NoteStatus>(), Ok(NoteStatus::Published));
        assert!("deleted".parse::<NoteStatus>().is_err());
        assert_eq!(NoteStatus::default(), NoteStatus::Draft);
    }
}
