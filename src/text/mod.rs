//! Title, series and author normalization.
//!
//! Provider titles arrive decorated with volume markers in half a dozen notations, English glosses,
//! imprint labels and side-story suffixes. The functions here take them apart again.

use once_cell::sync::Lazy;
use regex::Regex;

pub mod author;
pub mod series;
pub mod title;
pub mod volume;

pub use series::SeriesOrigin;
pub use volume::extract_volume;

/// A volume numeral in either half-width or full-width digits, optionally fractional.
pub(crate) const NUM: &str = r"[0-9０-９]+(?:[.．][0-9０-９]+)?";

/// Publisher imprint labels that providers put into series and title fields.
pub const IMPRINT_LABELS: &[&str] = &[
    "MF文庫J",
    "MFブックス",
    "電撃文庫",
    "電撃の新文芸",
    "角川スニーカー文庫",
    "角川文庫",
    "富士見ファンタジア文庫",
    "ファミ通文庫",
    "ガガガ文庫",
    "GA文庫",
    "HJ文庫",
    "HJ NOVELS",
    "講談社ラノベ文庫",
    "オーバーラップ文庫",
    "ダッシュエックス文庫",
    "ヒーロー文庫",
    "GCノベルズ",
    "カドカワBOOKS",
    "アース・スターノベル",
    "モンスター文庫",
    "集英社文庫",
    "新潮文庫",
    "ハヤカワ文庫",
    "創元推理文庫",
    "講談社文庫",
    "ジャンプコミックス",
    "少年サンデーコミックス",
    "講談社コミックス",
    "ヤングジャンプコミックス",
    "KCデラックス",
];

/// Markers of spin-off material that must not be mistaken for the main series.
pub const SIDE_STORY_MARKERS: &[&str] = &["番外編", "外伝", "短編", "特典", "SS", "スピンオフ"];

/// Keywords that introduce a side-story suffix in a title. Latin keywords match case-insensitively
/// and only as whole words.
pub const SIDE_STORY_SUFFIXES: &[&str] = &["APPEND", "SS", "Side Story", "外伝"];

/// Publisher names that leak into author fields.
pub const PUBLISHER_LEAKS: &[&str] = &[
    "株式会社KADOKAWA",
    "KADOKAWA",
    "マイクロマガジン社",
    "講談社",
    "集英社",
    "小学館",
    "ホビージャパン",
    "オーバーラップ",
];

/// The fixed word lists the normalization engine runs on.
///
/// [`TextRules::default`] carries the built-in lists. Tests and callers with their own catalog
/// conventions can substitute any of them.
#[derive(Debug, Clone)]
pub struct TextRules {
    pub imprint_labels: Vec<String>,
    pub side_story_markers: Vec<String>,
    pub side_story_suffixes: Vec<String>,
    pub publisher_leaks: Vec<String>,
}

impl Default for TextRules {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        TextRules {
            imprint_labels: owned(IMPRINT_LABELS),
            side_story_markers: owned(SIDE_STORY_MARKERS),
            side_story_suffixes: owned(SIDE_STORY_SUFFIXES),
            publisher_leaks: owned(PUBLISHER_LEAKS),
        }
    }
}

pub(crate) static DEFAULT_RULES: Lazy<TextRules> = Lazy::new(TextRules::default);

/// [`TextRules::clean_title`] with the built-in lists.
pub fn clean_title(title: &str) -> String {
    DEFAULT_RULES.clean_title(title)
}

/// [`TextRules::resolve_series`] with the built-in lists.
pub fn resolve_series(title: &str, hint: Option<&str>, known_series: &[String]) -> String {
    DEFAULT_RULES.resolve_series(title, hint, known_series)
}

/// [`TextRules::clean_author`] with the built-in lists.
pub fn clean_author(raw: &str) -> Option<String> {
    DEFAULT_RULES.clean_author(raw)
}

pub use title::{format_title, strip_english_subtitle};

/// Translate full-width digits and full-width/ideographic periods to ASCII.
pub fn normalize_fullwidth(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            '．' | '。' => '.',
            _ => c,
        })
        .collect()
}

/// Collapse runs of whitespace (including U+3000) into a single ASCII space and trim.
pub(crate) fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

fn is_edge_punct(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '.' | '．' | '。' | ',' | '，' | '、' | ':' | '：' | ';' | '；' | '-' | '－' | '‐' | '–' | '—'
                | '~' | '〜' | '～' | '・' | '/' | '／' | '=' | '＝'
        )
}

/// Strip punctuation and dashes from the end of `s`.
pub(crate) fn trim_trailing_punct(s: &str) -> &str {
    s.trim_end_matches(is_edge_punct)
}

/// Strip punctuation and dashes from both ends of `s`.
pub(crate) fn trim_punct(s: &str) -> &str {
    s.trim_matches(is_edge_punct)
}

/// Drop bracket pairs with nothing but whitespace inside.
pub(crate) fn drop_empty_brackets(s: &str) -> String {
    static EMPTY_BRACKETS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[（(]\s*[)）]|【\s*】|\[\s*\]|［\s*］").unwrap());
    let mut out = s.to_string();
    // Nested empties like "(())" need more than one pass.
    while EMPTY_BRACKETS.is_match(&out) {
        out = EMPTY_BRACKETS.replace_all(&out, "").into_owned();
    }
    out
}
