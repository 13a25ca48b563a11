use once_cell::sync::Lazy;
use regex::Regex;

use super::{NUM, TextRules, normalize_ws, trim_trailing_punct};

/// A volume notation at the end of a provider's series hint, e.g. `"ダンジョン飯 (3)"`.
static TRAILING_VOLUME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        &r"\s*(?:[（(]\s*{N}\s*[)）]|第?\s*{N}\s*[巻話集号]|(?i:vol)\.?\s*{N}|[#＃]\s*{N}|[【\[]\s*{N}\s*[】\]]|\s{N})\s*$"
            .replace("{N}", NUM),
    )
    .unwrap()
});

/// Abbreviations this short and fully upper-case are imprint codes ("MF", "GA"), not series.
const MAX_ABBREVIATION_CHARS: usize = 6;

/// Which rule produced a resolved series name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesOrigin {
    KnownSeries,
    Hint,
    CleanedTitle,
}

impl TextRules {
    /// Decide the series name for a record.
    ///
    /// The known-series corpus wins because it keeps a series under one spelling across the
    /// catalog. A provider hint comes next, unless it looks like an imprint label. The cleaned
    /// title is the fallback.
    pub fn resolve_series(&self, title: &str, hint: Option<&str>, known_series: &[String]) -> String {
        self.resolve_series_with_origin(title, hint, known_series).0
    }

    /// [`TextRules::resolve_series`], also reporting which rule decided.
    pub fn resolve_series_with_origin(
        &self,
        title: &str,
        hint: Option<&str>,
        known_series: &[String],
    ) -> (String, SeriesOrigin) {
        let cleaned = self.clean_title(title);

        if let Some(series) = self.match_known_series(title, &cleaned, known_series) {
            log::debug!("series {series:?} for {title:?} from known series");
            return (series.to_string(), SeriesOrigin::KnownSeries);
        }

        if let Some(series) = hint.and_then(|h| self.accept_hint(h)) {
            log::debug!("series {series:?} for {title:?} from provider hint");
            return (series, SeriesOrigin::Hint);
        }

        log::debug!("series {cleaned:?} for {title:?} from cleaned title");
        (cleaned, SeriesOrigin::CleanedTitle)
    }

    /// The longest plausible known series that `title` or `cleaned` starts with.
    fn match_known_series<'c>(
        &self,
        title: &str,
        cleaned: &str,
        known_series: &'c [String],
    ) -> Option<&'c str> {
        let title_chars = title.chars().count();
        let normalized_title = normalize_ws(trim_trailing_punct(title));
        let mut candidates: Vec<&str> = known_series
            .iter()
            .map(|s| s.as_str())
            .filter(|s| {
                let len = s.chars().count();
                len >= 3
                    && *s != title
                    && *s != normalized_title
                    // A "series" this close to the full title length is an earlier record whose
                    // whole title got stored as its series.
                    && (len as f64) <= title_chars as f64 * 0.8
                    && !self.side_story_markers.iter().any(|m| !m.is_empty() && s.contains(m.as_str()))
            })
            .collect();
        candidates.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
        candidates
            .into_iter()
            .find(|s| title.starts_with(s) || cleaned.starts_with(s))
    }

    /// A provider series hint with its volume suffix removed, unless it is an imprint label.
    pub(crate) fn accept_hint(&self, hint: &str) -> Option<String> {
        let hint = normalize_ws(hint);
        if hint.is_empty() {
            return None;
        }
        if self
            .imprint_labels
            .iter()
            .any(|label| !label.is_empty() && hint.contains(label.as_str()))
        {
            log::debug!("rejecting series hint {hint:?}: imprint label");
            return None;
        }
        if is_abbreviation(&hint) {
            log::debug!("rejecting series hint {hint:?}: abbreviation");
            return None;
        }
        let stripped = TRAILING_VOLUME.replace(&hint, "");
        let stripped = trim_trailing_punct(&stripped).trim();
        (!stripped.is_empty()).then(|| stripped.to_string())
    }
}

fn is_abbreviation(s: &str) -> bool {
    s.chars().count() <= MAX_ABBREVIATION_CHARS
        && s.chars().any(|c| c.is_alphabetic())
        && s.chars()
            .filter(|c| c.is_alphabetic())
            .all(|c| c.is_ascii_uppercase())
}
