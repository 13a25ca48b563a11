use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::normalize_fullwidth;

/// A named volume notation and the regex that recognises it. Capture group `n` holds the numeral.
pub struct VolumePattern {
    pub name: &'static str,
    pub regex: Regex,
}

const N: &str = r"(?P<n>\d+(?:\.\d+)?)";

fn pattern(name: &'static str, re: &str) -> VolumePattern {
    VolumePattern {
        name,
        regex: Regex::new(&re.replace("{N}", N)).unwrap(),
    }
}

/// Volume notations to try, in order.
///
/// NOTE: Ordering is important here, as it signifies priority. The first pattern that matches
/// anywhere in the title wins, even if a later pattern would match closer to the end. Explicit
/// notations come first so that a stray numeral (a year, a "2nd season") is only read as a volume
/// when nothing better is present. Patterns run on text that went through
/// [`normalize_fullwidth`], so they only need to handle ASCII digits and periods.
pub static VOLUME_PATTERNS: Lazy<Vec<VolumePattern>> = Lazy::new(|| {
    vec![
        pattern("parenthesized", r"[（(]\s*{N}\s*[)）]"),
        pattern("ordinal", r"第\s*{N}\s*[巻話集号]"),
        pattern("counter_suffix", r"{N}\s*[巻話集号]\s*$"),
        pattern("vol", r"(?:Vol|VOL|vol)\.?\s*{N}"),
        pattern("hash", r"[#＃]\s*{N}"),
        pattern("bracketed", r"[【\[]\s*{N}\s*[】\]]"),
        // The leading class keeps "8.5" from being read as ".5".
        pattern("period", r"(?:^|[^\d.])\.\s*{N}"),
        pattern("trailing", r"\s{N}\s*$"),
    ]
});

fn numeral(caps: &Captures<'_>) -> Option<f64> {
    caps.name("n")?.as_str().parse().ok()
}

/// Pull a volume number out of `title`.
///
/// Returns `None` when no notation matches; that is the normal outcome for standalone books.
pub fn extract_volume(title: &str) -> Option<f64> {
    let normalized = normalize_fullwidth(title);
    VOLUME_PATTERNS.iter().find_map(|p| {
        let caps = p.regex.captures(&normalized)?;
        let n = numeral(&caps)?;
        log::trace!("volume {n} from {:?} via {}", title, p.name);
        Some(n)
    })
}

/// Render a volume the way it is shown in titles: `3` rather than `3.0`, `8.5` as is.
pub fn display_volume(volume: f64) -> String {
    if volume.fract() == 0.0 && volume.abs() < 1e15 {
        format!("{}", volume as i64)
    } else {
        format!("{volume}")
    }
}
