use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{
    NUM, TextRules, drop_empty_brackets, normalize_fullwidth, normalize_ws, trim_punct,
    trim_trailing_punct, volume::display_volume,
};

fn with_num(re: &str) -> Regex {
    Regex::new(&re.replace("{N}", NUM)).unwrap()
}

/// Volume markers as they appear in raw titles. Group `m` marks where the marker starts when the
/// regex needs a leading context character.
static MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        with_num(r"[（(]\s*{N}\s*[)）]"),
        with_num(r"第\s*{N}\s*[巻話集号]"),
        with_num(r"{N}\s*[巻話集号]"),
        with_num(r"(?i:vol)\.?\s*{N}"),
        with_num(r"[#＃]\s*{N}"),
        with_num(r"[【\[［]\s*{N}\s*[】\]］]"),
        with_num(r"(?:^|[^0-9０-９.．])(?P<m>[.．。]\s*{N})"),
        with_num(r"\s(?P<m>{N})(?:\s|$)"),
    ]
});

static LEADING_VOLUME: Lazy<Regex> = Lazy::new(|| with_num(r"^\s*(?:{N}\s+)+"));

static ENGLISH_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[=＝].*$").unwrap());

static ENGLISH_GLOSS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[=＝]\s*[A-Za-z][A-Za-z'’:;,!?&\-. ]*").unwrap());

static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[（(]([^（()）]*)[)）]").unwrap());

static NUMERIC_ONLY: Lazy<Regex> = Lazy::new(|| with_num(r"^\s*{N}\s*$"));

/// Remove an English gloss introduced by `=`/`＝`, e.g. `"魔導書 = The Grimoire"`.
///
/// Only the run of Latin text after the sign is removed; Japanese text or a volume numeral that
/// follows the gloss survives.
pub fn strip_english_subtitle(title: &str) -> String {
    normalize_ws(&ENGLISH_GLOSS.replace_all(title, " "))
}

impl TextRules {
    /// Reduce a title to a candidate series name.
    ///
    /// Everything after the first volume marker is dropped along with the marker, on the
    /// assumption that it is subtitle noise.
    pub fn clean_title(&self, title: &str) -> String {
        let mut s = title.to_string();

        for label in &self.imprint_labels {
            if !label.is_empty() {
                s = s.replace(label.as_str(), " ");
            }
        }
        s = drop_empty_brackets(&s);

        s = LEADING_VOLUME.replace(&s, "").into_owned();
        s = ENGLISH_TAIL.replace(&s, "").into_owned();

        // Keep "(3)": it is a volume marker and handled below.
        s = PARENTHETICAL
            .replace_all(&s, |caps: &Captures<'_>| {
                if NUMERIC_ONLY.is_match(&caps[1]) {
                    caps[0].to_string()
                } else {
                    " ".to_string()
                }
            })
            .into_owned();

        if let Some(cut) = self.side_story_start(&s) {
            s.truncate(cut);
        }

        // Trimming can expose a new trailing marker ("タイトル 3."), so cut until nothing changes.
        let mut cleaned = tidy_title(&s);
        while let Some(cut) = first_marker(&cleaned) {
            cleaned.truncate(cut);
            cleaned = tidy_title(&cleaned);
        }

        if cleaned.is_empty() {
            normalize_ws(title)
        } else {
            cleaned
        }
    }

    /// Byte offset of the first side-story keyword that is not at the very start of `s`.
    fn side_story_start(&self, s: &str) -> Option<usize> {
        // ASCII lowercasing keeps byte offsets intact.
        let lower = s.to_ascii_lowercase();
        self.side_story_suffixes
            .iter()
            .filter(|k| !k.is_empty())
            .filter_map(|keyword| {
                let keyword = keyword.to_ascii_lowercase();
                let latin = keyword.chars().any(|c| c.is_ascii_alphabetic());
                lower.match_indices(&keyword).map(|(i, _)| i).find(|&i| {
                    if i == 0 {
                        return false;
                    }
                    if !latin {
                        return true;
                    }
                    let before = lower[..i].chars().next_back();
                    let after = lower[i + keyword.len()..].chars().next();
                    !before.is_some_and(|c| c.is_ascii_alphanumeric())
                        && !after.is_some_and(|c| c.is_ascii_alphabetic())
                })
            })
            .min()
    }
}

fn tidy_title(s: &str) -> String {
    normalize_ws(trim_trailing_punct(&normalize_ws(&drop_empty_brackets(s))))
}

/// Byte offset of the earliest volume marker in `s`.
///
/// A marker at the very start is not a cut point, and neither is anything inside it: `"第3巻"`
/// has no cut even though `"3巻"` also matches.
fn first_marker(s: &str) -> Option<usize> {
    let spans: Vec<(usize, usize)> = MARKERS
        .iter()
        .flat_map(|re| {
            re.captures_iter(s)
                .filter_map(|caps| caps.name("m").or_else(|| caps.get(0)).map(|m| (m.start(), m.end())))
        })
        .collect();
    let leading_end = spans
        .iter()
        .filter(|(start, _)| *start == 0)
        .map(|&(_, end)| end)
        .max()
        .unwrap_or(0);
    spans
        .into_iter()
        .map(|(start, _)| start)
        .filter(|&start| start > 0 && start >= leading_end)
        .min()
}

/// Volume markers once full-width characters have been normalized, most specific first.
static SUBTITLE_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i:vol)\.?\s*\d+(?:\.\d+)?",
        r"[（(]\s*\d+(?:\.\d+)?\s*[)）]",
        r"第\d+(?:\.\d+)?[巻話集号]",
        r"\d+(?:\.\d+)?[巻話集号]",
        r"[#＃]\d+(?:\.\d+)?",
        r"[【\[]\d+(?:\.\d+)?[】\]]",
        r"\.\s*\d+(?:\.\d+)?",
        r"\s+\d+(?:\.\d+)?$",
    ]
    .iter()
    .map(|re| Regex::new(re).unwrap())
    .collect()
});

static DANGLING_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[（(]\s*\d+\.\s*[)）]").unwrap());

/// Remove `volume` and every volume notation from `s`, leaving only subtitle text.
///
/// The bare volume goes first. Otherwise the `.N` marker would eat the ".5" of "8.5" and leave
/// a stray "8" behind.
pub(crate) fn strip_volume_tokens(s: &str, volume: f64) -> String {
    let mut out = blank_token(&normalize_fullwidth(s), &display_volume(volume));
    for re in SUBTITLE_MARKERS.iter() {
        out = re.replace_all(&out, " ").into_owned();
    }
    tidy_subtitle(&out)
}

/// Replace each standalone `token` in `s` with a space.
///
/// Standalone means delimited by whitespace, a bracket, the string edges or a trailing
/// punctuation mark. `"8"` in `"8.5"`, `"3"` in `"Vol.3"` and `"14"` in `"第14巻"` are not.
fn blank_token(s: &str, token: &str) -> String {
    let open = |c: char| c.is_whitespace() || matches!(c, '(' | '（' | '【' | '[' | '［');
    let close = |c: char| c.is_whitespace() || matches!(c, ')' | '）' | '】' | ']' | '］');

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for (i, _) in s.match_indices(token) {
        let end = i + token.len();
        let mut after = s[end..].chars();
        let before_ok = s[..i].chars().next_back().is_none_or(open);
        let after_ok = match after.next() {
            None => true,
            Some('.' | ',' | '、' | '・') => !after.next().is_some_and(|c| c.is_ascii_digit()),
            Some(c) => close(c),
        };
        if before_ok && after_ok {
            out.push_str(&s[last..i]);
            out.push(' ');
            last = end;
        }
    }
    out.push_str(&s[last..]);
    out
}

fn tidy_subtitle(s: &str) -> String {
    let s = DANGLING_DECIMAL.replace_all(s, " ");
    let s = drop_empty_brackets(&s);
    normalize_ws(trim_punct(&normalize_ws(&s)))
}

/// Rebuild a display title as `"{series} {volume} {subtitle}"`.
///
/// Without a series there is nothing to anchor the reconstruction on, so the original title is
/// returned unchanged.
pub fn format_title(original: &str, series: Option<&str>, volume: Option<f64>) -> String {
    let Some(series) = series.map(str::trim).filter(|s| !s.is_empty()) else {
        return original.to_string();
    };

    let remainder = original.replacen(series, " ", 1);
    let subtitle = match volume {
        Some(v) => strip_volume_tokens(&remainder, v),
        None => tidy_subtitle(&normalize_fullwidth(&remainder)),
    };

    let mut parts = vec![series.to_string()];
    match volume {
        Some(v) => parts.push(display_volume(v)),
        None if subtitle.is_empty() => return original.to_string(),
        None => {}
    }
    if !subtitle.is_empty() {
        parts.push(subtitle);
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::clean_title;
    use proptest::strategy::Strategy;

    #[test]
    fn strip_english_subtitle_keeps_japanese_and_volume() {
        assert_eq!(strip_english_subtitle("タイトル = Title Name（サブ）."), "タイトル （サブ）.");
        assert_eq!(
            strip_english_subtitle("魔法科高校の劣等生 = The irregular at magic high school 1 入学編"),
            "魔法科高校の劣等生 1 入学編"
        );
        assert_eq!(strip_english_subtitle("ノルウェイの森"), "ノルウェイの森");
    }

    #[test]
    fn clean_title_drops_volume_and_everything_after() {
        assert_eq!(clean_title("ダンジョン飯 第8巻 特装版 2021"), "ダンジョン飯");
        assert_eq!(clean_title("転生したらスライムだった件 (8)"), "転生したらスライムだった件");
        assert_eq!(clean_title("ソードアート・オンライン 2 アインクラッド"), "ソードアート・オンライン");
        assert_eq!(clean_title("Fate/Zero Vol.3 王たちの狂宴"), "Fate/Zero");
        assert_eq!(clean_title("シリーズ名 ８．５"), "シリーズ名");
    }

    #[test]
    fn clean_title_removes_decorations() {
        assert_eq!(clean_title("とある魔術の禁書目録 (電撃文庫)"), "とある魔術の禁書目録");
        assert_eq!(clean_title("3 ゼロの使い魔"), "ゼロの使い魔");
        assert_eq!(clean_title("魔導書 = The Grimoire"), "魔導書");
        assert_eq!(clean_title("狼と香辛料（新装版）"), "狼と香辛料");
        assert_eq!(clean_title("幼女戦記 外伝"), "幼女戦記");
        assert_eq!(clean_title("リゼロ SS集"), "リゼロ");
        assert_eq!(clean_title("Re:Monster side story"), "Re:Monster");
    }

    #[test]
    fn clean_title_keeps_latin_words_containing_keywords() {
        assert_eq!(clean_title("Classroom of the Elite"), "Classroom of the Elite");
        assert_eq!(clean_title("APPENDIX"), "APPENDIX");
    }

    #[test]
    fn clean_title_never_returns_empty() {
        assert_eq!(clean_title("(3)"), "(3)");
        assert_eq!(clean_title("  "), "");
        assert_eq!(clean_title("第3巻"), "第3巻");
        assert_eq!(clean_title("【12】"), "【12】");
    }

    #[test]
    fn clean_title_cuts_numeral_before_trailing_punctuation() {
        assert_eq!(clean_title("タイトル 3."), "タイトル");
        assert_eq!(clean_title("タイトル 3・"), "タイトル");
        assert_eq!(clean_title("タイトル 3. (電撃文庫)"), "タイトル");
    }

    fn decorated_title() -> impl Strategy<Value = String> {
        let bases = vec![
            "転生したらスライムだった件",
            "ダンジョン飯",
            "Fate/Zero",
            "ソードアート・オンライン",
            "魔法科高校の劣等生",
            "SS",
            "ノルウェイの森",
        ];
        let decorations = vec![
            "",
            " (8)",
            "（１２）",
            " 第3巻",
            " 4巻",
            " Vol.2",
            " #5",
            "【6】",
            ". 7",
            " 8.5",
            " 3.",
            " 3・",
            " = The Title",
            "（新装版）",
            " 外伝",
            " APPEND",
            " (電撃文庫)",
            " 上",
            " - ",
        ];
        (
            proptest::option::of("[0-9]{1,2} "),
            proptest::sample::select(bases),
            proptest::collection::vec(proptest::sample::select(decorations), 0..4),
        )
            .prop_map(|(lead, base, decos)| {
                format!("{}{}{}", lead.unwrap_or_default(), base, decos.concat())
            })
    }

    #[test]
    fn clean_title_is_idempotent() {
        proptest::proptest!(|(title in decorated_title())| {
            let once = clean_title(&title);
            let twice = clean_title(&once);
            proptest::prop_assert_eq!(&twice, &once);
            proptest::prop_assert!(twice.chars().count() <= once.chars().count());
        })
    }

    #[test]
    fn format_title_reconstructs_series_volume_subtitle() {
        assert_eq!(
            format_title("転生したらスライムだった件（１５） 魔都開国編", Some("転生したらスライムだった件"), Some(15.0)),
            "転生したらスライムだった件 15 魔都開国編"
        );
        assert_eq!(
            format_title("転生したらスライムだった件. 8.5", Some("転生したらスライムだった件"), Some(8.5)),
            "転生したらスライムだった件 8.5"
        );
        assert_eq!(
            format_title("Fate/Zero Vol.3 王たちの狂宴", Some("Fate/Zero"), Some(3.0)),
            "Fate/Zero 3 王たちの狂宴"
        );
    }

    #[test]
    fn format_title_keeps_decimal_volume_before_subtitle() {
        assert_eq!(
            format_title("本好きの下剋上 8.5 短編集", Some("本好きの下剋上"), Some(8.5)),
            "本好きの下剋上 8.5 短編集"
        );
        assert_eq!(
            format_title("本好きの下剋上（８．５） 短編集", Some("本好きの下剋上"), Some(8.5)),
            "本好きの下剋上 8.5 短編集"
        );
    }

    #[test]
    fn strip_volume_tokens_leaves_other_numbers() {
        assert_eq!(strip_volume_tokens(" 8.5 短編集", 8.5), "短編集");
        assert_eq!(strip_volume_tokens(" 3 1984年の物語", 3.0), "1984年の物語");
        assert_eq!(strip_volume_tokens(" 3. 後編", 3.0), "後編");
    }

    #[test]
    fn format_title_without_series_returns_original() {
        assert_eq!(format_title("何か (3)", None, Some(3.0)), "何か (3)");
        assert_eq!(format_title("何か (3)", Some("  "), Some(3.0)), "何か (3)");
    }

    #[test]
    fn format_title_without_volume_keeps_subtitle() {
        assert_eq!(format_title("狼と香辛料（新装版）", Some("狼と香辛料"), None), "狼と香辛料 （新装版）");
        assert_eq!(format_title("狼と香辛料", Some("狼と香辛料"), None), "狼と香辛料");
    }
}
