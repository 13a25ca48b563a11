use once_cell::sync::Lazy;
use regex::Regex;

use super::{TextRules, drop_empty_brackets, normalize_ws};

/// `"山田太郎, 1975-"`: a birth year, optionally open-ended, after the name.
static BIRTH_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,，]?\s*\d{4}\s*[-－‐–—]?\s*$").unwrap());

/// Role annotations such as `" 著"`, `"[作]"` or `"（イラスト）"`. A bare role needs a space before it
/// so names ending in 文 or 画 survive.
static ROLE: Lazy<Regex> = Lazy::new(|| {
    let roles = "著|作|文|原作|原案|訳|イラスト|絵|画|漫画";
    Regex::new(&format!(r"(?:\s*[\[［(（](?:{roles})[\]］)）]|\s+(?:{roles}))\s*$")).unwrap()
});

impl TextRules {
    /// Reduce a raw author field to a single display name.
    ///
    /// Only the first of several `/`-separated contributors is kept. Commas become spaces, so
    /// `"Surname, Given"` keeps its token order.
    pub fn clean_author(&self, raw: &str) -> Option<String> {
        let first = raw.split(['/', '／']).next().unwrap_or_default();

        let mut name = BIRTH_YEAR.replace(first.trim(), "").into_owned();
        name = ROLE.replace(&name, "").into_owned();
        name = name.replace([',', '，'], " ");
        for leak in &self.publisher_leaks {
            if !leak.is_empty() {
                name = name.replace(leak.as_str(), " ");
            }
        }

        let name = normalize_ws(&drop_empty_brackets(&name));
        (!name.is_empty()).then_some(name)
    }
}

#[cfg(test)]
mod tests {
    use crate::text::clean_author;

    #[test]
    fn keeps_first_author_and_drops_birth_year() {
        assert_eq!(clean_author("山田太郎, 1975- / 佐藤花子").as_deref(), Some("山田太郎"));
        assert_eq!(clean_author("伏瀬／みっつばー").as_deref(), Some("伏瀬"));
    }

    #[test]
    fn commas_become_spaces() {
        assert_eq!(clean_author("Tolkien, J. R. R.").as_deref(), Some("Tolkien J. R. R."));
        assert_eq!(clean_author("Murakami, Haruki, 1949-").as_deref(), Some("Murakami Haruki"));
    }

    #[test]
    fn strips_publisher_leaks_and_roles() {
        assert_eq!(clean_author("川原礫 (KADOKAWA)").as_deref(), Some("川原礫"));
        assert_eq!(clean_author("丸山くがね［著］").as_deref(), Some("丸山くがね"));
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(clean_author("  九井　 諒子 ").as_deref(), Some("九井 諒子"));
    }

    #[test]
    fn empty_input_has_no_author() {
        assert_eq!(clean_author(""), None);
        assert_eq!(clean_author(" / 佐藤花子"), None);
        assert_eq!(clean_author("KADOKAWA"), None);
    }
}
