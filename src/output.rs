use anyhow::Context;
use biblatex::Bibliography;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    record::NormalizedRecord,
    text::{normalize_fullwidth, normalize_ws, volume::display_volume},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Pretty-printed JSON, one document per record
    #[default]
    Json,
    /// A BibLaTeX @book entry
    Biblatex,
}

pub fn render(record: &NormalizedRecord, format: Format) -> anyhow::Result<String> {
    match format {
        Format::Json => to_json(record),
        Format::Biblatex => to_biblatex(record),
    }
}

pub fn to_json(record: &NormalizedRecord) -> anyhow::Result<String> {
    serde_json::to_string_pretty(record).context("failed to serialise record")
}

/// Render `record` as a BibLaTeX `@book` entry.
///
/// The entry is assembled as text and parsed back with `biblatex`, so anything printed is known to
/// be well formed.
pub fn to_biblatex(record: &NormalizedRecord) -> anyhow::Result<String> {
    let mut fields: Vec<(&str, String)> = Vec::new();
    if let Some(t) = &record.title {
        fields.push(("title", t.clone()));
    }
    if let Some(a) = &record.authors {
        fields.push(("author", a.clone()));
    }
    if let Some(p) = &record.publisher {
        fields.push(("publisher", p.clone()));
    }
    // Unrecognised date formats are left out rather than passed through as garbage.
    if let Some(d) = record.published_date.as_deref().and_then(normalise_date) {
        fields.push(("date", d));
    }
    if let Some(s) = &record.series_title {
        fields.push(("series", s.clone()));
    }
    if let Some(v) = record.volume_number {
        fields.push(("volume", display_volume(v)));
    }
    fields.push(("isbn", record.isbn.clone()));
    if let Some(d) = &record.description {
        fields.push(("abstract", normalize_ws(d)));
    }
    if let Some(c) = &record.cover_url {
        fields.push(("url", c.clone()));
    }

    let mut out = String::new();
    out.push_str("@book{isbn");
    out.push_str(&record.isbn);
    out.push_str(",\n");
    for (k, v) in fields {
        out.push_str("    ");
        out.push_str(k);
        out.push_str(" = {");
        out.push_str(&escape_braces(&v));
        out.push_str("},\n");
    }
    out.push_str("}\n");

    let bib = Bibliography::parse(&out)
        .map_err(|e| anyhow::anyhow!("failed to parse constructed BibLaTeX: {e}"))?;
    let entry = bib
        .iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty bibliography for {}", record.isbn))?;
    Ok(entry.to_biblatex_string())
}

fn escape_braces(s: &str) -> String {
    s.replace('{', "\\{").replace('}', "\\}")
}

/// Turn a provider date into ISO `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
///
/// Understands compact (`20200115`), dashed (`2020-01-15`, `2020-01`), bare years and Japanese
/// (`2020年01月15日頃`, `2020年1月`) forms. Returns `None` for anything else, including impossible
/// calendar dates.
pub fn normalise_date(raw: &str) -> Option<String> {
    static COMPACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})?(?:\D|$)").unwrap());
    static SEPARATED: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(\d{4})(?:\s*[-/.年]\s*(\d{1,2})(?:\s*[-/.月]\s*(\d{1,2}))?)?(?:\D|$)").unwrap()
    });

    let s = normalize_fullwidth(raw.trim());
    let caps = COMPACT.captures(&s).or_else(|| SEPARATED.captures(&s))?;
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = i32::try_from(part(1)?).ok()?;
    match (part(2), part(3)) {
        (Some(month), Some(day)) => {
            NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
        }
        (Some(month), None) => {
            NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.format("%Y-%m").to_string())
        }
        _ => Some(format!("{year:04}")),
    }
}
