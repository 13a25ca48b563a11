//! The waterfall merge.
//!
//! Providers run strictly in sequence: the primary always, the secondary when the record still
//! has a gap, the tertiary when there is still no cover. Later providers only fill what is
//! missing, except for the title, which has its own "better candidate" rules.

use crate::{
    isbn::Isbn,
    provider::{GoogleBooks, OpenBd, Provider, ProviderConfig, Rakuten},
    record::{Field, NormalizedRecord, PartialRecord, non_empty},
    text::{
        SeriesOrigin, TextRules, extract_volume, format_title, normalize_ws,
        strip_english_subtitle, title::strip_volume_tokens, trim_punct,
    },
};

/// Corrections for books whose upstream data cannot be parsed into the right shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Override {
    pub isbn: &'static str,
    pub title: &'static str,
    pub series_title: &'static str,
    pub volume_number: f64,
}

/// Applied after normalization, so these always win.
pub static OVERRIDES: &[Override] = &[
    // Fan book; the catalogs file it as volume 8.
    Override {
        isbn: "9784896375800",
        title: "転生したらスライムだった件 8.5 公式設定資料集",
        series_title: "転生したらスライムだった件",
        volume_number: 8.5,
    },
    Override {
        isbn: "9784896378450",
        title: "転生したらスライムだった件 13.5",
        series_title: "転生したらスライムだった件",
        volume_number: 13.5,
    },
];

const OVERRIDE_SOURCE: &str = "override";
const KNOWN_SERIES_SOURCE: &str = "known_series";

pub struct Resolver {
    primary: Box<dyn Provider>,
    secondary: Box<dyn Provider>,
    tertiary: Box<dyn Provider>,
    rules: TextRules,
    overrides: &'static [Override],
}

/// A record being merged, with the provider each field came from.
struct Draft {
    record: PartialRecord,
    sources: Vec<(Field, &'static str)>,
}

impl Draft {
    fn new(record: PartialRecord, source: &'static str) -> Self {
        let sources = record.present_fields().map(|f| (f, source)).collect();
        Draft { record, sources }
    }

    fn set_source(&mut self, field: Field, source: &'static str) {
        match self.sources.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = source,
            None => self.sources.push((field, source)),
        }
    }
}

impl Resolver {
    /// OpenBD, then Rakuten Books, then Google Books, with the built-in text rules.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Resolver::with_providers(
            Box::new(OpenBd::new(config)),
            Box::new(Rakuten::new(config)),
            Box::new(GoogleBooks::new(config)),
        )
    }

    pub fn with_providers(
        primary: Box<dyn Provider>,
        secondary: Box<dyn Provider>,
        tertiary: Box<dyn Provider>,
    ) -> Self {
        Resolver {
            primary,
            secondary,
            tertiary,
            rules: TextRules::default(),
            overrides: OVERRIDES,
        }
    }

    pub fn with_rules(mut self, rules: TextRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_overrides(mut self, overrides: &'static [Override]) -> Self {
        self.overrides = overrides;
        self
    }

    /// Resolve `isbn` into a normalized record.
    ///
    /// `known_series` is the set of series names already on file. Returns `None` when no provider
    /// knows the book and there is no override for it.
    pub fn resolve(&self, isbn: &Isbn, known_series: &[String]) -> Option<NormalizedRecord> {
        let mut draft: Option<Draft> = None;

        if let Some(mut base) = fetch(self.primary.as_ref(), isbn) {
            // The primary's titles and series hints often carry an English gloss after "=".
            base.title = base.title.map(|t| strip_english_subtitle(&t)).and_then(non_empty);
            base.series_title = base
                .series_title
                .map(|s| strip_english_subtitle(&s))
                .and_then(non_empty);
            draft = Some(Draft::new(base, self.primary.name()));
        }

        if needs_enrichment(draft.as_ref().map(|d| &d.record)) {
            if let Some(extra) = fetch(self.secondary.as_ref(), isbn) {
                let source = self.secondary.name();
                match draft.as_mut() {
                    Some(d) => self.merge_secondary(d, extra, source),
                    None => draft = Some(Draft::new(extra, source)),
                }
            }
        } else {
            log::debug!("{isbn}: record complete, skipping {}", self.secondary.name());
        }

        if draft.as_ref().is_none_or(|d| d.record.cover_url.is_none()) {
            if let Some(extra) = fetch(self.tertiary.as_ref(), isbn) {
                let source = self.tertiary.name();
                match draft.as_mut() {
                    Some(d) => {
                        if d.record.cover_url.is_none() && extra.cover_url.is_some() {
                            d.record.cover_url = extra.cover_url;
                            d.set_source(Field::CoverUrl, source);
                        }
                    }
                    None => draft = Some(Draft::new(extra, source)),
                }
            }
        } else {
            log::debug!("{isbn}: cover present, skipping {}", self.tertiary.name());
        }

        let record = draft.map(|d| self.finalize(isbn, d, known_series));
        self.apply_override(isbn, record)
    }

    fn merge_secondary(&self, draft: &mut Draft, mut extra: PartialRecord, source: &'static str) {
        if let Some(extra_title) = extra.title.take() {
            match draft.record.title.as_deref() {
                None => {
                    draft.record.title = Some(extra_title);
                    draft.set_source(Field::Title, source);
                }
                Some(base) => {
                    if let Some(merged) = self.merge_titles(base, &extra_title) {
                        log::debug!("title {base:?} merged with {extra_title:?} into {merged:?}");
                        if merged == extra_title {
                            draft.set_source(Field::Title, source);
                        }
                        draft.record.title = Some(merged);
                    }
                }
            }
        }

        for field in draft.record.fill_missing(extra) {
            draft.set_source(field, source);
        }
    }

    /// Pick between the current title and a second provider's title. `None` keeps `base`.
    ///
    /// A second title that contains the first is taken as is. A longer, unrelated one contributes
    /// its extra text as a subtitle, minus the series name and the volume already known.
    fn merge_titles(&self, base: &str, extra: &str) -> Option<String> {
        let compact = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        let (base_compact, extra_compact) = (compact(base), compact(extra));

        if extra_compact.contains(&base_compact) {
            return (extra_compact != base_compact).then(|| extra.to_string());
        }
        if extra.chars().count() <= base.chars().count() || base_compact.contains(&extra_compact) {
            return None;
        }

        let series = self.rules.clean_title(base);
        let remainder = extra.replacen(&series, " ", 1);
        let candidate = match extract_volume(base) {
            Some(volume) => strip_volume_tokens(&remainder, volume),
            None => normalize_ws(trim_punct(&normalize_ws(&remainder))),
        };

        if candidate.is_empty() || compact(base).contains(&compact(&candidate)) {
            return None;
        }
        Some(format!("{base} {candidate}"))
    }

    fn finalize(&self, isbn: &Isbn, draft: Draft, known_series: &[String]) -> NormalizedRecord {
        let Draft { record, sources } = draft;
        let title_source = sources_of(&sources, Field::Title);

        let mut out = NormalizedRecord {
            isbn: record.isbn.clone().unwrap_or_else(|| isbn.to_string()),
            publisher: record.publisher,
            published_date: record.published_date,
            cover_url: record.cover_url,
            description: record.description,
            ..Default::default()
        };
        for (field, source) in &sources {
            if matches!(
                field,
                Field::Isbn | Field::Publisher | Field::PublishedDate | Field::CoverUrl | Field::Description
            ) {
                out.set_source(*field, source);
            }
        }

        if let Some(raw) = record.title.as_deref() {
            let (volume, volume_source) = match extract_volume(raw) {
                Some(v) => (Some(v), title_source),
                None => (record.volume_number, sources_of(&sources, Field::VolumeNumber)),
            };

            let (series, origin) =
                self.rules
                    .resolve_series_with_origin(raw, record.series_title.as_deref(), known_series);
            let series = non_empty(series);
            let series_source = match origin {
                SeriesOrigin::KnownSeries => Some(KNOWN_SERIES_SOURCE),
                SeriesOrigin::Hint => sources_of(&sources, Field::SeriesTitle),
                SeriesOrigin::CleanedTitle => title_source,
            };

            out.title = Some(format_title(raw, series.as_deref(), volume));
            out.series_title = series;
            out.volume_number = volume;

            if let Some(s) = title_source {
                out.set_source(Field::Title, s);
            }
            if out.series_title.is_some()
                && let Some(s) = series_source
            {
                out.set_source(Field::SeriesTitle, s);
            }
            if out.volume_number.is_some()
                && let Some(s) = volume_source
            {
                out.set_source(Field::VolumeNumber, s);
            }
        } else {
            out.series_title = record
                .series_title
                .as_deref()
                .and_then(|h| self.rules.accept_hint(h));
            out.volume_number = record.volume_number;
            for field in [Field::SeriesTitle, Field::VolumeNumber] {
                if let Some(s) = sources_of(&sources, field) {
                    out.set_source(field, s);
                }
            }
        }

        out.authors = record.authors.as_deref().and_then(|a| self.rules.clean_author(a));
        if out.authors.is_some()
            && let Some(s) = sources_of(&sources, Field::Authors)
        {
            out.set_source(Field::Authors, s);
        }

        out
    }

    fn apply_override(&self, isbn: &Isbn, record: Option<NormalizedRecord>) -> Option<NormalizedRecord> {
        let Some(fix) = self.overrides.iter().find(|o| o.isbn == isbn.as_str()) else {
            return record;
        };
        log::debug!("{isbn}: applying override");

        let mut record = record.unwrap_or_else(|| NormalizedRecord {
            isbn: isbn.to_string(),
            ..Default::default()
        });
        record.title = Some(fix.title.to_string());
        record.series_title = Some(fix.series_title.to_string());
        record.volume_number = Some(fix.volume_number);
        for field in [Field::Title, Field::SeriesTitle, Field::VolumeNumber] {
            record.set_source(field, OVERRIDE_SOURCE);
        }
        Some(record)
    }
}

fn sources_of(sources: &[(Field, &'static str)], field: Field) -> Option<&'static str> {
    sources.iter().find(|(f, _)| *f == field).map(|(_, s)| *s)
}

/// Run one provider, demoting failures to "no record".
fn fetch(provider: &dyn Provider, isbn: &Isbn) -> Option<PartialRecord> {
    match provider.fetch(isbn) {
        Ok(Some(record)) => {
            log::debug!("{}: record found for {isbn}", provider.name());
            Some(record)
        }
        Ok(None) => {
            log::debug!("{}: no record for {isbn}", provider.name());
            None
        }
        Err(e) => {
            log::warn!("{}: {e:#}", provider.name());
            None
        }
    }
}

/// Any gap in the record is worth one more provider call.
fn needs_enrichment(record: Option<&PartialRecord>) -> bool {
    let Some(r) = record else {
        return true;
    };
    r.title.is_none()
        || r.authors.is_none()
        || r.cover_url.is_none()
        || r.series_title.is_none()
        || r.title.as_deref().and_then(extract_volume).is_none()
}
