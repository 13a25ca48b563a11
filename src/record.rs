use serde::{Deserialize, Serialize};

/// What a single provider (or the merge step) knows about a book.
///
/// Every field is optional. Adapters map empty strings to `None` so that "missing" has exactly one
/// representation once a record leaves the provider boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// May be a real series name, a publisher imprint label, or a full title depending on the
    /// provider. Treated as a hint only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_number: Option<f64>,
}

/// The record handed back to the caller after merging and normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub isbn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_number: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provenance: Vec<Provenance>,
}

/// Where each piece of information in a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub field: String,
    pub source: String,
}

/// The fields of a [`PartialRecord`], used for provenance bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Isbn,
    Title,
    Authors,
    Publisher,
    PublishedDate,
    CoverUrl,
    Description,
    SeriesTitle,
    VolumeNumber,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Isbn,
        Field::Title,
        Field::Authors,
        Field::Publisher,
        Field::PublishedDate,
        Field::CoverUrl,
        Field::Description,
        Field::SeriesTitle,
        Field::VolumeNumber,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Isbn => "isbn",
            Field::Title => "title",
            Field::Authors => "authors",
            Field::Publisher => "publisher",
            Field::PublishedDate => "published_date",
            Field::CoverUrl => "cover_url",
            Field::Description => "description",
            Field::SeriesTitle => "series_title",
            Field::VolumeNumber => "volume_number",
        }
    }
}

impl PartialRecord {
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::Isbn => self.isbn.is_some(),
            Field::Title => self.title.is_some(),
            Field::Authors => self.authors.is_some(),
            Field::Publisher => self.publisher.is_some(),
            Field::PublishedDate => self.published_date.is_some(),
            Field::CoverUrl => self.cover_url.is_some(),
            Field::Description => self.description.is_some(),
            Field::SeriesTitle => self.series_title.is_some(),
            Field::VolumeNumber => self.volume_number.is_some(),
        }
    }

    /// Fields that are populated, in declaration order.
    pub fn present_fields(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(|f| self.has(*f))
    }

    /// Copy every field of `other` that is missing here, returning the fields that were filled.
    pub fn fill_missing(&mut self, other: PartialRecord) -> Vec<Field> {
        let PartialRecord {
            isbn,
            title,
            authors,
            publisher,
            published_date,
            cover_url,
            description,
            series_title,
            volume_number,
        } = other;

        let mut filled = Vec::new();
        let mut fill = |field: Field, slot: &mut Option<String>, value: Option<String>| {
            if slot.is_none() && value.is_some() {
                *slot = value;
                filled.push(field);
            }
        };
        fill(Field::Isbn, &mut self.isbn, isbn);
        fill(Field::Title, &mut self.title, title);
        fill(Field::Authors, &mut self.authors, authors);
        fill(Field::Publisher, &mut self.publisher, publisher);
        fill(Field::PublishedDate, &mut self.published_date, published_date);
        fill(Field::CoverUrl, &mut self.cover_url, cover_url);
        fill(Field::Description, &mut self.description, description);
        fill(Field::SeriesTitle, &mut self.series_title, series_title);
        if self.volume_number.is_none() && volume_number.is_some() {
            self.volume_number = volume_number;
            filled.push(Field::VolumeNumber);
        }
        filled
    }

    /// Map empty or whitespace-only strings to `None`.
    pub fn scrubbed(mut self) -> Self {
        for slot in [
            &mut self.isbn,
            &mut self.title,
            &mut self.authors,
            &mut self.publisher,
            &mut self.published_date,
            &mut self.cover_url,
            &mut self.description,
            &mut self.series_title,
        ] {
            *slot = slot.take().and_then(non_empty);
        }
        self
    }
}

impl NormalizedRecord {
    /// Record `source` as the origin of `field`, replacing any earlier entry.
    pub fn set_source(&mut self, field: Field, source: &str) {
        match self.provenance.iter_mut().find(|p| p.field == field.name()) {
            Some(entry) => entry.source = source.to_string(),
            None => self.provenance.push(Provenance {
                field: field.name().to_string(),
                source: source.to_string(),
            }),
        }
    }

    /// The recorded origin of `field`, if any.
    pub fn source_of(&self, field: Field) -> Option<&str> {
        self.provenance
            .iter()
            .find(|p| p.field == field.name())
            .map(|p| p.source.as_str())
    }
}

/// Trim `s`, returning `None` if nothing is left.
pub fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubbed_treats_blank_strings_as_missing() {
        let record = PartialRecord {
            title: Some("  ".to_string()),
            authors: Some(String::new()),
            publisher: Some(" KADOKAWA ".to_string()),
            ..Default::default()
        }
        .scrubbed();
        assert_eq!(record.title, None);
        assert_eq!(record.authors, None);
        assert_eq!(record.publisher.as_deref(), Some("KADOKAWA"));
    }

    #[test]
    fn present_fields_follow_declaration_order() {
        let record = PartialRecord {
            cover_url: Some("https://example.com/c.jpg".to_string()),
            title: Some("t".to_string()),
            volume_number: Some(2.0),
            ..Default::default()
        };
        let names: Vec<_> = record.present_fields().map(Field::name).collect();
        assert_eq!(names, vec!["title", "cover_url", "volume_number"]);
    }

    #[test]
    fn fill_missing_never_overwrites() {
        let mut base = PartialRecord {
            title: Some("base".to_string()),
            ..Default::default()
        };
        let filled = base.fill_missing(PartialRecord {
            title: Some("other".to_string()),
            authors: Some("someone".to_string()),
            volume_number: Some(3.0),
            ..Default::default()
        });
        assert_eq!(base.title.as_deref(), Some("base"));
        assert_eq!(base.authors.as_deref(), Some("someone"));
        assert_eq!(filled, vec![Field::Authors, Field::VolumeNumber]);
    }

    #[test]
    fn set_source_replaces_existing_entry() {
        let mut record = NormalizedRecord::default();
        record.set_source(Field::Title, "openbd");
        record.set_source(Field::Authors, "openbd");
        record.set_source(Field::Title, "override");
        assert_eq!(record.provenance.len(), 2);
        assert_eq!(record.source_of(Field::Title), Some("override"));
        assert_eq!(record.source_of(Field::Authors), Some("openbd"));
        assert_eq!(record.source_of(Field::Description), None);
    }

    #[test]
    fn normalized_record_omits_missing_fields_in_json() {
        let record = NormalizedRecord {
            isbn: "9784040700001".to_string(),
            title: Some("t".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"isbn":"9784040700001","title":"t"}"#);
    }
}
