use anyhow::Context;
use serde::Deserialize;
use url::Url;

use super::{Provider, ProviderConfig, agent, get_body, optimize_cover_url};
use crate::{isbn::Isbn, record::PartialRecord};

/// OpenBD, the primary source. Good titles and series hints, frequently without a cover.
pub struct OpenBd {
    base: String,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct Entry {
    #[serde(default)]
    summary: Summary,
    #[serde(default)]
    onix: Option<Onix>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Summary {
    isbn: Option<String>,
    title: Option<String>,
    volume: Option<String>,
    series: Option<String>,
    publisher: Option<String>,
    pubdate: Option<String>,
    cover: Option<String>,
    author: Option<String>,
}

#[derive(Deserialize)]
struct Onix {
    #[serde(rename = "CollateralDetail", default)]
    collateral_detail: Option<CollateralDetail>,
}

#[derive(Deserialize)]
struct CollateralDetail {
    #[serde(rename = "TextContent", default)]
    text_content: Vec<TextContent>,
}

#[derive(Deserialize)]
struct TextContent {
    #[serde(rename = "TextType", default)]
    text_type: Option<String>,
    #[serde(rename = "Text", default)]
    text: Option<String>,
}

impl OpenBd {
    pub fn new(config: &ProviderConfig) -> Self {
        OpenBd {
            base: config.openbd_url.clone(),
            agent: agent(config.timeout),
        }
    }

    fn url(&self, isbn: &Isbn) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.base)
            .and_then(|base| base.join("v1/get"))
            .with_context(|| format!("invalid OpenBD base URL {}", self.base))?;
        url.query_pairs_mut().append_pair("isbn", isbn.as_str());
        Ok(url)
    }
}

impl Provider for OpenBd {
    fn name(&self) -> &'static str {
        "openbd"
    }

    fn fetch(&self, isbn: &Isbn) -> anyhow::Result<Option<PartialRecord>> {
        let body = get_body(&self.agent, &self.url(isbn)?)
            .with_context(|| format!("OpenBD request failed for {isbn}"))?;
        parse(&body)
    }
}

fn parse(body: &str) -> anyhow::Result<Option<PartialRecord>> {
    // The API answers `[null]` for unknown ISBNs.
    let entries: Vec<Option<Entry>> =
        serde_json::from_str(body).context("failed to parse OpenBD response")?;
    let Some(Some(entry)) = entries.into_iter().next() else {
        return Ok(None);
    };

    let description = entry
        .onix
        .and_then(|o| o.collateral_detail)
        .and_then(|cd| {
            // TextType 03 is the long description; anything else is a fallback.
            let mut texts = cd.text_content;
            let idx = texts
                .iter()
                .position(|t| t.text_type.as_deref() == Some("03"))
                .unwrap_or(0);
            (idx < texts.len()).then(|| texts.swap_remove(idx)).and_then(|t| t.text)
        });

    let s = entry.summary;
    let record = PartialRecord {
        isbn: s.isbn,
        title: s.title,
        authors: s.author,
        publisher: s.publisher,
        published_date: s.pubdate,
        cover_url: s.cover.map(|c| optimize_cover_url(&c)),
        description,
        series_title: s.series,
        volume_number: s
            .volume
            .and_then(|v| crate::text::normalize_fullwidth(v.trim()).parse::<f64>().ok()),
    }
    .scrubbed();

    Ok(Some(record))
}
