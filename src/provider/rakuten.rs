use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use super::{Provider, ProviderConfig, agent, get_body, optimize_cover_url};
use crate::{isbn::Isbn, record::PartialRecord};

/// Rakuten Books. Needs an application id and rate limits aggressively.
pub struct Rakuten {
    endpoint: String,
    app_id: Option<String>,
    attempts: u32,
    backoff: Duration,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct Response {
    #[serde(rename = "Items", default)]
    items: Vec<ItemWrapper>,
}

#[derive(Deserialize)]
struct ItemWrapper {
    #[serde(rename = "Item")]
    item: Item,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Item {
    isbn: Option<String>,
    title: Option<String>,
    author: Option<String>,
    publisher_name: Option<String>,
    sales_date: Option<String>,
    large_image_url: Option<String>,
    medium_image_url: Option<String>,
    small_image_url: Option<String>,
    item_caption: Option<String>,
    series_name: Option<String>,
}

impl Rakuten {
    pub fn new(config: &ProviderConfig) -> Self {
        Rakuten {
            endpoint: config.rakuten_url.clone(),
            app_id: config.rakuten_app_id.clone().filter(|id| !id.trim().is_empty()),
            attempts: config.rate_limit_attempts.max(1),
            backoff: config.rate_limit_backoff,
            agent: agent(config.timeout),
        }
    }
}

impl Provider for Rakuten {
    fn name(&self) -> &'static str {
        "rakuten"
    }

    fn fetch(&self, isbn: &Isbn) -> anyhow::Result<Option<PartialRecord>> {
        let Some(app_id) = self.app_id.as_deref() else {
            log::info!("rakuten: no application id configured, skipping");
            return Ok(None);
        };

        let mut url = Url::parse(&self.endpoint)
            .with_context(|| format!("invalid Rakuten endpoint {}", self.endpoint))?;
        url.query_pairs_mut()
            .append_pair("applicationId", app_id)
            .append_pair("isbn", isbn.as_str())
            .append_pair("format", "json");

        let mut attempt = 1;
        let body = loop {
            match get_body(&self.agent, &url) {
                Ok(body) => break body,
                Err(ureq::Error::StatusCode(429)) if attempt < self.attempts => {
                    log::debug!(
                        "rakuten: rate limited on attempt {attempt}/{}, retrying in {:?}",
                        self.attempts,
                        self.backoff
                    );
                    std::thread::sleep(self.backoff);
                    attempt += 1;
                }
                Err(ureq::Error::StatusCode(429)) => {
                    log::warn!("rakuten: still rate limited after {attempt} attempts, giving up on {isbn}");
                    return Ok(None);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Rakuten request failed for {isbn}"));
                }
            }
        };

        parse(&body)
    }
}

fn parse(body: &str) -> anyhow::Result<Option<PartialRecord>> {
    let response: Response = serde_json::from_str(body).context("failed to parse Rakuten response")?;
    let Some(ItemWrapper { item }) = response.items.into_iter().next() else {
        return Ok(None);
    };

    let cover = [item.large_image_url, item.medium_image_url, item.small_image_url]
        .into_iter()
        .flatten()
        .find(|u| !u.trim().is_empty())
        .map(|u| optimize_cover_url(&u));

    Ok(Some(
        PartialRecord {
            isbn: item.isbn,
            title: item.title,
            authors: item.author,
            publisher: item.publisher_name,
            published_date: item.sales_date,
            cover_url: cover,
            description: item.item_caption,
            series_title: item.series_name,
            volume_number: None,
        }
        .scrubbed(),
    ))
}
