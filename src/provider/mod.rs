//! Catalog providers.
//!
//! Each provider maps its own JSON schema onto a [`PartialRecord`]. Network and parse failures are
//! returned as errors; the resolver logs them and carries on as if the provider had no record.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::{isbn::Isbn, record::PartialRecord};

pub mod google_books;
pub mod openbd;
pub mod rakuten;

pub use google_books::GoogleBooks;
pub use openbd::OpenBd;
pub use rakuten::Rakuten;

const USER_AGENT: &str = concat!("bookmeta/", env!("CARGO_PKG_VERSION"));

pub const OPENBD_URL: &str = "https://api.openbd.jp/";
pub const RAKUTEN_URL: &str = "https://app.rakuten.co.jp/services/api/BooksBook/Search/20170404";
pub const GOOGLE_BOOKS_URL: &str = "https://www.googleapis.com/";

pub trait Provider: Send + Sync {
    /// Short machine name, used in logs and provenance.
    fn name(&self) -> &'static str;

    /// Look `isbn` up. `Ok(None)` means the provider has no record for it.
    fn fetch(&self, isbn: &Isbn) -> anyhow::Result<Option<PartialRecord>>;
}

/// Endpoints, credentials and network limits for the built-in providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub openbd_url: String,
    pub rakuten_url: String,
    pub google_books_url: String,
    /// Rakuten application id. Without one, Rakuten is skipped.
    pub rakuten_app_id: Option<String>,
    pub timeout: Duration,
    /// Total attempts against Rakuten while it answers 429.
    pub rate_limit_attempts: u32,
    pub rate_limit_backoff: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            openbd_url: OPENBD_URL.to_string(),
            rakuten_url: RAKUTEN_URL.to_string(),
            google_books_url: GOOGLE_BOOKS_URL.to_string(),
            rakuten_app_id: None,
            timeout: Duration::from_secs(10),
            rate_limit_attempts: 3,
            rate_limit_backoff: Duration::from_secs(1),
        }
    }
}

pub(crate) fn agent(timeout: Duration) -> ureq::Agent {
    let cfg = ureq::Agent::config_builder()
        .timeout_connect(Some(timeout.min(Duration::from_secs(5))))
        .timeout_global(Some(timeout))
        .build();
    ureq::Agent::new_with_config(cfg)
}

pub(crate) fn get_body(agent: &ureq::Agent, url: &Url) -> Result<String, ureq::Error> {
    agent
        .get(url.as_str())
        .header("User-Agent", USER_AGENT)
        .header("Accept", "application/json")
        .call()?
        .into_body()
        .read_to_string()
}

/// Point a cover URL at the best image the host will serve.
///
/// Forces `https`, removes Amazon's size suffix (`._SL75_` and friends), Google Books' page curl
/// effect and Rakuten's thumbnail sizing.
pub fn optimize_cover_url(url: &str) -> String {
    static AMAZON_SIZE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)\._[^/]+_(\.(?:jpg|jpeg|png|gif))").unwrap());

    let mut url = match url.trim().strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.trim().to_string(),
    };

    if url.contains("amazon.com") || url.contains("amazon.co.jp") || url.contains("ssl-images-amazon.com") {
        url = AMAZON_SIZE.replace(&url, "$1").into_owned();
    } else if url.contains("books.google.") {
        url = url.replace("&edge=curl", "");
    } else if url.contains("thumbnail.image.rakuten.co.jp")
        && let Some(idx) = url.find("?_ex=")
    {
        url.truncate(idx);
    }
    url
}
