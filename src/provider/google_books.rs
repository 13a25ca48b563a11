use anyhow::Context;
use serde::Deserialize;
use url::Url;

use super::{Provider, ProviderConfig, agent, get_body, optimize_cover_url};
use crate::{isbn::Isbn, record::PartialRecord};

/// Google Books, the last resort. Mostly useful for covers.
pub struct GoogleBooks {
    base: String,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct Volumes {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: Option<String>,
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    image_links: Option<ImageLinks>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ImageLinks {
    extra_large: Option<String>,
    large: Option<String>,
    medium: Option<String>,
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl GoogleBooks {
    pub fn new(config: &ProviderConfig) -> Self {
        GoogleBooks {
            base: config.google_books_url.clone(),
            agent: agent(config.timeout),
        }
    }

    fn url(&self, isbn: &Isbn) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.base)
            .and_then(|base| base.join("books/v1/volumes"))
            .with_context(|| format!("invalid Google Books base URL {}", self.base))?;
        url.query_pairs_mut().append_pair("q", &format!("isbn:{isbn}"));
        Ok(url)
    }
}

impl Provider for GoogleBooks {
    fn name(&self) -> &'static str {
        "google_books"
    }

    fn fetch(&self, isbn: &Isbn) -> anyhow::Result<Option<PartialRecord>> {
        let body = get_body(&self.agent, &self.url(isbn)?)
            .with_context(|| format!("Google Books request failed for {isbn}"))?;
        parse(&body, isbn)
    }
}

fn parse(body: &str, isbn: &Isbn) -> anyhow::Result<Option<PartialRecord>> {
    let volumes: Volumes = serde_json::from_str(body).context("failed to parse Google Books response")?;
    let Some(Volume { volume_info: info }) = volumes.items.into_iter().next() else {
        return Ok(None);
    };

    let cover = info.image_links.and_then(|links| {
        [links.extra_large, links.large, links.medium, links.thumbnail, links.small_thumbnail]
            .into_iter()
            .flatten()
            .find(|u| !u.trim().is_empty())
            .map(|u| optimize_cover_url(&u))
    });

    // Joined with "/" so that author cleanup keeps the first author only.
    let authors = (!info.authors.is_empty()).then(|| info.authors.join(" / "));

    Ok(Some(
        PartialRecord {
            isbn: Some(isbn.to_string()),
            // Google Books has no series field; its title is the closest thing to a hint.
            series_title: info.title.clone(),
            title: info.title,
            authors,
            publisher: info.publisher,
            published_date: info.published_date,
            cover_url: cover,
            description: info.description,
            volume_number: None,
        }
        .scrubbed(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOUND: &str = r#"{"kind": "books#volumes", "totalItems": 1, "items": [{
        "volumeInfo": {
            "title": "ダンジョン飯 3",
            "authors": ["九井諒子", "編集部"],
            "publishedDate": "2016-08-12",
            "imageLinks": {
                "smallThumbnail": "http://books.google.com/books/content?id=abc&printsec=frontcover&img=1&zoom=5&edge=curl&source=gbs_api",
                "thumbnail": "http://books.google.com/books/content?id=abc&printsec=frontcover&img=1&zoom=1&edge=curl&source=gbs_api"
            }
        }
    }]}"#;

    fn isbn() -> Isbn {
        Isbn::parse("9784040700001").unwrap()
    }

    #[test]
    fn parse_maps_volume_info() {
        let record = parse(FOUND, &isbn()).unwrap().unwrap();
        assert_eq!(record.isbn.as_deref(), Some("9784040700001"));
        assert_eq!(record.title.as_deref(), Some("ダンジョン飯 3"));
        assert_eq!(record.series_title.as_deref(), Some("ダンジョン飯 3"));
        assert_eq!(record.authors.as_deref(), Some("九井諒子 / 編集部"));
        assert_eq!(record.published_date.as_deref(), Some("2016-08-12"));
        assert_eq!(
            record.cover_url.as_deref(),
            Some("https://books.google.com/books/content?id=abc&printsec=frontcover&img=1&zoom=1&source=gbs_api")
        );
    }

    #[test]
    fn parse_without_items_is_no_record() {
        assert_eq!(parse(r#"{"kind": "books#volumes", "totalItems": 0}"#, &isbn()).unwrap(), None);
    }

    #[test]
    fn fetch_queries_by_isbn() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/books/v1/volumes")
            .match_query(mockito::Matcher::UrlEncoded("q".into(), "isbn:9784040700001".into()))
            .with_status(200)
            .with_body(FOUND)
            .create();
        let config = ProviderConfig {
            google_books_url: server.url(),
            ..Default::default()
        };
        let record = GoogleBooks::new(&config).fetch(&isbn()).unwrap();
        assert!(record.is_some());
        mock.assert();
    }
}
