use std::io::Write;

use assert_cmd::Command;
use mockito::{Matcher, Server, ServerGuard};
use predicates::prelude::*;
use tempfile::NamedTempFile;

const OPENBD_FOUND: &str = r#"[{"summary": {
    "isbn": "9784040700001",
    "title": "オーバーロード 第14巻 滅国の魔女",
    "series": "",
    "publisher": "KADOKAWA",
    "pubdate": "20201130",
    "cover": "",
    "author": "丸山くがね／著"
}}]"#;

const GOOGLE_FOUND: &str = r#"{"totalItems": 1, "items": [{"volumeInfo": {
    "title": "オーバーロード 14",
    "imageLinks": {"thumbnail": "http://books.google.com/books/content?id=x&img=1&zoom=1&edge=curl"}
}}]}"#;

/// The binary, pointed at `server` for every provider and without Rakuten credentials.
fn bookmeta(server: &ServerGuard) -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("bookmeta")?;
    cmd.env("NO_COLOR", "1")
        .env_remove("RAKUTEN_APP_ID")
        .env("BOOKMETA_OPENBD_URL", server.url())
        .env("BOOKMETA_GOOGLE_BOOKS_URL", server.url())
        .env("BOOKMETA_RAKUTEN_URL", format!("{}/rakuten", server.url()))
        .env("BOOKMETA_TIMEOUT", "5");
    Ok(cmd)
}

fn mock_providers(server: &mut ServerGuard, openbd: &str, google: &str) {
    server
        .mock("GET", "/v1/get")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(openbd)
        .create();
    server
        .mock("GET", "/books/v1/volumes")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(google)
        .create();
}

#[test]
fn fetch_single_isbn() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new();
    mock_providers(&mut server, OPENBD_FOUND, GOOGLE_FOUND);

    let output = bookmeta(&server)?.arg("fetch").arg("978-4-04-070000-1").output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;

    let record: serde_json::Value = serde_json::from_str(&stdout)?;
    assert_eq!(record["isbn"], "9784040700001");
    assert_eq!(record["title"], "オーバーロード 14 滅国の魔女");
    assert_eq!(record["series_title"], "オーバーロード");
    assert_eq!(record["volume_number"], 14.0);
    assert_eq!(record["authors"], "丸山くがね");
    assert_eq!(
        record["cover_url"],
        "https://books.google.com/books/content?id=x&img=1&zoom=1"
    );
    assert!(stderr.contains("✓ 1") && stderr.contains("✗ 0"), "stderr summary mismatch. stderr=\n{}", stderr);

    Ok(())
}

#[test]
fn fetch_unknown_isbn() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new();
    mock_providers(&mut server, "[null]", r#"{"totalItems": 0}"#);

    let output = bookmeta(&server)?.arg("fetch").arg("9784040700001").output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;
    assert!(stdout.is_empty(), "stdout should be empty for an unknown ISBN, got=\n{}", stdout);
    assert!(
        stderr.contains("not found: 9784040700001") && stderr.contains("✓ 0") && stderr.contains("✗ 1"),
        "stderr mismatch. stderr=\n{}",
        stderr
    );

    Ok(())
}

#[test]
fn fetch_invalid_identifier() -> Result<(), Box<dyn std::error::Error>> {
    let server = Server::new();

    let output = bookmeta(&server)?.arg("fetch").arg("this-is-not-an-isbn").output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;
    assert!(stdout.is_empty(), "stdout should be empty for invalid identifier, got=\n{}", stdout);
    assert!(
        stderr.contains("unrecognised identifier: this-is-not-an-isbn")
            && stderr.contains("✓ 0")
            && stderr.contains("✗ 1"),
        "stderr mismatch. stderr=\n{}",
        stderr
    );

    Ok(())
}

#[test]
fn override_needs_no_provider_data() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new();
    mock_providers(&mut server, "[null]", r#"{"totalItems": 0}"#);

    bookmeta(&server)?
        .arg("fetch")
        .arg("9784896378450")
        .assert()
        .success()
        .stdout(predicate::str::contains("転生したらスライムだった件 13.5"))
        .stdout(predicate::str::contains("\"volume_number\": 13.5"));

    Ok(())
}

#[test]
fn fetch_from_file_with_known_series_as_biblatex() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new();
    mock_providers(&mut server, OPENBD_FOUND, GOOGLE_FOUND);

    let mut ids = NamedTempFile::new()?;
    writeln!(ids, "# wishlist\n9784040700001\n\nnot-an-isbn\n4040700001")?;
    let mut series = NamedTempFile::new()?;
    writeln!(series, "オーバーロード\nオー")?;

    let output = bookmeta(&server)?
        .arg("fetch")
        .arg(ids.path())
        .arg("--series")
        .arg(series.path())
        .arg("--format")
        .arg("biblatex")
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;

    assert_eq!(stdout.matches("@book{").count(), 2, "stdout=\n{}", stdout);
    assert!(stdout.contains("オーバーロード"), "stdout=\n{}", stdout);
    assert!(stdout.contains("2020-11-30"), "stdout=\n{}", stdout);
    assert!(
        stderr.contains("unrecognised identifier: not-an-isbn")
            && stderr.contains("✓ 2")
            && stderr.contains("✗ 1"),
        "stderr mismatch. stderr=\n{}",
        stderr
    );

    Ok(())
}
