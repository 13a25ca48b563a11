use bookmeta::{Isbn, Resolver, output};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Stream};

use crate::cli::{Cli, Command};

mod cli;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Fetch {
            from,
            series,
            format,
            providers,
        } => {
            let known_series = match &series {
                Some(path) => cli::read_lines(path)?,
                None => Vec::new(),
            };
            log::debug!("{} known series loaded", known_series.len());

            let mut identifiers = Vec::new();
            for source in &from {
                identifiers.extend(source.identifiers()?);
            }

            let resolver = Resolver::from_config(&providers.to_config());
            let (ok, failed) = fetch_all(&resolver, &identifiers, &known_series, format);
            print_summary(ok, failed);
        }
    }
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let mut clog = colog::default_builder();
    clog.filter(None, level);
    clog.init();
}

/// Resolve and print each identifier in turn. Returns the number of successes and failures.
fn fetch_all(
    resolver: &Resolver,
    identifiers: &[String],
    known_series: &[String],
    format: output::Format,
) -> (usize, usize) {
    let pb = if identifiers.len() > 1 {
        ProgressBar::new(identifiers.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}") {
        pb.set_style(style);
    }

    let (mut ok, mut failed) = (0, 0);
    for raw in identifiers {
        pb.set_message(raw.clone());
        match fetch_one(resolver, raw, known_series, format) {
            Ok(rendered) => {
                pb.suspend(|| println!("{rendered}"));
                ok += 1;
            }
            Err(e) => {
                pb.suspend(|| eprintln!("{e:#}"));
                failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    (ok, failed)
}

fn fetch_one(
    resolver: &Resolver,
    raw: &str,
    known_series: &[String],
    format: output::Format,
) -> anyhow::Result<String> {
    let isbn = Isbn::parse(raw).ok_or_else(|| anyhow::anyhow!("unrecognised identifier: {raw}"))?;
    let record = resolver
        .resolve(&isbn, known_series)
        .ok_or_else(|| anyhow::anyhow!("not found: {isbn}"))?;
    output::render(&record, format)
}

fn print_summary(ok: usize, failed: usize) {
    eprintln!(
        "{} {}",
        format!("✓ {ok}").if_supports_color(Stream::Stderr, |t| t.green()),
        format!("✗ {failed}").if_supports_color(Stream::Stderr, |t| t.red()),
    );
}
