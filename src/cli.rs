use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::Context;
use bookmeta::{
    ProviderConfig,
    output::Format,
    provider::{GOOGLE_BOOKS_URL, OPENBD_URL, RAKUTEN_URL},
};
use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the normalized record for one or more ISBNs
    Fetch {
        #[arg(value_name = "SRC", required = true)]
        from: Vec<Source>,

        /// Series titles already on file, one per line
        #[arg(long, value_name = "FILE")]
        series: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        #[command(flatten)]
        providers: ProviderArgs,
    },
}

#[derive(Args, Debug)]
pub struct ProviderArgs {
    /// Rakuten Books application id. Rakuten is skipped without one
    #[arg(long, env = "RAKUTEN_APP_ID", hide_env_values = true)]
    pub rakuten_app_id: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "BOOKMETA_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,

    #[arg(long, env = "BOOKMETA_OPENBD_URL", default_value = OPENBD_URL, hide = true)]
    pub openbd_url: String,

    #[arg(long, env = "BOOKMETA_RAKUTEN_URL", default_value = RAKUTEN_URL, hide = true)]
    pub rakuten_url: String,

    #[arg(long, env = "BOOKMETA_GOOGLE_BOOKS_URL", default_value = GOOGLE_BOOKS_URL, hide = true)]
    pub google_books_url: String,
}

impl ProviderArgs {
    pub fn to_config(&self) -> ProviderConfig {
        ProviderConfig {
            openbd_url: self.openbd_url.clone(),
            rakuten_url: self.rakuten_url.clone(),
            google_books_url: self.google_books_url.clone(),
            rakuten_app_id: self.rakuten_app_id.clone(),
            timeout: Duration::from_secs(self.timeout),
            ..ProviderConfig::default()
        }
    }
}

#[derive(Clone, Debug)]
/// Defines where we can get ISBNs from, which can either be
///
/// - a single identifier, or
/// - a file with one identifier per line.
///
/// The latter will be treated as a list of the former.
pub enum Source {
    Identifier(String),
    File(PathBuf),
}

impl FromStr for Source {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // NOTE: No validation here. An identifier that fails to parse is reported per item later,
        // so one bad line doesn't abort the whole run.

        // Is this a path?
        if let Ok(path) = fs::canonicalize(s) {
            Ok(Source::File(path))
        }
        // No? Must be an identifier then!
        else {
            Ok(Source::Identifier(s.to_string()))
        }
    }
}

impl Source {
    /// The identifiers this source stands for. Blank lines and `#` comments in files are skipped.
    pub fn identifiers(&self) -> anyhow::Result<Vec<String>> {
        match self {
            Source::Identifier(id) => Ok(vec![id.clone()]),
            Source::File(path) => Ok(read_lines(path)?),
        }
    }
}

/// Non-empty, non-comment lines of `path`, trimmed.
pub fn read_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}
