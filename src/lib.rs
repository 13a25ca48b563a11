//! Resolve an ISBN into a normalized bibliographic record.
//!
//! Three catalog providers are queried as a waterfall (OpenBD, Rakuten Books, Google Books) and
//! their partial records merged. The merged title is then taken apart into series name, volume
//! number and subtitle by the [`text`] engine, which is tuned for Japanese light novel and manga
//! titles.

pub mod isbn;
pub mod output;
pub mod provider;
pub mod record;
pub mod resolver;
pub mod text;

pub use isbn::Isbn;
pub use provider::{Provider, ProviderConfig};
pub use record::{NormalizedRecord, PartialRecord, Provenance};
pub use resolver::Resolver;
