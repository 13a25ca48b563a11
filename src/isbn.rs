use std::fmt;

use crate::text::normalize_fullwidth;

/// A structurally valid ISBN-10 or ISBN-13 in compact form (digits only, optional trailing `X`).
///
/// NOTE: The check digit is deliberately not verified. Catalogs occasionally carry ISBNs with bad
/// check digits, and the providers are the ones who decide whether a record exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Isbn {
    compact: String,
}

impl Isbn {
    pub fn parse(identifier: &str) -> Option<Self> {
        let mut s = identifier.trim();

        // Normalise common textual prefixes.
        for prefix in ["ISBN-13:", "ISBN-10:", "ISBN13:", "ISBN10:", "ISBN:", "isbn:", "ISBN"] {
            if let Some(rest) = s.strip_prefix(prefix) {
                s = rest.trim_start();
                break;
            }
        }

        let compact: String = normalize_fullwidth(s)
            .chars()
            .filter(|c| !matches!(c, '-' | '‐' | '－' | ' ' | '\u{3000}'))
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if !compact.is_ascii() {
            return None;
        }

        let (body, last) = compact.split_at(compact.len().checked_sub(1)?);
        let body_ok = body.chars().all(|c| c.is_ascii_digit());
        let valid = match compact.len() {
            13 => body_ok && last.chars().all(|c| c.is_ascii_digit()),
            10 => body_ok && last.chars().all(|c| c.is_ascii_digit() || c == 'X'),
            _ => false,
        };

        valid.then_some(Isbn { compact })
    }

    pub fn as_str(&self) -> &str {
        &self.compact
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact)
    }
}
