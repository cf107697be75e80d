//! Random password suggestions.
//!
//! A character set is written as a list of single characters and inclusive
//! ranges, e.g. `0-9A-Za-z!?` or `!-~` for all printable ASCII.

use crate::error::{PassError, Result};
use rand::Rng;

/// Character sets offered when asking for a password.
pub const DEFAULT_CHARSETS: &[&str] = &["!-~", "0-9A-Za-z!?+_()"];

/// Length of suggested passwords.
pub const SUGGESTION_LENGTH: usize = 10;

/// A parsed character set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    ranges: Vec<(char, char)>,
    size: u32,
}

impl Charset {
    pub fn parse(spec: &str) -> Result<Self> {
        let chars: Vec<char> = spec.chars().collect();
        let mut ranges = Vec::new();
        let mut size = 0u32;
        let mut i = 0;

        while i < chars.len() {
            let (start, end) = if i + 2 < chars.len() && chars[i + 1] == '-' {
                let range = (chars[i], chars[i + 2]);
                i += 3;
                range
            } else {
                let single = (chars[i], chars[i]);
                i += 1;
                single
            };

            if start > end {
                return Err(PassError::InvalidCharset(spec.to_string()));
            }
            for (start, end) in skip_surrogates(start, end) {
                size = size
                    .checked_add(end as u32 - start as u32 + 1)
                    .ok_or_else(|| PassError::InvalidCharset(spec.to_string()))?;
                ranges.push((start, end));
            }
        }

        if ranges.is_empty() {
            return Err(PassError::InvalidCharset(spec.to_string()));
        }
        Ok(Self { ranges, size })
    }

    /// Number of characters, counting repeats.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// The `index`-th character across all ranges.
    pub fn nth(&self, mut index: u32) -> Option<char> {
        for &(start, end) in &self.ranges {
            let len = end as u32 - start as u32 + 1;
            if index < len {
                return char::from_u32(start as u32 + index);
            }
            index -= len;
        }
        None
    }

    /// Draw `length` characters uniformly from the set.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, length: usize) -> String {
        (0..length)
            .filter_map(|_| self.nth(rng.gen_range(0..self.size)))
            .collect()
    }
}

/// Split an inclusive range so no part covers U+D800..=U+DFFF, which holds
/// no `char`s.
fn skip_surrogates(start: char, end: char) -> Vec<(char, char)> {
    const BEFORE: char = '\u{D7FF}';
    const AFTER: char = '\u{E000}';
    if start <= BEFORE && end >= AFTER {
        vec![(start, BEFORE), (AFTER, end)]
    } else {
        vec![(start, end)]
    }
}

/// One suggestion per default character set.
pub fn suggestions() -> Vec<String> {
    let mut rng = rand::thread_rng();
    DEFAULT_CHARSETS
        .iter()
        .filter_map(|spec| Charset::parse(spec).ok())
        .map(|charset| charset.generate(&mut rng, SUGGESTION_LENGTH))
        .collect()
}
