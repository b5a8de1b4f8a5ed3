//-
// Copyright (c) 2024, the Mailfold authors
//
// This file is part of Mailfold.
//
// Mailfold is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published  by the Free Soft-
// ware Foundation, either version 3 of the License, or (at your option) any
// later version.
//
// Mailfold is distributed  in the hope that  it will be useful,  but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FIT-
// NESS FOR A  PARTICULAR PURPOSE.  See the GNU  General Public  License  for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Mailfold. If not, see <http://www.gnu.org/licenses/>.

//! Best-effort scanning of RFC 2822 header blocks.
//!
//! Real-world mail headers are malformed in every way imaginable, so
//! nothing here ever fails: a line that cannot be understood is simply
//! skipped, and a field that cannot be parsed more deeply is kept as raw
//! text. This layer only needs the handful of envelope fields the summary
//! stores, not a general header model.

use std::borrow::Cow;
use std::io::{self, BufRead};

use chrono::prelude::*;
use memchr::memchr;

/// A scanned header block: name/value pairs in file order, with
/// continuation lines unfolded into single values.
#[derive(Clone, Debug, Default)]
pub struct HeaderBlock {
    fields: Vec<(String, String)>,
}

impl HeaderBlock {
    /// Scan a raw header block.
    ///
    /// `raw` may be a complete message; scanning stops at the first blank
    /// line. Bytes that are not UTF-8 are replaced rather than rejected.
    pub fn scan(raw: &[u8]) -> Self {
        let mut block = HeaderBlock::default();
        let mut rest = raw;

        while !rest.is_empty() {
            let (line, tail) = match memchr(b'\n', rest) {
                Some(ix) => (&rest[..ix], &rest[ix + 1..]),
                None => (rest, &[][..]),
            };
            rest = tail;

            if !block.push_line(trim_cr(line)) {
                break;
            }
        }

        block
    }

    /// Scan headers from `src`, consuming up to and including the blank
    /// line that terminates them.
    ///
    /// The reader is left positioned at the first byte of the body, which is
    /// what the streaming entry constructor needs to go on and measure it.
    pub fn read_from(src: &mut impl BufRead) -> io::Result<Self> {
        let mut block = HeaderBlock::default();
        let mut line = Vec::new();

        loop {
            line.clear();
            if 0 == src.read_until(b'\n', &mut line)? {
                break;
            }

            let trimmed = trim_cr(match line.last() {
                Some(b'\n') => &line[..line.len() - 1],
                _ => &line[..],
            });
            if !block.push_line(trimmed) {
                break;
            }
        }

        Ok(block)
    }

    /// Process one unterminated line; returns false at the end of the block.
    fn push_line(&mut self, line: &[u8]) -> bool {
        if line.is_empty() {
            return false;
        }

        if line[0] == b' ' || line[0] == b'\t' {
            // Folded continuation of the previous field. A continuation
            // with no preceding field is garbage; skip it.
            if let Some((_, value)) = self.fields.last_mut() {
                value.push(' ');
                value.push_str(lossy(line).trim());
            }
            return true;
        }

        match memchr(b':', line) {
            Some(colon) => {
                let name = lossy(&line[..colon]).trim().to_owned();
                let value = lossy(&line[colon + 1..]).trim().to_owned();
                if !name.is_empty() {
                    self.fields.push((name, value));
                }
            },
            // A non-continuation line without a colon is garbage (often a
            // stray mbox "From " line); skip it.
            None => (),
        }

        true
    }

    /// Look up the first field with the given name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Parse an RFC 2822 date header, tolerating the common deviations.
///
/// Returns `None` (not an error) when the value is hopeless; callers fall
/// back to a receive timestamp.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }

    // Strip a trailing "(TZ)" comment, which chrono does not accept.
    if let Some(ix) = value.rfind('(') {
        if let Ok(date) = DateTime::parse_from_rfc2822(value[..ix].trim()) {
            return Some(date.with_timezone(&Utc));
        }
    }

    None
}

/// Split a References (or In-Reply-To) value into individual message ids,
/// angle brackets retained.
pub fn split_references(value: &str) -> Vec<&str> {
    let mut refs = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find('<') {
        let after = &rest[start..];
        match after.find('>') {
            Some(end) => {
                refs.push(&after[..=end]);
                rest = &after[end + 1..];
            },
            None => break,
        }
    }
    refs
}
