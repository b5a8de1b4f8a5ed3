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

//! The Content-Info tree: an outline of a message's MIME structure stored
//! alongside its metadata so the client can enumerate parts without
//! refetching the message.
//!
//! This is an outline only; no body content or part headers beyond the
//! fields below are retained. Folders configured without content indexing
//! never carry one.

use std::fmt::Write as _;
use std::io::{self, Read, Write};

use crate::codec::{token, varint};
use crate::support::error::Error;

/// Trees deeper than this are treated as corrupt rather than risking
/// unbounded recursion on decode.
const MAX_DEPTH: u32 = 64;

/// One node of a message's MIME structure outline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentInfo {
    /// Media type, e.g. `multipart` or `text`.
    pub ctype: String,
    /// Media subtype, e.g. `mixed` or `plain`.
    pub subtype: String,
    /// The Content-ID, without angle brackets, if any.
    pub id: String,
    /// The Content-Description, if any.
    pub description: String,
    /// The Content-Transfer-Encoding, if any.
    pub encoding: String,
    /// Decoded size of this part in bytes, 0 when unknown or composite.
    pub size: u32,
    /// Ordered child parts.
    pub children: Vec<ContentInfo>,
}

impl ContentInfo {
    pub fn new(ctype: &str, subtype: &str) -> Self {
        ContentInfo {
            ctype: ctype.to_owned(),
            subtype: subtype.to_owned(),
            ..ContentInfo::default()
        }
    }

    /// Append `child` as the last child of this node.
    pub fn push_child(&mut self, child: ContentInfo) {
        self.children.push(child);
    }

    /// Render the tree depth-first for diagnostics.
    ///
    /// The output format is not stable and not part of the on-disk contract.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(0, &mut out);
        out
    }

    fn dump_into(&self, depth: usize, out: &mut String) {
        let _ = writeln!(
            out,
            "{:indent$}{}/{} size={} id={:?} enc={:?}",
            "",
            self.ctype,
            self.subtype,
            self.size,
            self.id,
            self.encoding,
            indent = depth * 2
        );
        for child in &self.children {
            child.dump_into(depth + 1, out);
        }
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        token::write_string(out, &self.ctype)?;
        token::write_string(out, &self.subtype)?;
        token::write_string(out, &self.id)?;
        token::write_string(out, &self.description)?;
        token::write_string(out, &self.encoding)?;
        varint::write_u32(out, self.size)?;
        varint::write_u64(out, self.children.len() as u64)?;
        for child in &self.children {
            child.write_to(out)?;
        }
        Ok(())
    }

    pub fn read_from(src: &mut impl Read) -> Result<Self, Error> {
        Self::read_at_depth(src, 0)
    }

    fn read_at_depth(src: &mut impl Read, depth: u32) -> Result<Self, Error> {
        if depth > MAX_DEPTH {
            return Err(Error::BadRecord);
        }

        let ctype = token::read_string(src)?;
        let subtype = token::read_string(src)?;
        let id = token::read_string(src)?;
        let description = token::read_string(src)?;
        let encoding = token::read_string(src)?;
        let size = varint::read_u32(src)?;
        let child_count = varint::read_u64(src)?;

        let mut children = Vec::new();
        for _ in 0..child_count {
            children.push(Self::read_at_depth(src, depth + 1)?);
        }

        Ok(ContentInfo {
            ctype,
            subtype,
            id,
            description,
            encoding,
            size,
            children,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> ContentInfo {
        let mut root = ContentInfo::new("multipart", "mixed");
        let mut alt = ContentInfo::new("multipart", "alternative");

        let mut plain = ContentInfo::new("text", "plain");
        plain.encoding = "quoted-printable".to_owned();
        plain.size = 1302;
        alt.push_child(plain);

        let mut html = ContentInfo::new("text", "html");
        html.encoding = "base64".to_owned();
        html.size = 5120;
        alt.push_child(html);

        root.push_child(alt);

        let mut attachment = ContentInfo::new("application", "octet-stream");
        attachment.id = "part2@example".to_owned();
        attachment.description = "report.pdf".to_owned();
        attachment.size = 81290;
        root.push_child(attachment);

        root
    }

    #[test]
    fn round_trip() {
        let root = sample();
        let mut buf = Vec::new();
        root.write_to(&mut buf).unwrap();
        assert_eq!(root, ContentInfo::read_from(&mut &buf[..]).unwrap());
    }

    #[test]
    fn truncation_is_detected() {
        let mut buf = Vec::new();
        sample().write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 4);
        assert_matches!(
            Err(crate::support::error::Error::TruncatedRecord),
            ContentInfo::read_from(&mut &buf[..])
        );
    }

    #[test]
    fn dump_is_depth_first() {
        let dump = sample().dump();
        let lines: Vec<&str> = dump.lines().collect();
        assert!(lines[0].starts_with("multipart/mixed"));
        assert!(lines[1].trim_start().starts_with("multipart/alternative"));
        assert!(lines[2].trim_start().starts_with("text/plain"));
        assert!(lines[3].trim_start().starts_with("text/html"));
        assert!(lines[4].trim_start().starts_with("application/octet-stream"));
    }

    #[test]
    fn pathological_depth_is_rejected() {
        let mut buf = Vec::new();
        // A chain of single-child nodes deeper than the limit
        for _ in 0..70 {
            token::write_string(&mut buf, "multipart").unwrap();
            token::write_string(&mut buf, "mixed").unwrap();
            token::write_string(&mut buf, "").unwrap();
            token::write_string(&mut buf, "").unwrap();
            token::write_string(&mut buf, "").unwrap();
            varint::write_u32(&mut buf, 0).unwrap();
            varint::write_u64(&mut buf, 1).unwrap();
        }
        assert_matches!(
            Err(crate::support::error::Error::BadRecord),
            ContentInfo::read_from(&mut &buf[..])
        );
    }
}
