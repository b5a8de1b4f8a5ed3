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

//! Token-compressed strings.
//!
//! Strings which occur extremely often in message metadata (MIME keywords,
//! encodings, charsets) are stored as a one-byte dictionary token instead of
//! their literal bytes. The wire form is a single varint `n`:
//!
//! - `n == 0`: the empty string;
//! - `1 <= n <= DICTIONARY.len()`: `DICTIONARY[n - 1]`;
//! - otherwise: a literal of `n - DICTIONARY.len() - 1` UTF-8 bytes follows.
//!
//! The dictionary is part of the on-disk format. Entries may be appended in
//! later format versions but never removed or reordered.

use std::collections::HashMap;
use std::io::{Read, Write};

use lazy_static::lazy_static;

use super::varint;
use crate::support::error::Error;

/// Keywords eligible for single-token compression, in token order.
pub static DICTIONARY: &[&str] = &[
    "7bit",
    "8bit",
    "alternative",
    "application",
    "attachment",
    "base64",
    "binary",
    "boundary",
    "charset",
    "filename",
    "html",
    "image",
    "inline",
    "iso-8859-1",
    "message",
    "mixed",
    "multipart",
    "name",
    "octet-stream",
    "parallel",
    "plain",
    "quoted-printable",
    "related",
    "rfc822",
    "text",
    "us-ascii",
    "utf-8",
];

/// Refuse to allocate for literals longer than this. Real header-derived
/// strings are orders of magnitude shorter; anything bigger is corruption.
const MAX_LITERAL: u64 = 1 << 20;

lazy_static! {
    static ref TOKENS: HashMap<&'static str, u32> = DICTIONARY
        .iter()
        .enumerate()
        .map(|(ix, s)| (*s, ix as u32 + 1))
        .collect();
}

/// Encode `s` to `out`.
pub fn write_string(out: &mut impl Write, s: &str) -> std::io::Result<()> {
    if s.is_empty() {
        return varint::write_u32(out, 0);
    }

    if let Some(&token) = TOKENS.get(s) {
        return varint::write_u32(out, token);
    }

    varint::write_u64(
        out,
        s.len() as u64 + DICTIONARY.len() as u64 + 1,
    )?;
    out.write_all(s.as_bytes())
}

/// Decode a string from `src`.
pub fn read_string(src: &mut impl Read) -> Result<String, Error> {
    let n = varint::read_u64(src)?;
    if 0 == n {
        return Ok(String::new());
    }

    if n <= DICTIONARY.len() as u64 {
        return Ok(DICTIONARY[(n - 1) as usize].to_owned());
    }

    let len = n - DICTIONARY.len() as u64 - 1;
    if len > MAX_LITERAL {
        return Err(Error::BadRecord);
    }

    let mut buf = vec![0u8; len as usize];
    src.read_exact(&mut buf).map_err(|e| {
        if std::io::ErrorKind::UnexpectedEof == e.kind() {
            Error::TruncatedRecord
        } else {
            Error::Io(e)
        }
    })?;

    String::from_utf8(buf).map_err(|_| Error::BadToken)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn flip(s: &str) -> String {
        let mut v = Vec::new();
        write_string(&mut v, s).unwrap();
        read_string(&mut &v[..]).unwrap()
    }

    #[test]
    fn dictionary_words_compress_to_one_byte() {
        for word in DICTIONARY {
            let mut v = Vec::new();
            write_string(&mut v, word).unwrap();
            assert_eq!(1, v.len(), "{} did not compress", word);
            assert_eq!(*word, &flip(word));
        }
    }

    #[test]
    fn empty_string_is_one_byte() {
        let mut v = Vec::new();
        write_string(&mut v, "").unwrap();
        assert_eq!(vec![0x80], v);
        assert_eq!("", flip(""));
    }

    #[test]
    fn near_miss_is_literal() {
        // Case matters: "UTF-8" is not the token "utf-8"
        assert_eq!("UTF-8", flip("UTF-8"));
        assert_eq!("utf-88", flip("utf-88"));
    }

    #[test]
    fn truncated_literal_is_detected() {
        let mut v = Vec::new();
        write_string(&mut v, "hello world").unwrap();
        v.truncate(v.len() - 3);
        assert_matches!(
            Err(crate::support::error::Error::TruncatedRecord),
            read_string(&mut &v[..])
        );
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut v = Vec::new();
        varint::write_u64(&mut v, 2 + DICTIONARY.len() as u64 + 1).unwrap();
        v.extend_from_slice(&[0xff, 0xfe]);
        assert_matches!(
            Err(crate::support::error::Error::BadToken),
            read_string(&mut &v[..])
        );
    }

    proptest! {
        #[test]
        fn round_trip(s in "\\PC*") {
            prop_assert_eq!(&s, &flip(&s));
        }
    }
}
