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

//! Open-ended user flag and user tag collections.
//!
//! Names are matched case-sensitively and exactly. Both collections iterate
//! in a stable (lexicographic) order so that their encoded form is
//! deterministic. Setting a flag to `false` or a tag to the empty string is
//! exactly equivalent to removing it; callers rely on that equivalence.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Read, Write};

use super::token;
use super::varint;
use crate::support::error::Error;

/// A set of named boolean flags not predefined by the summary format.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserFlags(BTreeSet<String>);

impl UserFlags {
    pub fn new() -> Self {
        UserFlags::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Set `name` to `value`, returning whether anything changed.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        if value {
            self.0.insert(name.to_owned())
        } else {
            self.0.remove(name)
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        varint::write_u64(out, self.0.len() as u64)?;
        for name in &self.0 {
            token::write_string(out, name)?;
        }
        Ok(())
    }

    pub fn read_from(src: &mut impl Read) -> Result<Self, Error> {
        let count = varint::read_u64(src)?;
        let mut flags = BTreeSet::new();
        for _ in 0..count {
            flags.insert(token::read_string(src)?);
        }
        Ok(UserFlags(flags))
    }
}

/// A map of named string values not predefined by the summary format.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserTags(BTreeMap<String, String>);

impl UserTags {
    pub fn new() -> Self {
        UserTags::default()
    }

    /// Look the tag up by exact name. Absent tags are `None`, never `""`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|s| s.as_str())
    }

    /// Set `name` to `value`, returning whether anything changed.
    ///
    /// An empty `value` removes the tag.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        if value.is_empty() {
            return self.0.remove(name).is_some();
        }

        match self.0.get(name) {
            Some(old) if old == value => false,
            _ => {
                self.0.insert(name.to_owned(), value.to_owned());
                true
            },
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        varint::write_u64(out, self.0.len() as u64)?;
        for (name, value) in &self.0 {
            token::write_string(out, name)?;
            token::write_string(out, value)?;
        }
        Ok(())
    }

    pub fn read_from(src: &mut impl Read) -> Result<Self, Error> {
        let count = varint::read_u64(src)?;
        let mut tags = BTreeMap::new();
        for _ in 0..count {
            let name = token::read_string(src)?;
            let value = token::read_string(src)?;
            // An empty value on disk is a tag a prior version failed to
            // drop; observe the remove-equivalence here too.
            if !value.is_empty() {
                tags.insert(name, value);
            }
        }
        Ok(UserTags(tags))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flag_set_and_unset_report_change() {
        let mut flags = UserFlags::new();
        assert!(flags.set("$Forwarded", true));
        assert!(!flags.set("$Forwarded", true));
        assert!(flags.contains("$Forwarded"));
        assert!(!flags.contains("$forwarded"));

        assert!(flags.set("$Forwarded", false));
        assert!(!flags.set("$Forwarded", false));
        assert!(flags.is_empty());
    }

    #[test]
    fn tag_empty_value_is_removal() {
        let mut tags = UserTags::new();
        assert!(tags.set("label", "work"));
        assert!(!tags.set("label", "work"));
        assert_eq!(Some("work"), tags.get("label"));

        assert!(tags.set("label", ""));
        assert_eq!(None, tags.get("label"));
        assert!(!tags.set("label", ""));
    }

    #[test]
    fn round_trip() {
        let mut flags = UserFlags::new();
        flags.set("$MDNSent", true);
        flags.set("$Forwarded", true);

        let mut tags = UserTags::new();
        tags.set("label", "lists/mailfold");
        tags.set("colour", "red");

        let mut buf = Vec::new();
        flags.write_to(&mut buf).unwrap();
        tags.write_to(&mut buf).unwrap();

        let mut src = &buf[..];
        assert_eq!(flags, UserFlags::read_from(&mut src).unwrap());
        assert_eq!(tags, UserTags::read_from(&mut src).unwrap());
        assert!(src.is_empty());
    }

    #[test]
    fn truncated_list_is_detected() {
        let mut flags = UserFlags::new();
        flags.set("some-rather-long-flag-name", true);

        let mut buf = Vec::new();
        flags.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);
        assert_matches!(
            Err(crate::support::error::Error::TruncatedRecord),
            UserFlags::read_from(&mut &buf[..])
        );
    }
}
