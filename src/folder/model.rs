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

use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use tiny_keccak::{Hasher, Sha3};

/// Uniquely identifies a message within a single folder.
///
/// UIDs start at 1 and increase monotonically as messages are added to the
/// folder. UIDs are never reused; the summary store persists its next-UID
/// counter so restarts cannot reissue one.
///
/// A UID doubles as the addressing key of the body cache, where it appears
/// in decimal string form in file names.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(pub NonZeroU32);

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Uid({})", self.0.get())
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.get())
    }
}

impl Uid {
    pub const MIN: Self = unsafe { Uid(NonZeroU32::new_unchecked(1)) };
    pub const MAX: Self =
        unsafe { Uid(NonZeroU32::new_unchecked(u32::max_value())) };

    pub fn of(uid: u32) -> Option<Self> {
        NonZeroU32::new(uid).map(Uid)
    }

    /// Parse the decimal string form used in cache file names.
    ///
    /// Leading zeroes and non-canonical forms are rejected so that every
    /// on-disk name decodes unambiguously.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || s.starts_with('0') || s.len() > 10 {
            return None;
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse::<u32>().ok().and_then(Uid::of)
    }

    pub fn next(self) -> Option<Self> {
        self.0.get().checked_add(1).and_then(Uid::of)
    }

    #[cfg(test)]
    pub fn u(uid: u32) -> Self {
        Uid::of(uid).unwrap()
    }
}

impl From<Uid> for u32 {
    fn from(uid: Uid) -> u32 {
        uid.0.get()
    }
}

bitflags::bitflags! {
    /// The fixed system-flag bit layout of a message.
    ///
    /// Bits 28..32 are reserved internal bookkeeping: they never mark the
    /// owning store dirty and are never reported through the flag-change
    /// notification hook. Only `PENDING_REMOVAL` is currently assigned;
    /// external callers must not attach meaning to the rest of the range.
    pub struct MessageFlags: u32 {
        const SEEN            = 1 << 0;
        const ANSWERED        = 1 << 1;
        const DELETED         = 1 << 2;
        const FLAGGED         = 1 << 3;
        const DRAFT           = 1 << 4;
        /// The message has at least one attachment part.
        const ATTACHMENTS     = 1 << 5;
        /// A full body for this message is in the body cache.
        const CACHED          = 1 << 6;
        /// Only part of the body was downloaded.
        const PARTIAL         = 1 << 7;
        /// Expunged on the server, awaiting physical removal here.
        const EXPUNGED        = 1 << 8;
        const PRIORITY_HIGH   = 1 << 9;
        const PRIORITY_LOW    = 1 << 10;
        const JUNK            = 1 << 11;

        /// Parked on the summary store's expunged side list between a
        /// `remove` and the save that rewrites the file without it.
        const PENDING_REMOVAL = 1 << 31;
        /// The whole internal range.
        const INTERNAL        = 0xF000_0000;
    }
}

impl MessageFlags {
    /// The user-visible projection of these flags.
    ///
    /// Changes confined to the complement of this projection do not dirty
    /// the store and do not fire change notifications.
    pub fn user_visible(self) -> MessageFlags {
        self & !MessageFlags::INTERNAL
    }
}

impl Default for MessageFlags {
    fn default() -> Self {
        MessageFlags::empty()
    }
}

lazy_static! {
    static ref INTERN_POOL: Mutex<HashSet<Arc<str>>> =
        Mutex::new(HashSet::new());
}

/// Return a shared copy of `s`, deduplicated process-wide.
///
/// Envelope fields repeat heavily across a large folder (the same senders,
/// the same list subjects); interning bounds the memory cost to one copy of
/// each distinct string.
pub fn intern(s: &str) -> Arc<str> {
    let mut pool = INTERN_POOL
        .lock()
        .unwrap_or_else(|poison| poison.into_inner());
    if let Some(existing) = pool.get(s) {
        return Arc::clone(existing);
    }

    let arc: Arc<str> = Arc::from(s);
    pool.insert(Arc::clone(&arc));
    arc
}

/// The 64-bit partial hash used to summarise a Message-ID (and each entry of
/// a References list) without retaining the full string.
///
/// The angle brackets and surrounding whitespace customary in the header
/// form are stripped first, so `<a@b>` and `a@b` hash identically.
pub fn message_id_hash(message_id: &str) -> u64 {
    let trimmed = message_id
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>');

    let mut sha3 = Sha3::v256();
    sha3.update(trimmed.as_bytes());
    let mut digest = [0u8; 32];
    sha3.finalize(&mut digest);

    u64::from_le_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5],
        digest[6], digest[7],
    ])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uid_parse_is_strict() {
        assert_eq!(Some(Uid::u(1)), Uid::parse("1"));
        assert_eq!(Some(Uid::u(4294967295)), Uid::parse("4294967295"));
        assert_eq!(None, Uid::parse(""));
        assert_eq!(None, Uid::parse("0"));
        assert_eq!(None, Uid::parse("01"));
        assert_eq!(None, Uid::parse("1x"));
        assert_eq!(None, Uid::parse("-1"));
        assert_eq!(None, Uid::parse("42949672950"));
    }

    #[test]
    fn user_visible_masks_internal_range() {
        let flags = MessageFlags::SEEN | MessageFlags::PENDING_REMOVAL;
        assert_eq!(MessageFlags::SEEN, flags.user_visible());
    }

    #[test]
    fn intern_dedups() {
        let a = intern("some subject line");
        let b = intern("some subject line");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn message_id_hash_strips_brackets() {
        assert_eq!(
            message_id_hash("<id@example.com>"),
            message_id_hash("  id@example.com ")
        );
        assert_ne!(
            message_id_hash("<id@example.com>"),
            message_id_hash("<id2@example.com>")
        );
    }
}
