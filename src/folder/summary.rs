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

//! The per-folder summary store: the single source of truth for "what
//! messages exist and what do we know about them without contacting the
//! server".
//!
//! ## On-disk form
//!
//! A summary file is `[header][entry record]*`. The header is fixed-size,
//! little-endian:
//!
//! ```text
//! version:                  u32
//! flags:                    u32  (bit 0: dirty at last write)
//! next_uid:                 u32
//! timestamp:                i64  (monotonic, bumped on every save)
//! saved_count:              u32
//! unread_count:             u32
//! deleted_count:            u32
//! junk_count:               u32
//! message_info_record_size: u32  (field-layout version of entry records)
//! content_info_record_size: u32  (field-layout version of content nodes)
//! ```
//!
//! Entry records follow, length-framed (see `folder::entry`). A decode error
//! in one record drops that record only; a header decode error fails the
//! whole load.
//!
//! ## States
//!
//! A store is `Unloaded` until asked to load, `HeaderLoaded` once the header
//! alone has been read (folder counts without materialising any entries),
//! and `FullyLoaded` thereafter. Dirtiness is orthogonal and only meaningful
//! once fully loaded.
//!
//! ## Locking
//!
//! All mutable state sits behind one internal mutex per store, so any thread
//! may call any operation. `save` additionally demands the account-wide
//! structural lock (`support::locking`) to serialise whole-file rewrites
//! against multi-store sequences.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::prelude::*;
use log::{info, warn};

use super::entry::{FlagChange, Message, MessageEntry};
use super::meta::{MetaSummary, META_MAJOR, META_MINOR};
use super::model::{MessageFlags, Uid};
use crate::support::error::Error;
use crate::support::file_ops;
use crate::support::locking::StoreLockGuard;

/// Version of the summary file container format.
pub const FORMAT_VERSION: u32 = 1;
/// Field-layout version of entry records, stored in the header so readers
/// can tell a layout change from container-level corruption.
pub const MESSAGE_INFO_RECORD_SIZE: u32 = 14;
/// Field-layout version of content-info nodes.
pub const CONTENT_INFO_RECORD_SIZE: u32 = 7;

/// Header flag: the store was dirty when this file was written. Always
/// written clear by `save` (which by definition makes the file current);
/// reserved so recovery tools can mark files they rewrite.
const HEADER_FLAG_DIRTY: u32 = 1 << 0;

/// Hook for the folder collaborator: called (outside the store's lock)
/// whenever a message's user-visible flags change.
pub trait FlagListener: Send + Sync {
    fn message_flags_changed(&self, uid: Uid);
}

/// Lookup interface the body cache uses at reconciliation time.
pub trait UidLookup {
    fn contains_uid(&self, uid: Uid) -> bool;
}

/// Configuration fixed at store construction.
#[derive(Clone, Copy, Debug)]
pub struct SummaryConfig {
    /// Whether entries carry a Content-Info tree. Folders that never show
    /// structure (e.g. news-style folders) leave this off to keep the
    /// summary small.
    pub index_content: bool,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        SummaryConfig {
            index_content: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadState {
    Unloaded,
    HeaderLoaded,
    FullyLoaded,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Counts {
    total: u32,
    unread: u32,
    deleted: u32,
    junk: u32,
}

impl Counts {
    /// Apply one entry's contribution, `delta` being +1 or -1.
    fn apply(&mut self, flags: MessageFlags, delta: i64) {
        let bump = |count: &mut u32| {
            *count = (i64::from(*count) + delta).max(0) as u32;
        };
        bump(&mut self.total);
        if !flags.contains(MessageFlags::SEEN) {
            bump(&mut self.unread);
        }
        if flags.contains(MessageFlags::DELETED) {
            bump(&mut self.deleted);
        }
        if flags.contains(MessageFlags::JUNK) {
            bump(&mut self.junk);
        }
    }
}

struct SummaryState {
    load: LoadState,
    dirty: bool,
    /// The next UID this store will assign. Strictly greater than every UID
    /// it has ever assigned; persisted so restarts cannot reuse one.
    next_uid: u32,
    timestamp: i64,
    counts: Counts,
    /// Live entries, in an order stable for the lifetime of this load.
    entries: Vec<MessageEntry>,
    /// UID to position in `entries`; always consistent with it.
    by_uid: HashMap<Uid, usize>,
    /// Removed entries pending physical removal at the next save.
    expunged: Vec<MessageEntry>,
    any_expunged: bool,
}

pub struct SummaryStore {
    path: PathBuf,
    /// Staging directory for atomic writes; same filesystem as `path`.
    tmp: PathBuf,
    config: SummaryConfig,
    listener: Mutex<Option<Arc<dyn FlagListener>>>,
    inner: Mutex<SummaryState>,
}

impl SummaryStore {
    /// Create a handle on the summary file at `path`.
    ///
    /// Nothing is read from disk until a load is requested.
    pub fn new(path: impl Into<PathBuf>, config: SummaryConfig) -> Self {
        let path = path.into();
        let tmp = path
            .parent()
            .map(Path::to_owned)
            .unwrap_or_else(|| PathBuf::from("."));
        SummaryStore {
            path,
            tmp,
            config,
            listener: Mutex::new(None),
            inner: Mutex::new(SummaryState {
                load: LoadState::Unloaded,
                dirty: false,
                next_uid: 1,
                timestamp: 0,
                counts: Counts::default(),
                entries: Vec::new(),
                by_uid: HashMap::new(),
                expunged: Vec::new(),
                any_expunged: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Install the collaborator notified of user-visible flag changes.
    pub fn set_listener(&self, listener: Option<Arc<dyn FlagListener>>) {
        *self.lock_listener() = listener;
    }

    pub fn load_state(&self) -> LoadState {
        self.lock_inner().load
    }

    pub fn is_dirty(&self) -> bool {
        self.lock_inner().dirty
    }

    // ==================== Loading ====================

    /// Read the header only, making folder counts available without
    /// materialising any entries.
    ///
    /// A missing file is an empty, never-saved folder, not an error. A no-op
    /// if the store is already at least header-loaded.
    pub fn load_header(&self) -> Result<(), Error> {
        let mut state = self.lock_inner();
        if state.load >= LoadState::HeaderLoaded {
            return Ok(());
        }

        match fs::File::open(&self.path) {
            Ok(file) => {
                let mut reader = BufReader::new(file);
                read_header(&mut reader, &mut state)?;
            },
            Err(ref e) if io::ErrorKind::NotFound == e.kind() => (),
            Err(e) => return Err(e.into()),
        }

        state.load = LoadState::HeaderLoaded;
        Ok(())
    }

    /// Fully load the store.
    ///
    /// Individual records that fail to decode are dropped (with a warning);
    /// a header that fails to decode aborts the load. A missing file loads
    /// as an empty folder. A no-op if already fully loaded.
    pub fn load(&self) -> Result<(), Error> {
        let mut state = self.lock_inner();
        if LoadState::FullyLoaded == state.load {
            return Ok(());
        }

        // True only when a header-loaded reservation advanced next_uid; that
        // reservation still needs a save to become durable.
        let was_dirty = state.dirty;

        state.entries.clear();
        state.by_uid.clear();
        state.expunged.clear();

        match fs::File::open(&self.path) {
            Ok(file) => {
                let mut reader = BufReader::new(file);
                read_header(&mut reader, &mut state)?;
                self.read_entries(&mut reader, &mut state)?;
            },
            Err(ref e) if io::ErrorKind::NotFound == e.kind() => {
                state.next_uid = state.next_uid.max(1);
            },
            Err(e) => return Err(e.into()),
        }

        if let Ok(Some(meta)) = MetaSummary::load(&self.path) {
            state.any_expunged = meta.any_expunged;
        }

        // Counts are recomputed from what actually loaded; the header's
        // copies are only authoritative for header-only readers.
        let mut counts = Counts::default();
        for entry in &state.entries {
            counts.apply(entry.flags(), 1);
        }
        state.counts = counts;

        state.load = LoadState::FullyLoaded;
        state.dirty = was_dirty;
        Ok(())
    }

    fn read_entries(
        &self,
        reader: &mut impl BufRead,
        state: &mut SummaryState,
    ) -> Result<(), Error> {
        let mut dropped = 0u32;

        loop {
            if reader.fill_buf()?.is_empty() {
                break;
            }

            let mut entry = match MessageEntry::read_record(reader) {
                Ok(entry) => entry,
                Err(Error::Io(e)) => return Err(e.into()),
                Err(_) => {
                    dropped += 1;
                    continue;
                },
            };

            // Internal scratch bits are transient state and must not
            // resurrect across loads.
            entry.set_flags(MessageFlags::INTERNAL, false);
            if !self.config.index_content {
                entry.set_content(None);
            }

            let uid = match entry.uid() {
                Some(uid) => uid,
                None => {
                    dropped += 1;
                    continue;
                },
            };
            if state.by_uid.contains_key(&uid) {
                dropped += 1;
                continue;
            }

            state.next_uid =
                state.next_uid.max(u32::from(uid).saturating_add(1));
            state.by_uid.insert(uid, state.entries.len());
            state.entries.push(entry);
        }

        if 0 != dropped {
            warn!(
                "{}: dropped {} unreadable summary record(s)",
                self.path.display(),
                dropped
            );
        }

        Ok(())
    }

    // ==================== Saving ====================

    /// Atomically rewrite the summary file (and its meta-summary) from the
    /// in-memory state, clearing the dirty flag on success.
    ///
    /// The caller supplies proof of the account's structural lock; a failed
    /// save leaves the previous file intact.
    pub fn save(&self, _structural: &StoreLockGuard<'_>) -> Result<(), Error> {
        let mut state = self.lock_inner();
        if LoadState::FullyLoaded != state.load {
            return Err(Error::NotLoaded);
        }

        state.timestamp = state.timestamp.wrapping_add(1).max(
            Utc::now().timestamp(),
        );

        let mut buf = Vec::new();
        write_header(&mut buf, &state)?;
        for entry in &state.entries {
            entry.write_record(&mut buf)?;
        }

        file_ops::spit(&self.tmp, &self.path, true, &buf)?;

        MetaSummary {
            major: META_MAJOR,
            minor: META_MINOR,
            uid_len: decimal_width(state.next_uid),
            any_expunged: state.any_expunged,
        }
        .save(&self.path, &self.tmp)?;

        let physically_removed = state.expunged.len();
        state.expunged.clear();
        state.dirty = false;

        if 0 != physically_removed {
            info!(
                "{}: compacted {} expunged entr(y/ies)",
                self.path.display(),
                physically_removed
            );
        }
        Ok(())
    }

    // ==================== Mutation ====================

    /// Insert `entry`, assigning a UID if it does not already carry one.
    ///
    /// Returns the entry's UID. Inserting a UID that is already live fails
    /// with `DuplicateUid` before any state changes.
    pub fn add(&self, mut entry: MessageEntry) -> Result<Uid, Error> {
        let mut state = self.lock_inner();
        if LoadState::FullyLoaded != state.load {
            return Err(Error::NotLoaded);
        }

        let uid = match entry.uid() {
            Some(uid) => {
                if state.by_uid.contains_key(&uid) {
                    return Err(Error::DuplicateUid(uid.into()));
                }
                state.next_uid =
                    state.next_uid.max(u32::from(uid).saturating_add(1));
                uid
            },
            None => {
                let uid =
                    Uid::of(state.next_uid).ok_or(Error::UidExhausted)?;
                state.next_uid =
                    state.next_uid.checked_add(1).ok_or(Error::UidExhausted)?;
                entry.assign_uid(uid);
                uid
            },
        };

        if !self.config.index_content {
            entry.set_content(None);
        }

        let counts_flags = entry.flags();
        let position = state.entries.len();
        state.by_uid.insert(uid, position);
        state.entries.push(entry);
        state.counts.apply(counts_flags, 1);
        state.dirty = true;
        Ok(uid)
    }

    /// Build an entry from a raw header block and insert it.
    pub fn add_from_headers(&self, raw: &[u8]) -> Result<Uid, Error> {
        self.add(MessageEntry::from_headers(raw))
    }

    /// Build an entry from a reader positioned at a message and insert it.
    pub fn add_from_stream(
        &self,
        src: &mut impl BufRead,
    ) -> Result<Uid, Error> {
        self.add(MessageEntry::from_stream(src)?)
    }

    /// Build an entry from a materialised message and insert it.
    pub fn add_from_message(&self, message: &Message) -> Result<Uid, Error> {
        self.add(MessageEntry::from_message(message))
    }

    /// Remove the entry with the given UID.
    ///
    /// The entry is parked on the expunged side list until the next save
    /// physically drops it from the file. Returns whether anything was
    /// removed; a UID with no live entry is a no-op.
    pub fn remove_uid(&self, uid: Uid) -> Result<bool, Error> {
        let mut state = self.lock_inner();
        if LoadState::FullyLoaded != state.load {
            return Err(Error::NotLoaded);
        }

        Ok(remove_position(&mut state, uid))
    }

    /// Remove the entry at the given live position.
    ///
    /// Positions are not stable across removals; callers address by UID
    /// unless they are iterating destructively.
    pub fn remove_at(&self, index: usize) -> Result<Option<Uid>, Error> {
        let mut state = self.lock_inner();
        if LoadState::FullyLoaded != state.load {
            return Err(Error::NotLoaded);
        }

        let uid = match state.entries.get(index).and_then(MessageEntry::uid) {
            Some(uid) => uid,
            None => return Ok(None),
        };
        remove_position(&mut state, uid);
        Ok(Some(uid))
    }

    /// Remove every live entry whose UID falls in `[first, last]`.
    ///
    /// Returns how many entries were removed.
    pub fn remove_uid_range(
        &self,
        first: Uid,
        last: Uid,
    ) -> Result<usize, Error> {
        let mut state = self.lock_inner();
        if LoadState::FullyLoaded != state.load {
            return Err(Error::NotLoaded);
        }

        let uids: Vec<Uid> = state
            .by_uid
            .keys()
            .copied()
            .filter(|&uid| first <= uid && uid <= last)
            .collect();
        let mut removed = 0;
        for uid in uids {
            if remove_position(&mut state, uid) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Drop every entry, live and expunged, and reset the counts.
    ///
    /// The next-UID counter is deliberately preserved: UIDs are never
    /// reused, even across a folder reset.
    pub fn clear(&self) -> Result<(), Error> {
        let mut state = self.lock_inner();
        if LoadState::FullyLoaded != state.load {
            return Err(Error::NotLoaded);
        }

        if !state.entries.is_empty() || !state.expunged.is_empty() {
            state.any_expunged = true;
        }
        state.entries.clear();
        state.by_uid.clear();
        state.expunged.clear();
        state.counts = Counts::default();
        state.dirty = true;
        Ok(())
    }

    /// Mark the store dirty without changing anything, forcing the next
    /// save to rewrite the file.
    pub fn touch(&self) -> Result<(), Error> {
        let mut state = self.lock_inner();
        if LoadState::FullyLoaded != state.load {
            return Err(Error::NotLoaded);
        }
        state.dirty = true;
        Ok(())
    }

    /// Atomically reserve and return the next UID in string form, whether
    /// or not an entry is ever added under it.
    pub fn next_uid_string(&self) -> Result<String, Error> {
        let mut state = self.lock_inner();
        if LoadState::Unloaded == state.load {
            return Err(Error::HeaderNotLoaded);
        }

        let uid = Uid::of(state.next_uid).ok_or(Error::UidExhausted)?;
        state.next_uid =
            state.next_uid.checked_add(1).ok_or(Error::UidExhausted)?;
        state.dirty = true;
        Ok(uid.to_string())
    }

    // ==================== Flag updates ====================

    /// Set or clear system flags on the entry with the given UID.
    ///
    /// `Ok(None)` when no live entry has that UID. A change confined to the
    /// internal scratch range neither dirties the store nor notifies the
    /// listener.
    pub fn set_flags(
        &self,
        uid: Uid,
        mask: MessageFlags,
        value: bool,
    ) -> Result<Option<FlagChange>, Error> {
        self.mutate_entry(uid, |entry| entry.set_flags(mask, value))
    }

    /// Set or clear a named user flag.
    pub fn set_user_flag(
        &self,
        uid: Uid,
        name: &str,
        value: bool,
    ) -> Result<Option<FlagChange>, Error> {
        self.mutate_entry(uid, |entry| entry.set_user_flag(name, value))
    }

    /// Set, replace, or (with an empty value) remove a named user tag.
    pub fn set_user_tag(
        &self,
        uid: Uid,
        name: &str,
        value: &str,
    ) -> Result<Option<FlagChange>, Error> {
        self.mutate_entry(uid, |entry| entry.set_user_tag(name, value))
    }

    fn mutate_entry(
        &self,
        uid: Uid,
        f: impl FnOnce(&mut MessageEntry) -> FlagChange,
    ) -> Result<Option<FlagChange>, Error> {
        let change;
        {
            let mut state = self.lock_inner();
            if LoadState::FullyLoaded != state.load {
                return Err(Error::NotLoaded);
            }

            let position = match state.by_uid.get(&uid) {
                Some(&position) => position,
                None => return Ok(None),
            };

            let before = state.entries[position].flags();
            change = f(&mut state.entries[position]);
            let after = state.entries[position].flags();

            if before != after {
                state.counts.apply(before, -1);
                state.counts.apply(after, 1);
            }
            if change.user_visible {
                state.dirty = true;
            }
        }

        // Notify outside the store lock so a listener may call back in.
        if change.user_visible {
            let listener = self.lock_listener().clone();
            if let Some(listener) = listener {
                listener.message_flags_changed(uid);
            }
        }

        Ok(Some(change))
    }

    // ==================== Lookups ====================

    /// Snapshot of the entry with the given UID, if live.
    pub fn get(&self, uid: Uid) -> Result<Option<MessageEntry>, Error> {
        let state = self.lock_inner();
        if LoadState::FullyLoaded != state.load {
            return Err(Error::NotLoaded);
        }
        Ok(state
            .by_uid
            .get(&uid)
            .map(|&position| state.entries[position].clone()))
    }

    /// Snapshot of the entry at the given live position.
    pub fn get_at(&self, index: usize) -> Result<Option<MessageEntry>, Error> {
        let state = self.lock_inner();
        if LoadState::FullyLoaded != state.load {
            return Err(Error::NotLoaded);
        }
        Ok(state.entries.get(index).cloned())
    }

    /// Snapshot of every live entry, in iteration order.
    ///
    /// The returned vector is owned by the caller and remains valid however
    /// the store changes afterwards.
    pub fn entries(&self) -> Result<Vec<MessageEntry>, Error> {
        let state = self.lock_inner();
        if LoadState::FullyLoaded != state.load {
            return Err(Error::NotLoaded);
        }
        Ok(state.entries.clone())
    }

    /// Every live UID, in iteration order.
    pub fn uids(&self) -> Result<Vec<Uid>, Error> {
        let state = self.lock_inner();
        if LoadState::FullyLoaded != state.load {
            return Err(Error::NotLoaded);
        }
        Ok(state.entries.iter().filter_map(MessageEntry::uid).collect())
    }

    pub fn count(&self) -> Result<u32, Error> {
        self.read_counts().map(|c| c.total)
    }

    pub fn unread_count(&self) -> Result<u32, Error> {
        self.read_counts().map(|c| c.unread)
    }

    pub fn deleted_count(&self) -> Result<u32, Error> {
        self.read_counts().map(|c| c.deleted)
    }

    pub fn junk_count(&self) -> Result<u32, Error> {
        self.read_counts().map(|c| c.junk)
    }

    fn read_counts(&self) -> Result<Counts, Error> {
        let state = self.lock_inner();
        if LoadState::Unloaded == state.load {
            return Err(Error::HeaderNotLoaded);
        }
        Ok(state.counts)
    }

    fn lock_inner(&self) -> MutexGuard<'_, SummaryState> {
        self.inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn lock_listener(
        &self,
    ) -> MutexGuard<'_, Option<Arc<dyn FlagListener>>> {
        self.listener
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl UidLookup for SummaryStore {
    fn contains_uid(&self, uid: Uid) -> bool {
        self.lock_inner().by_uid.contains_key(&uid)
    }
}

/// Remove `uid` from the live sequence, parking the entry on the expunged
/// list. Returns whether anything was removed.
fn remove_position(state: &mut SummaryState, uid: Uid) -> bool {
    let position = match state.by_uid.remove(&uid) {
        Some(position) => position,
        None => return false,
    };

    let mut entry = state.entries.remove(position);
    // Positions after the removal point shifted down by one.
    for moved in state.by_uid.values_mut() {
        if *moved > position {
            *moved -= 1;
        }
    }

    state.counts.apply(entry.flags(), -1);
    entry.set_flags(
        MessageFlags::EXPUNGED | MessageFlags::PENDING_REMOVAL,
        true,
    );
    state.expunged.push(entry);
    state.any_expunged = true;
    state.dirty = true;
    true
}

fn read_header(
    reader: &mut impl Read,
    state: &mut SummaryState,
) -> Result<(), Error> {
    let mut fixed = [0u8; 44];
    reader
        .read_exact(&mut fixed)
        .map_err(|_| Error::BadSummaryHeader)?;
    let mut src = &fixed[..];

    let version = src.read_u32::<LittleEndian>()?;
    if FORMAT_VERSION != version {
        return Err(Error::BadSummaryHeader);
    }

    let _flags = src.read_u32::<LittleEndian>()?;
    let next_uid = src.read_u32::<LittleEndian>()?;
    let timestamp = src.read_i64::<LittleEndian>()?;
    let total = src.read_u32::<LittleEndian>()?;
    let unread = src.read_u32::<LittleEndian>()?;
    let deleted = src.read_u32::<LittleEndian>()?;
    let junk = src.read_u32::<LittleEndian>()?;
    let mi_size = src.read_u32::<LittleEndian>()?;
    let ci_size = src.read_u32::<LittleEndian>()?;

    if MESSAGE_INFO_RECORD_SIZE != mi_size
        || CONTENT_INFO_RECORD_SIZE != ci_size
    {
        return Err(Error::BadSummaryHeader);
    }

    // Merge rather than overwrite: a UID reserved while only the header was
    // loaded must survive the transition to fully loaded, or it could be
    // reissued.
    state.next_uid = state.next_uid.max(next_uid).max(1);
    state.timestamp = timestamp;
    state.counts = Counts {
        total,
        unread,
        deleted,
        junk,
    };
    Ok(())
}

fn write_header(
    buf: &mut Vec<u8>,
    state: &SummaryState,
) -> io::Result<()> {
    buf.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    // A freshly saved file is by definition current, so the dirty bit is
    // always written clear.
    let flags = 0u32;
    debug_assert_eq!(0, flags & HEADER_FLAG_DIRTY);
    buf.write_u32::<LittleEndian>(flags)?;
    buf.write_u32::<LittleEndian>(state.next_uid)?;
    buf.write_i64::<LittleEndian>(state.timestamp)?;
    buf.write_u32::<LittleEndian>(state.counts.total)?;
    buf.write_u32::<LittleEndian>(state.counts.unread)?;
    buf.write_u32::<LittleEndian>(state.counts.deleted)?;
    buf.write_u32::<LittleEndian>(state.counts.junk)?;
    buf.write_u32::<LittleEndian>(MESSAGE_INFO_RECORD_SIZE)?;
    buf.write_u32::<LittleEndian>(CONTENT_INFO_RECORD_SIZE)?;
    Ok(())
}

fn decimal_width(mut value: u32) -> u32 {
    let mut width = 1;
    while value >= 10 {
        value /= 10;
        width += 1;
    }
    width
}
