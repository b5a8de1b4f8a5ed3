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

//! The body cache store: one directory per folder, one file per cached
//! `(UID, part path)`.
//!
//! ## Directory layout
//!
//! - `<uid>.<part>` — a cached part; the part path is percent-escaped and
//!   the filler token `full` stands in for the empty part path (the whole
//!   body).
//! - `<uid>_bodystructure` — a structure-only cache;
//! - `<uid>.ispartial` — zero-length marker: only part of the body was
//!   downloaded;
//! - `<uid>.getimages` — zero-length marker: the user allowed external
//!   images for this message.
//!
//! Every name this store writes decodes unambiguously back to its key;
//! files that do not decode are foreign and are left untouched.
//!
//! ## Consistency
//!
//! `open` reconciles the directory against the folder's summary: files for
//! UIDs the summary no longer knows are orphans and are deleted. The
//! in-memory part table mirrors the directory from then on. The table lock
//! is held only for table mutation, never across disk I/O, so a slow stream
//! read does not block unrelated lookups.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use log::{debug, error, warn};

use super::part::{BodyCacheRef, CachedPart};
use crate::folder::model::Uid;
use crate::folder::summary::UidLookup;
use crate::support::error::Error;
use crate::support::file_ops::IgnoreKinds;

/// The canonical part path standing in for "the whole body".
pub const FILLER_PART: &str = "full";
/// The canonical part path of a structure-only cache entry.
pub const STRUCTURE_PART: &str = "bodystructure";

const PARTIAL_MARKER: &str = "ispartial";
const IMAGES_MARKER: &str = "getimages";
const STRUCTURE_SUFFIX: &str = "_bodystructure";

type CacheKey = (Uid, String);

#[derive(Default)]
struct CacheTable {
    /// Canonical part paths present on disk, per UID.
    parts: HashMap<Uid, BTreeSet<String>>,
    /// Currently open streams. A dead `Weak` means the last holder released
    /// the part and it is merely on disk again.
    open: HashMap<CacheKey, Weak<CachedPart>>,
    /// Greatest UID ever observed in the directory, for next-UID purposes.
    max_uid: u32,
}

pub struct BodyCacheStore {
    root: PathBuf,
    inner: Mutex<CacheTable>,
}

impl BodyCacheStore {
    /// Open the cache directory at `root`, reconciling it against the
    /// folder's summary.
    ///
    /// Part and marker files for UIDs `summary` does not know are orphans
    /// (their message is gone) and are deleted. The summary must be fully
    /// loaded, or everything will look like an orphan.
    pub fn open(
        root: impl Into<PathBuf>,
        summary: &dyn UidLookup,
    ) -> Result<Self, Error> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut table = CacheTable::default();
        let mut orphans = Vec::new();

        for dir_entry in fs::read_dir(&root)? {
            let dir_entry = dir_entry?;
            let name = match dir_entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };

            let (uid, kind) = match decode_name(&name) {
                Some(decoded) => decoded,
                None => {
                    debug!(
                        "{}: ignoring foreign file {:?}",
                        root.display(),
                        name
                    );
                    continue;
                },
            };

            table.max_uid = table.max_uid.max(uid.into());

            if !summary.contains_uid(uid) {
                orphans.push(dir_entry.path());
                continue;
            }

            if let NameKind::Part(part) = kind {
                table.parts.entry(uid).or_default().insert(part);
            }
        }

        for path in orphans {
            debug!("{}: deleting orphan {}", root.display(), path.display());
            if let Err(e) = fs::remove_file(&path).ignore_not_found() {
                warn!(
                    "{}: failed to delete orphan {}: {}",
                    root.display(),
                    path.display(),
                    e
                );
            }
        }

        Ok(BodyCacheStore {
            root,
            inner: Mutex::new(table),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ==================== Lookup ====================

    /// Look up the cached part for `(uid, part)`.
    ///
    /// If a stream for that key is already open, it is rewound and shared;
    /// otherwise the on-disk file, if any, is opened and registered.
    /// `Ok(None)` means "not present", which is not an error.
    pub fn get(
        &self,
        uid: Uid,
        part: &str,
    ) -> Result<Option<BodyCacheRef>, Error> {
        let part = canonical(part).to_owned();
        let path = self.root.join(encode_name(uid, &part));

        {
            let mut table = self.lock_table();
            if let Some(existing) = upgrade(&mut table, uid, &part) {
                drop(table);
                existing.reset()?;
                return Ok(Some(existing));
            }

            if !table
                .parts
                .get(&uid)
                .map_or(false, |parts| parts.contains(&part))
            {
                return Ok(None);
            }
        }

        // Not open; hit the disk without holding the table lock.
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(ref e) if io::ErrorKind::NotFound == e.kind() => {
                // The table thought it existed; repair the discrepancy.
                let mut table = self.lock_table();
                if let Some(parts) = table.parts.get_mut(&uid) {
                    parts.remove(&part);
                }
                return Ok(None);
            },
            Err(e) => {
                error!(
                    "{}: failed to open cached part {}/{}: {}",
                    self.root.display(),
                    uid,
                    part,
                    e
                );
                return Err(e.into());
            },
        };

        let mut table = self.lock_table();
        // Another thread may have opened it while we were at the disk.
        if let Some(existing) = upgrade(&mut table, uid, &part) {
            drop(table);
            existing.reset()?;
            return Ok(Some(existing));
        }

        let arc = Arc::new(CachedPart {
            uid,
            part: part.clone(),
            path,
            file: Mutex::new(file),
        });
        table.open.insert((uid, part), Arc::downgrade(&arc));
        Ok(Some(BodyCacheRef(arc)))
    }

    /// `get` addressed by the string form of a UID.
    ///
    /// An empty or unparseable UID is always "not present".
    pub fn get_by_uid_str(
        &self,
        uid: &str,
        part: &str,
    ) -> Result<Option<BodyCacheRef>, Error> {
        match Uid::parse(uid) {
            Some(uid) => self.get(uid, part),
            None => Ok(None),
        }
    }

    // ==================== Insertion ====================

    /// Cache the contents of `src` under `(uid, part)`, returning an open
    /// handle on the just-written part.
    ///
    /// The data is staged in a temporary file and renamed into place, so a
    /// failed insert never leaves a partial file at the canonical path and
    /// never clobbers a previously cached copy.
    pub fn insert(
        &self,
        uid: Uid,
        part: &str,
        src: &mut dyn Read,
    ) -> Result<BodyCacheRef, Error> {
        let part = canonical(part).to_owned();
        let path = self.root.join(encode_name(uid, &part));

        let mut staged = tempfile::NamedTempFile::new_in(&self.root)?;
        if let Err(e) = io::copy(src, staged.as_file_mut()) {
            // Dropping `staged` removes the temporary file.
            error!(
                "{}: insert of {}/{} failed mid-write: {}",
                self.root.display(),
                uid,
                part,
                e
            );
            return Err(e.into());
        }
        staged.as_file_mut().sync_all()?;

        let mut file = staged.persist(&path)?;
        file.seek(SeekFrom::Start(0))?;

        let arc = Arc::new(CachedPart {
            uid,
            part: part.clone(),
            path,
            file: Mutex::new(file),
        });

        let mut table = self.lock_table();
        table.parts.entry(uid).or_default().insert(part.clone());
        table.max_uid = table.max_uid.max(uid.into());
        table.open.insert((uid, part), Arc::downgrade(&arc));
        Ok(BodyCacheRef(arc))
    }

    /// Convenience wrapper over `insert` for in-memory data.
    pub fn insert_bytes(
        &self,
        uid: Uid,
        part: &str,
        data: &[u8],
    ) -> Result<BodyCacheRef, Error> {
        self.insert(uid, part, &mut &data[..])
    }

    /// Atomically replace the cached representation of `(uid, part)`,
    /// e.g. after stripping attachments to reclaim space.
    ///
    /// The part is either fully the old content or fully the new content at
    /// every instant; handles already open keep reading the old content,
    /// while subsequent `get`s see the new.
    pub fn replace(
        &self,
        uid: Uid,
        part: &str,
        src: &mut dyn Read,
    ) -> Result<BodyCacheRef, Error> {
        // Staging plus rename-over gives replace the same shape as insert;
        // the insert path already registers the new stream in place of the
        // old weak entry.
        self.insert(uid, part, src)
    }

    // ==================== Removal ====================

    /// Delete every cached part and marker belonging to `uid`.
    ///
    /// A UID with nothing cached is a no-op, not an error.
    pub fn remove(&self, uid: Uid) -> Result<(), Error> {
        let parts = {
            let mut table = self.lock_table();
            table.open.retain(|(entry_uid, _), _| uid != *entry_uid);
            table.parts.remove(&uid).unwrap_or_default()
        };

        for part in parts {
            fs::remove_file(self.root.join(encode_name(uid, &part)))
                .ignore_not_found()?;
        }
        fs::remove_file(self.marker_path(uid, PARTIAL_MARKER))
            .ignore_not_found()?;
        fs::remove_file(self.marker_path(uid, IMAGES_MARKER))
            .ignore_not_found()?;
        Ok(())
    }

    /// Delete every cached part and marker in the store (folder reset).
    ///
    /// Foreign files in the directory are untouched. The maximum-seen UID
    /// survives so the store never suggests reusing one.
    pub fn clear(&self) -> Result<(), Error> {
        {
            let mut table = self.lock_table();
            table.parts.clear();
            table.open.clear();
        }

        for dir_entry in fs::read_dir(&self.root)? {
            let dir_entry = dir_entry?;
            let name = match dir_entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if decode_name(&name).is_some() {
                fs::remove_file(dir_entry.path()).ignore_not_found()?;
            }
        }
        Ok(())
    }

    /// Copy every cached part of `src_uid` into `dst` under `dst_uid`,
    /// pre-warming the destination folder's cache for a message move/copy.
    ///
    /// Returns the number of parts copied.
    pub fn copy_to(
        &self,
        src_uid: Uid,
        dst: &BodyCacheStore,
        dst_uid: Uid,
    ) -> Result<usize, Error> {
        let parts: BTreeSet<String> = self
            .lock_table()
            .parts
            .get(&src_uid)
            .cloned()
            .unwrap_or_default();

        let mut copied = 0;
        for part in parts {
            let mut file =
                fs::File::open(self.root.join(encode_name(src_uid, &part)))?;
            dst.insert(dst_uid, &part, &mut file)?;
            copied += 1;
        }
        Ok(copied)
    }

    // ==================== Markers ====================

    /// Whether only part of `uid`'s body was downloaded.
    pub fn is_partial(&self, uid: Uid) -> Result<bool, Error> {
        self.marker_present(uid, PARTIAL_MARKER)
    }

    /// Set or clear the partial-download marker. Idempotent either way.
    pub fn set_partial(&self, uid: Uid, value: bool) -> Result<(), Error> {
        self.set_marker(uid, PARTIAL_MARKER, value)
    }

    /// Whether the user allowed external images for `uid`.
    pub fn allow_external_images(&self, uid: Uid) -> Result<bool, Error> {
        self.marker_present(uid, IMAGES_MARKER)
    }

    /// Set or clear the external-images marker. Idempotent either way.
    pub fn set_allow_external_images(
        &self,
        uid: Uid,
        value: bool,
    ) -> Result<(), Error> {
        self.set_marker(uid, IMAGES_MARKER, value)
    }

    fn marker_path(&self, uid: Uid, marker: &str) -> PathBuf {
        self.root.join(format!("{}.{}", uid, marker))
    }

    fn marker_present(&self, uid: Uid, marker: &str) -> Result<bool, Error> {
        match fs::metadata(self.marker_path(uid, marker)) {
            Ok(_) => Ok(true),
            Err(ref e) if io::ErrorKind::NotFound == e.kind() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn set_marker(
        &self,
        uid: Uid,
        marker: &str,
        value: bool,
    ) -> Result<(), Error> {
        let path = self.marker_path(uid, marker);
        if value {
            fs::OpenOptions::new()
                .write(true)
                .create(true)
                .open(path)
                .map(|_| ())?;
        } else {
            fs::remove_file(path).ignore_not_found()?;
        }

        if PARTIAL_MARKER == marker || IMAGES_MARKER == marker {
            let mut table = self.lock_table();
            table.max_uid = table.max_uid.max(uid.into());
        }
        Ok(())
    }

    // ==================== Introspection ====================

    /// The next UID this store would suggest, in string form: one past the
    /// greatest UID it has ever observed.
    pub fn next_uid_string(&self) -> String {
        (u64::from(self.lock_table().max_uid) + 1).to_string()
    }

    /// How many parts are currently held open by live handles.
    ///
    /// Dead entries (all handles dropped) are pruned as a side effect.
    pub fn open_stream_count(&self) -> usize {
        let mut table = self.lock_table();
        table.open.retain(|_, weak| 0 != weak.strong_count());
        table.open.len()
    }

    fn lock_table(&self) -> MutexGuard<'_, CacheTable> {
        self.inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Try to share an already-open stream for `(uid, part)`, pruning the entry
/// if every handle has been dropped.
fn upgrade(
    table: &mut CacheTable,
    uid: Uid,
    part: &str,
) -> Option<BodyCacheRef> {
    let key = (uid, part.to_owned());
    match table.open.get(&key).and_then(Weak::upgrade) {
        Some(arc) => Some(BodyCacheRef(arc)),
        None => {
            table.open.remove(&key);
            None
        },
    }
}

fn canonical(part: &str) -> &str {
    if part.is_empty() {
        FILLER_PART
    } else {
        part
    }
}

#[derive(Debug, PartialEq, Eq)]
enum NameKind {
    Part(String),
    PartialMarker,
    ImagesMarker,
}

/// Encode the file name for `(uid, part)`. `part` must be canonical.
fn encode_name(uid: Uid, part: &str) -> String {
    if STRUCTURE_PART == part {
        return format!("{}{}", uid, STRUCTURE_SUFFIX);
    }

    // A part path that collides with a marker name gets its first byte
    // escaped, keeping the name space unambiguous.
    let force = PARTIAL_MARKER == part || IMAGES_MARKER == part;
    format!("{}.{}", uid, escape_part(part, force))
}

/// Decode a file name back to its `(uid, kind)` key. Names this store never
/// writes yield `None`.
fn decode_name(name: &str) -> Option<(Uid, NameKind)> {
    if let Some(prefix) = strip_suffix(name, STRUCTURE_SUFFIX) {
        if let Some(uid) = Uid::parse(prefix) {
            return Some((uid, NameKind::Part(STRUCTURE_PART.to_owned())));
        }
    }

    let dot = name.find('.')?;
    let uid = Uid::parse(&name[..dot])?;
    let rest = &name[dot + 1..];

    match rest {
        "" => None,
        PARTIAL_MARKER => Some((uid, NameKind::PartialMarker)),
        IMAGES_MARKER => Some((uid, NameKind::ImagesMarker)),
        _ => unescape_part(rest).map(|part| (uid, NameKind::Part(part))),
    }
}

fn strip_suffix<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if s.ends_with(suffix) {
        Some(&s[..s.len() - suffix.len()])
    } else {
        None
    }
}

fn is_safe_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b'.' == b || b'-' == b || b'_' == b
}

fn escape_part(part: &str, force_first: bool) -> String {
    let mut out = String::with_capacity(part.len());
    for (ix, b) in part.bytes().enumerate() {
        if is_safe_byte(b) && !(force_first && 0 == ix) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn unescape_part(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut ix = 0;
    while ix < bytes.len() {
        if b'%' == bytes[ix] {
            if ix + 3 > bytes.len() {
                return None;
            }
            let hex = std::str::from_utf8(&bytes[ix + 1..ix + 3]).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            ix += 3;
        } else if is_safe_byte(bytes[ix]) {
            out.push(bytes[ix]);
            ix += 1;
        } else {
            return None;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    struct FixedUids(HashSet<Uid>);

    impl FixedUids {
        fn of(uids: &[u32]) -> Self {
            FixedUids(uids.iter().map(|&u| Uid::u(u)).collect())
        }
    }

    impl UidLookup for FixedUids {
        fn contains_uid(&self, uid: Uid) -> bool {
            self.0.contains(&uid)
        }
    }

    fn open_store(root: &Path, uids: &[u32]) -> BodyCacheStore {
        BodyCacheStore::open(root, &FixedUids::of(uids)).unwrap()
    }

    #[test]
    fn name_codec_round_trips() {
        for part in
            &["full", "1.2", "1.2.HEADER", "weird part/();", "bodystructure",
              "ispartial", "getimages"]
        {
            let name = encode_name(Uid::u(42), part);
            assert_eq!(
                Some((Uid::u(42), NameKind::Part(part.to_string()))),
                decode_name(&name),
                "part {:?} encoded as {:?}",
                part,
                name
            );
        }

        assert_eq!("42_bodystructure", encode_name(Uid::u(42), "bodystructure"));
        assert_eq!(
            Some((Uid::u(7), NameKind::PartialMarker)),
            decode_name("7.ispartial")
        );
        assert_eq!(
            Some((Uid::u(7), NameKind::ImagesMarker)),
            decode_name("7.getimages")
        );

        assert_eq!(None, decode_name("README"));
        assert_eq!(None, decode_name("01.full"));
        assert_eq!(None, decode_name("7."));
        assert_eq!(None, decode_name(".full"));
        assert_eq!(None, decode_name("7.bad%zzescape"));
    }

    #[test]
    fn insert_then_get_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(dir.path(), &[1]);

        store.insert_bytes(Uid::u(1), "", b"whole body").unwrap();

        // The empty part path and the filler token address the same part
        let by_empty = store.get(Uid::u(1), "").unwrap().unwrap();
        assert_eq!(b"whole body".to_vec(), by_empty.read_to_vec().unwrap());
        let by_filler = store.get(Uid::u(1), FILLER_PART).unwrap().unwrap();
        assert_eq!(b"whole body".to_vec(), by_filler.read_to_vec().unwrap());

        assert_matches!(Ok(None), store.get(Uid::u(1), "1.2"));
        assert_matches!(Ok(None), store.get(Uid::u(2), ""));
    }

    #[test]
    fn get_by_uid_str_tolerates_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(dir.path(), &[1]);
        store.insert_bytes(Uid::u(1), "", b"x").unwrap();

        assert!(store.get_by_uid_str("1", "").unwrap().is_some());
        assert_matches!(Ok(None), store.get_by_uid_str("", ""));
        assert_matches!(Ok(None), store.get_by_uid_str("nope", ""));
        assert_matches!(Ok(None), store.get_by_uid_str("01", ""));
    }

    #[test]
    fn open_reconciles_against_summary() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let store = open_store(dir.path(), &[1, 2, 3]);
            store.insert_bytes(Uid::u(1), "", b"one").unwrap();
            store.insert_bytes(Uid::u(2), "", b"two").unwrap();
            store.insert_bytes(Uid::u(2), "1.2", b"two part").unwrap();
            store.insert_bytes(Uid::u(3), "", b"three").unwrap();
            store.set_partial(Uid::u(2), true).unwrap();
        }
        // A foreign file must survive reconciliation
        fs::write(dir.path().join("README"), b"not ours").unwrap();

        // Message 2 no longer exists in the summary
        let store = open_store(dir.path(), &[1, 3]);

        assert!(store.get(Uid::u(1), "").unwrap().is_some());
        assert!(store.get(Uid::u(3), "").unwrap().is_some());
        assert_matches!(Ok(None), store.get(Uid::u(2), ""));
        assert_matches!(Ok(None), store.get(Uid::u(2), "1.2"));
        assert!(!store.is_partial(Uid::u(2)).unwrap());
        assert!(dir.path().join("README").exists());

        // The orphan's UID still counts towards next-UID generation
        assert_eq!("4", store.next_uid_string());
    }

    #[test]
    fn reopening_an_open_part_shares_the_stream() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(dir.path(), &[1]);
        let inserted = store.insert_bytes(Uid::u(1), "", b"shared").unwrap();
        assert_eq!(1, store.open_stream_count());
        drop(inserted);
        assert_eq!(0, store.open_stream_count());

        let first = store.get(Uid::u(1), "").unwrap().unwrap();
        let second = store.get(Uid::u(1), "").unwrap().unwrap();
        assert_eq!(1, store.open_stream_count());

        // Releasing the last handle returns the key to "on disk, not open"
        drop(first);
        assert_eq!(1, store.open_stream_count());
        drop(second);
        assert_eq!(0, store.open_stream_count());

        // And a later get reopens from disk
        let reopened = store.get(Uid::u(1), "").unwrap().unwrap();
        assert_eq!(b"shared".to_vec(), reopened.read_to_vec().unwrap());
    }

    /// A reader that fails partway through.
    struct FailingReader {
        remaining: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if 0 == self.remaining {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "simulated failure",
                ));
            }
            let n = self.remaining.min(buf.len());
            for b in &mut buf[..n] {
                *b = b'x';
            }
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn failed_insert_leaves_nothing_behind() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(dir.path(), &[1]);

        assert!(store
            .insert(Uid::u(1), "", &mut FailingReader { remaining: 4000 })
            .is_err());

        assert_matches!(Ok(None), store.get(Uid::u(1), ""));
        // No temporary or partial file survives
        let survivors: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(survivors.is_empty(), "left behind: {:?}", survivors);
    }

    #[test]
    fn failed_insert_keeps_previous_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(dir.path(), &[1]);
        store.insert_bytes(Uid::u(1), "", b"original").unwrap();

        assert!(store
            .insert(Uid::u(1), "", &mut FailingReader { remaining: 4000 })
            .is_err());

        let kept = store.get(Uid::u(1), "").unwrap().unwrap();
        assert_eq!(b"original".to_vec(), kept.read_to_vec().unwrap());
    }

    #[test]
    fn replace_is_atomic_for_new_readers() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(dir.path(), &[1]);
        store.insert_bytes(Uid::u(1), "", b"with attachments").unwrap();

        let old = store.get(Uid::u(1), "").unwrap().unwrap();
        store
            .replace(Uid::u(1), "", &mut &b"stripped"[..])
            .unwrap();

        // New lookups see the new content; the old handle still reads the
        // content it was opened on.
        let new = store.get(Uid::u(1), "").unwrap().unwrap();
        assert_eq!(b"stripped".to_vec(), new.read_to_vec().unwrap());
        assert_eq!(
            b"with attachments".to_vec(),
            old.read_to_vec().unwrap()
        );
    }

    #[test]
    fn remove_drops_all_parts_and_markers() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(dir.path(), &[1, 2]);
        store.insert_bytes(Uid::u(1), "", b"one").unwrap();
        store.insert_bytes(Uid::u(1), "1.2", b"one part").unwrap();
        store.insert_bytes(Uid::u(1), "bodystructure", b"bs").unwrap();
        store.insert_bytes(Uid::u(2), "", b"two").unwrap();
        store.set_partial(Uid::u(1), true).unwrap();
        store.set_allow_external_images(Uid::u(1), true).unwrap();

        store.remove(Uid::u(1)).unwrap();

        assert_matches!(Ok(None), store.get(Uid::u(1), ""));
        assert_matches!(Ok(None), store.get(Uid::u(1), "1.2"));
        assert_matches!(Ok(None), store.get(Uid::u(1), "bodystructure"));
        assert!(!store.is_partial(Uid::u(1)).unwrap());
        assert!(!store.allow_external_images(Uid::u(1)).unwrap());
        // Unrelated UIDs untouched
        assert!(store.get(Uid::u(2), "").unwrap().is_some());

        // Removing again is a no-op
        store.remove(Uid::u(1)).unwrap();
    }

    #[test]
    fn markers_are_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(dir.path(), &[1]);

        assert!(!store.is_partial(Uid::u(1)).unwrap());
        store.set_partial(Uid::u(1), true).unwrap();
        store.set_partial(Uid::u(1), true).unwrap();
        assert!(store.is_partial(Uid::u(1)).unwrap());
        assert!(dir.path().join("1.ispartial").exists());

        store.set_partial(Uid::u(1), false).unwrap();
        assert!(!store.is_partial(Uid::u(1)).unwrap());
        store.set_partial(Uid::u(1), false).unwrap();
        assert!(!store.is_partial(Uid::u(1)).unwrap());

        store.set_allow_external_images(Uid::u(1), true).unwrap();
        assert!(store.allow_external_images(Uid::u(1)).unwrap());
        assert!(dir.path().join("1.getimages").exists());
        store.set_allow_external_images(Uid::u(1), false).unwrap();
        assert!(!store.allow_external_images(Uid::u(1)).unwrap());
    }

    #[test]
    fn copy_to_prewarms_destination() {
        let src_dir = tempfile::TempDir::new().unwrap();
        let dst_dir = tempfile::TempDir::new().unwrap();
        let src = open_store(src_dir.path(), &[5]);
        let dst = open_store(dst_dir.path(), &[9]);

        src.insert_bytes(Uid::u(5), "", b"body").unwrap();
        src.insert_bytes(Uid::u(5), "1.2", b"part").unwrap();

        assert_eq!(2, src.copy_to(Uid::u(5), &dst, Uid::u(9)).unwrap());

        assert_eq!(
            b"body".to_vec(),
            dst.get(Uid::u(9), "").unwrap().unwrap().read_to_vec().unwrap()
        );
        assert_eq!(
            b"part".to_vec(),
            dst.get(Uid::u(9), "1.2")
                .unwrap()
                .unwrap()
                .read_to_vec()
                .unwrap()
        );

        // Nothing cached for the source UID: zero parts copied
        assert_eq!(0, src.copy_to(Uid::u(99), &dst, Uid::u(10)).unwrap());
    }

    #[test]
    fn clear_resets_but_remembers_max_uid() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(dir.path(), &[1, 7]);
        store.insert_bytes(Uid::u(7), "", b"seven").unwrap();
        store.set_partial(Uid::u(7), true).unwrap();
        fs::write(dir.path().join("README"), b"not ours").unwrap();

        store.clear().unwrap();

        assert_matches!(Ok(None), store.get(Uid::u(7), ""));
        assert!(!store.is_partial(Uid::u(7)).unwrap());
        assert!(dir.path().join("README").exists());
        assert_eq!("8", store.next_uid_string());
    }
}
