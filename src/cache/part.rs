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

//! Reference-counted read handles onto cached parts.
//!
//! The cache store hands out `BodyCacheRef` values instead of raw files so
//! that "is this part currently open" is a property the store can observe:
//! it keeps a weak reference per open part, and when the last strong handle
//! is dropped the weak reference dies, returning the key to the
//! "present on disk, not open" state with no teardown callback involved.
//!
//! All holders of one part share a single underlying file (and therefore a
//! single position); a holder that wants to read from the start calls
//! `reset` first, which is also what the store does before returning an
//! already-open part.

use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::folder::model::Uid;

pub(super) struct CachedPart {
    pub(super) uid: Uid,
    /// Canonical part path (the filler token stands in for "whole body").
    pub(super) part: String,
    pub(super) path: PathBuf,
    pub(super) file: Mutex<fs::File>,
}

impl CachedPart {
    fn lock_file(&self) -> MutexGuard<'_, fs::File> {
        self.file
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// A shared handle on one cached part.
///
/// Cloning is cheap and shares the stream; dropping the last clone closes
/// the underlying file and lets the store forget the open stream.
#[derive(Clone)]
pub struct BodyCacheRef(pub(super) Arc<CachedPart>);

impl BodyCacheRef {
    pub fn uid(&self) -> Uid {
        self.0.uid
    }

    /// The canonical part path this handle addresses.
    pub fn part(&self) -> &str {
        &self.0.part
    }

    /// Rewind the shared stream to the start of the part.
    pub fn reset(&self) -> io::Result<()> {
        self.0.lock_file().seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Size of the cached part in bytes.
    pub fn len(&self) -> io::Result<u64> {
        self.0.lock_file().metadata().map(|m| m.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        self.len().map(|len| 0 == len)
    }

    /// Read the whole part from the beginning.
    pub fn read_to_vec(&self) -> io::Result<Vec<u8>> {
        let mut file = self.0.lock_file();
        file.seek(SeekFrom::Start(0))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }
}

impl Read for BodyCacheRef {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.lock_file().read(buf)
    }
}

impl Seek for BodyCacheRef {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.lock_file().seek(pos)
    }
}

impl std::fmt::Debug for BodyCacheRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("BodyCacheRef")
            .field("uid", &self.0.uid)
            .field("part", &self.0.part)
            .field("path", &self.0.path)
            .finish()
    }
}
