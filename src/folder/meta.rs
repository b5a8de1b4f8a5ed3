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

//! The meta-summary: a tiny fixed-size sidecar of the summary file used for
//! existence and version checks without paying for a full (or even
//! header-only) summary load.
//!
//! Layout, all little-endian: `major: u32, minor: u32, uid_len: u32,
//! any_expunged: u8`. `uid_len` is the decimal width of the folder's
//! next-UID counter, which is what a cache needs to pre-size name buffers.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::support::error::Error;
use crate::support::file_ops;

pub const META_MAJOR: u32 = 1;
pub const META_MINOR: u32 = 0;

/// The file name extension appended to the summary path.
const EXTENSION: &str = "meta";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetaSummary {
    pub major: u32,
    pub minor: u32,
    /// Decimal digit count of the summary's next-UID counter.
    pub uid_len: u32,
    /// Whether any message has ever been expunged from the folder.
    pub any_expunged: bool,
}

impl MetaSummary {
    pub fn path_for(summary_path: &Path) -> PathBuf {
        let mut name = summary_path.as_os_str().to_owned();
        name.push(".");
        name.push(EXTENSION);
        PathBuf::from(name)
    }

    /// Load the meta-summary sitting next to `summary_path`.
    ///
    /// `Ok(None)` when no meta file exists (e.g. the folder has never been
    /// saved); a malformed or truncated file is a decode error.
    pub fn load(summary_path: &Path) -> Result<Option<Self>, Error> {
        let mut file = match fs::File::open(Self::path_for(summary_path)) {
            Ok(f) => f,
            Err(ref e) if io::ErrorKind::NotFound == e.kind() => {
                return Ok(None)
            },
            Err(e) => return Err(e.into()),
        };

        let read_u32 = |f: &mut fs::File| {
            f.read_u32::<LittleEndian>()
                .map_err(|_| Error::TruncatedRecord)
        };

        let major = read_u32(&mut file)?;
        let minor = read_u32(&mut file)?;
        let uid_len = read_u32(&mut file)?;
        let mut any = [0u8; 1];
        file.read_exact(&mut any)
            .map_err(|_| Error::TruncatedRecord)?;

        if major > META_MAJOR {
            return Err(Error::BadSummaryHeader);
        }

        Ok(Some(MetaSummary {
            major,
            minor,
            uid_len,
            any_expunged: 0 != any[0],
        }))
    }

    /// Atomically (re)write the meta-summary next to `summary_path`,
    /// staging in `tmp`.
    pub fn save(&self, summary_path: &Path, tmp: &Path) -> Result<(), Error> {
        let mut buf = Vec::with_capacity(13);
        buf.write_u32::<LittleEndian>(self.major)?;
        buf.write_u32::<LittleEndian>(self.minor)?;
        buf.write_u32::<LittleEndian>(self.uid_len)?;
        buf.push(self.any_expunged as u8);

        file_ops::spit(tmp, Self::path_for(summary_path), true, &buf)?;
        Ok(())
    }
}
