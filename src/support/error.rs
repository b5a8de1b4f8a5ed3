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

use std::io;

use thiserror::Error;

/// The unified error type for the crate.
///
/// Decode errors (`TruncatedRecord`, `BadRecord`, `BadToken`) are recoverable
/// at record granularity: a store that hits one while loading drops the
/// affected record and keeps going. `BadSummaryHeader` is not; a summary file
/// whose header cannot be decoded cannot be loaded at all.
#[derive(Error, Debug)]
pub enum Error {
    /// The input ended before the encoded value it declared.
    #[error("Truncated record")]
    TruncatedRecord,
    /// A record's fields could not be decoded.
    #[error("Malformed record")]
    BadRecord,
    /// A compressed string referenced a token outside the dictionary, or its
    /// literal bytes were not valid UTF-8.
    #[error("Malformed string token")]
    BadToken,
    /// The summary file header is malformed or has an unsupported version.
    #[error("Malformed or unsupported summary header")]
    BadSummaryHeader,
    /// An insert would have produced two live entries with the same UID.
    #[error("Duplicate UID: {0}")]
    DuplicateUid(u32),
    /// The 32-bit UID space of the folder is exhausted.
    #[error("UID space exhausted")]
    UidExhausted,
    /// The operation requires the store to be fully loaded first.
    #[error("Summary not loaded")]
    NotLoaded,
    /// The operation requires at least the summary header to be loaded.
    #[error("Summary header not loaded")]
    HeaderNotLoaded,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<tempfile::PersistError> for Error {
    fn from(e: tempfile::PersistError) -> Self {
        Error::Io(e.error)
    }
}
