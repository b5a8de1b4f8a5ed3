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

//! Mailfold is the persistent metadata and body-cache layer beneath a mail
//! client's folder abstraction.
//!
//! For each remote folder it maintains a compact on-disk summary index of
//! per-message metadata (flags, envelope fields, an outline of the MIME
//! structure, UID) so the client can display a folder without contacting the
//! server, and a body cache holding downloaded message parts keyed by
//! `(UID, part path)` so repeated views avoid network round trips.
//!
//! The crate is passive: it runs on whatever thread calls it, performs
//! synchronous file I/O, and never decides *when* to talk to a server. The
//! protocol client and UI layers are collaborators that feed it data and
//! consume its lookups.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod cache;
pub mod codec;
pub mod folder;
pub mod support;
