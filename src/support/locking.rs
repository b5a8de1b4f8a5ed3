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

//! The structural lock shared by the summary stores of one account.
//!
//! Every store protects its own in-memory state with an internal mutex, but
//! structural operations (whole-file save, compaction) must additionally be
//! serialised against each other across stores so that multi-step sequences
//! which span several stores observe a consistent picture. The handle for
//! that is an explicit value owned by whatever top-level object composes the
//! stores (typically the account/session), not hidden process-wide state;
//! callers bracket multi-step sequences by holding the guard, and operations
//! which require the serialisation take the guard as a parameter.

use std::sync::{Arc, Mutex, MutexGuard};

/// A shareable structural lock.
///
/// Clones share the same underlying lock.
#[derive(Clone, Debug, Default)]
pub struct StoreLock(Arc<Mutex<()>>);

/// Proof that the structural lock is held.
#[derive(Debug)]
pub struct StoreLockGuard<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

impl StoreLock {
    pub fn new() -> Self {
        StoreLock::default()
    }

    /// Acquire the structural lock, blocking until it is available.
    pub fn lock(&self) -> StoreLockGuard<'_> {
        // A poisoned lock means a panic mid-save in another thread; the
        // on-disk state is still consistent (saves are atomic), so continue.
        StoreLockGuard(
            self.0.lock().unwrap_or_else(|poison| poison.into_inner()),
        )
    }
}
