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

//! The per-folder body cache: downloaded message parts on disk, keyed by
//! `(UID, part path)`, reconciled against the folder's summary store.

pub mod part;
pub mod store;
