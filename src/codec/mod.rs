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

//! The record codec: primitive wire forms shared by the summary store and
//! the cache, with no knowledge of message semantics.

pub mod taglist;
pub mod token;
pub mod varint;
