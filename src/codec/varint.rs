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

//! Variable-length integer encoding.
//!
//! Integers are written as 7-bit groups, most significant group first, with
//! leading all-zero groups omitted. The final (least significant) group has
//! the high bit set; all preceding groups have it clear. Small values
//! therefore cost one byte, and the format has no endianness.
//!
//! Signed values (timestamps) use a zig-zag mapping into the unsigned form
//! so that small negative values stay small on disk.

use std::convert::TryInto;
use std::io::{self, Read, Write};

use crate::support::error::Error;

/// The longest encoding of a `u64`: ceil(64 / 7) groups.
pub const MAX_LEN: usize = 10;

/// Encode `value` to `out`.
pub fn write_u64(out: &mut impl Write, value: u64) -> io::Result<()> {
    let mut buf = [0u8; MAX_LEN];
    let mut n = MAX_LEN - 1;
    buf[n] = (value as u8 & 0x7f) | 0x80;

    let mut v = value >> 7;
    while 0 != v {
        n -= 1;
        buf[n] = (v & 0x7f) as u8;
        v >>= 7;
    }

    out.write_all(&buf[n..])
}

pub fn write_u32(out: &mut impl Write, value: u32) -> io::Result<()> {
    write_u64(out, value.into())
}

/// Encode a signed value (zig-zag) to `out`.
pub fn write_i64(out: &mut impl Write, value: i64) -> io::Result<()> {
    write_u64(out, ((value << 1) ^ (value >> 63)) as u64)
}

/// Decode a `u64` from `src`.
///
/// Running out of input yields `Error::TruncatedRecord`; an encoding longer
/// than any valid `u64` yields `Error::BadRecord`.
pub fn read_u64(src: &mut impl Read) -> Result<u64, Error> {
    let mut value = 0u64;
    loop {
        let mut byte = [0u8; 1];
        match src.read_exact(&mut byte) {
            Ok(()) => (),
            Err(e) if io::ErrorKind::UnexpectedEof == e.kind() => {
                return Err(Error::TruncatedRecord)
            },
            Err(e) => return Err(e.into()),
        }

        let c = byte[0];
        if 0 != value >> 57 {
            // Another group would shift bits off the top.
            return Err(Error::BadRecord);
        }

        if 0 != c & 0x80 {
            return Ok((value << 7) | u64::from(c & 0x7f));
        }
        value = (value << 7) | u64::from(c);
    }
}

pub fn read_u32(src: &mut impl Read) -> Result<u32, Error> {
    read_u64(src)?.try_into().map_err(|_| Error::BadRecord)
}

pub fn read_i64(src: &mut impl Read) -> Result<i64, Error> {
    let z = read_u64(src)?;
    Ok(((z >> 1) as i64) ^ -((z & 1) as i64))
}

/// Decode a `u64` from `buf` starting at `*pos`, advancing `*pos` past the
/// encoded bytes on success.
pub fn decode_u64(buf: &[u8], pos: &mut usize) -> Result<u64, Error> {
    let mut value = 0u64;
    loop {
        let c = *buf.get(*pos).ok_or(Error::TruncatedRecord)?;
        *pos += 1;

        if 0 != value >> 57 {
            return Err(Error::BadRecord);
        }

        if 0 != c & 0x80 {
            return Ok((value << 7) | u64::from(c & 0x7f));
        }
        value = (value << 7) | u64::from(c);
    }
}

pub fn decode_u32(buf: &[u8], pos: &mut usize) -> Result<u32, Error> {
    decode_u64(buf, pos)?.try_into().map_err(|_| Error::BadRecord)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn encoded(value: u64) -> Vec<u8> {
        let mut v = Vec::new();
        write_u64(&mut v, value).unwrap();
        v
    }

    #[test]
    fn small_values_are_one_byte() {
        assert_eq!(vec![0x80], encoded(0));
        assert_eq!(vec![0x81], encoded(1));
        assert_eq!(vec![0xff], encoded(127));
        assert_eq!(vec![0x01, 0x80], encoded(128));
    }

    #[test]
    fn truncated_input_is_detected() {
        assert_matches!(
            Err(crate::support::error::Error::TruncatedRecord),
            read_u64(&mut &[][..])
        );
        // A multi-byte encoding cut before its terminator
        assert_matches!(
            Err(crate::support::error::Error::TruncatedRecord),
            read_u64(&mut &[0x01u8][..])
        );
    }

    #[test]
    fn over_long_encoding_is_rejected() {
        let bytes = [0x7fu8, 0x7f, 0x7f, 0x7f, 0x7f, 0x7f, 0x7f, 0x7f, 0x7f,
                     0x7f, 0xff];
        assert_matches!(
            Err(crate::support::error::Error::BadRecord),
            read_u64(&mut &bytes[..])
        );
    }

    #[test]
    fn u32_range_is_enforced() {
        let mut v = Vec::new();
        write_u64(&mut v, u64::from(u32::max_value()) + 1).unwrap();
        assert_matches!(
            Err(crate::support::error::Error::BadRecord),
            read_u32(&mut &v[..])
        );
    }

    #[test]
    fn cursor_decode_advances_position() {
        let mut v = Vec::new();
        write_u64(&mut v, 300).unwrap();
        write_u64(&mut v, 4).unwrap();

        let mut pos = 0;
        assert_eq!(300, decode_u64(&v, &mut pos).unwrap());
        assert_eq!(4, decode_u64(&v, &mut pos).unwrap());
        assert_eq!(v.len(), pos);
        assert_matches!(
            Err(crate::support::error::Error::TruncatedRecord),
            decode_u64(&v, &mut pos)
        );
    }

    proptest! {
        #[test]
        fn u64_round_trip(value in any::<u64>()) {
            let v = encoded(value);
            prop_assert_eq!(value, read_u64(&mut &v[..]).unwrap());

            let mut pos = 0;
            prop_assert_eq!(value, decode_u64(&v, &mut pos).unwrap());
            prop_assert_eq!(v.len(), pos);
        }

        #[test]
        fn i64_round_trip(value in any::<i64>()) {
            let mut v = Vec::new();
            write_i64(&mut v, value).unwrap();
            prop_assert_eq!(value, read_i64(&mut &v[..]).unwrap());
        }
    }
}
