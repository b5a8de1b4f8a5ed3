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

//! The in-memory representation of one message's metadata.
//!
//! An entry is produced either from live protocol data (a header block, a
//! stream, a materialised message) or by decoding a stored record; all
//! constructions satisfy the same invariants, and the accessors do not care
//! which path built the entry.
//!
//! On disk each entry is one length-framed record so that a corrupt record
//! can be skipped without desynchronising the reader from its neighbours.

use std::io::{self, BufRead, Read, Write};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::prelude::*;

use super::content::ContentInfo;
use super::headers::{self, HeaderBlock};
use super::model::{intern, message_id_hash, MessageFlags, Uid};
use crate::codec::taglist::{UserFlags, UserTags};
use crate::codec::{token, varint};
use crate::support::error::Error;

/// Upper bound on a single encoded record. Larger frames are corruption.
const MAX_RECORD: u64 = 1 << 24;

/// A fully materialised message as handed over by a protocol client.
#[derive(Clone, Debug, Default)]
pub struct Message {
    pub headers: HeaderBlock,
    pub body: Vec<u8>,
}

/// The outcome of a flag mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlagChange {
    /// Whether any bit actually changed. An idempotent no-op is `false`.
    pub changed: bool,
    /// Whether the change is visible outside the store. Changes confined to
    /// the internal scratch range are excluded from the "folder changed"
    /// contract: they do not dirty the store and do not notify.
    pub user_visible: bool,
}

/// One message's metadata in a folder summary.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntry {
    uid: Option<Uid>,
    flags: MessageFlags,
    user_flags: UserFlags,
    user_tags: UserTags,
    subject: Arc<str>,
    from: Arc<str>,
    to: Arc<str>,
    cc: Arc<str>,
    /// 64-bit partial hash of the Message-ID, 0 when absent.
    message_id: u64,
    /// Partial hashes of the References chain, oldest first.
    references: Vec<u64>,
    /// Unix seconds from the Date header, 0 when unparseable.
    date_sent: i64,
    /// Unix seconds at which this entry first learned of the message.
    date_received: i64,
    size: u32,
    content: Option<ContentInfo>,
}

impl Default for MessageEntry {
    fn default() -> Self {
        let empty = intern("");
        MessageEntry {
            uid: None,
            flags: MessageFlags::empty(),
            user_flags: UserFlags::new(),
            user_tags: UserTags::new(),
            subject: Arc::clone(&empty),
            from: Arc::clone(&empty),
            to: Arc::clone(&empty),
            cc: empty,
            message_id: 0,
            references: Vec::new(),
            date_sent: 0,
            date_received: 0,
            size: 0,
            content: None,
        }
    }
}

impl MessageEntry {
    /// Build an entry from a raw header block.
    ///
    /// Header parsing is best-effort: malformed input yields an entry with
    /// whatever fields could be salvaged, never an error.
    pub fn from_headers(raw: &[u8]) -> Self {
        Self::from_block(&HeaderBlock::scan(raw), 0)
    }

    /// Build an entry from a reader positioned at the start of a message.
    ///
    /// The headers are scanned and the remainder of the stream is measured
    /// (not retained) to fill in the size field. Only I/O errors fail.
    pub fn from_stream(src: &mut impl BufRead) -> Result<Self, Error> {
        let block = HeaderBlock::read_from(src)?;

        let mut size = 0u64;
        let mut buf = [0u8; 8192];
        loop {
            match src.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => size += n as u64,
                Err(e) if io::ErrorKind::Interrupted == e.kind() => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Self::from_block(&block, size.min(u32::max_value().into()) as u32))
    }

    /// Build an entry from a fully materialised message.
    pub fn from_message(message: &Message) -> Self {
        let mut this = Self::from_block(
            &message.headers,
            message.body.len().min(u32::max_value() as usize) as u32,
        );

        // The top-level structure is knowable without parsing the body.
        if let Some(ct) = message.headers.get("Content-Type") {
            let mut info = parse_content_type(ct);
            info.size = this.size;
            if let Some(enc) =
                message.headers.get("Content-Transfer-Encoding")
            {
                info.encoding = enc.trim().to_ascii_lowercase();
            }
            if "multipart" == info.ctype && "mixed" == info.subtype {
                this.flags |= MessageFlags::ATTACHMENTS;
            }
            this.content = Some(info);
        }

        this
    }

    fn from_block(block: &HeaderBlock, size: u32) -> Self {
        let mut this = MessageEntry::default();
        this.subject = intern(block.get("Subject").unwrap_or(""));
        this.from = intern(block.get("From").unwrap_or(""));
        this.to = intern(block.get("To").unwrap_or(""));
        this.cc = intern(block.get("Cc").unwrap_or(""));
        this.message_id = block
            .get("Message-ID")
            .map(message_id_hash)
            .unwrap_or(0);
        this.references = block
            .get("References")
            .map(|v| {
                headers::split_references(v)
                    .into_iter()
                    .map(message_id_hash)
                    .collect()
            })
            .unwrap_or_default();
        this.date_sent = block
            .get("Date")
            .and_then(headers::parse_date)
            .map(|d| d.timestamp())
            .unwrap_or(0);
        this.date_received = Utc::now().timestamp();
        this.size = size;
        this
    }

    // ==================== Accessors ====================

    /// The entry's UID, if one has been assigned yet.
    ///
    /// Entries obtained from a summary store always have one.
    pub fn uid(&self) -> Option<Uid> {
        self.uid
    }

    pub(crate) fn assign_uid(&mut self, uid: Uid) {
        self.uid = Some(uid);
    }

    pub fn flags(&self) -> MessageFlags {
        self.flags
    }

    pub fn user_flags(&self) -> &UserFlags {
        &self.user_flags
    }

    pub fn user_tags(&self) -> &UserTags {
        &self.user_tags
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn cc(&self) -> &str {
        &self.cc
    }

    pub fn message_id(&self) -> u64 {
        self.message_id
    }

    pub fn references(&self) -> &[u64] {
        &self.references
    }

    pub fn date_sent(&self) -> Option<DateTime<Utc>> {
        if 0 == self.date_sent {
            None
        } else {
            Utc.timestamp_opt(self.date_sent, 0).single()
        }
    }

    pub fn date_received(&self) -> Option<DateTime<Utc>> {
        if 0 == self.date_received {
            None
        } else {
            Utc.timestamp_opt(self.date_received, 0).single()
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn content(&self) -> Option<&ContentInfo> {
        self.content.as_ref()
    }

    pub fn set_content(&mut self, content: Option<ContentInfo>) {
        self.content = content;
    }

    // ==================== Mutation ====================

    /// Set or clear every flag in `mask`.
    pub fn set_flags(&mut self, mask: MessageFlags, value: bool) -> FlagChange {
        let old = self.flags;
        if value {
            self.flags |= mask;
        } else {
            self.flags &= !mask;
        }

        let delta = old ^ self.flags;
        FlagChange {
            changed: !delta.is_empty(),
            user_visible: !delta.user_visible().is_empty(),
        }
    }

    /// Set or clear the named user flag. Always a user-visible change when
    /// anything changes at all.
    pub fn set_user_flag(&mut self, name: &str, value: bool) -> FlagChange {
        let changed = self.user_flags.set(name, value);
        FlagChange {
            changed,
            user_visible: changed,
        }
    }

    /// Set, replace, or (with an empty value) remove the named user tag.
    pub fn set_user_tag(&mut self, name: &str, value: &str) -> FlagChange {
        let changed = self.user_tags.set(name, value);
        FlagChange {
            changed,
            user_visible: changed,
        }
    }

    // ==================== Record codec ====================

    /// Append this entry's length-framed record to `out`.
    pub fn write_record(&self, out: &mut impl Write) -> io::Result<()> {
        let mut body = Vec::new();
        varint::write_u32(
            &mut body,
            self.uid.map(u32::from).unwrap_or(0),
        )?;
        varint::write_u32(&mut body, self.flags.bits())?;
        varint::write_i64(&mut body, self.date_sent)?;
        varint::write_i64(&mut body, self.date_received)?;
        varint::write_u32(&mut body, self.size)?;
        token::write_string(&mut body, &self.subject)?;
        token::write_string(&mut body, &self.from)?;
        token::write_string(&mut body, &self.to)?;
        token::write_string(&mut body, &self.cc)?;
        body.write_u64::<LittleEndian>(self.message_id)?;
        varint::write_u64(&mut body, self.references.len() as u64)?;
        for reference in &self.references {
            body.write_u64::<LittleEndian>(*reference)?;
        }
        self.user_flags.write_to(&mut body)?;
        self.user_tags.write_to(&mut body)?;
        match self.content {
            Some(ref content) => {
                varint::write_u32(&mut body, 1)?;
                content.write_to(&mut body)?;
            },
            None => varint::write_u32(&mut body, 0)?,
        }

        varint::write_u64(out, body.len() as u64)?;
        out.write_all(&body)
    }

    /// Decode one length-framed record from `src`.
    ///
    /// On a decode failure the reader is left positioned after the frame
    /// whenever the frame length itself was readable, so the caller can skip
    /// the bad record and continue with the next one.
    pub fn read_record(src: &mut impl Read) -> Result<Self, Error> {
        let len = varint::read_u64(src)?;
        if len > MAX_RECORD {
            return Err(Error::BadRecord);
        }

        let mut frame = vec![0u8; len as usize];
        src.read_exact(&mut frame).map_err(|e| {
            if io::ErrorKind::UnexpectedEof == e.kind() {
                Error::TruncatedRecord
            } else {
                Error::Io(e)
            }
        })?;

        Self::decode_frame(&frame)
    }

    fn decode_frame(frame: &[u8]) -> Result<Self, Error> {
        let mut src = frame;

        let mut this = MessageEntry::default();
        this.uid = Uid::of(varint::read_u32(&mut src)?);
        this.flags =
            MessageFlags::from_bits_truncate(varint::read_u32(&mut src)?);
        this.date_sent = varint::read_i64(&mut src)?;
        this.date_received = varint::read_i64(&mut src)?;
        this.size = varint::read_u32(&mut src)?;
        this.subject = intern(&token::read_string(&mut src)?);
        this.from = intern(&token::read_string(&mut src)?);
        this.to = intern(&token::read_string(&mut src)?);
        this.cc = intern(&token::read_string(&mut src)?);
        this.message_id = src
            .read_u64::<LittleEndian>()
            .map_err(|_| Error::TruncatedRecord)?;
        let reference_count = varint::read_u64(&mut src)?;
        // Each reference occupies eight of the remaining frame bytes; a
        // count the frame cannot hold must be rejected before allocation.
        if reference_count > (src.len() / 8) as u64 {
            return Err(Error::BadRecord);
        }
        let mut references = Vec::with_capacity(reference_count as usize);
        for _ in 0..reference_count {
            references.push(
                src.read_u64::<LittleEndian>()
                    .map_err(|_| Error::TruncatedRecord)?,
            );
        }
        this.references = references;
        this.user_flags = UserFlags::read_from(&mut src)?;
        this.user_tags = UserTags::read_from(&mut src)?;
        this.content = match varint::read_u32(&mut src)? {
            0 => None,
            1 => Some(ContentInfo::read_from(&mut src)?),
            _ => return Err(Error::BadRecord),
        };

        // Trailing bytes within the frame belong to a newer minor format
        // revision and are ignored.
        Ok(this)
    }
}

/// Pull (type, subtype) out of a Content-Type value, best-effort.
fn parse_content_type(value: &str) -> ContentInfo {
    let essence = value.split(';').next().unwrap_or("").trim();
    let mut halves = essence.splitn(2, '/');
    let ctype = halves.next().unwrap_or("").trim().to_ascii_lowercase();
    let subtype = halves.next().unwrap_or("").trim().to_ascii_lowercase();
    ContentInfo::new(&ctype, &subtype)
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_raw() -> &'static [u8] {
        b"From: Alice <alice@example.com>\r\n\
          To: bob@example.com\r\n\
          Cc: carol@example.com\r\n\
          Subject: Quarterly report\r\n\
          Message-ID: <msg1@example.com>\r\n\
          References: <a@x> <b@y>\r\n\
          Date: Tue, 1 Jul 2003 10:52:37 +0200\r\n\
          Content-Type: multipart/mixed; boundary=\"xyz\"\r\n\
          \r\n\
          body body body\r\n"
    }

    #[test]
    fn from_headers_extracts_envelope() {
        let entry = MessageEntry::from_headers(sample_raw());
        assert_eq!("Quarterly report", entry.subject());
        assert_eq!("Alice <alice@example.com>", entry.from());
        assert_eq!("bob@example.com", entry.to());
        assert_eq!("carol@example.com", entry.cc());
        assert_eq!(message_id_hash("<msg1@example.com>"), entry.message_id());
        assert_eq!(2, entry.references().len());
        assert_eq!(message_id_hash("<a@x>"), entry.references()[0]);
        assert!(entry.date_sent().is_some());
        assert_eq!(None, entry.uid());
    }

    #[test]
    fn from_stream_measures_body() {
        let mut src = sample_raw();
        let entry = MessageEntry::from_stream(&mut src).unwrap();
        assert_eq!("Quarterly report", entry.subject());
        assert_eq!(b"body body body\r\n".len() as u32, entry.size());
    }

    #[test]
    fn from_message_outlines_top_level_content() {
        let message = Message {
            headers: HeaderBlock::scan(sample_raw()),
            body: b"body body body\r\n".to_vec(),
        };
        let entry = MessageEntry::from_message(&message);
        assert!(entry.flags().contains(MessageFlags::ATTACHMENTS));
        let content = entry.content().unwrap();
        assert_eq!("multipart", content.ctype);
        assert_eq!("mixed", content.subtype);
    }

    #[test]
    fn malformed_headers_still_produce_an_entry() {
        let entry = MessageEntry::from_headers(b"complete \xff garbage");
        assert_eq!("", entry.subject());
        assert_eq!(0, entry.message_id());
    }

    #[test]
    fn flag_mutation_reports_change() {
        let mut entry = MessageEntry::default();

        let change = entry.set_flags(MessageFlags::SEEN, true);
        assert!(change.changed);
        assert!(change.user_visible);

        // Idempotent no-op
        let change = entry.set_flags(MessageFlags::SEEN, true);
        assert!(!change.changed);
        assert!(!change.user_visible);

        // Internal scratch bits are invisible
        let change = entry.set_flags(MessageFlags::PENDING_REMOVAL, true);
        assert!(change.changed);
        assert!(!change.user_visible);

        let change = entry.set_flags(MessageFlags::SEEN, false);
        assert!(change.changed);
        assert!(change.user_visible);
    }

    #[test]
    fn user_flag_and_tag_mutation() {
        let mut entry = MessageEntry::default();
        assert!(entry.set_user_flag("$Forwarded", true).user_visible);
        assert!(!entry.set_user_flag("$Forwarded", true).changed);
        assert!(entry.set_user_tag("label", "work").user_visible);
        assert!(entry.set_user_tag("label", "").changed);
        assert_eq!(None, entry.user_tags().get("label"));
    }

    fn round_trip(entry: &MessageEntry) -> MessageEntry {
        let mut buf = Vec::new();
        entry.write_record(&mut buf).unwrap();
        let mut src = &buf[..];
        let reread = MessageEntry::read_record(&mut src).unwrap();
        assert!(src.is_empty());
        reread
    }

    #[test]
    fn record_round_trip() {
        let mut entry = MessageEntry::from_message(&Message {
            headers: HeaderBlock::scan(sample_raw()),
            body: b"body body body\r\n".to_vec(),
        });
        entry.assign_uid(Uid::u(17));
        entry.set_flags(MessageFlags::SEEN | MessageFlags::FLAGGED, true);
        entry.set_user_flag("$MDNSent", true);
        entry.set_user_tag("label", "reports");

        assert_eq!(entry, round_trip(&entry));
    }

    #[test]
    fn minimal_record_round_trip() {
        let mut entry = MessageEntry::default();
        entry.assign_uid(Uid::u(1));
        assert_eq!(entry, round_trip(&entry));
    }

    #[test]
    fn corrupt_record_does_not_desynchronise() {
        let mut good = MessageEntry::default();
        good.assign_uid(Uid::u(2));

        let mut buf = Vec::new();
        // A frame whose contents are garbage
        varint::write_u64(&mut buf, 4).unwrap();
        buf.extend_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        good.write_record(&mut buf).unwrap();

        let mut src = &buf[..];
        assert!(MessageEntry::read_record(&mut src).is_err());
        // The reader skipped the bad frame and the next record is intact
        assert_eq!(good, MessageEntry::read_record(&mut src).unwrap());
    }

    #[test]
    fn absurd_reference_count_is_rejected() {
        // A well-formed record up to the References list, then a count far
        // beyond what the frame could hold
        let mut body = Vec::new();
        varint::write_u32(&mut body, 3).unwrap();
        varint::write_u32(&mut body, 0).unwrap();
        varint::write_i64(&mut body, 0).unwrap();
        varint::write_i64(&mut body, 0).unwrap();
        varint::write_u32(&mut body, 0).unwrap();
        for _ in 0..4 {
            token::write_string(&mut body, "").unwrap();
        }
        body.write_u64::<LittleEndian>(0).unwrap();
        varint::write_u64(&mut body, 1 << 21).unwrap();

        let mut buf = Vec::new();
        varint::write_u64(&mut buf, body.len() as u64).unwrap();
        buf.extend_from_slice(&body);

        assert_matches!(
            Err(crate::support::error::Error::BadRecord),
            MessageEntry::read_record(&mut &buf[..])
        );
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut buf = Vec::new();
        varint::write_u64(&mut buf, MAX_RECORD + 1).unwrap();
        assert_matches!(
            Err(crate::support::error::Error::BadRecord),
            MessageEntry::read_record(&mut &buf[..])
        );
    }
}
