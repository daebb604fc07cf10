//! Index decoding (header + entry records).
//!
//! Record layout, all integers big-endian:
//!
//! ```text
//! ctime.secs ctime.nanos mtime.secs mtime.nanos dev ino mode uid gid size   40 bytes
//! oid                                                                       20 bytes
//! flags                                                                      2 bytes
//! [extended flags, v3+ only when flags & 0x4000]                             2 bytes
//! name                                                                  name_len bytes
//! NUL padding to the next multiple of 8 (1..=8 bytes)
//! ```
//!
//! The padding is measured from the start of the record. Every padding byte
//! must be zero; anything else means the decoder has lost the record boundary.

use bstr::BString;
use git_hash::ObjectId;
use tracing::{debug, warn};

use crate::entry::{CacheTime, EntryFlags, EntryMetadata, IndexEntry, IndexHeader};
use crate::reader::BinaryReader;
use crate::{
    IndexError, ENTRY_ALIGNMENT, ENTRY_FIXED_SIZE, HEADER_SIZE, INDEX_SIGNATURE,
    SUPPORTED_VERSIONS,
};

/// Bits of the extended flags word this decoder understands.
const EXTENDED_KNOWN: u16 = 0x4000 | 0x2000;

/// Why a record was decoded but left out of the entry list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The 12-bit name length hit its 0xFFF sentinel.
    LongName,
}

/// A record that was read past but not returned as an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Offset of the record's fixed part in the index buffer.
    pub offset: usize,
    pub path: BString,
    pub oid: ObjectId,
    pub reason: SkipReason,
}

/// Result of decoding one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Entry(IndexEntry),
    Skipped(SkippedEntry),
}

/// A fully decoded index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedIndex {
    pub header: IndexHeader,
    /// Entries in on-disk order.
    pub entries: Vec<IndexEntry>,
    pub skipped: Vec<SkippedEntry>,
    /// Offset just past the last record (where extensions would start).
    pub end_offset: usize,
}

/// Decode a complete index buffer.
pub fn decode(data: &[u8]) -> Result<DecodedIndex, IndexError> {
    IndexDecoder::new(data)?.decode_all()
}

/// Stateful record-by-record decoder over one index buffer.
///
/// The header is validated on construction. After any error the decoder is
/// exhausted and yields nothing further.
#[derive(Debug)]
pub struct IndexDecoder<'a> {
    reader: BinaryReader<'a>,
    header: IndexHeader,
    offset: usize,
    remaining: u32,
}

impl<'a> IndexDecoder<'a> {
    /// Validate the header and position the decoder at the first record.
    pub fn new(data: &'a [u8]) -> Result<Self, IndexError> {
        let reader = BinaryReader::new(data);
        let signature = reader.array::<4>(0)?;
        if &signature != INDEX_SIGNATURE {
            return Err(IndexError::InvalidSignature(signature));
        }

        let version = reader.u32_be(4)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(IndexError::UnsupportedVersion(version));
        }

        let entry_count = reader.u32_be(8)?;
        debug!(version, entry_count, "index header accepted");

        Ok(Self {
            reader,
            header: IndexHeader {
                signature,
                version,
                entry_count,
            },
            offset: HEADER_SIZE,
            remaining: entry_count,
        })
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    /// Offset of the next record to decode.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Decode the record at the current offset.
    ///
    /// Returns `Ok(None)` once `entry_count` records have been read.
    pub fn next_record(&mut self) -> Result<Option<Record>, IndexError> {
        if self.remaining == 0 {
            return Ok(None);
        }

        match self.parse_record(self.offset) {
            Ok((record, end)) => {
                self.offset = end;
                self.remaining -= 1;
                Ok(Some(record))
            }
            Err(e) => {
                self.remaining = 0;
                Err(e)
            }
        }
    }

    /// Decode every remaining record.
    pub fn decode_all(mut self) -> Result<DecodedIndex, IndexError> {
        // entry_count is untrusted; size the hint by the bytes that can hold records.
        let room = self.reader.len().saturating_sub(self.offset) / (ENTRY_FIXED_SIZE + 2);
        let mut entries = Vec::with_capacity(room.min(self.remaining as usize));
        let mut skipped = Vec::new();

        while let Some(record) = self.next_record()? {
            match record {
                Record::Entry(entry) => entries.push(entry),
                Record::Skipped(skip) => skipped.push(skip),
            }
        }

        Ok(DecodedIndex {
            header: self.header,
            entries,
            skipped,
            end_offset: self.offset,
        })
    }

    fn parse_record(&self, start: usize) -> Result<(Record, usize), IndexError> {
        let r = &self.reader;
        // Make sure the whole fixed part is present before reading any field.
        r.bytes(start, ENTRY_FIXED_SIZE)?;

        let mut flags = EntryFlags::from_raw(r.u16_be(start + 60)?);
        let mut meta = EntryMetadata {
            ctime: CacheTime {
                secs: r.u32_be(start)?,
                nanos: r.u32_be(start + 4)?,
            },
            mtime: CacheTime {
                secs: r.u32_be(start + 8)?,
                nanos: r.u32_be(start + 12)?,
            },
            dev: r.u32_be(start + 16)?,
            ino: r.u32_be(start + 20)?,
            mode: r.u32_be(start + 24)?,
            uid: r.u32_be(start + 28)?,
            gid: r.u32_be(start + 32)?,
            size: r.u32_be(start + 36)?,
            oid: ObjectId::new(r.array::<20>(start + 40)?),
            flags,
        };
        let mut cursor = start + ENTRY_FIXED_SIZE;

        if flags.extended {
            if self.header.version < 3 {
                return Err(IndexError::InvalidEntry {
                    offset: start,
                    reason: "extended flags in v2 index".into(),
                });
            }
            let ext = r.u16_be(cursor)?;
            if ext & !EXTENDED_KNOWN != 0 {
                return Err(IndexError::InvalidEntry {
                    offset: start,
                    reason: format!("unknown extended flags {ext:#06x}"),
                });
            }
            flags.skip_worktree = ext & 0x4000 != 0;
            flags.intent_to_add = ext & 0x2000 != 0;
            meta.flags = flags;
            cursor += 2;
        }

        let name_len = if flags.has_long_name() {
            // The real length only exists as the NUL that ends the name.
            let nul = r.find(cursor, 0).ok_or(IndexError::Truncated {
                offset: cursor,
                needed: EntryFlags::NAME_MASK as usize + 1,
            })?;
            nul - cursor
        } else {
            flags.name_len as usize
        };
        let path = BString::from(r.bytes(cursor, name_len)?);
        cursor += name_len;

        cursor = self.skip_padding(start, cursor)?;

        if flags.has_long_name() {
            warn!(offset = start, len = name_len, "skipping index entry with long path name");
            let skip = SkippedEntry {
                offset: start,
                path,
                oid: meta.oid,
                reason: SkipReason::LongName,
            };
            return Ok((Record::Skipped(skip), cursor));
        }

        debug!(offset = start, path = %path, oid = %meta.oid, "decoded index entry");
        let entry = IndexEntry {
            meta,
            path,
            record_len: cursor - start,
        };
        Ok((Record::Entry(entry), cursor))
    }

    /// Check the NUL padding after a name and return the offset past it.
    fn skip_padding(&self, start: usize, cursor: usize) -> Result<usize, IndexError> {
        let consumed = cursor - start;
        let pad_len = ENTRY_ALIGNMENT - consumed % ENTRY_ALIGNMENT;
        let padding = self.reader.bytes(cursor, pad_len)?;

        if let Some(pos) = padding.iter().position(|&b| b != 0) {
            return Err(IndexError::CorruptPadding {
                offset: cursor + pos,
            });
        }
        Ok(cursor + pad_len)
    }
}
