//! Partition entries
//!
//! A [`PartitionRow`] is one CSV row as written, where offset and size may
//! still be missing. The table engine resolves each row into a
//! [`PartitionEntry`], which always has a concrete offset and size and maps
//! one-to-one onto a 32-byte binary record:
//!
//! ```text
//! 0x00  magic    [u8; 2]   0xAA 0x50
//! 0x02  type     u8
//! 0x03  subtype  u8
//! 0x04  offset   u32 (LE)
//! 0x08  size     u32 (LE)
//! 0x0C  name     [u8; 16]  NUL padded
//! 0x1C  flags    u32 (LE)
//! ```

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::flags::PartitionFlags;
use super::types::{is_subtype_keyword, PartitionType, SubType, TYPE_KEYWORDS};
use crate::error::{Error, Result};
use crate::literal::{format_size, parse_int};

/// Size of one binary record
pub const RECORD_SIZE: usize = 32;

/// Magic bytes at the start of every entry record
pub const ENTRY_MAGIC: [u8; 2] = [0xAA, 0x50];

/// Size of the NUL padded name field
pub const NAME_LEN: usize = 16;

/// Byte offset of the name field inside a record
const NAME_FIELD_OFFSET: usize = 12;

/// Number of columns in a CSV row
const CSV_COLUMNS: usize = 6;

/// On-flash layout of one entry
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct RawEntry {
    magic: [u8; 2],
    kind: u8,
    subtype: u8,
    offset: U32,
    size: U32,
    name: [u8; NAME_LEN],
    flags: U32,
}

/// Size column of a CSV row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSize {
    /// Explicit length in bytes
    Bytes(u32),
    /// Negative size: the partition extends up to this absolute offset
    EndsAt(u32),
}

/// One CSV row before layout resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRow {
    /// 1-based line number in the CSV document
    pub line: usize,
    /// Partition name
    pub name: String,
    /// Partition type
    pub kind: PartitionType,
    /// Partition subtype
    pub subtype: SubType,
    /// Offset, or `None` to place the partition after the previous one
    pub offset: Option<u32>,
    /// Size, or `None` if the column was empty
    pub size: Option<RowSize>,
    /// Flags column
    pub flags: PartitionFlags,
}

impl PartitionRow {
    /// Parse one CSV row
    ///
    /// Missing trailing columns are treated as empty; columns beyond the
    /// sixth are ignored. Errors carry the line number.
    pub fn from_csv_row(row: &str, line: usize) -> Result<Self> {
        Self::parse_columns(row, line).map_err(|e| e.at_line(line))
    }

    fn parse_columns(row: &str, line: usize) -> Result<Self> {
        let mut fields: Vec<&str> = row.split(',').map(str::trim).collect();
        if fields.len() < CSV_COLUMNS {
            fields.resize(CSV_COLUMNS, "");
        }

        let kind = PartitionType::parse(fields[1])?;
        let subtype = SubType::parse(kind, fields[2])?;

        let offset = match fields[3] {
            "" => None,
            text => Some(parse_u32(text, "an offset between 0 and 0xFFFFFFFF")?),
        };

        let size = match fields[4] {
            "" => None,
            text => {
                let value = parse_int(text, &[])?;
                let magnitude = u32::try_from(value.unsigned_abs()).map_err(|_| {
                    Error::InvalidField {
                        value: text.to_string(),
                        expected: "a size that fits in 32 bits".to_string(),
                    }
                })?;
                Some(if value < 0 {
                    RowSize::EndsAt(magnitude)
                } else {
                    RowSize::Bytes(magnitude)
                })
            }
        };

        Ok(Self {
            line,
            name: fields[0].to_string(),
            kind,
            subtype,
            offset,
            size,
            flags: PartitionFlags::parse(fields[5])?,
        })
    }

    /// Turn this row into an entry placed at `offset`
    ///
    /// `offset` is the row's own offset or the one chosen by layout
    /// resolution. A negative size becomes `end - offset`.
    pub fn resolve(self, offset: u32) -> Result<PartitionEntry> {
        let size = match self.size {
            None => {
                return Err(Error::MissingRequiredField {
                    name: self.name,
                    field: "size",
                }
                .at_line(self.line))
            }
            Some(RowSize::Bytes(size)) => size,
            Some(RowSize::EndsAt(end)) => end.checked_sub(offset).ok_or_else(|| {
                Error::EndBeforeOffset {
                    name: self.name.clone(),
                    end,
                    offset,
                }
                .at_line(self.line)
            })?,
        };

        Ok(PartitionEntry {
            name: self.name,
            kind: self.kind,
            subtype: self.subtype,
            offset,
            size,
            flags: self.flags,
        })
    }
}

fn parse_u32(text: &str, expected: &str) -> Result<u32> {
    let value = parse_int(text, &[])?;
    u32::try_from(value).map_err(|_| Error::InvalidField {
        value: text.to_string(),
        expected: expected.to_string(),
    })
}

/// A non-fatal problem noticed while decoding or validating an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryWarning {
    /// Name is a type keyword that names a different type
    TypeName {
        /// Partition name
        name: String,
        /// Actual type code
        kind: u8,
    },
    /// Name is a subtype keyword that does not match the entry
    SubtypeName {
        /// Partition name
        name: String,
        /// Actual type code
        kind: u8,
        /// Actual subtype code
        subtype: u8,
    },
    /// Flags word had bits without a known meaning
    UnknownFlags {
        /// Partition name
        name: String,
        /// The unknown bits
        bits: u32,
    },
}

impl fmt::Display for EntryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeName { name, kind } => write!(
                f,
                "partition has name '{}' which is a partition type, but does not match this partition's type (0x{:x}). Mistake in partition table?",
                name, kind
            ),
            Self::SubtypeName {
                name,
                kind,
                subtype,
            } => write!(
                f,
                "partition has name '{}' which is a partition subtype, but this partition has non-matching type 0x{:x} and subtype 0x{:x}. Mistake in partition table?",
                name, kind, subtype
            ),
            Self::UnknownFlags { name, bits } => write!(
                f,
                "partition '{}' had unknown flag(s) 0x{:08x}. Newer binary format?",
                name, bits
            ),
        }
    }
}

/// A resolved partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntry {
    /// Partition name (at most 16 bytes when encoded)
    pub name: String,
    /// Partition type
    pub kind: PartitionType,
    /// Partition subtype
    pub subtype: SubType,
    /// Absolute offset in flash
    pub offset: u32,
    /// Length in bytes
    pub size: u32,
    /// Flags
    pub flags: PartitionFlags,
}

impl PartitionEntry {
    /// Create an entry without flags
    ///
    /// The subtype is normalized against `kind`, so `Other(2)` under
    /// [`PartitionType::Data`] becomes [`SubType::Nvs`].
    pub fn new(
        name: impl Into<String>,
        kind: PartitionType,
        subtype: SubType,
        offset: u32,
        size: u32,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            subtype: SubType::from_raw(kind, subtype.raw()),
            offset,
            size,
            flags: PartitionFlags::default(),
        }
    }

    /// First byte after this partition
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }

    /// Check if this partition overlaps another
    pub fn overlaps(&self, other: &PartitionEntry) -> bool {
        u64::from(self.offset) < other.end() && u64::from(other.offset) < self.end()
    }

    /// Decode one 32-byte record
    ///
    /// `position` is the byte offset of the record in its source and is only
    /// used in error messages. Unknown flag bits are logged and dropped.
    pub fn from_record(record: &[u8; RECORD_SIZE], position: usize) -> Result<Self> {
        let raw: RawEntry = zerocopy::transmute!(*record);

        if raw.magic != ENTRY_MAGIC {
            return Err(Error::BadMagic {
                offset: position,
                magic: raw.magic,
            });
        }

        let name_len = raw.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        let name = core::str::from_utf8(&raw.name[..name_len])
            .map_err(|_| Error::InvalidName(position + NAME_FIELD_OFFSET))?
            .to_string();

        let kind = PartitionType::from(raw.kind);
        let entry = Self {
            name,
            kind,
            subtype: SubType::from_raw(kind, raw.subtype),
            offset: raw.offset.get(),
            size: raw.size.get(),
            flags: PartitionFlags::from_bits(raw.flags.get()),
        };

        if entry.flags.unknown != 0 {
            log::warn!(
                "{}",
                EntryWarning::UnknownFlags {
                    name: entry.name.clone(),
                    bits: entry.flags.unknown,
                }
            );
        }
        log::debug!("Decoded record at 0x{:x}: {}", position, entry);

        Ok(entry)
    }

    /// Encode this entry as a 32-byte record
    pub fn to_record(&self) -> Result<[u8; RECORD_SIZE]> {
        let name_bytes = self.name.as_bytes();
        if name_bytes.len() > NAME_LEN {
            return Err(Error::NameTooLong(self.name.clone()));
        }
        let mut name = [0u8; NAME_LEN];
        name[..name_bytes.len()].copy_from_slice(name_bytes);

        let raw = RawEntry {
            magic: ENTRY_MAGIC,
            kind: self.kind.raw(),
            subtype: self.subtype.raw(),
            offset: U32::new(self.offset),
            size: U32::new(self.size),
            name,
            flags: U32::new(self.flags.bits()),
        };
        let record: [u8; RECORD_SIZE] = zerocopy::transmute!(raw);
        Ok(record)
    }

    /// Render this entry as one CSV row
    ///
    /// With `simple` set, type and subtype are always decimal and the size
    /// is always hex; otherwise keywords and `K`/`M` sizes are used where
    /// possible.
    pub fn to_csv_row(&self, simple: bool) -> String {
        let kind = match self.kind.keyword() {
            Some(keyword) if !simple => keyword.to_string(),
            _ => format!("{}", self.kind.raw()),
        };
        let subtype = match self.subtype.keyword(self.kind) {
            Some(keyword) if !simple => keyword.to_string(),
            _ => format!("{}", self.subtype.raw()),
        };
        let size = if simple {
            format!("0x{:x}", self.size)
        } else {
            format_size(self.size)
        };

        vec![
            self.name.clone(),
            kind,
            subtype,
            format!("0x{:x}", self.offset),
            size,
            self.flags.to_csv(),
        ]
        .join(",")
    }

    /// Validate this entry on its own
    ///
    /// The offset must be aligned for the partition type; in secure mode
    /// the size must be too. Name/keyword collisions are logged as
    /// warnings.
    pub fn validate(&self, secure: bool) -> Result<()> {
        let alignment = self.kind.alignment();
        if self.offset % alignment != 0 {
            return Err(Error::AlignmentViolation {
                name: self.name.clone(),
                field: "offset",
                value: self.offset,
                alignment,
            });
        }
        if secure && self.size % alignment != 0 {
            return Err(Error::AlignmentViolation {
                name: self.name.clone(),
                field: "size",
                value: self.size,
                alignment,
            });
        }

        for warning in self.warnings() {
            log::warn!("{}", warning);
        }
        Ok(())
    }

    /// Name/keyword collisions that hint at a mistake in the table
    pub fn warnings(&self) -> Vec<EntryWarning> {
        let mut warnings = Vec::new();

        let type_match = TYPE_KEYWORDS
            .iter()
            .find(|&&(keyword, _)| keyword == self.name);
        if let Some(&(_, code)) = type_match {
            if code != self.kind.raw() {
                warnings.push(EntryWarning::TypeName {
                    name: self.name.clone(),
                    kind: self.kind.raw(),
                });
            }
        }

        if is_subtype_keyword(&self.name) {
            let own = self
                .kind
                .subtype_keywords()
                .iter()
                .find(|&&(keyword, _)| keyword == self.name)
                .map(|&(_, code)| code);
            if own != Some(self.subtype.raw()) {
                warnings.push(EntryWarning::SubtypeName {
                    name: self.name.clone(),
                    kind: self.kind.raw(),
                    subtype: self.subtype.raw(),
                });
            }
        }

        warnings
    }
}

impl fmt::Display for PartitionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Part '{}' {}/{} @ 0x{:x} size 0x{:x}",
            self.name,
            self.kind.raw(),
            self.subtype.raw(),
            self.offset,
            self.size
        )
    }
}
