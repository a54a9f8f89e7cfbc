//! Error types for ptable-core
//!
//! One error enum covers literal parsing, row/record decoding, layout
//! resolution and table validation. Every error aborts the conversion it
//! occurred in; nothing is recovered internally.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "std")]
use thiserror::Error;

/// Details about an overlapping partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlap {
    /// A partition starts inside the region reserved for the partition table
    PartitionTable {
        /// Name of the offending partition
        name: String,
        /// Offset the partition starts at
        offset: u32,
        /// First byte after the reserved table region
        table_end: u64,
        /// Whether this is the first partition of the document
        first: bool,
    },
    /// A partition starts before the previous one ends
    Partition {
        /// Name of the offending partition
        name: String,
        /// Offset the partition starts at
        offset: u32,
        /// Name of the partition it collides with
        previous: String,
        /// Start of the previous partition
        previous_start: u32,
        /// End (exclusive) of the previous partition
        previous_end: u64,
    },
}

impl fmt::Display for Overlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartitionTable {
                name,
                offset,
                table_end,
                first: true,
            } => write!(
                f,
                "first partition '{}' offset 0x{:x} overlaps end of partition table 0x{:x}",
                name, offset, table_end
            ),
            Self::PartitionTable {
                name,
                offset,
                table_end,
                first: false,
            } => write!(
                f,
                "partition '{}' offset 0x{:x} is below 0x{:x}",
                name, offset, table_end
            ),
            Self::Partition {
                name,
                offset,
                previous,
                previous_start,
                previous_end,
            } => write!(
                f,
                "partition '{}' at 0x{:x} overlaps partition '{}' at 0x{:x}-0x{:x}",
                name,
                offset,
                previous,
                previous_start,
                previous_end.saturating_sub(1)
            ),
        }
    }
}

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum Error {
    /// A numeric or keyword field could not be parsed
    #[cfg_attr(
        feature = "std",
        error("invalid field value '{value}', expected {expected}")
    )]
    InvalidField {
        /// The offending text
        value: String,
        /// What was accepted instead
        expected: String,
    },

    /// A mandatory CSV field was empty
    #[cfg_attr(feature = "std", error("field '{0}' can't be left empty"))]
    EmptyField(&'static str),

    /// The flags column named a flag that does not exist
    #[cfg_attr(feature = "std", error("flags column contains unknown flag '{0}'"))]
    UnknownFlag(String),

    /// A `$NAME` reference could not be expanded
    #[cfg_attr(feature = "std", error("unknown variable '{0}'"))]
    UnknownVariable(String),

    /// A field was still unset when the entry had to be resolved
    #[cfg_attr(feature = "std", error("partition '{name}': {field} field is not set"))]
    MissingRequiredField {
        /// Partition name
        name: String,
        /// Field that is missing
        field: &'static str,
    },

    /// A negative size points to an end before the partition offset
    #[cfg_attr(
        feature = "std",
        error("partition '{name}': end 0x{end:x} lies before offset 0x{offset:x}")
    )]
    EndBeforeOffset {
        /// Partition name
        name: String,
        /// Requested end of the partition
        end: u32,
        /// Resolved offset of the partition
        offset: u32,
    },

    /// Automatic placement ran past the 32-bit address space
    #[cfg_attr(
        feature = "std",
        error("partition '{0}' does not fit below the 4 GiB address limit")
    )]
    AddressOutOfRange(String),

    /// Partitions overlap each other or the partition table
    #[cfg_attr(feature = "std", error("{0}"))]
    Overlap(Overlap),

    /// Offset or size is not aligned for the partition type
    #[cfg_attr(
        feature = "std",
        error("partition '{name}': {field} 0x{value:x} is not aligned to 0x{alignment:x}")
    )]
    AlignmentViolation {
        /// Partition name
        name: String,
        /// `"offset"` or `"size"`
        field: &'static str,
        /// The misaligned value
        value: u32,
        /// Required alignment
        alignment: u32,
    },

    /// Several partitions share a name
    #[cfg_attr(
        feature = "std",
        error("partition names must be unique, duplicates: {}", .0.join(" | "))
    )]
    DuplicateNames(Vec<String>),

    /// Name does not fit the 16-byte name field
    #[cfg_attr(
        feature = "std",
        error("partition name '{0}' is longer than 16 bytes")
    )]
    NameTooLong(String),

    /// Name in a binary record is not valid UTF-8
    #[cfg_attr(
        feature = "std",
        error("partition name at byte offset 0x{0:x} is not valid UTF-8")
    )]
    InvalidName(usize),

    /// A binary record does not start with the entry magic
    #[cfg_attr(
        feature = "std",
        error("invalid magic bytes {magic:02x?} for partition record at byte offset 0x{offset:x}")
    )]
    BadMagic {
        /// Byte offset of the record in the input
        offset: usize,
        /// The magic that was found
        magic: [u8; 2],
    },

    /// Embedded MD5 digest does not match the entries read
    #[cfg_attr(
        feature = "std",
        error("MD5 checksums don't match (computed: 0x{computed:032x}, parsed: 0x{stored:032x})")
    )]
    ChecksumMismatch {
        /// Digest of the entry bytes read so far
        computed: u128,
        /// Digest stored in the checksum record
        stored: u128,
    },

    /// Binary input ended without an end-of-table marker
    #[cfg_attr(
        feature = "std",
        error("partition table is missing an end-of-table marker (input ends at byte offset 0x{0:x})")
    )]
    TruncatedTable(usize),

    /// Serialized entries do not fit the reserved sector space
    #[cfg_attr(
        feature = "std",
        error("binary partition table length ({len}) longer than max ({max})")
    )]
    TableTooLarge {
        /// Length of entries plus checksum record
        len: usize,
        /// Exclusive limit
        max: usize,
    },

    /// Partitions extend past the configured flash size
    #[cfg_attr(
        feature = "std",
        error(
            "partitions occupy {:.1}MB of flash ({table_size} bytes) which does not fit in configured flash size {:.1}MB",
            mib(.table_size),
            mib(.flash_size)
        )
    )]
    CapacityExceeded {
        /// End of the highest partition
        table_size: u64,
        /// Declared flash size
        flash_size: u64,
    },

    /// Configuration could not be loaded
    #[cfg_attr(feature = "std", error("invalid configuration: {0}"))]
    InvalidConfig(String),

    /// A row-level error together with its CSV line number
    #[cfg_attr(feature = "std", error("error at line {line}: {source}"))]
    AtLine {
        /// 1-based line number in the CSV document
        line: usize,
        /// The underlying error
        source: Box<Error>,
    },
}

impl Error {
    /// Attach a CSV line number to this error
    pub fn at_line(self, line: usize) -> Self {
        Error::AtLine {
            line,
            source: Box::new(self),
        }
    }

    /// The error with any line information stripped
    pub fn kind(&self) -> &Error {
        match self {
            Error::AtLine { source, .. } => source.kind(),
            other => other,
        }
    }
}

#[cfg(feature = "std")]
fn mib(bytes: &u64) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
