//! Partition entries and their codes
//!
//! This module provides the per-partition half of the codec:
//!
//! - [`PartitionType`] / [`SubType`] - type codes with keyword lookup
//! - [`PartitionFlags`] - named flag bits
//! - [`PartitionRow`] - one unresolved CSV row
//! - [`PartitionEntry`] - one resolved partition and its 32-byte record

mod entry;
mod flags;
mod types;

pub use entry::{EntryWarning, PartitionEntry, PartitionRow, RowSize, ENTRY_MAGIC, NAME_LEN, RECORD_SIZE};
pub use flags::{FlagBits, PartitionFlags};
pub use types::*;
