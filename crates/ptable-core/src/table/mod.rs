//! Partition table engine
//!
//! A [`PartitionTable`] is built in one pass from either representation:
//!
//! - CSV text via [`PartitionTable::from_csv`], which also resolves missing
//!   offsets and negative sizes
//! - a binary sector via [`PartitionTable::from_binary`]
//!
//! and written back out with [`PartitionTable::to_csv`] or
//! [`PartitionTable::to_binary`]. Entries keep document order; sorting by
//! offset only happens as a view during validation.

mod binary;
mod csv;
mod vars;

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

use crate::config::TableConfig;
use crate::error::{Error, Overlap, Result};
use crate::partition::{PartitionEntry, PartitionType, SubType};

pub use binary::{CHECKSUM_MAGIC, MAX_TABLE_LENGTH};
pub use vars::expand_vars;

/// Flash sector reserved for the partition table
pub const TABLE_SECTOR_SIZE: usize = 0x1000;

/// Conventional flash offset of the partition table
pub const DEFAULT_TABLE_OFFSET: u32 = 0x8000;

/// An ordered list of partitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    entries: Vec<PartitionEntry>,
}

impl PartitionTable {
    /// Create a table from already resolved entries, in document order
    pub fn from_entries(entries: Vec<PartitionEntry>) -> Self {
        Self { entries }
    }

    /// Entries in document order
    pub fn entries(&self) -> &[PartitionEntry] {
        &self.entries
    }

    /// Iterate over entries in document order
    pub fn iter(&self) -> impl Iterator<Item = &PartitionEntry> {
        self.entries.iter()
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate the whole table
    ///
    /// Checks every entry on its own, then that names are unique, that no
    /// partition starts inside the table sector and that no two partitions
    /// overlap.
    pub fn validate(&self, config: &TableConfig) -> Result<()> {
        for entry in &self.entries {
            entry.validate(config.secure)?;
        }

        self.check_duplicate_names()?;

        let table_end = config.table_end();
        let mut by_offset: Vec<&PartitionEntry> = self.entries.iter().collect();
        by_offset.sort_by_key(|e| e.offset);

        let mut last: Option<&PartitionEntry> = None;
        for entry in by_offset {
            if u64::from(entry.offset) < table_end {
                return Err(Error::Overlap(Overlap::PartitionTable {
                    name: entry.name.clone(),
                    offset: entry.offset,
                    table_end,
                    first: false,
                }));
            }
            if let Some(prev) = last {
                if u64::from(entry.offset) < prev.end() {
                    return Err(Error::Overlap(Overlap::Partition {
                        name: entry.name.clone(),
                        offset: entry.offset,
                        previous: prev.name.clone(),
                        previous_start: prev.offset,
                        previous_end: prev.end(),
                    }));
                }
            }
            last = Some(entry);
        }

        Ok(())
    }

    fn check_duplicate_names(&self) -> Result<()> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.name.as_str()).or_default() += 1;
        }
        let duplicates: BTreeSet<&str> = counts
            .into_iter()
            .filter(|&(_, count)| count > 1)
            .map(|(name, _)| name)
            .collect();
        if duplicates.is_empty() {
            return Ok(());
        }

        let mut offending: Vec<&PartitionEntry> = self
            .entries
            .iter()
            .filter(|e| duplicates.contains(e.name.as_str()))
            .collect();
        offending.sort_by(|a, b| a.name.cmp(&b.name));

        let rows: Vec<String> = offending.iter().map(|e| e.to_csv_row(false)).collect();
        for row in &rows {
            log::error!("Duplicate partition name: {}", row);
        }
        Err(Error::DuplicateNames(rows))
    }

    /// Bytes of flash the partitions occupy
    ///
    /// This is the end of the partition with the highest offset, or 0 for
    /// an empty table.
    pub fn flash_size(&self) -> u64 {
        self.entries
            .iter()
            .max_by_key(|e| e.offset)
            .map_or(0, PartitionEntry::end)
    }

    /// Check that the partitions fit in a flash chip of `flash_size` bytes
    pub fn check_flash_size(&self, flash_size: u32) -> Result<()> {
        let table_size = self.flash_size();
        if table_size > u64::from(flash_size) {
            return Err(Error::CapacityExceeded {
                table_size,
                flash_size: u64::from(flash_size),
            });
        }
        Ok(())
    }

    /// Find a partition by exact name
    pub fn find_by_name(&self, name: &str) -> Option<&PartitionEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Find the first partition with the given type and subtype
    pub fn find(&self, kind: PartitionType, subtype: SubType) -> Option<&PartitionEntry> {
        self.entries
            .iter()
            .find(|e| e.kind == kind && e.subtype == subtype)
    }

    /// Find a partition by type and subtype given as keywords or numbers
    ///
    /// A type or subtype that is neither a number nor a known keyword is an
    /// error rather than "not found".
    pub fn find_by_type(&self, kind: &str, subtype: &str) -> Result<Option<&PartitionEntry>> {
        let kind = PartitionType::parse(kind)?;
        let subtype = SubType::parse(kind, subtype)?;
        Ok(self.find(kind, subtype))
    }
}

impl<'a> IntoIterator for &'a PartitionTable {
    type Item = &'a PartitionEntry;
    type IntoIter = core::slice::Iter<'a, PartitionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    fn entry(name: &str, kind: PartitionType, subtype: SubType, offset: u32, size: u32) -> PartitionEntry {
        PartitionEntry::new(name, kind, subtype, offset, size)
    }

    fn default_table() -> PartitionTable {
        PartitionTable::from_entries(vec![
            entry("nvs", PartitionType::Data, SubType::Nvs, 0x9000, 0x6000),
            entry("phy_init", PartitionType::Data, SubType::Phy, 0xf000, 0x1000),
            entry("factory", PartitionType::App, SubType::Factory, 0x10000, 0x100000),
        ])
    }

    #[test]
    fn test_validate_ok() {
        assert!(default_table().validate(&TableConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_overlap_names_both() {
        let table = PartitionTable::from_entries(vec![
            entry("nvs", PartitionType::Data, SubType::Nvs, 0x9000, 0x8000),
            entry("phy_init", PartitionType::Data, SubType::Phy, 0xf000, 0x1000),
        ]);
        match table.validate(&TableConfig::default()) {
            Err(Error::Overlap(Overlap::Partition { name, previous, .. })) => {
                assert_eq!(name, "phy_init");
                assert_eq!(previous, "nvs");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validate_below_table() {
        let table = PartitionTable::from_entries(vec![entry(
            "nvs",
            PartitionType::Data,
            SubType::Nvs,
            0x8000,
            0x1000,
        )]);
        assert!(matches!(
            table.validate(&TableConfig::default()),
            Err(Error::Overlap(Overlap::PartitionTable { table_end: 0x9000, .. }))
        ));

        let config = TableConfig {
            offset: 0x6000,
            ..TableConfig::default()
        };
        assert!(table.validate(&config).is_ok());
    }

    #[test]
    fn test_validate_uses_offset_order() {
        // document order differs from flash order
        let table = PartitionTable::from_entries(vec![
            entry("factory", PartitionType::App, SubType::Factory, 0x10000, 0x100000),
            entry("nvs", PartitionType::Data, SubType::Nvs, 0x9000, 0x6000),
        ]);
        assert!(table.validate(&TableConfig::default()).is_ok());
        assert_eq!(table.entries()[0].name, "factory");
    }

    #[test]
    fn test_validate_duplicates() {
        let table = PartitionTable::from_entries(vec![
            entry("storage", PartitionType::Data, SubType::Fat, 0x9000, 0x1000),
            entry("nvs", PartitionType::Data, SubType::Nvs, 0xa000, 0x1000),
            entry("storage", PartitionType::Data, SubType::Spiffs, 0xb000, 0x1000),
        ]);
        assert_eq!(
            table.validate(&TableConfig::default()),
            Err(Error::DuplicateNames(vec![
                "storage,data,fat,0x9000,4K,".to_string(),
                "storage,data,spiffs,0xb000,4K,".to_string(),
            ]))
        );
    }

    #[test]
    fn test_validate_entry_errors_first() {
        let table = PartitionTable::from_entries(vec![entry(
            "factory",
            PartitionType::App,
            SubType::Factory,
            0x18000,
            0x100000,
        )]);
        assert!(matches!(
            table.validate(&TableConfig::default()),
            Err(Error::AlignmentViolation { .. })
        ));
    }

    #[test]
    fn test_flash_size() {
        assert_eq!(PartitionTable::default().flash_size(), 0);
        assert_eq!(default_table().flash_size(), 0x110000);

        assert!(default_table().check_flash_size(2 * 1024 * 1024).is_ok());
        assert_eq!(
            default_table().check_flash_size(1024 * 1024),
            Err(Error::CapacityExceeded {
                table_size: 0x110000,
                flash_size: 0x100000,
            })
        );
    }

    #[test]
    fn test_find() {
        let table = default_table();
        assert_eq!(table.find_by_name("phy_init").unwrap().offset, 0xf000);
        assert!(table.find_by_name("otadata").is_none());

        assert_eq!(
            table.find_by_type("app", "factory").unwrap().unwrap().name,
            "factory"
        );
        assert_eq!(table.find_by_type("1", "2").unwrap().unwrap().name, "nvs");
        assert_eq!(table.find_by_type("data", "coredump").unwrap(), None);
        assert!(table.find_by_type("data", "bogus").is_err());
        assert!(table.find_by_type("bogus", "nvs").is_err());
    }
}
