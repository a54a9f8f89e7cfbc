//! CSV document parsing and rendering
//!
//! ```text
//! # Name,   Type, SubType, Offset,  Size, Flags
//! nvs,      data, nvs,     0x9000,  0x6000,
//! phy_init, data, phy,     0xf000,  0x1000,
//! factory,  app,  factory, 0x10000, 1M,
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Offsets may be left
//! empty, in which case the partition is placed after the previous one.

use alloc::string::String;
use alloc::vec::Vec;

use super::vars::expand_vars;
use super::PartitionTable;
use crate::config::TableConfig;
use crate::error::{Error, Overlap, Result};
use crate::partition::{PartitionEntry, PartitionRow};

const CSV_HEADER: [&str; 2] = [
    "# Espressif ESP32 Partition Table",
    "# Name, Type, SubType, Offset, Size, Flags",
];

impl PartitionTable {
    /// Parse a CSV document, expanding `$NAME` from the process environment
    #[cfg(feature = "std")]
    pub fn from_csv(text: &str, config: &TableConfig) -> Result<Self> {
        Self::from_csv_with_vars(text, config, super::vars::env_lookup)
    }

    /// Parse a CSV document, expanding `$NAME` through `lookup`
    pub fn from_csv_with_vars<F>(text: &str, config: &TableConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut rows = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let expanded = expand_vars(trimmed, &lookup).map_err(|e| e.at_line(line_no))?;
            rows.push(PartitionRow::from_csv_row(expanded.trim(), line_no)?);
        }

        let entries = resolve_layout(rows, config)?;
        Ok(Self { entries })
    }

    /// Render the table as a CSV document
    ///
    /// With `simple` set, keywords and `K`/`M` sizes are replaced by plain
    /// numbers.
    pub fn to_csv(&self, simple: bool) -> String {
        let mut rows: Vec<String> = CSV_HEADER.iter().map(|&line| String::from(line)).collect();
        rows.extend(self.entries.iter().map(|e| e.to_csv_row(simple)));
        let mut text = rows.join("\n");
        text.push('\n');
        text
    }
}

/// Fill in missing offsets and negative sizes, in document order
///
/// Partitions without an offset start at the end of the previous one,
/// rounded up to their type's alignment. The first one starts after the
/// table sector.
fn resolve_layout(rows: Vec<PartitionRow>, config: &TableConfig) -> Result<Vec<PartitionEntry>> {
    let table_end = config.table_end();
    let mut last_end = table_end;
    let mut entries: Vec<PartitionEntry> = Vec::with_capacity(rows.len());

    for row in rows {
        let offset = match row.offset {
            Some(offset) if u64::from(offset) < last_end => {
                let overlap = match entries.last() {
                    None => Overlap::PartitionTable {
                        name: row.name.clone(),
                        offset,
                        table_end,
                        first: true,
                    },
                    Some(prev) => Overlap::Partition {
                        name: row.name.clone(),
                        offset,
                        previous: prev.name.clone(),
                        previous_start: prev.offset,
                        previous_end: last_end,
                    },
                };
                return Err(Error::Overlap(overlap).at_line(row.line));
            }
            Some(offset) => offset,
            None => {
                let placed = align_up(last_end, u64::from(row.kind.alignment()));
                let placed = u32::try_from(placed).map_err(|_| {
                    Error::AddressOutOfRange(row.name.clone()).at_line(row.line)
                })?;
                log::debug!("Placing '{}' at 0x{:x}", row.name, placed);
                placed
            }
        };

        let entry = row.resolve(offset)?;
        last_end = entry.end();
        entries.push(entry);
    }

    Ok(entries)
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{PartitionType, SubType};
    use alloc::string::ToString;

    fn no_vars(_: &str) -> Option<String> {
        None
    }

    fn parse(text: &str) -> Result<PartitionTable> {
        PartitionTable::from_csv_with_vars(text, &TableConfig::default(), no_vars)
    }

    #[test]
    fn test_explicit_offsets() {
        let table = parse("nvs,data,nvs,0x9000,0x6000\nfactory,app,factory,0x10000,1M\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.entries()[0],
            PartitionEntry::new("nvs", PartitionType::Data, SubType::Nvs, 0x9000, 0x6000)
        );
        assert_eq!(
            table.entries()[1],
            PartitionEntry::new("factory", PartitionType::App, SubType::Factory, 0x10000, 0x100000)
        );
        assert!(table.validate(&TableConfig::default()).is_ok());
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let csv = "# Name, Type, SubType, Offset, Size\n\n   \n  # indented comment with $UNSET\nnvs, data, nvs, , 0x6000\n";
        let table = parse(csv).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0].offset, 0x9000);
    }

    #[test]
    fn test_app_placed_on_64k_boundary() {
        let table = parse("ota_0,app,ota_0,,0x100000").unwrap();
        assert_eq!(table.entries()[0].offset, 0x10000);
        assert_eq!(table.entries()[0].subtype, SubType::Ota(0));
    }

    #[test]
    fn test_data_placed_on_4_byte_boundary() {
        let csv = "\
nvs,data,nvs,,0x6001
phy_init,data,phy,,0x1000
factory,app,factory,,1M
";
        let table = parse(csv).unwrap();
        let offsets: Vec<u32> = table.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, [0x9000, 0xf004, 0x20000]);
    }

    #[test]
    fn test_negative_size_stretches_to_end() {
        let csv = "\
factory,app,factory,0x10000,1M
storage,data,fat,,-0x400000
";
        let table = parse(csv).unwrap();
        let storage = table.find_by_name("storage").unwrap();
        assert_eq!(storage.offset, 0x110000);
        assert_eq!(storage.size, 0x400000 - 0x110000);
        assert_eq!(table.flash_size(), 0x400000);
    }

    #[test]
    fn test_first_partition_overlaps_table() {
        let err = parse("nvs,data,nvs,0x8000,0x6000").unwrap_err();
        assert!(matches!(err, Error::AtLine { line: 1, .. }));
        assert!(matches!(
            err.kind(),
            Error::Overlap(Overlap::PartitionTable { first: true, .. })
        ));
    }

    #[test]
    fn test_partition_overlaps_previous() {
        let err = parse("nvs,data,nvs,0x9000,0x6000\nphy_init,data,phy,0xe000,0x1000").unwrap_err();
        assert!(matches!(err, Error::AtLine { line: 2, .. }));
        match err.kind() {
            Error::Overlap(Overlap::Partition {
                name,
                previous,
                previous_end,
                ..
            }) => {
                assert_eq!(name, "phy_init");
                assert_eq!(previous, "nvs");
                assert_eq!(*previous_end, 0xf000);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_custom_table_offset() {
        let config = TableConfig {
            offset: 0x10000,
            ..TableConfig::default()
        };
        let table = PartitionTable::from_csv_with_vars("nvs,data,nvs,,0x4000", &config, no_vars).unwrap();
        assert_eq!(table.entries()[0].offset, 0x11000);
    }

    #[test]
    fn test_missing_size_fails_resolution() {
        let err = parse("nvs,data,nvs,0x9000,").unwrap_err();
        assert!(matches!(
            err.kind(),
            Error::MissingRequiredField { field: "size", .. }
        ));
    }

    #[test]
    fn test_variables() {
        let lookup = |name: &str| match name {
            "APP_SIZE" => Some("2M".to_string()),
            _ => None,
        };
        let table = PartitionTable::from_csv_with_vars(
            "factory,app,factory,,$APP_SIZE",
            &TableConfig::default(),
            lookup,
        )
        .unwrap();
        assert_eq!(table.entries()[0].size, 0x200000);

        let err = PartitionTable::from_csv_with_vars(
            "\nfactory,app,factory,,$OTHER",
            &TableConfig::default(),
            lookup,
        )
        .unwrap_err();
        assert!(matches!(err, Error::AtLine { line: 2, .. }));
        assert_eq!(err.kind(), &Error::UnknownVariable("OTHER".to_string()));
    }

    #[test]
    fn test_duplicate_names_detected_on_validate() {
        let table = parse("storage,data,fat,,0x1000\nstorage,data,spiffs,,0x1000").unwrap();
        match table.validate(&TableConfig::default()) {
            Err(Error::DuplicateNames(rows)) => {
                assert_eq!(rows.len(), 2);
                assert!(rows.iter().all(|r| r.starts_with("storage,")));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_to_csv() {
        let table = parse("nvs,data,nvs,0x9000,0x6000\nfactory,app,factory,0x10000,1M,encrypted").unwrap();
        assert_eq!(
            table.to_csv(false),
            "# Espressif ESP32 Partition Table\n\
             # Name, Type, SubType, Offset, Size, Flags\n\
             nvs,data,nvs,0x9000,24K,\n\
             factory,app,factory,0x10000,1M,encrypted\n"
        );
        assert!(table.to_csv(true).contains("factory,0,0,0x10000,0x100000,encrypted\n"));
    }

    #[test]
    fn test_csv_round_trip() {
        let csv = "\
nvs,data,nvs,0x9000,0x4000
otadata,data,ota,0xd000,0x2000
phy_init,data,phy,0xf000,0x1000
ota_0,app,ota_0,0x10000,0x180000
ota_1,app,ota_1,0x190000,0x180000,encrypted
custom,0x40,0x3,0x310000,0x1234
";
        let table = parse(csv).unwrap();
        for simple in [false, true] {
            assert_eq!(parse(&table.to_csv(simple)).unwrap(), table);
        }
    }
}
