//! Find command: partition lookup for scripts

use super::{load_table, CommandError};
use ptable_core::{PartitionEntry, PartitionTable, TableConfig};
use std::path::Path;

/// What to look a partition up by
pub enum Query<'a> {
    Name(&'a str),
    Type { kind: &'a str, subtype: &'a str },
}

impl Query<'_> {
    fn describe(&self) -> String {
        match self {
            Query::Name(name) => format!("name '{}'", name),
            Query::Type { kind, subtype } => format!("type '{}' subtype '{}'", kind, subtype),
        }
    }
}

/// Look up one partition
pub fn find_entry<'t>(
    table: &'t PartitionTable,
    query: &Query<'_>,
) -> Result<&'t PartitionEntry, Box<dyn std::error::Error>> {
    let found = match query {
        Query::Name(name) => table.find_by_name(name),
        Query::Type { kind, subtype } => table.find_by_type(kind, subtype)?,
    };
    found.ok_or_else(|| CommandError::PartitionNotFound(query.describe()).into())
}

/// Print `offset size` of the matching partition
pub fn cmd_find(
    input: &Path,
    query: &Query<'_>,
    config: &TableConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let (table, _) = load_table(input, config)?;
    let entry = find_entry(&table, query)?;
    log::debug!("Found {}", entry);
    println!("0x{:x} 0x{:x}", entry.offset, entry.size);
    Ok(())
}
