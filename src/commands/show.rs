//! Show command: human readable table report

use super::load_table;
use ptable_core::literal::format_size;
use ptable_core::{PartitionTable, TableConfig};
use std::path::Path;

/// Print the partitions of a table
pub fn cmd_show(input: &Path, config: &TableConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (table, _) = load_table(input, config)?;
    print_table(&table, config);
    Ok(())
}

/// Print table information
pub fn print_table(table: &PartitionTable, config: &TableConfig) {
    println!("Partition Table");
    println!("===============");
    println!("Offset: {:#010X}", config.offset);

    let footprint = table.flash_size();
    println!(
        "Flash:  {} bytes ({:.2} MiB)",
        footprint,
        footprint as f64 / (1024.0 * 1024.0)
    );

    println!("\nPartitions ({}):", table.len());
    println!(
        "{:<16} {:<6} {:<9} {:>10} {:>10} {:<}",
        "Name", "Type", "SubType", "Offset", "Size", "Flags"
    );
    println!("{:-<64}", "");

    for entry in table {
        let kind = entry
            .kind
            .keyword()
            .map_or_else(|| format!("0x{:02x}", entry.kind.raw()), String::from);
        let subtype = entry
            .subtype
            .keyword(entry.kind)
            .map_or_else(|| format!("0x{:02x}", entry.subtype.raw()), String::from);

        println!(
            "{:<16} {:<6} {:<9} {:#010X} {:>10} {}",
            entry.name,
            kind,
            subtype,
            entry.offset,
            format_size(entry.size),
            entry.flags.to_csv()
        );
    }
}
