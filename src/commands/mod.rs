//! CLI command implementations
//!
//! Every command loads a table the same way: read the input (file or
//! stdin), detect whether it is a binary sector or CSV text, parse it,
//! then verify it and check it against the flash size when configured.

pub mod convert;
pub mod find;
pub mod show;

use ptable_core::partition::ENTRY_MAGIC;
use ptable_core::{PartitionTable, TableConfig};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

/// Errors raised by the CLI layer itself
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Input is not a binary table and not UTF-8 text either
    #[error("input is neither a binary partition table nor UTF-8 text")]
    InvalidText,
    /// Lookup found nothing
    #[error("no partition matches {0}")]
    PartitionNotFound(String),
}

/// Representation the input was given in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Binary,
}

impl InputFormat {
    /// Binary tables start with the magic of their first entry record
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(&ENTRY_MAGIC) {
            InputFormat::Binary
        } else {
            InputFormat::Csv
        }
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Read a whole file, or stdin for `-`
fn read_input(path: &Path) -> io::Result<Vec<u8>> {
    if is_stdio(path) {
        let mut data = Vec::new();
        io::stdin().lock().read_to_end(&mut data)?;
        Ok(data)
    } else {
        fs::read(path)
    }
}

/// Write to a file, or stdout when no path or `-` is given
pub fn write_output(path: Option<&Path>, data: &[u8]) -> io::Result<()> {
    match path {
        Some(path) if !is_stdio(path) => fs::write(path, data),
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()
        }
    }
}

/// Parse a table from raw input bytes
pub fn parse_table(
    data: &[u8],
    config: &TableConfig,
) -> Result<(PartitionTable, InputFormat), Box<dyn std::error::Error>> {
    let format = InputFormat::detect(data);
    let table = match format {
        InputFormat::Binary => {
            log::info!("Parsing binary partition input...");
            PartitionTable::from_binary(data)?
        }
        InputFormat::Csv => {
            log::info!("Parsing CSV input...");
            let text = std::str::from_utf8(data).map_err(|_| CommandError::InvalidText)?;
            PartitionTable::from_csv(text, config)?
        }
    };

    if config.verify {
        log::info!("Verifying table...");
        table.validate(config)?;
    }

    if let Some(flash_size) = config.flash_size {
        table.check_flash_size(flash_size)?;
    }

    Ok((table, format))
}

/// Read and parse a table from a file or stdin
pub fn load_table(
    path: &Path,
    config: &TableConfig,
) -> Result<(PartitionTable, InputFormat), Box<dyn std::error::Error>> {
    let data = read_input(path)?;
    parse_table(&data, config)
}
