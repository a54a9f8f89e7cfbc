//! Convert command: CSV to binary, or binary to CSV

use super::{load_table, write_output, InputFormat};
use ptable_core::TableConfig;
use std::path::Path;

/// Convert `input` to the other representation
pub fn cmd_convert(
    input: &Path,
    output: Option<&Path>,
    config: &TableConfig,
    simple: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (table, format) = load_table(input, config)?;

    let data = match format {
        InputFormat::Csv => table.to_binary(config)?,
        InputFormat::Binary => table.to_csv(simple).into_bytes(),
    };

    write_output(output, &data)?;
    if let Some(path) = output.filter(|p| p.as_os_str() != "-") {
        log::info!("Wrote {} bytes to {}", data.len(), path.display());
    }

    Ok(())
}
