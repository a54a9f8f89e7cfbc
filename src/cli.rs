//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let value = ptable_core::literal::parse_int(s.trim(), &[]).map_err(|e| e.to_string())?;
    u32::try_from(value).map_err(|_| format!("Value out of range: {}", s))
}

/// Parse a flash size like "4MB", "16 MiB" or "0x400000"
fn parse_flash_size(s: &str) -> Result<u32, String> {
    ptable_core::literal::parse_size(s).map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(name = "ptable")]
#[command(author, version, about = "ESP32 partition table converter", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML, `[table]` section)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Table options shared across commands, overriding the config file
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TableArgs {
    /// Flash offset of the partition table
    #[arg(long, value_parser = parse_hex_u32)]
    pub offset: Option<u32>,

    /// Require partition sizes to be aligned (secure boot)
    #[arg(long)]
    pub secure: bool,

    /// Don't write or expect an MD5 checksum record
    #[arg(long)]
    pub disable_md5sum: bool,

    /// Skip validation of the parsed table
    #[arg(long)]
    pub no_verify: bool,

    /// Fail if the partitions don't fit in this much flash (e.g. 4MB)
    #[arg(long, value_parser = parse_flash_size)]
    pub flash_size: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert CSV to binary or binary to CSV (direction is auto-detected)
    Convert {
        /// Input file, or - for stdin
        input: PathBuf,

        /// Output file, or - for stdout (default)
        output: Option<PathBuf>,

        /// Write plain numbers instead of keywords and K/M sizes in CSV output
        #[arg(long)]
        simple: bool,

        #[command(flatten)]
        table: TableArgs,
    },

    /// Print the partitions of a table
    Show {
        /// Input file (CSV or binary), or - for stdin
        input: PathBuf,

        #[command(flatten)]
        table: TableArgs,
    },

    /// Print offset and size of a partition
    Find {
        /// Input file (CSV or binary), or - for stdin
        input: PathBuf,

        /// Partition name
        #[arg(long, conflicts_with = "kind", required_unless_present = "kind")]
        name: Option<String>,

        /// Partition type (keyword or number)
        #[arg(long = "type", id = "kind")]
        kind: Option<String>,

        /// Partition subtype (keyword or number, defaults to 0)
        #[arg(long, requires = "kind")]
        subtype: Option<String>,

        #[command(flatten)]
        table: TableArgs,
    },
}
