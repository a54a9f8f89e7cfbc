//! ptable - ESP32 partition table converter
//!
//! Converts partition tables between the CSV form developers edit and the
//! binary sector the bootloader reads, validating them on the way.
//!
//! # Commands
//!
//! - `convert` - CSV to binary or binary to CSV, auto-detected from the input
//! - `show` - print the partitions of a table
//! - `find` - print offset and size of one partition, for flashing scripts

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, TableArgs};
use commands::find::Query;
use ptable_core::TableConfig;
use std::path::Path;

fn main() {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG still overrides the flags
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose, cli.quiet))
        .parse_env(env_logger::Env::default())
        .init();

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(2);
    }
}

/// Log level selected by `-v`/`-vv` and `--quiet`
fn log_level(verbose: u8, quiet: bool) -> log::LevelFilter {
    match (verbose, quiet) {
        (0, true) => log::LevelFilter::Warn,
        (0, false) => log::LevelFilter::Info,
        (1, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Convert {
            input,
            output,
            simple,
            table,
        } => {
            let config = load_config(cli.config.as_deref(), &table)?;
            commands::convert::cmd_convert(&input, output.as_deref(), &config, simple)
        }
        Commands::Show { input, table } => {
            let config = load_config(cli.config.as_deref(), &table)?;
            commands::show::cmd_show(&input, &config)
        }
        Commands::Find {
            input,
            name,
            kind,
            subtype,
            table,
        } => {
            let config = load_config(cli.config.as_deref(), &table)?;
            let query = match (&name, &kind) {
                (Some(name), _) => Query::Name(name),
                (None, Some(kind)) => Query::Type {
                    kind,
                    subtype: subtype.as_deref().unwrap_or(""),
                },
                (None, None) => return Err("either --name or --type is required".into()),
            };
            commands::find::cmd_find(&input, &query, &config)
        }
    }
}

/// Build the table configuration: config file first, then flags on top
fn load_config(
    path: Option<&Path>,
    args: &TableArgs,
) -> Result<TableConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => {
            log::debug!("Loading configuration from {}", path.display());
            TableConfig::from_toml_file(path)?
        }
        None => TableConfig::default(),
    };

    if let Some(offset) = args.offset {
        config.offset = offset;
    }
    if args.secure {
        config.secure = true;
    }
    if args.disable_md5sum {
        config.checksum = false;
    }
    if args.no_verify {
        config.verify = false;
    }
    if let Some(flash_size) = args.flash_size {
        config.flash_size = Some(flash_size);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_flags() {
        assert_eq!(log_level(0, false), log::LevelFilter::Info);
        assert_eq!(log_level(0, true), log::LevelFilter::Warn);
        assert_eq!(log_level(1, false), log::LevelFilter::Debug);
        assert_eq!(log_level(2, false), log::LevelFilter::Trace);
        assert_eq!(log_level(5, false), log::LevelFilter::Trace);
    }

    #[test]
    fn test_flags_override_config() {
        let args = TableArgs {
            offset: Some(0x10000),
            disable_md5sum: true,
            no_verify: true,
            flash_size: Some(0x400000),
            ..TableArgs::default()
        };
        let config = load_config(None, &args).unwrap();
        assert_eq!(config.offset, 0x10000);
        assert!(!config.checksum);
        assert!(!config.verify);
        assert!(!config.secure);
        assert_eq!(config.flash_size, Some(0x400000));
    }
}
