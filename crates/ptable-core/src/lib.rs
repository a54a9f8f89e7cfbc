//! ptable-core - Partition table codec and validator
//!
//! This crate converts flash partition tables between their human-editable
//! CSV form and the fixed-layout binary sector that firmware reads at boot.
//! It is designed to be `no_std` compatible (with `alloc`) so the same
//! parser can run on a device.
//!
//! # Features
//!
//! - `std` - Enable standard library support: `$NAME` expansion from the
//!   process environment, `std::error::Error` impls and TOML configuration
//!
//! # Example
//!
//! ```ignore
//! use ptable_core::{PartitionTable, TableConfig};
//!
//! let config = TableConfig::default();
//! let table = PartitionTable::from_csv(csv_text, &config)?;
//! table.validate(&config)?;
//! let sector = table.to_binary(&config)?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod error;
pub mod literal;
pub mod partition;
pub mod table;

pub use config::TableConfig;
pub use error::{Error, Overlap, Result};
pub use partition::{PartitionEntry, PartitionFlags, PartitionRow, PartitionType, SubType};
pub use table::PartitionTable;
