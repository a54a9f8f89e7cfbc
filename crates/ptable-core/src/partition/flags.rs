//! Partition flags
//!
//! The binary record carries a 32-bit flags word. Known bits become named
//! booleans; anything else is kept in `unknown` for diagnostics only and is
//! not written back out.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use bitflags::bitflags;

use crate::error::{Error, Result};

bitflags! {
    /// Bits of the binary flags word
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FlagBits: u32 {
        /// Partition contents are flash-encrypted
        const ENCRYPTED = 1 << 0;
    }
}

/// CSV names of the known flags, in output order
const FLAG_NAMES: [(&str, FlagBits); 1] = [("encrypted", FlagBits::ENCRYPTED)];

/// Flags attached to one partition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionFlags {
    /// Partition contents are flash-encrypted
    pub encrypted: bool,
    /// Set bits of the flags word that have no known meaning
    pub unknown: u32,
}

impl PartitionFlags {
    /// Decode a binary flags word
    pub fn from_bits(word: u32) -> Self {
        let bits = FlagBits::from_bits_retain(word);
        Self {
            encrypted: bits.contains(FlagBits::ENCRYPTED),
            unknown: bits.difference(FlagBits::all()).bits(),
        }
    }

    /// Encode the known flags as a binary flags word
    pub fn bits(&self) -> u32 {
        let mut bits = FlagBits::empty();
        bits.set(FlagBits::ENCRYPTED, self.encrypted);
        bits.bits()
    }

    /// Parse the colon-delimited CSV flags column
    pub fn parse(field: &str) -> Result<Self> {
        let mut bits = FlagBits::empty();
        for name in field.split(':').map(str::trim).filter(|n| !n.is_empty()) {
            let bit = FLAG_NAMES
                .iter()
                .find(|(known, _)| *known == name)
                .map(|&(_, bit)| bit)
                .ok_or_else(|| Error::UnknownFlag(name.to_string()))?;
            bits |= bit;
        }
        Ok(Self::from_bits(bits.bits()))
    }

    /// Names of the flags that are set
    pub fn names(&self) -> Vec<&'static str> {
        let bits = FlagBits::from_bits_truncate(self.bits());
        FLAG_NAMES
            .iter()
            .filter(|(_, bit)| bits.contains(*bit))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Render the CSV flags column
    pub fn to_csv(&self) -> String {
        self.names().join(":")
    }
}
