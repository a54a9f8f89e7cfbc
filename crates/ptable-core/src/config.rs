//! Conversion settings
//!
//! [`TableConfig`] is passed explicitly to every table entry point. With the
//! `std` feature it can be loaded from a TOML file:
//!
//! ```toml
//! [table]
//! offset = "0x8000"
//! checksum = true
//! secure = false
//! flash_size = "4MB"
//! ```

use crate::table::{DEFAULT_TABLE_OFFSET, TABLE_SECTOR_SIZE};

/// Settings shared by parsing, validation and serialization
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default, deny_unknown_fields))]
pub struct TableConfig {
    /// Append (and expect) the MD5 checksum record
    pub checksum: bool,
    /// Require sizes to be aligned like offsets
    pub secure: bool,
    /// Flash offset the partition table itself is written to
    #[cfg_attr(feature = "std", serde(deserialize_with = "deserialize_hex_u32"))]
    pub offset: u32,
    /// Flash capacity the partitions must fit in
    #[cfg_attr(feature = "std", serde(deserialize_with = "deserialize_flash_size"))]
    pub flash_size: Option<u32>,
    /// Run table validation after parsing
    pub verify: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            checksum: true,
            secure: false,
            offset: DEFAULT_TABLE_OFFSET,
            flash_size: None,
            verify: true,
        }
    }
}

impl TableConfig {
    /// First flash byte after the sector reserved for the table
    pub fn table_end(&self) -> u64 {
        u64::from(self.offset) + TABLE_SECTOR_SIZE as u64
    }
}

#[cfg(feature = "std")]
mod file {
    use std::fs;
    use std::path::Path;
    use std::string::{String, ToString};

    use super::TableConfig;
    use crate::error::{Error, Result};
    use crate::literal::{parse_int, parse_size};

    /// Config file structure
    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    struct ConfigFile {
        #[serde(default)]
        table: TableConfig,
    }

    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum HexOrInt {
        Int(u32),
        Str(String),
    }

    /// Deserialize a u32 that can be hex (0x...) or decimal
    pub(super) fn deserialize_hex_u32<'de, D>(deserializer: D) -> core::result::Result<u32, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::Deserialize;

        match HexOrInt::deserialize(deserializer)? {
            HexOrInt::Int(n) => Ok(n),
            HexOrInt::Str(s) => parse_int(s.trim(), &[])
                .ok()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| serde::de::Error::custom(std::format!("invalid number: {}", s))),
        }
    }

    /// Deserialize a flash size: bytes or a size string like "4MB"
    pub(super) fn deserialize_flash_size<'de, D>(
        deserializer: D,
    ) -> core::result::Result<Option<u32>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::Deserialize;

        match HexOrInt::deserialize(deserializer)? {
            HexOrInt::Int(n) => Ok(Some(n)),
            HexOrInt::Str(s) => parse_size(&s)
                .map(Some)
                .map_err(|e| serde::de::Error::custom(e.to_string())),
        }
    }

    impl TableConfig {
        /// Parse a configuration from a TOML string
        pub fn from_toml_str(content: &str) -> Result<Self> {
            let file: ConfigFile =
                toml::from_str(content).map_err(|e| Error::InvalidConfig(e.to_string()))?;
            Ok(file.table)
        }

        /// Load a configuration from a TOML file
        pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            let content = fs::read_to_string(path)
                .map_err(|e| Error::InvalidConfig(std::format!("{}: {}", path.display(), e)))?;
            Self::from_toml_str(&content)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_empty_config_is_default() {
            assert_eq!(TableConfig::from_toml_str("").unwrap(), TableConfig::default());
            assert_eq!(
                TableConfig::from_toml_str("[table]\n").unwrap(),
                TableConfig::default()
            );
        }

        #[test]
        fn test_parse_config() {
            let toml = r#"
[table]
offset = "0x10000"
checksum = false
secure = true
flash_size = "4MB"
"#;
            let config = TableConfig::from_toml_str(toml).unwrap();
            assert_eq!(config.offset, 0x10000);
            assert!(!config.checksum);
            assert!(config.secure);
            assert!(config.verify);
            assert_eq!(config.flash_size, Some(4 * 1024 * 1024));
            assert_eq!(config.table_end(), 0x11000);
        }

        #[test]
        fn test_integer_fields() {
            let config = TableConfig::from_toml_str("[table]\noffset = 36864\nflash_size = 2097152\n").unwrap();
            assert_eq!(config.offset, 0x9000);
            assert_eq!(config.flash_size, Some(0x200000));
        }

        #[test]
        fn test_bad_config() {
            assert!(matches!(
                TableConfig::from_toml_str("[table]\noffset = \"nowhere\"\n"),
                Err(Error::InvalidConfig(_))
            ));
            assert!(matches!(
                TableConfig::from_toml_str("[table]\nmd5 = true\n"),
                Err(Error::InvalidConfig(_))
            ));
        }
    }
}

#[cfg(feature = "std")]
use file::{deserialize_flash_size, deserialize_hex_u32};
