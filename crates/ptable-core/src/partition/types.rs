//! Partition type and subtype codes
//!
//! Both are stored as single bytes in the binary record. Unknown codes are
//! kept as `Other(code)` so tables written by newer tools still round-trip.

use crate::error::Result;
use crate::literal::{keyword_for, parse_int, Keywords};
use crate::Error;
use alloc::string::ToString;

/// Type code of application partitions
pub const APP_TYPE: u8 = 0x00;
/// Type code of data partitions
pub const DATA_TYPE: u8 = 0x01;

/// First subtype code of the numbered OTA application slots
pub const OTA_SUBTYPE_BASE: u8 = 0x10;
/// Number of OTA application slots
pub const OTA_SLOT_COUNT: u8 = 16;

/// Offset alignment of application partitions
pub const APP_ALIGNMENT: u32 = 0x10000;
/// Offset alignment of every other partition type
pub const DATA_ALIGNMENT: u32 = 0x4;

/// Type keywords accepted in the CSV type column
pub const TYPE_KEYWORDS: &Keywords = &[("app", APP_TYPE), ("data", DATA_TYPE)];

/// Subtype keywords for application partitions
pub const APP_SUBTYPE_KEYWORDS: &Keywords = &[
    ("factory", 0x00),
    ("test", 0x20),
    ("ota_0", 0x10),
    ("ota_1", 0x11),
    ("ota_2", 0x12),
    ("ota_3", 0x13),
    ("ota_4", 0x14),
    ("ota_5", 0x15),
    ("ota_6", 0x16),
    ("ota_7", 0x17),
    ("ota_8", 0x18),
    ("ota_9", 0x19),
    ("ota_10", 0x1A),
    ("ota_11", 0x1B),
    ("ota_12", 0x1C),
    ("ota_13", 0x1D),
    ("ota_14", 0x1E),
    ("ota_15", 0x1F),
];

/// Subtype keywords for data partitions
pub const DATA_SUBTYPE_KEYWORDS: &Keywords = &[
    ("ota", 0x00),
    ("phy", 0x01),
    ("nvs", 0x02),
    ("coredump", 0x03),
    ("esphttpd", 0x80),
    ("fat", 0x81),
    ("spiffs", 0x82),
];

/// Top-level partition category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionType {
    /// Application image
    App,
    /// Data region
    Data,
    /// Type code without a known meaning
    Other(u8),
}

impl PartitionType {
    /// Parse a type column: a keyword or any integer literal
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(Error::EmptyField("type"));
        }
        let code = parse_int(text, TYPE_KEYWORDS)?;
        u8::try_from(code).map(Self::from).map_err(|_| Error::InvalidField {
            value: text.to_string(),
            expected: "a type code between 0 and 255".to_string(),
        })
    }

    /// Raw type code
    pub fn raw(self) -> u8 {
        match self {
            Self::App => APP_TYPE,
            Self::Data => DATA_TYPE,
            Self::Other(code) => code,
        }
    }

    /// Keyword naming this type, if it has one
    pub fn keyword(self) -> Option<&'static str> {
        keyword_for(self.raw(), TYPE_KEYWORDS)
    }

    /// Required offset alignment for partitions of this type
    pub fn alignment(self) -> u32 {
        match self {
            Self::App => APP_ALIGNMENT,
            _ => DATA_ALIGNMENT,
        }
    }

    /// Subtype keywords that are meaningful under this type
    pub fn subtype_keywords(self) -> &'static Keywords {
        match self {
            Self::App => APP_SUBTYPE_KEYWORDS,
            Self::Data => DATA_SUBTYPE_KEYWORDS,
            Self::Other(_) => &[],
        }
    }
}

impl From<u8> for PartitionType {
    fn from(code: u8) -> Self {
        match code {
            APP_TYPE => Self::App,
            DATA_TYPE => Self::Data,
            other => Self::Other(other),
        }
    }
}

/// Partition subtype, interpreted relative to its [`PartitionType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubType {
    /// App: factory image
    Factory,
    /// App: test image
    Test,
    /// App: numbered OTA slot (0-15)
    Ota(u8),
    /// Data: OTA selection data
    OtaData,
    /// Data: PHY calibration
    Phy,
    /// Data: non-volatile storage
    Nvs,
    /// Data: core dump
    CoreDump,
    /// Data: ESPHTTPD filesystem
    EspHttpd,
    /// Data: FAT filesystem
    Fat,
    /// Data: SPIFFS filesystem
    Spiffs,
    /// Subtype code without a known meaning for its type
    Other(u8),
}

impl SubType {
    /// Decode a raw subtype code under the given type
    pub fn from_raw(kind: PartitionType, code: u8) -> Self {
        match (kind, code) {
            (PartitionType::App, 0x00) => Self::Factory,
            (PartitionType::App, 0x20) => Self::Test,
            (PartitionType::App, c)
                if (OTA_SUBTYPE_BASE..OTA_SUBTYPE_BASE + OTA_SLOT_COUNT).contains(&c) =>
            {
                Self::Ota(c - OTA_SUBTYPE_BASE)
            }
            (PartitionType::Data, 0x00) => Self::OtaData,
            (PartitionType::Data, 0x01) => Self::Phy,
            (PartitionType::Data, 0x02) => Self::Nvs,
            (PartitionType::Data, 0x03) => Self::CoreDump,
            (PartitionType::Data, 0x80) => Self::EspHttpd,
            (PartitionType::Data, 0x81) => Self::Fat,
            (PartitionType::Data, 0x82) => Self::Spiffs,
            (_, c) => Self::Other(c),
        }
    }

    /// Parse a subtype column under the given type
    ///
    /// An empty column means subtype 0.
    pub fn parse(kind: PartitionType, text: &str) -> Result<Self> {
        if text.is_empty() {
            return Ok(Self::from_raw(kind, 0));
        }
        let code = parse_int(text, kind.subtype_keywords())?;
        u8::try_from(code)
            .map(|c| Self::from_raw(kind, c))
            .map_err(|_| Error::InvalidField {
                value: text.to_string(),
                expected: "a subtype code between 0 and 255".to_string(),
            })
    }

    /// Raw subtype code
    pub fn raw(self) -> u8 {
        match self {
            Self::Factory => 0x00,
            Self::Test => 0x20,
            Self::Ota(slot) => OTA_SUBTYPE_BASE.wrapping_add(slot),
            Self::OtaData => 0x00,
            Self::Phy => 0x01,
            Self::Nvs => 0x02,
            Self::CoreDump => 0x03,
            Self::EspHttpd => 0x80,
            Self::Fat => 0x81,
            Self::Spiffs => 0x82,
            Self::Other(code) => code,
        }
    }

    /// Keyword naming this subtype under `kind`, if it has one
    pub fn keyword(self, kind: PartitionType) -> Option<&'static str> {
        keyword_for(self.raw(), kind.subtype_keywords())
    }
}

/// Whether `name` is a subtype keyword under any type
pub(crate) fn is_subtype_keyword(name: &str) -> bool {
    APP_SUBTYPE_KEYWORDS
        .iter()
        .chain(DATA_SUBTYPE_KEYWORDS)
        .any(|&(keyword, _)| keyword == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_parse() {
        assert_eq!(PartitionType::parse("app").unwrap(), PartitionType::App);
        assert_eq!(PartitionType::parse("DATA").unwrap(), PartitionType::Data);
        assert_eq!(PartitionType::parse("0x40").unwrap(), PartitionType::Other(0x40));
        assert_eq!(PartitionType::parse(""), Err(Error::EmptyField("type")));
        assert!(PartitionType::parse("0x100").is_err());
        assert!(PartitionType::parse("bootloader").is_err());
    }

    #[test]
    fn test_subtype_depends_on_type() {
        assert_eq!(SubType::parse(PartitionType::App, "factory").unwrap(), SubType::Factory);
        assert_eq!(SubType::parse(PartitionType::Data, "ota").unwrap(), SubType::OtaData);
        assert_eq!(SubType::parse(PartitionType::App, "ota_3").unwrap(), SubType::Ota(3));
        assert_eq!(SubType::parse(PartitionType::App, "").unwrap(), SubType::Factory);
        assert_eq!(SubType::parse(PartitionType::Data, "").unwrap(), SubType::OtaData);
        // "nvs" only exists under data
        assert!(SubType::parse(PartitionType::App, "nvs").is_err());
        assert_eq!(
            SubType::parse(PartitionType::Other(0x40), "0x05").unwrap(),
            SubType::Other(5)
        );
    }

    #[test]
    fn test_subtype_raw_codes() {
        for code in 0..=u8::MAX {
            assert_eq!(SubType::from_raw(PartitionType::App, code).raw(), code);
            assert_eq!(SubType::from_raw(PartitionType::Data, code).raw(), code);
        }
        assert_eq!(SubType::Ota(15).raw(), 0x1F);
        assert_eq!(SubType::from_raw(PartitionType::App, 0x1F), SubType::Ota(15));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(PartitionType::App.keyword(), Some("app"));
        assert_eq!(PartitionType::Other(7).keyword(), None);
        assert_eq!(SubType::Spiffs.keyword(PartitionType::Data), Some("spiffs"));
        assert_eq!(SubType::Ota(10).keyword(PartitionType::App), Some("ota_10"));
        assert_eq!(SubType::Other(0x44).keyword(PartitionType::Data), None);
        assert!(is_subtype_keyword("nvs"));
        assert!(!is_subtype_keyword("storage"));
    }

    #[test]
    fn test_alignment() {
        assert_eq!(PartitionType::App.alignment(), 0x10000);
        assert_eq!(PartitionType::Data.alignment(), 4);
        assert_eq!(PartitionType::Other(0x99).alignment(), 4);
    }
}
