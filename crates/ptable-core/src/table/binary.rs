//! Binary sector encoding
//!
//! The sector is a run of 32-byte entry records, optionally followed by an
//! MD5 record, terminated by an all-0xFF record and padded with 0xFF:
//!
//! ```text
//! [entry 0][entry 1]...[entry N-1][MD5 record][FF...FF padding]
//! ```
//!
//! The MD5 record is `EB EB`, 14 bytes of `FF`, then the digest of every
//! entry record before it.

use alloc::vec::Vec;

use md5::{Digest, Md5};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::{PartitionTable, TABLE_SECTOR_SIZE};
use crate::config::TableConfig;
use crate::error::{Error, Result};
use crate::partition::{PartitionEntry, RECORD_SIZE};

/// Magic bytes of the MD5 record
pub const CHECKSUM_MAGIC: [u8; 2] = [0xEB, 0xEB];

/// Entry data must stay below this length; the rest of the sector is kept
/// free for a signature
pub const MAX_TABLE_LENGTH: usize = 0xC00;

/// An erased record marks the end of the table
const END_MARKER: [u8; RECORD_SIZE] = [0xFF; RECORD_SIZE];

/// On-flash layout of the MD5 record
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct RawChecksum {
    magic: [u8; 2],
    reserved: [u8; 14],
    digest: [u8; 16],
}

fn md5_of(hasher: &Md5) -> [u8; 16] {
    let mut digest = [0u8; 16];
    digest.copy_from_slice(&hasher.clone().finalize());
    digest
}

impl PartitionTable {
    /// Parse a binary partition table
    ///
    /// Reading stops at the first all-0xFF record; anything after it is
    /// ignored. An MD5 record is checked against the entry records before
    /// it, and entries are only decoded once the whole table has been read,
    /// so a corrupted entry is reported as a checksum mismatch.
    pub fn from_binary(data: &[u8]) -> Result<Self> {
        let mut hasher = Md5::new();
        let mut records: Vec<(usize, &[u8; RECORD_SIZE])> = Vec::new();
        let mut terminated = false;

        for (index, chunk) in data.chunks(RECORD_SIZE).enumerate() {
            let position = index * RECORD_SIZE;
            let record: &[u8; RECORD_SIZE] = chunk
                .try_into()
                .map_err(|_| Error::TruncatedTable(data.len()))?;

            if *record == END_MARKER {
                log::debug!("End of table marker at 0x{:x}", position);
                terminated = true;
                break;
            }

            if record[..2] == CHECKSUM_MAGIC {
                let raw: RawChecksum = zerocopy::transmute!(*record);
                let computed = md5_of(&hasher);
                if raw.digest != computed {
                    return Err(Error::ChecksumMismatch {
                        computed: u128::from_be_bytes(computed),
                        stored: u128::from_be_bytes(raw.digest),
                    });
                }
                log::debug!("MD5 record at 0x{:x} matches", position);
                continue;
            }

            hasher.update(record);
            records.push((position, record));
        }

        if !terminated {
            return Err(Error::TruncatedTable(data.len()));
        }

        let entries = records
            .into_iter()
            .map(|(position, record)| PartitionEntry::from_record(record, position))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Encode the table as one full flash sector
    ///
    /// Fails if the entries (plus the MD5 record, when enabled) reach
    /// [`MAX_TABLE_LENGTH`]. The result is padded with 0xFF to the whole
    /// 4 KiB sector. Secure boot signing tools expect a 0xC00-byte image
    /// and append the signature themselves, so truncate to
    /// [`MAX_TABLE_LENGTH`] before signing.
    pub fn to_binary(&self, config: &TableConfig) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(TABLE_SECTOR_SIZE);
        for entry in &self.entries {
            data.extend_from_slice(&entry.to_record()?);
        }

        if config.checksum {
            let mut digest = [0u8; 16];
            digest.copy_from_slice(&Md5::digest(&data));
            let raw = RawChecksum {
                magic: CHECKSUM_MAGIC,
                reserved: [0xFF; 14],
                digest,
            };
            data.extend_from_slice(raw.as_bytes());
        }

        if data.len() >= MAX_TABLE_LENGTH {
            return Err(Error::TableTooLarge {
                len: data.len(),
                max: MAX_TABLE_LENGTH,
            });
        }

        data.resize(TABLE_SECTOR_SIZE, 0xFF);
        Ok(data)
    }
}
