//! Base types for the structure of a GXT file.

use binrw::{BinRead, BinWrite};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length in bytes of an on-disk entry name, NUL padded
pub const ENTRY_NAME_LEN: usize = 8;

/// Maximum length in bytes of a table name
pub const TABLE_NAME_LEN: usize = 8;

/// Width of one packed character for a given version
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CodeUnitWidth {
    /// One byte per code unit
    Narrow,

    /// Two bytes per code unit
    Wide,
}

impl CodeUnitWidth {
    /// Bytes occupied by one code unit
    pub const fn bytes(self) -> usize {
        match self {
            CodeUnitWidth::Narrow => 1,
            CodeUnitWidth::Wide => 2,
        }
    }

    /// Bits occupied by one code unit, as recorded in the file header
    pub const fn bits(self) -> u16 {
        (self.bytes() * 8) as u16
    }
}

/// The game versions whose GXT layout this crate understands
///
/// The version decides everything variant-specific: whether a file carries a header, how
/// entries are keyed, and how wide a packed character is. GTA III files are not supported.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GxtVersion {
    /// Headerless files with name-keyed 16-bit tables
    ViceCity,

    /// Hash-keyed 8-bit tables behind a `04 00 08 00` header
    SanAndreas,

    /// Hash-keyed 16-bit tables behind a `04 00 10 00` header
    SanAndreasMobile,
}

impl GxtVersion {
    /// How wide a packed character is for this version
    pub const fn code_unit_width(self) -> CodeUnitWidth {
        match self {
            GxtVersion::SanAndreas => CodeUnitWidth::Narrow,
            GxtVersion::ViceCity | GxtVersion::SanAndreasMobile => CodeUnitWidth::Wide,
        }
    }

    /// Whether entries are keyed by CRC-32 hash rather than by 8-byte name
    pub const fn uses_hash_keys(self) -> bool {
        !matches!(self, GxtVersion::ViceCity)
    }

    /// Size in bytes of one on-disk entry record
    pub const fn entry_size(self) -> usize {
        if self.uses_hash_keys() {
            4 + 4
        } else {
            ENTRY_NAME_LEN + 4
        }
    }

    /// The version header, if this version carries one
    pub fn header(self) -> Option<GxtHeader> {
        match self {
            GxtVersion::ViceCity => None,
            GxtVersion::SanAndreas | GxtVersion::SanAndreasMobile => Some(GxtHeader {
                bits_per_unit: self.code_unit_width().bits(),
            }),
        }
    }

    /// Size in bytes of the version header
    pub const fn header_size(self) -> usize {
        match self {
            GxtVersion::ViceCity => 0,
            GxtVersion::SanAndreas | GxtVersion::SanAndreasMobile => 4,
        }
    }
}

impl fmt::Display for GxtVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GxtVersion::ViceCity => write!(f, "Vice City"),
            GxtVersion::SanAndreas => write!(f, "San Andreas"),
            GxtVersion::SanAndreasMobile => write!(f, "San Andreas mobile"),
        }
    }
}

/// GXT file header
///
/// Carried by San Andreas era files only; a fixed version tag followed by the width of a
/// packed character. All data is stored in little endian format
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(magic = b"\x04\x00", little)]
pub struct GxtHeader {
    /// Packed character width in bits, 8 or 16
    pub bits_per_unit: u16,
}

/// An entry key, unique within one table
///
/// Which variant a table holds is decided by its [`GxtVersion`]. The derived ordering is the
/// canonical serialization order: name keys compare by byte sequence, hash keys numerically.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKey {
    /// ASCII entry name, NUL padded to 8 bytes
    Name([u8; ENTRY_NAME_LEN]),

    /// CRC-32 of the uppercased entry name
    Hash(u32),
}

impl EntryKey {
    /// Build a name key from a validated entry name (ASCII, shorter than 8 bytes).
    pub fn name(text: &str) -> EntryKey {
        debug_assert!(text.is_ascii() && text.len() < ENTRY_NAME_LEN);

        let mut raw = [0u8; ENTRY_NAME_LEN];
        raw[..text.len()].copy_from_slice(text.as_bytes());
        EntryKey::Name(raw)
    }

    /// Build a hash key from an entry name, folding it to uppercase first.
    pub fn hashed(text: &str) -> EntryKey {
        EntryKey::Hash(Self::hash_of(text))
    }

    /// CRC-32 checksum of the uppercased entry name.
    ///
    /// Case folding makes `hash_of("foo")`, `hash_of("FOO")` and `hash_of("Foo")` identical;
    /// name keys stay case-sensitive.
    pub fn hash_of(text: &str) -> u32 {
        crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC).checksum(text.to_ascii_uppercase().as_bytes())
    }

    /// The key this version would assign to an entry name.
    pub fn for_version(version: GxtVersion, text: &str) -> EntryKey {
        if version.uses_hash_keys() {
            EntryKey::hashed(text)
        } else {
            EntryKey::name(text)
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKey::Name(raw) => {
                let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                f.write_str(std::str::from_utf8(&raw[..end]).unwrap_or("<invalid>"))
            }
            EntryKey::Hash(hash) => write!(f, "{hash:#010X}"),
        }
    }
}

/// Entry record of a name-keyed table
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct NameEntry {
    /// ASCII entry name, NUL padded
    pub name: [u8; ENTRY_NAME_LEN],

    /// Offset of the entry's characters, in code units from the start of the content blob
    pub offset: u32,
}

/// Entry record of a hash-keyed table
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct HashEntry {
    /// CRC-32 of the uppercased entry name
    pub hash: u32,

    /// Offset of the entry's characters, in bytes from the start of the content blob
    pub offset: u32,
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::BinRead;
    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    use crate::error::Result;
    use crate::types::{EntryKey, GxtHeader, GxtVersion, HashEntry, NameEntry};

    #[test]
    fn write_san_andreas_header() -> Result<()> {
        let expected: Vec<u8> = vec![0x04, 0x00, 0x08, 0x00];

        let header = GxtVersion::SanAndreas.header().unwrap();

        let mut actual = Vec::new();
        header.write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn write_mobile_header() -> Result<()> {
        let expected: Vec<u8> = vec![0x04, 0x00, 0x10, 0x00];

        let header = GxtVersion::SanAndreasMobile.header().unwrap();

        let mut actual = Vec::new();
        header.write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn vice_city_has_no_header() {
        assert_eq!(GxtVersion::ViceCity.header(), None);
        assert_eq!(GxtVersion::ViceCity.header_size(), 0);
    }

    #[test]
    fn read_header() -> Result<()> {
        let mut input = Cursor::new(vec![0x04, 0x00, 0x10, 0x00]);

        let expected = GxtHeader { bits_per_unit: 16 };

        assert_eq!(GxtHeader::read(&mut input)?, expected);

        Ok(())
    }

    #[test]
    fn write_name_record() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x47, 0x58, 0x54, 0x5F, 0x31, 0x00, 0x00, 0x00,
            0x2A, 0x00, 0x00, 0x00,
        ];

        let record = NameEntry {
            name: *b"GXT_1\0\0\0",
            offset: 42,
        };

        let mut actual = Vec::new();
        record.write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn write_hash_record() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x4D, 0x3C, 0x2B, 0x1A,
            0x08, 0x00, 0x00, 0x00,
        ];

        let record = HashEntry {
            hash: 0x1A2B3C4D,
            offset: 8,
        };

        let mut actual = Vec::new();
        record.write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn hash_keys_fold_case() {
        assert_eq!(EntryKey::hash_of("foo"), EntryKey::hash_of("FOO"));
        assert_eq!(EntryKey::hash_of("foo"), EntryKey::hash_of("Foo"));
        assert_eq!(EntryKey::hash_of("FOO"), 0x1AD427AB);
    }

    #[test]
    fn name_keys_are_nul_padded() {
        assert_eq!(EntryKey::name("GXT_1"), EntryKey::Name(*b"GXT_1\0\0\0"));
    }

    #[test]
    fn keys_order_ascending() {
        let mut keys = vec![
            EntryKey::name("ZZZ"),
            EntryKey::name("AAA"),
            EntryKey::name("MID"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                EntryKey::name("AAA"),
                EntryKey::name("MID"),
                EntryKey::name("ZZZ"),
            ]
        );

        let mut hashes = vec![EntryKey::Hash(3), EntryKey::Hash(1), EntryKey::Hash(2)];
        hashes.sort();
        assert_eq!(
            hashes,
            vec![EntryKey::Hash(1), EntryKey::Hash(2), EntryKey::Hash(3)]
        );
    }
}
