//! This library handles building and patching **GXT** files used by the *GTA* engine family.
//!
//! # GXT Format Documentation
//!
//! This crate provides utilities to assemble, read back, and patch the **GXT** format used by
//! the *Vice City* and *San Andreas* era engines to store localized game strings. A GXT file
//! packs one or more named tables; GXT files are typically identified with the `.gxt` extension.
//!
//! ## File Structure
//!
//! A GXT file consists of an optional version header followed by the main table and then each
//! mission table in ascending name order. Every table contributes an entry block immediately
//! followed by its content blob, with no padding in between.
//!
//! | Section          | Description                                                     |
//! |------------------|-----------------------------------------------------------------|
//! | Header           | Absent for Vice City; 4 bytes for the San Andreas era           |
//! | Main entries     | Fixed-width entry records, ascending key order                  |
//! | Main content     | Packed code units, one zero unit after each entry's characters  |
//! | Mission entries  | As above, one pair of blocks per mission table                  |
//! | Mission content  |                                                                 |
//!
//! ### Header
//!
//! Vice City files carry no header. San Andreas era files start with:
//!
//! | Offset (bytes) | Field               | Description                                   |
//! |----------------|---------------------|-----------------------------------------------|
//! | 0x0000         | Version             | 2 bytes: fixed value 4                        |
//! | 0x0002         | Bits per code unit  | 2 bytes: 8 (San Andreas) or 16 (mobile)       |
//!
//! ### Entry Records
//!
//! Each table's entry block holds one fixed-width record per entry, sorted ascending by key.
//! The record layout depends on how the version keys its entries:
//!
//! | Variant     | Key field                            | Offset field                                        |
//! |-------------|--------------------------------------|-----------------------------------------------------|
//! | Name-keyed  | 8 bytes: ASCII name, NUL padded      | 4 bytes: offset in code units from blob start       |
//! | Hash-keyed  | 4 bytes: CRC-32 of uppercased name   | 4 bytes: offset in bytes from blob start            |
//!
//! ### Content Blob
//!
//! The content blob stores every entry's characters back to back, each run terminated by a
//! single zero code unit, in the same order as the entry block. Characters are not stored as
//! Unicode: each one is the index of the character in the game's character map, plus 32, packed
//! at the version's code-unit width.
//!
//! ## Versions
//!
//! | Version            | Header        | Entry keys   | Code-unit width |
//! |--------------------|---------------|--------------|-----------------|
//! | Vice City          | none          | 8-byte name  | 16-bit          |
//! | San Andreas        | `04 00 08 00` | CRC-32 hash  | 8-bit           |
//! | San Andreas mobile | `04 00 10 00` | CRC-32 hash  | 16-bit          |
//!
//! ## Additional Information
//!
//! - **File Extension**: `.gxt`
//! - **Endianness**: Little-endian for all multi-byte integers
//!
//! The format records no table directory and no block sizes, so a file cannot be parsed back
//! without outside knowledge of its layout. Builders therefore emit a sidecar
//! [`manifest::FileManifest`] recording where every table landed; the replacer consumes it to
//! locate and patch blocks in place.
//!

pub mod charmap;
pub mod error;
pub mod load;
pub mod manifest;
pub mod read;
pub mod replace;
pub mod table;
pub mod types;
pub mod write;

pub use charmap::CharacterMap;
pub use table::{GxtTable, TableCollection};
pub use types::{EntryKey, GxtVersion};
pub use write::produce_gxt_file;
