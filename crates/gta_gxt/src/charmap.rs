//! Character map loading and the game text codec.
//!
//! The game does not render Unicode: every displayable character is an index into a fixed
//! 16x14 grid baked into the font texture. The character map file mirrors that grid as
//! tab-separated UTF-8 text. Encoding turns a Unicode string into grid indices shifted by 32;
//! decoding is the reverse, used when reading a file back for patching or listing.

use derive_more::derive::{Constructor, Deref};
use std::io::Read;
use tracing::instrument;

use crate::error::{Error, Result};

/// Columns in the character map grid
pub const CHARACTER_MAP_WIDTH: usize = 16;

/// Rows in the character map grid
pub const CHARACTER_MAP_HEIGHT: usize = 14;

/// Total number of characters a map holds
pub const CHARACTER_MAP_SIZE: usize = CHARACTER_MAP_WIDTH * CHARACTER_MAP_HEIGHT;

/// The fixed grid of characters the game font supports
///
/// Loaded once at startup and passed by reference wherever text is encoded or decoded.
#[derive(Constructor, Deref, Clone, Debug, PartialEq, Eq)]
pub struct CharacterMap([char; CHARACTER_MAP_SIZE]);

impl CharacterMap {
    /// Parse a character map file: 14 rows of 16 tab-separated characters.
    ///
    /// A leading UTF-8 BOM is skipped. A file that is not valid UTF-8, runs out of rows, or
    /// holds a short row is rejected with [`Error::UnreadableCharacterMap`].
    #[instrument(skip(reader), err)]
    pub fn parse<R: Read>(mut reader: R) -> Result<CharacterMap> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;

        let text = std::str::from_utf8(&raw).map_err(|_| Error::UnreadableCharacterMap {
            reason: "file is not valid UTF-8".into(),
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut cells = ['\0'; CHARACTER_MAP_SIZE];
        let mut lines = text.lines();
        for row in 0..CHARACTER_MAP_HEIGHT {
            let line = lines.next().ok_or_else(|| Error::UnreadableCharacterMap {
                reason: format!("expected {CHARACTER_MAP_HEIGHT} rows, found {row}"),
            })?;

            let mut characters = line.chars().filter(|c| *c != '\t');
            for column in 0..CHARACTER_MAP_WIDTH {
                cells[row * CHARACTER_MAP_WIDTH + column] =
                    characters.next().ok_or_else(|| Error::UnreadableCharacterMap {
                        reason: format!(
                            "row {} holds fewer than {CHARACTER_MAP_WIDTH} characters",
                            row + 1
                        ),
                    })?;
            }
        }

        Ok(CharacterMap(cells))
    }

    /// The code unit a character encodes to, if the map holds it.
    ///
    /// A linear search; the map is small and input strings are short human-authored text.
    pub fn unit_for(&self, character: char) -> Option<u16> {
        self.iter()
            .position(|&c| c == character)
            .map(|index| (index + 32) as u16)
    }

    /// The character a stored code unit decodes to, if it points inside the map.
    pub fn char_for(&self, unit: u16) -> Option<char> {
        let index = usize::from(unit).checked_sub(32)?;
        self.get(index).copied()
    }

    /// Encode a string into code units, without the trailing zero terminator.
    ///
    /// A NUL passes through as unit 0; any other character missing from the map is fatal.
    pub fn encode(&self, text: &str) -> Result<Vec<u16>> {
        let mut units = Vec::with_capacity(text.len());
        for character in text.chars() {
            if character == '\0' {
                units.push(0);
                continue;
            }
            match self.unit_for(character) {
                Some(unit) => units.push(unit),
                None => return Err(Error::UnmappableCharacter { character }),
            }
        }
        Ok(units)
    }

    /// Decode stored code units back into a string.
    pub fn decode(&self, units: &[u16]) -> Result<String> {
        let mut text = String::with_capacity(units.len());
        for &unit in units {
            if unit == 0 {
                text.push('\0');
                continue;
            }
            match self.char_for(unit) {
                Some(character) => text.push(character),
                None => return Err(Error::UnmappableCodeUnit { unit }),
            }
        }
        Ok(text)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::charmap::{CharacterMap, CHARACTER_MAP_SIZE};
    use crate::error::{Error, Result};

    /// A map holding U+0020..U+00FF in grid order, so every character encodes to its own
    /// code point.
    pub(crate) fn latin_map() -> CharacterMap {
        let mut cells = ['\0'; CHARACTER_MAP_SIZE];
        for (index, cell) in cells.iter_mut().enumerate() {
            *cell = char::from_u32(32 + index as u32).unwrap();
        }
        CharacterMap::new(cells)
    }

    fn latin_map_text() -> String {
        let mut text = String::new();
        for row in 0..14 {
            for column in 0..16 {
                if column > 0 {
                    text.push('\t');
                }
                text.push(char::from_u32(32 + row * 16 + column).unwrap());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn parse_full_grid() -> Result<()> {
        let map = CharacterMap::parse(latin_map_text().as_bytes())?;
        assert_eq!(map, latin_map());
        Ok(())
    }

    #[test]
    fn parse_skips_bom() -> Result<()> {
        let text = format!("\u{feff}{}", latin_map_text());
        let map = CharacterMap::parse(text.as_bytes())?;
        assert_eq!(map, latin_map());
        Ok(())
    }

    #[test]
    fn parse_rejects_short_row() {
        let mut text = latin_map_text();
        text.pop(); // trailing newline
        text.pop(); // last cell of the last row

        let result = CharacterMap::parse(text.as_bytes());
        assert!(matches!(
            result,
            Err(Error::UnreadableCharacterMap { .. })
        ));
    }

    #[test]
    fn parse_rejects_missing_rows() {
        let text: String = latin_map_text().lines().take(5).collect::<Vec<_>>().join("\n");

        let result = CharacterMap::parse(text.as_bytes());
        assert!(matches!(
            result,
            Err(Error::UnreadableCharacterMap { .. })
        ));
    }

    #[test]
    fn encode_maps_through_the_grid() -> Result<()> {
        let map = latin_map();
        assert_eq!(map.encode("Hi")?, vec![0x48, 0x69]);
        assert_eq!(map.encode("")?, Vec::<u16>::new());
        Ok(())
    }

    #[test]
    fn encode_passes_nul_through() -> Result<()> {
        let map = latin_map();
        assert_eq!(map.encode("A\0B")?, vec![0x41, 0x00, 0x42]);
        Ok(())
    }

    #[test]
    fn encode_rejects_unmapped_characters() {
        let map = latin_map();
        assert!(matches!(
            map.encode("Δ"),
            Err(Error::UnmappableCharacter { character: 'Δ' })
        ));
    }

    #[test]
    fn decode_inverts_encode() -> Result<()> {
        let map = latin_map();
        let text = "The quick brown fox";
        assert_eq!(map.decode(&map.encode(text)?)?, text);
        Ok(())
    }

    #[test]
    fn encode_inverts_decode_on_valid_units() -> Result<()> {
        let map = latin_map();
        let units: Vec<u16> = vec![0x48, 0x65, 0x6C, 0x6C, 0x6F, 0x00, 0x21];
        assert_eq!(map.encode(&map.decode(&units)?)?, units);
        Ok(())
    }

    #[test]
    fn decode_rejects_stray_units() {
        let map = latin_map();
        assert!(matches!(
            map.decode(&[0x01]),
            Err(Error::UnmappableCodeUnit { unit: 0x01 })
        ));
        assert!(matches!(
            map.decode(&[0x1000]),
            Err(Error::UnmappableCodeUnit { unit: 0x1000 })
        ));
    }
}
