//! Primitive binary decoding helpers shared by the map and model readers.
//!
//! All integers in the supported formats are little-endian. Every read and
//! seek is bounds-checked against the buffer; nothing is silently truncated.

use byteorder::{ByteOrder, LittleEndian};

use crate::traits::{ParseError, ParseResult};

/// Decode a fixed-width, NUL-padded string field.
///
/// The field ends at the first NUL byte. Invalid UTF-8 is replaced rather
/// than rejected since names only need to round-trip to paths.
pub fn fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Read a little-endian `i32` at `offset` of `bytes`
pub fn read_i32_at(bytes: &[u8], offset: usize) -> ParseResult<i32> {
    let slice = checked_slice(bytes, offset, 4)?;
    Ok(LittleEndian::read_i32(slice))
}

/// Borrow `length` bytes at `offset`, or fail with `OutOfRange`
pub fn checked_slice(bytes: &[u8], offset: usize, length: usize) -> ParseResult<&[u8]> {
    let end = offset.checked_add(length).filter(|end| *end <= bytes.len());
    match end {
        Some(end) => Ok(&bytes[offset..end]),
        None => Err(ParseError::OutOfRange {
            offset: offset as u64,
            length: length as u64,
            size: bytes.len() as u64,
        }),
    }
}

/// Split a lump into fixed-size records.
///
/// The lump length must be an exact multiple of `stride`, so that the
/// records consume the lump completely.
pub fn fixed_records<'a>(
    lump: &'a [u8],
    stride: usize,
    lump_name: &'static str,
) -> ParseResult<std::slice::ChunksExact<'a, u8>> {
    if stride == 0 || lump.len() % stride != 0 {
        return Err(ParseError::InvalidLumpSize {
            lump: lump_name,
            length: lump.len(),
            stride,
        });
    }
    Ok(lump.chunks_exact(stride))
}

/// Absolute position remembered as the origin of a record.
///
/// Formats such as MD3 store offsets relative to the start of the record
/// that contains them. Keeping the origin as its own type makes it
/// impossible to pass a relative field where an absolute position is
/// expected, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

impl Mark {
    /// Absolute offset of the record start
    pub fn offset(self) -> usize {
        self.0
    }

    /// Resolve a record-relative field into an absolute offset
    pub fn resolve(self, relative: i32) -> ParseResult<usize> {
        let relative = usize::try_from(relative).map_err(|_| {
            ParseError::InvalidStructure(format!(
                "negative relative offset {relative} from record at {}",
                self.0
            ))
        })?;
        self.0.checked_add(relative).ok_or_else(|| {
            ParseError::InvalidStructure(format!("relative offset {relative} overflows"))
        })
    }
}

/// Bounds-checked little-endian reader over an in-memory file
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryCursor<'a> {
    /// Create a cursor positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Total size of the underlying buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current absolute position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Remember the current position as a record origin
    pub fn mark(&self) -> Mark {
        Mark(self.pos)
    }

    /// Move to an absolute position; the end of the buffer is allowed
    pub fn seek(&mut self, offset: usize) -> ParseResult<()> {
        if offset > self.data.len() {
            return Err(ParseError::OutOfRange {
                offset: offset as u64,
                length: 0,
                size: self.data.len() as u64,
            });
        }
        self.pos = offset;
        Ok(())
    }

    /// Move to `origin + relative`
    pub fn seek_from(&mut self, origin: Mark, relative: i32) -> ParseResult<()> {
        let target = origin.resolve(relative)?;
        self.seek(target)
    }

    /// Advance without decoding
    pub fn skip(&mut self, count: usize) -> ParseResult<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Borrow the next `count` bytes
    pub fn read_bytes(&mut self, count: usize) -> ParseResult<&'a [u8]> {
        let slice = checked_slice(self.data, self.pos, count)?;
        self.pos += count;
        Ok(slice)
    }

    /// Read a little-endian `i32`
    pub fn read_i32(&mut self) -> ParseResult<i32> {
        self.read_bytes(4).map(LittleEndian::read_i32)
    }

    /// Read a little-endian `i32` that must not be negative (counts, offsets)
    pub fn read_count(&mut self, field: &str) -> ParseResult<usize> {
        let at = self.pos;
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| {
            ParseError::InvalidStructure(format!("negative {field} ({value}) at offset {at}"))
        })
    }

    /// Read a fixed-width NUL-padded string
    pub fn read_fixed_str(&mut self, width: usize) -> ParseResult<String> {
        self.read_bytes(width).map(fixed_str)
    }

    /// Check the 4-byte magic tag at the current position
    pub fn expect_magic(&mut self, magic: &[u8; 4]) -> ParseResult<()> {
        let found = checked_slice(self.data, self.pos, 4).unwrap_or(&self.data[self.pos..]);
        if found != magic {
            return Err(ParseError::InvalidMagic {
                expected: magic.to_vec(),
                found: found.to_vec(),
            });
        }
        self.pos += 4;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_str_stops_at_nul() {
        let mut field = [0u8; 16];
        field[..8].copy_from_slice(b"textures");
        field[10] = b'x'; // garbage after the terminator
        assert_eq!(fixed_str(&field), "textures");
        assert_eq!(fixed_str(b"no_padding"), "no_padding");
    }

    #[test]
    fn test_read_i32_little_endian() {
        let bytes = [0x78, 0x56, 0x34, 0x12, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(read_i32_at(&bytes, 0).unwrap(), 0x12345678);
        assert_eq!(read_i32_at(&bytes, 4).unwrap(), -1);
        assert!(matches!(read_i32_at(&bytes, 5), Err(ParseError::OutOfRange { .. })));
    }

    #[test]
    fn test_fixed_records_requires_exact_multiple() {
        let lump = [0u8; 144];
        assert_eq!(fixed_records(&lump, 72, "textures").unwrap().count(), 2);
        assert!(matches!(
            fixed_records(&lump, 68, "textures"),
            Err(ParseError::InvalidLumpSize { length: 144, stride: 68, .. })
        ));
    }

    #[test]
    fn test_cursor_bounds() {
        let data = [1u8, 0, 0, 0, 2, 0, 0, 0];
        let mut cursor = BinaryCursor::new(&data);
        assert_eq!(cursor.read_i32().unwrap(), 1);
        assert_eq!(cursor.read_i32().unwrap(), 2);
        assert!(cursor.read_i32().is_err());

        assert!(cursor.seek(8).is_ok());
        assert!(matches!(cursor.seek(9), Err(ParseError::OutOfRange { offset: 9, .. })));
    }

    #[test]
    fn test_mark_relative_seek() {
        let data = [0u8; 32];
        let mut cursor = BinaryCursor::new(&data);
        cursor.seek(10).unwrap();
        let origin = cursor.mark();
        cursor.skip(4).unwrap();

        cursor.seek_from(origin, 6).unwrap();
        assert_eq!(cursor.position(), 16);
        assert!(cursor.seek_from(origin, 40).is_err());
        assert!(matches!(cursor.seek_from(origin, -2), Err(ParseError::InvalidStructure(_))));
    }

    #[test]
    fn test_read_count_rejects_negative() {
        let data = (-3i32).to_le_bytes();
        let mut cursor = BinaryCursor::new(&data);
        assert!(matches!(cursor.read_count("surface count"), Err(ParseError::InvalidStructure(_))));
    }

    #[test]
    fn test_expect_magic() {
        let mut cursor = BinaryCursor::new(b"IDP3rest");
        assert!(cursor.expect_magic(b"IDP3").is_ok());
        assert_eq!(cursor.position(), 4);

        let mut short = BinaryCursor::new(b"ID");
        match short.expect_magic(b"IDP3") {
            Err(ParseError::InvalidMagic { found, .. }) => assert_eq!(found, b"ID".to_vec()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
