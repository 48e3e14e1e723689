//! Low-level byte cursor used by the signature decoder and the record codec.
//!
//! [`Parser`] keeps a position within a borrowed byte slice and offers bounds-checked
//! reads of single bytes, raw byte runs and the two variable-length integer
//! encodings that show up in this crate:
//!
//! - ECMA-335 compressed unsigned integers (II.23.2), used by signature blobs and by
//!   the numeric fields of breakpoint records
//! - 7-bit encoded integers, used as the length prefix of record strings
//!
//! Every read either advances the cursor by exactly the number of bytes it consumed or
//! fails with [`crate::Error::OutOfBounds`] / [`crate::Error::Malformed`] without
//! producing a value.
//!
//! # Examples
//!
//! ```rust
//! use dotbreak::Parser;
//!
//! let data = [0x03, 0x81, 0x00, 0xC0, 0x00, 0x40, 0x00];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_compressed_uint()?, 0x03);
//! assert_eq!(parser.read_compressed_uint_sized()?, (0x100, 2));
//! assert_eq!(parser.read_compressed_uint()?, 0x4000);
//! assert!(!parser.has_more_data());
//! # Ok::<(), dotbreak::Error>(())
//! ```

use crate::{metadata::token::Token, Result};

/// A generic binary data parser for reading signature blobs and record frames.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Check if there is more data to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of bytes that have not been consumed yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Peek at the next byte without advancing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is at or beyond the data length.
    pub fn peek_byte(&self) -> Result<u8> {
        if self.position >= self.data.len() {
            return Err(out_of_bounds_error!());
        }
        Ok(self.data[self.position])
    }

    /// Read a single byte and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is at or beyond the data length.
    pub fn read_u8(&mut self) -> Result<u8> {
        let value = self.peek_byte()?;
        self.position += 1;
        Ok(value)
    }

    /// Read `count` raw bytes and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `count` bytes remain.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.position + count > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// Read a compressed unsigned integer as defined in ECMA-335 II.23.2.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the encoding runs past the buffer, or
    /// [`crate::Error::Malformed`] if the first byte uses the reserved `111xxxxx` pattern.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        self.read_compressed_uint_sized().map(|(value, _)| value)
    }

    /// Read a compressed unsigned integer and report how many bytes it occupied.
    ///
    /// The byte count is what callers use to enforce fields that the format defines as
    /// single-byte, such as the calling convention of a method signature.
    ///
    /// # Errors
    /// Same as [`Parser::read_compressed_uint`].
    pub fn read_compressed_uint_sized(&mut self) -> Result<(u32, usize)> {
        let first_byte = self.read_u8()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok((u32::from(first_byte), 1));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_u8()?;
            let value = ((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte);
            return Ok((value, 2));
        }

        // 4-byte encoding: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_u8()?);
            let b2 = u32::from(self.read_u8()?);
            let b3 = u32::from(self.read_u8()?);
            let value = ((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3;
            return Ok((value, 4));
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read a compressed token as defined in ECMA-335 II.23.2.8 (`TypeDefOrRefOrSpecEncoded`).
    ///
    /// # Errors
    /// Returns an error if the underlying integer cannot be read or if the table tag is not
    /// one of `TypeDef`, `TypeRef` or `TypeSpec`.
    pub fn read_compressed_token(&mut self) -> Result<Token> {
        let compressed_token = self.read_compressed_uint()?;

        let table: u32 = match compressed_token & 0x3 {
            0x0 => 0x0200_0000, // TypeDef
            0x1 => 0x0100_0000, // TypeRef
            0x2 => 0x1B00_0000, // TypeSpec
            _ => {
                return Err(malformed_error!(
                    "Invalid compressed token - {}",
                    compressed_token
                ))
            }
        };

        let table_index = compressed_token >> 2;

        Ok(Token::new(table + table_index))
    }

    /// Read a 7-bit encoded integer.
    ///
    /// The most significant bit of each byte is a continuation flag; the value is the
    /// concatenation of the lower 7 bits in little-endian order.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the encoding runs past the buffer or
    /// [`crate::Error::Malformed`] if it would overflow a `u32`.
    pub fn read_7bit_encoded_int(&mut self) -> Result<u32> {
        let mut value = 0u32;
        let mut shift = 0;

        loop {
            if shift >= 35 {
                return Err(malformed_error!("7-bit encoded integer overflows u32"));
            }

            let byte = self.read_u8()?;
            value |= u32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Read a length-prefixed UTF-8 string (7-bit encoded length).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the string runs past the buffer or
    /// [`crate::Error::Malformed`] if the bytes are not valid UTF-8.
    pub fn read_prefixed_string_utf8(&mut self) -> Result<String> {
        let length = self.read_7bit_encoded_int()? as usize;
        let start = self.position;
        let string_data = self.read_bytes(length)?;

        String::from_utf8(string_data.to_vec()).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                start + length,
                e.utf8_error()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_read_compressed_uint() {
        let test_cases = vec![
            (vec![0x03], 0x03, 1),
            (vec![0x7F], 0x7F, 1),
            (vec![0x80, 0x80], 0x80, 2),
            (vec![0xAE, 0x57], 0x2E57, 2),
            (vec![0xBF, 0xFF], 0x3FFF, 2),
            (vec![0xC0, 0x00, 0x40, 0x00], 0x4000, 4),
            (vec![0xDF, 0xFF, 0xFF, 0xFF], 0x1FFF_FFFF, 4),
        ];

        for (input, expected, size) in test_cases {
            let mut parser = Parser::new(&input);
            assert_eq!(parser.read_compressed_uint_sized().unwrap(), (expected, size));
            assert_eq!(parser.remaining(), 0);
            assert_eq!(input.len(), size);
        }
    }

    #[test]
    fn test_read_compressed_uint_errors() {
        let mut parser = Parser::new(&[0xBF]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(Error::OutOfBounds)
        ));

        let mut parser = Parser::new(&[0xE0, 0x00, 0x00, 0x00]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(Error::Malformed { .. })
        ));

        let mut parser = Parser::new(&[]);
        assert!(parser.read_compressed_uint().is_err());
    }

    #[test]
    fn test_read_compressed_token() {
        let mut parser = Parser::new(&[0x49]);
        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x0100_0012));

        let mut parser = Parser::new(&[0x08]);
        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x0200_0002));

        let mut parser = Parser::new(&[0x03]);
        assert!(parser.read_compressed_token().is_err());
    }

    #[test]
    fn test_read_7bit_and_strings() {
        let mut parser = Parser::new(&[0xAC, 0x02]);
        assert_eq!(parser.read_7bit_encoded_int().unwrap(), 300);

        let mut parser = Parser::new(&[0x05, b'F', b'o', b'o', b'.', b'c']);
        assert_eq!(parser.read_prefixed_string_utf8().unwrap(), "Foo.c");
        assert!(!parser.has_more_data());

        let mut parser = Parser::new(&[0x05, b'F', b'o']);
        assert!(matches!(
            parser.read_prefixed_string_utf8(),
            Err(Error::OutOfBounds)
        ));

        let mut parser = Parser::new(&[0x02, 0xC3, 0x28]);
        assert!(matches!(
            parser.read_prefixed_string_utf8(),
            Err(Error::Malformed { .. })
        ));

        let mut parser = Parser::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert!(parser.read_7bit_encoded_int().is_err());
    }

    #[test]
    fn test_navigation() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.peek_byte().unwrap(), 0x01);
        assert_eq!(parser.read_u8().unwrap(), 0x01);
        assert_eq!(parser.read_bytes(3).unwrap(), &[0x02, 0x03, 0x04]);
        assert_eq!(parser.remaining(), 1);
        assert!(parser.read_bytes(2).is_err());
        assert_eq!(parser.read_u8().unwrap(), 0x05);
        assert!(!parser.has_more_data());
        assert!(parser.read_u8().is_err());
        assert!(parser.peek_byte().is_err());
    }
}
