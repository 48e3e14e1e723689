//! Encoding helpers shared by the record codec and the test fixtures.

/// Largest value representable as an ECMA-335 compressed unsigned integer.
pub const MAX_COMPRESSED_UINT: u32 = 0x1FFF_FFFF;

/// Writes a compressed unsigned integer according to ECMA-335 II.23.2.
///
/// - Values < 0x80: 1 byte
/// - Values < 0x4000: 2 bytes (with high bit set)
/// - Larger values: 4 bytes (with high 2 bits set)
///
/// Values above [`MAX_COMPRESSED_UINT`] cannot be represented; callers must range-check
/// them first. Such values are truncated to 29 bits.
pub fn write_compressed_uint(value: u32, buffer: &mut Vec<u8>) {
    if value < 0x80 {
        buffer.push(value as u8);
    } else if value < 0x4000 {
        buffer.push(0x80 | (value >> 8) as u8);
        buffer.push(value as u8);
    } else {
        buffer.push(0xC0 | ((value >> 24) & 0x1F) as u8);
        buffer.push((value >> 16) as u8);
        buffer.push((value >> 8) as u8);
        buffer.push(value as u8);
    }
}

/// Writes a 7-bit encoded integer (continuation bit in the MSB of each byte).
pub fn write_7bit_encoded_int(mut value: u32, buffer: &mut Vec<u8>) {
    while value >= 0x80 {
        buffer.push((value as u8) | 0x80);
        value >>= 7;
    }
    buffer.push(value as u8);
}

/// Writes a UTF-8 string prefixed by its 7-bit encoded byte length.
///
/// Strings longer than `u32::MAX` bytes are not supported by the format.
pub fn write_prefixed_string_utf8(value: &str, buffer: &mut Vec<u8>) {
    #[allow(clippy::cast_possible_truncation)]
    write_7bit_encoded_int(value.len() as u32, buffer);
    buffer.extend_from_slice(value.as_bytes());
}

/// Returns true if the first path and the second path are equal ignoring case.
///
/// Breakpoint locations are compared across case-preserving but case-insensitive file
/// systems, so `Program.cs` and `program.CS` name the same file.
#[must_use]
pub fn eq_ignore_case(first: &str, second: &str) -> bool {
    if first.len() == second.len() && first.eq_ignore_ascii_case(second) {
        return true;
    }

    first
        .chars()
        .flat_map(char::to_lowercase)
        .eq(second.chars().flat_map(char::to_lowercase))
}
