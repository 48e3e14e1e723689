//! Wire format of breakpoint records exchanged over the sync channel.
//!
//! Every record travels as one frame:
//!
//! ```text
//! u32 (LE) payload length
//! u8       version (1)
//! u8       flags   (0x01 activated, 0x02 method present)
//! string   id
//! string   source file
//! cuint    line
//! [string  method name
//!  cuint   argument count
//!  string* argument type names]
//! ```
//!
//! Strings are UTF-8 prefixed with a 7-bit encoded byte length, `cuint` is an ECMA-335
//! compressed unsigned integer.

use crate::{
    breakpoint::types::MethodRequest,
    utils::{write_compressed_uint, write_prefixed_string_utf8, MAX_COMPRESSED_UINT},
    Error, Parser, Result,
};

/// Current payload version
pub const RECORD_VERSION: u8 = 1;

/// Largest accepted payload
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

const FLAG_ACTIVATED: u8 = 0x01;
const FLAG_METHOD: u8 = 0x02;
const KNOWN_FLAGS: u8 = FLAG_ACTIVATED | FLAG_METHOD;

/// One breakpoint as exchanged with the controller.
///
/// On the wire a record is a `u32` little-endian payload length followed by the payload:
/// version, flags (`0x01` activated, `0x02` method present), id, source file, line and,
/// if flagged, the method name with its argument type names. Strings carry a 7-bit encoded
/// length prefix, numbers are ECMA-335 compressed integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointRecord {
    /// Identifier assigned by the controller
    pub id: String,
    /// Source file
    pub source_file: String,
    /// Source line
    pub line: u32,
    /// Requested (inbound) or current (outbound) activation
    pub activated: bool,
    /// Present only for signature based binding
    pub method: Option<MethodRequest>,
}

impl BreakpointRecord {
    /// Creates a record without method signature
    pub fn new(
        id: impl Into<String>,
        source_file: impl Into<String>,
        line: u32,
        activated: bool,
    ) -> Self {
        BreakpointRecord {
            id: id.into(),
            source_file: source_file.into(),
            line,
            activated,
            method: None,
        }
    }

    /// Builder-style setter for the method signature
    #[must_use]
    pub fn with_method(mut self, method: MethodRequest) -> Self {
        self.method = Some(method);
        self
    }

    /// Serialize the payload (without the length prefix).
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the line or argument count cannot be encoded or
    /// if the payload exceeds [`MAX_FRAME_SIZE`].
    pub fn encode_payload(&self) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(16 + self.id.len() + self.source_file.len());

        let mut flags = 0;
        if self.activated {
            flags |= FLAG_ACTIVATED;
        }
        if self.method.is_some() {
            flags |= FLAG_METHOD;
        }

        payload.push(RECORD_VERSION);
        payload.push(flags);
        write_prefixed_string_utf8(&self.id, &mut payload);
        write_prefixed_string_utf8(&self.source_file, &mut payload);
        write_compressed_uint(checked_compressed(self.line, "line")?, &mut payload);

        if let Some(method) = &self.method {
            write_prefixed_string_utf8(&method.name, &mut payload);

            let count = u32::try_from(method.argument_types.len()).map_err(|_| {
                Error::InvalidArgument("too many argument types".to_string())
            })?;
            write_compressed_uint(checked_compressed(count, "argument count")?, &mut payload);

            for argument in &method.argument_types {
                write_prefixed_string_utf8(argument, &mut payload);
            }
        }

        if payload.len() > MAX_FRAME_SIZE {
            return Err(Error::InvalidArgument(format!(
                "breakpoint record of {} bytes exceeds the frame limit",
                payload.len()
            )));
        }

        Ok(payload)
    }

    /// Serialize a complete frame, length prefix included.
    ///
    /// # Errors
    /// Same as [`BreakpointRecord::encode_payload`].
    pub fn encode_frame(&self) -> Result<Vec<u8>> {
        let payload = self.encode_payload()?;

        #[allow(clippy::cast_possible_truncation)]
        let length = payload.len() as u32;

        let mut frame = Vec::with_capacity(payload.len() + 4);
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    /// Decode one payload.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] for truncated payloads, unknown versions or flags,
    /// invalid UTF-8 and trailing bytes.
    pub fn decode_payload(data: &[u8]) -> Result<Self> {
        Self::read_payload(&mut Parser::new(data)).map_err(|error| match error {
            Error::OutOfBounds => malformed_error!("breakpoint record is truncated"),
            other => other,
        })
    }

    fn read_payload(parser: &mut Parser<'_>) -> Result<Self> {
        let version = parser.read_u8()?;
        if version != RECORD_VERSION {
            return Err(malformed_error!(
                "Unsupported breakpoint record version {}",
                version
            ));
        }

        let flags = parser.read_u8()?;
        if flags & !KNOWN_FLAGS != 0 {
            return Err(malformed_error!("Unknown breakpoint record flags {:#04x}", flags));
        }

        let id = parser.read_prefixed_string_utf8()?;
        let source_file = parser.read_prefixed_string_utf8()?;
        let line = parser.read_compressed_uint()?;

        let method = if flags & FLAG_METHOD != 0 {
            let name = parser.read_prefixed_string_utf8()?;
            let count = parser.read_compressed_uint()? as usize;
            // every argument needs at least its length byte
            if count > parser.remaining() {
                return Err(out_of_bounds_error!());
            }

            let mut argument_types = Vec::with_capacity(count);
            for _ in 0..count {
                argument_types.push(parser.read_prefixed_string_utf8()?);
            }
            Some(MethodRequest {
                name,
                argument_types,
            })
        } else {
            None
        };

        if parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after breakpoint record",
                parser.remaining()
            ));
        }

        Ok(BreakpointRecord {
            id,
            source_file,
            line,
            activated: flags & FLAG_ACTIVATED != 0,
            method,
        })
    }
}

fn checked_compressed(value: u32, what: &str) -> Result<u32> {
    if value > MAX_COMPRESSED_UINT {
        return Err(Error::InvalidArgument(format!(
            "{what} {value} cannot be encoded"
        )));
    }
    Ok(value)
}
