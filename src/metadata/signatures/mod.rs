//! Method signature decoding for .NET metadata.
//!
//! A `MethodDefSig` blob (ECMA-335 II.23.2.1) is a compact, self-describing encoding:
//!
//! ```text
//! convention [generic-count] param-count ret-type [receiver-type] param-type*
//! ```
//!
//! where every count is a compressed unsigned integer and every type is a recursive
//! element-type descriptor. The calling convention is defined to be a single byte; a
//! convention that decodes to a multi-byte integer is rejected.
//!
//! # Key Types
//! - [`SignatureDecoder`] - incremental decoder used by the method resolver
//! - [`SignatureHeader`] - convention, generic count and declared parameter count
//! - [`MethodSignature`] - fully decoded signature
//! - [`TypeSignature`] - one decoded type descriptor
//! - [`CallingConvention`] - flags of the convention byte
//!
//! Decoded values are produced fresh per call and never cached, because the image
//! behind a blob may change across module loads.

mod parser;
mod types;

pub use parser::*;
pub use types::*;

use crate::Result;

/// Decode a complete `MethodDefSig` from a byte slice
///
/// ## Arguments
/// * 'data' - The signature blob to decode
///
/// # Errors
/// Returns [`crate::Error::SignatureFormat`] if the blob is malformed or not fully consumed
///
/// # Example
///
/// ```rust
/// use dotbreak::metadata::signatures::{decode_method_signature, TypeSignature};
///
/// // instance int Add(int, int)
/// let signature = decode_method_signature(&[0x20, 0x02, 0x08, 0x08, 0x08])?;
/// assert_eq!(signature.return_type, TypeSignature::I4);
/// assert_eq!(signature.parameters.len(), 2);
/// # Ok::<(), dotbreak::Error>(())
/// ```
pub fn decode_method_signature(data: &[u8]) -> Result<MethodSignature> {
    SignatureDecoder::new(data).decode()
}
