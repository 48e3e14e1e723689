//! Method attribute flags and the result of a successful method resolution.

use bitflags::bitflags;

use crate::metadata::token::Token;

/// Bitmask for `ACCESS` state extraction
pub const METHOD_ACCESS_MASK: u32 = 0x0007;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// `MethodAttributes` of a `MethodDef` row (ECMA-335 II.23.1.10)
    pub struct MethodAttributes: u32 {
        /// Method is accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Method is accessible by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
        /// Method is defined on the type; otherwise, it is defined per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name+sig, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method is abstract and has no body
        const ABSTRACT = 0x0400;
        /// Method is special; the name describes how
        const SPECIAL_NAME = 0x0800;
    }
}

impl MethodAttributes {
    /// Build the flags from the raw attribute value, keeping unknown bits
    #[must_use]
    pub fn from_raw(flags: u32) -> Self {
        Self::from_bits_retain(flags)
    }

    /// Returns true if the method has no receiver
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.contains(MethodAttributes::STATIC)
    }
}

/// Properties of one method definition as reported by the metadata store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodProps {
    /// The method's `MethodDef` token
    pub token: Token,
    /// The type that declares the method
    pub owner: Token,
    /// The simple method name
    pub name: String,
    /// Attribute flags of the definition
    pub attributes: MethodAttributes,
    /// The raw `MethodDefSig` blob
    pub signature: Vec<u8>,
}

/// Result of a successful method resolution.
///
/// Only ever produced by [`crate::metadata::resolver::MethodResolver`] once a candidate
/// has fully matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodInfo {
    /// Token of the selected method definition
    pub method_token: Token,
    /// The selected method has no receiver
    pub is_static: bool,
    /// The selected method declares its own generic parameters
    pub has_generic_parameters: bool,
}
