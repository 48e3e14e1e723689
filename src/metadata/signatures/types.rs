use bitflags::bitflags;

use crate::metadata::token::Token;

#[allow(non_snake_case)]
#[allow(missing_docs)]
/// Element types used in signature blobs (ECMA-335 II.23.1.16)
pub mod ELEMENT_TYPE {
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    // Generic parameter in a generic type definition, represented as number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    // Generic type instantiation. Followed by type type-arg-count type-1 ... type-n
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    // System.Object
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter in a generic method definition, represented as number
    pub const MVAR: u8 = 0x1e;
    // Required modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_REQD: u8 = 0x1f;
    // Optional modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_OPT: u8 = 0x20;
    // Sentinel for vararg method signature
    pub const SENTINEL: u8 = 0x41;
    // Denotes a local variable that points at a pinned object
    pub const PINNED: u8 = 0x45;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Flags of the leading calling-convention byte of a method signature
    pub struct CallingConvention: u8 {
        /// The method declares generic parameters; their count follows the convention
        const GENERIC = 0x10;
        /// The method has a receiver
        const HAS_THIS = 0x20;
        /// The receiver type is encoded as the first declared parameter
        const EXPLICIT_THIS = 0x40;
    }
}

impl CallingConvention {
    /// Mask of the low nibble holding the calling kind
    pub const KIND_MASK: u8 = 0x0F;
    /// `vararg` calling kind
    pub const KIND_VARARG: u8 = 0x05;

    /// The calling kind (default, C, stdcall, thiscall, fastcall, vararg)
    #[must_use]
    pub fn kind(&self) -> u8 {
        self.bits() & Self::KIND_MASK
    }

    /// Returns true if the generic flag is set
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.contains(CallingConvention::GENERIC)
    }

    /// Returns true if the explicit-this flag is set
    #[must_use]
    pub fn has_explicit_this(&self) -> bool {
        self.contains(CallingConvention::EXPLICIT_THIS)
    }
}

/// A decoded type descriptor of a signature blob.
///
/// Custom modifiers are consumed while decoding and not represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSignature {
    /// void
    Void,
    /// bool
    Boolean,
    /// char
    Char,
    /// signed 8bit integer
    I1,
    /// unsigned 8bit integer
    U1,
    /// signed 16bit integer
    I2,
    /// unsigned 16bit integer
    U2,
    /// signed 32bit integer
    I4,
    /// unsigned 32bit integer
    U4,
    /// signed 64bit integer
    I8,
    /// unsigned 64bit integer
    U8,
    /// 32bit floating-point
    R4,
    /// 64bit floating-point
    R8,
    /// System.String
    String,
    /// signed integer, sized to executing platform
    I,
    /// unsigned integer, sized to executing platform
    U,
    /// System.Object
    Object,
    /// System.TypedReference
    TypedByRef,
    /// Unmanaged pointer to a type
    Ptr(Box<TypeSignature>),
    /// Managed reference to a type
    ByRef(Box<TypeSignature>),
    /// CIL value-type (`TypeDefOrRefOrSpecEncoded`)
    ValueType(Token),
    /// CIL class (`TypeDefOrRefOrSpecEncoded`)
    Class(Token),
    /// Generic parameter of the enclosing type
    GenericParamType(u32),
    /// Generic parameter of the method
    GenericParamMethod(u32),
    /// Single dimension, zero based array
    SzArray(Box<TypeSignature>),
    /// General array; sizes and lower bounds are consumed, only the rank is kept
    Array {
        /// Element type
        base: Box<TypeSignature>,
        /// Number of dimensions
        rank: u32,
    },
    /// Generic type and its arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// Function pointer
    FnPtr(Box<MethodSignature>),
}

/// The fixed leading fields of a method signature.
///
/// Decoding stops right before the return type, which is what the resolver needs to
/// apply its arity gate without touching the type descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Calling convention flags
    pub calling_convention: CallingConvention,
    /// Number of generic parameters; present iff the generic flag is set
    pub generic_parameter_count: Option<u32>,
    /// Declared parameter count, including an explicit receiver slot
    pub fixed_parameter_count: u32,
}

impl SignatureHeader {
    /// Returns true if the explicit-this flag is set
    #[must_use]
    pub fn has_explicit_this(&self) -> bool {
        self.calling_convention.has_explicit_this()
    }

    /// Number of parameters a caller has to supply.
    ///
    /// With an explicit receiver the first declared slot is the receiver's type, so the
    /// user parameter count is one less than the declared count. `None` means the blob
    /// declares an explicit receiver but no parameter slot for it.
    #[must_use]
    pub fn user_parameter_count(&self) -> Option<u32> {
        if self.has_explicit_this() {
            self.fixed_parameter_count.checked_sub(1)
        } else {
            Some(self.fixed_parameter_count)
        }
    }
}

/// A fully decoded method signature (`MethodDefSig`, ECMA-335 II.23.2.1).
///
/// Produced fresh per decode call and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    /// Calling convention flags
    pub calling_convention: CallingConvention,
    /// Number of generic parameters; present iff the generic flag is set
    pub generic_parameter_count: Option<u32>,
    /// Declared parameter count, including an explicit receiver slot
    pub fixed_parameter_count: u32,
    /// The return type
    pub return_type: TypeSignature,
    /// The receiver type, present iff the explicit-this flag is set
    pub receiver_type: Option<TypeSignature>,
    /// The user parameters, in declaration order
    pub parameters: Vec<TypeSignature>,
}

impl MethodSignature {
    /// Returns true if the explicit-this flag is set
    #[must_use]
    pub fn has_explicit_this(&self) -> bool {
        self.calling_convention.has_explicit_this()
    }
}
