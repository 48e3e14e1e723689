//! Canonical type names.
//!
//! The resolver compares caller-supplied argument type names with the parameter types
//! it decodes from signature blobs. Both sides are brought into one canonical spelling
//! first: CLR full names for primitives (`System.Int32`), full metadata names for
//! classes and value types, and reflection-style suffixes for constructed types.
//!
//! | Descriptor | Canonical name |
//! |------------|----------------|
//! | `int32` | `System.Int32` |
//! | `class Ns.Foo` | `Ns.Foo` |
//! | `szarray T` | `T[]` |
//! | `array T rank 2` | `T[,]` |
//! | `byref T` | `T&` |
//! | `ptr T` | `T*` |
//! | `genericinst G A B` | `G<A,B>` |
//! | `var 0` / `mvar 0` | `!0` / `!!0` |

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    metadata::{resolver::MetadataImport, signatures::TypeSignature},
    Result,
};

/// Built-in types that have a dedicated element type, with their C# keyword aliases.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum PrimitiveType {
    /// System.Void
    #[strum(to_string = "System.Void", serialize = "void")]
    Void,
    /// System.Boolean
    #[strum(to_string = "System.Boolean", serialize = "bool")]
    Boolean,
    /// System.Char
    #[strum(to_string = "System.Char", serialize = "char")]
    Char,
    /// System.SByte
    #[strum(to_string = "System.SByte", serialize = "sbyte")]
    SByte,
    /// System.Byte
    #[strum(to_string = "System.Byte", serialize = "byte")]
    Byte,
    /// System.Int16
    #[strum(to_string = "System.Int16", serialize = "short")]
    Int16,
    /// System.UInt16
    #[strum(to_string = "System.UInt16", serialize = "ushort")]
    UInt16,
    /// System.Int32
    #[strum(to_string = "System.Int32", serialize = "int")]
    Int32,
    /// System.UInt32
    #[strum(to_string = "System.UInt32", serialize = "uint")]
    UInt32,
    /// System.Int64
    #[strum(to_string = "System.Int64", serialize = "long")]
    Int64,
    /// System.UInt64
    #[strum(to_string = "System.UInt64", serialize = "ulong")]
    UInt64,
    /// System.Single
    #[strum(to_string = "System.Single", serialize = "float")]
    Single,
    /// System.Double
    #[strum(to_string = "System.Double", serialize = "double")]
    Double,
    /// System.String
    #[strum(to_string = "System.String", serialize = "string")]
    String,
    /// System.Object
    #[strum(to_string = "System.Object", serialize = "object")]
    Object,
    /// System.IntPtr
    #[strum(to_string = "System.IntPtr", serialize = "nint")]
    IntPtr,
    /// System.UIntPtr
    #[strum(to_string = "System.UIntPtr", serialize = "nuint")]
    UIntPtr,
    /// System.TypedReference
    #[strum(to_string = "System.TypedReference")]
    TypedReference,
}

impl PrimitiveType {
    /// The CLR full name, e.g. `System.Int32`
    #[must_use]
    pub fn full_name(self) -> &'static str {
        self.into()
    }

    /// Map a decoded descriptor to its primitive, if it is one
    #[must_use]
    pub fn from_signature(signature: &TypeSignature) -> Option<Self> {
        let primitive = match signature {
            TypeSignature::Void => PrimitiveType::Void,
            TypeSignature::Boolean => PrimitiveType::Boolean,
            TypeSignature::Char => PrimitiveType::Char,
            TypeSignature::I1 => PrimitiveType::SByte,
            TypeSignature::U1 => PrimitiveType::Byte,
            TypeSignature::I2 => PrimitiveType::Int16,
            TypeSignature::U2 => PrimitiveType::UInt16,
            TypeSignature::I4 => PrimitiveType::Int32,
            TypeSignature::U4 => PrimitiveType::UInt32,
            TypeSignature::I8 => PrimitiveType::Int64,
            TypeSignature::U8 => PrimitiveType::UInt64,
            TypeSignature::R4 => PrimitiveType::Single,
            TypeSignature::R8 => PrimitiveType::Double,
            TypeSignature::String => PrimitiveType::String,
            TypeSignature::Object => PrimitiveType::Object,
            TypeSignature::I | TypeSignature::FnPtr(_) => PrimitiveType::IntPtr,
            TypeSignature::U => PrimitiveType::UIntPtr,
            TypeSignature::TypedByRef => PrimitiveType::TypedReference,
            _ => return None,
        };
        Some(primitive)
    }
}

/// Bring a caller-supplied type name into canonical form.
///
/// Whitespace is dropped, keyword aliases are replaced by CLR names (also inside generic
/// arguments and in front of `[]`, `&` and `*` suffixes). Anything else is kept verbatim.
///
/// ```rust
/// use dotbreak::metadata::typename::normalize_type_name;
///
/// assert_eq!(normalize_type_name("int"), "System.Int32");
/// assert_eq!(normalize_type_name("string[]"), "System.String[]");
/// assert_eq!(normalize_type_name("Dictionary`2<string, int>"), "Dictionary`2<System.String,System.Int32>");
/// assert_eq!(normalize_type_name("MyApp.Order"), "MyApp.Order");
/// ```
#[must_use]
pub fn normalize_type_name(name: &str) -> String {
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    normalize_compact(&compact)
}

fn normalize_compact(name: &str) -> String {
    let base_end = name
        .find(|c: char| matches!(c, '<' | '[' | '&' | '*'))
        .unwrap_or(name.len());
    let (base, mut rest) = name.split_at(base_end);

    let mut normalized = match base.parse::<PrimitiveType>() {
        Ok(primitive) => primitive.full_name().to_string(),
        Err(_) => base.to_string(),
    };

    if let Some(arguments) = rest.strip_prefix('<') {
        let Some(close) = matching_angle(arguments) else {
            normalized.push_str(rest);
            return normalized;
        };

        let arguments_normalized: Vec<String> = split_top_level(&arguments[..close])
            .into_iter()
            .map(normalize_compact)
            .collect();
        normalized.push('<');
        normalized.push_str(&arguments_normalized.join(","));
        normalized.push('>');
        rest = &arguments[close + 1..];
    }

    normalized.push_str(rest);
    normalized
}

/// Index of the `>` closing an already opened `<`
fn matching_angle(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' if depth == 0 => return Some(index),
            '>' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Render a decoded type descriptor as its canonical name.
///
/// Class and value-type tokens are named through the metadata store.
///
/// # Errors
/// Propagates failures of [`MetadataImport::type_name`] unchanged.
pub fn type_signature_name(
    signature: &TypeSignature,
    metadata: &dyn MetadataImport,
) -> Result<String> {
    if let Some(primitive) = PrimitiveType::from_signature(signature) {
        return Ok(primitive.full_name().to_string());
    }

    let name = match signature {
        TypeSignature::Class(token) | TypeSignature::ValueType(token) => {
            normalize_type_name(&metadata.type_name(*token)?)
        }
        TypeSignature::GenericParamType(index) => format!("!{index}"),
        TypeSignature::GenericParamMethod(index) => format!("!!{index}"),
        TypeSignature::Ptr(inner) => format!("{}*", type_signature_name(inner, metadata)?),
        TypeSignature::ByRef(inner) => format!("{}&", type_signature_name(inner, metadata)?),
        TypeSignature::SzArray(inner) => format!("{}[]", type_signature_name(inner, metadata)?),
        TypeSignature::Array { base, rank } => format!(
            "{}[{}]",
            type_signature_name(base, metadata)?,
            ",".repeat((*rank).saturating_sub(1) as usize)
        ),
        TypeSignature::GenericInst(base, arguments) => {
            let mut rendered = Vec::with_capacity(arguments.len());
            for argument in arguments {
                rendered.push(type_signature_name(argument, metadata)?);
            }
            format!(
                "{}<{}>",
                type_signature_name(base, metadata)?,
                rendered.join(",")
            )
        }
        other => {
            return Err(signature_error!("Descriptor {:?} has no canonical name", other));
        }
    };

    Ok(name)
}
