use crate::{
    metadata::signatures::{
        CallingConvention, MethodSignature, SignatureHeader, TypeSignature, ELEMENT_TYPE,
    },
    Error, Parser, Result,
};

/// Maximum nesting depth of type descriptors
const MAX_RECURSION_DEPTH: usize = 50;

/// Incremental decoder for `MethodDefSig` blobs.
///
/// The resolver reads the [`SignatureHeader`] first, rejects candidates by arity and only
/// then pulls type descriptors one by one with [`SignatureDecoder::read_type`], stopping at
/// the first mismatch. Every read that runs past the blob or hits an undefined encoding is
/// reported as [`crate::Error::SignatureFormat`]; a partially decoded value is never
/// returned.
///
/// # Example
///
/// ```rust
/// use dotbreak::metadata::signatures::{SignatureDecoder, TypeSignature};
///
/// // static void Add(int)
/// let blob = [0x00, 0x01, 0x01, 0x08];
/// let mut decoder = SignatureDecoder::new(&blob);
/// let header = decoder.read_header()?;
/// assert_eq!(header.fixed_parameter_count, 1);
/// assert_eq!(decoder.read_type()?, TypeSignature::Void);
/// assert_eq!(decoder.read_type()?, TypeSignature::I4);
/// # Ok::<(), dotbreak::Error>(())
/// ```
///
/// Use one decoder per blob; it keeps its position between calls.
pub struct SignatureDecoder<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureDecoder<'a> {
    /// Create a new `SignatureDecoder` from a byte slice
    ///
    /// ## Arguments
    /// * 'data' - The signature blob to decode
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        SignatureDecoder {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    /// Number of blob bytes not consumed yet
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.parser.remaining()
    }

    /// Decode the calling convention, the optional generic count and the declared
    /// parameter count.
    ///
    /// # Errors
    /// Returns [`crate::Error::SignatureFormat`] if the calling convention does not occupy
    /// exactly one byte or if any count is truncated.
    pub fn read_header(&mut self) -> Result<SignatureHeader> {
        let (convention, consumed) = self.read_uint_sized("calling convention")?;
        if consumed != 1 {
            return Err(signature_error!(
                "Calling convention must be a single byte, found {} bytes - {:#x}",
                consumed,
                convention
            ));
        }

        #[allow(clippy::cast_possible_truncation)]
        let calling_convention = CallingConvention::from_bits_retain(convention as u8);

        let generic_parameter_count = if calling_convention.is_generic() {
            Some(self.read_uint("generic parameter count")?)
        } else {
            None
        };

        let fixed_parameter_count = self.read_uint("parameter count")?;

        Ok(SignatureHeader {
            calling_convention,
            generic_parameter_count,
            fixed_parameter_count,
        })
    }

    /// Decode one complete type descriptor, skipping leading custom modifiers.
    ///
    /// # Errors
    /// Returns [`crate::Error::SignatureFormat`] for truncated descriptors, unknown element
    /// types, invalid tokens or nesting deeper than the supported limit.
    pub fn read_type(&mut self) -> Result<TypeSignature> {
        self.skip_custom_mods()?;

        if self.depth + 1 >= MAX_RECURSION_DEPTH {
            return Err(signature_error!(
                "Type nesting exceeds {} levels",
                MAX_RECURSION_DEPTH
            ));
        }

        self.depth += 1;
        let result = self.read_type_inner();
        self.depth -= 1;
        result
    }

    /// Decode a complete method signature, consuming the whole blob.
    ///
    /// # Errors
    /// Returns [`crate::Error::SignatureFormat`] if the blob is malformed, if it declares
    /// an explicit receiver without a slot for it, or if bytes remain after the last
    /// parameter.
    pub fn decode(mut self) -> Result<MethodSignature> {
        let signature = self.read_method()?;
        if self.parser.has_more_data() {
            return Err(signature_error!(
                "{} trailing bytes after the last parameter",
                self.parser.remaining()
            ));
        }
        Ok(signature)
    }

    fn read_method(&mut self) -> Result<MethodSignature> {
        let header = self.read_header()?;
        let Some(user_count) = header.user_parameter_count() else {
            return Err(signature_error!(
                "Explicit this declared without a receiver parameter"
            ));
        };

        let return_type = self.read_type()?;
        let receiver_type = if header.has_explicit_this() {
            Some(self.read_type()?)
        } else {
            None
        };

        let mut parameters = Vec::with_capacity((user_count as usize).min(self.remaining()));
        for _ in 0..user_count {
            parameters.push(self.read_type()?);
        }

        Ok(MethodSignature {
            calling_convention: header.calling_convention,
            generic_parameter_count: header.generic_parameter_count,
            fixed_parameter_count: header.fixed_parameter_count,
            return_type,
            receiver_type,
            parameters,
        })
    }

    fn read_type_inner(&mut self) -> Result<TypeSignature> {
        let current_byte = self.read_byte("element type")?;
        match current_byte {
            ELEMENT_TYPE::VOID => Ok(TypeSignature::Void),
            ELEMENT_TYPE::BOOLEAN => Ok(TypeSignature::Boolean),
            ELEMENT_TYPE::CHAR => Ok(TypeSignature::Char),
            ELEMENT_TYPE::I1 => Ok(TypeSignature::I1),
            ELEMENT_TYPE::U1 => Ok(TypeSignature::U1),
            ELEMENT_TYPE::I2 => Ok(TypeSignature::I2),
            ELEMENT_TYPE::U2 => Ok(TypeSignature::U2),
            ELEMENT_TYPE::I4 => Ok(TypeSignature::I4),
            ELEMENT_TYPE::U4 => Ok(TypeSignature::U4),
            ELEMENT_TYPE::I8 => Ok(TypeSignature::I8),
            ELEMENT_TYPE::U8 => Ok(TypeSignature::U8),
            ELEMENT_TYPE::R4 => Ok(TypeSignature::R4),
            ELEMENT_TYPE::R8 => Ok(TypeSignature::R8),
            ELEMENT_TYPE::STRING => Ok(TypeSignature::String),
            ELEMENT_TYPE::I => Ok(TypeSignature::I),
            ELEMENT_TYPE::U => Ok(TypeSignature::U),
            ELEMENT_TYPE::OBJECT => Ok(TypeSignature::Object),
            ELEMENT_TYPE::TYPEDBYREF => Ok(TypeSignature::TypedByRef),
            ELEMENT_TYPE::PTR => Ok(TypeSignature::Ptr(Box::new(self.read_type()?))),
            ELEMENT_TYPE::BYREF => Ok(TypeSignature::ByRef(Box::new(self.read_type()?))),
            ELEMENT_TYPE::PINNED => self.read_type(),
            ELEMENT_TYPE::VALUETYPE => Ok(TypeSignature::ValueType(self.read_token()?)),
            ELEMENT_TYPE::CLASS => Ok(TypeSignature::Class(self.read_token()?)),
            ELEMENT_TYPE::VAR => Ok(TypeSignature::GenericParamType(
                self.read_uint("generic parameter index")?,
            )),
            ELEMENT_TYPE::MVAR => Ok(TypeSignature::GenericParamMethod(
                self.read_uint("generic parameter index")?,
            )),
            ELEMENT_TYPE::SZARRAY => Ok(TypeSignature::SzArray(Box::new(self.read_type()?))),
            ELEMENT_TYPE::ARRAY => {
                let base = self.read_type()?;
                let rank = self.read_uint("array rank")?;

                let num_sizes = self.read_uint("array size count")?;
                for _ in 0..num_sizes {
                    self.read_uint("array size")?;
                }

                let num_lo_bounds = self.read_uint("array lower bound count")?;
                for _ in 0..num_lo_bounds {
                    self.read_uint("array lower bound")?;
                }

                Ok(TypeSignature::Array {
                    base: Box::new(base),
                    rank,
                })
            }
            ELEMENT_TYPE::GENERICINST => {
                let peek_byte = self.peek_byte("generic instance")?;
                if peek_byte != ELEMENT_TYPE::CLASS && peek_byte != ELEMENT_TYPE::VALUETYPE {
                    return Err(signature_error!(
                        "GENERICINST - Next byte is not TYPE_CLASS or TYPE_VALUE - {}",
                        peek_byte
                    ));
                }

                let base_type = self.read_type()?;
                let arg_count = self.read_uint("generic argument count")?;

                let mut type_args =
                    Vec::with_capacity((arg_count as usize).min(self.remaining()));
                for _ in 0..arg_count {
                    type_args.push(self.read_type()?);
                }

                Ok(TypeSignature::GenericInst(Box::new(base_type), type_args))
            }
            ELEMENT_TYPE::FNPTR => Ok(TypeSignature::FnPtr(Box::new(self.read_method()?))),
            _ => Err(signature_error!(
                "Unsupported ELEMENT_TYPE - {:#04x}",
                current_byte
            )),
        }
    }

    /// Skip custom modifiers (`CMOD_OPT` or `CMOD_REQD`) and their tokens
    fn skip_custom_mods(&mut self) -> Result<()> {
        while self.parser.has_more_data() {
            let next_byte = self.peek_byte("custom modifier")?;
            if next_byte != ELEMENT_TYPE::CMOD_OPT && next_byte != ELEMENT_TYPE::CMOD_REQD {
                break;
            }

            self.read_byte("custom modifier")?;
            self.read_token()?;
        }

        Ok(())
    }

    fn read_token(&mut self) -> Result<crate::metadata::token::Token> {
        self.parser
            .read_compressed_token()
            .map_err(|e| Self::format_error("type token", &e))
    }

    fn read_uint(&mut self, field: &str) -> Result<u32> {
        self.read_uint_sized(field).map(|(value, _)| value)
    }

    fn read_uint_sized(&mut self, field: &str) -> Result<(u32, usize)> {
        self.parser
            .read_compressed_uint_sized()
            .map_err(|e| Self::format_error(field, &e))
    }

    fn read_byte(&mut self, field: &str) -> Result<u8> {
        self.parser
            .read_u8()
            .map_err(|e| Self::format_error(field, &e))
    }

    fn peek_byte(&self, field: &str) -> Result<u8> {
        self.parser
            .peek_byte()
            .map_err(|e| Self::format_error(field, &e))
    }

    fn format_error(field: &str, cause: &Error) -> Error {
        match cause {
            Error::OutOfBounds => signature_error!("Signature truncated while reading {}", field),
            other => signature_error!("Invalid {} - {}", field, other),
        }
    }
}
