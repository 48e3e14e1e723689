use std::fmt;

/// Table id of `TypeRef` rows.
pub const TABLE_TYPE_REF: u8 = 0x01;
/// Table id of `TypeDef` rows.
pub const TABLE_TYPE_DEF: u8 = 0x02;
/// Table id of `MethodDef` rows.
pub const TABLE_METHOD_DEF: u8 = 0x06;
/// Table id of `TypeSpec` rows.
pub const TABLE_TYPE_SPEC: u8 = 0x1B;

/// An opaque handle into the metadata tables of a loaded program image.
///
/// The high byte names the table, the low 24 bits the row. Breakpoints only ever keep
/// `MethodDef` tokens; type tokens appear in signature blobs and line-table lookups.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a `MethodDef` token for the given row
    #[must_use]
    pub fn method_def(row: u32) -> Self {
        Token((u32::from(TABLE_METHOD_DEF) << 24) | (row & 0x00FF_FFFF))
    }

    /// Creates a `TypeDef` token for the given row
    #[must_use]
    pub fn type_def(row: u32) -> Self {
        Token((u32::from(TABLE_TYPE_DEF) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table type from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if this is a null token (row 0 of any table)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }

    /// Returns true if the token references the `MethodDef` table
    #[must_use]
    pub fn is_method_def(&self) -> bool {
        self.table() == TABLE_METHOD_DEF
    }

    /// Returns true if the token references a `TypeDef`, `TypeRef` or `TypeSpec`
    #[must_use]
    pub fn is_type(&self) -> bool {
        matches!(
            self.table(),
            TABLE_TYPE_DEF | TABLE_TYPE_REF | TABLE_TYPE_SPEC
        )
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
