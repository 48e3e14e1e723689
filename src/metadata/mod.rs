//! Metadata access needed to bind breakpoints to .NET methods.
//!
//! This module holds everything the breakpoint layer needs to turn a method name and a
//! list of argument type names into a concrete `MethodDef` token.
//!
//! # Key Components
//!
//! - [`token`] - Metadata table row references
//! - [`method`] - Method attributes, properties and resolution results
//! - [`signatures`] - `MethodDefSig` decoding
//! - [`typename`] - Canonical type names and C# alias normalization
//! - [`hierarchy`] - Subtype queries used for argument compatibility
//! - [`resolver`] - The metadata store capability and overload resolution
//!
//! # Examples
//!
//! ```rust
//! use dotbreak::metadata::{
//!     signatures::decode_method_signature,
//!     typename::normalize_type_name,
//! };
//!
//! let signature = decode_method_signature(&[0x00, 0x01, 0x01, 0x0E])?;
//! assert_eq!(signature.parameters.len(), 1);
//! assert_eq!(normalize_type_name("string"), "System.String");
//! # Ok::<(), dotbreak::Error>(())
//! ```

/// Supertype queries for argument compatibility
pub mod hierarchy;
/// Method attribute flags, properties and resolution results
pub mod method;
/// Overload resolution against a metadata store
pub mod resolver;
/// Method signature decoding
pub mod signatures;
/// Metadata tokens
pub mod token;
/// Canonical type names
pub mod typename;
