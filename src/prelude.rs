//! # dotbreak Prelude
//!
//! Convenient re-exports of the types needed to run a breakpoint session. Import this
//! module to get the collection, its collaborator traits and the resolver in one line.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotbreak operations
pub use crate::Error;

/// The result type used throughout dotbreak
pub use crate::Result;

/// Session configuration
pub use crate::SessionConfig;

// ================================================================================================
// Breakpoints
// ================================================================================================

/// Breakpoint set and its lifecycle types
pub use crate::breakpoint::{
    BatchReport, Breakpoint, BreakpointCollection, BreakpointState, MethodRequest, Outcome,
};

/// Wire record and transports
pub use crate::breakpoint::{BreakpointRecord, StreamChannel, SyncChannel};

/// Runtime collaborators
pub use crate::breakpoint::{CodeLocation, DebuggerController, ProgramImage, SourceLocation};

// ================================================================================================
// Metadata
// ================================================================================================

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Method resolution
pub use crate::metadata::resolver::{MetadataImport, MethodResolver, Resolution};

/// Method properties and resolution results
pub use crate::metadata::method::{MethodAttributes, MethodInfo, MethodProps};

/// Type hierarchy oracle
pub use crate::metadata::hierarchy::{TypeHierarchy, TypeTable};

/// Signature decoding
pub use crate::metadata::signatures::{decode_method_signature, MethodSignature, TypeSignature};
