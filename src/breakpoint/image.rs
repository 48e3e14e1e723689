//! Collaborator capabilities of the debugged runtime.
//!
//! The collection never talks to the runtime directly. A [`DebuggerController`] hands out
//! the currently loaded [`ProgramImage`]s and the type-hierarchy oracle; each image maps
//! source lines to code, exposes its metadata and installs execution breakpoints.

use std::{fmt, sync::Arc};

use crate::{
    metadata::{hierarchy::TypeHierarchy, resolver::MetadataImport, token::Token},
    Result,
};

/// Code position a source line maps to, as reported by the image's line table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Type that declares the enclosing method
    pub type_token: Token,
    /// The enclosing method
    pub method_token: Token,
    /// IL offset of the first instruction of the line
    pub il_offset: u32,
}

impl SourceLocation {
    /// The installable part of this location
    #[must_use]
    pub fn code_location(&self) -> CodeLocation {
        CodeLocation {
            method_token: self.method_token,
            il_offset: self.il_offset,
        }
    }
}

/// Method and IL offset an execution breakpoint is installed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeLocation {
    /// Method containing the breakpoint
    pub method_token: Token,
    /// IL offset inside the method body
    pub il_offset: u32,
}

impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{:#x}", self.method_token, self.il_offset)
    }
}

/// One program image (module) loaded into the debugged runtime.
///
/// Calls are synchronous and bounded by the implementation. They are made while the
/// collection lock is held, so implementations must not call back into the collection.
pub trait ProgramImage: Send + Sync {
    /// Display name of the image, used in logs
    fn name(&self) -> &str;

    /// Map a source file and line to code inside this image.
    ///
    /// Returns `Ok(None)` if the image has no code for that line.
    ///
    /// # Errors
    /// Returns [`crate::Error::Collaborator`] if the line table cannot be read.
    fn locate(&self, source_file: &str, line: u32) -> Result<Option<SourceLocation>>;

    /// The metadata of this image, if it is available
    fn metadata(&self) -> Option<&dyn MetadataImport>;

    /// Install an execution breakpoint.
    ///
    /// Returns `Ok(false)` if the method is not loaded yet and installation has to be
    /// retried later.
    ///
    /// # Errors
    /// Returns [`crate::Error::Collaborator`] if the runtime rejected the request.
    fn install(&self, location: &CodeLocation) -> Result<bool>;

    /// Remove a previously installed execution breakpoint.
    ///
    /// # Errors
    /// Returns [`crate::Error::Collaborator`] if the runtime rejected the request.
    fn uninstall(&self, location: &CodeLocation) -> Result<()>;
}

/// The debugger session's view of the runtime.
///
/// The collection holds it as a shared handle for its whole lifetime.
pub trait DebuggerController: Send + Sync {
    /// Images loaded so far, in load order
    ///
    /// # Errors
    /// Returns [`crate::Error::Collaborator`] if the runtime cannot be queried.
    fn loaded_images(&self) -> Result<Vec<Arc<dyn ProgramImage>>>;

    /// Oracle used to compare argument types during method resolution
    fn type_hierarchy(&self) -> &dyn TypeHierarchy;
}
