// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![deny(unsafe_code)]

//! # dotbreak
//!
//! Source-level breakpoint management for .NET debuggers.
//!
//! `dotbreak` keeps the set of breakpoints of a debugging session, binds each of them to a
//! method in a loaded program image and keeps their state in sync with an out-of-process
//! controller. Breakpoints are requested by file and line, optionally narrowed to a method
//! name and its argument types; the latter are resolved against the image's metadata by
//! decoding ECMA-335 method signatures.
//!
//! ## Features
//!
//! - **Signature decoding** - complete `MethodDefSig` decoding with strict length accounting
//! - **Overload resolution** - arity gate, canonical type names and a subtype oracle
//! - **Breakpoint lifecycle** - resolution, activation and deactivation with pending retries
//! - **Controller sync** - framed records over any byte stream, drained in bounded batches
//! - **Thread safe** - one collection lock shared by the runtime and the sync path
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dotbreak::prelude::*;
//! use std::sync::Arc;
//!
//! let collection = BreakpointCollection::new(SessionConfig::default())?;
//! collection.initialize(controller, Box::new(StreamChannel::new(pipe_in, pipe_out)))?;
//! collection.parse_requests("Program.cs:35:bp-1;Orders.cs:12:bp-2")?;
//!
//! // from the runtime's module-load callback
//! let report = collection.initialize_breakpoints(&image)?;
//! for (id, error) in report.failures() {
//!     eprintln!("{id}: {error}");
//! }
//!
//! // from a timer
//! collection.sync_breakpoints()?;
//! # Ok::<(), dotbreak::Error>(())
//! ```
//!
//! ## Resolving a method directly
//!
//! ```rust
//! use dotbreak::metadata::signatures::{decode_method_signature, CallingConvention};
//!
//! // instance void M<T>(!!0, string)
//! let signature = decode_method_signature(&[0x30, 0x01, 0x02, 0x01, 0x1E, 0x00, 0x0E])?;
//! assert!(signature.calling_convention.contains(CallingConvention::HAS_THIS));
//! assert_eq!(signature.generic_parameter_count, Some(1));
//! assert_eq!(signature.parameters.len(), 2);
//! # Ok::<(), dotbreak::Error>(())
//! ```
//!
//! ## Logging
//!
//! The crate logs through the `log` facade and never installs a logger. Targets:
//! `resolver` (per-candidate decisions), `breakpoints` (state transitions) and `sync`
//! (channel traffic).
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

mod config;
mod parser;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Encoding helpers and path comparison
pub mod utils;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotbreak::prelude::*;
///
/// let table = TypeTable::new();
/// table.register("App.Dog", ["App.Animal"]);
/// assert!(table.is_same_or_subtype("App.Dog", "App.Animal")?);
/// # Ok::<(), dotbreak::Error>(())
/// ```
pub mod prelude;

/// Tokens, method signatures, type names and method resolution
pub mod metadata;

/// Breakpoint collection, wire records and runtime collaborator traits
pub mod breakpoint;

/// `dotbreak` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotbreak` Error type
pub use error::Error;

/// Session configuration
pub use config::SessionConfig;

/// Bounds-checked byte cursor used by the signature and record decoders
pub use parser::Parser;
