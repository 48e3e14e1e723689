//! Source breakpoints and their synchronization with a debugger controller.
//!
//! A breakpoint is requested by source file and line, optionally with a method name and
//! argument types. The [`BreakpointCollection`] binds requests to code in loaded program
//! images, installs them through the image, and keeps its state in sync with the
//! controller over a [`SyncChannel`].
//!
//! # Key Types
//! - [`BreakpointCollection`] - the lock-protected set of breakpoints of one session
//! - [`Breakpoint`] / [`BreakpointState`] - one tracked breakpoint and its lifecycle
//! - [`BreakpointRecord`] - the wire form of a breakpoint
//! - [`SyncChannel`] / [`StreamChannel`] - record transport
//! - [`ProgramImage`] / [`DebuggerController`] - capabilities of the debugged runtime
//!
//! # State machine
//!
//! ```text
//! Unresolved --resolve + install--> Activated <--> Deactivated
//!     |
//!     +--deactivate--> removed
//! ```

mod channel;
mod collection;
mod image;
mod record;
mod request;
mod types;

pub use channel::{StreamChannel, SyncChannel};
pub use collection::{BreakpointCollection, SESSION_FAILURE, UNDECODABLE_RECORD};
pub use image::{CodeLocation, DebuggerController, ProgramImage, SourceLocation};
pub use record::{BreakpointRecord, MAX_FRAME_SIZE, RECORD_VERSION};
pub use request::parse_request_string;
pub use types::{BatchReport, Binding, Breakpoint, BreakpointState, MethodRequest, Outcome};
