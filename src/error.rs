use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! signature_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::SignatureFormat {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::SignatureFormat {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Resolution that completes without finding a method is *not* an error; it is reported as
/// [`crate::metadata::resolver::Resolution::NoMatch`] so callers can retry once the target
/// module has been loaded.
///
/// # Error Categories
///
/// ## Caller Errors
/// - [`Error::InvalidArgument`] - Missing collaborator handle or malformed request string
///
/// ## Decoding Errors
/// - [`Error::SignatureFormat`] - A method signature blob violated its own length accounting
/// - [`Error::Malformed`] - A breakpoint record frame could not be decoded
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer
///
/// ## External Errors
/// - [`Error::Collaborator`] - A metadata, image or controller call failed
/// - [`Error::Io`] - The channel transport failed
/// - [`Error::LockError`] - The collection lock was poisoned
///
/// # Examples
///
/// ```rust
/// use dotbreak::{Error, metadata::signatures::decode_method_signature};
///
/// // 0x80 starts a two byte compressed integer, which is not a valid calling convention
/// match decode_method_signature(&[0x80, 0x20, 0x00, 0x01]) {
///     Err(Error::SignatureFormat { message, .. }) => println!("bad blob: {message}"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A required collaborator handle is absent or an input string is malformed.
    ///
    /// Always fatal to the single call and never retried automatically.
    #[error("Invalid argument - {0}")]
    InvalidArgument(String),

    /// A method signature blob could not be decoded.
    ///
    /// Raised whenever the consumed-byte accounting of a decode is inconsistent with the
    /// self-describing lengths of the format (multi-byte calling convention, truncated
    /// parameter list, unknown element type, ...).
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was wrong
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Bad signature - {file}:{line}: {message}")]
    SignatureFormat {
        /// The message to be printed for the SignatureFormat error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A breakpoint record frame is damaged and could not be decoded.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading a buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// A collaborator (metadata store, program image, controller) reported a failure.
    ///
    /// These are returned to the caller unchanged so that "resolver logic failed" can be
    /// told apart from "the metadata store itself failed".
    #[error("Collaborator failure - {0}")]
    Collaborator(String),

    /// Transport error of the synchronization channel.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Failed to lock target.
    ///
    /// Occurs when the breakpoint collection lock or a channel lock was poisoned by a
    /// panicking thread.
    #[error("Failed to lock target")]
    LockError,
}

impl Error {
    /// Returns `true` for [`Error::SignatureFormat`].
    #[must_use]
    pub fn is_signature_format(&self) -> bool {
        matches!(self, Error::SignatureFormat { .. })
    }

    /// Returns `true` if the error describes a single undecodable record, after which the
    /// channel can still be read.
    #[must_use]
    pub fn is_record_format(&self) -> bool {
        matches!(self, Error::Malformed { .. } | Error::OutOfBounds)
    }
}
