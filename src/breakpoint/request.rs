//! Parsing of breakpoint request strings.
//!
//! A request is `<file><SPLIT><line><SPLIT><id>`; several requests are joined by
//! `DELIMITER`. With the default separators:
//!
//! ```text
//! Program.cs:35:bp-1;Models/Order.cs:12:bp-2
//! ```

use crate::{breakpoint::types::Breakpoint, Error, Result, SessionConfig};

/// Parse a request string into `Unresolved` breakpoints.
///
/// Empty segments (leading, trailing or doubled delimiters) are ignored. Whitespace around
/// each field is trimmed.
///
/// # Errors
/// Returns [`Error::InvalidArgument`] if the configured separators are invalid, if a
/// segment does not split into exactly three fields, if a field is empty or if the line is
/// not a positive number.
///
/// # Examples
///
/// ```rust
/// use dotbreak::{breakpoint::parse_request_string, SessionConfig};
///
/// let breakpoints = parse_request_string("Foo.cs:10:bp1", &SessionConfig::default())?;
/// assert_eq!(breakpoints[0].source_file, "Foo.cs");
/// assert_eq!(breakpoints[0].line, 10);
/// assert!(!breakpoints[0].is_activated());
/// # Ok::<(), dotbreak::Error>(())
/// ```
pub fn parse_request_string(input: &str, config: &SessionConfig) -> Result<Vec<Breakpoint>> {
    config.validate()?;

    input
        .split(config.delimiter.as_str())
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| parse_segment(segment, &config.split))
        .collect()
}

fn parse_segment(segment: &str, split: &str) -> Result<Breakpoint> {
    let fields: Vec<&str> = segment.split(split).map(str::trim).collect();
    let [source_file, line, id] = fields.as_slice() else {
        return Err(Error::InvalidArgument(format!(
            "breakpoint request '{}' has {} fields, expected 3",
            segment,
            fields.len()
        )));
    };

    if source_file.is_empty() || id.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "breakpoint request '{segment}' has an empty file or id"
        )));
    }

    let line = match line.parse::<u32>() {
        Ok(line) if line > 0 => line,
        _ => {
            return Err(Error::InvalidArgument(format!(
                "breakpoint request '{segment}' has an invalid line '{line}'"
            )))
        }
    };

    Ok(Breakpoint::new(*id, *source_file, line))
}
