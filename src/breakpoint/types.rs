use std::{fmt, sync::Arc};

use strum::{Display, IntoStaticStr};

use crate::{
    breakpoint::{
        image::{CodeLocation, ProgramImage},
        record::BreakpointRecord,
    },
    metadata::token::Token,
    utils::eq_ignore_case,
    Result,
};

/// Method name and argument types for a breakpoint bound by signature instead of by line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodRequest {
    /// Simple method name, e.g. `Add`
    pub name: String,
    /// Static argument type names, in parameter order
    pub argument_types: Vec<String>,
}

impl MethodRequest {
    /// Creates a new request
    pub fn new<I, S>(name: impl Into<String>, argument_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MethodRequest {
            name: name.into(),
            argument_types: argument_types.into_iter().map(Into::into).collect(),
        }
    }
}

/// Where an activated breakpoint lives: the image it was installed in and the code location.
#[derive(Clone)]
pub struct Binding {
    /// Image the breakpoint was installed into
    pub image: Arc<dyn ProgramImage>,
    /// Installed code location
    pub location: CodeLocation,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("image", &self.image.name())
            .field("location", &self.location)
            .finish()
    }
}

/// Lifecycle state of a breakpoint.
///
/// `Unresolved` is initial. `Activated` is only reached through resolution and a
/// successful install. `Deactivated` keeps the binding, so re-activation skips resolution.
/// A re-activation whose install is deferred by the image parks in `Reinstalling` until a
/// later retry installs it.
#[derive(Debug, Clone, Display, IntoStaticStr)]
pub enum BreakpointState {
    /// Parsed, not bound to code yet
    #[strum(to_string = "unresolved")]
    Unresolved,
    /// Installed at the bound location
    #[strum(to_string = "activated")]
    Activated(Binding),
    /// Bound but currently not installed
    #[strum(to_string = "deactivated")]
    Deactivated(Binding),
    /// Bound, activation requested, install not accepted yet
    #[strum(to_string = "reinstalling")]
    Reinstalling(Binding),
}

/// A source breakpoint tracked by the [`crate::breakpoint::BreakpointCollection`].
#[derive(Debug, Clone)]
pub struct Breakpoint {
    /// Identifier assigned by the controller
    pub id: String,
    /// Source file as given in the request
    pub source_file: String,
    /// 1-based source line
    pub line: u32,
    /// Bind by method signature instead of by the line's enclosing method
    pub method: Option<MethodRequest>,
    /// Current state
    pub state: BreakpointState,
}

impl Breakpoint {
    /// Creates an `Unresolved` breakpoint
    pub fn new(id: impl Into<String>, source_file: impl Into<String>, line: u32) -> Self {
        Breakpoint {
            id: id.into(),
            source_file: source_file.into(),
            line,
            method: None,
            state: BreakpointState::Unresolved,
        }
    }

    /// Builder-style setter for signature based binding
    #[must_use]
    pub fn with_method(mut self, method: MethodRequest) -> Self {
        self.method = Some(method);
        self
    }

    /// An `Unresolved` breakpoint built from a wire record
    #[must_use]
    pub fn from_record(record: &BreakpointRecord) -> Self {
        Breakpoint {
            id: record.id.clone(),
            source_file: record.source_file.clone(),
            line: record.line,
            method: record.method.clone(),
            state: BreakpointState::Unresolved,
        }
    }

    /// Wire record describing the current state of this breakpoint
    #[must_use]
    pub fn to_record(&self) -> BreakpointRecord {
        BreakpointRecord {
            id: self.id.clone(),
            source_file: self.source_file.clone(),
            line: self.line,
            activated: self.is_activated(),
            method: self.method.clone(),
        }
    }

    /// Same file (ignoring case) and same line
    #[must_use]
    pub fn is_at(&self, source_file: &str, line: u32) -> bool {
        self.line == line && eq_ignore_case(&self.source_file, source_file)
    }

    /// Returns true if the breakpoint is installed
    #[must_use]
    pub fn is_activated(&self) -> bool {
        matches!(self.state, BreakpointState::Activated(_))
    }

    /// Returns true if the breakpoint should be active but still waits for its code to load
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(
            self.state,
            BreakpointState::Unresolved | BreakpointState::Reinstalling(_)
        )
    }

    /// Returns true if the breakpoint was never bound
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self.state, BreakpointState::Unresolved)
    }

    /// Binding of a breakpoint that was resolved at least once
    #[must_use]
    pub fn binding(&self) -> Option<&Binding> {
        match &self.state {
            BreakpointState::Unresolved => None,
            BreakpointState::Activated(binding)
            | BreakpointState::Deactivated(binding)
            | BreakpointState::Reinstalling(binding) => Some(binding),
        }
    }

    /// The method this breakpoint was bound to, kept across deactivation
    #[must_use]
    pub fn resolved_method_token(&self) -> Option<Token> {
        self.binding().map(|binding| binding.location.method_token)
    }
}

/// What a single activation or deactivation request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Outcome {
    /// The breakpoint is now installed
    Activated,
    /// The breakpoint was uninstalled and keeps its binding
    Deactivated,
    /// An unresolved breakpoint was dropped from the collection
    Removed,
    /// Resolution found nothing or the code is not loaded yet; retried on the next sync
    Pending,
    /// Nothing to do
    Unchanged,
}

impl Outcome {
    /// Returns true if the request changed the collection
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            Outcome::Activated | Outcome::Deactivated | Outcome::Removed
        )
    }
}

/// Per-item outcomes of a batch operation.
///
/// A failing item never aborts the batch; its error is kept next to its id.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Breakpoint id (or a placeholder for undecodable records) and its outcome
    pub items: Vec<(String, Result<Outcome>)>,
}

impl BatchReport {
    /// Creates an empty report
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one item
    pub fn push(&mut self, id: impl Into<String>, outcome: Result<Outcome>) {
        self.items.push((id.into(), outcome));
    }

    /// Number of reported items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing was processed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items that succeeded with `outcome`
    #[must_use]
    pub fn count(&self, outcome: Outcome) -> usize {
        self.items
            .iter()
            .filter(|(_, result)| matches!(result, Ok(o) if *o == outcome))
            .count()
    }

    /// Items that failed
    pub fn failures(&self) -> impl Iterator<Item = (&str, &crate::Error)> {
        self.items.iter().filter_map(|(id, result)| match result {
            Ok(_) => None,
            Err(error) => Some((id.as_str(), error)),
        })
    }

    /// Returns true if no item failed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Outcome reported for `id`, the last one if it appears more than once
    #[must_use]
    pub fn outcome_of(&self, id: &str) -> Option<&Result<Outcome>> {
        self.items
            .iter()
            .rev()
            .find(|(item, _)| item == id)
            .map(|(_, result)| result)
    }
}
