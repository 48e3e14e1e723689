//! Method resolution by name and static argument types.
//!
//! Given a type, a method name and the statically known argument type names, the
//! [`MethodResolver`] enumerates the same-named method definitions of the type and picks
//! the first one whose signature accepts the arguments:
//!
//! 1. The signature header is decoded; the calling convention must be a single byte.
//! 2. Candidates whose user parameter count differs from the argument count are skipped
//!    without decoding any type descriptor.
//! 3. The return type (and an explicit receiver type) are decoded and discarded.
//! 4. Each parameter type is decoded, named canonically and compared with the argument:
//!    equal names match, otherwise the [`TypeHierarchy`] decides. The first mismatch
//!    disqualifies the candidate.
//!
//! Overloads are selected first-match in enumeration order, so resolution is
//! deterministic exactly when the metadata store enumerates in a stable order.

use log::{debug, trace};

use crate::{
    metadata::{
        hierarchy::TypeHierarchy,
        method::{MethodInfo, MethodProps},
        signatures::SignatureDecoder,
        token::Token,
        typename::{normalize_type_name, type_signature_name},
    },
    Error, Result,
};

/// Method lookup capability of a loaded image's metadata.
///
/// Implementations must enumerate methods in a stable order; the resolver's first-match
/// rule depends on it.
pub trait MetadataImport: Send + Sync {
    /// All `MethodDef` tokens named `name` declared by `type_token`, in table order.
    ///
    /// # Errors
    /// Returns [`crate::Error::Collaborator`] if the enumeration fails.
    fn enum_methods_with_name(&self, type_token: Token, name: &str) -> Result<Vec<Token>>;

    /// Name, owner, attributes and signature blob of a method definition.
    ///
    /// # Errors
    /// Returns [`crate::Error::Collaborator`] if the token is unknown.
    fn method_props(&self, method: Token) -> Result<MethodProps>;

    /// Full name (`Namespace.Name`) of a `TypeDef`, `TypeRef` or `TypeSpec`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Collaborator`] if the token is unknown.
    fn type_name(&self, token: Token) -> Result<String>;
}

/// Outcome of a completed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A candidate accepted the arguments
    Matched(MethodInfo),
    /// No candidate accepted the arguments; the caller may retry after more modules load
    NoMatch,
}

impl Resolution {
    /// The resolved method, if any
    #[must_use]
    pub fn method_info(&self) -> Option<&MethodInfo> {
        match self {
            Resolution::Matched(info) => Some(info),
            Resolution::NoMatch => None,
        }
    }

    /// Returns true if a method was selected
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Matched(_))
    }
}

/// Stateless overload resolver over one metadata store.
///
/// # Examples
///
/// ```rust,ignore
/// let resolver = MethodResolver::new(image.metadata(), controller.type_hierarchy());
/// match resolver.resolve(type_token, "Add", &["int".to_string()])? {
///     Resolution::Matched(info) => println!("bind to {}", info.method_token),
///     Resolution::NoMatch => println!("not loaded yet"),
/// }
/// ```
pub struct MethodResolver<'a> {
    metadata: Option<&'a dyn MetadataImport>,
    hierarchy: &'a dyn TypeHierarchy,
}

impl<'a> MethodResolver<'a> {
    /// Creates a resolver; `metadata` is `None` when the image has no metadata available
    #[must_use]
    pub fn new(metadata: Option<&'a dyn MetadataImport>, hierarchy: &'a dyn TypeHierarchy) -> Self {
        MethodResolver {
            metadata,
            hierarchy,
        }
    }

    /// Resolve `method_name` inside `type_token` against the given argument types.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if no metadata store is available
    /// - [`Error::SignatureFormat`] if a candidate's blob is malformed
    /// - enumeration and lookup failures of the metadata store, unchanged
    pub fn resolve(
        &self,
        type_token: Token,
        method_name: &str,
        argument_type_names: &[String],
    ) -> Result<Resolution> {
        let metadata = self.metadata()?;
        let candidates = metadata.enum_methods_with_name(type_token, method_name)?;
        debug!(
            target: "resolver",
            "{} candidates for {}::{}",
            candidates.len(),
            type_token,
            method_name
        );

        self.resolve_candidates(method_name, argument_type_names, &candidates)
    }

    /// Pick the first of `candidates` whose signature accepts the argument types.
    ///
    /// # Errors
    /// Same as [`MethodResolver::resolve`].
    pub fn resolve_candidates(
        &self,
        method_name: &str,
        argument_type_names: &[String],
        candidates: &[Token],
    ) -> Result<Resolution> {
        let metadata = self.metadata()?;
        let arguments: Vec<String> = argument_type_names
            .iter()
            .map(|name| normalize_type_name(name))
            .collect();

        for &candidate in candidates {
            let props = metadata.method_props(candidate)?;
            if let Some(info) = self.match_candidate(metadata, candidate, &props, &arguments)? {
                debug!(
                    target: "resolver",
                    "{}({}) resolved to {}",
                    method_name,
                    arguments.join(","),
                    candidate
                );
                return Ok(Resolution::Matched(info));
            }
        }

        debug!(
            target: "resolver",
            "no overload of {} accepts ({})",
            method_name,
            arguments.join(",")
        );
        Ok(Resolution::NoMatch)
    }

    fn metadata(&self) -> Result<&'a dyn MetadataImport> {
        self.metadata.ok_or_else(|| {
            Error::InvalidArgument("metadata import is not available".to_string())
        })
    }

    fn match_candidate(
        &self,
        metadata: &dyn MetadataImport,
        candidate: Token,
        props: &MethodProps,
        arguments: &[String],
    ) -> Result<Option<MethodInfo>> {
        let mut decoder = SignatureDecoder::new(&props.signature);
        let header = decoder.read_header()?;

        let Some(user_count) = header.user_parameter_count() else {
            return Err(signature_error!(
                "{} declares explicit this without a receiver parameter",
                candidate
            ));
        };

        if user_count as usize != arguments.len() {
            trace!(
                target: "resolver",
                "{} skipped, takes {} arguments",
                candidate,
                user_count
            );
            return Ok(None);
        }

        decoder.read_type()?;
        if header.has_explicit_this() {
            // The receiver type is consumed but not compared against anything
            decoder.read_type()?;
        }

        for (position, argument) in arguments.iter().enumerate() {
            let parameter = decoder.read_type()?;
            let parameter_name = type_signature_name(&parameter, metadata)?;

            if !self.accepts(argument, &parameter_name)? {
                trace!(
                    target: "resolver",
                    "{} skipped, parameter {} is {} not {}",
                    candidate,
                    position,
                    parameter_name,
                    argument
                );
                return Ok(None);
            }
        }

        Ok(Some(MethodInfo {
            method_token: candidate,
            is_static: props.attributes.is_static(),
            has_generic_parameters: header.generic_parameter_count.is_some(),
        }))
    }

    fn accepts(&self, argument: &str, parameter: &str) -> Result<bool> {
        if argument == parameter {
            return Ok(true);
        }
        self.hierarchy.is_same_or_subtype(argument, parameter)
    }
}
