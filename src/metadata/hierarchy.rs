//! Type-hierarchy oracle.
//!
//! The resolver accepts an argument for a parameter when the argument's type is the same
//! as, or a subtype of, the parameter's type. That question is answered by a
//! [`TypeHierarchy`]; the runtime integration usually answers it by walking live type
//! objects, [`TypeTable`] answers it from registered supertype links.

use std::collections::{HashSet, VecDeque};

use dashmap::DashMap;

use crate::{
    metadata::typename::{normalize_type_name, PrimitiveType},
    Result,
};

/// Answers whether one named type is the same as or derives from another.
pub trait TypeHierarchy: Send + Sync {
    /// Returns `Ok(true)` if `candidate` is `base` or a subtype of `base`.
    ///
    /// # Errors
    /// Implementations report lookup failures as [`crate::Error::Collaborator`].
    fn is_same_or_subtype(&self, candidate: &str, base: &str) -> Result<bool>;
}

/// A concurrent table of direct supertype links (base class and interfaces).
///
/// Names are normalized on registration and lookup, so `int` and `System.Int32` are the
/// same entry. Every type is considered a subtype of `System.Object`.
///
/// # Examples
///
/// ```rust
/// use dotbreak::metadata::hierarchy::{TypeHierarchy, TypeTable};
///
/// let table = TypeTable::new();
/// table.register("MyApp.Dog", ["MyApp.Animal", "MyApp.IPet"]);
/// table.register("MyApp.Puppy", ["MyApp.Dog"]);
///
/// assert!(table.is_same_or_subtype("MyApp.Puppy", "MyApp.IPet")?);
/// assert!(!table.is_same_or_subtype("MyApp.Animal", "MyApp.Dog")?);
/// # Ok::<(), dotbreak::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct TypeTable {
    supertypes: DashMap<String, Vec<String>>,
}

impl TypeTable {
    /// Creates an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds direct supertypes of `name`; repeated registrations accumulate.
    pub fn register<I, S>(&self, name: &str, supertypes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entry = self
            .supertypes
            .entry(normalize_type_name(name))
            .or_default();
        for supertype in supertypes {
            let supertype = normalize_type_name(supertype.as_ref());
            if !entry.contains(&supertype) {
                entry.push(supertype);
            }
        }
    }

    /// Number of types with registered supertypes
    #[must_use]
    pub fn len(&self) -> usize {
        self.supertypes.len()
    }

    /// Returns true if no type has been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.supertypes.is_empty()
    }
}

impl TypeHierarchy for TypeTable {
    fn is_same_or_subtype(&self, candidate: &str, base: &str) -> Result<bool> {
        let candidate = normalize_type_name(candidate);
        let base = normalize_type_name(base);

        if candidate == base || base == PrimitiveType::Object.full_name() {
            return Ok(true);
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([candidate]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }

            // Clone the links so no map guard is held while walking
            let Some(parents) = self.supertypes.get(&current).map(|links| links.value().clone()) else {
                continue;
            };

            for parent in parents {
                if parent == base {
                    return Ok(true);
                }
                queue.push_back(parent);
            }
        }

        Ok(false)
    }
}
