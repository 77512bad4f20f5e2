use indexmap::IndexMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single argument of a statement
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Term {
    /// A variable that can be unified with any term (written `?x`)
    Variable(String),
    /// A concrete atom (e.g., `"Socrates"`)
    Constant(String),
}

impl Term {
    /// Build a variable term. A leading `?` is accepted and stripped.
    pub fn var(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.strip_prefix('?') {
            Some(stripped) => Term::Variable(stripped.to_string()),
            None => Term::Variable(name),
        }
    }

    /// Build a constant term
    pub fn constant(value: impl Into<String>) -> Self {
        Term::Constant(value.into())
    }

    /// Returns true for variables
    #[must_use]
    pub fn is_var(&self) -> bool {
        matches!(self, Term::Variable(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "?{name}"),
            Term::Constant(value) => f.write_str(value),
        }
    }
}

/// A predicate applied to an ordered list of terms (e.g., `(man ?x)`)
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Statement {
    /// The predicate symbol (e.g., `"man"`)
    pub predicate: String,
    /// The arguments, in order
    pub terms: Vec<Term>,
}

impl Statement {
    /// Create a statement from a predicate and its terms
    pub fn new(predicate: impl Into<String>, terms: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            terms,
        }
    }

    /// Shorthand for tests and callers: arguments starting with `?` become
    /// variables, everything else a constant.
    #[must_use]
    pub fn parse_terms(predicate: &str, args: &[&str]) -> Self {
        let terms = args
            .iter()
            .map(|arg| {
                if arg.starts_with('?') {
                    Term::var(*arg)
                } else {
                    Term::constant(*arg)
                }
            })
            .collect();
        Self::new(predicate, terms)
    }

    /// Returns true if no argument is a variable
    #[must_use]
    pub fn is_ground(&self) -> bool {
        !self.terms.iter().any(Term::is_var)
    }

    /// Variable names in order of first occurrence
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        let mut seen: Vec<&str> = Vec::new();
        self.terms.iter().filter_map(move |term| match term {
            Term::Variable(name) if !seen.contains(&name.as_str()) => {
                seen.push(name);
                Some(name.as_str())
            }
            _ => None,
        })
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.predicate)?;
        for term in &self.terms {
            write!(f, " {term}")?;
        }
        f.write_str(")")
    }
}

/// Variable substitution built up by a single unification.
///
/// Insertion order is kept so results print and compare deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bindings {
    bindings: IndexMap<String, Term>,
}

impl Bindings {
    /// Create an empty substitution
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The term a variable is bound to, if any
    #[must_use]
    pub fn bound_to(&self, variable: &str) -> Option<&Term> {
        self.bindings.get(variable)
    }

    /// Bind `variable` to `value` unless it is already bound, in which case
    /// the existing binding must equal `value`.
    pub fn test_and_bind(&mut self, variable: &str, value: &Term) -> bool {
        match self.bindings.get(variable) {
            Some(bound) => bound == value,
            None => {
                self.bindings.insert(variable.to_string(), value.clone());
                true
            }
        }
    }

    /// Number of bound variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true when nothing is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate over `(variable, term)` pairs in binding order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.bindings.iter().map(|(name, term)| (name.as_str(), term))
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, term) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "?{name} : {term}")?;
        }
        Ok(())
    }
}
