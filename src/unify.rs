//! Matching and substitution over statements.
//!
//! Both functions are pure; the knowledge base and the inference engine are
//! the only callers that carry state.

use crate::logic::{Bindings, Statement, Term};

/// Match `pattern` against `statement`, returning the bindings that make
/// them identical.
///
/// Variables on either side may bind. Terms are compared left to right and
/// the first inconsistency fails the whole match; no partial bindings are
/// ever returned.
#[must_use]
pub fn match_statements(pattern: &Statement, statement: &Statement) -> Option<Bindings> {
    if pattern.predicate != statement.predicate || pattern.terms.len() != statement.terms.len() {
        return None;
    }

    let mut bindings = Bindings::new();
    pattern
        .terms
        .iter()
        .zip(&statement.terms)
        .all(|(left, right)| match_terms(left, right, &mut bindings))
        .then_some(bindings)
}

fn match_terms(left: &Term, right: &Term, bindings: &mut Bindings) -> bool {
    match (left, right) {
        (Term::Variable(var), value) | (value, Term::Variable(var)) => {
            bindings.test_and_bind(var, value)
        }
        (Term::Constant(a), Term::Constant(b)) => a == b,
    }
}

/// Substitute every bound variable of `statement`.
///
/// Unbound variables are left in place, so a rule with several open
/// conditions can be specialized one condition at a time.
#[must_use]
pub fn instantiate(statement: &Statement, bindings: &Bindings) -> Statement {
    Statement {
        predicate: statement.predicate.clone(),
        terms: statement
            .terms
            .iter()
            .map(|term| instantiate_term(term, bindings))
            .collect(),
    }
}

/// Substitute a single term
#[must_use]
pub fn instantiate_term(term: &Term, bindings: &Bindings) -> Term {
    match term {
        Term::Variable(var) => bindings.bound_to(var).cloned().unwrap_or_else(|| term.clone()),
        Term::Constant(_) => term.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stmt(predicate: &str, args: &[&str]) -> Statement {
        Statement::parse_terms(predicate, args)
    }

    #[test]
    fn test_ground_match_yields_empty_bindings() {
        let bindings = match_statements(&stmt("man", &["Socrates"]), &stmt("man", &["Socrates"]));
        assert_eq!(bindings, Some(Bindings::new()));
    }

    #[test]
    fn test_predicate_and_arity_mismatch() {
        assert!(match_statements(&stmt("man", &["?x"]), &stmt("god", &["Zeus"])).is_none());
        assert!(match_statements(&stmt("man", &["?x"]), &stmt("man", &["a", "b"])).is_none());
    }

    #[test]
    fn test_variable_binds_to_constant() {
        let bindings = match_statements(&stmt("man", &["?x"]), &stmt("man", &["Socrates"])).unwrap();
        assert_eq!(bindings.bound_to("x"), Some(&Term::constant("Socrates")));
    }

    #[test]
    fn test_variable_on_statement_side_binds() {
        let bindings = match_statements(&stmt("likes", &["alice", "pizza"]), &stmt("likes", &["?who", "pizza"])).unwrap();
        assert_eq!(bindings.bound_to("who"), Some(&Term::constant("alice")));
    }

    #[test]
    fn test_repeated_variable_must_be_consistent() {
        let pattern = stmt("edge", &["?x", "?x"]);
        assert!(match_statements(&pattern, &stmt("edge", &["a", "a"])).is_some());
        assert!(match_statements(&pattern, &stmt("edge", &["a", "b"])).is_none());
    }

    #[test]
    fn test_variable_to_variable() {
        let bindings = match_statements(&stmt("p", &["?x"]), &stmt("p", &["?y"])).unwrap();
        assert_eq!(bindings.bound_to("x"), Some(&Term::var("y")));
    }

    #[test]
    fn test_failure_after_partial_progress() {
        // ?x binds to a before the constant mismatch at position 1
        let result = match_statements(&stmt("r", &["?x", "b"]), &stmt("r", &["a", "c"]));
        assert!(result.is_none());
    }

    #[test]
    fn test_instantiate_partial() {
        let mut bindings = Bindings::new();
        bindings.test_and_bind("x", &Term::constant("Socrates"));
        let result = instantiate(&stmt("teaches", &["?x", "?y"]), &bindings);
        assert_eq!(result, stmt("teaches", &["Socrates", "?y"]));
    }

    proptest! {
        #[test]
        fn prop_match_then_instantiate_agrees(
            args in prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "?x", "?y"]), 0..5),
            ground in prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 0..5),
        ) {
            let pattern = stmt("p", &args);
            let fact = stmt("p", &ground);
            if let Some(bindings) = match_statements(&pattern, &fact) {
                prop_assert_eq!(instantiate(&pattern, &bindings), fact);
            }
        }
    }
}
