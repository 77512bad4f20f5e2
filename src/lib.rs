//! # Microtms
//!
//! A minimal forward-chaining reasoner with truth maintenance in Rust.
//!
//! ## Features
//!
//! - Incremental forward chaining: every assertion is combined with the
//!   stored rules (or facts) right away
//! - Justification tracking: each derived fact or rule records the
//!   (fact, rule) pairs that produced it
//! - Retraction that cascades to knowledge no longer justified, while keeping
//!   anything with an independent derivation
//!
//! ## Example
//!
//! ```rust
//! use microtms::{KnowledgeBase, Rule, Statement};
//!
//! let mut kb = KnowledgeBase::new();
//! let rule = Rule::new(
//!     vec![Statement::parse_terms("man", &["?x"])],
//!     Statement::parse_terms("mortal", &["?x"]),
//! )
//! .unwrap();
//! kb.assert(rule);
//! kb.assert(Statement::parse_terms("man", &["Socrates"]));
//!
//! let answers = kb.ask(Statement::parse_terms("mortal", &["?who"])).unwrap();
//! assert_eq!(answers.len(), 1);
//!
//! kb.retract(Statement::parse_terms("man", &["Socrates"]));
//! assert!(kb.ask(Statement::parse_terms("mortal", &["?who"])).unwrap().is_empty());
//! ```

/// Knowledge base settings.
pub mod config;
/// Facts, rules and their support ledgers.
pub mod entity;
/// Error types.
pub mod error;
/// Forward-chaining inference step.
pub mod inference;
/// The knowledge base.
pub mod kb;
/// Terms, statements and bindings.
pub mod logic;
/// Textual fact and rule reader.
#[cfg(feature = "parsing")]
pub mod parse;
/// Unification and instantiation.
pub mod unify;

pub use config::Config;
pub use entity::{is_fact_query, Entity, EntityId, Fact, FactId, Ledger, Rule, RuleId, Support};
pub use error::{KbError, Result};
pub use inference::InferenceEngine;
pub use kb::{KnowledgeBase, QueryResult, Retraction};
pub use logic::{Bindings, Statement, Term};
pub use unify::{instantiate, match_statements};
