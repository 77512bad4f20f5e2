use crate::error::{KbError, Result};
use crate::logic::Statement;
use smallvec::SmallVec;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable handle to a fact stored in a knowledge base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FactId(pub(crate) usize);

/// Stable handle to a rule stored in a knowledge base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuleId(pub(crate) usize);

/// Handle to either kind of stored entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntityId {
    /// A stored fact
    Fact(FactId),
    /// A stored rule
    Rule(RuleId),
}

/// One derivation path: the fact and rule that were combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Support {
    /// The fact matched against the rule's first condition
    pub fact: FactId,
    /// The rule that was discharged or specialized
    pub rule: RuleId,
}

impl Support {
    /// Returns true if this derivation used `entity`
    #[must_use]
    pub fn mentions(&self, entity: EntityId) -> bool {
        match entity {
            EntityId::Fact(id) => self.fact == id,
            EntityId::Rule(id) => self.rule == id,
        }
    }
}

/// Support bookkeeping shared by facts and rules.
///
/// `supported_by` lists the derivations that justify the entity;
/// `supports_facts` and `supports_rules` list what it helped derive.
/// `blocked` holds derivations that were found while one of their premises
/// still depended on this entity; they are retried once the entity goes away.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ledger {
    pub(crate) asserted: bool,
    pub(crate) supported_by: Vec<Support>,
    pub(crate) supports_facts: SmallVec<[FactId; 4]>,
    pub(crate) supports_rules: SmallVec<[RuleId; 4]>,
    pub(crate) blocked: Vec<Support>,
}

impl Ledger {
    fn asserted() -> Self {
        Self {
            asserted: true,
            ..Self::default()
        }
    }

    fn derived(support: Support) -> Self {
        Self {
            supported_by: vec![support],
            ..Self::default()
        }
    }

    /// True if the entity was placed in the knowledge base directly
    #[must_use]
    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    /// The derivations currently justifying the entity
    #[must_use]
    pub fn supported_by(&self) -> &[Support] {
        &self.supported_by
    }

    /// Facts this entity helped derive
    #[must_use]
    pub fn supports_facts(&self) -> &[FactId] {
        &self.supports_facts
    }

    /// Rules this entity helped derive
    #[must_use]
    pub fn supports_rules(&self) -> &[RuleId] {
        &self.supports_rules
    }

    /// Derivations held back because they would have made the support
    /// graph cyclic
    #[must_use]
    pub fn blocked(&self) -> &[Support] {
        &self.blocked
    }

    /// An entity belongs in the knowledge base while this holds
    #[must_use]
    pub fn is_justified(&self) -> bool {
        self.asserted || !self.supported_by.is_empty()
    }

    pub(crate) fn add_dependent(&mut self, dependent: EntityId) {
        match dependent {
            EntityId::Fact(id) if !self.supports_facts.contains(&id) => self.supports_facts.push(id),
            EntityId::Rule(id) if !self.supports_rules.contains(&id) => self.supports_rules.push(id),
            _ => {}
        }
    }

    pub(crate) fn add_support(&mut self, support: Support) {
        if !self.supported_by.contains(&support) {
            self.supported_by.push(support);
        }
    }

    pub(crate) fn add_blocked(&mut self, support: Support) {
        if !self.blocked.contains(&support) {
            self.blocked.push(support);
        }
    }

    pub(crate) fn forget_dependent(&mut self, dependent: EntityId) {
        match dependent {
            EntityId::Fact(id) => self.supports_facts.retain(|f| *f != id),
            EntityId::Rule(id) => self.supports_rules.retain(|r| *r != id),
        }
    }
}

/// A statement held to be true
#[derive(Debug, Clone)]
pub struct Fact {
    pub(crate) statement: Statement,
    pub(crate) ledger: Ledger,
}

impl Fact {
    /// A fact as handed in by a caller: directly asserted, no derivations
    #[must_use]
    pub fn new(statement: Statement) -> Self {
        Self {
            statement,
            ledger: Ledger::asserted(),
        }
    }

    pub(crate) fn derived(statement: Statement, support: Support) -> Self {
        Self {
            statement,
            ledger: Ledger::derived(support),
        }
    }

    /// The wrapped statement
    #[must_use]
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Support bookkeeping for this fact
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.statement == other.statement
    }
}

impl Eq for Fact {}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fact: {}", self.statement)
    }
}

/// An implication from a conjunction of conditions to a conclusion
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) lhs: Vec<Statement>,
    pub(crate) rhs: Statement,
    pub(crate) ledger: Ledger,
}

impl Rule {
    /// A directly asserted rule.
    ///
    /// # Errors
    ///
    /// Returns [`KbError::EmptyRule`] if `lhs` has no conditions.
    pub fn new(lhs: Vec<Statement>, rhs: Statement) -> Result<Self> {
        if lhs.is_empty() {
            return Err(KbError::EmptyRule);
        }
        Ok(Self {
            lhs,
            rhs,
            ledger: Ledger::asserted(),
        })
    }

    pub(crate) fn derived(lhs: Vec<Statement>, rhs: Statement, support: Support) -> Self {
        debug_assert!(!lhs.is_empty(), "derived rule without conditions");
        Self {
            lhs,
            rhs,
            ledger: Ledger::derived(support),
        }
    }

    /// Conditions, matched first to last
    #[must_use]
    pub fn lhs(&self) -> &[Statement] {
        &self.lhs
    }

    /// Conclusion template
    #[must_use]
    pub fn rhs(&self) -> &Statement {
        &self.rhs
    }

    /// Support bookkeeping for this rule
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.lhs == other.lhs && self.rhs == other.rhs
    }
}

impl Eq for Rule {}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("rule: (")?;
        for (i, condition) in self.lhs.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{condition}")?;
        }
        write!(f, ") -> {}", self.rhs)
    }
}

/// Either kind of knowledge handed to the knowledge base
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// A fact
    Fact(Fact),
    /// A rule
    Rule(Rule),
}

impl Entity {
    /// The statement of a fact; rules have none
    #[must_use]
    pub fn statement(&self) -> Option<&Statement> {
        match self {
            Entity::Fact(fact) => Some(&fact.statement),
            Entity::Rule(_) => None,
        }
    }

    /// Support bookkeeping of the wrapped fact or rule
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        match self {
            Entity::Fact(fact) => &fact.ledger,
            Entity::Rule(rule) => &rule.ledger,
        }
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut Ledger {
        match self {
            Entity::Fact(fact) => &mut fact.ledger,
            Entity::Rule(rule) => &mut rule.ledger,
        }
    }
}

impl From<Fact> for Entity {
    fn from(fact: Fact) -> Self {
        Entity::Fact(fact)
    }
}

impl From<Rule> for Entity {
    fn from(rule: Rule) -> Self {
        Entity::Rule(rule)
    }
}

impl From<Statement> for Entity {
    fn from(statement: Statement) -> Self {
        Entity::Fact(Fact::new(statement))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Fact(fact) => fact.fmt(f),
            Entity::Rule(rule) => rule.fmt(f),
        }
    }
}

/// Returns true if `entity` can be used as an `ask` query
#[must_use]
pub fn is_fact_query(entity: &Entity) -> bool {
    matches!(entity, Entity::Fact(_))
}
