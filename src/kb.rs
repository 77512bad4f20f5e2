use crate::config::Config;
use crate::entity::{
    is_fact_query, Entity, EntityId, Fact, FactId, Ledger, Rule, RuleId, Support,
};
use crate::error::{KbError, Result};
use crate::inference::InferenceEngine;
use crate::logic::{Bindings, Statement};
use crate::unify::match_statements;
use indexmap::{IndexMap, IndexSet};
use log::{debug, info, trace, warn};
use std::collections::VecDeque;
use std::fmt;

/// One answer to [`KnowledgeBase::ask`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Variable bindings that make the query match
    pub bindings: Bindings,
    /// The stored fact the query matched
    pub fact: FactId,
}

/// What a call to [`KnowledgeBase::retract`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retraction {
    /// The fact was deleted, together with everything that depended solely on it
    Removed {
        /// Facts deleted, the retracted one included
        facts: usize,
        /// Derived rules deleted
        rules: usize,
    },
    /// The fact is no longer asserted but is still derived some other way
    StillSupported,
    /// No such fact is stored
    NotFound,
    /// Rules are never retracted
    RuleIgnored,
}

/// Dedup key for rules: conditions plus conclusion
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    lhs: Vec<Statement>,
    rhs: Statement,
}

impl RuleKey {
    fn of(rule: &Rule) -> Self {
        Self {
            lhs: rule.lhs.clone(),
            rhs: rule.rhs.clone(),
        }
    }
}

/// A mutable set of facts and rules, closed under forward chaining.
///
/// Facts and rules live in slot arenas so their ids stay valid while other
/// entries are removed. The content indexes keep insertion order, which is
/// the order `ask` reports results in.
#[derive(Debug)]
pub struct KnowledgeBase {
    facts: Vec<Option<Fact>>,
    rules: Vec<Option<Rule>>,
    fact_index: IndexMap<Statement, FactId>,
    rule_index: IndexMap<RuleKey, RuleId>,
    engine: InferenceEngine,
    config: Config,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeBase {
    /// Create an empty knowledge base with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty knowledge base
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            facts: Vec::new(),
            rules: Vec::new(),
            fact_index: IndexMap::new(),
            rule_index: IndexMap::new(),
            engine: InferenceEngine::new(config),
            config,
        }
    }

    /// The configuration this knowledge base was built with
    #[must_use]
    pub fn config(&self) -> Config {
        self.config
    }

    /// Assert a fact or rule, deriving everything that follows from it
    pub fn assert(&mut self, item: impl Into<Entity>) -> EntityId {
        let mut item = item.into();
        info!("Asserting {item}");
        item.ledger_mut().asserted = true;
        self.add(item)
    }

    /// Add a fact or rule.
    ///
    /// A new entity is stored and paired with every entity of the opposite
    /// kind. An entity equal to a stored one is merged into it instead: its
    /// derivations are appended, or, if it carries none, the stored entity
    /// becomes asserted. Returns the id of the stored entity.
    pub fn add(&mut self, item: impl Into<Entity>) -> EntityId {
        match item.into() {
            Entity::Fact(fact) => EntityId::Fact(self.add_fact(fact)),
            Entity::Rule(rule) => EntityId::Rule(self.add_rule(rule)),
        }
    }

    pub(crate) fn add_fact(&mut self, fact: Fact) -> FactId {
        if self.config.reports_inference() {
            debug!("Adding {fact}");
        }
        if let Some(&id) = self.fact_index.get(&fact.statement) {
            self.merge(EntityId::Fact(id), fact.ledger);
            return id;
        }

        let id = FactId(self.facts.len());
        let supports = fact.ledger.supported_by.clone();
        self.fact_index.insert(fact.statement.clone(), id);
        self.facts.push(Some(fact));
        for support in supports {
            self.register_support(support, EntityId::Fact(id));
        }

        let rules: Vec<RuleId> = self.rule_index.values().copied().collect();
        let engine = self.engine;
        for rule in rules {
            engine.fc_infer(id, rule, self);
        }
        id
    }

    pub(crate) fn add_rule(&mut self, rule: Rule) -> RuleId {
        if self.config.reports_inference() {
            debug!("Adding {rule}");
        }
        let key = RuleKey::of(&rule);
        if let Some(&id) = self.rule_index.get(&key) {
            self.merge(EntityId::Rule(id), rule.ledger);
            return id;
        }

        let id = RuleId(self.rules.len());
        let supports = rule.ledger.supported_by.clone();
        self.rule_index.insert(key, id);
        self.rules.push(Some(rule));
        for support in supports {
            self.register_support(support, EntityId::Rule(id));
        }

        let facts: Vec<FactId> = self.fact_index.values().copied().collect();
        let engine = self.engine;
        for fact in facts {
            engine.fc_infer(fact, id, self);
        }
        id
    }

    /// Fold an incoming copy of a stored entity into it. A bare copy marks the
    /// stored entity asserted; otherwise each derivation is appended, unless a
    /// premise already depends on the entity, in which case it is held back.
    fn merge(&mut self, id: EntityId, incoming: Ledger) {
        if incoming.supported_by.is_empty() {
            if let Some(ledger) = self.ledger_mut(id) {
                ledger.asserted = true;
            }
            return;
        }

        for support in incoming.supported_by {
            if self.closes_cycle(support, id) {
                if self.config.reports_inference() {
                    debug!("Holding back {support:?} for {id:?}");
                }
                if let Some(ledger) = self.ledger_mut(id) {
                    ledger.add_blocked(support);
                }
                continue;
            }
            if let Some(ledger) = self.ledger_mut(id) {
                ledger.add_support(support);
            }
            self.register_support(support, id);
        }
    }

    /// Record `derived` as a dependent of both premises of `support`
    fn register_support(&mut self, support: Support, derived: EntityId) {
        for premise in [EntityId::Fact(support.fact), EntityId::Rule(support.rule)] {
            if let Some(ledger) = self.ledger_mut(premise) {
                ledger.add_dependent(derived);
            }
        }
    }

    /// True if either premise of `support` is `target` or derived from it
    fn closes_cycle(&self, support: Support, target: EntityId) -> bool {
        self.depends_on(EntityId::Fact(support.fact), target)
            || self.depends_on(EntityId::Rule(support.rule), target)
    }

    fn depends_on(&self, from: EntityId, target: EntityId) -> bool {
        let mut stack = vec![from];
        let mut seen = IndexSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(ledger) = self.ledger(current) {
                for support in &ledger.supported_by {
                    stack.push(EntityId::Fact(support.fact));
                    stack.push(EntityId::Rule(support.rule));
                }
            }
        }
        false
    }

    /// Find every stored fact matching `query`.
    ///
    /// Asserted and derived facts are treated alike. No match is an empty
    /// result, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`KbError::InvalidQuery`] if `query` is a rule.
    pub fn ask(&self, query: impl Into<Entity>) -> Result<Vec<QueryResult>> {
        let query = query.into();
        let statement = match query.statement() {
            Some(statement) if is_fact_query(&query) => statement,
            _ => {
                warn!("Invalid ask: {query}");
                return Err(KbError::InvalidQuery(query.to_string()));
            }
        };
        if self.config.reports_inference() {
            debug!("Asking {statement}");
        }

        Ok(self
            .facts()
            .filter_map(|(id, fact)| {
                match_statements(statement, &fact.statement)
                    .map(|bindings| QueryResult { bindings, fact: id })
            })
            .collect())
    }

    /// Withdraw a directly asserted fact.
    ///
    /// The fact stays if another derivation still supports it. Otherwise it
    /// is deleted and the deletion cascades to whatever it alone justified.
    pub fn retract(&mut self, item: impl Into<Entity>) -> Retraction {
        let item = item.into();
        info!("Retracting {item}");
        let statement = match item.statement() {
            Some(statement) if is_fact_query(&item) => statement.clone(),
            _ => return Retraction::RuleIgnored,
        };
        let Some(id) = self.get_fact(&statement) else {
            debug!("Nothing to retract for {statement}");
            return Retraction::NotFound;
        };

        if let Some(stored) = self.facts.get_mut(id.0).and_then(Option::as_mut) {
            stored.ledger.asserted = false;
        }
        let (facts_before, rules_before) = (self.fact_count(), self.rule_count());
        self.remove(EntityId::Fact(id));

        if self.contains(&statement) {
            Retraction::StillSupported
        } else {
            Retraction::Removed {
                facts: facts_before.saturating_sub(self.fact_count()),
                rules: rules_before.saturating_sub(self.rule_count()),
            }
        }
    }

    /// Delete `start` if nothing justifies it any more, then re-check every
    /// entity it helped derive. Derivations held back from deleted entities
    /// are retried afterwards, since their premises no longer depend on them.
    fn remove(&mut self, start: EntityId) {
        let mut queue = VecDeque::from([start]);
        let mut held_back = Vec::new();

        while let Some(current) = queue.pop_front() {
            // already deleted earlier in this cascade
            let Some(ledger) = self.ledger(current) else {
                continue;
            };
            if ledger.is_justified() {
                continue;
            }

            let Some(removed) = self.take(current) else {
                continue;
            };
            if self.config.reports_cascade() {
                trace!("Removing {removed}");
            }
            let ledger = match removed {
                Entity::Fact(fact) => fact.ledger,
                Entity::Rule(rule) => rule.ledger,
            };
            held_back.extend(ledger.blocked.iter().copied());

            let dependents = ledger
                .supports_facts
                .iter()
                .map(|&id| EntityId::Fact(id))
                .chain(ledger.supports_rules.iter().map(|&id| EntityId::Rule(id)));
            for dependent in dependents {
                self.strip_support(dependent, current);
                queue.push_back(dependent);
            }
        }

        self.rederive(held_back);
    }

    fn rederive(&mut self, candidates: Vec<Support>) {
        let engine = self.engine;
        for support in candidates {
            if self.fact(support.fact).is_none() || self.rule(support.rule).is_none() {
                continue;
            }
            if self.config.reports_cascade() {
                trace!("Re-deriving from {support:?}");
            }
            engine.fc_infer(support.fact, support.rule, self);
        }
    }

    /// Drop every derivation of `dependent` that used `removed`, and detach
    /// `dependent` from partners no surviving derivation names.
    fn strip_support(&mut self, dependent: EntityId, removed: EntityId) {
        let Some(ledger) = self.ledger_mut(dependent) else {
            return;
        };
        let (stripped, kept): (Vec<Support>, Vec<Support>) = ledger
            .supported_by
            .iter()
            .partition(|support| support.mentions(removed));
        let orphaned: Vec<EntityId> = stripped
            .iter()
            .flat_map(|support| [EntityId::Fact(support.fact), EntityId::Rule(support.rule)])
            .filter(|&partner| {
                partner != removed && !kept.iter().any(|support| support.mentions(partner))
            })
            .collect();
        ledger.supported_by = kept;

        for partner in orphaned {
            if let Some(partner_ledger) = self.ledger_mut(partner) {
                partner_ledger.forget_dependent(dependent);
            }
        }
    }

    /// Remove an entity from its arena slot and content index
    fn take(&mut self, id: EntityId) -> Option<Entity> {
        match id {
            EntityId::Fact(fact_id) => {
                let fact = self.facts.get_mut(fact_id.0)?.take()?;
                let indexed = self.fact_index.shift_remove(&fact.statement);
                debug_assert_eq!(indexed, Some(fact_id), "fact index out of sync");
                Some(Entity::Fact(fact))
            }
            EntityId::Rule(rule_id) => {
                let rule = self.rules.get_mut(rule_id.0)?.take()?;
                let indexed = self.rule_index.shift_remove(&RuleKey::of(&rule));
                debug_assert_eq!(indexed, Some(rule_id), "rule index out of sync");
                Some(Entity::Rule(rule))
            }
        }
    }

    /// Id of the stored fact equal to `statement`
    #[must_use]
    pub fn get_fact(&self, statement: &Statement) -> Option<FactId> {
        self.fact_index.get(statement).copied()
    }

    /// Id of the stored rule with exactly these conditions and conclusion
    #[must_use]
    pub fn get_rule(&self, lhs: &[Statement], rhs: &Statement) -> Option<RuleId> {
        let key = RuleKey {
            lhs: lhs.to_vec(),
            rhs: rhs.clone(),
        };
        self.rule_index.get(&key).copied()
    }

    /// Returns true if a fact equal to `statement` is stored
    #[must_use]
    pub fn contains(&self, statement: &Statement) -> bool {
        self.fact_index.contains_key(statement)
    }

    /// The stored fact behind `id`, if it has not been removed
    #[must_use]
    pub fn fact(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(id.0).and_then(Option::as_ref)
    }

    /// The stored rule behind `id`, if it has not been removed
    #[must_use]
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.0).and_then(Option::as_ref)
    }

    /// Support bookkeeping of a stored entity
    #[must_use]
    pub fn ledger(&self, id: EntityId) -> Option<&Ledger> {
        match id {
            EntityId::Fact(id) => self.fact(id).map(Fact::ledger),
            EntityId::Rule(id) => self.rule(id).map(Rule::ledger),
        }
    }

    fn ledger_mut(&mut self, id: EntityId) -> Option<&mut Ledger> {
        match id {
            EntityId::Fact(id) => self
                .facts
                .get_mut(id.0)
                .and_then(Option::as_mut)
                .map(|fact| &mut fact.ledger),
            EntityId::Rule(id) => self
                .rules
                .get_mut(id.0)
                .and_then(Option::as_mut)
                .map(|rule| &mut rule.ledger),
        }
    }

    /// Stored facts in insertion order
    pub fn facts(&self) -> impl Iterator<Item = (FactId, &Fact)> {
        self.fact_index
            .values()
            .filter_map(move |&id| self.fact(id).map(|fact| (id, fact)))
    }

    /// Stored rules in insertion order
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rule_index
            .values()
            .filter_map(move |&id| self.rule(id).map(|rule| (id, rule)))
    }

    /// Number of stored facts
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.fact_index.len()
    }

    /// Number of stored rules
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rule_index.len()
    }

    /// Returns true if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fact_index.is_empty() && self.rule_index.is_empty()
    }

    /// Check the support ledger for consistency.
    ///
    /// Every stored entity must be asserted or supported, every derivation
    /// must name stored entities, the `supports_*` lists must be exactly
    /// the inverse of the `supported_by` entries, and no entity may appear in
    /// its own derivation chain.
    ///
    /// # Errors
    ///
    /// Returns [`KbError::Invariant`] describing the first inconsistency found.
    pub fn verify(&self) -> Result<()> {
        let live = self.facts().count() + self.rules().count();
        if live != self.facts.iter().flatten().count() + self.rules.iter().flatten().count() {
            return Err(KbError::Invariant(
                "arena and content index disagree".to_string(),
            ));
        }

        for id in self.entity_ids() {
            let ledger = self
                .ledger(id)
                .ok_or_else(|| KbError::Invariant(format!("{id:?} is indexed but missing")))?;
            if !ledger.is_justified() {
                return Err(KbError::Invariant(format!(
                    "{id:?} is neither asserted nor supported"
                )));
            }

            for support in &ledger.supported_by {
                for premise in [EntityId::Fact(support.fact), EntityId::Rule(support.rule)] {
                    let lists_dependent = self
                        .ledger(premise)
                        .is_some_and(|premise_ledger| supports(premise_ledger, id));
                    if !lists_dependent {
                        return Err(KbError::Invariant(format!(
                            "{id:?} is supported by {premise:?} which does not list it"
                        )));
                    }
                }
            }

            let dependents = ledger
                .supports_facts
                .iter()
                .map(|&dep| EntityId::Fact(dep))
                .chain(ledger.supports_rules.iter().map(|&dep| EntityId::Rule(dep)));
            for dependent in dependents {
                let named = self.ledger(dependent).is_some_and(|dependent_ledger| {
                    dependent_ledger
                        .supported_by
                        .iter()
                        .any(|support| support.mentions(id))
                });
                if !named {
                    return Err(KbError::Invariant(format!(
                        "{id:?} lists {dependent:?} which it does not support"
                    )));
                }
            }
        }

        if let Some(id) = self.find_support_cycle() {
            return Err(KbError::Invariant(format!(
                "{id:?} is part of a support cycle"
            )));
        }
        Ok(())
    }

    fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.facts()
            .map(|(id, _)| EntityId::Fact(id))
            .chain(self.rules().map(|(id, _)| EntityId::Rule(id)))
    }

    fn find_support_cycle(&self) -> Option<EntityId> {
        let mut on_path = IndexSet::new();
        let mut done = IndexSet::new();
        self.entity_ids()
            .find(|&id| self.reaches_itself(id, &mut on_path, &mut done))
    }

    fn reaches_itself(
        &self,
        id: EntityId,
        on_path: &mut IndexSet<EntityId>,
        done: &mut IndexSet<EntityId>,
    ) -> bool {
        if done.contains(&id) {
            return false;
        }
        if !on_path.insert(id) {
            return true;
        }
        let cyclic = self.ledger(id).is_some_and(|ledger| {
            ledger.supported_by.iter().any(|support| {
                self.reaches_itself(EntityId::Fact(support.fact), on_path, done)
                    || self.reaches_itself(EntityId::Rule(support.rule), on_path, done)
            })
        });
        on_path.swap_remove(&id);
        done.insert(id);
        cyclic
    }
}

fn supports(ledger: &Ledger, dependent: EntityId) -> bool {
    match dependent {
        EntityId::Fact(id) => ledger.supports_facts.contains(&id),
        EntityId::Rule(id) => ledger.supports_rules.contains(&id),
    }
}

impl fmt::Display for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Knowledge Base:")?;
        for (_, fact) in self.facts() {
            writeln!(f, "{fact}")?;
        }
        for (_, rule) in self.rules() {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}
