use crate::config::Config;
use crate::entity::{Fact, FactId, Rule, RuleId, Support};
use crate::kb::KnowledgeBase;
use crate::unify::{instantiate, match_statements};
use log::debug;

/// Forward-chaining step over one (fact, rule) pair.
///
/// Only the rule's first condition is ever matched. A rule with a single
/// condition yields a fact; a longer rule yields a more specific rule whose
/// remaining conditions wait for further facts.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceEngine {
    config: Config,
}

impl InferenceEngine {
    /// Create an engine reporting at the configured verbosity
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Try to combine a stored fact with a stored rule, adding whatever is
    /// derived to `kb`, which records the support links on both premises.
    pub fn fc_infer(self, fact_id: FactId, rule_id: RuleId, kb: &mut KnowledgeBase) {
        let (Some(fact), Some(rule)) = (kb.fact(fact_id), kb.rule(rule_id)) else {
            return;
        };
        if self.config.reports_inference() {
            debug!(
                "Attempting to infer from {} and {}",
                fact.statement(),
                rule
            );
        }

        let Some(first) = rule.lhs.first() else {
            return;
        };
        let Some(bindings) = match_statements(first, &fact.statement) else {
            return;
        };
        let support = Support {
            fact: fact_id,
            rule: rule_id,
        };

        if rule.lhs.len() == 1 {
            let conclusion = instantiate(&rule.rhs, &bindings);
            if self.config.reports_inference() && !conclusion.is_ground() {
                let open: Vec<&str> = conclusion.variables().collect();
                debug!("Deriving {conclusion} with unbound {open:?}");
            }
            kb.add_fact(Fact::derived(conclusion, support));
        } else {
            let lhs = rule.lhs[1..]
                .iter()
                .map(|condition| instantiate(condition, &bindings))
                .collect();
            let rhs = instantiate(&rule.rhs, &bindings);
            kb.add_rule(Rule::derived(lhs, rhs, support));
        }
    }
}
