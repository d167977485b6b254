use super::RuleStore;
use crate::rule::Rule;
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

/// In-memory implementation of RuleStore
///
/// Rules live in a vector behind a single mutex, which serializes listing,
/// appending and replacing.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: Mutex<Vec<Rule>>,
}

impl InMemoryRuleStore {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: Mutex::new(rules),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.lock().is_empty()
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn list_rules(&self) -> Result<Vec<Rule>> {
        Ok(self.rules.lock().clone())
    }

    async fn save_rule(&self, rule: Rule) -> Result<()> {
        let mut rules = self.rules.lock();
        match rules.iter_mut().find(|existing| existing.equal_match(&rule)) {
            Some(existing) => {
                debug!(name = rule.name(), "Replacing rule with equal match criteria");
                *existing = rule;
            }
            None => {
                debug!(name = rule.name(), "Appending rule");
                rules.push(rule);
            }
        }
        Ok(())
    }
}
