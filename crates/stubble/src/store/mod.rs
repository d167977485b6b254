//! Rule storage backends.
//!
//! The selector only needs two operations from storage: list every rule and
//! save (upsert) one rule. Backends provide their own synchronization so both
//! operations are atomic from the caller's point of view.

mod inmemory;

pub use inmemory::InMemoryRuleStore;

use crate::rule::Rule;
use anyhow::Result;
use async_trait::async_trait;

/// Backend-agnostic rule storage.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Return a snapshot of all rules in encounter order.
    ///
    /// The returned vector is detached from the store: later writes do not
    /// show up in it and changing it does not touch the store.
    async fn list_rules(&self) -> Result<Vec<Rule>>;

    /// Replace the first rule with equal match criteria, or append.
    async fn save_rule(&self, rule: Rule) -> Result<()>;
}
