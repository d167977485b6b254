// Library exports for the binary, integration tests and benchmarks

// ===== Matching engine =====
pub mod rule;
pub mod selector;
pub mod store;

// ===== Server glue =====
pub mod capture;
pub mod config;
pub mod loader;
pub mod metrics;
pub mod server;

pub use rule::{MatchRequest, Rule, RuleDefinition};
pub use selector::{Selector, SelectorError};
pub use store::{InMemoryRuleStore, RuleStore};
