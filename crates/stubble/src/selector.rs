//! Response selection over the stored rule set.
//!
//! The selector scores every stored rule against a request and picks the
//! highest scorer. A rule must score strictly above zero to beat the
//! built-in no-match rule, and on equal scores the rule listed first wins.

use crate::rule::{MatchRequest, Rule, RuleDefinition, RuleError};
use crate::store::RuleStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Ceiling on a single storage call.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised by selection and registration.
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    #[error("error parsing rule")]
    MalformedRule(#[source] serde_json::Error),
    #[error("error initialising rule")]
    InvalidPattern(#[from] RuleError),
    #[error("storage unavailable: {reason}")]
    StorageUnavailable { reason: String },
}

impl SelectorError {
    /// Whether the error was caused by the submitted rule rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SelectorError::MalformedRule(_) | SelectorError::InvalidPattern(_)
        )
    }
}

/// Picks responses for requests and registers new rules.
pub struct Selector {
    store: Arc<dyn RuleStore>,
    storage_timeout: Duration,
}

impl Selector {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self {
            store,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn RuleStore> {
        &self.store
    }

    /// Select the best matching rule for a request.
    ///
    /// Returns the no-match rule when no rule scores above zero. A storage
    /// failure is an error, never a no-match.
    pub async fn select_response(&self, request: &MatchRequest) -> Result<Rule, SelectorError> {
        let rules = self.bounded(self.store.list_rules()).await?;
        let (best, score) = pick_best(&rules, request);
        debug!(
            method = request.method(),
            path = request.path(),
            candidates = rules.len(),
            score,
            "Selected rule"
        );
        Ok(best.unwrap_or(Rule::no_match()).clone())
    }

    /// Parse, initialize and store a rule from its JSON representation.
    ///
    /// Unknown fields are ignored. An existing rule with equal match
    /// criteria is replaced.
    pub async fn register_rule(&self, raw: &[u8]) -> Result<Rule, SelectorError> {
        let definition: RuleDefinition =
            serde_json::from_slice(raw).map_err(SelectorError::MalformedRule)?;
        self.register(definition).await
    }

    /// Initialize and store an already decoded rule definition.
    pub async fn register(&self, definition: RuleDefinition) -> Result<Rule, SelectorError> {
        let rule = Rule::new(definition)?;
        self.bounded(self.store.save_rule(rule.clone())).await?;
        info!(name = rule.name(), "Registered rule");
        Ok(rule)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, SelectorError> {
        match tokio::time::timeout(self.storage_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!("Rule storage call failed: {:#}", e);
                Err(SelectorError::StorageUnavailable {
                    reason: format!("{e:#}"),
                })
            }
            Err(_) => {
                error!(
                    "Rule storage call timed out after {:?}",
                    self.storage_timeout
                );
                Err(SelectorError::StorageUnavailable {
                    reason: format!("timed out after {:?}", self.storage_timeout),
                })
            }
        }
    }
}

/// Pick the first rule with the highest score above zero.
///
/// Returns `None` (and score 0) when every rule scores zero or less.
pub fn pick_best<'a>(rules: &'a [Rule], request: &MatchRequest) -> (Option<&'a Rule>, i64) {
    let mut best = None;
    let mut best_score = 0;
    for rule in rules {
        let score = rule.score(request);
        if score > best_score {
            best = Some(rule);
            best_score = score;
        }
    }
    (best, best_score)
}
