//! Per-question call context
//!
//! Threaded from the top-level question through every send, dispatch and
//! delegation: the cancellation token, the shared call budget and the chain of
//! agents currently at work.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::{B3Error, Result};

/// Number of capability calls allowed for one top-level question.
///
/// Clones share the same counter, so delegates spend from their parent's budget.
#[derive(Debug, Clone)]
pub struct CallBudget {
    limit: usize,
    used: Arc<AtomicUsize>,
}

impl CallBudget {
    /// A budget of `limit` calls; 0 means unlimited
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            used: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Record one call, failing once the limit is passed
    pub fn charge(&self) -> Result<usize> {
        let used = self.used.fetch_add(1, Ordering::SeqCst) + 1;
        if self.limit > 0 && used > self.limit {
            return Err(B3Error::BudgetExceeded { limit: self.limit });
        }
        Ok(used)
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Calls left, `None` when unlimited
    pub fn remaining(&self) -> Option<usize> {
        if self.limit == 0 {
            None
        } else {
            Some(self.limit.saturating_sub(self.used()))
        }
    }
}

impl Default for CallBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Context handed to every engine and capability operation
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    budget: CallBudget,
    chain: Vec<String>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an externally owned cancellation token
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Limit the number of capability calls (0 = unlimited)
    pub fn with_budget(mut self, limit: usize) -> Self {
        self.budget = CallBudget::new(limit);
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the question is cancelled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn budget(&self) -> &CallBudget {
        &self.budget
    }

    /// Agents currently starting or answering, outermost first
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    /// Whether `agent` is already starting or answering up the chain
    pub fn is_active(&self, agent: &str) -> bool {
        self.chain.iter().any(|name| name == agent)
    }

    /// Context for `agent` answering inside this one
    pub fn enter(&self, agent: &str) -> Self {
        let mut next = self.clone();
        next.chain.push(agent.to_string());
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_limit() {
        let budget = CallBudget::new(2);
        assert_eq!(budget.charge().unwrap(), 1);
        assert_eq!(budget.remaining(), Some(1));
        assert_eq!(budget.charge().unwrap(), 2);
        assert!(matches!(
            budget.charge(),
            Err(B3Error::BudgetExceeded { limit: 2 })
        ));
    }

    #[test]
    fn test_unlimited_budget() {
        let budget = CallBudget::unlimited();
        for _ in 0..100 {
            budget.charge().unwrap();
        }
        assert_eq!(budget.used(), 100);
        assert_eq!(budget.remaining(), None);
    }

    #[test]
    fn test_budget_is_shared_by_entered_contexts() {
        let ctx = CallContext::new().with_budget(5);
        let inner = ctx.enter("B3").enter("AdminExpert");
        inner.budget().charge().unwrap();
        assert_eq!(ctx.budget().used(), 1);
    }

    #[test]
    fn test_chain() {
        let ctx = CallContext::new();
        let inner = ctx.enter("B3").enter("AdminExpert");
        assert_eq!(inner.chain(), ["B3".to_string(), "AdminExpert".to_string()]);
        assert!(inner.is_active("B3"));
        assert!(!ctx.is_active("B3"));
    }

    #[test]
    fn test_cancel_is_shared() {
        let token = CancellationToken::new();
        let ctx = CallContext::new().with_cancel(token.clone()).enter("B3");
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
        tokio_test::block_on(ctx.cancelled());
    }
}
