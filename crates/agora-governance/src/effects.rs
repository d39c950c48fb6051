//! Proposal effect execution.
//!
//! Each proposal type maps to at most one registered handler, resolved at
//! engine construction. A handler is invoked exactly once, after the
//! proposal has passed; the engine does not inspect or retry failures.
//! Handlers must therefore be idempotent and independently retryable
//! (see DESIGN.md).

use std::collections::HashMap;
use crate::proposal::ProposalType;

/// External executor of a passed proposal's effect.
pub trait EffectHandler: Send + Sync {
    /// Apply the effect of a passed proposal.
    ///
    /// `metadata` is the opaque reference recorded at proposal creation;
    /// its interpretation belongs to the handler.
    fn apply(
        &self,
        proposal_id: u64,
        proposal_type: ProposalType,
        metadata: &str,
    ) -> anyhow::Result<()>;
}

/// Registry mapping proposal types to their effect handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<ProposalType, Box<dyn EffectHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a proposal type, replacing any previous one.
    pub fn register(&mut self, proposal_type: ProposalType, handler: Box<dyn EffectHandler>) {
        self.handlers.insert(proposal_type, handler);
    }

    /// Builder-style registration.
    pub fn with_handler(
        mut self,
        proposal_type: ProposalType,
        handler: Box<dyn EffectHandler>,
    ) -> Self {
        self.register(proposal_type, handler);
        self
    }

    /// Check if a handler is registered for a type.
    pub fn has_handler(&self, proposal_type: ProposalType) -> bool {
        self.handlers.contains_key(&proposal_type)
    }

    /// Apply the effect for a passed proposal.
    ///
    /// A type with no registered handler is a no-op success: the proposal
    /// carries no external effect in this deployment.
    pub fn apply(
        &self,
        proposal_id: u64,
        proposal_type: ProposalType,
        metadata: &str,
    ) -> anyhow::Result<()> {
        match self.handlers.get(&proposal_type) {
            Some(handler) => handler.apply(proposal_id, proposal_type, metadata),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    impl EffectHandler for Counting {
        fn apply(&self, _: u64, _: ProposalType, _: &str) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    impl EffectHandler for Failing {
        fn apply(&self, _: u64, _: ProposalType, _: &str) -> anyhow::Result<()> {
            anyhow::bail!("executor offline")
        }
    }

    #[test]
    fn test_registered_handler_invoked() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = HandlerRegistry::new()
            .with_handler(ProposalType::ParameterChange, Box::new(Counting(calls.clone())));

        assert!(registry.has_handler(ProposalType::ParameterChange));
        registry
            .apply(1, ProposalType::ParameterChange, "fee=5")
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregistered_type_is_noop() {
        let registry = HandlerRegistry::new();
        assert!(!registry.has_handler(ProposalType::Community));
        assert!(registry.apply(1, ProposalType::Community, "").is_ok());
    }

    #[test]
    fn test_handler_failure_surfaces() {
        let registry =
            HandlerRegistry::new().with_handler(ProposalType::Upgrade, Box::new(Failing));
        let err = registry.apply(1, ProposalType::Upgrade, "").unwrap_err();
        assert!(err.to_string().contains("executor offline"));
    }
}
