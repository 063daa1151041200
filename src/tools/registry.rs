//! Capability registry - starts capabilities and routes calls by name
//!
//! Built once per agent when it starts. Keeps the declarations in the order the
//! capabilities were declared so the model sees a stable tool list.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::agent::{CallContext, ConversationLogger};
use crate::core::{CapabilityDeclaration, Result};
use crate::llm::ModelClient;
use crate::tools::Capability;

/// Started capabilities of one agent, indexed by name
#[derive(Default)]
pub struct CapabilityRegistry {
    /// Capabilities indexed by declared name
    entries: HashMap<String, Box<dyn Capability>>,
    /// Declarations in registration order
    declarations: Vec<CapabilityDeclaration>,
}

impl CapabilityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Start every capability in order and index it by its declared name.
    ///
    /// The first start failure aborts the build. When two capabilities declare
    /// the same name the later one replaces the earlier one.
    pub async fn build(
        capabilities: Vec<Box<dyn Capability>>,
        ctx: &CallContext,
        client: Arc<dyn ModelClient>,
        logger: Arc<dyn ConversationLogger>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for mut capability in capabilities {
            capability
                .start(ctx, Arc::clone(&client), Arc::clone(&logger))
                .await?;
            registry.register(capability);
        }
        Ok(registry)
    }

    /// Register an already started capability
    pub fn register(&mut self, capability: Box<dyn Capability>) {
        let declaration = capability.declare();
        let name = declaration.name.clone();

        if self.entries.contains_key(&name) {
            warn!(capability = %name, "capability declared twice, the later one wins");
            self.declarations.retain(|d| d.name != name);
        } else {
            debug!(capability = %name, "registered capability");
        }

        self.declarations.push(declaration);
        self.entries.insert(name, capability);
    }

    /// Look up a capability by name
    pub fn get(&self, name: &str) -> Option<&dyn Capability> {
        self.entries.get(name).map(|c| c.as_ref())
    }

    /// Declarations to hand to the model
    pub fn declarations(&self) -> &[CapabilityDeclaration] {
        &self.declarations
    }

    /// Registered names, in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.declarations.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
