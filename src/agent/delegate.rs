//! Delegation support
//!
//! Wraps an [`Agent`] so a parent agent can call it like any other capability:
//! the parent model asks a question, the delegate answers with its own session.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;

use crate::agent::context::CallContext;
use crate::agent::logger::{ConversationLogger, NullLogger};
use crate::agent::orchestrator::Agent;
use crate::core::{Arguments, CapabilityDeclaration, Part, Payload, Result};
use crate::llm::ModelClient;
use crate::tools::capability::string_arg;
use crate::tools::Capability;

/// An agent exposed as a capability named after it
pub struct DelegatedAgent {
    name: String,
    description: String,
    agent: Arc<Mutex<Agent>>,
    logger: Arc<dyn ConversationLogger>,
}

impl DelegatedAgent {
    pub fn new(agent: Agent) -> Self {
        let name = agent.name().to_string();
        let description = agent.description().to_string();
        Self::shared(name, description, Arc::new(Mutex::new(agent)))
    }

    /// Wrap an agent that is also reachable from elsewhere.
    ///
    /// `name` must be the agent's own name: the chain check in `start` and
    /// `call` relies on it while the agent itself may be locked.
    pub fn shared(
        name: impl Into<String>,
        description: impl Into<String>,
        agent: Arc<Mutex<Agent>>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agent,
            logger: Arc::new(NullLogger),
        }
    }

    /// Handle on the wrapped agent
    pub fn agent(&self) -> Arc<Mutex<Agent>> {
        Arc::clone(&self.agent)
    }
}

#[async_trait]
impl Capability for DelegatedAgent {
    fn declare(&self) -> CapabilityDeclaration {
        CapabilityDeclaration::new(&self.name, &self.description)
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": format!("Question for {}.", self.name)
                    }
                },
                "required": ["question"]
            }))
            .with_response(json!({
                "type": "string",
                "description": format!("{}'s response.", self.name)
            }))
    }

    async fn start(
        &mut self,
        ctx: &CallContext,
        client: Arc<dyn ModelClient>,
        logger: Arc<dyn ConversationLogger>,
    ) -> Result<()> {
        self.logger = Arc::clone(&logger);
        if ctx.is_active(&self.name) {
            debug!(agent = %self.name, "delegate is already starting up the chain");
            return Ok(());
        }
        let mut agent = self.agent.lock().await;
        agent.start(ctx, client, logger).await
    }

    async fn call(&self, ctx: &CallContext, args: &Arguments) -> Payload {
        let question = match string_arg(args, "question") {
            Ok(q) => q,
            Err(e) => return Payload::error(e),
        };

        // Locking an agent that is already answering up the chain would never return.
        if ctx.is_active(&self.name) {
            return Payload::error(format!(
                "{} cannot be asked while it is answering ({})",
                self.name,
                ctx.chain().join(" -> ")
            ));
        }

        self.logger.log_question(&self.name, question);

        let mut agent = self.agent.lock().await;
        match agent.ask(ctx, vec![Part::text(question)]).await {
            Ok(content) => {
                let answer = content.text();
                if answer.is_empty() {
                    return Payload::error(format!("{} returned no text output", self.name));
                }
                self.logger.log_response(&self.name, &answer);
                Payload::output(answer)
            }
            Err(e) => Payload::error(format!("asking {} failed: {}", self.name, e)),
        }
    }
}
