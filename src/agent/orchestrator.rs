//! Agent orchestrator
//!
//! An [`Agent`] owns a model session and a set of capabilities. Each question
//! runs an iterative call loop: send, inspect the turn, dispatch the requested
//! capability, send its response back, until the model answers with text.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agent::context::CallContext;
use crate::agent::logger::{ConversationLogger, NullLogger};
use crate::core::{
    B3Error, CallRequest, CallResponse, CapabilityDeclaration, Content, DispatchMode, Part, Result,
    Turn,
};
use crate::llm::{Facility, GenerationConfig, ModelClient, ModelSession};
use crate::tools::{Capability, CapabilityRegistry};

/// Receiver for text the model emits alongside call requests
pub type TextSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Model-backed agent that resolves call requests until it has an answer
pub struct Agent {
    /// Unique name, used in logs and as the delegated capability name
    name: String,
    /// What the agent is good at, shown to a parent model
    description: String,
    /// Model id used for the session
    model: String,
    /// System instruction, facilities and (after start) declarations
    generation: GenerationConfig,
    /// Which call requests of a turn get resolved
    dispatch: DispatchMode,
    /// Capabilities declared but not started yet
    declared: Vec<Box<dyn Capability>>,
    /// Started capabilities
    registry: CapabilityRegistry,
    /// Model session, present once started
    session: Option<Box<dyn ModelSession>>,
    logger: Arc<dyn ConversationLogger>,
    text_sink: Option<TextSink>,
}

/// Builder for creating Agents
pub struct AgentBuilder {
    name: String,
    description: String,
    model: Option<String>,
    generation: GenerationConfig,
    dispatch: DispatchMode,
    declared: Vec<Box<dyn Capability>>,
    text_sink: Option<TextSink>,
}

impl AgentBuilder {
    /// Create a new builder with the given name and description
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            model: None,
            generation: GenerationConfig::default(),
            dispatch: DispatchMode::default(),
            declared: Vec::new(),
            text_sink: None,
        }
    }

    /// Set the model to use
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the system instruction
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.generation.system_instruction = Some(instruction.into());
        self
    }

    /// Enable a built-in model facility
    pub fn facility(mut self, facility: Facility) -> Self {
        self.generation = self.generation.facility(facility);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.generation.temperature = Some(temperature);
        self
    }

    pub fn dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Declare a capability
    pub fn capability(mut self, capability: impl Capability + 'static) -> Self {
        self.declared.push(Box::new(capability));
        self
    }

    /// Declare an already boxed capability
    pub fn boxed_capability(mut self, capability: Box<dyn Capability>) -> Self {
        self.declared.push(capability);
        self
    }

    /// Receive text fragments emitted alongside call requests
    pub fn text_sink(mut self, sink: TextSink) -> Self {
        self.text_sink = Some(sink);
        self
    }

    /// Build the Agent
    pub fn build(self) -> Result<Agent> {
        let model = self
            .model
            .ok_or_else(|| B3Error::config(format!("agent {} has no model", self.name)))?;

        Ok(Agent {
            name: self.name,
            description: self.description,
            model,
            generation: self.generation,
            dispatch: self.dispatch,
            declared: self.declared,
            registry: CapabilityRegistry::new(),
            session: None,
            logger: Arc::new(NullLogger),
            text_sink: self.text_sink,
        })
    }
}

impl Agent {
    /// Create a builder
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name, description)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.dispatch
    }

    pub fn set_dispatch_mode(&mut self, dispatch: DispatchMode) {
        self.dispatch = dispatch;
    }

    /// Receive text fragments emitted alongside call requests
    pub fn set_text_sink(&mut self, sink: TextSink) {
        self.text_sink = Some(sink);
    }

    pub fn is_started(&self) -> bool {
        self.session.is_some()
    }

    /// Declarations of the started capabilities
    pub fn declarations(&self) -> &[CapabilityDeclaration] {
        self.registry.declarations()
    }

    /// Declare one more capability; only valid before `start`
    pub fn declare(&mut self, capability: Box<dyn Capability>) -> Result<()> {
        if self.is_started() {
            return Err(B3Error::session(format!(
                "agent {} is already started, cannot declare more capabilities",
                self.name
            )));
        }
        self.declared.push(capability);
        Ok(())
    }

    /// Start every declared capability, then open the model session.
    ///
    /// Calling it again on a started agent does nothing.
    pub async fn start(
        &mut self,
        ctx: &CallContext,
        client: Arc<dyn ModelClient>,
        logger: Arc<dyn ConversationLogger>,
    ) -> Result<()> {
        if self.is_started() {
            debug!(agent = %self.name, "agent already started");
            return Ok(());
        }

        let ctx = ctx.enter(&self.name);
        let capabilities = std::mem::take(&mut self.declared);
        let registry = CapabilityRegistry::build(
            capabilities,
            &ctx,
            Arc::clone(&client),
            Arc::clone(&logger),
        )
        .await?;

        self.generation.declarations = registry.declarations().to_vec();

        let session = client
            .create_session(&self.model, self.generation.clone())
            .await?;

        info!(
            agent = %self.name,
            model = %self.model,
            capabilities = registry.len(),
            "agent started"
        );

        self.registry = registry;
        self.session = Some(session);
        self.logger = logger;
        Ok(())
    }

    /// Ask a question and run the call loop until the model answers with text.
    ///
    /// Returns the final turn's content, which is empty when the model produced
    /// nothing.
    pub async fn ask(&mut self, ctx: &CallContext, parts: Vec<Part>) -> Result<Content> {
        if ctx.is_active(&self.name) {
            return Err(B3Error::DelegationCycle(format!(
                "{} is already answering ({})",
                self.name,
                ctx.chain().join(" -> ")
            )));
        }

        let ctx = ctx.enter(&self.name);
        let checkpoint = self.session.as_ref().map(|s| s.checkpoint());
        match self.run(&ctx, parts).await {
            Ok(content) => Ok(content),
            Err(e) => {
                // Unanswered calls must not stay in the session history.
                if let (Some(session), Some(checkpoint)) = (self.session.as_mut(), checkpoint) {
                    session.rollback(checkpoint);
                }
                self.logger.log_response(&self.name, &format!("Error: {}", e));
                Err(e)
            }
        }
    }

    async fn run(&mut self, ctx: &CallContext, mut parts: Vec<Part>) -> Result<Content> {
        loop {
            let turn = self.send(ctx, parts).await?;

            if turn.is_terminal() {
                debug!(agent = %self.name, "text turn, question answered");
                return Ok(turn.into_content());
            }

            let requests = self.select_requests(turn);
            self.check_known(&requests)?;
            let mut responses = Vec::with_capacity(requests.len());
            for request in &requests {
                let response = self.dispatch(ctx, request).await?;
                responses.push(Part::Response(response));
            }
            parts = responses;
        }
    }

    async fn send(&mut self, ctx: &CallContext, parts: Vec<Part>) -> Result<Turn> {
        if ctx.is_cancelled() {
            return Err(B3Error::Cancelled);
        }

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| B3Error::session(format!("agent {} used before start", self.name)))?;

        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(B3Error::Cancelled),
            turn = session.send(parts) => turn,
        }
    }

    /// Forward the turn's text and keep the call requests this mode resolves
    fn select_requests(&self, turn: Turn) -> Vec<CallRequest> {
        let mut requests = Vec::new();
        for part in turn.parts {
            match part {
                Part::Text(text) => {
                    if let Some(ref sink) = self.text_sink {
                        if !text.is_empty() {
                            sink(&text);
                        }
                    }
                }
                Part::Call(request) => requests.push(request),
                Part::Blob(_) | Part::Response(_) => {}
            }
        }

        if self.dispatch == DispatchMode::First && requests.len() > 1 {
            let dropped: Vec<&str> = requests[1..].iter().map(|r| r.name.as_str()).collect();
            warn!(agent = %self.name, ?dropped, "turn carried several calls, only the first is resolved");
            requests.truncate(1);
        }
        requests
    }

    /// Fail on the first unregistered name before any request runs
    fn check_known(&self, requests: &[CallRequest]) -> Result<()> {
        match requests.iter().find(|r| self.registry.get(&r.name).is_none()) {
            Some(unknown) => Err(B3Error::UnknownCapability {
                agent: self.name.clone(),
                name: unknown.name.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn dispatch(&self, ctx: &CallContext, request: &CallRequest) -> Result<CallResponse> {
        let capability =
            self.registry
                .get(&request.name)
                .ok_or_else(|| B3Error::UnknownCapability {
                    agent: self.name.clone(),
                    name: request.name.clone(),
                })?;

        let used = ctx.budget().charge()?;
        debug!(agent = %self.name, capability = %request.name, used, "dispatching call");

        self.logger
            .log_response(&self.name, &format!("Calling {}", request.name));

        let payload = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(B3Error::Cancelled),
            payload = capability.call(ctx, &request.arguments) => payload,
        };

        if let Some(error) = payload.get_error() {
            debug!(agent = %self.name, capability = %request.name, error, "capability reported an error");
        }

        self.logger.log_question(
            &self.name,
            &format!("Processing {}'s response", request.name),
        );

        Ok(CallResponse::reply_to(request, payload))
    }
}
