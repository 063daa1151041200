//! Model service abstraction
//!
//! A [`ModelClient`] opens stateful [`ModelSession`]s. The session carries the
//! conversation history; callers only ever append parts to it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{CapabilityDeclaration, Part, Result, Turn};

/// Built-in facilities the model service can enable for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facility {
    /// Grounding with web search results
    GoogleSearch,
}

/// Generation configuration of a session
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    /// System instruction shaping the model's role
    pub system_instruction: Option<String>,
    /// Built-in facilities enabled for the session
    pub facilities: Vec<Facility>,
    /// Capability schemas, filled in from the registry before the session is created
    pub declarations: Vec<CapabilityDeclaration>,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
}

impl GenerationConfig {
    /// Configuration with only a system instruction
    pub fn with_instruction(instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: Some(instruction.into()),
            ..Default::default()
        }
    }

    /// Enable a built-in facility
    pub fn facility(mut self, facility: Facility) -> Self {
        if !self.facilities.contains(&facility) {
            self.facilities.push(facility);
        }
        self
    }
}

/// An ongoing exchange with the model service.
///
/// Not safe for concurrent use: every send extends an ordered history.
#[async_trait]
pub trait ModelSession: Send + Sync {
    /// Append parts to the session and return the model's next turn
    async fn send(&mut self, parts: Vec<Part>) -> Result<Turn>;

    /// Position in the history, to return to with [`ModelSession::rollback`]
    fn checkpoint(&self) -> usize;

    /// Forget every exchange recorded after `checkpoint`
    fn rollback(&mut self, checkpoint: usize);
}

/// Factory for model sessions, shared by every agent and capability
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Establish a new session
    async fn create_session(
        &self,
        model: &str,
        config: GenerationConfig,
    ) -> Result<Box<dyn ModelSession>>;

    /// Get the provider name
    fn name(&self) -> &str;
}
