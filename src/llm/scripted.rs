//! Deterministic in-process model service.
//!
//! Each model id owns a queue of scripted steps; every session created for
//! that model pops from the same queue. Everything sent is recorded so tests
//! can inspect exactly what reached the model.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::{B3Error, Part, Result, Turn};
use crate::llm::traits::{GenerationConfig, ModelClient, ModelSession};

/// One scripted reaction to a send
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Reply with this turn
    Reply(Turn),
    /// Fail the send with a model error
    Fail(String),
    /// Never answer (for cancellation tests)
    Hang,
}

impl From<Turn> for ScriptStep {
    fn from(turn: Turn) -> Self {
        ScriptStep::Reply(turn)
    }
}

#[derive(Default)]
struct ScriptState {
    scripts: HashMap<String, VecDeque<ScriptStep>>,
    sent: HashMap<String, Vec<Vec<Part>>>,
    configs: HashMap<String, Vec<GenerationConfig>>,
    rollbacks: HashMap<String, Vec<usize>>,
}

/// Scripted stand-in for a real model client
#[derive(Clone, Default)]
pub struct ScriptedClient {
    state: Arc<Mutex<ScriptState>>,
    fail_create: Arc<Mutex<Option<String>>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue steps for sessions of `model`
    pub fn script<I, S>(self, model: &str, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ScriptStep>,
    {
        {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            state
                .scripts
                .entry(model.to_string())
                .or_default()
                .extend(steps.into_iter().map(Into::into));
        }
        self
    }

    /// Make every `create_session` fail
    pub fn failing_create(self, message: impl Into<String>) -> Self {
        *self.fail_create.lock().unwrap_or_else(|p| p.into_inner()) = Some(message.into());
        self
    }

    /// Every batch of parts sent to sessions of `model`, in order
    pub fn sent(&self, model: &str) -> Vec<Vec<Part>> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.sent.get(model).cloned().unwrap_or_default()
    }

    /// Configurations used to create sessions of `model`
    pub fn configs(&self, model: &str) -> Vec<GenerationConfig> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.configs.get(model).cloned().unwrap_or_default()
    }

    /// Exchanges dropped by each rollback of a `model` session
    pub fn rollbacks(&self, model: &str) -> Vec<usize> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.rollbacks.get(model).cloned().unwrap_or_default()
    }

    /// Steps not consumed yet for `model`
    pub fn remaining(&self, model: &str) -> usize {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.scripts.get(model).map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn create_session(
        &self,
        model: &str,
        config: GenerationConfig,
    ) -> Result<Box<dyn ModelSession>> {
        if let Some(msg) = self.fail_create.lock().unwrap_or_else(|p| p.into_inner()).clone() {
            return Err(B3Error::model(msg));
        }
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .configs
            .entry(model.to_string())
            .or_default()
            .push(config);

        Ok(Box::new(ScriptedSession {
            model: model.to_string(),
            state: Arc::clone(&self.state),
            exchanges: 0,
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Session popping replies from its model's queue
pub struct ScriptedSession {
    model: String,
    state: Arc<Mutex<ScriptState>>,
    /// Successful sends, standing in for the history length
    exchanges: usize,
}

#[async_trait]
impl ModelSession for ScriptedSession {
    async fn send(&mut self, parts: Vec<Part>) -> Result<Turn> {
        let step = {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            state.sent.entry(self.model.clone()).or_default().push(parts);
            state
                .scripts
                .get_mut(&self.model)
                .and_then(|queue| queue.pop_front())
        };

        match step {
            Some(ScriptStep::Reply(turn)) => {
                self.exchanges += 1;
                Ok(turn)
            }
            Some(ScriptStep::Fail(msg)) => Err(B3Error::model(msg)),
            Some(ScriptStep::Hang) => std::future::pending().await,
            None => Err(B3Error::model(format!(
                "script for model '{}' is exhausted",
                self.model
            ))),
        }
    }

    fn checkpoint(&self) -> usize {
        self.exchanges
    }

    fn rollback(&mut self, checkpoint: usize) {
        if checkpoint < self.exchanges {
            self.state
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .rollbacks
                .entry(self.model.clone())
                .or_default()
                .push(self.exchanges - checkpoint);
            self.exchanges = checkpoint;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_session_replays_in_order() {
        let client = ScriptedClient::new().script(
            "m",
            vec![
                ScriptStep::Reply(Turn::text("one")),
                ScriptStep::Fail("quota".into()),
            ],
        );
        let mut session = client
            .create_session("m", GenerationConfig::default())
            .await
            .unwrap();

        let turn = session.send(vec![Part::text("hi")]).await.unwrap();
        assert_eq!(turn.into_content().text(), "one");
        assert!(session.send(vec![Part::text("again")]).await.is_err());
        assert!(session.send(vec![Part::text("more")]).await.is_err());

        assert_eq!(client.sent("m").len(), 3);
        assert_eq!(client.remaining("m"), 0);
    }

    #[tokio::test]
    async fn test_failing_create() {
        let client = ScriptedClient::new().failing_create("no network");
        assert!(client
            .create_session("m", GenerationConfig::default())
            .await
            .is_err());
    }
}
