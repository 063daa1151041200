//! LLM module - model service integrations
//!
//! Provides the session abstraction with Gemini as the real backend and a
//! scripted backend for tests.

pub mod gemini;
pub mod scripted;
pub mod traits;

pub use gemini::GeminiClient;
pub use scripted::{ScriptStep, ScriptedClient};
pub use traits::{Facility, GenerationConfig, ModelClient, ModelSession};
