//! B3 - The Bureaucratic Barriers Buster
//!
//! A terminal assistant for personal documents, built on an agentic call
//! engine: a model session asks for capabilities, the engine runs them and
//! feeds the results back until the model answers with text.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Model session abstraction with Gemini and scripted implementations
//! - **Tools**: Capability contract, registry and document tools
//! - **Agent**: Call loop, delegation, logging hook and ready-made agents
//! - **Store**: Document store with a local directory implementation
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use b3::agent::{presets, CallContext, TracingLogger};
//! use b3::core::Part;
//! use b3::store::LocalStore;
//! use b3::{Config, GeminiClient};
//!
//! #[tokio::main]
//! async fn main() -> b3::Result<()> {
//!     let config = Config::load();
//!     let store = Arc::new(LocalStore::from_config(&config.store));
//!     let client = Arc::new(GeminiClient::from_config(&config)?);
//!
//!     let mut agent = presets::b3_agent(&config, store)?;
//!     let ctx = CallContext::new().with_budget(config.agent.max_calls);
//!     agent.start(&ctx, client, Arc::new(TracingLogger)).await?;
//!
//!     let answer = agent.ask(&ctx, vec![Part::text("list my files")]).await?;
//!     println!("{}", answer.text());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod store;
pub mod tools;

// Re-export commonly used items
pub use agent::{Agent, CallContext, DelegatedAgent};
pub use cli::Repl;
pub use core::{B3Error, Config, DispatchMode, Result};
pub use llm::{GeminiClient, ScriptedClient};
pub use tools::Capability;
