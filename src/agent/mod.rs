//! Agent module - orchestration and delegation
//!
//! Contains the call loop that resolves model call requests, the adapter that
//! exposes an agent as a capability, and the logging hook.

pub mod context;
pub mod delegate;
pub mod logger;
pub mod orchestrator;
pub mod presets;

pub use context::{CallBudget, CallContext};
pub use delegate::DelegatedAgent;
pub use logger::{ConversationLogger, LogEntry, LogKind, MemoryLogger, NullLogger, TracingLogger};
pub use orchestrator::{Agent, AgentBuilder, TextSink};
