//! Tools module - capabilities the model can call
//!
//! Contains the capability contract, the registry, and the document tools.

pub mod capability;
pub mod documents;
pub mod registry;

pub use capability::Capability;
pub use registry::CapabilityRegistry;
