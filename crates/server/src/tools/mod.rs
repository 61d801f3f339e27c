//! MCP tool implementations.
//!
//! This module contains all tools exposed by the linkmeta server.

pub mod heartbeat;
pub mod metadata;
pub mod recommendations;

pub use heartbeat::HeartbeatOutput;
pub use metadata::{MetadataOutput, MetadataParams};
pub use recommendations::RecommendationsOutput;
