//! MCP tool parameter types and request handlers.
//!
//! Parameter structs derive `Deserialize + JsonSchema` for MCP tool registration;
//! handlers take the store by reference and return a [`ToolReply`].

pub mod handlers;
pub mod helpers;
pub mod params;

pub use handlers::ToolReply;
pub use params::*;
