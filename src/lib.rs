//! legal-agent: streaming legal-assistant chat proxy.
//!
//! Relays a hosted model's token stream to the client while intercepting
//! in-band tool calls, running them against legal-analysis prompts or the
//! to-do list, and keeping their results out of the client's view.

pub mod agent;
pub mod config;
pub mod inference;
pub mod server;
pub mod state;
pub mod stream;
pub mod tools;
pub mod types;
