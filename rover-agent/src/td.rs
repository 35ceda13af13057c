//! Online temporal-difference actor-critic agent.
mod base;
mod config;

pub use base::{TdAgent, CRITIC_OUTPUT};
pub use config::TdAgentConfig;
