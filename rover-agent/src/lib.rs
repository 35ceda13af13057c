//! Online actor-critic TD(λ) agent for the rover controller.
//!
//! The crate turns raw experience (state, action, reward, next state) into
//! the scalar correction signal and per-action training labels fed to the
//! [`rover_core::Network`] computation graph: a running average reward and a
//! bootstrapped residual-advantage target drive the critic, while each
//! discrete action head receives a probability-error update with a
//! self-normalizing step size.
pub mod error;

mod actor;
mod batch;
mod feedback;
mod scale;
mod td;

pub use actor::{Actor, ActorConfig, ActorUpdate, PREF_RMS_FLOOR};
pub use batch::BatchTrainer;
pub use feedback::{Feedback, Signals};
pub use scale::Scale;
pub use td::{TdAgent, TdAgentConfig, CRITIC_OUTPUT};
