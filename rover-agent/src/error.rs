//! Errors in the library.
use thiserror::Error;

/// Errors raised while building or running an agent.
#[derive(Error, Debug)]
pub enum AgentError {
    /// An invalid value range.
    #[error("{what}: invalid range [{min}, {max}]")]
    InvalidRange {
        /// What the range applies to.
        what: String,
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },

    /// An out-of-range hyperparameter.
    #[error("{name} must be {requirement} ({value})")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Offending value.
        value: f32,
        /// Constraint description.
        requirement: String,
    },

    /// Two action heads share the same name.
    #[error("duplicate action head \"{0}\"")]
    DuplicateHead(String),

    /// The agent was configured without action heads.
    #[error("at least one action head is required")]
    NoActors,

    /// The policy network does not produce an output for an action head.
    #[error("policy network has no output \"{0}\"")]
    MissingOutput(String),

    /// A feedback event carries no action for a head.
    #[error("feedback has no action for \"{0}\"")]
    MissingAction(String),

    /// A feedback event carries an out-of-range action value.
    #[error("action {action} of \"{head}\" out of range (0..{num_values})")]
    InvalidAction {
        /// Head name.
        head: String,
        /// Offending action value.
        action: usize,
        /// Number of discrete values of the head.
        num_values: usize,
    },
}
