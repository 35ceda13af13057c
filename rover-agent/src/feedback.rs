//! Experience records consumed by the training protocol.
use rover_core::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Named state tensors as produced by the upstream state encoder.
pub type Signals = HashMap<String, Tensor>;

/// One transition of experience.
///
/// Transient: consumed by a single training step and discarded. The offline
/// trainer keeps a recorded sequence of these and replays it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Feedback {
    /// State the actions were chosen in.
    pub state0: Signals,

    /// Chosen discrete action value per head.
    pub actions: HashMap<String, usize>,

    /// Reward received for the transition.
    pub reward: f32,

    /// Resulting state.
    pub state1: Signals,

    /// True if `state1` ended the episode.
    pub terminal: bool,
}
