//! Configuration of [`TdAgent`](super::TdAgent).
use crate::{actor::ActorConfig, scale::Scale};
use anyhow::Result;
use rover_core::NetworkConfig;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`TdAgent`](super::TdAgent).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TdAgentConfig {
    /// Decay of the running average reward, close to 1.
    pub reward_decay: f32,

    /// Decay blending the bootstrapped target with the average-reward
    /// baseline, close to 1.
    pub value_decay: f32,

    /// Step size of the critic updates.
    pub critic_alpha: f32,

    /// TD(λ) trace decay.
    pub lambda: f32,

    /// Real reward range the bounded critic output is stretched over.
    pub reward_range: Scale,

    /// Seed of the agent's random number generator.
    pub seed: u64,

    /// Widths of the named state tensors, used to validate both networks.
    pub state_sizes: HashMap<String, usize>,

    /// Discrete action heads.
    pub actors: Vec<ActorConfig>,

    /// Policy network specification; must expose one sink per action head.
    pub policy: NetworkConfig,

    /// Critic network specification; must expose a 1-wide sink named
    /// [`CRITIC_OUTPUT`](super::CRITIC_OUTPUT).
    pub critic: NetworkConfig,
}

impl Default for TdAgentConfig {
    fn default() -> Self {
        Self {
            reward_decay: 0.999,
            value_decay: 0.99,
            critic_alpha: 0.1,
            lambda: 0.5,
            reward_range: Scale {
                min: -1.0,
                max: 1.0,
            },
            seed: 42,
            state_sizes: HashMap::new(),
            actors: Vec::new(),
            policy: NetworkConfig::new(),
            critic: NetworkConfig::new(),
        }
    }
}

impl TdAgentConfig {
    /// Sets the average-reward decay.
    pub fn reward_decay(mut self, v: f32) -> Self {
        self.reward_decay = v;
        self
    }

    /// Sets the target blend decay.
    pub fn value_decay(mut self, v: f32) -> Self {
        self.value_decay = v;
        self
    }

    /// Sets the critic step size.
    pub fn critic_alpha(mut self, v: f32) -> Self {
        self.critic_alpha = v;
        self
    }

    /// Sets the trace decay.
    pub fn lambda(mut self, v: f32) -> Self {
        self.lambda = v;
        self
    }

    /// Sets the reward range.
    pub fn reward_range(mut self, v: Scale) -> Self {
        self.reward_range = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Declares a named state tensor and its width.
    pub fn state(mut self, name: impl Into<String>, size: usize) -> Self {
        self.state_sizes.insert(name.into(), size);
        self
    }

    /// Adds a discrete action head.
    pub fn actor(mut self, v: ActorConfig) -> Self {
        self.actors.push(v);
        self
    }

    /// Sets the policy network specification.
    pub fn policy(mut self, v: NetworkConfig) -> Self {
        self.policy = v;
        self
    }

    /// Sets the critic network specification.
    pub fn critic(mut self, v: NetworkConfig) -> Self {
        self.critic = v;
        self
    }

    /// Constructs [`TdAgentConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TdAgentConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
