//! Actor-critic agent trained by temporal difference with eligibility
//! traces.
use super::TdAgentConfig;
use crate::{
    actor::Actor,
    error::AgentError,
    feedback::{Feedback, Signals},
    scale::Scale,
};
use anyhow::Result;
use log::{debug, info};
use rand::{rngs::SmallRng, SeedableRng};
use rover_core::{
    record::{Record, RecordValue},
    Network, ParamMap, Tensor,
};
use std::{
    collections::HashMap,
    fs,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// Name of the critic network sink carrying the normalized state value.
pub const CRITIC_OUTPUT: &str = "output";

/// Online actor-critic TD(λ) agent.
///
/// Owns a policy network with one sink per discrete action head and a
/// critic network with a single bounded value sink. Every feedback event
/// produces exactly one training step of both networks:
///
/// * the critic's bounded output is denormalized to the reward scale and a
///   bootstrapped residual-advantage target yields the TD error δ;
/// * each action head turns its probability error into a preference update
///   with a self-normalizing step size;
/// * δ is handed to the networks once, as the scalar step signal of the
///   trace-based update rule.
pub struct TdAgent {
    config: TdAgentConfig,
    policy: Network,
    critic: Network,
    actors: Vec<Actor>,
    avg_reward: f32,
    rng: SmallRng,
}

impl TdAgent {
    /// Builds the agent with randomized parameters.
    pub fn build(config: TdAgentConfig) -> Result<Self> {
        Self::build_with_params(config, &ParamMap::new())
    }

    /// Builds the agent, restoring any parameter found in `params`.
    ///
    /// Beyond the network weights the map may carry `"avg_reward"` and the
    /// per-head `"alpha.{name}"` entries produced by [`snapshot`](Self::snapshot).
    pub fn build_with_params(config: TdAgentConfig, params: &ParamMap) -> Result<Self> {
        for (name, value, lo, hi) in [
            ("reward_decay", config.reward_decay, 0.0, 1.0),
            ("value_decay", config.value_decay, 0.0, 1.0),
        ] {
            if !(lo < value && value < hi) {
                return Err(AgentError::InvalidParameter {
                    name: name.to_string(),
                    value,
                    requirement: "in (0, 1)".to_string(),
                }
                .into());
            }
        }
        if !(0.0..=1.0).contains(&config.lambda) {
            return Err(AgentError::InvalidParameter {
                name: "lambda".to_string(),
                value: config.lambda,
                requirement: "in [0, 1]".to_string(),
            }
            .into());
        }
        if config.critic_alpha <= 0.0 {
            return Err(AgentError::InvalidParameter {
                name: "critic_alpha".to_string(),
                value: config.critic_alpha,
                requirement: "positive".to_string(),
            }
            .into());
        }
        Scale::new(config.reward_range.min, config.reward_range.max)?;

        let mut rng = SmallRng::seed_from_u64(config.seed);
        let policy = Network::build(&config.policy, "policy", params, &mut rng)?;
        let critic = Network::build(&config.critic, "critic", params, &mut rng)?;

        if config.actors.is_empty() {
            return Err(AgentError::NoActors.into());
        }
        let mut head_sizes = HashMap::new();
        let mut actors = Vec::with_capacity(config.actors.len());
        for actor_config in &config.actors {
            if head_sizes
                .insert(actor_config.name.clone(), actor_config.num_values)
                .is_some()
            {
                return Err(AgentError::DuplicateHead(actor_config.name.clone()).into());
            }
            actors.push(Actor::build(actor_config)?);
        }
        policy.validate(&config.state_sizes, &head_sizes)?;
        critic.validate(
            &config.state_sizes,
            &HashMap::from([(CRITIC_OUTPUT.to_string(), 1)]),
        )?;

        let avg_reward = params.get("avg_reward").map(|t| t[[0, 0]]).unwrap_or(0.0);
        for actor in &mut actors {
            if let Some(alpha) = params.get(&format!("alpha.{}", actor.name())) {
                actor.set_alpha(alpha[[0, 0]]);
            }
        }

        info!(
            "built TD agent: {} head(s), lambda={}, avg_reward={}",
            actors.len(),
            config.lambda,
            avg_reward
        );
        Ok(Self {
            config,
            policy,
            critic,
            actors,
            avg_reward,
            rng,
        })
    }

    /// Chooses one discrete action per head for the given state.
    pub fn act(&mut self, state: &Signals) -> Result<HashMap<String, usize>> {
        let acts = self.policy.forward(state)?;
        let mut actions = HashMap::with_capacity(self.actors.len());
        for actor in &self.actors {
            let output = acts
                .get(actor.name())
                .ok_or_else(|| AgentError::MissingOutput(actor.name().to_string()))?;
            let pi = actor.pi(output);
            actions.insert(actor.name().to_string(), actor.choose(&pi, &mut self.rng));
        }
        Ok(actions)
    }

    /// Consumes one feedback event and performs one training step.
    ///
    /// Returns a record of the step: reward, state values, TD error,
    /// average reward and the per-head policies, labels and step sizes.
    pub fn observe(&mut self, feedback: &Feedback) -> Result<Record> {
        let range = self.config.reward_range;

        // residual-advantage target and TD error
        let critic_acts = self.critic.forward(&feedback.state0)?;
        let y0 = critic_acts
            .get(CRITIC_OUTPUT)
            .ok_or_else(|| AgentError::MissingOutput(CRITIC_OUTPUT.to_string()))?[[0, 0]];
        let v0 = range.denormalize(y0);
        let v1 = if feedback.terminal {
            0.0
        } else {
            let acts = self.critic.forward(&feedback.state1)?;
            let y1 = acts
                .get(CRITIC_OUTPUT)
                .ok_or_else(|| AgentError::MissingOutput(CRITIC_OUTPUT.to_string()))?[[0, 0]];
            range.denormalize(y1)
        };
        let target = v1 + feedback.reward - self.avg_reward;
        let v0_star =
            target * self.config.value_decay + self.avg_reward * (1.0 - self.config.value_decay);
        let delta = v0_star - v0;
        let critic_label = range.normalize(v0_star);
        self.avg_reward = self.avg_reward * self.config.reward_decay
            + feedback.reward * (1.0 - self.config.reward_decay);

        let mut record = Record::from_slice(&[
            ("reward", RecordValue::Scalar(feedback.reward)),
            ("v0", RecordValue::Scalar(v0)),
            ("v1", RecordValue::Scalar(v1)),
            ("delta", RecordValue::Scalar(delta)),
            ("avg_reward", RecordValue::Scalar(self.avg_reward)),
            ("critic_label", RecordValue::Scalar(critic_label)),
        ]);

        // critic update: unit sink gradient, step signal δ·α
        let critic_grads = HashMap::from([(CRITIC_OUTPUT.to_string(), Tensor::ones((1, 1)))]);
        self.critic.train(
            &critic_acts,
            critic_grads,
            delta * self.config.critic_alpha,
            self.config.lambda,
        )?;

        // actor updates: per-head probability-error gradients, step signal δ
        let policy_acts = self.policy.forward(&feedback.state0)?;
        let mut policy_grads = HashMap::with_capacity(self.actors.len());
        for actor in &mut self.actors {
            let output = policy_acts
                .get(actor.name())
                .ok_or_else(|| AgentError::MissingOutput(actor.name().to_string()))?;
            let action = *feedback
                .actions
                .get(actor.name())
                .ok_or_else(|| AgentError::MissingAction(actor.name().to_string()))?;
            if action >= actor.num_values() {
                return Err(AgentError::InvalidAction {
                    head: actor.name().to_string(),
                    action,
                    num_values: actor.num_values(),
                }
                .into());
            }
            let update = actor.compute_update(output, action, delta);
            record.insert(
                format!("pi.{}", actor.name()),
                RecordValue::Array1(update.pi.row(0).to_vec()),
            );
            record.insert(
                format!("h.{}", actor.name()),
                RecordValue::Array1(update.h.row(0).to_vec()),
            );
            record.insert(
                format!("label.{}", actor.name()),
                RecordValue::Array1(update.label.row(0).to_vec()),
            );
            record.insert(
                format!("alpha.{}", actor.name()),
                RecordValue::Scalar(update.alpha),
            );
            policy_grads.insert(actor.name().to_string(), update.grad);
        }
        self.policy
            .train(&policy_acts, policy_grads, delta, self.config.lambda)?;

        debug!(
            "observe: reward={}, delta={}, avg_reward={}",
            feedback.reward, delta, self.avg_reward
        );
        Ok(record)
    }

    /// Returns the running average reward.
    pub fn avg_reward(&self) -> f32 {
        self.avg_reward
    }

    /// Returns the agent configuration.
    pub fn config(&self) -> &TdAgentConfig {
        &self.config
    }

    /// Returns the policy network.
    pub fn policy(&self) -> &Network {
        &self.policy
    }

    /// Returns the critic network.
    pub fn critic(&self) -> &Network {
        &self.critic
    }

    /// Returns the action heads.
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// Returns a named snapshot of everything the agent learns: network
    /// parameters, average reward and per-head step sizes.
    pub fn snapshot(&self) -> ParamMap {
        let mut params = self.policy.parameters("policy");
        params.extend(self.critic.parameters("critic"));
        params.insert(
            "avg_reward".to_string(),
            Tensor::from_elem((1, 1), self.avg_reward),
        );
        for actor in &self.actors {
            params.insert(
                format!("alpha.{}", actor.name()),
                Tensor::from_elem((1, 1), actor.alpha()),
            );
        }
        params
    }

    /// Restores a snapshot, zeroing the eligibility traces of every
    /// restored layer.
    pub fn restore(&mut self, params: &ParamMap) -> Result<()> {
        self.policy.load_parameters("policy", params)?;
        self.critic.load_parameters("critic", params)?;
        if let Some(avg_reward) = params.get("avg_reward") {
            self.avg_reward = avg_reward[[0, 0]];
        }
        for actor in &mut self.actors {
            if let Some(alpha) = params.get(&format!("alpha.{}", actor.name())) {
                actor.set_alpha(alpha[[0, 0]]);
            }
        }
        Ok(())
    }

    /// Saves the agent as `agent.yml` (configuration) and `agent.bin`
    /// (parameter snapshot) under `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::create_dir_all(&path)?;
        self.config.save(path.as_ref().join("agent.yml"))?;
        let file = File::create(path.as_ref().join("agent.bin"))?;
        bincode::serialize_into(BufWriter::new(file), &self.snapshot())?;
        info!("saved agent into {:?}", path.as_ref());
        Ok(())
    }

    /// Loads an agent saved by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = TdAgentConfig::load(path.as_ref().join("agent.yml"))?;
        let file = File::open(path.as_ref().join("agent.bin"))?;
        let params: ParamMap = bincode::deserialize_from(BufReader::new(file))?;
        Self::build_with_params(config, &params)
    }
}
