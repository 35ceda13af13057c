//! Discrete actor heads with self-normalizing step sizes.
use crate::{error::AgentError, scale::Scale};
use rand::{rngs::SmallRng, Rng};
use rover_core::{Layer, Tensor};
use serde::{Deserialize, Serialize};

/// Floor of the preference-error RMS used as step-size denominator.
pub const PREF_RMS_FLOOR: f32 = 1e-3;

const DEFAULT_EPSILON: f32 = 0.1;

fn default_epsilon() -> f32 {
    DEFAULT_EPSILON
}

/// Configuration of a discrete action head.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ActorConfig {
    /// Name of the head; the policy network must expose a sink with this
    /// name and `num_values` outputs.
    pub name: String,

    /// Number of discrete action values.
    pub num_values: usize,

    /// Range the bounded network output is stretched over to obtain the
    /// unnormalized preferences.
    pub preference_range: Scale,

    /// Target magnitude of the preference updates.
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,

    /// Decay of the adaptive step size and of its running RMS, close to 1.
    pub alpha_decay: f32,

    /// Initial step size.
    pub alpha: f32,
}

impl ActorConfig {
    /// Creates a configuration with the default epsilon.
    pub fn new(name: impl Into<String>, num_values: usize) -> Self {
        Self {
            name: name.into(),
            num_values,
            preference_range: Scale {
                min: -3.0,
                max: 3.0,
            },
            epsilon: DEFAULT_EPSILON,
            alpha_decay: 0.999,
            alpha: 0.1,
        }
    }

    /// Sets the preference range.
    pub fn preference_range(mut self, v: Scale) -> Self {
        self.preference_range = v;
        self
    }

    /// Sets the target update magnitude.
    pub fn epsilon(mut self, v: f32) -> Self {
        self.epsilon = v;
        self
    }

    /// Sets the step-size decay.
    pub fn alpha_decay(mut self, v: f32) -> Self {
        self.alpha_decay = v;
        self
    }

    /// Sets the initial step size.
    pub fn alpha(mut self, v: f32) -> Self {
        self.alpha = v;
        self
    }
}

/// Everything one training step derives for a head.
#[derive(Debug)]
pub struct ActorUpdate {
    /// Unnormalized preferences of the current output.
    pub h: Tensor,

    /// Action probabilities `softmax(h)`.
    pub pi: Tensor,

    /// Preference error `ΔH = (onehot − π)·δ·α`.
    pub pref_error: Tensor,

    /// Updated preferences `h + ΔH`.
    pub h_star: Tensor,

    /// `h*` renormalized to the bounded output range: the training label.
    pub label: Tensor,

    /// Gradient fed to the policy sink: `(onehot − π)·α`. The TD error is
    /// applied once, by the network's trace update.
    pub grad: Tensor,

    /// Step size used by this update.
    pub alpha: f32,
}

/// A discrete action head.
///
/// Converts the bounded policy output into preferences, samples actions
/// from their softmax and derives the probability-error update with an
/// adaptive step size that tracks `ε / RMS(ΔH)`.
#[derive(Debug, Clone)]
pub struct Actor {
    name: String,
    num_values: usize,
    preference_range: Scale,
    epsilon: f32,
    alpha_decay: f32,
    alpha: f32,
    mean_sq_pref_error: f32,
}

impl Actor {
    /// Builds the head from its configuration.
    pub fn build(config: &ActorConfig) -> Result<Self, AgentError> {
        if config.num_values < 2 {
            return Err(AgentError::InvalidParameter {
                name: format!("{}.num_values", config.name),
                value: config.num_values as f32,
                requirement: "at least 2".to_string(),
            });
        }
        if config.epsilon <= 0.0 {
            return Err(AgentError::InvalidParameter {
                name: format!("{}.epsilon", config.name),
                value: config.epsilon,
                requirement: "positive".to_string(),
            });
        }
        if !(0.0 < config.alpha_decay && config.alpha_decay < 1.0) {
            return Err(AgentError::InvalidParameter {
                name: format!("{}.alpha_decay", config.name),
                value: config.alpha_decay,
                requirement: "in (0, 1)".to_string(),
            });
        }
        if config.alpha <= 0.0 {
            return Err(AgentError::InvalidParameter {
                name: format!("{}.alpha", config.name),
                value: config.alpha,
                requirement: "positive".to_string(),
            });
        }
        Scale::new(config.preference_range.min, config.preference_range.max)?;
        Ok(Self {
            name: config.name.clone(),
            num_values: config.num_values,
            preference_range: config.preference_range,
            epsilon: config.epsilon,
            alpha_decay: config.alpha_decay,
            alpha: config.alpha,
            mean_sq_pref_error: 0.0,
        })
    }

    /// Returns the head name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of discrete action values.
    pub fn num_values(&self) -> usize {
        self.num_values
    }

    /// Returns the current adaptive step size.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Overwrites the step size and clears the running RMS state.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
        self.mean_sq_pref_error = 0.0;
    }

    /// Returns the centered preferences of a bounded output row.
    pub fn preferences(&self, output: &Tensor) -> Tensor {
        self.preference_range.preferences(output)
    }

    /// Returns the action probabilities of a bounded output row.
    pub fn pi(&self, output: &Tensor) -> Tensor {
        softmax(&self.preferences(output))
    }

    /// Samples an action from a probability row by inverting its
    /// cumulative distribution.
    pub fn choose(&self, pi: &Tensor, rng: &mut SmallRng) -> usize {
        let x: f32 = rng.gen();
        let mut cumulative = 0.0;
        for (i, &p) in pi.row(0).iter().enumerate() {
            cumulative += p;
            if x < cumulative {
                return i;
            }
        }
        self.num_values - 1
    }

    /// Derives the training update for one feedback event.
    ///
    /// `output` is the head's bounded policy output for the state the
    /// action was chosen in, `action` the chosen value and `delta` the TD
    /// error. Advances the adaptive step size as a side effect.
    pub fn compute_update(&mut self, output: &Tensor, action: usize, delta: f32) -> ActorUpdate {
        let alpha = self.alpha;
        let h = self.preferences(output);
        let pi = softmax(&h);

        // z = onehot(action) − π
        let mut z = -&pi;
        z[[0, action]] += 1.0;

        let grad = &z * alpha;
        let pref_error = &grad * delta;
        let h_star = &h + &pref_error;
        let label = self.preference_range.normalize_row(&h_star);

        self.adapt(&pref_error);

        ActorUpdate {
            h,
            pi,
            pref_error,
            h_star,
            label,
            grad,
            alpha,
        }
    }

    /// Advances the adaptive step size towards `ε / RMS(ΔH)`.
    ///
    /// The running mean square of the preference errors decays with the
    /// same factor as the step size; the RMS denominator is floored at
    /// [`PREF_RMS_FLOOR`].
    fn adapt(&mut self, pref_error: &Tensor) {
        let beta = self.alpha_decay;
        let mean_sq = pref_error.mapv(|v| v * v).mean().unwrap_or(0.0);
        self.mean_sq_pref_error = self.mean_sq_pref_error * beta + mean_sq * (1.0 - beta);
        let rms = self.mean_sq_pref_error.sqrt().max(PREF_RMS_FLOOR);
        self.alpha = self.alpha * beta + self.epsilon / rms * (1.0 - beta);
    }
}

/// Softmax at unit temperature, delegated to the engine's layer.
fn softmax(h: &Tensor) -> Tensor {
    Layer::Softmax { temperature: 1.0 }.forward(&[h])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rover_core::row;

    fn actor() -> Actor {
        Actor::build(
            &ActorConfig::new("move", 3)
                .alpha(0.5)
                .alpha_decay(0.9)
                .epsilon(0.1),
        )
        .unwrap()
    }

    #[test]
    fn test_build_rejects_bad_parameters() {
        assert!(Actor::build(&ActorConfig::new("move", 1)).is_err());
        assert!(Actor::build(&ActorConfig::new("move", 3).epsilon(0.0)).is_err());
        assert!(Actor::build(&ActorConfig::new("move", 3).alpha_decay(1.0)).is_err());
        assert!(Actor::build(&ActorConfig::new("move", 3).alpha(-0.1)).is_err());
    }

    #[test]
    fn test_pi_is_a_distribution() {
        let actor = actor();
        let pi = actor.pi(&row(&[0.5, -0.5, 0.0]));
        assert!((pi.sum() - 1.0).abs() < 1e-6);
        assert!(pi.iter().all(|&p| p > 0.0));
        assert!(pi[[0, 0]] > pi[[0, 2]] && pi[[0, 2]] > pi[[0, 1]]);
    }

    #[test]
    fn test_choose_covers_all_actions() {
        let actor = actor();
        let mut rng = SmallRng::seed_from_u64(11);
        let pi = row(&[0.3, 0.4, 0.3]);
        let mut seen = [0usize; 3];
        for _ in 0..1000 {
            seen[actor.choose(&pi, &mut rng)] += 1;
        }
        assert!(seen.iter().all(|&n| n > 200));
    }

    #[test]
    fn test_update_moves_preferences_towards_action() {
        let mut actor = actor();
        let output = row(&[0.0, 0.0, 0.0]);
        let update = actor.compute_update(&output, 1, 1.0);

        // z = onehot − π raises the chosen action and lowers the others
        assert!(update.pref_error[[0, 1]] > 0.0);
        assert!(update.pref_error[[0, 0]] < 0.0);
        assert!(update.pref_error[[0, 2]] < 0.0);
        assert_eq!(update.h_star, &update.h + &update.pref_error);
        // with δ = 1 the sink gradient (z·α) equals the preference error
        assert_eq!(update.grad, update.pref_error);
        assert_eq!(update.alpha, 0.5);
    }

    #[test]
    fn test_negative_delta_reverses_the_update() {
        let mut actor = actor();
        let update = actor.compute_update(&row(&[0.0, 0.0, 0.0]), 1, -1.0);
        assert!(update.pref_error[[0, 1]] < 0.0);
        assert!(update.pref_error[[0, 0]] > 0.0);
    }

    #[test]
    fn test_alpha_converges_to_epsilon_over_rms() {
        let mut actor = actor();
        let pref_error = row(&[0.2, -0.2, 0.0]);
        let rms = (pref_error.mapv(|v| v * v).mean().unwrap()).sqrt();
        let target = actor.epsilon / rms;

        // once the running mean square has settled, the gap to the fixed
        // point shrinks geometrically with factor alpha_decay
        for _ in 0..50 {
            actor.adapt(&pref_error);
        }
        let gap50 = (actor.alpha - target).abs();
        for _ in 0..50 {
            actor.adapt(&pref_error);
        }
        let gap100 = (actor.alpha - target).abs();
        assert!(gap100 <= gap50 * 0.9f32.powi(25));

        for _ in 0..200 {
            actor.adapt(&pref_error);
        }
        assert!((actor.alpha - target).abs() < 1e-3 * target);
    }

    #[test]
    fn test_rms_floor_bounds_alpha() {
        let mut actor = actor();
        for _ in 0..500 {
            actor.adapt(&row(&[0.0, 0.0, 0.0]));
        }
        assert!(actor.alpha <= actor.epsilon / PREF_RMS_FLOOR + 1e-3);
    }
}
