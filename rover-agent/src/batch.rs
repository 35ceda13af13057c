//! Offline training over recorded feedback.
use crate::{feedback::Feedback, td::TdAgent};
use anyhow::Result;
use log::{info, warn};
use rover_core::record::{Record, RecordValue};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Replays a recorded feedback sequence through the online learning path.
///
/// The trainer is single-threaded and drives one agent; callers wanting
/// parallel epochs must use distinct agents. Before every epoch the agent
/// parameters are checkpointed; if the epoch produces a non-finite TD
/// error the checkpoint is restored and training stops. Cancellation via
/// the shared stop flag happens between feedback events, never mid-call.
pub struct BatchTrainer {
    num_epochs: usize,
    stop: Arc<AtomicBool>,
}

impl BatchTrainer {
    /// Creates a trainer running the dataset for `num_epochs` passes.
    pub fn new(num_epochs: usize) -> Self {
        Self {
            num_epochs,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the shared stop flag; setting it cancels training after the
    /// current feedback event.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Trains the agent on the recorded sequence.
    ///
    /// Returns a record with the epoch count, the number of consumed
    /// events, the number of checkpoint restores and the statistics of the
    /// last completed epoch.
    pub fn train(&self, agent: &mut TdAgent, dataset: &[Feedback]) -> Result<Record> {
        let mut epochs = 0usize;
        let mut events = 0usize;
        let mut restores = 0usize;
        let mut mean_abs_delta = 0.0;
        let mut mean_reward = 0.0;

        'epochs: for epoch in 0..self.num_epochs {
            let checkpoint = agent.snapshot();
            let mut abs_delta_sum = 0.0;
            let mut reward_sum = 0.0;
            let mut epoch_events = 0usize;
            let mut diverged = false;

            for feedback in dataset {
                if self.stop.load(Ordering::Relaxed) {
                    info!("batch training cancelled at epoch {}", epoch);
                    break 'epochs;
                }
                let step = agent.observe(feedback)?;
                let delta = step.get_scalar("delta")?;
                if !delta.is_finite() {
                    diverged = true;
                    break;
                }
                abs_delta_sum += delta.abs();
                reward_sum += feedback.reward;
                epoch_events += 1;
                events += 1;
            }

            if diverged {
                warn!(
                    "epoch {}: non-finite TD error after {} event(s), restoring checkpoint",
                    epoch, epoch_events
                );
                agent.restore(&checkpoint)?;
                restores += 1;
                break;
            }

            epochs += 1;
            if epoch_events > 0 {
                mean_abs_delta = abs_delta_sum / epoch_events as f32;
                mean_reward = reward_sum / epoch_events as f32;
            }
            info!(
                "epoch {}: {} event(s), mean |delta| {}, mean reward {}",
                epoch, epoch_events, mean_abs_delta, mean_reward
            );
        }

        Ok(Record::from_slice(&[
            ("epochs", RecordValue::Scalar(epochs as f32)),
            ("events", RecordValue::Scalar(events as f32)),
            ("restores", RecordValue::Scalar(restores as f32)),
            ("mean_abs_delta", RecordValue::Scalar(mean_abs_delta)),
            ("mean_reward", RecordValue::Scalar(mean_reward)),
        ]))
    }
}
