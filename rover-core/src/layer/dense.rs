//! Trainable fully connected layer.
use crate::tensor::{init_weights, Tensor};
use rand::rngs::SmallRng;

/// Fully connected transform `y = x·w + b` with eligibility traces.
///
/// The traces decay by λ and accumulate the current gradient contribution
/// on every train call; the parameter update applies the scalar step signal
/// to the decayed traces, not to the raw gradient, so a single correction
/// also credits recently active inputs.
#[derive(Debug, Clone)]
pub struct Dense {
    bias: Tensor,
    weights: Tensor,
    bias_trace: Tensor,
    weights_trace: Tensor,
    max_abs_weights: f32,
}

impl Dense {
    /// Creates the layer from explicit parameters, with zeroed traces.
    pub fn new(weights: Tensor, bias: Tensor, max_abs_weights: f32) -> Self {
        let bias_trace = Tensor::zeros(bias.raw_dim());
        let weights_trace = Tensor::zeros(weights.raw_dim());
        Self {
            bias,
            weights,
            bias_trace,
            weights_trace,
            max_abs_weights,
        }
    }

    /// Creates the layer with randomized weights and zero bias.
    pub fn init(
        input_size: usize,
        output_size: usize,
        max_abs_weights: f32,
        rng: &mut SmallRng,
    ) -> Self {
        Self::new(
            init_weights(input_size, output_size, rng),
            Tensor::zeros((1, output_size)),
            max_abs_weights,
        )
    }

    /// Performs the forward pass `y = x·w + b`.
    pub fn forward(&self, x: &Tensor) -> Tensor {
        x.dot(&self.weights) + &self.bias
    }

    /// Updates traces and parameters, returning the input gradient.
    ///
    /// ```text
    /// eb ← eb·λ + grad         ew ← ew·λ + xᵗ·grad
    /// b  ← b + eb·δ            w  ← w + ew·δ
    /// ```
    ///
    /// The input gradient `grad·wᵗ` is taken from the pre-update weights.
    pub fn train(&mut self, x: &Tensor, grad: &Tensor, delta: f32, lambda: f32) -> Tensor {
        let in_grad = grad.dot(&self.weights.t());

        self.bias_trace *= lambda;
        self.bias_trace += grad;
        self.weights_trace *= lambda;
        self.weights_trace += &x.t().dot(grad);

        self.bias.scaled_add(delta, &self.bias_trace);
        self.weights.scaled_add(delta, &self.weights_trace);
        if self.max_abs_weights.is_finite() {
            let limit = self.max_abs_weights;
            self.weights.mapv_inplace(|w| w.clamp(-limit, limit));
        }

        in_grad
    }

    /// Replaces the parameters and zeroes the traces.
    pub fn load(&mut self, weights: Tensor, bias: Tensor) {
        self.bias_trace = Tensor::zeros(bias.raw_dim());
        self.weights_trace = Tensor::zeros(weights.raw_dim());
        self.weights = weights;
        self.bias = bias;
    }

    /// Returns the input width.
    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    /// Returns the output width.
    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    /// Returns the weight matrix.
    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    /// Returns the bias row.
    pub fn bias(&self) -> &Tensor {
        &self.bias
    }

    /// Returns the weight eligibility trace.
    pub fn weights_trace(&self) -> &Tensor {
        &self.weights_trace
    }

    /// Returns the bias eligibility trace.
    pub fn bias_trace(&self) -> &Tensor {
        &self.bias_trace
    }

    /// Returns the weight clamp bound.
    pub fn max_abs_weights(&self) -> f32 {
        self.max_abs_weights
    }
}
