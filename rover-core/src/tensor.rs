//! Tensor type and construction helpers.
use ndarray::Array2;
use rand::{rngs::SmallRng, Rng};

/// Numeric array with the batch dimension first.
///
/// The online engine always runs with batch size 1; the offline trainer
/// inspects multi-row activations but still trains one sample at a time.
pub type Tensor = Array2<f32>;

/// Creates a 1×n row tensor from a slice.
pub fn row(values: &[f32]) -> Tensor {
    Array2::from_shape_vec((1, values.len()), values.to_vec()).unwrap()
}

/// Initializes a weight matrix uniformly in ±3/(fan_in+fan_out).
pub fn init_weights(fan_in: usize, fan_out: usize, rng: &mut SmallRng) -> Tensor {
    let bound = 3.0 / (fan_in + fan_out) as f32;
    Tensor::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-bound..bound))
}
