//! Differentiable layers of the computation graph.
//!
//! The layer set is closed: the graph executor matches exhaustively over
//! these kinds and no other shape transform exists in the engine.
mod dense;

use crate::tensor::Tensor;
use ndarray::{concatenate, s, Axis};

pub use dense::Dense;

/// A unit of the computation graph.
///
/// `forward` maps the ordered input tensors to the layer output; `train`
/// consumes the output gradient, updates any persistent layer state as a
/// side effect and returns one gradient per input. Both functions leave
/// caller-owned tensors untouched.
#[derive(Debug, Clone)]
pub enum Layer {
    /// Fixed affine transform `y = x·w + b`, applied elementwise.
    Linear {
        /// Offset.
        b: f32,
        /// Scale.
        w: f32,
    },

    /// Trainable fully connected transform with eligibility traces.
    Dense(Dense),

    /// Rectified linear unit.
    Relu,

    /// Hyperbolic tangent.
    Tanh,

    /// Softmax over temperature-scaled logits.
    Softmax {
        /// Temperature, strictly positive.
        temperature: f32,
    },

    /// Concatenation of the inputs along the feature axis, in declared order.
    Concat,

    /// Elementwise sum of equally shaped inputs.
    Sum,
}

impl Layer {
    /// Performs the forward pass.
    pub fn forward(&self, inputs: &[&Tensor]) -> Tensor {
        match self {
            Layer::Linear { b, w } => inputs[0] * *w + *b,
            Layer::Dense(dense) => dense.forward(inputs[0]),
            Layer::Relu => inputs[0].mapv(|x| x.max(0.0)),
            Layer::Tanh => inputs[0].mapv(f32::tanh),
            Layer::Softmax { temperature } => softmax(inputs[0], *temperature),
            Layer::Concat => {
                let views: Vec<_> = inputs.iter().map(|t| t.view()).collect();
                concatenate(Axis(1), &views).expect("concat inputs must share the batch dimension")
            }
            Layer::Sum => {
                let mut out = inputs[0].clone();
                for t in &inputs[1..] {
                    out += *t;
                }
                out
            }
        }
    }

    /// Performs the backward pass, returning one gradient per input.
    ///
    /// `delta` is the scalar step signal (step size × TD error) applied to
    /// the decayed eligibility traces; `lambda` is the trace decay. Input
    /// gradients are computed from the pre-update parameters.
    pub fn train(
        &mut self,
        inputs: &[&Tensor],
        output: &Tensor,
        grad: &Tensor,
        delta: f32,
        lambda: f32,
    ) -> Vec<Tensor> {
        match self {
            Layer::Linear { w, .. } => vec![grad * *w],
            Layer::Dense(dense) => vec![dense.train(inputs[0], grad, delta, lambda)],
            Layer::Relu => {
                let mut in_grad = grad.clone();
                in_grad.zip_mut_with(inputs[0], |g, &x| {
                    if x <= 0.0 {
                        *g = 0.0;
                    }
                });
                vec![in_grad]
            }
            Layer::Tanh => {
                let mut in_grad = grad.clone();
                in_grad.zip_mut_with(output, |g, &y| *g *= 1.0 - y * y);
                vec![in_grad]
            }
            Layer::Softmax { temperature } => {
                vec![softmax_backward(output, grad, *temperature)]
            }
            Layer::Concat => {
                let mut grads = Vec::with_capacity(inputs.len());
                let mut start = 0;
                for t in inputs {
                    let width = t.ncols();
                    grads.push(grad.slice(s![.., start..start + width]).to_owned());
                    start += width;
                }
                grads
            }
            Layer::Sum => inputs.iter().map(|_| grad.clone()).collect(),
        }
    }

    /// Returns true if the layer owns trainable parameters.
    pub fn is_trainable(&self) -> bool {
        matches!(self, Layer::Dense(_))
    }
}

/// Softmax over `x / temperature`, row by row.
///
/// The maximum logit is subtracted before exponentiation so that large
/// activations cannot overflow.
fn softmax(x: &Tensor, temperature: f32) -> Tensor {
    let mut out = x / temperature;
    for mut row in out.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}

/// Input gradient of softmax: `(Σ_j grad_j·y_j·(δ_ij − y_i)) / temperature`.
fn softmax_backward(output: &Tensor, grad: &Tensor, temperature: f32) -> Tensor {
    let mut in_grad = Tensor::zeros(grad.raw_dim());
    for i in 0..grad.nrows() {
        let y = output.row(i);
        let g = grad.row(i);
        let weighted: f32 = y.iter().zip(g.iter()).map(|(&y, &g)| y * g).sum();
        for k in 0..grad.ncols() {
            in_grad[[i, k]] = y[k] * (g[k] - weighted) / temperature;
        }
    }
    in_grad
}
