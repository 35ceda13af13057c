//! Flat named-parameter maps for weight persistence.
use crate::tensor::Tensor;
use std::collections::HashMap;

/// Flat map from `"{prefix}.{layer}.{param}"` to a tensor value.
///
/// Used to persist and restore trained weights; entries missing at build
/// time fall back to randomized initialization.
pub type ParamMap = HashMap<String, Tensor>;

/// Builds the `"{prefix}.{layer}.{param}"` key of a parameter.
pub fn param_key(prefix: &str, layer: &str, param: &str) -> String {
    format!("{}.{}.{}", prefix, layer, param)
}
