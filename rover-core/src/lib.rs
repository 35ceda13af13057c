#![warn(missing_docs)]
//! TD(λ) computation graph engine for the rover controller.
//!
//! The crate provides the learning core used by the onboard agent:
//! a directed acyclic graph of differentiable layers ([`Network`]) trained
//! online, one sample at a time, with eligibility-trace updates.
pub mod error;
pub mod record;

mod config;
mod layer;
mod network;
mod params;
mod tensor;

pub use config::{LayerConfig, NetworkConfig};
pub use layer::{Dense, Layer};
pub use network::{Activations, Network, SourceGrads};
pub use params::ParamMap;
pub use tensor::{row, Tensor};
