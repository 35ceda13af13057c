//! Network graph specification.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Specification of a single layer.
///
/// The `inputs` of a layer live in [`NetworkConfig::inputs`], keyed by the
/// layer name, so that the graph wiring stays separate from the per-layer
/// hyperparameters.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerConfig {
    /// Fixed affine transform.
    Linear {
        /// Layer name.
        name: String,
        /// Offset.
        b: f32,
        /// Scale.
        w: f32,
    },

    /// Trainable fully connected layer.
    Dense {
        /// Layer name.
        name: String,
        /// Input width.
        input_size: usize,
        /// Output width.
        output_size: usize,
        /// Optional clamp for the absolute weight values.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_abs_weights: Option<f32>,
    },

    /// Rectified linear unit.
    Relu {
        /// Layer name.
        name: String,
    },

    /// Hyperbolic tangent.
    Tanh {
        /// Layer name.
        name: String,
    },

    /// Softmax with temperature.
    Softmax {
        /// Layer name.
        name: String,
        /// Temperature, strictly positive.
        temperature: f32,
    },

    /// Concatenation along the feature axis.
    Concat {
        /// Layer name.
        name: String,
    },

    /// Elementwise sum.
    Sum {
        /// Layer name.
        name: String,
    },
}

impl LayerConfig {
    /// Returns the layer name.
    pub fn name(&self) -> &str {
        match self {
            LayerConfig::Linear { name, .. }
            | LayerConfig::Dense { name, .. }
            | LayerConfig::Relu { name }
            | LayerConfig::Tanh { name }
            | LayerConfig::Softmax { name, .. }
            | LayerConfig::Concat { name }
            | LayerConfig::Sum { name } => name,
        }
    }
}

/// Specification of the layer graph.
#[derive(Debug, Default, Deserialize, Serialize, PartialEq, Clone)]
pub struct NetworkConfig {
    /// The layers of the graph.
    pub layers: Vec<LayerConfig>,

    /// Ordered input names of each layer (layer names or external source
    /// labels).
    pub inputs: HashMap<String, Vec<String>>,
}

impl NetworkConfig {
    /// Creates an empty specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer with its ordered inputs.
    pub fn layer(mut self, config: LayerConfig, inputs: &[&str]) -> Self {
        self.inputs.insert(
            config.name().to_string(),
            inputs.iter().map(|s| s.to_string()).collect(),
        );
        self.layers.push(config);
        self
    }

    /// Constructs [`NetworkConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`NetworkConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_round_trip() {
        let config = NetworkConfig::new()
            .layer(
                LayerConfig::Dense {
                    name: "hidden".into(),
                    input_size: 4,
                    output_size: 8,
                    max_abs_weights: None,
                },
                &["state"],
            )
            .layer(
                LayerConfig::Softmax {
                    name: "pi".into(),
                    temperature: 0.5,
                },
                &["hidden"],
            );

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: NetworkConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_parses_external_document() {
        let yaml = "\
layers:
  - name: hidden
    type: dense
    input_size: 2
    output_size: 3
  - name: out
    type: tanh
inputs:
  hidden: [state]
  out: [hidden]
";
        let config: NetworkConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.layers.len(), 2);
        assert_eq!(config.inputs["hidden"], vec!["state".to_string()]);
    }
}
