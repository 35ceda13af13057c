//! Directed acyclic graph of layers with trace-based training.
use crate::{
    config::{LayerConfig, NetworkConfig},
    error::NetworkError,
    layer::{Dense, Layer},
    params::{param_key, ParamMap},
    tensor::{init_weights, Tensor},
};
use log::debug;
use rand::rngs::SmallRng;
use std::collections::{hash_map::Entry, BTreeSet, HashMap, VecDeque};

/// Full name→tensor map of a forward pass, including the raw external
/// inputs, so that trainers can inspect activations without recomputation.
pub type Activations = HashMap<String, Tensor>;

/// Gradients that reached the external source labels of a train pass.
pub type SourceGrads = HashMap<String, Tensor>;

#[derive(Debug)]
struct Node {
    name: String,
    inputs: Vec<String>,
    layer: Layer,
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// A computation graph executed forward for prediction and backward for
/// trace-based training.
///
/// The graph topology is immutable after construction; layer parameters and
/// eligibility traces mutate in place across the whole online session.
///
/// ```mermaid
/// graph LR
///     S[sources] -->|forward order| L[layers]
///     L -->|activations| T[train]
///     T -->|reverse order, fan-out summed| G[source gradients]
/// ```
///
/// Construction resolves every input reference, rejects cyclic graphs and
/// caches the topological forward order together with its exact reverse.
#[derive(Debug)]
pub struct Network {
    /// Nodes in topological forward order.
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    sources: BTreeSet<String>,
    sinks: BTreeSet<String>,
}

impl Network {
    /// Builds the network from its specification.
    ///
    /// Dense parameters found in `params` under `"{prefix}.{layer}.{param}"`
    /// are restored (with shape validation); missing entries fall back to
    /// randomized initialization.
    pub fn build(
        config: &NetworkConfig,
        prefix: &str,
        params: &ParamMap,
        rng: &mut SmallRng,
    ) -> Result<Self, NetworkError> {
        let mut declared: HashMap<&str, usize> = HashMap::new();
        for (i, layer) in config.layers.iter().enumerate() {
            if declared.insert(layer.name(), i).is_some() {
                return Err(NetworkError::DuplicateLayer(layer.name().to_string()));
            }
        }

        // Topological sort (Kahn), stable in declaration order.
        let n = config.layers.len();
        let mut indegree = vec![0usize; n];
        let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, layer) in config.layers.iter().enumerate() {
            for input in Self::inputs_of(config, layer)? {
                if let Some(&j) = declared.get(input.as_str()) {
                    out_edges[j].push(i);
                    indegree[i] += 1;
                }
            }
        }
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &k in &out_edges[i] {
                indegree[k] -= 1;
                if indegree[k] == 0 {
                    queue.push_back(k);
                }
            }
        }
        if order.len() != n {
            let unresolved: Vec<&str> = (0..n)
                .filter(|i| !order.contains(i))
                .map(|i| config.layers[i].name())
                .collect();
            return Err(NetworkError::Cycle(unresolved.join(", ")));
        }

        let mut nodes = Vec::with_capacity(n);
        for &i in &order {
            let layer_config = &config.layers[i];
            nodes.push(Node {
                name: layer_config.name().to_string(),
                inputs: Self::inputs_of(config, layer_config)?.clone(),
                layer: Self::build_layer(layer_config, prefix, params, rng)?,
            });
        }
        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.name.clone(), i))
            .collect();

        let mut sources = BTreeSet::new();
        let mut referenced = BTreeSet::new();
        for node in &nodes {
            for input in &node.inputs {
                referenced.insert(input.clone());
                if !index.contains_key(input) {
                    sources.insert(input.clone());
                }
            }
        }
        let sinks: BTreeSet<String> = nodes
            .iter()
            .map(|node| node.name.clone())
            .filter(|name| !referenced.contains(name))
            .collect();

        debug!(
            "built network \"{}\": {} layers, sources {:?}, sinks {:?}",
            prefix,
            nodes.len(),
            sources,
            sinks
        );

        Ok(Self {
            nodes,
            index,
            sources,
            sinks,
        })
    }

    /// Returns the declared inputs of a layer after checking its arity.
    fn inputs_of<'a>(
        config: &'a NetworkConfig,
        layer: &LayerConfig,
    ) -> Result<&'a Vec<String>, NetworkError> {
        let ins = config
            .inputs
            .get(layer.name())
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let (required, ok) = match layer {
            LayerConfig::Concat { .. } | LayerConfig::Sum { .. } => ("at least 2", ins.len() >= 2),
            _ => ("exactly 1", ins.len() == 1),
        };
        if !ok {
            return Err(NetworkError::InputArity {
                layer: layer.name().to_string(),
                expected: required.to_string(),
                actual: ins.len(),
            });
        }
        Ok(config.inputs.get(layer.name()).unwrap())
    }

    fn build_layer(
        config: &LayerConfig,
        prefix: &str,
        params: &ParamMap,
        rng: &mut SmallRng,
    ) -> Result<Layer, NetworkError> {
        let layer = match config {
            LayerConfig::Linear { b, w, .. } => Layer::Linear { b: *b, w: *w },
            LayerConfig::Relu { .. } => Layer::Relu,
            LayerConfig::Tanh { .. } => Layer::Tanh,
            LayerConfig::Concat { .. } => Layer::Concat,
            LayerConfig::Sum { .. } => Layer::Sum,
            LayerConfig::Softmax { name, temperature } => {
                if *temperature <= 0.0 {
                    return Err(NetworkError::NonPositiveTemperature {
                        layer: name.clone(),
                        temperature: *temperature,
                    });
                }
                Layer::Softmax {
                    temperature: *temperature,
                }
            }
            LayerConfig::Dense {
                name,
                input_size,
                output_size,
                max_abs_weights,
            } => {
                let weights = Self::restore(
                    params,
                    &param_key(prefix, name, "w"),
                    [*input_size, *output_size],
                )?
                .unwrap_or_else(|| init_weights(*input_size, *output_size, rng));
                let bias = Self::restore(params, &param_key(prefix, name, "b"), [1, *output_size])?
                    .unwrap_or_else(|| Tensor::zeros((1, *output_size)));
                Layer::Dense(Dense::new(
                    weights,
                    bias,
                    max_abs_weights.unwrap_or(f32::INFINITY),
                ))
            }
        };
        Ok(layer)
    }

    fn restore(
        params: &ParamMap,
        key: &str,
        expected: [usize; 2],
    ) -> Result<Option<Tensor>, NetworkError> {
        match params.get(key) {
            None => Ok(None),
            Some(tensor) => {
                let actual = [tensor.nrows(), tensor.ncols()];
                if actual != expected {
                    return Err(NetworkError::ParamShape {
                        key: key.to_string(),
                        expected,
                        actual,
                    });
                }
                Ok(Some(tensor.clone()))
            }
        }
    }

    /// Performs a forward pass, returning every node value keyed by name,
    /// together with the raw external inputs.
    pub fn forward(&self, sources: &Activations) -> Result<Activations, NetworkError> {
        let mut acts = sources.clone();
        for node in &self.nodes {
            let mut inputs = Vec::with_capacity(node.inputs.len());
            for name in &node.inputs {
                match acts.get(name) {
                    Some(tensor) => inputs.push(tensor),
                    None => return Err(NetworkError::MissingSource(name.clone())),
                }
            }
            let output = node.layer.forward(&inputs);
            acts.insert(node.name.clone(), output);
        }
        Ok(acts)
    }

    /// Performs a backward pass over the exact reverse of the forward
    /// order, training every layer.
    ///
    /// The incoming gradient of a node is the elementwise sum of the
    /// gradients returned by every immediate consumer, plus the supplied
    /// entry if the node is also a sink. Nodes reached by no gradient train
    /// with zeros: their traces still decay and their parameters still
    /// update from the decayed traces scaled by `delta`.
    ///
    /// Returns the gradients that reached the external source labels, so a
    /// shared upstream network can continue backpropagation.
    pub fn train(
        &mut self,
        acts: &Activations,
        sink_grads: HashMap<String, Tensor>,
        delta: f32,
        lambda: f32,
    ) -> Result<SourceGrads, NetworkError> {
        for name in sink_grads.keys() {
            if !self.index.contains_key(name) {
                return Err(NetworkError::UnknownGradientLayer(name.clone()));
            }
        }

        let mut grads = sink_grads;
        for i in (0..self.nodes.len()).rev() {
            let node = &mut self.nodes[i];
            let output = acts
                .get(&node.name)
                .ok_or_else(|| NetworkError::MissingActivation(node.name.clone()))?;
            let grad = match grads.get(&node.name) {
                Some(grad) => grad.clone(),
                None => Tensor::zeros(output.raw_dim()),
            };
            let mut inputs = Vec::with_capacity(node.inputs.len());
            for name in &node.inputs {
                inputs.push(
                    acts.get(name)
                        .ok_or_else(|| NetworkError::MissingActivation(name.clone()))?,
                );
            }

            let in_grads = node.layer.train(&inputs, output, &grad, delta, lambda);
            for (name, grad) in node.inputs.iter().zip(in_grads.into_iter()) {
                match grads.entry(name.clone()) {
                    Entry::Occupied(mut e) => *e.get_mut() += &grad,
                    Entry::Vacant(e) => {
                        e.insert(grad);
                    }
                }
            }
        }

        Ok(self
            .sources
            .iter()
            .filter_map(|name| grads.remove(name).map(|grad| (name.clone(), grad)))
            .collect())
    }

    /// Validates the graph against external source and sink widths.
    ///
    /// Infers every layer width from the source widths and checks dense
    /// wiring, equal widths at sum layers and the requested sink widths.
    /// Source labels missing from `source_sizes` surface as dangling-input
    /// errors.
    pub fn validate(
        &self,
        source_sizes: &HashMap<String, usize>,
        sink_sizes: &HashMap<String, usize>,
    ) -> Result<(), NetworkError> {
        let mut sizes: HashMap<&str, usize> = HashMap::new();
        for node in &self.nodes {
            let mut input_sizes = Vec::with_capacity(node.inputs.len());
            for input in &node.inputs {
                let size = sizes
                    .get(input.as_str())
                    .copied()
                    .or_else(|| source_sizes.get(input).copied())
                    .ok_or_else(|| NetworkError::DanglingInput {
                        layer: node.name.clone(),
                        input: input.clone(),
                    })?;
                input_sizes.push(size);
            }
            let width = match &node.layer {
                Layer::Dense(dense) => {
                    if input_sizes[0] != dense.input_size() {
                        return Err(NetworkError::SizeMismatch {
                            layer: node.name.clone(),
                            expected: dense.input_size(),
                            actual: input_sizes[0],
                        });
                    }
                    dense.output_size()
                }
                Layer::Sum => {
                    let width = input_sizes[0];
                    if input_sizes.iter().any(|&s| s != width) {
                        return Err(NetworkError::SizeMismatch {
                            layer: node.name.clone(),
                            expected: width,
                            actual: *input_sizes.iter().find(|&&s| s != width).unwrap(),
                        });
                    }
                    width
                }
                Layer::Concat => input_sizes.iter().sum(),
                _ => input_sizes[0],
            };
            sizes.insert(node.name.as_str(), width);
        }

        for (name, &size) in sink_sizes {
            let width = sizes
                .get(name.as_str())
                .ok_or_else(|| NetworkError::UnknownSink(name.clone()))?;
            if *width != size {
                return Err(NetworkError::SizeMismatch {
                    layer: name.clone(),
                    expected: size,
                    actual: *width,
                });
            }
        }
        Ok(())
    }

    /// Returns the trainable parameters as a flat
    /// `"{prefix}.{layer}.{param}"` map.
    pub fn parameters(&self, prefix: &str) -> ParamMap {
        let mut params = ParamMap::new();
        for node in &self.nodes {
            if let Layer::Dense(dense) = &node.layer {
                params.insert(param_key(prefix, &node.name, "w"), dense.weights().clone());
                params.insert(param_key(prefix, &node.name, "b"), dense.bias().clone());
            }
        }
        params
    }

    /// Restores trainable parameters from a flat map, zeroing the traces of
    /// every restored layer. Layers without entries keep their state.
    pub fn load_parameters(&mut self, prefix: &str, params: &ParamMap) -> Result<(), NetworkError> {
        for node in &mut self.nodes {
            if let Layer::Dense(dense) = &mut node.layer {
                let shape = [dense.input_size(), dense.output_size()];
                let weights = Self::restore(params, &param_key(prefix, &node.name, "w"), shape)?;
                let bias =
                    Self::restore(params, &param_key(prefix, &node.name, "b"), [1, shape[1]])?;
                if weights.is_some() || bias.is_some() {
                    let weights = weights.unwrap_or_else(|| dense.weights().clone());
                    let bias = bias.unwrap_or_else(|| dense.bias().clone());
                    dense.load(weights, bias);
                }
            }
        }
        Ok(())
    }

    /// Returns the specification the network was built from.
    pub fn spec(&self) -> NetworkConfig {
        let mut config = NetworkConfig::new();
        for node in &self.nodes {
            let name = node.name.clone();
            let layer = match &node.layer {
                Layer::Linear { b, w } => LayerConfig::Linear { name, b: *b, w: *w },
                Layer::Dense(dense) => LayerConfig::Dense {
                    name,
                    input_size: dense.input_size(),
                    output_size: dense.output_size(),
                    max_abs_weights: if dense.max_abs_weights().is_finite() {
                        Some(dense.max_abs_weights())
                    } else {
                        None
                    },
                },
                Layer::Relu => LayerConfig::Relu { name },
                Layer::Tanh => LayerConfig::Tanh { name },
                Layer::Softmax { temperature } => LayerConfig::Softmax {
                    name,
                    temperature: *temperature,
                },
                Layer::Concat => LayerConfig::Concat { name },
                Layer::Sum => LayerConfig::Sum { name },
            };
            let inputs: Vec<&str> = node.inputs.iter().map(|s| s.as_str()).collect();
            config = config.layer(layer, &inputs);
        }
        config
    }

    /// Returns the external source labels.
    pub fn sources(&self) -> &BTreeSet<String> {
        &self.sources
    }

    /// Returns the sink labels (layers without consumers).
    pub fn sinks(&self) -> &BTreeSet<String> {
        &self.sinks
    }

    /// Returns the layer names in forward (topological) order.
    pub fn forward_order(&self) -> Vec<&str> {
        self.nodes.iter().map(|node| node.name.as_str()).collect()
    }

    /// Returns a layer by name.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.index.get(name).map(|&i| &self.nodes[i].layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::row;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    fn linear(name: &str, b: f32, w: f32) -> LayerConfig {
        LayerConfig::Linear {
            name: name.into(),
            b,
            w,
        }
    }

    /// 8-node DAG with a diamond: a shared layer feeds two branches that
    /// reconverge through a sum.
    fn diamond_config() -> NetworkConfig {
        NetworkConfig::new()
            .layer(
                LayerConfig::Dense {
                    name: "embed".into(),
                    input_size: 2,
                    output_size: 3,
                    max_abs_weights: None,
                },
                &["state"],
            )
            .layer(LayerConfig::Tanh { name: "hidden".into() }, &["embed"])
            .layer(
                LayerConfig::Dense {
                    name: "left".into(),
                    input_size: 3,
                    output_size: 3,
                    max_abs_weights: None,
                },
                &["hidden"],
            )
            .layer(LayerConfig::Tanh { name: "left_act".into() }, &["left"])
            .layer(
                LayerConfig::Dense {
                    name: "right".into(),
                    input_size: 3,
                    output_size: 3,
                    max_abs_weights: None,
                },
                &["hidden"],
            )
            .layer(LayerConfig::Tanh { name: "right_act".into() }, &["right"])
            .layer(
                LayerConfig::Sum { name: "merge".into() },
                &["left_act", "right_act"],
            )
            .layer(
                LayerConfig::Softmax {
                    name: "pi".into(),
                    temperature: 0.8,
                },
                &["merge"],
            )
    }

    #[test]
    fn test_source_and_sink_labels() {
        let net = Network::build(&diamond_config(), "net", &ParamMap::new(), &mut rng()).unwrap();
        assert_eq!(
            net.sources().iter().collect::<Vec<_>>(),
            vec![&"state".to_string()]
        );
        assert_eq!(
            net.sinks().iter().collect::<Vec<_>>(),
            vec![&"pi".to_string()]
        );
    }

    #[test]
    fn test_forward_composes_layer_by_layer() {
        let net = Network::build(&diamond_config(), "net", &ParamMap::new(), &mut rng()).unwrap();
        let state = row(&[0.3, -0.7]);
        let mut sources = Activations::new();
        sources.insert("state".to_string(), state.clone());
        let acts = net.forward(&sources).unwrap();

        // raw external inputs are part of the result
        assert_eq!(acts["state"], state);

        // manual composition in topological order
        let mut expected = state;
        for name in ["embed", "hidden"] {
            expected = net.layer(name).unwrap().forward(&[&expected]);
        }
        let left = net
            .layer("left_act")
            .unwrap()
            .forward(&[&net.layer("left").unwrap().forward(&[&expected])]);
        let right = net
            .layer("right_act")
            .unwrap()
            .forward(&[&net.layer("right").unwrap().forward(&[&expected])]);
        let merge = net.layer("merge").unwrap().forward(&[&left, &right]);
        let pi = net.layer("pi").unwrap().forward(&[&merge]);

        assert_eq!(acts["left_act"], left);
        assert_eq!(acts["right_act"], right);
        assert_eq!(acts["pi"], pi);
    }

    #[test]
    fn test_forward_deterministic() {
        let net = Network::build(&diamond_config(), "net", &ParamMap::new(), &mut rng()).unwrap();
        let mut sources = Activations::new();
        sources.insert("state".to_string(), row(&[0.1, 0.9]));
        let a = net.forward(&sources).unwrap();
        let b = net.forward(&sources).unwrap();
        assert_eq!(a["pi"], b["pi"]);
    }

    #[test]
    fn test_backward_matches_finite_difference() {
        let mut net =
            Network::build(&diamond_config(), "net", &ParamMap::new(), &mut rng()).unwrap();
        let state = row(&[0.4, -0.2]);
        let mut sources = Activations::new();
        sources.insert("state".to_string(), state.clone());
        let acts = net.forward(&sources).unwrap();

        let sink_grad = row(&[1.0, -0.5, 0.25]);
        let mut grads = HashMap::new();
        grads.insert("pi".to_string(), sink_grad.clone());
        // delta = 0 leaves parameters untouched, so the finite difference
        // below runs against the same weights
        let source_grads = net.train(&acts, grads, 0.0, 0.0).unwrap();
        let analytic = &source_grads["state"];

        let h = 1e-2f32;
        for i in 0..state.ncols() {
            let mut plus = state.clone();
            plus[[0, i]] += h;
            let mut minus = state.clone();
            minus[[0, i]] -= h;
            let objective = |s: Tensor| {
                let mut sources = Activations::new();
                sources.insert("state".to_string(), s);
                (net.forward(&sources).unwrap()["pi"].clone() * &sink_grad).sum()
            };
            let numeric = (objective(plus) - objective(minus)) / (2.0 * h);
            assert!(
                (numeric - analytic[[0, i]]).abs() < 1e-3,
                "element {}: numeric {} analytic {}",
                i,
                numeric,
                analytic[[0, i]]
            );
        }
    }

    #[test]
    fn test_topological_sort_of_shuffled_declaration() {
        // same graph as diamond_config but declared sinks-first
        let mut config = diamond_config();
        config.layers.reverse();
        let net = Network::build(&config, "net", &ParamMap::new(), &mut rng()).unwrap();
        let order = net.forward_order();
        let pos = |name: &str| order.iter().position(|&n| n == name).unwrap();
        assert!(pos("embed") < pos("hidden"));
        assert!(pos("hidden") < pos("left"));
        assert!(pos("hidden") < pos("right"));
        assert!(pos("left_act") < pos("merge"));
        assert!(pos("right_act") < pos("merge"));
        assert!(pos("merge") < pos("pi"));
    }

    #[test]
    fn test_cycle_is_a_construction_error() {
        let config = NetworkConfig::new()
            .layer(linear("a", 0.0, 1.0), &["b"])
            .layer(linear("b", 0.0, 1.0), &["a"]);
        let err = Network::build(&config, "net", &ParamMap::new(), &mut rng()).unwrap_err();
        assert!(matches!(err, NetworkError::Cycle(_)));
    }

    #[test]
    fn test_non_positive_temperature_is_rejected() {
        let config = NetworkConfig::new().layer(
            LayerConfig::Softmax {
                name: "pi".into(),
                temperature: 0.0,
            },
            &["state"],
        );
        let err = Network::build(&config, "net", &ParamMap::new(), &mut rng()).unwrap_err();
        assert!(matches!(err, NetworkError::NonPositiveTemperature { .. }));
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let net = Network::build(&diamond_config(), "net", &ParamMap::new(), &mut rng()).unwrap();
        let err = net.forward(&Activations::new()).unwrap_err();
        assert!(matches!(err, NetworkError::MissingSource(_)));
    }

    #[test]
    fn test_unknown_gradient_layer_is_an_error() {
        let mut net =
            Network::build(&diamond_config(), "net", &ParamMap::new(), &mut rng()).unwrap();
        let mut sources = Activations::new();
        sources.insert("state".to_string(), row(&[0.0, 0.0]));
        let acts = net.forward(&sources).unwrap();
        let mut grads = HashMap::new();
        grads.insert("nope".to_string(), row(&[1.0]));
        let err = net.train(&acts, grads, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, NetworkError::UnknownGradientLayer(_)));
    }

    #[test]
    fn test_interior_sink_sums_all_contributions() {
        // x → a → b, gradient supplied at both a (interior) and b (sink):
        // grad(a) = 10 + 1·3 = 13, grad(x) = 13·2 = 26
        let config = NetworkConfig::new()
            .layer(linear("a", 0.0, 2.0), &["x"])
            .layer(linear("b", 0.0, 3.0), &["a"]);
        let mut net = Network::build(&config, "net", &ParamMap::new(), &mut rng()).unwrap();
        let mut sources = Activations::new();
        sources.insert("x".to_string(), row(&[1.0]));
        let acts = net.forward(&sources).unwrap();

        let mut grads = HashMap::new();
        grads.insert("a".to_string(), row(&[10.0]));
        grads.insert("b".to_string(), row(&[1.0]));
        let source_grads = net.train(&acts, grads, 0.0, 0.0).unwrap();
        assert_eq!(source_grads["x"], row(&[26.0]));
    }

    #[test]
    fn test_validate_sizes() {
        let net = Network::build(&diamond_config(), "net", &ParamMap::new(), &mut rng()).unwrap();
        let sources = HashMap::from([("state".to_string(), 2)]);
        let sinks = HashMap::from([("pi".to_string(), 3)]);
        net.validate(&sources, &sinks).unwrap();

        let bad_sinks = HashMap::from([("pi".to_string(), 4)]);
        assert!(matches!(
            net.validate(&sources, &bad_sinks).unwrap_err(),
            NetworkError::SizeMismatch { .. }
        ));

        let err = net.validate(&HashMap::new(), &sinks).unwrap_err();
        assert!(matches!(err, NetworkError::DanglingInput { .. }));
    }

    #[test]
    fn test_sum_width_mismatch() {
        let config = NetworkConfig::new().layer(
            LayerConfig::Sum {
                name: "merge".into(),
            },
            &["a", "b"],
        );
        let net = Network::build(&config, "net", &ParamMap::new(), &mut rng()).unwrap();
        let sources = HashMap::from([("a".to_string(), 2), ("b".to_string(), 3)]);
        assert!(matches!(
            net.validate(&sources, &HashMap::new()).unwrap_err(),
            NetworkError::SizeMismatch { .. }
        ));
    }

    #[test]
    fn test_parameter_round_trip() {
        let config = diamond_config();
        let mut rng0 = rng();
        let net = Network::build(&config, "net", &ParamMap::new(), &mut rng0).unwrap();
        let params = net.parameters("net");
        assert!(params.contains_key("net.embed.w"));
        assert!(params.contains_key("net.embed.b"));

        // rebuilding from the exported spec and parameters reproduces the
        // forward outputs exactly
        let mut rng1 = SmallRng::seed_from_u64(7777);
        let rebuilt = Network::build(&net.spec(), "net", &params, &mut rng1).unwrap();
        let mut sources = Activations::new();
        sources.insert("state".to_string(), row(&[0.25, -0.5]));
        assert_eq!(
            net.forward(&sources).unwrap()["pi"],
            rebuilt.forward(&sources).unwrap()["pi"]
        );
    }

    #[test]
    fn test_param_shape_is_validated() {
        let mut params = ParamMap::new();
        params.insert("net.embed.w".to_string(), Tensor::zeros((3, 3)));
        let err = Network::build(&diamond_config(), "net", &params, &mut rng()).unwrap_err();
        assert!(matches!(err, NetworkError::ParamShape { .. }));
    }

    #[test]
    fn test_load_parameters_resets_traces() {
        let mut net =
            Network::build(&diamond_config(), "net", &ParamMap::new(), &mut rng()).unwrap();
        let snapshot = net.parameters("net");

        let mut sources = Activations::new();
        sources.insert("state".to_string(), row(&[1.0, 1.0]));
        let acts = net.forward(&sources).unwrap();
        let mut grads = HashMap::new();
        grads.insert("pi".to_string(), row(&[1.0, 0.0, 0.0]));
        net.train(&acts, grads, 0.1, 0.9).unwrap();

        net.load_parameters("net", &snapshot).unwrap();
        match net.layer("embed").unwrap() {
            Layer::Dense(dense) => {
                assert_eq!(dense.weights(), &snapshot["net.embed.w"]);
                assert!(dense.weights_trace().iter().all(|&v| v == 0.0));
            }
            _ => unreachable!(),
        }
    }
}
