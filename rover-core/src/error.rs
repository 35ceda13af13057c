//! Errors in the library.
use thiserror::Error;

/// Errors raised while building or running a [`Network`](crate::Network).
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The layer graph contains a cycle.
    #[error("network graph is cyclic, unresolved layers: {0}")]
    Cycle(String),

    /// Two layers share the same name.
    #[error("duplicate layer name \"{0}\"")]
    DuplicateLayer(String),

    /// A layer declares no inputs or the wrong number of inputs.
    #[error("layer \"{layer}\" requires {expected} input(s), {actual} declared")]
    InputArity {
        /// Layer name.
        layer: String,
        /// Required number of inputs.
        expected: String,
        /// Declared number of inputs.
        actual: usize,
    },

    /// A source label has no size specification.
    #[error("input \"{input}\" of layer \"{layer}\" does not resolve to a layer or a sized source")]
    DanglingInput {
        /// Consumer layer name.
        layer: String,
        /// Unresolved input label.
        input: String,
    },

    /// Softmax temperature must be strictly positive.
    #[error("softmax layer \"{layer}\" requires a positive temperature ({temperature})")]
    NonPositiveTemperature {
        /// Layer name.
        layer: String,
        /// Offending temperature value.
        temperature: f32,
    },

    /// Layer widths do not agree.
    #[error("layer \"{layer}\" size must be {expected} ({actual})")]
    SizeMismatch {
        /// Layer name.
        layer: String,
        /// Expected width.
        expected: usize,
        /// Actual width.
        actual: usize,
    },

    /// A requested output does not correspond to a network layer.
    #[error("output \"{0}\" does not correspond to a network layer")]
    UnknownSink(String),

    /// A gradient was supplied for an unknown layer.
    #[error("gradient supplied for unknown layer \"{0}\"")]
    UnknownGradientLayer(String),

    /// A forward pass is missing a required external source.
    #[error("missing external source \"{0}\"")]
    MissingSource(String),

    /// A train pass received an activation map without a required entry.
    #[error("missing activation for \"{0}\"")]
    MissingActivation(String),

    /// A persisted parameter has the wrong shape.
    #[error("parameter \"{key}\" must have shape {expected:?} ({actual:?})")]
    ParamShape {
        /// Parameter key.
        key: String,
        /// Expected shape.
        expected: [usize; 2],
        /// Actual shape.
        actual: [usize; 2],
    },
}

/// Errors raised by typed access to a [`Record`](crate::record::Record).
#[derive(Error, Debug)]
pub enum RecordError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}
