#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("node id is already in use: {id}")]
    DuplicateNode { id: String },

    #[error("unknown node: {id}")]
    UnknownNode { id: String },

    #[error("{kind} index {index} is out of range")]
    DanglingIndex { kind: &'static str, index: usize },

    #[error("unknown layer {layer} (graph has {layer_count} layers)")]
    UnknownLayer { layer: usize, layer_count: usize },

    #[error(
        "edge {edge} connects layer {source_layer} to layer {target_layer}; edges must connect a layer to the next one or stay inside one layer"
    )]
    NonAdjacentEdge {
        edge: usize,
        source_layer: usize,
        target_layer: usize,
    },

    #[error("constraint from {from} to {to} crosses layers")]
    ConstraintCrossesLayers { from: String, to: String },

    #[error("layer {layer} must list node {node} exactly once")]
    LayerMembership { layer: usize, node: String },

    #[error("node {node} must list port {port} exactly once")]
    PortListing { node: String, port: usize },

    #[error("order given for layer {layer} is not a permutation of its nodes")]
    NotAPermutation { layer: usize },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
