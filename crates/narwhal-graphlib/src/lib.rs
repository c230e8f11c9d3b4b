//! Layered graph container used by `narwhal`.
//!
//! A [`LayeredGraph`] holds an ordered list of layers, the nodes assigned to them, each node's
//! ports (kept in clockwise side order) and the edges between ports. Layer membership is fixed
//! by the time a graph reaches the crossing minimizer; only the order inside a layer changes.

#![forbid(unsafe_code)]

mod error;
mod graph;

pub use error::{Error, Result};
pub use graph::{
    Edge, EdgeId, LayeredGraph, Node, NodeId, NodeKind, Port, PortConstraints, PortId, PortSide,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
