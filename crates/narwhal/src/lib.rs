//! Crossing minimization for layered graph drawings.
//!
//! Given a [`LayeredGraph`](graphlib::LayeredGraph) whose edges connect adjacent layers, the
//! layer sweep reorders every layer with the barycenter heuristic, repairs in-layer ordering
//! constraints by merging node groups, and keeps the layering with the fewest crossings.

#![forbid(unsafe_code)]

pub use narwhal_graphlib as graphlib;

mod error;
mod options;
pub mod order;
pub mod random;

pub use error::{Error, Result};
pub use options::CrossMinOptions;
pub use order::{CrossMinResult, LayerSweepCrossingMinimizer};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Validates `graph`, minimizes crossings and writes the resulting layer orders back.
pub fn minimize_crossings(
    graph: &mut graphlib::LayeredGraph,
    options: &CrossMinOptions,
) -> Result<CrossMinResult> {
    options.validate()?;
    graph.validate()?;
    let result = LayerSweepCrossingMinimizer::new(graph, options).minimize();
    result.apply_to(graph)?;
    Ok(result)
}
