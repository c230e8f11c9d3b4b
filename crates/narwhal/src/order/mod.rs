//! In-layer ordering: barycenter heuristic, constraint resolution, crossing counting and the
//! layer sweep that ties them together.

pub mod barycenter;
pub mod constraints;
pub mod cross_count;
pub mod node_group;
pub mod port_ranks;
pub mod sweep;

pub use barycenter::{BarycenterHeuristic, fill_in_unknown_barycenters, randomize_barycenters};
pub use constraints::ForsterConstraintResolver;
pub use cross_count::CrossingsCounter;
pub use node_group::{GroupIx, NodeGroup, NodeGroups};
pub use port_ranks::{PortRanks, PortType};
pub use sweep::{CrossMinResult, LayerSweepCrossingMinimizer};
