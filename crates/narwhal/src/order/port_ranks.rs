//! Port ranks: per-port positions of the fixed layer, relative to the node they sit on.
//!
//! Every node of a layer occupies the interval `[rank_sum, rank_sum + 1)`. Order-fixed nodes
//! spread their relevant ports evenly over the interval; free nodes give every relevant port of a
//! side the same value.

use crate::error::Error;
use narwhal_graphlib::{LayeredGraph, NodeId, PortId, PortSide};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortType {
    /// Ports with incoming edges.
    Input,
    /// Ports with outgoing edges.
    Output,
}

impl FromStr for PortType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "input" => Ok(PortType::Input),
            "output" => Ok(PortType::Output),
            _ => Err(Error::InvalidPortType {
                value: s.to_string(),
            }),
        }
    }
}

// Free ports: fixed offsets inside the node's interval. Inputs scan N, W, S, E; outputs N, E, S, W.
const INCR_ONE: f64 = 0.2;
const INCR_TWO: f64 = 0.4;
const INCR_THREE: f64 = 0.6;
const INCR_FOUR: f64 = 0.8;

fn free_port_incr(port_type: PortType, side: PortSide) -> f64 {
    match (port_type, side) {
        (_, PortSide::North) => INCR_ONE,
        (PortType::Input, PortSide::West) | (PortType::Output, PortSide::East) => INCR_TWO,
        (_, PortSide::South) => INCR_THREE,
        (PortType::Input, PortSide::East) | (PortType::Output, PortSide::West) => INCR_FOUR,
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortRanks {
    ranks: Vec<f64>,
}

impl PortRanks {
    pub fn new(port_count: usize) -> Self {
        Self {
            ranks: vec![0.0; port_count],
        }
    }

    pub fn get(&self, port: PortId) -> f64 {
        self.ranks[port.index()]
    }

    /// Ranks the relevant ports of every node in `layer`, nodes taking consecutive intervals.
    pub fn calculate_layer(&mut self, graph: &LayeredGraph, layer: &[NodeId], port_type: PortType) {
        if self.ranks.len() < graph.port_count() {
            self.ranks.resize(graph.port_count(), 0.0);
        }
        let mut rank_sum = 0.0;
        for &node in layer {
            rank_sum += self.calculate_node(graph, node, rank_sum, port_type);
        }
    }

    /// Ranks the relevant ports of `node` starting at `rank_sum` and returns how far the next
    /// node's interval starts: 1, or 0 for a node without relevant ports.
    pub fn calculate_node(
        &mut self,
        graph: &LayeredGraph,
        node: NodeId,
        rank_sum: f64,
        port_type: PortType,
    ) -> f64 {
        let n = graph.node(node);
        let relevant: Vec<PortId> = n
            .ports
            .iter()
            .copied()
            .filter(|&p| is_relevant(graph, p, port_type))
            .collect();
        if relevant.is_empty() {
            return 0.0;
        }

        if !n.is_order_fixed() {
            for p in relevant {
                self.ranks[p.index()] = rank_sum + free_port_incr(port_type, graph.port(p).side);
            }
            return 1.0;
        }

        let incr = 1.0 / (relevant.len() as f64 + 1.0);
        match port_type {
            PortType::Input => {
                // Inputs are ranked counter-clockwise from the north-east corner: north ports
                // take the low end of the interval, the other sides follow in W, S, E order.
                let north_count = relevant
                    .iter()
                    .filter(|&&p| graph.port(p).side == PortSide::North)
                    .count();
                let mut north_pos = rank_sum + north_count as f64 * incr;
                let mut rest_pos = rank_sum + 1.0 - incr;
                for p in relevant {
                    if graph.port(p).side == PortSide::North {
                        self.ranks[p.index()] = north_pos;
                        north_pos -= incr;
                    } else {
                        self.ranks[p.index()] = rest_pos;
                        rest_pos -= incr;
                    }
                }
            }
            PortType::Output => {
                let mut pos = rank_sum + incr;
                for p in relevant {
                    self.ranks[p.index()] = pos;
                    pos += incr;
                }
            }
        }
        1.0
    }
}

fn is_relevant(graph: &LayeredGraph, port: PortId, port_type: PortType) -> bool {
    let p = graph.port(port);
    match port_type {
        PortType::Input => p.has_incoming(),
        PortType::Output => p.has_outgoing(),
    }
}
