//! Crossing counts for a fully ordered layering.
//!
//! Bilayer crossings are counted exactly with the Barth-Juenger-Mutzel accumulator tree. Edges
//! inside one layer, and nodes placed between a node and its north/south port dummies, get an
//! upper-bound estimate on top.

use narwhal_graphlib::{LayeredGraph, NodeId, NodeKind, PortId, PortSide};
use rustc_hash::FxHashMap as HashMap;

#[derive(Debug, Clone, Copy)]
pub struct CrossingsCounter<'g> {
    graph: &'g LayeredGraph,
}

impl<'g> CrossingsCounter<'g> {
    pub fn new(graph: &'g LayeredGraph) -> Self {
        Self { graph }
    }

    /// Sum over all adjacent layer pairs, plus the in-layer estimate of every layer when
    /// `in_layer` is set.
    pub fn count_all_crossings(&self, layers: &[Vec<NodeId>], in_layer: bool) -> usize {
        let mut total = 0;
        for pair in layers.windows(2) {
            total += self.count_crossings(&pair[0], &pair[1]);
        }
        if in_layer {
            for layer in layers {
                total += self.count_in_layer_crossings(layer);
            }
        }
        total
    }

    /// Exact number of straight-line crossings between edges from `left` to `right`.
    pub fn count_crossings(&self, left: &[NodeId], right: &[NodeId]) -> usize {
        if right.is_empty() {
            return 0;
        }
        let Some(&first_left) = left.first() else {
            return 0;
        };
        let left_layer = self.graph.node(first_left).layer;

        let (target_index, target_count) = self.index_targets(left_layer, right);
        if target_count < 2 {
            return 0;
        }

        let mut sequence: Vec<usize> = Vec::new();
        for &node in left {
            let n = self.graph.node(node);
            if n.is_order_fixed() {
                for &port in &n.ports {
                    let start = sequence.len();
                    self.push_targets(port, &target_index, &mut sequence);
                    sequence[start..].sort_unstable();
                }
            } else {
                let start = sequence.len();
                for &port in &n.ports {
                    self.push_targets(port, &target_index, &mut sequence);
                }
                sequence[start..].sort_unstable();
            }
        }

        let mut first_index: usize = 1;
        while first_index < target_count {
            first_index <<= 1;
        }
        let tree_size = 2 * first_index - 1;
        first_index -= 1;
        let mut tree: Vec<usize> = vec![0; tree_size];

        let mut crossings = 0;
        for target in sequence {
            let mut index = target + first_index;
            tree[index] += 1;
            while index > 0 {
                if index % 2 == 1 {
                    crossings += tree[index + 1];
                }
                index = (index - 1) >> 1;
                tree[index] += 1;
            }
        }
        crossings
    }

    /// Assigns target indices to right-layer ports with edges from `left_layer`. Order-fixed
    /// nodes index their north ports first, then the remaining ports against the clockwise
    /// order; free nodes share one index per node.
    fn index_targets(
        &self,
        left_layer: usize,
        right: &[NodeId],
    ) -> (HashMap<PortId, usize>, usize) {
        let mut target_index: HashMap<PortId, usize> = HashMap::default();
        let mut next = 0;
        let from_left = |port: PortId| {
            self.graph
                .predecessor_ports(port)
                .any(|p| self.graph.node(self.graph.port_node(p)).layer == left_layer)
        };

        for &node in right {
            let n = self.graph.node(node);
            if n.is_order_fixed() {
                let north = n
                    .ports
                    .iter()
                    .filter(|&&p| self.graph.port(p).side == PortSide::North);
                let rest = n
                    .ports
                    .iter()
                    .rev()
                    .filter(|&&p| self.graph.port(p).side != PortSide::North);
                for &port in north.chain(rest) {
                    if from_left(port) {
                        target_index.insert(port, next);
                        next += 1;
                    }
                }
            } else {
                let mut used = false;
                for &port in &n.ports {
                    if from_left(port) {
                        target_index.insert(port, next);
                        used = true;
                    }
                }
                if used {
                    next += 1;
                }
            }
        }
        (target_index, next)
    }

    fn push_targets(
        &self,
        port: PortId,
        target_index: &HashMap<PortId, usize>,
        sequence: &mut Vec<usize>,
    ) {
        for target in self.graph.successor_ports(port) {
            if let Some(&ix) = target_index.get(&target) {
                sequence.push(ix);
            }
        }
    }

    /// Upper-bound estimate for crossings caused by edges between two east ports or two west
    /// ports of the same layer, plus [`Self::count_north_south_crossings`].
    ///
    /// East ports are numbered top-down and west ports bottom-up, each number advancing by the
    /// port's degree (free nodes share the node total). An in-layer edge spanning from number
    /// `i` to number `j > i` is charged `j - i - 1`; each port pays only for its longest such
    /// edge.
    pub fn count_in_layer_crossings(&self, layer: &[NodeId]) -> usize {
        let east = self.number_side(layer.iter().copied(), PortSide::East);
        let west = self.number_side(layer.iter().rev().copied(), PortSide::West);
        let east_west = charge_side(self.graph, &east) + charge_side(self.graph, &west);
        east_west + self.count_north_south_crossings(layer)
    }

    /// Estimate for nodes placed between a normal node and its north/south port dummies.
    ///
    /// Dummies above a unit's normal node are its northern dummies, those below are southern.
    /// Each dummy gets the running sum of crossing hints on its side. A node outside the unit
    /// pays the hints of the northern dummies above it, or of the southern dummies below it.
    /// Returns 0 unless every normal node and north/south dummy has a layout unit.
    pub fn count_north_south_crossings(&self, layer: &[NodeId]) -> usize {
        let mut totals: HashMap<NodeId, (usize, usize)> = HashMap::default();
        let mut dummy_index: HashMap<NodeId, usize> = HashMap::default();

        let mut current: Option<NodeId> = None;
        let (mut north, mut south) = (0, 0);
        let mut northern = true;
        for &node in layer {
            let n = self.graph.node(node);
            if !matches!(n.kind, NodeKind::Normal | NodeKind::NorthSouthPort) {
                continue;
            }
            let Some(unit) = n.layout_unit else {
                return 0;
            };
            if current != Some(unit) {
                if let Some(previous) = current {
                    totals.insert(previous, (north, south));
                }
                current = Some(unit);
                north = 0;
                south = 0;
                northern = true;
            }
            if node == unit {
                northern = false;
            }
            if northern {
                north += n.crossing_hint();
                dummy_index.insert(node, north);
            } else {
                south += n.crossing_hint();
                dummy_index.insert(node, south);
            }
        }
        if let Some(previous) = current {
            totals.insert(previous, (north, south));
        }

        let mut crossings = 0;
        let mut last_unit: Option<NodeId> = None;
        let mut last_index = 0;
        let mut dummy_count = 0;
        northern = true;
        for &node in layer {
            let n = self.graph.node(node);
            match n.kind {
                NodeKind::Normal | NodeKind::NorthSouthPort => {
                    last_index = dummy_index.get(&node).copied().unwrap_or(0);
                    let unit = n.layout_unit;
                    let (unit_north, unit_south) = unit
                        .and_then(|u| totals.get(&u).copied())
                        .unwrap_or((0, 0));
                    if n.kind == NodeKind::Normal {
                        dummy_count = unit_south;
                        last_unit = unit;
                        northern = false;
                    } else if unit != last_unit {
                        dummy_count = unit_north;
                        last_unit = unit;
                        northern = true;
                    }
                }
                _ => {
                    crossings += if northern {
                        last_index
                    } else {
                        dummy_count.saturating_sub(last_index)
                    };
                }
            }
        }
        crossings
    }

    fn number_side(
        &self,
        nodes: impl Iterator<Item = NodeId>,
        side: PortSide,
    ) -> HashMap<PortId, usize> {
        let mut numbers: HashMap<PortId, usize> = HashMap::default();
        let mut current = 0;
        for node in nodes {
            let n = self.graph.node(node);
            if n.is_order_fixed() {
                for port in self.graph.ports_on_side(node, side) {
                    current += self.graph.port(port).degree();
                    numbers.insert(port, current);
                }
            } else {
                let ports: Vec<PortId> = self.graph.ports_on_side(node, side).collect();
                current += ports
                    .iter()
                    .map(|&p| self.graph.port(p).degree())
                    .sum::<usize>();
                for port in ports {
                    numbers.insert(port, current);
                }
            }
        }
        numbers
    }
}

fn charge_side(graph: &LayeredGraph, numbers: &HashMap<PortId, usize>) -> usize {
    let mut total = 0;
    for (&port, &number) in numbers {
        let longest = graph
            .connected_ports(port)
            .filter_map(|other| numbers.get(&other))
            .filter(|&&other| number > other)
            .map(|&other| number - other - 1)
            .max()
            .unwrap_or(0);
        total += longest;
    }
    total
}
