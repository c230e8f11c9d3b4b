//! Barycenter ordering of one free layer against its fixed neighbor layer.

use super::constraints::ForsterConstraintResolver;
use super::node_group::{GroupIx, NodeGroups};
use super::port_ranks::PortRanks;
use crate::random::XorShift64Star;
use narwhal_graphlib::{LayeredGraph, NodeId};

/// Width of the tie-break perturbation added to a group's summed weight.
const RANDOM_AMOUNT: f64 = 0.07;

#[derive(Debug, Clone, Copy)]
enum Contribution {
    /// Rank of a port in the fixed layer.
    Rank(f64),
    /// Weight and degree of another group in the same layer.
    Group(GroupIx),
}

#[derive(Debug)]
struct Frame {
    group: GroupIx,
    contributions: Vec<Contribution>,
    next: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct BarycenterHeuristic<'g> {
    graph: &'g LayeredGraph,
    resolver: ForsterConstraintResolver<'g>,
}

impl<'g> BarycenterHeuristic<'g> {
    pub fn new(graph: &'g LayeredGraph) -> Self {
        Self {
            graph,
            resolver: ForsterConstraintResolver::new(graph),
        }
    }

    /// Reorders `layer` in place and returns the number of constraint merges it took.
    ///
    /// `forward` selects the fixed layer: predecessors when sweeping forward, successors when
    /// sweeping backward. `ranks` must hold the fixed layer's port ranks.
    pub fn minimize_crossings(
        &self,
        layer: &mut [NodeId],
        ranks: &PortRanks,
        pre_ordered: bool,
        randomize: bool,
        forward: bool,
        rng: &mut XorShift64Star,
    ) -> usize {
        let groups = self.order_groups(layer, ranks, pre_ordered, randomize, forward, rng);
        let merges = layer.len() - groups.len();
        layer.copy_from_slice(&groups.node_order());
        merges
    }

    /// Like [`Self::minimize_crossings`], but hands back the resolved groups instead of writing
    /// the order.
    pub fn order_groups(
        &self,
        layer: &[NodeId],
        ranks: &PortRanks,
        pre_ordered: bool,
        randomize: bool,
        forward: bool,
        rng: &mut XorShift64Star,
    ) -> NodeGroups {
        let mut groups = NodeGroups::new(layer);
        if randomize {
            randomize_barycenters(&mut groups, rng);
        } else {
            self.calculate_barycenters(&mut groups, ranks, forward, rng);
            fill_in_unknown_barycenters(&mut groups, pre_ordered, rng);
        }

        if groups.len() > 1 {
            groups.stable_sort_by_barycenter();
            self.resolver.process_constraints(&mut groups);
        }
        groups
    }

    /// Computes the barycenter of every group, visiting groups in their current order.
    pub fn calculate_barycenters(
        &self,
        groups: &mut NodeGroups,
        ranks: &PortRanks,
        forward: bool,
        rng: &mut XorShift64Star,
    ) {
        groups.reset_visited();
        let sequence = groups.sequence().to_vec();
        for ix in sequence {
            self.calculate_barycenter(groups, ix, ranks, forward, rng);
        }
    }

    /// Depth-first over same-layer links with an explicit stack. A group reached again while
    /// it is still open contributes its partial sums.
    fn calculate_barycenter(
        &self,
        groups: &mut NodeGroups,
        start: GroupIx,
        ranks: &PortRanks,
        forward: bool,
        rng: &mut XorShift64Star,
    ) {
        if groups.get(start).visited {
            return;
        }
        open_group(groups, start);
        let mut stack = vec![Frame {
            group: start,
            contributions: self.contributions(groups, start, ranks, forward),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let group = frame.group;
            if frame.next < frame.contributions.len() {
                let contribution = frame.contributions[frame.next];
                frame.next += 1;
                match contribution {
                    Contribution::Rank(rank) => {
                        let g = groups.get_mut(group);
                        g.summed_weight += rank;
                        g.degree += 1;
                    }
                    Contribution::Group(other) if groups.get(other).visited => {
                        fold_into(groups, group, other);
                    }
                    Contribution::Group(other) => {
                        open_group(groups, other);
                        let contributions = self.contributions(groups, other, ranks, forward);
                        stack.push(Frame {
                            group: other,
                            contributions,
                            next: 0,
                        });
                    }
                }
            } else {
                stack.pop();
                close_group(groups, group, rng);
                if let Some(parent) = stack.last() {
                    fold_into(groups, parent.group, group);
                }
            }
        }
    }

    fn contributions(
        &self,
        groups: &NodeGroups,
        ix: GroupIx,
        ranks: &PortRanks,
        forward: bool,
    ) -> Vec<Contribution> {
        // Ranks come first so an open group already carries its fixed-layer weight when a
        // same-layer cycle leads back to it.
        let mut out = Vec::new();
        let mut links = Vec::new();
        for &node in groups.get(ix).nodes() {
            let n = self.graph.node(node);
            for &port in &n.ports {
                let p = self.graph.port(port);
                let edges = if forward { &p.incoming } else { &p.outgoing };
                for &e in edges {
                    let edge = self.graph.edge(e);
                    let fixed_port = if forward { edge.source } else { edge.target };
                    let fixed_node = self.graph.port_node(fixed_port);
                    if self.graph.node(fixed_node).layer != n.layer {
                        out.push(Contribution::Rank(ranks.get(fixed_port)));
                    } else if fixed_node != node {
                        if let Some(other) = groups.group_of(fixed_node) {
                            links.push(Contribution::Group(other));
                        }
                    }
                }
            }

            for &associate in &n.barycenter_associates {
                if associate == node || self.graph.node(associate).layer != n.layer {
                    continue;
                }
                if let Some(other) = groups.group_of(associate) {
                    links.push(Contribution::Group(other));
                }
            }
        }
        out.append(&mut links);
        out
    }
}

fn open_group(groups: &mut NodeGroups, ix: GroupIx) {
    let g = groups.get_mut(ix);
    g.visited = true;
    g.degree = 0;
    g.summed_weight = 0.0;
    g.barycenter = None;
}

fn close_group(groups: &mut NodeGroups, ix: GroupIx, rng: &mut XorShift64Star) {
    let g = groups.get_mut(ix);
    if g.degree > 0 {
        g.summed_weight += rng.next_f64() * RANDOM_AMOUNT - RANDOM_AMOUNT / 2.0;
        g.barycenter = Some(g.summed_weight / g.degree as f64);
    }
}

fn fold_into(groups: &mut NodeGroups, into: GroupIx, from: GroupIx) {
    let (degree, weight) = {
        let g = groups.get(from);
        (g.degree, g.summed_weight)
    };
    let g = groups.get_mut(into);
    g.degree += degree;
    g.summed_weight += weight;
}

/// Resolves groups whose barycenter is still undefined.
///
/// For a pre-ordered layer each gap takes the midpoint of its defined neighbors (the value before
/// the first defined one is `-1`, and a gap at the end sits one past the last defined value).
/// Otherwise gaps get uniformly random values in `[-1, max + 1)`.
pub fn fill_in_unknown_barycenters(
    groups: &mut NodeGroups,
    pre_ordered: bool,
    rng: &mut XorShift64Star,
) {
    let sequence = groups.sequence().to_vec();
    if pre_ordered {
        let mut last_value = -1.0;
        for (pos, &ix) in sequence.iter().enumerate() {
            let value = match groups.barycenter(ix) {
                Some(value) => value,
                None => {
                    let next_value = sequence[pos + 1..]
                        .iter()
                        .find_map(|&g| groups.barycenter(g))
                        .unwrap_or(last_value + 1.0);
                    let value = (last_value + next_value) / 2.0;
                    groups.get_mut(ix).set_barycenter(value);
                    value
                }
            };
            last_value = value;
        }
    } else {
        let max_bary = sequence
            .iter()
            .filter_map(|&g| groups.barycenter(g))
            .fold(0.0_f64, f64::max)
            + 2.0;
        for ix in sequence {
            if groups.barycenter(ix).is_none() {
                let value = rng.next_f64() * max_bary - 1.0;
                groups.get_mut(ix).set_barycenter(value);
            }
        }
    }
}

/// Gives every single-node group a uniformly random barycenter in `[0, 1)`.
pub fn randomize_barycenters(groups: &mut NodeGroups, rng: &mut XorShift64Star) {
    let sequence = groups.sequence().to_vec();
    for ix in sequence {
        if groups.get(ix).is_compound() {
            continue;
        }
        let value = rng.next_f64();
        groups.get_mut(ix).set_barycenter(value);
    }
}
