//! Forster-style resolution of in-layer ordering constraints.
//!
//! The constraint graph combines explicit successor constraints with layout units: between two
//! consecutive normal nodes of the barycenter-sorted layer, every member of the first node's unit
//! must precede every member of the second node's unit. Violated constraints are fixed by merging
//! the offending pair into one group, placed so the sequence stays sorted.

use super::node_group::{GroupIx, NodeGroups};
use narwhal_graphlib::{LayeredGraph, NodeId, NodeKind};
use std::collections::VecDeque;

const BARYCENTER_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct ForsterConstraintResolver<'g> {
    graph: &'g LayeredGraph,
}

impl<'g> ForsterConstraintResolver<'g> {
    pub fn new(graph: &'g LayeredGraph) -> Self {
        Self { graph }
    }

    /// Merges groups until no constraint is violated. `groups` must be sorted by barycenter and
    /// consist of single-node groups. Returns the number of merges.
    pub fn process_constraints(&self, groups: &mut NodeGroups) -> usize {
        self.build_constraints_graph(groups);

        let mut merges = 0;
        while let Some((first, second)) = find_violated_constraint(groups) {
            handle_violated_constraint(groups, first, second);
            merges += 1;
        }
        merges
    }

    fn build_constraints_graph(&self, groups: &mut NodeGroups) {
        let sequence = groups.sequence().to_vec();
        for &ix in &sequence {
            groups.get_mut(ix).reset_constraints();
        }

        let Some(&first) = sequence.first() else {
            return;
        };
        let layer = self.graph.node(groups.get(first).node()).layer;
        let mut layout_units = self.graph.layout_units(layer);
        for members in layout_units.values_mut() {
            members.sort_by_cached_key(|&v| groups.group_of(v).and_then(|g| groups.position(g)));
        }

        let mut last_non_dummy: Option<NodeId> = None;
        for &ix in &sequence {
            let node = groups.get(ix).node();
            let n = self.graph.node(node);

            for &successor in &n.successor_constraints {
                let Some(successor_group) = groups.group_of(successor) else {
                    continue;
                };
                groups.add_constraint(ix, successor_group);
            }

            if n.kind != NodeKind::Normal {
                continue;
            }
            if let Some(last) = last_non_dummy {
                let empty = Vec::new();
                let last_unit = layout_units.get(&last).unwrap_or(&empty);
                let current_unit = layout_units.get(&node).unwrap_or(&empty);
                for &from in last_unit {
                    for &to in current_unit {
                        if let (Some(a), Some(b)) = (groups.group_of(from), groups.group_of(to)) {
                            groups.add_constraint(a, b);
                        }
                    }
                }
            }
            last_non_dummy = Some(node);
        }
    }
}

/// Topological sweep from the constraint sources. Returns the first `(predecessor, successor)`
/// pair where the predecessor sits after its successor.
fn find_violated_constraint(groups: &mut NodeGroups) -> Option<(GroupIx, GroupIx)> {
    let sequence = groups.sequence().to_vec();
    let mut active: VecDeque<GroupIx> = VecDeque::new();
    for &ix in &sequence {
        let g = groups.get_mut(ix);
        g.incoming.clear();
        if g.has_outgoing_constraints() && g.incoming_count == 0 {
            active.push_back(ix);
        }
    }

    let position = |ix: GroupIx| sequence.iter().position(|&g| g == ix);
    while let Some(ix) = active.pop_front() {
        let bary = groups.barycenter(ix).unwrap_or(0.0);
        for &pred in &groups.get(ix).incoming {
            let pred_bary = groups.barycenter(pred).unwrap_or(0.0);
            // Barycenters equal at single precision count as a tie.
            let violated = if pred_bary as f32 == bary as f32 {
                position(pred) > position(ix)
            } else {
                pred_bary > bary
            };
            if violated {
                return Some((pred, ix));
            }
        }

        let successors = groups.get(ix).outgoing.clone();
        for successor in successors {
            let s = groups.get_mut(successor);
            s.incoming.insert(0, ix);
            if s.incoming_count == s.incoming.len() {
                active.push_back(successor);
            }
        }
    }
    None
}

fn handle_violated_constraint(groups: &mut NodeGroups, first: GroupIx, second: GroupIx) {
    let merged = groups.merge(first, second);
    let merged_bary = groups.barycenter(merged).unwrap_or(0.0);
    debug_assert!(
        merged_bary + BARYCENTER_EPSILON >= groups.barycenter(second).unwrap_or(merged_bary),
        "merged barycenter fell below the successor's"
    );
    debug_assert!(
        merged_bary - BARYCENTER_EPSILON <= groups.barycenter(first).unwrap_or(merged_bary),
        "merged barycenter rose above the predecessor's"
    );
    tracing::trace!(
        first = first.index(),
        second = second.index(),
        barycenter = merged_bary,
        "merged constraint-violating node groups"
    );

    let old = std::mem::take(groups.sequence_mut());
    let mut next: Vec<GroupIx> = Vec::with_capacity(old.len() - 1);
    let mut inserted = false;
    for ix in old {
        if ix == first || ix == second {
            continue;
        }
        if !inserted && groups.barycenter(ix).unwrap_or(0.0) > merged_bary {
            next.push(merged);
            inserted = true;
        }
        let g = groups.get_mut(ix);
        let before = g.outgoing.len();
        g.outgoing.retain(|&c| c != first && c != second);
        if g.outgoing.len() != before {
            g.outgoing.push(merged);
            groups.get_mut(merged).incoming_count += 1;
        }
        next.push(ix);
    }
    if !inserted {
        next.push(merged);
    }
    *groups.sequence_mut() = next;
}
