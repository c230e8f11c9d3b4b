//! Node groups: the units the barycenter heuristic sorts and the constraint resolver merges.
//!
//! All groups of one layer live in a [`NodeGroups`] arena addressed by [`GroupIx`]. A merge
//! appends a compound record; the two merged records stay in the arena but leave the sequence.

use narwhal_graphlib::NodeId;
use rustc_hash::FxHashMap as HashMap;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupIx(usize);

impl GroupIx {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct NodeGroup {
    nodes: Vec<NodeId>,
    pub barycenter: Option<f64>,
    pub summed_weight: f64,
    pub degree: usize,
    pub(crate) visited: bool,
    pub(crate) outgoing: Vec<GroupIx>,
    pub(crate) incoming: Vec<GroupIx>,
    pub(crate) incoming_count: usize,
}

impl NodeGroup {
    fn single(node: NodeId) -> Self {
        Self {
            nodes: vec![node],
            barycenter: None,
            summed_weight: 0.0,
            degree: 0,
            visited: false,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            incoming_count: 0,
        }
    }

    /// Wrapped nodes in placement order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The first wrapped node; the only one for groups that were never merged.
    pub fn node(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn is_compound(&self) -> bool {
        self.nodes.len() > 1
    }

    /// Sets a barycenter that counts as a single contribution of `value`.
    pub fn set_barycenter(&mut self, value: f64) {
        self.barycenter = Some(value);
        self.summed_weight = value;
        self.degree = 1;
    }

    pub fn outgoing_constraints(&self) -> &[GroupIx] {
        &self.outgoing
    }

    pub fn has_outgoing_constraints(&self) -> bool {
        !self.outgoing.is_empty()
    }

    pub fn incoming_constraints_count(&self) -> usize {
        self.incoming_count
    }

    pub(crate) fn reset_constraints(&mut self) {
        self.outgoing.clear();
        self.incoming.clear();
        self.incoming_count = 0;
    }

    fn sort_key(&self) -> f64 {
        self.barycenter.unwrap_or(f64::NEG_INFINITY)
    }
}

/// The node groups of one layer plus their current sequence.
#[derive(Debug, Clone)]
pub struct NodeGroups {
    arena: Vec<NodeGroup>,
    sequence: Vec<GroupIx>,
    by_node: HashMap<NodeId, GroupIx>,
}

impl NodeGroups {
    /// One group per node, in layer order.
    pub fn new(layer: &[NodeId]) -> Self {
        let mut by_node: HashMap<NodeId, GroupIx> = HashMap::default();
        by_node.reserve(layer.len());
        let mut arena = Vec::with_capacity(layer.len());
        let mut sequence = Vec::with_capacity(layer.len());
        for (ix, &v) in layer.iter().enumerate() {
            arena.push(NodeGroup::single(v));
            sequence.push(GroupIx(ix));
            by_node.insert(v, GroupIx(ix));
        }
        Self {
            arena,
            sequence,
            by_node,
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn sequence(&self) -> &[GroupIx] {
        &self.sequence
    }

    pub fn get(&self, ix: GroupIx) -> &NodeGroup {
        &self.arena[ix.0]
    }

    pub fn get_mut(&mut self, ix: GroupIx) -> &mut NodeGroup {
        &mut self.arena[ix.0]
    }

    /// The single-node group created for `node`. Merges do not update this mapping.
    pub fn group_of(&self, node: NodeId) -> Option<GroupIx> {
        self.by_node.get(&node).copied()
    }

    pub fn position(&self, ix: GroupIx) -> Option<usize> {
        self.sequence.iter().position(|&g| g == ix)
    }

    pub fn barycenter(&self, ix: GroupIx) -> Option<f64> {
        self.arena[ix.0].barycenter
    }

    pub fn stable_sort_by_barycenter(&mut self) {
        let arena = &self.arena;
        self.sequence
            .sort_by(|a, b| arena[a.0].sort_key().total_cmp(&arena[b.0].sort_key()));
    }

    pub fn is_sorted_by_barycenter(&self) -> bool {
        self.sequence.windows(2).all(|w| {
            self.arena[w[0].0]
                .sort_key()
                .partial_cmp(&self.arena[w[1].0].sort_key())
                != Some(Ordering::Greater)
        })
    }

    /// Reads the node order off the sequence, unwinding compound groups.
    pub fn node_order(&self) -> Vec<NodeId> {
        self.sequence
            .iter()
            .flat_map(|g| self.arena[g.0].nodes.iter().copied())
            .collect()
    }

    pub(crate) fn sequence_mut(&mut self) -> &mut Vec<GroupIx> {
        &mut self.sequence
    }

    pub(crate) fn reset_visited(&mut self) {
        for g in &mut self.arena {
            g.visited = false;
        }
    }

    /// Adds `from -> to` once; repeated additions are ignored.
    pub(crate) fn add_constraint(&mut self, from: GroupIx, to: GroupIx) {
        if self.arena[from.0].outgoing.contains(&to) {
            return;
        }
        self.arena[from.0].outgoing.push(to);
        self.arena[to.0].incoming_count += 1;
    }

    /// Creates the compound of `first` followed by `second`. The compound inherits the outgoing
    /// constraints of both, minus the ones between them; successors shared by both lose one
    /// incoming constraint. Its own incoming constraints are rewired by the caller.
    pub(crate) fn merge(&mut self, first: GroupIx, second: GroupIx) -> GroupIx {
        let (g1, g2) = (&self.arena[first.0], &self.arena[second.0]);

        let mut nodes = Vec::with_capacity(g1.nodes.len() + g2.nodes.len());
        nodes.extend_from_slice(&g1.nodes);
        nodes.extend_from_slice(&g2.nodes);

        let mut outgoing: Vec<GroupIx> =
            g1.outgoing.iter().copied().filter(|&c| c != second).collect();
        let mut shared: Vec<GroupIx> = Vec::new();
        for &c in &g2.outgoing {
            if c == first {
                continue;
            }
            if outgoing.contains(&c) {
                shared.push(c);
            } else {
                outgoing.push(c);
            }
        }

        let summed_weight = g1.summed_weight + g2.summed_weight;
        let degree = g1.degree + g2.degree;
        let barycenter = if degree > 0 {
            Some(summed_weight / degree as f64)
        } else {
            match (g1.barycenter, g2.barycenter) {
                (Some(a), Some(b)) => Some((a + b) / 2.0),
                (a, b) => a.or(b),
            }
        };

        for c in shared {
            let count = &mut self.arena[c.0].incoming_count;
            *count = count.saturating_sub(1);
        }

        let ix = GroupIx(self.arena.len());
        self.arena.push(NodeGroup {
            nodes,
            barycenter,
            summed_weight,
            degree,
            visited: false,
            outgoing,
            incoming: Vec::new(),
            incoming_count: 0,
        });
        ix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<NodeId> {
        (0..n).map(NodeId).collect()
    }

    #[test]
    fn merge_concatenates_nodes_and_blends_barycenters() {
        let mut groups = NodeGroups::new(&ids(3));
        let [a, b, c] = [GroupIx(0), GroupIx(1), GroupIx(2)];
        groups.get_mut(a).set_barycenter(3.0);
        groups.get_mut(b).set_barycenter(1.0);
        groups.add_constraint(a, b);
        groups.add_constraint(a, c);
        groups.add_constraint(b, c);
        assert_eq!(groups.get(c).incoming_count, 2);

        let m = groups.merge(a, b);
        let merged = groups.get(m);
        assert_eq!(merged.nodes(), &[NodeId(0), NodeId(1)]);
        assert_eq!(merged.barycenter, Some(2.0));
        assert_eq!(merged.degree, 2);
        assert_eq!(merged.outgoing_constraints(), &[c]);
        assert_eq!(groups.get(c).incoming_count, 1);
    }

    #[test]
    fn merge_without_degree_averages_known_barycenters() {
        let mut groups = NodeGroups::new(&ids(2));
        groups.get_mut(GroupIx(0)).barycenter = Some(4.0);
        groups.get_mut(GroupIx(1)).barycenter = Some(2.0);
        let m = groups.merge(GroupIx(0), GroupIx(1));
        assert_eq!(groups.barycenter(m), Some(3.0));

        let mut groups = NodeGroups::new(&ids(2));
        groups.get_mut(GroupIx(1)).barycenter = Some(2.0);
        let m = groups.merge(GroupIx(0), GroupIx(1));
        assert_eq!(groups.barycenter(m), Some(2.0));
    }

    #[test]
    fn add_constraint_ignores_duplicates() {
        let mut groups = NodeGroups::new(&ids(2));
        groups.add_constraint(GroupIx(0), GroupIx(1));
        groups.add_constraint(GroupIx(0), GroupIx(1));
        assert_eq!(groups.get(GroupIx(0)).outgoing_constraints().len(), 1);
        assert_eq!(groups.get(GroupIx(1)).incoming_constraints_count(), 1);
    }

    #[test]
    fn stable_sort_keeps_ties_in_prior_order() {
        let mut groups = NodeGroups::new(&ids(4));
        for (ix, b) in [1.0, 0.5, 1.0, 0.5].into_iter().enumerate() {
            groups.get_mut(GroupIx(ix)).set_barycenter(b);
        }
        groups.stable_sort_by_barycenter();
        assert_eq!(
            groups.node_order(),
            vec![NodeId(1), NodeId(3), NodeId(0), NodeId(2)]
        );
        assert!(groups.is_sorted_by_barycenter());
    }

    #[test]
    fn position_follows_the_sorted_sequence() {
        let mut groups = NodeGroups::new(&ids(3));
        for (ix, b) in [2.0, 1.0, 3.0].into_iter().enumerate() {
            groups.get_mut(GroupIx(ix)).set_barycenter(b);
        }
        groups.stable_sort_by_barycenter();
        assert_eq!(groups.position(GroupIx(1)), Some(0));
        assert_eq!(groups.position(GroupIx(0)), Some(1));
        assert_eq!(groups.position(GroupIx(2)), Some(2));
        assert_eq!(groups.position(GroupIx(3)), None);
    }
}
