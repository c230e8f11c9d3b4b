//! The layered graph container.
//!
//! Nodes, ports and edges are stored in flat arenas and addressed by [`NodeId`], [`PortId`] and
//! [`EdgeId`]. Layer membership is fixed once a node is added; only the order inside a layer
//! changes afterwards (see [`LayeredGraph::set_layer_order`]).

mod types;

pub use types::{Edge, EdgeId, Node, NodeId, NodeKind, Port, PortConstraints, PortId, PortSide};

use crate::error::{Error, Result};
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;
type HashSet<T> = hashbrown::HashSet<T, FxBuildHasher>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayeredGraph {
    layers: Vec<Vec<NodeId>>,
    nodes: Vec<Node>,
    #[serde(default)]
    ports: Vec<Port>,
    #[serde(default)]
    edges: Vec<Edge>,

    #[serde(skip)]
    node_index: HashMap<String, NodeId>,
}

impl LayeredGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut graph: LayeredGraph = serde_json::from_str(json)?;
        graph.rebuild_node_index()?;
        graph.validate_references()?;
        graph.normalize_ports()?;
        graph.validate()?;
        Ok(graph)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn rebuild_node_index(&mut self) -> Result<()> {
        self.node_index.clear();
        for (ix, node) in self.nodes.iter().enumerate() {
            if self
                .node_index
                .insert(node.id.clone(), NodeId(ix))
                .is_some()
            {
                return Err(Error::DuplicateNode {
                    id: node.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Brings JSON port data into the shape `add_port`/`add_edge` maintain. Port adjacency is
    /// derived from the edge list.
    fn normalize_ports(&mut self) -> Result<()> {
        let mut listed = vec![0usize; self.ports.len()];
        for node in &self.nodes {
            for &p in &node.ports {
                listed[p.index()] += 1;
            }
        }
        if let Some(port) = listed.iter().position(|&count| count != 1) {
            let node = self.ports[port].node;
            return Err(Error::PortListing {
                node: self.nodes[node.index()].id.clone(),
                port,
            });
        }

        let ports = &self.ports;
        for node in &mut self.nodes {
            node.ports.sort_by_key(|p| ports[p.index()].side);
        }

        for port in &mut self.ports {
            port.incoming.clear();
            port.outgoing.clear();
        }
        for (ix, edge) in self.edges.iter().enumerate() {
            self.ports[edge.source.index()].outgoing.push(EdgeId(ix));
            self.ports[edge.target.index()].incoming.push(EdgeId(ix));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------------------
    // Layers

    pub fn add_layer(&mut self) -> usize {
        self.layers.push(Vec::new());
        self.layers.len() - 1
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[Vec<NodeId>] {
        &self.layers
    }

    pub fn layer(&self, layer: usize) -> &[NodeId] {
        &self.layers[layer]
    }

    /// Replaces the order of `layer` with `order`, which must be a permutation of the layer.
    pub fn set_layer_order(&mut self, layer: usize, order: &[NodeId]) -> Result<()> {
        let Some(current) = self.layers.get(layer) else {
            return Err(Error::UnknownLayer {
                layer,
                layer_count: self.layers.len(),
            });
        };
        if current.len() != order.len() {
            return Err(Error::NotAPermutation { layer });
        }
        let members: HashSet<NodeId> = current.iter().copied().collect();
        let mut seen: HashSet<NodeId> = HashSet::default();
        for &v in order {
            if !members.contains(&v) || !seen.insert(v) {
                return Err(Error::NotAPermutation { layer });
            }
        }
        self.layers[layer] = order.to_vec();
        Ok(())
    }

    /// Position of `node` inside its layer.
    pub fn position_of(&self, node: NodeId) -> Option<usize> {
        let layer = self.nodes.get(node.index())?.layer;
        self.layers.get(layer)?.iter().position(|&v| v == node)
    }

    // ---------------------------------------------------------------------------------------
    // Nodes

    pub fn add_node(
        &mut self,
        layer: usize,
        id: impl Into<String>,
        kind: NodeKind,
    ) -> Result<NodeId> {
        if layer >= self.layers.len() {
            return Err(Error::UnknownLayer {
                layer,
                layer_count: self.layers.len(),
            });
        }
        let id = id.into();
        if self.node_index.contains_key(id.as_str()) {
            return Err(Error::DuplicateNode { id });
        }

        let node_id = NodeId(self.nodes.len());
        self.node_index.insert(id.clone(), node_id);
        self.nodes.push(Node::new(id, layer, kind));
        self.layers[layer].push(node_id);
        Ok(node_id)
    }

    pub fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node.index()]
    }

    pub fn node_mut(&mut self, node: NodeId) -> &mut Node {
        &mut self.nodes[node.index()]
    }

    pub fn node_by_id(&self, id: &str) -> Option<NodeId> {
        self.node_index.get(id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(ix, node)| (NodeId(ix), node))
    }

    /// Number of edges entering any port of `node`.
    pub fn incoming_count(&self, node: NodeId) -> usize {
        self.nodes[node.index()]
            .ports
            .iter()
            .map(|p| self.ports[p.index()].incoming.len())
            .sum()
    }

    /// Number of edges leaving any port of `node`.
    pub fn outgoing_count(&self, node: NodeId) -> usize {
        self.nodes[node.index()]
            .ports
            .iter()
            .map(|p| self.ports[p.index()].outgoing.len())
            .sum()
    }

    pub fn set_port_constraints(&mut self, node: NodeId, constraints: PortConstraints) {
        self.nodes[node.index()].port_constraints = constraints;
    }

    // ---------------------------------------------------------------------------------------
    // Ports

    /// Adds a port on `side` of `node`, keeping the node's port list in clockwise order.
    pub fn add_port(&mut self, node: NodeId, side: PortSide) -> PortId {
        let port_id = PortId(self.ports.len());
        self.ports.push(Port {
            node,
            side,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        });

        let ports = &self.ports;
        let node_ports = &mut self.nodes[node.index()].ports;
        let insert_at = node_ports
            .iter()
            .position(|p| ports[p.index()].side > side)
            .unwrap_or(node_ports.len());
        node_ports.insert(insert_at, port_id);
        port_id
    }

    pub fn port(&self, port: PortId) -> &Port {
        &self.ports[port.index()]
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// The node a port belongs to.
    pub fn port_node(&self, port: PortId) -> NodeId {
        self.ports[port.index()].node
    }

    pub fn ports_on_side(&self, node: NodeId, side: PortSide) -> impl Iterator<Item = PortId> + '_ {
        self.nodes[node.index()]
            .ports
            .iter()
            .copied()
            .filter(move |p| self.ports[p.index()].side == side)
    }

    /// Ports at the tail end of the edges entering `port`.
    pub fn predecessor_ports(&self, port: PortId) -> impl Iterator<Item = PortId> + '_ {
        self.ports[port.index()]
            .incoming
            .iter()
            .map(|e| self.edges[e.index()].source)
    }

    /// Ports at the head end of the edges leaving `port`.
    pub fn successor_ports(&self, port: PortId) -> impl Iterator<Item = PortId> + '_ {
        self.ports[port.index()]
            .outgoing
            .iter()
            .map(|e| self.edges[e.index()].target)
    }

    pub fn connected_ports(&self, port: PortId) -> impl Iterator<Item = PortId> + '_ {
        self.predecessor_ports(port)
            .chain(self.successor_ports(port))
    }

    // ---------------------------------------------------------------------------------------
    // Edges

    pub fn add_edge(&mut self, source: PortId, target: PortId) -> EdgeId {
        let edge_id = EdgeId(self.edges.len());
        self.edges.push(Edge { source, target });
        self.ports[source.index()].outgoing.push(edge_id);
        self.ports[target.index()].incoming.push(edge_id);
        edge_id
    }

    /// Convenience wrapper: adds an east port on `from`, a west port on `to`, and an edge
    /// between them.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> EdgeId {
        let source = self.add_port(from, PortSide::East);
        let target = self.add_port(to, PortSide::West);
        self.add_edge(source, target)
    }

    pub fn edge(&self, edge: EdgeId) -> &Edge {
        &self.edges[edge.index()]
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .map(|(ix, e)| (EdgeId(ix), e))
    }

    pub fn is_in_layer_edge(&self, edge: EdgeId) -> bool {
        let e = &self.edges[edge.index()];
        self.port_layer(e.source) == self.port_layer(e.target)
    }

    fn port_layer(&self, port: PortId) -> usize {
        self.nodes[self.ports[port.index()].node.index()].layer
    }

    // ---------------------------------------------------------------------------------------
    // Ordering constraints

    /// Requires `successor` to be placed after `node` (both in the same layer).
    pub fn add_successor_constraint(&mut self, node: NodeId, successor: NodeId) -> Result<()> {
        self.ensure_same_layer(node, successor)?;
        let list = &mut self.nodes[node.index()].successor_constraints;
        if !list.contains(&successor) {
            list.push(successor);
        }
        Ok(())
    }

    /// Puts `member` into the layout unit owned by `owner`.
    pub fn set_layout_unit(&mut self, member: NodeId, owner: NodeId) -> Result<()> {
        self.ensure_same_layer(member, owner)?;
        self.nodes[member.index()].layout_unit = Some(owner);
        Ok(())
    }

    pub fn set_crossing_hint(&mut self, node: NodeId, hint: usize) {
        self.nodes[node.index()].crossing_hint = Some(hint);
    }

    pub fn add_barycenter_associate(&mut self, node: NodeId, associate: NodeId) -> Result<()> {
        self.ensure_same_layer(node, associate)?;
        let list = &mut self.nodes[node.index()].barycenter_associates;
        if !list.contains(&associate) {
            list.push(associate);
        }
        Ok(())
    }

    /// Layout units of `layer`: owner -> members (in current layer order).
    pub fn layout_units(&self, layer: usize) -> HashMap<NodeId, Vec<NodeId>> {
        let mut units: HashMap<NodeId, Vec<NodeId>> = HashMap::default();
        for &v in &self.layers[layer] {
            if let Some(owner) = self.nodes[v.index()].layout_unit {
                units.entry(owner).or_default().push(v);
            }
        }
        units
    }

    fn ensure_same_layer(&self, a: NodeId, b: NodeId) -> Result<()> {
        let (na, nb) = (&self.nodes[a.index()], &self.nodes[b.index()]);
        if na.layer != nb.layer {
            return Err(Error::ConstraintCrossesLayers {
                from: na.id.clone(),
                to: nb.id.clone(),
            });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------------------
    // Validation

    /// Checks the proper-layering contract: each edge connects layer `i` to layer `i + 1` or
    /// stays inside one layer, constraints stay inside one layer, and each node is listed by
    /// its own layer exactly once.
    pub fn validate(&self) -> Result<()> {
        self.validate_references()?;

        let mut listed: Vec<usize> = vec![0; self.nodes.len()];
        for (layer_ix, layer) in self.layers.iter().enumerate() {
            for &v in layer {
                let Some(node) = self.nodes.get(v.index()) else {
                    return Err(Error::UnknownNode { id: v.to_string() });
                };
                if node.layer != layer_ix {
                    return Err(Error::LayerMembership {
                        layer: layer_ix,
                        node: node.id.clone(),
                    });
                }
                listed[v.index()] += 1;
            }
        }
        for (ix, &count) in listed.iter().enumerate() {
            if count != 1 {
                let node = &self.nodes[ix];
                return Err(Error::LayerMembership {
                    layer: node.layer,
                    node: node.id.clone(),
                });
            }
        }

        for (edge_ix, e) in self.edges.iter().enumerate() {
            let source_layer = self.port_layer(e.source);
            let target_layer = self.port_layer(e.target);
            if target_layer != source_layer && target_layer != source_layer + 1 {
                return Err(Error::NonAdjacentEdge {
                    edge: edge_ix,
                    source_layer,
                    target_layer,
                });
            }
        }

        for (ix, node) in self.nodes.iter().enumerate() {
            let v = NodeId(ix);
            for &w in node
                .successor_constraints
                .iter()
                .chain(node.barycenter_associates.iter())
                .chain(node.layout_unit.iter())
            {
                self.ensure_same_layer(v, w)?;
            }
        }
        Ok(())
    }

    /// Arena indices read from JSON are untrusted; everything else indexes without checks.
    fn validate_references(&self) -> Result<()> {
        let node_ok = |v: NodeId| -> Result<()> {
            if v.index() < self.nodes.len() {
                Ok(())
            } else {
                Err(Error::UnknownNode { id: v.to_string() })
            }
        };
        let port_ok = |p: PortId| -> Result<()> {
            if p.index() < self.ports.len() {
                Ok(())
            } else {
                Err(Error::DanglingIndex {
                    kind: "port",
                    index: p.index(),
                })
            }
        };
        let edge_ok = |e: EdgeId| -> Result<()> {
            if e.index() < self.edges.len() {
                Ok(())
            } else {
                Err(Error::DanglingIndex {
                    kind: "edge",
                    index: e.index(),
                })
            }
        };

        for (ix, node) in self.nodes.iter().enumerate() {
            if node.layer >= self.layers.len() {
                return Err(Error::UnknownLayer {
                    layer: node.layer,
                    layer_count: self.layers.len(),
                });
            }
            for &p in &node.ports {
                port_ok(p)?;
                if self.ports[p.index()].node != NodeId(ix) {
                    return Err(Error::DanglingIndex {
                        kind: "port",
                        index: p.index(),
                    });
                }
            }
            for &w in node
                .successor_constraints
                .iter()
                .chain(node.barycenter_associates.iter())
                .chain(node.layout_unit.iter())
            {
                node_ok(w)?;
            }
        }
        for port in &self.ports {
            node_ok(port.node)?;
            for &e in port.incoming.iter().chain(port.outgoing.iter()) {
                edge_ok(e)?;
            }
        }
        for edge in &self.edges {
            port_ok(edge.source)?;
            port_ok(edge.target)?;
        }
        Ok(())
    }
}
