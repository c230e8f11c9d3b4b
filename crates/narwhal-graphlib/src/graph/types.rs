//! Node, port and edge records stored in the [`LayeredGraph`](super::LayeredGraph) arenas.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_index!(
    /// Index of a node in the graph's node arena.
    NodeId
);
arena_index!(
    /// Index of a port in the graph's port arena.
    PortId
);
arena_index!(
    /// Index of an edge in the graph's edge arena.
    EdgeId
);

/// Side of a node a port sits on. The declaration order is the clockwise order used for
/// canonical port lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    North,
    East,
    South,
    West,
}

impl PortSide {
    pub const CLOCKWISE: [PortSide; 4] = [
        PortSide::North,
        PortSide::East,
        PortSide::South,
        PortSide::West,
    ];

    pub fn opposed(self) -> PortSide {
        match self {
            PortSide::North => PortSide::South,
            PortSide::East => PortSide::West,
            PortSide::South => PortSide::North,
            PortSide::West => PortSide::East,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortConstraints {
    /// The order of a node's ports is irrelevant; sibling ports are interchangeable.
    #[default]
    Free,
    /// Ports keep their canonical clockwise order.
    FixedOrder,
}

impl PortConstraints {
    pub fn is_order_fixed(self) -> bool {
        matches!(self, PortConstraints::FixedOrder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    #[default]
    Normal,
    /// Dummy inserted upstream to split an edge spanning several layers.
    LongEdge,
    /// Dummy standing in for a north or south port of a normal node.
    NorthSouthPort,
    /// Dummy representing a port of the enclosing (parent) node.
    ExternalPort,
}

impl NodeKind {
    pub fn is_dummy(self) -> bool {
        !matches!(self, NodeKind::Normal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub layer: usize,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub port_constraints: PortConstraints,
    /// Canonical clockwise port list: grouped by side (N, E, S, W), insertion order within a side.
    #[serde(default)]
    pub ports: Vec<PortId>,
    /// Same-layer nodes that must not be placed before this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub successor_constraints: Vec<NodeId>,
    /// Owner of the layout unit this node belongs to. An owner that takes part in layout units
    /// points at itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_unit: Option<NodeId>,
    /// Same-layer nodes whose barycenter contributions are folded into this node's.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub barycenter_associates: Vec<NodeId>,
    /// Number of edges a north/south port dummy stands for. Unset means 1 for north/south port
    /// dummies and 0 for everything else.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crossing_hint: Option<usize>,
}

impl Node {
    pub(crate) fn new(id: String, layer: usize, kind: NodeKind) -> Self {
        Self {
            id,
            layer,
            kind,
            port_constraints: PortConstraints::default(),
            ports: Vec::new(),
            successor_constraints: Vec::new(),
            layout_unit: None,
            barycenter_associates: Vec::new(),
            crossing_hint: None,
        }
    }

    pub fn is_order_fixed(&self) -> bool {
        self.port_constraints.is_order_fixed()
    }

    pub fn crossing_hint(&self) -> usize {
        match (self.crossing_hint, self.kind) {
            (Some(hint), _) => hint,
            (None, NodeKind::NorthSouthPort) => 1,
            (None, _) => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub node: NodeId,
    pub side: PortSide,
    /// Derived from the graph's edge list.
    #[serde(skip)]
    pub incoming: Vec<EdgeId>,
    #[serde(skip)]
    pub outgoing: Vec<EdgeId>,
}

impl Port {
    pub fn degree(&self) -> usize {
        self.incoming.len() + self.outgoing.len()
    }

    pub fn has_incoming(&self) -> bool {
        !self.incoming.is_empty()
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: PortId,
    pub target: PortId,
}
