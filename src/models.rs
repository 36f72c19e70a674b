use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Handle to a node in a `NodeContainer`. Stable for the container's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A directed, weighted connection to another node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavEdge {
    pub node: NodeId,
    pub distance: f32,
    pub sqr_distance: f32,
}

impl NavEdge {
    pub fn new(node: NodeId, distance: f32) -> Self {
        NavEdge {
            node,
            distance,
            sqr_distance: distance * distance,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavNode {
    pub id: NodeId,
    pub name: String,
    pub position: Vec3,
    /// Opaque tag supplied by whoever placed the node.
    pub user_data: u64,
    /// Outgoing edges, sorted ascending by distance once compiled.
    pub edges: Vec<NavEdge>,
}

impl NavNode {
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn has_edge_to(&self, other: NodeId) -> bool {
        self.edges.iter().any(|e| e.node == other)
    }
}

/// A node placement record, as read from a level layout CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePlacement {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "X")]
    pub x: f32,
    #[serde(rename = "Y")]
    pub y: f32,
    #[serde(rename = "Z")]
    pub z: f32,
}

impl NodePlacement {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}
