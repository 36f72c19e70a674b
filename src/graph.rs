use crate::config::NavConfig;
use crate::grid::{NodeIterator, SpatialGrid};
use crate::models::{NavEdge, NavNode, NodeId};
use crate::physics::{
    BodyInfo, FreePathFlags, MAX_FREE_PATH_RAYS, RayCaster, RayHit, blocks_path, ray_offsets,
};
use glam::Vec3;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Flags used when validating edges at compile time. Moving bodies are
/// expected to be gone (or pushed aside) by the time an agent walks the edge.
pub const COMPILE_FLAGS: FreePathFlags =
    FreePathFlags::SKIP_DYNAMIC.union(FreePathFlags::SKIP_VOLATILE);

/// Owns the navigation nodes of a level, their spatial index and their
/// compiled edges.
///
/// Build once per level with `add_node` followed by `compile` (or
/// `load_from_file`); afterwards the container is only read.
pub struct NodeContainer {
    config: NavConfig,
    physics: Option<Box<dyn RayCaster + Send + Sync>>,
    nodes: Vec<NavNode>,
    nodes_by_name: HashMap<String, NodeId>,
    grid: SpatialGrid,
}

impl NodeContainer {
    /// Creates a container without a physics world. Every free-path check
    /// then succeeds.
    pub fn new(config: NavConfig) -> Self {
        NodeContainer {
            config,
            physics: None,
            nodes: Vec::new(),
            nodes_by_name: HashMap::new(),
            grid: SpatialGrid::default(),
        }
    }

    pub fn with_physics(
        config: NavConfig,
        physics: impl RayCaster + Send + Sync + 'static,
    ) -> Self {
        let mut container = Self::new(config);
        container.physics = Some(Box::new(physics));
        container
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// Appends a node. A node reusing an existing name takes over the name
    /// lookup; the older node stays in the graph.
    ///
    /// Saved edges refer to nodes by name, so a shadowed node does not survive
    /// a save/load round trip: edges pointing at it load as edges to the
    /// newer node, and its own edges are applied to the newer node too.
    pub fn add_node(&mut self, name: &str, position: Vec3, user_data: u64) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NavNode {
            id,
            name: name.to_string(),
            position,
            user_data,
            edges: Vec::new(),
        });
        if let Some(previous) = self.nodes_by_name.insert(name.to_string(), id) {
            warn!(
                node = name,
                ?previous,
                ?id,
                "Duplicate nav node name, lookup now points at the newer node"
            );
        }
        id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &NavNode {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> &[NavNode] {
        &self.nodes
    }

    pub fn node_by_name(&self, name: &str) -> Option<&NavNode> {
        self.nodes_by_name.get(name).map(|&id| self.node(id))
    }

    /// Nodes whose name has been taken over by a later `add_node`.
    pub fn shadowed_nodes(&self) -> impl Iterator<Item = &NavNode> + '_ {
        self.nodes
            .iter()
            .filter(|node| self.nodes_by_name.get(&node.name) != Some(&node.id))
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(NavNode::edge_count).sum()
    }

    /// Re-buckets all nodes into a fresh spatial grid.
    pub fn rebuild_grid(&mut self) {
        self.grid = SpatialGrid::build(&self.nodes, self.config.target_nodes_per_cell);
    }

    /// Builds the spatial grid and connects every node to the nearby nodes it
    /// has a free path to.
    ///
    /// Candidates are gathered from grid cells within 1.5x the max edge
    /// distance and accepted up to 2x that distance. Each node's edges are
    /// then sorted by distance, capped at `max_edge_count` and stripped of
    /// edges longer than `max_edge_distance` beyond the first
    /// `min_edge_count`.
    pub fn compile(&mut self) {
        if self.nodes.is_empty() {
            warn!("Compile called on an empty node container");
            self.grid = SpatialGrid::default();
            return;
        }

        self.rebuild_grid();

        let edges: Vec<Vec<NavEdge>> =
            self.nodes.iter().map(|node| self.collect_edges(node)).collect();
        for (node, node_edges) in self.nodes.iter_mut().zip(edges) {
            node.edges = node_edges;
        }

        info!(
            nodes = self.nodes.len(),
            edges = self.edge_count(),
            grid_resolution = self.grid.resolution(),
            "Compiled navigation graph"
        );
    }

    fn collect_edges(&self, node: &NavNode) -> Vec<NavEdge> {
        let max_distance = self.config.max_edge_distance;
        let mut edges = Vec::new();

        for other_id in self.grid.iter_near(node.position, max_distance * 1.5) {
            if other_id == node.id {
                continue;
            }
            let other = self.node(other_id);

            let distance = node.position.distance(other.position);
            if distance > max_distance * 2.0 {
                continue;
            }
            let height = (node.position.y - other.position.y).abs();
            if height > self.config.max_height_delta {
                continue;
            }

            if self.free_path(node.position, other.position, MAX_FREE_PATH_RAYS, COMPILE_FLAGS) {
                edges.push(NavEdge::new(other_id, distance));
            }
        }

        trim_edges(&mut edges, &self.config);
        debug!(node = %node.name, edges = edges.len(), "Connected nav node");
        edges
    }

    /// Nodes in the grid cells touched by the square of half-size `radius`
    /// around `position`. Call `compile` (or load) first.
    pub fn node_iterator(&self, position: Vec3, radius: f32) -> NodeIterator<'_> {
        self.grid.iter_near(position, radius)
    }

    /// Checks that an agent-sized body can travel in a straight line from
    /// `start` to `end`, casting `ray_count` parallel rays (1-5).
    pub fn free_path(
        &self,
        start: Vec3,
        end: Vec3,
        ray_count: usize,
        flags: FreePathFlags,
    ) -> bool {
        self.free_path_with(start, end, ray_count, flags, None)
    }

    /// Like `free_path`, but `veto` is asked about every candidate hit and
    /// may return false to let the ray pass through that body.
    pub fn free_path_with(
        &self,
        start: Vec3,
        end: Vec3,
        ray_count: usize,
        flags: FreePathFlags,
        veto: Option<&dyn Fn(&BodyInfo, &RayHit) -> bool>,
    ) -> bool {
        let Some(physics) = self.physics.as_deref() else {
            return true;
        };

        let lift = if self.config.node_is_at_center {
            Vec3::ZERO
        } else {
            Vec3::new(0.0, self.config.collide_size.y / 2.0, 0.0)
        };
        let start_center = start + lift;
        let end_center = end + lift;

        for offset in ray_offsets(start_center, end_center, self.config.collide_size, ray_count) {
            let mut blocked = false;
            physics.cast_ray(start_center + offset, end_center + offset, &mut |body, hit| {
                if blocks_path(body, hit, flags, veto) {
                    blocked = true;
                    false
                } else {
                    true
                }
            });
            if blocked {
                return false;
            }
        }
        true
    }

    pub(crate) fn node_id_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes_by_name.get(name).copied()
    }

    pub(crate) fn set_edges(&mut self, id: NodeId, edges: Vec<NavEdge>) {
        self.nodes[id.index()].edges = edges;
    }
}

/// Sorts edges by distance, caps their number and prunes long edges that
/// are not needed to reach the minimum count.
pub(crate) fn trim_edges(edges: &mut Vec<NavEdge>, config: &NavConfig) {
    edges.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    if config.max_edge_count > 0 {
        edges.truncate(config.max_edge_count);
    }

    let cut = edges.iter().enumerate().position(|(i, edge)| {
        i >= config.min_edge_count && edge.distance > config.max_edge_distance
    });
    if let Some(cut) = cut {
        edges.truncate(cut);
    }
}
