use crate::graph::NodeContainer;
use crate::models::{NavNode, NodeId};
use crate::physics::{FreePathFlags, MAX_FREE_PATH_RAYS};
use glam::Vec3;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

/// Rays cast when checking whether the goal can be walked to directly.
const SHORTCUT_RAYS: usize = 3;

/// A route found by `AStarHandler::get_path`.
#[derive(Debug, Clone, PartialEq)]
pub struct NavPath {
    /// Path nodes ordered from the goal end back to the start end. Empty when
    /// the goal is directly reachable.
    pub nodes: Vec<NodeId>,
    /// Length of the route from the start position through every path node
    /// to the goal. For a direct path this is the straight-line distance.
    pub distance: f32,
}

impl NavPath {
    pub fn is_direct(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Path nodes in walking order, start end first.
    pub fn waypoints(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().rev().copied()
    }
}

/// Decides whether the search may step from `parent` to `child`.
pub type EdgeFilter<'a> = Box<dyn Fn(&NavNode, &NavNode) -> bool + Send + Sync + 'a>;

/// A* search over a compiled `NodeContainer`.
///
/// Each `get_path` call owns its own search state, so one handler can be
/// reused for any number of queries.
pub struct AStarHandler<'a> {
    container: &'a NodeContainer,
    max_iterations: Option<usize>,
    edge_filter: Option<EdgeFilter<'a>>,
}

impl<'a> AStarHandler<'a> {
    pub fn new(container: &'a NodeContainer) -> Self {
        AStarHandler {
            container,
            max_iterations: None,
            edge_filter: None,
        }
    }

    /// Gives up after expanding `max_iterations` nodes.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_edge_filter(
        mut self,
        filter: impl Fn(&NavNode, &NavNode) -> bool + Send + Sync + 'a,
    ) -> Self {
        self.edge_filter = Some(Box::new(filter));
        self
    }

    /// Finds a route from `start` to `goal`.
    ///
    /// If nothing blocks the straight line the result has no nodes. Otherwise
    /// nodes near `start` that can be reached directly seed the search, and it
    /// ends at the first expanded node that can see `goal`. Returns `None`
    /// when no such node is reachable within the iteration budget.
    pub fn get_path(&self, start: Vec3, goal: Vec3) -> Option<NavPath> {
        let container = self.container;
        if container.free_path(start, goal, SHORTCUT_RAYS, FreePathFlags::empty()) {
            return Some(NavPath {
                nodes: Vec::new(),
                distance: start.distance(goal),
            });
        }

        let mut search = SearchContext::new(container, goal);
        let radius = container.config().max_edge_distance * 2.0;

        for id in self.nodes_in_reach(start, radius) {
            let position = container.node(id).position;
            let flags = FreePathFlags::SKIP_DYNAMIC;
            if container.free_path(start, position, MAX_FREE_PATH_RAYS, flags) {
                search.seed(id, start.distance(position));
            }
        }

        for id in self.nodes_in_reach(goal, radius) {
            let position = container.node(id).position;
            if container.free_path(goal, position, MAX_FREE_PATH_RAYS, FreePathFlags::empty()) {
                search.accepted[id.index()] = true;
            }
        }

        let mut iterations = 0;
        while !self.max_iterations.is_some_and(|max| iterations >= max) {
            let Some(current) = search.pop_best() else {
                debug!(iterations, "Open set exhausted without reaching the goal");
                return None;
            };

            let current_id = search.arena[current].node;
            if search.accepted[current_id.index()] {
                debug!(iterations, "Path found");
                return Some(search.reconstruct(current));
            }

            let current_node = container.node(current_id);
            let current_distance = search.arena[current].distance;
            for edge in &current_node.edges {
                if let Some(filter) = &self.edge_filter {
                    if !filter(current_node, container.node(edge.node)) {
                        continue;
                    }
                }
                search.open(edge.node, current, current_distance + edge.distance);
            }

            iterations += 1;
        }

        debug!(iterations, "Iteration budget exhausted");
        None
    }

    /// Nodes around `position` within `radius` and the allowed height gap.
    fn nodes_in_reach(&self, position: Vec3, radius: f32) -> Vec<NodeId> {
        let max_height = self.container.config().max_height_delta;
        self.container
            .node_iterator(position, radius)
            .filter(|&id| {
                let node_position = self.container.node(id).position;
                position.distance(node_position) <= radius
                    && (position.y - node_position.y).abs() <= max_height
            })
            .collect()
    }
}

/// Cost of reaching `node` after travelling `distance`. Climbing or
/// dropping between nodes scales the cost up.
pub fn cost(distance: f32, node: &NavNode, parent: Option<&NavNode>) -> f32 {
    match parent {
        Some(parent) => distance * (1.0 + (node.position.y - parent.position.y).abs()),
        None => distance,
    }
}

pub fn heuristic(position: Vec3, goal: Vec3) -> f32 {
    position.distance(goal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    Open,
    Closed,
}

#[derive(Debug, Clone)]
struct SearchNode {
    node: NodeId,
    /// Index of the parent in the search arena.
    parent: Option<usize>,
    distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct State {
    cost: f32,
    index: usize,
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse because BinaryHeap is a max-heap, we want min-cost.
        // Equal costs pop in insertion order.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Scratch state of a single search. Dropped when the search returns.
struct SearchContext<'c> {
    container: &'c NodeContainer,
    goal: Vec3,
    arena: Vec<SearchNode>,
    visits: Vec<Visit>,
    accepted: Vec<bool>,
    open: BinaryHeap<State>,
}

impl<'c> SearchContext<'c> {
    fn new(container: &'c NodeContainer, goal: Vec3) -> Self {
        let n = container.node_count();
        SearchContext {
            container,
            goal,
            arena: Vec::new(),
            visits: vec![Visit::Unvisited; n],
            accepted: vec![false; n],
            open: BinaryHeap::new(),
        }
    }

    /// Opens an entry node. Its cost is the straight-line distance from the
    /// start, without the heuristic.
    fn seed(&mut self, id: NodeId, distance: f32) {
        if self.visits[id.index()] == Visit::Unvisited {
            self.insert(id, None, distance, distance);
        }
    }

    /// Adds `id` to the open set unless it was already opened or expanded.
    /// An open node is never re-costed, even if this route is cheaper.
    fn open(&mut self, id: NodeId, parent: usize, distance: f32) {
        if self.visits[id.index()] != Visit::Unvisited {
            return;
        }

        let node = self.container.node(id);
        let parent_node = self.container.node(self.arena[parent].node);
        let total = cost(distance, node, Some(parent_node)) + heuristic(node.position, self.goal);
        self.insert(id, Some(parent), distance, total);
    }

    fn insert(&mut self, id: NodeId, parent: Option<usize>, distance: f32, total: f32) {
        let index = self.arena.len();
        self.arena.push(SearchNode {
            node: id,
            parent,
            distance,
        });
        self.visits[id.index()] = Visit::Open;
        self.open.push(State { cost: total, index });
    }

    /// Moves the cheapest open node to the closed set.
    fn pop_best(&mut self) -> Option<usize> {
        let State { index, .. } = self.open.pop()?;
        let id = self.arena[index].node;
        self.visits[id.index()] = Visit::Closed;
        Some(index)
    }

    fn reconstruct(&self, end: usize) -> NavPath {
        let mut nodes = Vec::new();
        let mut current = Some(end);
        while let Some(index) = current {
            nodes.push(self.arena[index].node);
            current = self.arena[index].parent;
        }
        let last = self.container.node(self.arena[end].node).position;
        NavPath {
            nodes,
            distance: self.arena[end].distance + last.distance(self.goal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NavConfig;
    use crate::obstacles::BoxWorld;
    use crate::physics::BodyInfo;
    use crate::test_utils::SightLimitWorld;

    fn node_at(position: Vec3) -> NavNode {
        NavNode {
            id: NodeId(0),
            name: "n".to_string(),
            position,
            user_data: 0,
            edges: Vec::new(),
        }
    }

    #[test]
    fn test_cost_without_parent_is_distance() {
        let node = node_at(Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(cost(3.0, &node, None), 3.0);
    }

    #[test]
    fn test_cost_penalizes_height_change() {
        let node = node_at(Vec3::new(0.0, 0.5, 0.0));
        let parent = node_at(Vec3::ZERO);
        assert!((cost(2.0, &node, Some(&parent)) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_state_orders_by_lowest_cost_then_insertion() {
        let mut heap = BinaryHeap::new();
        heap.push(State { cost: 2.0, index: 0 });
        heap.push(State { cost: 1.0, index: 1 });
        heap.push(State { cost: 1.0, index: 2 });
        assert_eq!(heap.pop().map(|s| s.index), Some(1));
        assert_eq!(heap.pop().map(|s| s.index), Some(2));
        assert_eq!(heap.pop().map(|s| s.index), Some(0));
    }

    #[test]
    fn test_direct_path_without_physics() {
        let mut container = NodeContainer::new(NavConfig::default());
        container.add_node("a", Vec3::ZERO, 0);
        container.compile();

        let path = AStarHandler::new(&container)
            .get_path(Vec3::ZERO, Vec3::new(50.0, 0.0, 0.0))
            .expect("an empty world is always walkable");
        assert!(path.is_direct());
        assert_eq!(path.distance, 50.0);
    }

    fn cluttered_chain() -> NodeContainer {
        // Volatile clutter blocks anything longer than half a unit, except
        // at compile time where volatile bodies are ignored.
        let mut container =
            NodeContainer::with_physics(NavConfig::default(), SightLimitWorld::volatile(0.5));
        for i in 0..5 {
            container.add_node(&format!("n{}", i), Vec3::new(i as f32, 0.0, 0.0), 0);
        }
        container.compile();
        container
    }

    #[test]
    fn test_chain_path_in_walking_order() {
        let container = cluttered_chain();

        let path = AStarHandler::new(&container)
            .get_path(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0))
            .expect("path along the chain");

        let names: Vec<_> = path
            .waypoints()
            .map(|id| container.node(id).name.as_str())
            .collect();
        assert_eq!(names.first(), Some(&"n0"));
        assert_eq!(names.last(), Some(&"n4"));
        assert!((path.distance - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_iteration_budget() {
        let container = cluttered_chain();
        let goal = Vec3::new(4.0, 0.0, 0.0);

        let starved = AStarHandler::new(&container).with_max_iterations(1);
        assert!(starved.get_path(Vec3::ZERO, goal).is_none());

        let enough = AStarHandler::new(&container).with_max_iterations(10);
        assert!(enough.get_path(Vec3::ZERO, goal).is_some());
    }

    #[test]
    fn test_edge_filter_blocks_route() {
        let container = cluttered_chain();

        let handler = AStarHandler::new(&container).with_edge_filter(|_, child| child.name != "n4");
        assert!(handler.get_path(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_no_entry_nodes_fails() {
        let mut container =
            NodeContainer::with_physics(NavConfig::default(), BoxWorld::wall_x(0.5));
        container.add_node("far", Vec3::new(100.0, 0.0, 0.0), 0);
        container.compile();

        assert!(
            AStarHandler::new(&container)
                .get_path(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0))
                .is_none()
        );
    }

    #[test]
    fn test_open_node_keeps_first_route() {
        // S reaches A directly at cost 50 before the cheaper S-B-A detour is
        // found. A is already open by then, so its route is not replaced.
        let mut container =
            NodeContainer::with_physics(NavConfig::default(), SightLimitWorld::solid(0.01));
        container.add_node("S", Vec3::ZERO, 0);
        container.add_node("A", Vec3::new(10.0, 0.0, 0.0), 0);
        container.add_node("B", Vec3::new(1.0, 0.0, 0.0), 0);
        container.add_node("G", Vec3::new(20.0, 0.0, 0.0), 0);
        let xml = r#"<AINodes>
            <Node Name="S"><Edge Node="A" Distance="50"/><Edge Node="B" Distance="1"/></Node>
            <Node Name="B"><Edge Node="A" Distance="1"/></Node>
            <Node Name="A"><Edge Node="G" Distance="1"/></Node>
            <Node Name="G"/>
        </AINodes>"#;
        container.apply_edges_xml(xml).expect("apply");

        let path = AStarHandler::new(&container)
            .get_path(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0))
            .expect("route to G");
        let names: Vec<_> = path
            .waypoints()
            .map(|id| container.node(id).name.as_str())
            .collect();
        assert_eq!(names, vec!["S", "A", "G"]);
        assert!((path.distance - 51.0).abs() < 1e-5);
    }

    fn crate_between_origin_and_node() -> NodeContainer {
        let crate_body = BodyInfo {
            mass: 5.0,
            ..BodyInfo::static_geometry()
        };
        let world = BoxWorld::new().with_box(
            Vec3::new(0.4, -1.0, -1.0),
            Vec3::new(0.6, 2.0, 1.0),
            crate_body,
        );
        let mut container = NodeContainer::with_physics(NavConfig::default(), world);
        container.add_node("n", Vec3::new(1.0, 0.0, 0.0), 0);
        container.compile();
        container
    }

    #[test]
    fn test_entry_ignores_dynamic_bodies() {
        let container = crate_between_origin_and_node();

        let path = AStarHandler::new(&container)
            .get_path(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0))
            .expect("the crate can be pushed aside at the start");
        assert_eq!(path.nodes.len(), 1);
    }

    #[test]
    fn test_acceptance_respects_dynamic_bodies() {
        let container = crate_between_origin_and_node();

        let path = AStarHandler::new(&container).get_path(Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO);
        assert!(path.is_none());
    }
}
