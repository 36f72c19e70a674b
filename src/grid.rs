use crate::models::{NavNode, NodeId};
use glam::{Vec2, Vec3};

/// A uniform 2D bucket grid over the X/Z plane, used to find nodes near a
/// position without scanning the whole container.
///
/// The grid spans the bounding box of the nodes it was built from. Cells are
/// stored row-major (z rows, x columns) and hold node handles in insertion
/// order. Positions outside the box clamp to the border cells.
#[derive(Debug, Clone, Default)]
pub struct SpatialGrid {
    min: Vec2,
    max: Vec2,
    cell_size: Vec2,
    /// Cells per axis.
    resolution: usize,
    cells: Vec<Vec<NodeId>>,
}

impl SpatialGrid {
    /// Buckets `nodes` into a square grid of roughly `target_per_cell` nodes
    /// per cell. Returns an empty grid for an empty slice.
    pub fn build(nodes: &[NavNode], target_per_cell: usize) -> Self {
        let Some(first) = nodes.first() else {
            return SpatialGrid::default();
        };

        let mut min = planar(first.position);
        let mut max = min;
        for node in &nodes[1..] {
            let p = planar(node.position);
            min = min.min(p);
            max = max.max(p);
        }

        // The extra row/column gives nodes sitting exactly on the max border
        // a cell of their own.
        let ratio = nodes.len() as f32 / target_per_cell.max(1) as f32;
        let resolution = ratio.sqrt().ceil() as usize + 1;
        let cell_size = (max - min) / (resolution - 1) as f32;

        let mut grid = SpatialGrid {
            min,
            max,
            cell_size,
            resolution,
            cells: vec![Vec::new(); resolution * resolution],
        };

        for node in nodes {
            let (x, z) = grid.cell_coords(node.position);
            let index = grid.cell_index(x, z);
            grid.cells[index].push(node.id);
        }

        grid
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    /// Lower and upper corner of the indexed area in the X/Z plane.
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.min, self.max)
    }

    pub fn cell(&self, x: usize, z: usize) -> &[NodeId] {
        &self.cells[self.cell_index(x, z)]
    }

    /// Grid coordinates of the cell containing `position`.
    pub fn cell_coords(&self, position: Vec3) -> (usize, usize) {
        let local = planar(position) - self.min;
        (
            self.axis_cell(local.x, self.cell_size.x),
            self.axis_cell(local.y, self.cell_size.y),
        )
    }

    /// Nodes in every cell touched by the square of half-size `radius`
    /// around `position`. Individual nodes are not distance-filtered.
    pub fn iter_near(&self, position: Vec3, radius: f32) -> NodeIterator<'_> {
        if self.is_empty() {
            return NodeIterator::exhausted(self);
        }
        let local = planar(position) - self.min;
        let start = (
            self.axis_cell(local.x - radius, self.cell_size.x),
            self.axis_cell(local.y - radius, self.cell_size.y),
        );
        let end = (
            self.axis_cell(local.x + radius, self.cell_size.x),
            self.axis_cell(local.y + radius, self.cell_size.y),
        );
        NodeIterator {
            grid: self,
            start,
            end,
            current: start,
            slot: 0,
            done: false,
        }
    }

    fn axis_cell(&self, local: f32, size: f32) -> usize {
        if size <= 0.0 {
            return 0;
        }
        let cell = (local / size).floor();
        if cell <= 0.0 {
            0
        } else {
            (cell as usize).min(self.resolution - 1)
        }
    }

    fn cell_index(&self, x: usize, z: usize) -> usize {
        z * self.resolution + x
    }
}

fn planar(position: Vec3) -> Vec2 {
    Vec2::new(position.x, position.z)
}

/// Lazy walk over the nodes of a rectangular block of grid cells.
///
/// Cells are visited row by row with x varying fastest; empty cells are
/// skipped. A fresh iterator from `SpatialGrid::iter_near` restarts the walk.
#[derive(Debug, Clone)]
pub struct NodeIterator<'a> {
    grid: &'a SpatialGrid,
    start: (usize, usize),
    end: (usize, usize),
    current: (usize, usize),
    slot: usize,
    done: bool,
}

impl<'a> NodeIterator<'a> {
    fn exhausted(grid: &'a SpatialGrid) -> Self {
        NodeIterator {
            grid,
            start: (0, 0),
            end: (0, 0),
            current: (0, 0),
            slot: 0,
            done: true,
        }
    }

    fn advance_cell(&mut self) -> bool {
        self.slot = 0;
        self.current.0 += 1;
        if self.current.0 > self.end.0 {
            self.current.0 = self.start.0;
            self.current.1 += 1;
            if self.current.1 > self.end.1 {
                return false;
            }
        }
        true
    }
}

impl Iterator for NodeIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while !self.done {
            let cell = self.grid.cell(self.current.0, self.current.1);
            if let Some(&id) = cell.get(self.slot) {
                self.slot += 1;
                return Some(id);
            }
            if !self.advance_cell() {
                self.done = true;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_nodes(positions: &[(f32, f32, f32)]) -> Vec<NavNode> {
        positions
            .iter()
            .enumerate()
            .map(|(i, &(x, y, z))| NavNode {
                id: NodeId(i as u32),
                name: format!("n{}", i),
                position: Vec3::new(x, y, z),
                user_data: 0,
                edges: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_resolution_formula() {
        // 24 nodes / 6 per cell -> sqrt(4) = 2 -> 3 cells per axis.
        let positions: Vec<_> = (0..24).map(|i| (i as f32, 0.0, (i % 5) as f32)).collect();
        let grid = SpatialGrid::build(&make_nodes(&positions), 6);
        assert_eq!(grid.resolution(), 3);

        // 7 nodes / 6 per cell -> ceil(sqrt(1.17)) = 2 -> 3 cells per axis.
        let positions: Vec<_> = (0..7).map(|i| (i as f32, 0.0, 0.0)).collect();
        let grid = SpatialGrid::build(&make_nodes(&positions), 6);
        assert_eq!(grid.resolution(), 3);
    }

    #[test]
    fn test_every_node_in_exactly_one_cell() {
        let positions: Vec<_> = (0..50)
            .map(|i| ((i * 7 % 13) as f32, 0.0, (i * 3 % 11) as f32))
            .collect();
        let nodes = make_nodes(&positions);
        let grid = SpatialGrid::build(&nodes, 6);

        let mut seen = vec![0; nodes.len()];
        for z in 0..grid.resolution() {
            for x in 0..grid.resolution() {
                for id in grid.cell(x, z) {
                    seen[id.index()] += 1;
                }
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn test_border_node_gets_last_cell() {
        let nodes = make_nodes(&[(0.0, 0.0, 0.0), (10.0, 0.0, 10.0)]);
        let grid = SpatialGrid::build(&nodes, 6);
        let last = grid.resolution() - 1;
        assert_eq!(grid.cell_coords(nodes[1].position), (last, last));
        assert_eq!(grid.cell_coords(nodes[0].position), (0, 0));
    }

    #[test]
    fn test_degenerate_extent_collapses_to_origin_cell() {
        let nodes = make_nodes(&[(2.0, 0.0, 2.0), (2.0, 1.0, 2.0), (2.0, 5.0, 2.0)]);
        let grid = SpatialGrid::build(&nodes, 6);
        assert_eq!(grid.cell(0, 0).len(), 3);

        let found: Vec<_> = grid.iter_near(Vec3::new(2.0, 0.0, 2.0), 1.0).collect();
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_iter_near_limits_to_touched_cells() {
        // 36 nodes on a 6x6 lattice, 6 per cell -> ceil(2.45) + 1 = 4 cells per axis.
        let positions: Vec<_> = (0..36)
            .map(|i| ((i % 6) as f32 * 2.0, 0.0, (i / 6) as f32 * 2.0))
            .collect();
        let nodes = make_nodes(&positions);
        let grid = SpatialGrid::build(&nodes, 6);

        let near_origin: Vec<_> = grid.iter_near(Vec3::ZERO, 0.5).collect();
        assert!(near_origin.contains(&NodeId(0)));
        assert!(!near_origin.contains(&NodeId(35)));
        assert!(near_origin.len() < nodes.len());

        let everything: Vec<_> = grid.iter_near(Vec3::new(5.0, 0.0, 5.0), 100.0).collect();
        assert_eq!(everything.len(), nodes.len());
    }

    #[test]
    fn test_iter_near_restarts() {
        let nodes = make_nodes(&[(0.0, 0.0, 0.0), (1.0, 0.0, 1.0), (4.0, 0.0, 4.0)]);
        let grid = SpatialGrid::build(&nodes, 1);
        let first: Vec<_> = grid.iter_near(Vec3::ZERO, 2.0).collect();
        let second: Vec<_> = grid.iter_near(Vec3::ZERO, 2.0).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_grid_yields_nothing() {
        let grid = SpatialGrid::build(&[], 6);
        assert!(grid.is_empty());
        assert_eq!(grid.iter_near(Vec3::ZERO, 10.0).count(), 0);
    }
}
