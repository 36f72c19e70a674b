use crate::models::NodePlacement;
use crate::physics::{BodyInfo, RayCaster, RayHit};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A world where every ray longer than `max_length` runs into `body`.
pub struct SightLimitWorld {
    max_length: f32,
    body: BodyInfo,
}

impl SightLimitWorld {
    pub fn solid(max_length: f32) -> Self {
        SightLimitWorld {
            max_length,
            body: BodyInfo::static_geometry(),
        }
    }

    /// Long rays hit a volatile body (say, a door), which compile-time checks
    /// ignore but runtime checks do not.
    pub fn volatile(max_length: f32) -> Self {
        SightLimitWorld {
            max_length,
            body: BodyInfo {
                is_volatile: true,
                ..BodyInfo::static_geometry()
            },
        }
    }
}

impl RayCaster for SightLimitWorld {
    fn cast_ray(
        &self,
        start: Vec3,
        end: Vec3,
        on_hit: &mut dyn FnMut(&BodyInfo, &RayHit) -> bool,
    ) {
        let length = start.distance(end);
        if length > self.max_length {
            let hit = RayHit {
                position: start + (end - start) / length * self.max_length,
                distance: self.max_length,
            };
            on_hit(&self.body, &hit);
        }
    }
}

/// Scatters `count` nodes over a `width` x `depth` floor at height 0.
pub fn generate_dummy_nodes(
    count: usize,
    width: f32,
    depth: f32,
    seed: u64,
) -> Vec<NodePlacement> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| NodePlacement {
            name: format!("Node_{}", i),
            x: rng.random_range(0.0..width),
            y: 0.0,
            z: rng.random_range(0.0..depth),
        })
        .collect()
}

/// A `columns` x `rows` lattice of nodes `spacing` apart at height 0.
pub fn lattice_nodes(columns: usize, rows: usize, spacing: f32) -> Vec<NodePlacement> {
    let mut nodes = Vec::with_capacity(columns * rows);
    for row in 0..rows {
        for column in 0..columns {
            nodes.push(NodePlacement {
                name: format!("Node_{}_{}", column, row),
                x: column as f32 * spacing,
                y: 0.0,
                z: row as f32 * spacing,
            });
        }
    }
    nodes
}
