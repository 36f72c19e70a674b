use crate::physics::{BodyInfo, RayCaster, RayHit};
use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// An axis-aligned box obstacle as listed in an obstacle file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub min: Vec3,
    pub max: Vec3,
    #[serde(default)]
    pub mass: f32,
    #[serde(default)]
    pub volatile: bool,
    #[serde(default = "default_collides")]
    pub collides_with_characters: bool,
}

fn default_collides() -> bool {
    true
}

impl Obstacle {
    pub fn body(&self) -> BodyInfo {
        BodyInfo {
            collides_with_characters: self.collides_with_characters,
            mass: self.mass,
            is_character: false,
            is_volatile: self.volatile,
        }
    }
}

/// A physics world made of axis-aligned boxes.
#[derive(Debug, Clone, Default)]
pub struct BoxWorld {
    boxes: Vec<(Vec3, Vec3, BodyInfo)>,
}

impl BoxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// A thin static wall across the X axis at `x`.
    pub fn wall_x(x: f32) -> Self {
        Self::new().with_box(
            Vec3::new(x - 0.05, -1000.0, -1000.0),
            Vec3::new(x + 0.05, 1000.0, 1000.0),
            BodyInfo::static_geometry(),
        )
    }

    pub fn with_box(mut self, min: Vec3, max: Vec3, body: BodyInfo) -> Self {
        self.boxes.push((min.min(max), min.max(max), body));
        self
    }

    pub fn from_obstacles(obstacles: &[Obstacle]) -> Self {
        obstacles
            .iter()
            .fold(Self::new(), |world, o| world.with_box(o.min, o.max, o.body()))
    }

    /// Reads a YAML list of obstacles.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read obstacles from {}", path.display()))?;
        let obstacles: Vec<Obstacle> = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse obstacles in {}", path.display()))?;
        Ok(Self::from_obstacles(&obstacles))
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl RayCaster for BoxWorld {
    fn cast_ray(
        &self,
        start: Vec3,
        end: Vec3,
        on_hit: &mut dyn FnMut(&BodyInfo, &RayHit) -> bool,
    ) {
        let length = start.distance(end);
        let mut hits: Vec<(f32, &BodyInfo)> = self
            .boxes
            .iter()
            .filter_map(|(min, max, body)| {
                segment_hits_box(start, end, *min, *max).map(|t| (t, body))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (t, body) in hits {
            let hit = RayHit {
                position: start.lerp(end, t),
                distance: t * length,
            };
            if !on_hit(body, &hit) {
                break;
            }
        }
    }
}

/// Slab test. Returns the segment parameter (0..=1) where `start -> end`
/// enters the box, or 0 if it starts inside.
pub fn segment_hits_box(start: Vec3, end: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let dir = end - start;
    let mut t_min = 0.0_f32;
    let mut t_max = 1.0_f32;

    for axis in 0..3 {
        let (s, d, lo, hi) = (start[axis], dir[axis], min[axis], max[axis]);
        if d.abs() < f32::EPSILON {
            if s < lo || s > hi {
                return None;
            }
            continue;
        }
        let t1 = (lo - s) / d;
        let t2 = (hi - s) / d;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
        if t_min > t_max {
            return None;
        }
    }
    Some(t_min)
}
