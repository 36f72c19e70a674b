use bitflags::bitflags;
use glam::Vec3;

/// Maximum number of parallel rays a free-path check can cast.
pub const MAX_FREE_PATH_RAYS: usize = 5;

/// Introspection data the physics service reports for an intersected body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyInfo {
    pub collides_with_characters: bool,
    /// 0 for static geometry.
    pub mass: f32,
    pub is_character: bool,
    /// Bodies expected to move or vanish soon (doors, crates).
    pub is_volatile: bool,
}

impl BodyInfo {
    pub fn static_geometry() -> Self {
        BodyInfo {
            collides_with_characters: true,
            mass: 0.0,
            is_character: false,
            is_volatile: false,
        }
    }

    pub fn is_static(&self) -> bool {
        self.mass == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub position: Vec3,
    /// Distance from the ray start.
    pub distance: f32,
}

/// The physics world's ray-cast query.
pub trait RayCaster {
    /// Casts a segment from `start` to `end` and reports every body it
    /// intersects to `on_hit`. The cast stops early once `on_hit` returns false.
    fn cast_ray(&self, start: Vec3, end: Vec3, on_hit: &mut dyn FnMut(&BodyInfo, &RayHit) -> bool);
}

bitflags! {
    /// Collider categories a free-path check ignores.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FreePathFlags: u8 {
        const SKIP_STATIC = 1 << 0;
        const SKIP_DYNAMIC = 1 << 1;
        const SKIP_VOLATILE = 1 << 2;
    }
}

/// Returns true if a hit against `body` should block a free path.
pub fn blocks_path(
    body: &BodyInfo,
    hit: &RayHit,
    flags: FreePathFlags,
    veto: Option<&dyn Fn(&BodyInfo, &RayHit) -> bool>,
) -> bool {
    if !body.collides_with_characters {
        return false;
    }
    if flags.contains(FreePathFlags::SKIP_STATIC) && body.is_static() {
        return false;
    }
    if flags.contains(FreePathFlags::SKIP_DYNAMIC) && (body.mass > 0.0 || body.is_character) {
        return false;
    }
    if flags.contains(FreePathFlags::SKIP_VOLATILE) && body.is_volatile {
        return false;
    }
    match veto {
        Some(intersects) => intersects(body, hit),
        None => true,
    }
}

/// Offsets of the parallel rays used by a free-path check, relative to the
/// ray centers. Ray 0 runs through the center, 1 and 2 to the sides, 3 and 4
/// above and below. The box is aligned with the segment, so on a slope the
/// upper and lower rays tilt with it.
pub fn ray_offsets(start: Vec3, end: Vec3, collide_size: Vec3, ray_count: usize) -> Vec<Vec3> {
    let ray_count = if (1..=MAX_FREE_PATH_RAYS).contains(&ray_count) {
        ray_count
    } else {
        MAX_FREE_PATH_RAYS
    };

    let forward = (end - start).normalize_or_zero();
    let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
    let up = right.cross(forward).try_normalize().unwrap_or(Vec3::Y);

    // Slightly inside the body so uneven floors do not count as blocking.
    let half_width = collide_size.x * 0.4;
    let half_height = collide_size.y * 0.4;

    [
        Vec3::ZERO,
        right * half_width,
        right * -half_width,
        up * half_height,
        up * -half_height,
    ]
    .into_iter()
    .take(ray_count)
    .collect()
}
