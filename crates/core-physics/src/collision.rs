//! Impulse-based pairwise collision resolution over grid neighborhoods.
//!
//! Equal-mass, frictional, elastic response. Candidate pairs come from the
//! spatial grid's 3×3 neighborhood query; the strict `handle` ordering
//! guarantees each unordered pair is visited exactly once, so the resolved
//! contact count does not depend on scan direction. Positions and
//! velocities are re-read from the store per pair, so later pairs observe
//! the separations applied by earlier ones.

use core_grid::SpatialGrid;
use core_pool::{Particle, ParticleHandle, ParticlePool};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionSettings {
    /// Particle collision radius in world units.
    pub radius: f32,
    /// 0 = perfectly inelastic, 1 = perfectly elastic.
    pub restitution: f32,
    /// Impulse scale applied to both bodies; damps tangential energy.
    pub friction: f32,
    pub enabled: bool,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            radius: 1.0,
            restitution: 0.8,
            friction: 0.95,
            enabled: true,
        }
    }
}

impl CollisionSettings {
    /// Grid cell size that keeps every candidate pair inside the 3×3
    /// neighborhood block.
    pub fn min_cell_size(&self) -> f32 {
        (self.radius * 2.0).max(1.0)
    }
}

/// Resolve one overlapping pair. Returns the updated bodies, or `None`
/// when the pair is separated, separating, or coincident.
fn resolve_pair(
    p1: Particle,
    p2: Particle,
    settings: &CollisionSettings,
) -> Option<(Particle, Particle)> {
    let min_dist = settings.radius * 2.0;
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let dist_sq = dx * dx + dy * dy;
    if dist_sq >= min_dist * min_dist || dist_sq < 1e-4 {
        return None;
    }

    let dist = dist_sq.sqrt();
    let nx = dx / dist;
    let ny = dy / dist;

    // Relative velocity along the collision normal.
    let dvn = (p2.vx - p1.vx) * nx + (p2.vy - p1.vy) * ny;
    if dvn >= 0.0 {
        return None; // already separating
    }

    // Equal-mass impulse, shared half each.
    let impulse = -(1.0 + settings.restitution) * dvn / 2.0;
    let jx = impulse * nx * settings.friction;
    let jy = impulse * ny * settings.friction;

    let mut a = p1;
    let mut b = p2;
    a.vx -= jx;
    a.vy -= jy;
    b.vx += jx;
    b.vy += jy;

    // Push each body out by half the overlap to clear inter-penetration.
    let separation = (min_dist - dist) * 0.5;
    a.x -= nx * separation;
    a.y -= ny * separation;
    b.x += nx * separation;
    b.y += ny * separation;

    Some((a, b))
}

/// Run the collision pass. `grid` must have been rebuilt from `pool` this
/// tick with cells at least [`CollisionSettings::min_cell_size`] wide.
/// Returns the number of resolved contacts.
pub fn resolve_collisions(
    pool: &mut ParticlePool,
    grid: &SpatialGrid,
    settings: &CollisionSettings,
) -> usize {
    if !settings.enabled {
        return 0;
    }

    let handles: Vec<ParticleHandle> = pool.iter().map(|(h, _)| h).collect();
    let mut contacts = 0usize;
    for &h1 in &handles {
        let origin = *pool.get(h1);
        for entry in grid.neighbors(origin.x, origin.y) {
            // Strict ordering: each unordered pair resolves exactly once.
            if entry.handle <= h1 {
                continue;
            }
            let a = *pool.get(h1);
            let b = *pool.get(entry.handle);
            if let Some((a2, b2)) = resolve_pair(a, b, settings) {
                *pool.get_mut(h1) = a2;
                *pool.get_mut(entry.handle) = b2;
                contacts += 1;
            }
        }
    }
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_grid::SpatialGrid;

    fn elastic() -> CollisionSettings {
        CollisionSettings {
            radius: 1.0,
            restitution: 1.0,
            friction: 1.0,
            enabled: true,
        }
    }

    fn build_grid(pool: &ParticlePool, settings: &CollisionSettings) -> SpatialGrid {
        let mut grid = SpatialGrid::new(100.0, 100.0, settings.min_cell_size().max(2.0)).unwrap();
        for (h, p) in pool.iter() {
            grid.insert(h, p.x, p.y);
        }
        grid
    }

    #[test]
    fn head_on_elastic_collision_swaps_velocities() {
        let settings = elastic();
        let mut pool = ParticlePool::new(2).unwrap();
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        *pool.get_mut(a) = Particle::new(49.3, 50.0, 10.0, 0.0);
        *pool.get_mut(b) = Particle::new(50.7, 50.0, -10.0, 0.0);

        let grid = build_grid(&pool, &settings);
        let contacts = resolve_collisions(&mut pool, &grid, &settings);
        assert_eq!(contacts, 1);
        assert!((pool.get(a).vx - -10.0).abs() < 1e-5);
        assert!((pool.get(b).vx - 10.0).abs() < 1e-5);
    }

    #[test]
    fn separating_pair_is_left_alone() {
        let settings = elastic();
        let mut pool = ParticlePool::new(2).unwrap();
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        *pool.get_mut(a) = Particle::new(49.5, 50.0, -5.0, 0.0);
        *pool.get_mut(b) = Particle::new(50.5, 50.0, 5.0, 0.0);

        let grid = build_grid(&pool, &settings);
        assert_eq!(resolve_collisions(&mut pool, &grid, &settings), 0);
        assert_eq!(pool.get(a).vx, -5.0);
        assert_eq!(pool.get(b).vx, 5.0);
    }

    #[test]
    fn overlapping_pair_is_separated() {
        let settings = CollisionSettings {
            restitution: 0.0,
            ..elastic()
        };
        let mut pool = ParticlePool::new(2).unwrap();
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        *pool.get_mut(a) = Particle::new(50.0, 50.0, 1.0, 0.0);
        *pool.get_mut(b) = Particle::new(50.8, 50.0, -1.0, 0.0);

        let grid = build_grid(&pool, &settings);
        resolve_collisions(&mut pool, &grid, &settings);
        let dx = pool.get(b).x - pool.get(a).x;
        assert!(dx >= 2.0 - 1e-4, "bodies still overlap: dx = {dx}");
    }

    #[test]
    fn disabled_settings_short_circuit() {
        let settings = CollisionSettings {
            enabled: false,
            ..elastic()
        };
        let mut pool = ParticlePool::new(2).unwrap();
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        *pool.get_mut(a) = Particle::new(50.0, 50.0, 5.0, 0.0);
        *pool.get_mut(b) = Particle::new(50.5, 50.0, -5.0, 0.0);
        let grid = build_grid(&pool, &settings);
        assert_eq!(resolve_collisions(&mut pool, &grid, &settings), 0);
    }

    #[test]
    fn each_unordered_pair_resolves_exactly_once() {
        // Three well-separated approaching pairs plus a loner. The strict
        // handle ordering must yield one contact per pair regardless of
        // where the slab scan starts.
        let settings = CollisionSettings {
            restitution: 0.5,
            ..elastic()
        };
        let mut pool = ParticlePool::new(8).unwrap();
        let pairs = [(20.0f32, 20.0f32), (50.0, 50.0), (80.0, 20.0)];
        for &(cx, cy) in &pairs {
            let a = pool.allocate().unwrap();
            let b = pool.allocate().unwrap();
            *pool.get_mut(a) = Particle::new(cx - 0.7, cy, 2.0, 0.0);
            *pool.get_mut(b) = Particle::new(cx + 0.7, cy, -2.0, 0.0);
        }
        let loner = pool.allocate().unwrap();
        *pool.get_mut(loner) = Particle::new(5.0, 90.0, 0.0, 0.0);

        let grid = build_grid(&pool, &settings);
        let contacts = resolve_collisions(&mut pool, &grid, &settings);
        assert_eq!(contacts, pairs.len());
    }
}
