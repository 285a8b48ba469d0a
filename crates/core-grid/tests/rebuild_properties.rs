//! Property-based rebuild correctness: after inserting every active
//! particle, each one appears exactly once, in the cell its position maps
//! to, and every reference in any cell points at a live particle.

use core_grid::SpatialGrid;
use core_pool::ParticlePool;
use proptest::prelude::*;

proptest! {
    #[test]
    fn rebuild_places_every_particle_exactly_once(
        positions in prop::collection::vec((-20.0f32..120.0, -20.0f32..120.0), 1..200),
        cell_size in 1.0f32..15.0,
    ) {
        let mut pool = ParticlePool::new(positions.len()).unwrap();
        let mut grid = SpatialGrid::new(100.0, 100.0, cell_size).unwrap();
        for &(x, y) in &positions {
            let h = pool.allocate().unwrap();
            let p = pool.get_mut(h);
            p.x = x;
            p.y = y;
            grid.insert(h, x, y);
        }

        prop_assert_eq!(grid.len(), pool.active());

        // Each particle is findable through the 3x3 neighborhood of its
        // own position, exactly once.
        for (h, p) in pool.iter() {
            let hits = grid.neighbors(p.x, p.y).filter(|e| e.handle == h).count();
            prop_assert_eq!(hits, 1, "handle {:?} seen {} times", h, hits);
        }

        // Every reference in the full-world radius sweep is live and its
        // snapshot matches the store.
        let all: Vec<_> = grid.radius_query(50.0, 50.0, 1000.0).collect();
        prop_assert_eq!(all.len(), pool.active());
        for entry in all {
            prop_assert!(pool.is_live(entry.handle));
            let p = pool.get(entry.handle);
            prop_assert_eq!((p.x, p.y), (entry.x, entry.y));
        }

        // Clear invalidates the whole view.
        grid.clear();
        prop_assert_eq!(grid.neighbors(50.0, 50.0).count(), 0);
    }
}
