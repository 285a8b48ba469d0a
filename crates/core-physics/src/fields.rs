//! Force fields applied to the particle slab between integration and
//! write-back.
//!
//! Four kinds: radial push/pull, constant directional, tangential vortex,
//! and inverse-square attractor. A field with `radius == 0` is unbounded;
//! otherwise its effect cuts off outside the radius. Effects accumulate
//! in the order fields were added; the applicator iterates particles in
//! the outer loop so each particle's row stays hot while the small field
//! table is rescanned.

use core_pool::Particle;

/// Squared distance below which radial/vortex falloffs would blow up.
const NEAR_SINGULAR_SQ: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Push away from (strength > 0) or pull toward (strength < 0) center.
    Radial,
    /// Constant force along a unit direction (wind, thrust).
    Directional,
    /// Tangential force around center: perpendicular to the radius vector.
    Vortex,
    /// Gravitational point attraction, `strength / d^2` with softening.
    Attractor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceField {
    pub kind: FieldKind,
    pub center_x: f32,
    pub center_y: f32,
    pub strength: f32,
    /// Effective radius in world units; 0 means unbounded.
    pub radius: f32,
    pub dir_x: f32,
    pub dir_y: f32,
    pub active: bool,
}

impl ForceField {
    pub fn radial(center_x: f32, center_y: f32, strength: f32, radius: f32) -> Self {
        Self {
            kind: FieldKind::Radial,
            center_x,
            center_y,
            strength,
            radius,
            dir_x: 0.0,
            dir_y: 0.0,
            active: true,
        }
    }

    /// Direction is normalized here, once. A zero direction yields an
    /// inert field rather than an error.
    pub fn directional(dir_x: f32, dir_y: f32, strength: f32) -> Self {
        let len = (dir_x * dir_x + dir_y * dir_y).sqrt();
        let (nx, ny) = if len > 1e-4 {
            (dir_x / len, dir_y / len)
        } else {
            (0.0, 0.0)
        };
        Self {
            kind: FieldKind::Directional,
            center_x: 0.0,
            center_y: 0.0,
            strength,
            radius: 0.0,
            dir_x: nx,
            dir_y: ny,
            active: true,
        }
    }

    pub fn vortex(center_x: f32, center_y: f32, strength: f32, radius: f32) -> Self {
        Self {
            kind: FieldKind::Vortex,
            center_x,
            center_y,
            strength,
            radius,
            dir_x: 0.0,
            dir_y: 0.0,
            active: true,
        }
    }

    pub fn attractor(center_x: f32, center_y: f32, strength: f32, radius: f32) -> Self {
        Self {
            kind: FieldKind::Attractor,
            center_x,
            center_y,
            strength,
            radius,
            dir_x: 0.0,
            dir_y: 0.0,
            active: true,
        }
    }

    fn within_radius(&self, dist_sq: f32) -> bool {
        self.radius <= 0.0 || dist_sq <= self.radius * self.radius
    }

    /// Accumulate this field's velocity change onto one particle.
    pub fn apply(&self, p: &mut Particle, dt: f32) {
        if !self.active {
            return;
        }
        match self.kind {
            FieldKind::Radial => {
                let dx = p.x - self.center_x;
                let dy = p.y - self.center_y;
                let dist_sq = dx * dx + dy * dy;
                if !self.within_radius(dist_sq) || dist_sq < NEAR_SINGULAR_SQ {
                    return;
                }
                let dist = dist_sq.sqrt();
                let force = self.strength / (1.0 + dist * 0.1);
                p.vx += dx / dist * force * dt;
                p.vy += dy / dist * force * dt;
            }
            FieldKind::Directional => {
                p.vx += self.dir_x * self.strength * dt;
                p.vy += self.dir_y * self.strength * dt;
            }
            FieldKind::Vortex => {
                let dx = p.x - self.center_x;
                let dy = p.y - self.center_y;
                let dist_sq = dx * dx + dy * dy;
                if !self.within_radius(dist_sq) || dist_sq < NEAR_SINGULAR_SQ {
                    return;
                }
                let dist = dist_sq.sqrt();
                let force = self.strength / (1.0 + dist * 0.05);
                // Perpendicular to the radius vector: (-dy, dx) / d.
                p.vx += -dy / dist * force * dt;
                p.vy += dx / dist * force * dt;
            }
            FieldKind::Attractor => {
                let dx = self.center_x - p.x;
                let dy = self.center_y - p.y;
                let dist_sq = dx * dx + dy * dy;
                if !self.within_radius(dist_sq) || dist_sq < 1.0 {
                    // Softening: skip inside unit distance.
                    return;
                }
                let dist = dist_sq.sqrt();
                let force = self.strength / dist_sq;
                p.vx += dx / dist * force * dt;
                p.vy += dy / dist * force * dt;
            }
        }
    }
}

/// Apply every active field to every particle, particle in the outer loop.
pub fn apply_fields(fields: &[ForceField], slab: &mut [Particle], dt: f32) {
    if fields.is_empty() {
        return;
    }
    for p in slab {
        for field in fields {
            field.apply(p, dt);
        }
    }
}
