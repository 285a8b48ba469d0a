//! Step coordinator: owns the particle store, scratch buffer, spatial
//! grid, force fields, and collision settings, and advances the world one
//! tick at a time.
//!
//! Tick phases, strictly in order:
//! 1. snapshot active particles into the aligned scratch buffer
//! 2. integrate (vector kernel) on the scratch slab
//! 3. force-field pass on the scratch slab
//! 4. write results back to owning slots
//! 5. bounds clamp with wall damping and ground friction
//! 6. quiescence reap (after write-back, never inside a mutating pass)
//! 7. grid rebuild + collision resolution, when enabled
//! 8. active-counter resync into the step report
//!
//! If the scratch buffer cannot grow, phases 1–4 degrade to an in-place
//! scalar pass over the store's iterator; everything else is unchanged.
//! The degradation is recorded against the simulation's error counters.

use core_error::{EngineError, ErrorCounters, Result};
use core_grid::{GridStats, SpatialGrid};
use core_physics::{
    AlignedBuf, CollisionSettings, ForceField, Integrator, StepParams, apply_fields,
    resolve_collisions,
};
use core_pool::{Particle, ParticleHandle, ParticlePool};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Velocity retained along an axis after a wall bounce.
const WALL_DAMPING: f32 = 0.6;
/// Horizontal velocity retained per tick while resting on the ground.
const GROUND_FRICTION: f32 = 0.98;
/// Speed below which a near-ground particle counts as quiescent.
const QUIESCENT_SPEED: f32 = 0.5;

/// Force fields are a small fixed table, like the rest of the per-tick
/// state; ten matches every workload we have.
pub const MAX_FORCE_FIELDS: usize = 10;

/// What one tick did, for HUDs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub active: usize,
    pub reaped: usize,
    pub contacts: usize,
    /// True when the scratch buffer could not grow and the tick ran the
    /// in-place scalar path.
    pub fallback: bool,
}

#[derive(Debug)]
pub struct Simulation {
    pool: ParticlePool,
    integrator: Integrator,
    scratch: AlignedBuf,
    scratch_handles: Vec<ParticleHandle>,
    reap_scratch: Vec<ParticleHandle>,
    grid: SpatialGrid,
    fields: Vec<ForceField>,
    collisions: CollisionSettings,
    counters: ErrorCounters,
    width: f32,
    height: f32,
    gravity: f32,
    windx: f32,
    windy: f32,
    rng: SmallRng,
}

impl Simulation {
    /// World dimensions are in cells; the default binding is one world
    /// unit per terminal cell.
    pub fn new(capacity: usize, width: usize, height: usize) -> Result<Self> {
        if width < 2 || height < 2 {
            return Err(EngineError::invalid_parameter(
                "world must be at least 2x2 cells",
            ));
        }
        let collisions = CollisionSettings::default();
        let grid = SpatialGrid::new(width as f32, height as f32, collisions.min_cell_size())?;
        Ok(Self {
            pool: ParticlePool::new(capacity)?,
            integrator: Integrator::new(),
            scratch: AlignedBuf::new(),
            scratch_handles: Vec::new(),
            reap_scratch: Vec::new(),
            grid,
            fields: Vec::new(),
            collisions,
            counters: ErrorCounters::new(),
            width: width as f32,
            height: height as f32,
            gravity: 30.0,
            windx: 0.0,
            windy: 0.0,
            rng: SmallRng::from_os_rng(),
        })
    }

    /// Advance the world by `dt` seconds.
    pub fn step(&mut self, dt: f32) -> Result<StepReport> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(EngineError::invalid_parameter("dt must be positive and finite"));
        }
        let mut report = StepReport::default();
        let params = StepParams::new(dt, self.gravity, self.windx, self.windy);

        if self.pool.active() > 0 {
            match self.scratch.ensure_capacity(self.pool.active()) {
                Ok(()) => self.integrate_via_scratch(params, dt),
                Err(err) => {
                    self.counters.record(&err);
                    tracing::warn!(
                        target: "sim.step",
                        error = %err,
                        "scratch growth failed, degrading to in-place scalar pass"
                    );
                    report.fallback = true;
                    self.integrate_in_place(params, dt);
                }
            }

            self.clamp_bounds();
            report.reaped = self.reap_quiescent();

            if self.collisions.enabled && self.pool.active() > 1 {
                self.rebuild_grid();
                report.contacts = resolve_collisions(&mut self.pool, &self.grid, &self.collisions);
                // Separation can nudge a wall-adjacent particle past the
                // boundary; positions must stay in-world after every tick.
                self.reclamp_positions();
            }
        }

        report.active = self.pool.active();
        tracing::trace!(
            target: "sim.step",
            active = report.active,
            reaped = report.reaped,
            contacts = report.contacts,
            "tick"
        );
        Ok(report)
    }

    /// Phases 1–4: snapshot, integrate, fields, write-back.
    fn integrate_via_scratch(&mut self, params: StepParams, dt: f32) {
        self.scratch.clear();
        self.scratch_handles.clear();
        for (handle, particle) in self.pool.iter() {
            self.scratch_handles.push(handle);
            self.scratch.push(*particle);
        }

        self.integrator.step(self.scratch.as_mut_slice(), params);
        apply_fields(&self.fields, self.scratch.as_mut_slice(), dt);

        for (&handle, particle) in self.scratch_handles.iter().zip(self.scratch.as_slice()) {
            *self.pool.get_mut(handle) = *particle;
        }
    }

    /// Degraded phases 1–4: scalar update against live slots.
    fn integrate_in_place(&mut self, params: StepParams, dt: f32) {
        let fields = &self.fields;
        for (_, particle) in self.pool.iter_mut() {
            core_physics::integrator::step_scalar(std::slice::from_mut(particle), params);
            for field in fields {
                field.apply(particle, dt);
            }
        }
    }

    /// Phase 5: clamp into `[0, W-1] × [0, H-1]`, reflecting and damping
    /// velocity on contact; ground friction when settling on the floor.
    fn clamp_bounds(&mut self) {
        let max_x = self.width - 1.0;
        let max_y = self.height - 1.0;
        for (_, p) in self.pool.iter_mut() {
            if p.x < 0.0 {
                p.x = 0.0;
                p.vx = -p.vx * WALL_DAMPING;
            } else if p.x > max_x {
                p.x = max_x;
                p.vx = -p.vx * WALL_DAMPING;
            }

            if p.y < 0.0 {
                p.y = 0.0;
                p.vy = -p.vy * WALL_DAMPING;
            } else if p.y > max_y {
                p.y = max_y;
                p.vy = -p.vy * WALL_DAMPING;
                if p.vy.abs() < 2.0 {
                    p.vx *= GROUND_FRICTION;
                }
            }
        }
    }

    /// Position-only clamp after the collision pass.
    fn reclamp_positions(&mut self) {
        let max_x = self.width - 1.0;
        let max_y = self.height - 1.0;
        for (_, p) in self.pool.iter_mut() {
            p.x = p.x.clamp(0.0, max_x);
            p.y = p.y.clamp(0.0, max_y);
        }
    }

    /// Phase 6: release near-ground, nearly stationary particles.
    fn reap_quiescent(&mut self) -> usize {
        let floor = self.height - 2.0;
        self.reap_scratch.clear();
        for (handle, p) in self.pool.iter() {
            if p.y >= floor && p.vx.abs() < QUIESCENT_SPEED && p.vy.abs() < QUIESCENT_SPEED {
                self.reap_scratch.push(handle);
            }
        }
        for i in 0..self.reap_scratch.len() {
            // Handles were collected from live slots; release cannot fail.
            let _ = self.pool.release(self.reap_scratch[i]);
        }
        self.reap_scratch.len()
    }

    fn rebuild_grid(&mut self) {
        self.grid.clear();
        for (handle, p) in self.pool.iter() {
            self.grid.insert(handle, p.x, p.y);
        }
    }

    /// Spawn up to `count` particles at `(x, y)` with random directions
    /// within `±spread` radians of +x and speeds in `[5, 20)`. Returns how
    /// many were actually spawned before the pool filled.
    pub fn spawn_burst(&mut self, x: f32, y: f32, count: usize, spread: f32) -> usize {
        let mut spawned = 0usize;
        for _ in 0..count {
            let Ok(handle) = self.pool.allocate() else {
                break;
            };
            let angle = self.rng.random_range(-spread..=spread);
            let speed: f32 = self.rng.random_range(5.0..20.0);
            *self.pool.get_mut(handle) = Particle::new(
                x.clamp(0.0, self.width - 1.0),
                y.clamp(0.0, self.height - 1.0),
                speed * angle.cos(),
                speed * angle.sin(),
            );
            spawned += 1;
        }
        spawned
    }

    pub fn add_particle(&mut self, x: f32, y: f32, vx: f32, vy: f32) -> Result<ParticleHandle> {
        let handle = core_error::observe(&self.counters, self.pool.allocate())?;
        *self.pool.get_mut(handle) = Particle::new(
            x.clamp(0.0, self.width - 1.0),
            y.clamp(0.0, self.height - 1.0),
            vx,
            vy,
        );
        Ok(handle)
    }

    /// Release every active particle.
    pub fn clear(&mut self) {
        self.reap_scratch.clear();
        self.reap_scratch.extend(self.pool.iter().map(|(h, _)| h));
        for i in 0..self.reap_scratch.len() {
            let _ = self.pool.release(self.reap_scratch[i]);
        }
    }

    pub fn add_field(&mut self, field: ForceField) -> Result<usize> {
        if self.fields.len() >= MAX_FORCE_FIELDS {
            return Err(EngineError::out_of_resources("force-field table is full"));
        }
        self.fields.push(field);
        Ok(self.fields.len() - 1)
    }

    /// Remove a field and compact the table; later indices shift down.
    pub fn remove_field(&mut self, index: usize) -> Result<()> {
        if index >= self.fields.len() {
            return Err(EngineError::invalid_parameter("no force field at index"));
        }
        self.fields.remove(index);
        Ok(())
    }

    pub fn clear_fields(&mut self) {
        self.fields.clear();
    }

    pub fn fields(&self) -> &[ForceField] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [ForceField] {
        &mut self.fields
    }

    pub fn collision_settings(&self) -> CollisionSettings {
        self.collisions
    }

    /// Replace collision settings; a radius change re-sizes the grid so a
    /// 3×3 neighborhood still covers every candidate pair.
    pub fn set_collision_settings(&mut self, settings: CollisionSettings) -> Result<()> {
        if !(settings.radius > 0.0)
            || !(0.0..=1.0).contains(&settings.restitution)
            || !(0.0..=1.0).contains(&settings.friction)
        {
            return Err(EngineError::invalid_parameter(
                "collision radius must be positive, restitution and friction in [0, 1]",
            ));
        }
        if settings.min_cell_size() != self.collisions.min_cell_size() {
            self.grid = SpatialGrid::new(self.width, self.height, settings.min_cell_size())?;
        }
        self.collisions = settings;
        Ok(())
    }

    pub fn set_collisions_enabled(&mut self, enabled: bool) {
        self.collisions.enabled = enabled;
    }

    pub fn particle_count(&self) -> usize {
        self.pool.active()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    pub fn integrator_kernel(&self) -> core_physics::Kernel {
        self.integrator.kernel()
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.gravity = gravity;
    }

    pub fn wind(&self) -> (f32, f32) {
        (self.windx, self.windy)
    }

    pub fn set_wind(&mut self, windx: f32, windy: f32) {
        self.windx = windx;
        self.windy = windy;
    }

    /// Occupancy of the spatial grid as of its last rebuild.
    pub fn grid_stats(&self) -> GridStats {
        self.grid.stats()
    }

    pub fn error_counters(&self) -> &ErrorCounters {
        &self.counters
    }
}
