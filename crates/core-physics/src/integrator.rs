//! Semi-implicit Euler integration over a contiguous particle slab.
//!
//! Per step, symmetric for every particle:
//!
//! ```text
//! vx += windx * dt
//! vy += (gravity + windy) * dt
//! x  += vx * dt
//! y  += vy * dt
//! ```
//!
//! Kernel selection happens once, at [`Integrator::new`], from a runtime
//! capability probe. The scalar kernel is the numerical reference; the
//! vector kernels process four (SSE2, NEON) or eight (AVX) particles per
//! iteration by gathering components into lanes, and finish the
//! `count % lanes` remainder with the scalar reference. All kernels use
//! the same unfused add/mul sequence, so vector results track the
//! reference to well under the documented 1e-5 envelope for world-scale
//! inputs. NaN or infinite inputs propagate as NaN outputs; they never
//! fault.

use core_pool::Particle;

/// Per-step scalars shared by every particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    pub dt: f32,
    pub gravity: f32,
    pub windx: f32,
    pub windy: f32,
}

impl StepParams {
    pub fn new(dt: f32, gravity: f32, windx: f32, windy: f32) -> Self {
        Self {
            dt,
            gravity,
            windx,
            windy,
        }
    }
}

/// Available integration kernels. Variants exist on every platform so the
/// type is portable; `detect` only ever returns one the host can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Scalar,
    Sse2,
    Avx,
    Neon,
}

impl Kernel {
    /// Probe the host once and pick the widest supported kernel.
    pub fn detect() -> Self {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            if std::arch::is_x86_feature_detected!("avx") {
                return Kernel::Avx;
            }
            if std::arch::is_x86_feature_detected!("sse2") {
                return Kernel::Sse2;
            }
        }
        #[cfg(target_arch = "aarch64")]
        {
            if std::arch::is_aarch64_feature_detected!("neon") {
                return Kernel::Neon;
            }
        }
        Kernel::Scalar
    }

    pub const fn name(self) -> &'static str {
        match self {
            Kernel::Scalar => "scalar",
            Kernel::Sse2 => "sse2",
            Kernel::Avx => "avx",
            Kernel::Neon => "neon",
        }
    }

    /// Particles consumed per vector iteration (1 for the scalar path).
    pub const fn lanes(self) -> usize {
        match self {
            Kernel::Scalar => 1,
            Kernel::Sse2 | Kernel::Neon => 4,
            Kernel::Avx => 8,
        }
    }
}

/// Integration entry point. Holds the kernel chosen at construction;
/// callers only ever see `step`.
#[derive(Debug, Clone, Copy)]
pub struct Integrator {
    kernel: Kernel,
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Integrator {
    pub fn new() -> Self {
        let kernel = Kernel::detect();
        tracing::debug!(target: "physics.simd", kernel = kernel.name(), "integrator kernel selected");
        Self { kernel }
    }

    /// Force a specific kernel; used by equivalence tests and benches.
    pub fn with_kernel(kernel: Kernel) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Advance every particle in `slab` by one step. Empty slabs are a
    /// no-op and touch no memory.
    pub fn step(&self, slab: &mut [Particle], params: StepParams) {
        if slab.is_empty() {
            return;
        }
        match self.kernel {
            Kernel::Scalar => step_scalar(slab, params),
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            // SAFETY: `detect` (or the test harness) only selects these
            // kernels on hosts that report the matching CPU feature.
            Kernel::Sse2 => unsafe { step_sse2(slab, params) },
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Kernel::Avx => unsafe { step_avx(slab, params) },
            #[cfg(target_arch = "aarch64")]
            // SAFETY: as above; NEON is mandatory on aarch64.
            Kernel::Neon => unsafe { step_neon(slab, params) },
            #[allow(unreachable_patterns)]
            _ => step_scalar(slab, params),
        }
    }
}

/// Scalar reference kernel. Every vector kernel must agree with this one
/// within the tolerance envelope.
pub fn step_scalar(slab: &mut [Particle], params: StepParams) {
    let wind_x_dt = params.windx * params.dt;
    let rise_dt = (params.gravity + params.windy) * params.dt;
    for p in slab {
        p.vx += wind_x_dt;
        p.vy += rise_dt;
        p.x += p.vx * params.dt;
        p.y += p.vy * params.dt;
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "sse2")]
unsafe fn step_sse2(slab: &mut [Particle], params: StepParams) {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::*;

    unsafe {
        let wind_x_dt = _mm_set1_ps(params.windx * params.dt);
        let rise_dt = _mm_set1_ps((params.gravity + params.windy) * params.dt);
        let dt = _mm_set1_ps(params.dt);

        let mut quads = slab.chunks_exact_mut(4);
        for q in &mut quads {
            let mut x = _mm_set_ps(q[3].x, q[2].x, q[1].x, q[0].x);
            let mut y = _mm_set_ps(q[3].y, q[2].y, q[1].y, q[0].y);
            let mut vx = _mm_set_ps(q[3].vx, q[2].vx, q[1].vx, q[0].vx);
            let mut vy = _mm_set_ps(q[3].vy, q[2].vy, q[1].vy, q[0].vy);

            vx = _mm_add_ps(vx, wind_x_dt);
            vy = _mm_add_ps(vy, rise_dt);
            x = _mm_add_ps(x, _mm_mul_ps(vx, dt));
            y = _mm_add_ps(y, _mm_mul_ps(vy, dt));

            let mut xs = [0.0f32; 4];
            let mut ys = [0.0f32; 4];
            let mut vxs = [0.0f32; 4];
            let mut vys = [0.0f32; 4];
            _mm_storeu_ps(xs.as_mut_ptr(), x);
            _mm_storeu_ps(ys.as_mut_ptr(), y);
            _mm_storeu_ps(vxs.as_mut_ptr(), vx);
            _mm_storeu_ps(vys.as_mut_ptr(), vy);
            for (i, p) in q.iter_mut().enumerate() {
                *p = Particle::new(xs[i], ys[i], vxs[i], vys[i]);
            }
        }
        step_scalar(quads.into_remainder(), params);
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx")]
unsafe fn step_avx(slab: &mut [Particle], params: StepParams) {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::*;

    unsafe {
        let wind_x_dt = _mm256_set1_ps(params.windx * params.dt);
        let rise_dt = _mm256_set1_ps((params.gravity + params.windy) * params.dt);
        let dt = _mm256_set1_ps(params.dt);

        let mut octets = slab.chunks_exact_mut(8);
        for q in &mut octets {
            let mut x = _mm256_set_ps(
                q[7].x, q[6].x, q[5].x, q[4].x, q[3].x, q[2].x, q[1].x, q[0].x,
            );
            let mut y = _mm256_set_ps(
                q[7].y, q[6].y, q[5].y, q[4].y, q[3].y, q[2].y, q[1].y, q[0].y,
            );
            let mut vx = _mm256_set_ps(
                q[7].vx, q[6].vx, q[5].vx, q[4].vx, q[3].vx, q[2].vx, q[1].vx, q[0].vx,
            );
            let mut vy = _mm256_set_ps(
                q[7].vy, q[6].vy, q[5].vy, q[4].vy, q[3].vy, q[2].vy, q[1].vy, q[0].vy,
            );

            vx = _mm256_add_ps(vx, wind_x_dt);
            vy = _mm256_add_ps(vy, rise_dt);
            x = _mm256_add_ps(x, _mm256_mul_ps(vx, dt));
            y = _mm256_add_ps(y, _mm256_mul_ps(vy, dt));

            let mut xs = [0.0f32; 8];
            let mut ys = [0.0f32; 8];
            let mut vxs = [0.0f32; 8];
            let mut vys = [0.0f32; 8];
            _mm256_storeu_ps(xs.as_mut_ptr(), x);
            _mm256_storeu_ps(ys.as_mut_ptr(), y);
            _mm256_storeu_ps(vxs.as_mut_ptr(), vx);
            _mm256_storeu_ps(vys.as_mut_ptr(), vy);
            for (i, p) in q.iter_mut().enumerate() {
                *p = Particle::new(xs[i], ys[i], vxs[i], vys[i]);
            }
        }
        step_scalar(octets.into_remainder(), params);
    }
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn step_neon(slab: &mut [Particle], params: StepParams) {
    use std::arch::aarch64::*;

    unsafe {
        let wind_x_dt = vdupq_n_f32(params.windx * params.dt);
        let rise_dt = vdupq_n_f32((params.gravity + params.windy) * params.dt);
        let dt = vdupq_n_f32(params.dt);

        let mut quads = slab.chunks_exact_mut(4);
        for q in &mut quads {
            let xs = [q[0].x, q[1].x, q[2].x, q[3].x];
            let ys = [q[0].y, q[1].y, q[2].y, q[3].y];
            let vxs = [q[0].vx, q[1].vx, q[2].vx, q[3].vx];
            let vys = [q[0].vy, q[1].vy, q[2].vy, q[3].vy];

            let mut x = vld1q_f32(xs.as_ptr());
            let mut y = vld1q_f32(ys.as_ptr());
            let mut vx = vld1q_f32(vxs.as_ptr());
            let mut vy = vld1q_f32(vys.as_ptr());

            vx = vaddq_f32(vx, wind_x_dt);
            vy = vaddq_f32(vy, rise_dt);
            // Unfused mul+add, matching the scalar reference's rounding.
            x = vaddq_f32(x, vmulq_f32(vx, dt));
            y = vaddq_f32(y, vmulq_f32(vy, dt));

            let mut xo = [0.0f32; 4];
            let mut yo = [0.0f32; 4];
            let mut vxo = [0.0f32; 4];
            let mut vyo = [0.0f32; 4];
            vst1q_f32(xo.as_mut_ptr(), x);
            vst1q_f32(yo.as_mut_ptr(), y);
            vst1q_f32(vxo.as_mut_ptr(), vx);
            vst1q_f32(vyo.as_mut_ptr(), vy);
            for (i, p) in q.iter_mut().enumerate() {
                *p = Particle::new(xo[i], yo[i], vxo[i], vyo[i]);
            }
        }
        step_scalar(quads.into_remainder(), params);
    }
}
