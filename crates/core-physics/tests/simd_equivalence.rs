//! Property-based equivalence between the vector kernels and the scalar
//! reference.
//!
//! Two regimes, both asserted:
//! * world-scale inputs (`|x|,|v| <= 1e6`, `|g|,|wind| <= 1e3`,
//!   `1e-5 <= dt <= 1`): per-component error within 1e-5 absolute or
//!   1e-5 relative;
//! * extreme inputs: error within 1.0 absolute or 1e-5 relative, and no
//!   faults (NaN outputs are acceptable when inputs are non-finite).

use core_physics::integrator::{Integrator, Kernel, StepParams, step_scalar};
use core_pool::Particle;
use proptest::prelude::*;

fn host_kernels() -> Vec<Kernel> {
    let best = Kernel::detect();
    let mut kernels = Vec::new();
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    if best == Kernel::Avx {
        kernels.push(Kernel::Sse2);
    }
    if best != Kernel::Scalar {
        kernels.push(best);
    }
    kernels
}

fn particles(limit: f32, max_len: usize) -> impl Strategy<Value = Vec<Particle>> {
    prop::collection::vec(
        (
            -limit..limit,
            -limit..limit,
            -limit..limit,
            -limit..limit,
        )
            .prop_map(|(x, y, vx, vy)| Particle::new(x, y, vx, vy)),
        0..max_len,
    )
}

fn within(actual: f32, reference: f32, abs_tol: f32) -> bool {
    if actual == reference {
        return true;
    }
    if reference.is_nan() {
        return actual.is_nan();
    }
    let abs = (actual - reference).abs();
    abs <= abs_tol || (reference.abs() >= 1e-10 && abs / reference.abs() <= 1e-5)
}

fn assert_equivalent(input: &[Particle], params: StepParams, abs_tol: f32) {
    let mut reference = input.to_vec();
    step_scalar(&mut reference, params);
    for kernel in host_kernels() {
        let mut vectored = input.to_vec();
        Integrator::with_kernel(kernel).step(&mut vectored, params);
        for (i, (v, r)) in vectored.iter().zip(&reference).enumerate() {
            for (a, b) in [(v.x, r.x), (v.y, r.y), (v.vx, r.vx), (v.vy, r.vy)] {
                assert!(
                    within(a, b, abs_tol),
                    "kernel {} particle {i}: {a} vs reference {b} (params {params:?})",
                    kernel.name()
                );
            }
        }
    }
}

proptest! {
    #[test]
    fn world_scale_inputs_stay_within_tight_envelope(
        slab in particles(1e6, 80),
        dt in 1e-5f32..1.0,
        gravity in -1e3f32..1e3,
        windx in -1e3f32..1e3,
        windy in -1e3f32..1e3,
    ) {
        assert_equivalent(&slab, StepParams::new(dt, gravity, windx, windy), 1e-5);
    }

    #[test]
    fn extreme_inputs_stay_within_loose_envelope(
        slab in particles(1e12, 40),
        dt in 1e-5f32..1.0,
        gravity in -1e6f32..1e6,
        windx in -1e6f32..1e6,
        windy in -1e6f32..1e6,
    ) {
        assert_equivalent(&slab, StepParams::new(dt, gravity, windx, windy), 1.0);
    }
}
