//! Physics hot paths: the vectorized integrator, force-field applicator,
//! and pairwise collision resolver.
//!
//! The integrator is the only SIMD code in the workspace. The scalar
//! kernel is the numerical reference; vector kernels are selected once at
//! construction from a runtime capability probe and must stay within the
//! documented tolerance of the reference (see `integrator` docs).

pub mod aligned;
pub mod collision;
pub mod fields;
pub mod integrator;

pub use aligned::AlignedBuf;
pub use collision::{CollisionSettings, resolve_collisions};
pub use fields::{FieldKind, ForceField, apply_fields};
pub use integrator::{Integrator, Kernel, StepParams};
