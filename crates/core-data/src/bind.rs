//! Record-to-particle binder.
//!
//! Resolves the `x` and `y` columns (required) and `speed` and `value`
//! (optional) by name, then seeds one particle per record up to a caller
//! cap. Initial velocity magnitude comes from `speed`; direction fans out
//! by record index around the golden angle so bound datasets don't launch
//! every particle along the same ray.

use crate::stream::RecordStream;
use core_error::{EngineError, Result};
use core_sim::Simulation;

/// Golden angle in radians; successive records land on well-spread rays.
const SPREAD_ANGLE: f32 = 2.399_963;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Particles seeded.
    pub bound: usize,
    /// Records skipped because the pool filled.
    pub skipped: usize,
}

/// Seed particles from `stream` into `sim`, at most `cap` of them.
///
/// The stream must be open. Fails with `InvalidParameter` when the schema
/// lacks `x` or `y`.
pub fn bind_particles(
    stream: &mut dyn RecordStream,
    sim: &mut Simulation,
    cap: usize,
) -> Result<BindReport> {
    let schema = stream.schema()?;
    let col_x = schema
        .find("x")
        .ok_or_else(|| EngineError::invalid_parameter("schema has no `x` column"))?;
    let col_y = schema
        .find("y")
        .ok_or_else(|| EngineError::invalid_parameter("schema has no `y` column"))?;
    let col_speed = schema.find("speed");
    let col_value = schema.find("value");

    let mut report = BindReport::default();
    let mut index = 0usize;
    while stream.has_next() && report.bound < cap {
        let record = stream.read_next()?;
        let x = record.get_f32(col_x)?;
        let y = record.get_f32(col_y)?;
        let speed = match col_speed {
            Some(ordinal) => record.get_f32(ordinal)?,
            None => 0.0,
        };
        // `value` drives color/analytics downstream; binding ignores it
        // beyond validating the ordinal resolves.
        if let Some(ordinal) = col_value {
            record.get_f32(ordinal)?;
        }

        let angle = index as f32 * SPREAD_ANGLE;
        match sim.add_particle(x, y, speed * angle.cos(), speed * angle.sin()) {
            Ok(_) => report.bound += 1,
            Err(err) if err.kind() == core_error::ErrorKind::OutOfResources => {
                report.skipped += 1;
                tracing::debug!(target: "data.bind", bound = report.bound, "pool filled during bind");
                break;
            }
            Err(err) => return Err(err),
        }
        index += 1;
    }

    tracing::info!(
        target: "data.bind",
        bound = report.bound,
        skipped = report.skipped,
        "bind complete"
    );
    Ok(report)
}
