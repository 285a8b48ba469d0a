//! Status line drawn through the framebuffer's text op.

use core_render::FrameBuffer;
use core_sim::{Simulation, StepReport};

const HUD_COLOR: u32 = 0xC0C0C0;
const ALERT_COLOR: u32 = 0xFF5050;

/// Transient state the HUD renders alongside the simulation counters.
#[derive(Debug, Default)]
pub struct Hud {
    pub paused: bool,
    pub field_name: &'static str,
    pub cpu_percent: Option<f32>,
    pub forecast_particles: Option<f32>,
    /// Frames remaining on the anomaly flash.
    pub anomaly_frames: u32,
}

impl Hud {
    pub fn flag_anomaly(&mut self, frames: u32) {
        self.anomaly_frames = self.anomaly_frames.max(frames);
    }

    pub fn tick(&mut self) {
        self.anomaly_frames = self.anomaly_frames.saturating_sub(1);
    }

    pub fn draw(&self, fb: &mut FrameBuffer, sim: &Simulation, report: StepReport, fps: u32) {
        let (wind_x, wind_y) = sim.wind();
        let collisions = if sim.collision_settings().enabled {
            "on"
        } else {
            "off"
        };
        let mut line = format!(
            "ember [{}] fps {fps} | p {}/{} | g {:+.0} wind ({:+.0},{:+.0}) | col {collisions} | field {} | hits {}",
            sim.integrator_kernel().name(),
            sim.particle_count(),
            sim.capacity(),
            sim.gravity(),
            wind_x,
            wind_y,
            if self.field_name.is_empty() {
                "none"
            } else {
                self.field_name
            },
            report.contacts,
        );
        if let Some(cpu) = self.cpu_percent {
            line.push_str(&format!(" | cpu {cpu:>4.1}%"));
        }
        if let Some(next) = self.forecast_particles {
            line.push_str(&format!(" | next ~{next:.0}"));
        }
        if self.paused {
            line.push_str(" | PAUSED");
        }
        fb.text(0, 0, &line, HUD_COLOR);

        if self.anomaly_frames > 0 {
            let marker = "ANOMALY";
            let x = fb.width() as i32 - marker.len() as i32;
            fb.text(x, 0, marker, ALERT_COLOR);
        }
    }
}
