//! Event types and channel policy for the driver loop.
//!
//! -----------------------------------------------------------------------
//! Channel policy
//! -----------------------------------------------------------------------
//! The driver consumes a bounded mpsc channel sized by
//! [`EVENT_CHANNEL_CAP`]. The input service uses non-blocking sends: a
//! full channel drops the event and bumps a counter rather than stalling
//! the reader task, because stale nudge commands are worthless once the
//! frame that should have consumed them has passed. The simulation core
//! never sees this channel; commands are drained between ticks, so an
//! in-flight tick is never interrupted.
//! -----------------------------------------------------------------------

use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc;

pub const EVENT_CHANNEL_CAP: usize = 1024;

// Telemetry: relaxed atomic counters, sampled by the HUD and tests.
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static KEYPRESS_TOTAL: AtomicU64 = AtomicU64::new(0);
pub static COMMANDS_EMITTED: AtomicU64 = AtomicU64::new(0);

/// Commands the input layer can issue against the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimCommand {
    /// Spawn a burst at the world center.
    Burst,
    /// Nudge the wind vector by this delta.
    WindDelta(f32, f32),
    /// Nudge gravity by this delta.
    GravityDelta(f32),
    ToggleCollisions,
    /// Cycle through the demo force fields (off → vortex → attractor →
    /// radial → off).
    CycleField,
    ClearParticles,
    TogglePause,
    Quit,
}

/// Top-level event consumed by the driver loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Command(SimCommand),
    /// Terminal geometry changed: `(columns, rows)`.
    Resize(u16, u16),
    Shutdown,
}

/// Build the driver's bounded channel.
pub fn channel() -> (mpsc::Sender<Event>, mpsc::Receiver<Event>) {
    mpsc::channel(EVENT_CHANNEL_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_carries_commands_in_order() {
        let (tx, mut rx) = channel();
        tx.try_send(Event::Command(SimCommand::Burst)).unwrap();
        tx.try_send(Event::Resize(80, 24)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Event::Command(SimCommand::Burst));
        assert_eq!(rx.try_recv().unwrap(), Event::Resize(80, 24));
        assert!(rx.try_recv().is_err());
    }
}
