//! Async input service: forwards crossterm events into the driver's
//! bounded channel as simulation commands.
//!
//! Bindings:
//! * space: particle burst at world center
//! * arrows / hjkl: wind nudges
//! * `g` / `G`: gravity down / up
//! * `c`: toggle collisions, `f`: cycle demo force field
//! * `r`: clear particles, `p`: pause
//! * `q` / Ctrl-C: quit
//!
//! The task terminates when the channel closes (driver dropped the
//! receiver) or the event stream ends.

use core_events::{CHANNEL_SEND_FAILURES, Event, KEYPRESS_TOTAL, SimCommand};
use crossterm::event::{Event as CtEvent, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use std::sync::atomic::Ordering;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

const WIND_STEP: f32 = 2.0;
const GRAVITY_STEP: f32 = 5.0;

/// Map one key press to a simulation command.
pub fn translate_key(code: KeyCode, mods: KeyModifiers) -> Option<SimCommand> {
    if mods.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Some(SimCommand::Quit),
            _ => None,
        };
    }
    match code {
        KeyCode::Char(' ') => Some(SimCommand::Burst),
        KeyCode::Left | KeyCode::Char('h') => Some(SimCommand::WindDelta(-WIND_STEP, 0.0)),
        KeyCode::Right | KeyCode::Char('l') => Some(SimCommand::WindDelta(WIND_STEP, 0.0)),
        KeyCode::Up | KeyCode::Char('k') => Some(SimCommand::WindDelta(0.0, -WIND_STEP)),
        KeyCode::Down | KeyCode::Char('j') => Some(SimCommand::WindDelta(0.0, WIND_STEP)),
        KeyCode::Char('g') => Some(SimCommand::GravityDelta(-GRAVITY_STEP)),
        KeyCode::Char('G') => Some(SimCommand::GravityDelta(GRAVITY_STEP)),
        KeyCode::Char('c') => Some(SimCommand::ToggleCollisions),
        KeyCode::Char('f') => Some(SimCommand::CycleField),
        KeyCode::Char('r') => Some(SimCommand::ClearParticles),
        KeyCode::Char('p') => Some(SimCommand::TogglePause),
        KeyCode::Char('q') | KeyCode::Esc => Some(SimCommand::Quit),
        _ => None,
    }
}

fn forward(sender: &Sender<Event>, event: Event) -> bool {
    match sender.try_send(event) {
        Ok(()) => true,
        Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
            // Stale nudges are worthless next frame; drop and count.
            CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
            true
        }
        Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Spawn the reader task over `crossterm::EventStream`.
pub fn spawn_input_task(sender: Sender<Event>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = EventStream::new();
        tracing::debug!(target: "input", "input service started");
        while let Some(item) = stream.next().await {
            let forwarded = match item {
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    KEYPRESS_TOTAL.fetch_add(1, Ordering::Relaxed);
                    match translate_key(key.code, key.modifiers) {
                        Some(SimCommand::Quit) => forward(&sender, Event::Shutdown),
                        Some(command) => {
                            core_events::COMMANDS_EMITTED.fetch_add(1, Ordering::Relaxed);
                            forward(&sender, Event::Command(command))
                        }
                        None => true,
                    }
                }
                Ok(CtEvent::Resize(columns, rows)) => {
                    forward(&sender, Event::Resize(columns, rows))
                }
                Ok(_) => true,
                Err(err) => {
                    tracing::warn!(target: "input", error = %err, "event stream error");
                    false
                }
            };
            if !forwarded {
                break;
            }
        }
        tracing::debug!(target: "input", "input service stopped");
    })
}
