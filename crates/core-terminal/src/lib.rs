//! Terminal session state for the particle renderer.
//!
//! The framebuffer emits its own escape bytes; this crate only flips
//! terminal *state* around the render loop: raw mode, the alternate
//! screen, and cursor visibility, plus the size query the world is
//! sized from. All of it hangs off one RAII [`TerminalSession`]: the
//! driver acquires it before the first flush and the shell is restored
//! on drop, including the panic path. Raw mode is rolled back if the
//! alternate-screen switch fails halfway, so a failed acquire never
//! leaves the shell unusable.

use anyhow::Result;
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
    },
};
use std::io::stdout;

/// Current `(columns, rows)` of the attached terminal. Valid with or
/// without an active session; the driver sizes the world before
/// switching screens.
pub fn size() -> Result<(u16, u16)> {
    Ok(crossterm::terminal::size()?)
}

/// An acquired terminal: raw mode on, alternate screen active, cursor
/// hidden. Restores everything on [`release`](Self::release) or drop,
/// whichever comes first.
#[derive(Debug)]
pub struct TerminalSession {
    restored: bool,
}

impl TerminalSession {
    /// Switch the terminal into render state.
    pub fn acquire() -> Result<Self> {
        enable_raw_mode()?;
        if let Err(err) = execute!(stdout(), EnterAlternateScreen, Hide) {
            // Half-acquired is worse than failed: undo raw mode before
            // surfacing the error.
            let _ = disable_raw_mode();
            return Err(err.into());
        }
        Ok(Self { restored: false })
    }

    /// Acquire and set the window title in one go.
    pub fn acquire_titled(title: &str) -> Result<Self> {
        let session = Self::acquire()?;
        session.set_title(title)?;
        Ok(session)
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        execute!(stdout(), SetTitle(title))?;
        Ok(())
    }

    /// Hand the terminal back to the shell. Idempotent; errors after the
    /// first successful release are impossible because the work is done
    /// once.
    pub fn release(&mut self) -> Result<()> {
        if !self.restored {
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.restored = true;
        }
        Ok(())
    }

    /// Whether the shell has already been given back.
    pub fn is_released(&self) -> bool {
        self.restored
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        // Best effort only: drop may run during unwinding, where a
        // second failure must not escalate.
        if !self.restored {
            let _ = execute!(stdout(), LeaveAlternateScreen, Show);
            let _ = disable_raw_mode();
            self.restored = true;
        }
    }
}
