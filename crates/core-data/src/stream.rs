//! The pull-based record source contract.

use crate::types::{Record, Schema};
use bitflags::bitflags;
use core_error::Result;

bitflags! {
    /// Capabilities a source advertises; the driver consults these before
    /// attempting optional operations like `reset`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        /// Can rewind to the first record.
        const SEEKABLE  = 1 << 0;
        /// Continuous feed; `has_next` may become true again later.
        const STREAMING = 1 << 1;
        /// Supports random access by row (unused by the core loop).
        const RANDOM    = 1 << 2;
        /// Fully buffered in memory after `open`.
        const BUFFERED  = 1 << 3;
    }
}

/// Lifecycle: `init` (configure) → `open` (acquire) → reads → `close`.
/// `close` is idempotent; `read_next` past exhaustion is `OutOfRange`.
pub trait RecordStream {
    /// Prepare the source from a config string (typically a path).
    fn init(&mut self, config: &str) -> Result<()>;

    /// Acquire resources and derive the schema.
    fn open(&mut self) -> Result<()>;

    /// Schema of the open source.
    fn schema(&self) -> Result<&Schema>;

    fn has_next(&self) -> bool;

    fn read_next(&mut self) -> Result<Record>;

    /// Rewind; only valid when `SEEKABLE` is advertised.
    fn reset(&mut self) -> Result<()>;

    /// Release resources. Safe to call repeatedly.
    fn close(&mut self);

    fn capabilities(&self) -> Capabilities;

    /// Stable type name, matching the registry key ("csv", "json").
    fn name(&self) -> &'static str;
}
