//! Shared error taxonomy for the engine crates.
//!
//! Every fallible operation in the core returns [`Result`] carrying an
//! [`EngineError`]: a kind drawn from a closed set, a short human-readable
//! message, and the source location captured where the error was built.
//! Errors are values; nothing in the core unwinds for a recoverable
//! condition.
//!
//! Aggregate failure statistics are an explicit observer: components that
//! want counters take an [`ErrorCounters`] reference from their owner.
//! There is intentionally no process-wide singleton.

use std::borrow::Cow;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Closed set of failure categories shared across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An argument violated a documented precondition.
    InvalidParameter,
    /// A fixed-capacity resource (pool slot, field table) is exhausted.
    OutOfResources,
    /// A positional access past the end: stream exhaustion, grid bounds.
    OutOfRange,
    /// Dynamic allocation failed.
    Memory,
    /// An underlying host operation failed (file open/read, terminal ioctl).
    System,
    /// Input did not conform to its documented format.
    Parse,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidParameter => "invalid parameter",
            ErrorKind::OutOfResources => "out of resources",
            ErrorKind::OutOfRange => "out of range",
            ErrorKind::Memory => "memory allocation failed",
            ErrorKind::System => "system error",
            ErrorKind::Parse => "parse error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error value carried by every fallible core operation.
///
/// The capture location is recorded via `#[track_caller]`, so constructing
/// through the kind helpers below attributes the error to the call site
/// that detected the condition, not to this crate.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message} ({file}:{line})")]
pub struct EngineError {
    kind: ErrorKind,
    message: Cow<'static, str>,
    file: &'static str,
    line: u32,
}

impl EngineError {
    #[track_caller]
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        let loc = Location::caller();
        Self {
            kind,
            message: message.into(),
            file: loc.file(),
            line: loc.line(),
        }
    }

    #[track_caller]
    pub fn invalid_parameter(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidParameter, message)
    }

    #[track_caller]
    pub fn out_of_resources(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::OutOfResources, message)
    }

    #[track_caller]
    pub fn out_of_range(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::OutOfRange, message)
    }

    #[track_caller]
    pub fn memory(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Memory, message)
    }

    #[track_caller]
    pub fn system(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::System, message)
    }

    #[track_caller]
    pub fn parse(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    /// Wrap a host I/O failure, keeping the OS detail in the message.
    #[track_caller]
    pub fn from_io(context: &str, err: &std::io::Error) -> Self {
        Self::new(ErrorKind::System, format!("{context}: {err}"))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Source location where the error was constructed, for diagnostics.
    pub fn location(&self) -> (&'static str, u32) {
        (self.file, self.line)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Per-kind failure tallies.
///
/// Relaxed atomics: counters are monotone and sampled, never used for
/// synchronization. Owners pass `&ErrorCounters` down to components that
/// report; sampling happens wherever diagnostics are rendered.
#[derive(Debug, Default)]
pub struct ErrorCounters {
    invalid_parameter: AtomicU64,
    out_of_resources: AtomicU64,
    out_of_range: AtomicU64,
    memory: AtomicU64,
    system: AtomicU64,
    parse: AtomicU64,
}

impl ErrorCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, kind: ErrorKind) -> &AtomicU64 {
        match kind {
            ErrorKind::InvalidParameter => &self.invalid_parameter,
            ErrorKind::OutOfResources => &self.out_of_resources,
            ErrorKind::OutOfRange => &self.out_of_range,
            ErrorKind::Memory => &self.memory,
            ErrorKind::System => &self.system,
            ErrorKind::Parse => &self.parse,
        }
    }

    pub fn record(&self, err: &EngineError) {
        self.cell(err.kind()).fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, kind: ErrorKind) -> u64 {
        self.cell(kind).load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        [
            ErrorKind::InvalidParameter,
            ErrorKind::OutOfResources,
            ErrorKind::OutOfRange,
            ErrorKind::Memory,
            ErrorKind::System,
            ErrorKind::Parse,
        ]
        .into_iter()
        .map(|k| self.count(k))
        .sum()
    }
}

/// Record an error against `counters` and pass it through unchanged.
///
/// Lets call sites keep `?` propagation while still reporting:
/// `observe(&counters, pool.allocate())?`.
pub fn observe<T>(counters: &ErrorCounters, result: Result<T>) -> Result<T> {
    if let Err(ref err) = result {
        counters.record(err);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_kind_message_and_location() {
        let err = EngineError::invalid_parameter("capacity must be positive");
        let text = err.to_string();
        assert!(text.contains("invalid parameter"));
        assert!(text.contains("capacity must be positive"));
        assert!(text.contains("lib.rs"));
    }

    #[test]
    fn location_points_at_call_site() {
        let err = EngineError::out_of_range("past the end");
        let (file, line) = err.location();
        assert!(file.ends_with("lib.rs"));
        assert!(line > 0);
    }

    #[test]
    fn counters_tally_by_kind() {
        let counters = ErrorCounters::new();
        counters.record(&EngineError::memory("oom"));
        counters.record(&EngineError::memory("oom again"));
        counters.record(&EngineError::parse("bad row"));
        assert_eq!(counters.count(ErrorKind::Memory), 2);
        assert_eq!(counters.count(ErrorKind::Parse), 1);
        assert_eq!(counters.count(ErrorKind::System), 0);
        assert_eq!(counters.total(), 3);
    }

    #[test]
    fn observe_records_err_and_passes_ok_through() {
        let counters = ErrorCounters::new();
        let ok: Result<u32> = observe(&counters, Ok(7));
        assert_eq!(ok.unwrap(), 7);
        assert_eq!(counters.total(), 0);

        let err: Result<u32> = observe(&counters, Err(EngineError::system("ioctl failed")));
        assert!(err.is_err());
        assert_eq!(counters.count(ErrorKind::System), 1);
    }
}
