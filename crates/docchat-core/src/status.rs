// Status reporting seam
//
// The pipeline and turn driver emit human-readable progress at each phase
// transition. The presentation layer decides how to render it; the core only
// pushes through this trait.

/// Phase of a long-running operation, attached to every status update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Local preprocessing before any remote call
    Preparing,
    /// Request in flight to a remote service
    Submitting,
    /// Waiting out a retry or rate-limit delay
    Waiting,
    /// Remote run executing
    Running,
    /// Finished successfully
    Complete,
    /// Finished with an error
    Error,
}

/// Receiver for progress updates from the core
pub trait StatusSink: Send + Sync {
    /// Report a phase transition with a human-readable label
    fn update(&self, phase: Phase, label: &str);
}

/// StatusSink that drops all updates (tests, headless use)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStatusSink;

impl StatusSink for NullStatusSink {
    fn update(&self, _phase: Phase, _label: &str) {}
}

/// StatusSink that forwards updates to tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn update(&self, phase: Phase, label: &str) {
        match phase {
            Phase::Error => tracing::warn!(?phase, "{label}"),
            _ => tracing::info!(?phase, "{label}"),
        }
    }
}
