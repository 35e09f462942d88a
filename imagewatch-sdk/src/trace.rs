//! Trace sinks - the optional platform timing-trace collaborator.
//!
//! Marks can be mirrored to an external trace facility (a devtools
//! timeline, a profiler, a log shipper). That facility is strictly
//! optional: the monitor treats every sink error as a degraded feature,
//! logs it at debug level, and carries on. Nothing in the primary
//! recording path ever fails because a sink did.

use std::io;

use parking_lot::Mutex;

/// Destination for mirrored trace marks.
///
/// Implementations should be cheap: `mark` is called on the hot path of
/// every recorded mark. Errors are tolerated but still worth returning -
/// the monitor logs them when debug logging is on.
pub trait TraceSink: Send + Sync {
    /// Mirror a mark. `monitor_id` scopes the entry to one monitor.
    fn mark(&self, monitor_id: &str, name: &str) -> io::Result<()>;

    /// Drop all entries recorded for `monitor_id`.
    fn clear(&self, monitor_id: &str) -> io::Result<()>;
}

/// A sink that discards everything. The default collaborator.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn mark(&self, _monitor_id: &str, _name: &str) -> io::Result<()> {
        Ok(())
    }

    fn clear(&self, _monitor_id: &str) -> io::Result<()> {
        Ok(())
    }
}

/// An in-memory recording sink, useful in tests and embeddings that want
/// to forward entries themselves.
#[derive(Debug, Default)]
pub struct MemoryTraceSink {
    entries: Mutex<Vec<(String, String)>>,
}

impl MemoryTraceSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the `(monitor_id, mark_name)` entries recorded so far.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries.lock().clone()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the sink holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl TraceSink for MemoryTraceSink {
    fn mark(&self, monitor_id: &str, name: &str) -> io::Result<()> {
        self.entries
            .lock()
            .push((monitor_id.to_string(), name.to_string()));
        Ok(())
    }

    fn clear(&self, monitor_id: &str) -> io::Result<()> {
        self.entries.lock().retain(|(id, _)| id != monitor_id);
        Ok(())
    }
}
