//! Asynchronous delivery of passively observed vitals.
//!
//! Platform timing observers (navigation timing, paint timing) deliver
//! values on their own schedule, potentially long after monitoring
//! started. A [`VitalsSink`] is the write handle those observers hold:
//! cheap to clone, safe to keep past the monitor's lifetime, and inert
//! when vitals collection is disabled.

use std::sync::{Arc, Weak};

use imagewatch_types::{Millis, Vitals};
use parking_lot::RwLock;

/// Write handle for pushing vitals into a monitor.
///
/// Obtained from `Monitor::vitals_sink()`. Merge rules:
///
/// - time-to-first-byte and first-contentful-paint are set once; later
///   values are ignored,
/// - each largest-contentful-paint candidate replaces the previous one.
///
/// A sink outliving its monitor, or taken from a monitor with vitals
/// collection disabled, silently drops every value.
#[derive(Debug, Clone, Default)]
pub struct VitalsSink {
    target: Option<Weak<RwLock<Vitals>>>,
}

impl VitalsSink {
    pub(crate) fn attached(target: &Arc<RwLock<Vitals>>) -> Self {
        Self {
            target: Some(Arc::downgrade(target)),
        }
    }

    /// A sink that discards everything.
    pub(crate) fn detached() -> Self {
        Self::default()
    }

    /// Whether values pushed through this sink can still land anywhere.
    pub fn is_attached(&self) -> bool {
        self.target
            .as_ref()
            .map(|w| w.strong_count() > 0)
            .unwrap_or(false)
    }

    /// Report time-to-first-byte from navigation timing.
    pub fn report_ttfb(&self, value: Millis) {
        self.update(|v| v.record_ttfb(value));
    }

    /// Report first contentful paint.
    pub fn report_fcp(&self, value: Millis) {
        self.update(|v| v.record_fcp(value));
    }

    /// Report a largest-contentful-paint candidate.
    pub fn report_lcp(&self, value: Millis) {
        self.update(|v| v.record_lcp(value));
    }

    fn update(&self, f: impl FnOnce(&mut Vitals)) {
        if let Some(target) = self.target.as_ref().and_then(Weak::upgrade) {
            f(&mut target.write());
        }
    }
}
