//! The per-image performance monitor.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use imagewatch_types::{marks, MetricValue, Millis, MonitorReport, Vitals};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::trace::{NoopTraceSink, TraceSink};
use crate::vitals::VitalsSink;

/// Monitors the loading lifecycle of a single image.
///
/// A monitor records named timestamp marks, derives measures between
/// them, accepts asynchronously delivered vitals, and produces a
/// [`MonitorReport`] on demand. All timestamps are offsets from the
/// monitor's construction.
///
/// Every operation takes `&self`; the monitor is `Send + Sync` and is
/// normally shared as an `Arc` handed out by the manager.
///
/// # Example
///
/// ```rust
/// use imagewatch_sdk::{Monitor, MonitorConfig};
/// use imagewatch_types::marks;
///
/// let monitor = Monitor::new("hero.jpg", MonitorConfig::default());
/// monitor.mark(marks::MOUNT);
/// monitor.mark(marks::LOAD_START);
/// // ... the image loads ...
/// monitor.mark(marks::LOAD_END);
///
/// let fetch = monitor.measure("fetch", marks::LOAD_START, Some(marks::LOAD_END));
/// assert!(fetch.is_some());
///
/// monitor.end();
/// let report = monitor.report();
/// assert!(report.has_ended());
/// ```
pub struct Monitor {
    id: String,
    config: MonitorConfig,
    trace: Arc<dyn TraceSink>,
    started: Instant,
    started_at_ms: u64,
    inner: RwLock<Inner>,
    vitals: Arc<RwLock<Vitals>>,
}

#[derive(Default)]
struct Inner {
    marks: BTreeMap<String, Millis>,
    measures: BTreeMap<String, Millis>,
    custom: BTreeMap<String, MetricValue>,
    ended_at: Option<Millis>,
}

impl Monitor {
    /// Create a monitor with no trace sink.
    pub fn new(id: impl Into<String>, config: MonitorConfig) -> Self {
        Self::with_trace_sink(id, config, Arc::new(NoopTraceSink))
    }

    /// Create a monitor that mirrors marks to `trace`.
    pub fn with_trace_sink(
        id: impl Into<String>,
        config: MonitorConfig,
        trace: Arc<dyn TraceSink>,
    ) -> Self {
        Self {
            id: id.into(),
            config,
            trace,
            started: Instant::now(),
            started_at_ms: unix_timestamp_ms(),
            inner: RwLock::new(Inner::default()),
            vitals: Arc::new(RwLock::new(Vitals::default())),
        }
    }

    /// The monitor identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The configuration this monitor was created with.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Offset of "now" from the monitor's start.
    pub fn now_offset(&self) -> Millis {
        Millis::from(self.started.elapsed())
    }

    /// Record a mark named `name` at the current time.
    ///
    /// Overwrites any earlier mark of the same name. No-op when the
    /// monitor is disabled.
    pub fn mark(&self, name: &str) {
        self.mark_at(name, self.now_offset());
    }

    /// Record a mark at an explicit offset from the monitor's start.
    ///
    /// Use this to replay timestamps captured by an external timing
    /// source instead of sampling the monitor's own clock.
    pub fn mark_at(&self, name: &str, offset: Millis) {
        if !self.config.enabled {
            return;
        }

        self.inner.write().marks.insert(name.to_string(), offset);
        self.emit_trace_mark(name);

        if self.config.debug {
            debug!(
                monitor = %self.id,
                mark = name,
                offset_ms = offset.as_millis(),
                "recorded mark"
            );
        }
    }

    /// Derive a duration between two marks and record it under `name`.
    ///
    /// With `end_mark` absent the current time is used as the endpoint.
    /// Fails soft: a reference to an unrecorded mark logs a warning and
    /// returns `None` without creating a measure entry.
    pub fn measure(&self, name: &str, start_mark: &str, end_mark: Option<&str>) -> Option<Millis> {
        if !self.config.enabled {
            return None;
        }

        let mut inner = self.inner.write();

        let Some(start) = inner.marks.get(start_mark).copied() else {
            warn!(
                monitor = %self.id,
                measure = name,
                mark = start_mark,
                "measure references unrecorded start mark"
            );
            return None;
        };

        let end = match end_mark {
            Some(mark) => match inner.marks.get(mark).copied() {
                Some(offset) => offset,
                None => {
                    warn!(
                        monitor = %self.id,
                        measure = name,
                        mark = mark,
                        "measure references unrecorded end mark"
                    );
                    return None;
                }
            },
            None => self.now_offset(),
        };

        let value = end - start;
        inner.measures.insert(name.to_string(), value);

        if self.config.debug {
            debug!(
                monitor = %self.id,
                measure = name,
                value_ms = value.as_millis(),
                "recorded measure"
            );
        }

        Some(value)
    }

    /// Attach an arbitrary custom metric. No-op when disabled.
    pub fn set_custom(&self, key: &str, value: impl Into<MetricValue>) {
        if !self.config.enabled {
            return;
        }
        self.inner.write().custom.insert(key.to_string(), value.into());
    }

    /// End monitoring.
    ///
    /// Idempotent: only the first call fixes the end time and records the
    /// `end` mark; later calls are no-ops. The end offset never precedes
    /// the start by construction.
    ///
    /// Ending is lifecycle control rather than recording, so it works on
    /// a disabled monitor too (the `end` mark itself is skipped then);
    /// otherwise a disabled monitor could never become eligible for
    /// retention-based eviction.
    pub fn end(&self) {
        let offset = self.now_offset();
        {
            let mut inner = self.inner.write();
            if inner.ended_at.is_some() {
                return;
            }
            inner.ended_at = Some(offset);
            if self.config.enabled {
                inner.marks.insert(marks::END.to_string(), offset);
            }
        }
        if self.config.enabled {
            self.emit_trace_mark(marks::END);
        }
    }

    /// Whether `end()` has been called.
    pub fn has_ended(&self) -> bool {
        self.inner.read().ended_at.is_some()
    }

    /// Time elapsed since the monitor ended, or `None` while live.
    pub fn since_end(&self) -> Option<Duration> {
        let ended_at = self.inner.read().ended_at?;
        Some(self.started.elapsed().saturating_sub(ended_at.to_duration()))
    }

    /// Handle for pushing passively observed vitals into this monitor.
    ///
    /// The handle is inert when the monitor is disabled or vitals
    /// collection is off.
    pub fn vitals_sink(&self) -> VitalsSink {
        if self.config.enabled && self.config.collect_vitals {
            VitalsSink::attached(&self.vitals)
        } else {
            VitalsSink::detached()
        }
    }

    /// Produce a report of everything recorded so far.
    ///
    /// For a live monitor the duration runs up to "now"; after `end()` it
    /// is fixed at the end offset. Critical path and recommendations are
    /// derived fresh on every call.
    pub fn report(&self) -> MonitorReport {
        let inner = self.inner.read();
        let duration = inner.ended_at.unwrap_or_else(|| self.now_offset());

        let mut builder = MonitorReport::builder(self.id.clone())
            .started_at_ms(self.started_at_ms)
            .duration(duration)
            .marks(inner.marks.clone())
            .measures(inner.measures.clone())
            .custom_metrics(inner.custom.clone())
            .vitals(*self.vitals.read());

        if let Some(ended_at) = inner.ended_at {
            builder = builder.ended_at(ended_at);
        }

        builder.build()
    }

    /// Best-effort cleanup of trace entries tagged with this monitor's
    /// id. Never fails.
    pub fn dispose(&self) {
        if let Err(e) = self.trace.clear(&self.id) {
            debug!(monitor = %self.id, error = %e, "trace sink rejected clear");
        }
    }

    fn emit_trace_mark(&self, name: &str) {
        if let Err(e) = self.trace.mark(&self.id, name) {
            debug!(monitor = %self.id, mark = name, error = %e, "trace sink rejected mark");
        }
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("id", &self.id)
            .field("ended", &self.has_ended())
            .finish()
    }
}

fn unix_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::MemoryTraceSink;

    fn monitor() -> Monitor {
        Monitor::new("test", MonitorConfig::default())
    }

    #[test]
    fn measure_between_marks() {
        let m = monitor();
        m.mark_at("a", Millis::from_millis(10.0));
        m.mark_at("b", Millis::from_millis(35.0));

        let value = m.measure("a-to-b", "a", Some("b")).unwrap();
        assert_eq!(value, Millis::from_millis(25.0));

        let report = m.report();
        assert_eq!(report.measures.get("a-to-b"), Some(&Millis::from_millis(25.0)));
    }

    #[test]
    fn measure_with_real_clock_is_non_negative() {
        let m = monitor();
        m.mark("a");
        std::thread::sleep(Duration::from_millis(5));
        m.mark("b");

        let value = m.measure("gap", "a", Some("b")).unwrap();
        assert!(value.as_millis() >= 5.0);
        assert!(!value.is_negative());
    }

    #[test]
    fn measure_to_now_when_end_mark_omitted() {
        let m = monitor();
        m.mark_at("a", Millis::ZERO);
        std::thread::sleep(Duration::from_millis(2));

        let value = m.measure("so-far", "a", None).unwrap();
        assert!(value.as_millis() > 0.0);
    }

    #[test]
    fn measure_missing_start_mark_fails_soft() {
        let m = monitor();
        m.mark_at("present", Millis::ZERO);

        assert_eq!(m.measure("broken", "absent", Some("present")), None);
        assert!(m.report().measures.is_empty());
    }

    #[test]
    fn measure_missing_end_mark_fails_soft() {
        let m = monitor();
        m.mark_at("present", Millis::ZERO);

        assert_eq!(m.measure("broken", "present", Some("absent")), None);
        assert!(m.report().measures.is_empty());
    }

    #[test]
    fn out_of_order_marks_yield_negative_measure() {
        let m = monitor();
        m.mark_at("late", Millis::from_millis(100.0));
        m.mark_at("early", Millis::from_millis(40.0));

        let value = m.measure("backwards", "late", Some("early")).unwrap();
        assert_eq!(value, Millis::from_millis(-60.0));
        assert!(value.is_negative());
    }

    #[test]
    fn marks_overwrite_by_name() {
        let m = monitor();
        m.mark_at("a", Millis::from_millis(10.0));
        m.mark_at("a", Millis::from_millis(90.0));

        assert_eq!(m.report().marks.get("a"), Some(&Millis::from_millis(90.0)));
    }

    #[test]
    fn end_is_idempotent() {
        let m = monitor();
        m.end();
        let first = m.report().ended_at.unwrap();

        std::thread::sleep(Duration::from_millis(2));
        m.end();
        assert_eq!(m.report().ended_at, Some(first));
    }

    #[test]
    fn end_records_end_mark_and_fixes_duration() {
        let m = monitor();
        m.end();

        let report = m.report();
        assert!(report.has_ended());
        assert_eq!(report.marks.get(marks::END), report.ended_at.as_ref());
        assert_eq!(report.duration, report.ended_at.unwrap());
    }

    #[test]
    fn live_monitor_duration_advances() {
        let m = monitor();
        let first = m.report().duration;
        std::thread::sleep(Duration::from_millis(2));
        let second = m.report().duration;
        assert!(second > first);
    }

    #[test]
    fn since_end_tracks_elapsed_time() {
        let m = monitor();
        assert_eq!(m.since_end(), None);

        m.end();
        std::thread::sleep(Duration::from_millis(5));
        assert!(m.since_end().unwrap() >= Duration::from_millis(5));
    }

    #[test]
    fn disabled_monitor_records_nothing() {
        let m = Monitor::new("off", MonitorConfig::default().with_enabled(false));
        m.mark("a");
        m.set_custom("key", 1.0);
        m.end();

        assert_eq!(m.measure("x", "a", None), None);
        let report = m.report();
        assert!(report.marks.is_empty());
        assert!(report.custom.is_empty());
        assert!(!m.vitals_sink().is_attached());

        // Ending still works so the monitor stays evictable.
        assert!(report.has_ended());
        assert!(report.marks.get(marks::END).is_none());
    }

    #[test]
    fn custom_metrics_land_in_report() {
        let m = monitor();
        m.set_custom("cache-hit", true);
        m.set_custom("bytes", 1024u64);
        m.set_custom("format", "avif");

        let report = m.report();
        assert_eq!(report.custom.len(), 3);
        assert_eq!(report.custom.get("cache-hit"), Some(&MetricValue::Flag(true)));
    }

    #[test]
    fn vitals_flow_into_report() {
        let m = monitor();
        let sink = m.vitals_sink();
        assert!(sink.is_attached());

        sink.report_fcp(Millis::from_millis(700.0));
        sink.report_lcp(Millis::from_millis(2900.0));

        let report = m.report();
        assert_eq!(report.vitals.fcp, Some(Millis::from_millis(700.0)));
        assert_eq!(report.vitals.lcp, Some(Millis::from_millis(2900.0)));

        // LCP over budget produces an advisory.
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn vitals_sink_detached_when_collection_disabled() {
        let m = Monitor::new(
            "no-vitals",
            MonitorConfig::default().with_collect_vitals(false),
        );
        let sink = m.vitals_sink();
        assert!(!sink.is_attached());

        sink.report_lcp(Millis::from_millis(5000.0));
        assert!(m.report().vitals.is_empty());
    }

    #[test]
    fn full_lifecycle_report_derives_critical_path() {
        let m = monitor();
        m.mark_at(marks::MOUNT, Millis::ZERO);
        m.mark_at(marks::LOAD_START, Millis::from_millis(150.0));
        m.mark_at(marks::LOAD_END, Millis::from_millis(2350.0));
        m.mark_at(marks::RENDER_END, Millis::from_millis(2430.0));
        m.end();

        let report = m.report();
        let path = report.critical_path.unwrap();
        assert_eq!(path.discovery_delay, Some(Millis::from_millis(150.0)));
        assert_eq!(path.load_delay, Some(Millis::from_millis(2200.0)));
        assert_eq!(path.render_delay, Some(Millis::from_millis(80.0)));
        assert_eq!(report.recommendations.len(), 3);
    }

    #[test]
    fn marks_mirror_to_trace_sink() {
        let sink = Arc::new(MemoryTraceSink::new());
        let m = Monitor::with_trace_sink("traced", MonitorConfig::default(), sink.clone());

        m.mark("a");
        m.mark("b");
        m.end();

        let entries = sink.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], ("traced".to_string(), "a".to_string()));
        assert_eq!(entries[2].1, marks::END.to_string());
    }

    #[test]
    fn dispose_clears_trace_entries() {
        let sink = Arc::new(MemoryTraceSink::new());
        let m = Monitor::with_trace_sink("traced", MonitorConfig::default(), sink.clone());
        let other = Monitor::with_trace_sink("other", MonitorConfig::default(), sink.clone());

        m.mark("a");
        other.mark("a");
        m.dispose();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.entries()[0].0, "other");
    }

    #[test]
    fn report_serializes_to_json() {
        let m = monitor();
        m.mark_at(marks::MOUNT, Millis::ZERO);
        m.set_custom("format", "webp");
        m.end();

        let json = serde_json::to_value(m.report()).unwrap();
        assert_eq!(json["id"], "test");
        assert_eq!(json["custom"]["format"], "webp");
        assert!(json["marks"].get(marks::END).is_some());
    }
}
