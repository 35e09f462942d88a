//! Monitor reports - a point-in-time view of one image load's lifecycle.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::{Millis, Version, SCHEMA_VERSION};

/// Well-known mark names recorded by the image loading lifecycle.
///
/// Critical-path analysis keys off these; anything else is treated as an
/// opaque custom mark.
pub mod marks {
    /// Component mounted and began observing.
    pub const MOUNT: &str = "mount";
    /// Network fetch for the image started.
    pub const LOAD_START: &str = "load-start";
    /// Network fetch completed.
    pub const LOAD_END: &str = "load-end";
    /// Decoded image committed to the screen.
    pub const RENDER_END: &str = "render-end";
    /// Monitoring ended.
    pub const END: &str = "end";
}

/// Passively observed web performance signals.
///
/// All fields are optional: the platform timing sources backing them may
/// be absent, and values arrive asynchronously after monitoring starts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct Vitals {
    /// Time to first byte, from navigation timing.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(0))]
    pub ttfb: Option<Millis>,

    /// First contentful paint.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(1))]
    pub fcp: Option<Millis>,

    /// Largest contentful paint (latest candidate).
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(2))]
    pub lcp: Option<Millis>,
}

impl Vitals {
    /// No signals observed.
    pub fn is_empty(&self) -> bool {
        self.ttfb.is_none() && self.fcp.is_none() && self.lcp.is_none()
    }

    /// Record time-to-first-byte. The first value wins.
    pub fn record_ttfb(&mut self, value: Millis) {
        self.ttfb.get_or_insert(value);
    }

    /// Record first contentful paint. The first value wins.
    pub fn record_fcp(&mut self, value: Millis) {
        self.fcp.get_or_insert(value);
    }

    /// Record a largest-contentful-paint candidate.
    ///
    /// Each newer candidate replaces the previous one; the platform emits
    /// candidates until the page settles.
    pub fn record_lcp(&mut self, value: Millis) {
        self.lcp = Some(value);
    }
}

/// Delays along the image load critical path, derived from well-known
/// marks. A component is present only when both of its endpoints were
/// recorded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct CriticalPath {
    /// Time from mount until the fetch started.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(0))]
    pub discovery_delay: Option<Millis>,

    /// Time the network fetch took.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(1))]
    pub load_delay: Option<Millis>,

    /// Time from fetch completion until the image was on screen.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(2))]
    pub render_delay: Option<Millis>,
}

impl CriticalPath {
    /// Derive the critical path from a mark map.
    ///
    /// Returns `None` when no component could be computed.
    pub fn from_marks(marks: &BTreeMap<String, Millis>) -> Option<Self> {
        let delta = |start: &str, end: &str| -> Option<Millis> {
            let s = marks.get(start)?;
            let e = marks.get(end)?;
            Some(*e - *s)
        };

        let path = Self {
            discovery_delay: delta(marks::MOUNT, marks::LOAD_START),
            load_delay: delta(marks::LOAD_START, marks::LOAD_END),
            render_delay: delta(marks::LOAD_END, marks::RENDER_END),
        };

        if path.discovery_delay.is_none()
            && path.load_delay.is_none()
            && path.render_delay.is_none()
        {
            None
        } else {
            Some(path)
        }
    }
}

/// Discovery delay above this suggests preloading.
pub const DISCOVERY_DELAY_BUDGET: Millis = Millis(100.0);
/// Load delay above this suggests smaller assets or a CDN.
pub const LOAD_DELAY_BUDGET: Millis = Millis(2000.0);
/// Render delay above this suggests render-path work.
pub const RENDER_DELAY_BUDGET: Millis = Millis(50.0);
/// LCP above this suggests optimizing above-the-fold images.
pub const LCP_BUDGET: Millis = Millis(2500.0);

/// An advisory produced from a report. Purely informational.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub enum Recommendation {
    /// The image was discovered late; preload it.
    #[cfg_attr(feature = "minicbor", n(0))]
    Preload {
        #[cfg_attr(feature = "minicbor", n(0))]
        discovery_delay: Millis,
    },

    /// The fetch was slow; shrink the asset or serve it from a CDN.
    #[cfg_attr(feature = "minicbor", n(1))]
    ReduceSize {
        #[cfg_attr(feature = "minicbor", n(0))]
        load_delay: Millis,
    },

    /// Rendering after load was slow; simplify the render path.
    #[cfg_attr(feature = "minicbor", n(2))]
    SimplifyRender {
        #[cfg_attr(feature = "minicbor", n(0))]
        render_delay: Millis,
    },

    /// LCP blew its budget; optimize above-the-fold images.
    #[cfg_attr(feature = "minicbor", n(3))]
    OptimizeLcp {
        #[cfg_attr(feature = "minicbor", n(0))]
        lcp: Millis,
    },
}

impl Recommendation {
    /// Apply the advisory thresholds to a derived critical path and the
    /// observed vitals.
    pub fn derive(critical_path: Option<&CriticalPath>, vitals: &Vitals) -> Vec<Recommendation> {
        let mut out = Vec::new();

        if let Some(path) = critical_path {
            if let Some(d) = path.discovery_delay {
                if d > DISCOVERY_DELAY_BUDGET {
                    out.push(Recommendation::Preload { discovery_delay: d });
                }
            }
            if let Some(d) = path.load_delay {
                if d > LOAD_DELAY_BUDGET {
                    out.push(Recommendation::ReduceSize { load_delay: d });
                }
            }
            if let Some(d) = path.render_delay {
                if d > RENDER_DELAY_BUDGET {
                    out.push(Recommendation::SimplifyRender { render_delay: d });
                }
            }
        }

        if let Some(lcp) = vitals.lcp {
            if lcp > LCP_BUDGET {
                out.push(Recommendation::OptimizeLcp { lcp });
            }
        }

        out
    }
}

impl core::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Recommendation::Preload { discovery_delay } => write!(
                f,
                "image discovered {:.0}ms after mount; consider preloading it",
                discovery_delay.as_millis()
            ),
            Recommendation::ReduceSize { load_delay } => write!(
                f,
                "image took {:.0}ms to load; reduce its size or serve it from a CDN",
                load_delay.as_millis()
            ),
            Recommendation::SimplifyRender { render_delay } => write!(
                f,
                "image took {:.0}ms to render after loading; simplify the render path",
                render_delay.as_millis()
            ),
            Recommendation::OptimizeLcp { lcp } => write!(
                f,
                "largest contentful paint was {:.0}ms; optimize above-the-fold images",
                lcp.as_millis()
            ),
        }
    }
}

/// An arbitrary custom metric value attached to a monitor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub enum MetricValue {
    /// A numeric value.
    #[cfg_attr(feature = "minicbor", n(0))]
    Number(#[cfg_attr(feature = "minicbor", n(0))] f64),
    /// A textual value.
    #[cfg_attr(feature = "minicbor", n(1))]
    Text(#[cfg_attr(feature = "minicbor", n(0))] String),
    /// A boolean flag.
    #[cfg_attr(feature = "minicbor", n(2))]
    Flag(#[cfg_attr(feature = "minicbor", n(0))] bool),
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Number(v)
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Number(v as f64)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Number(v as f64)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(String::from(v))
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Flag(v)
    }
}

/// A snapshot of one monitor's state.
///
/// All `Millis` values except `started_at_ms` are offsets from the
/// monitor's start.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct MonitorReport {
    /// Schema version for forward compatibility.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub version: Version,

    /// The monitor identifier, typically the image URL or element id.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub id: String,

    /// Unix timestamp in milliseconds when monitoring started.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub started_at_ms: u64,

    /// Offset at which the monitor ended, if it has.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(3))]
    pub ended_at: Option<Millis>,

    /// Time monitored so far: the end offset, or "now" for a live monitor.
    #[cfg_attr(feature = "minicbor", n(4))]
    pub duration: Millis,

    /// Named timestamps, as offsets from start.
    #[cfg_attr(feature = "minicbor", n(5))]
    pub marks: BTreeMap<String, Millis>,

    /// Named durations derived from marks.
    #[cfg_attr(feature = "minicbor", n(6))]
    pub measures: BTreeMap<String, Millis>,

    /// Passively observed vitals.
    #[cfg_attr(feature = "minicbor", n(7))]
    pub vitals: Vitals,

    /// Caller-supplied custom metrics.
    #[cfg_attr(feature = "minicbor", n(8))]
    pub custom: BTreeMap<String, MetricValue>,

    /// Derived critical-path delays, when computable.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(9))]
    pub critical_path: Option<CriticalPath>,

    /// Advisory recommendations derived from the above.
    #[cfg_attr(feature = "minicbor", n(10))]
    pub recommendations: Vec<Recommendation>,
}

impl MonitorReport {
    /// Create a builder for constructing reports.
    pub fn builder(id: impl Into<String>) -> ReportBuilder {
        ReportBuilder::new(id)
    }

    /// Whether the monitored load has ended.
    pub fn has_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Builder for [`MonitorReport`].
///
/// Derives the critical path and recommendations from whatever marks and
/// vitals were supplied; they are computed, never stored upstream.
#[derive(Debug)]
pub struct ReportBuilder {
    id: String,
    started_at_ms: Option<u64>,
    ended_at: Option<Millis>,
    duration: Millis,
    marks: BTreeMap<String, Millis>,
    measures: BTreeMap<String, Millis>,
    vitals: Vitals,
    custom: BTreeMap<String, MetricValue>,
}

impl ReportBuilder {
    /// Create a new builder for the given monitor id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            started_at_ms: None,
            ended_at: None,
            duration: Millis::ZERO,
            marks: BTreeMap::new(),
            measures: BTreeMap::new(),
            vitals: Vitals::default(),
            custom: BTreeMap::new(),
        }
    }

    /// Set the start timestamp (milliseconds since Unix epoch).
    pub fn started_at_ms(mut self, ts: u64) -> Self {
        self.started_at_ms = Some(ts);
        self
    }

    /// Set the end offset.
    pub fn ended_at(mut self, offset: Millis) -> Self {
        self.ended_at = Some(offset);
        self
    }

    /// Set the monitored duration.
    pub fn duration(mut self, duration: Millis) -> Self {
        self.duration = duration;
        self
    }

    /// Add a mark.
    pub fn mark(mut self, name: impl Into<String>, offset: Millis) -> Self {
        self.marks.insert(name.into(), offset);
        self
    }

    /// Replace the mark map wholesale.
    pub fn marks(mut self, marks: BTreeMap<String, Millis>) -> Self {
        self.marks = marks;
        self
    }

    /// Add a measure.
    pub fn measure(mut self, name: impl Into<String>, value: Millis) -> Self {
        self.measures.insert(name.into(), value);
        self
    }

    /// Replace the measure map wholesale.
    pub fn measures(mut self, measures: BTreeMap<String, Millis>) -> Self {
        self.measures = measures;
        self
    }

    /// Set the observed vitals.
    pub fn vitals(mut self, vitals: Vitals) -> Self {
        self.vitals = vitals;
        self
    }

    /// Add a custom metric.
    pub fn custom(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// Replace the custom metric map wholesale.
    pub fn custom_metrics(mut self, custom: BTreeMap<String, MetricValue>) -> Self {
        self.custom = custom;
        self
    }

    /// Build the report, deriving critical path and recommendations.
    #[cfg(feature = "std")]
    pub fn build(self) -> MonitorReport {
        let started_at_ms = self.started_at_ms.unwrap_or_else(current_timestamp_ms);
        self.build_with_timestamp(started_at_ms)
    }

    /// Build the report with an explicit start timestamp (for no_std).
    pub fn build_with_timestamp(self, started_at_ms: u64) -> MonitorReport {
        let critical_path = CriticalPath::from_marks(&self.marks);
        let recommendations = Recommendation::derive(critical_path.as_ref(), &self.vitals);

        MonitorReport {
            version: SCHEMA_VERSION,
            id: self.id,
            started_at_ms,
            ended_at: self.ended_at,
            duration: self.duration,
            marks: self.marks,
            measures: self.measures,
            vitals: self.vitals,
            custom: self.custom,
            critical_path,
            recommendations,
        }
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
#[cfg(feature = "std")]
pub(crate) fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
