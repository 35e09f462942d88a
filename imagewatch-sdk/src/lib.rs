//! # imagewatch-sdk
//!
//! Instrumentation SDK for monitoring image loading performance.
//!
//! This crate provides per-image monitors that record lifecycle marks,
//! derive measures and critical-path delays, accept passively observed
//! web vitals, and produce reports with advisory recommendations.
//!
//! ## Quick Start
//!
//! ```rust
//! use imagewatch_sdk::{MonitorConfig, MonitorManager};
//! use imagewatch_types::marks;
//!
//! let manager = MonitorManager::new(MonitorConfig::default());
//!
//! // One monitor per image, created lazily and shared.
//! let monitor = manager.get_or_create("hero.jpg");
//!
//! // Record lifecycle events as the image moves through loading.
//! monitor.mark(marks::MOUNT);
//! monitor.mark(marks::LOAD_START);
//! monitor.mark(marks::LOAD_END);
//! let fetch = monitor.measure("fetch", marks::LOAD_START, Some(marks::LOAD_END));
//! assert!(fetch.is_some());
//! monitor.end();
//!
//! // Reports carry marks, measures, critical-path delays, and advisories.
//! let report = monitor.report();
//! assert!(report.has_ended());
//! ```
//!
//! ## Features
//!
//! - **Fail-soft recording**: a measure against a missing mark logs a
//!   warning and returns `None`; it never breaks the caller
//! - **Optional collaborators**: trace sinks and vitals sources degrade
//!   to no-ops when absent
//! - **Retention-based eviction**: ended monitors are swept from the
//!   registry after a configurable retention window
//! - **Thread-safe**: monitors and managers work from any thread or task

mod config;
mod manager;
mod monitor;
mod trace;
mod vitals;

pub use config::MonitorConfig;
pub use manager::MonitorManager;
pub use monitor::Monitor;
pub use trace::{MemoryTraceSink, NoopTraceSink, TraceSink};
pub use vitals::VitalsSink;

#[cfg(feature = "tokio")]
pub use manager::SweeperHandle;

// Re-export types for convenience
pub use imagewatch_types::{
    marks, CriticalPath, MetricValue, Millis, MonitorReport, Recommendation, Version, VersionReq,
    Vitals,
};
