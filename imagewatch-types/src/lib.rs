//! # imagewatch-types
//!
//! Core types for image loading observability. This crate defines the
//! schema shared between instrumented image loaders and the tools that
//! consume their reports.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable `serde` and/or `minicbor` features as needed
//! - **Versioned schema**: Reports include version info for forward compatibility
//! - **Derived, not stored**: Critical-path delays and recommendations are
//!   computed from marks at report time, never persisted upstream
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//! - `minicbor`: Compact binary serialization via CBOR
//! - `all`: Enable all serialization formats
//!
//! ## Example
//!
//! ```rust
//! use imagewatch_types::{marks, Millis, MonitorReport};
//!
//! let report = MonitorReport::builder("hero.jpg")
//!     .mark(marks::MOUNT, Millis::from_millis(0.0))
//!     .mark(marks::LOAD_START, Millis::from_millis(150.0))
//!     .mark(marks::LOAD_END, Millis::from_millis(400.0))
//!     .duration(Millis::from_millis(400.0))
//!     .build_with_timestamp(1703160000000);
//!
//! let path = report.critical_path.unwrap();
//! assert_eq!(path.load_delay, Some(Millis::from_millis(250.0)));
//! // Discovery took 150ms, over the 100ms budget.
//! assert_eq!(report.recommendations.len(), 1);
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1.0.0**. The version is included in
//! serialized reports to allow consumers to handle format evolution
//! gracefully.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod duration;
mod report;
mod version;

pub use duration::*;
pub use report::*;
pub use version::*;

/// Current schema version.
///
/// Increment the major component when making breaking changes to the
/// report format. Consumers should check compatibility via
/// [`Version::is_compatible`].
pub const SCHEMA_VERSION: Version = Version::new(1, 0, 0);
