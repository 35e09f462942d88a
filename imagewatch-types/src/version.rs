//! Semantic versions and compatibility gating.
//!
//! Plugins declare the host versions they support as an optional min/max
//! range; the loader compares dotted version strings against that range
//! before activating a plugin. Reports also embed the schema version so
//! consumers can detect format changes.
//!
//! Parsing comes in two flavors:
//!
//! - [`Version::parse`] (and `FromStr`) is strict: 1 to 3 dot-separated
//!   non-negative integer segments, nothing else.
//! - [`Version::parse_lenient`] accepts any number of segments, consults
//!   only the first three, and returns `None` when a consulted segment is
//!   not numeric. `None` propagates through [`compare`] and [`in_range`]
//!   as "no ordering", so malformed input never compares greater or less
//!   than anything.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use crate::SCHEMA_VERSION;

/// A semantic version: ordered (major, minor, patch) triple.
///
/// Ordering is lexicographic over the triple, so `1.9.9 < 2.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct Version {
    /// Major version - breaking changes increment this.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub major: u64,

    /// Minor version - backwards-compatible additions increment this.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub minor: u64,

    /// Patch version - fixes increment this.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub patch: u64,
}

impl Version {
    /// Create a new version.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Strictly parse a dotted version string.
    ///
    /// Accepts `"N"`, `"N.N"`, and `"N.N.N"` where every segment is a
    /// non-negative integer; missing trailing segments default to 0.
    /// Anything else - empty input, more than three segments, a
    /// non-numeric segment - is an error.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        if input.is_empty() {
            return Err(VersionError::Empty);
        }

        let mut segments = [0u64; 3];
        let mut count = 0;
        for segment in input.split('.') {
            if count == 3 {
                return Err(VersionError::TooManySegments);
            }
            segments[count] = parse_segment(segment)?;
            count += 1;
        }

        Ok(Self::new(segments[0], segments[1], segments[2]))
    }

    /// Leniently parse a dotted version string.
    ///
    /// Consults at most the first three segments; extra segments are
    /// ignored and missing ones default to 0. Returns `None` when a
    /// consulted segment is not a non-negative integer.
    pub fn parse_lenient(input: &str) -> Option<Self> {
        let mut segments = [0u64; 3];
        for (slot, segment) in segments.iter_mut().zip(input.split('.')) {
            *slot = parse_segment(segment).ok()?;
        }
        Some(Self::new(segments[0], segments[1], segments[2]))
    }

    /// Whether a string is a strictly valid version.
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Whether this version's schema is compatible with the current
    /// library schema (major version matches; minor differences are OK).
    pub fn is_compatible(&self) -> bool {
        self.major == SCHEMA_VERSION.major
    }
}

fn parse_segment(segment: &str) -> Result<u64, VersionError> {
    // Explicit digit check: u64::from_str would also accept "+1".
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::InvalidSegment);
    }
    segment
        .parse::<u64>()
        .map_err(|_| VersionError::InvalidSegment)
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Compare two version strings leniently.
///
/// Returns `None` when either string fails lenient parsing, mirroring the
/// fact that malformed versions have no defined ordering.
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    let a = Version::parse_lenient(a)?;
    let b = Version::parse_lenient(b)?;
    Some(a.cmp(&b))
}

/// Test range membership for a version string.
///
/// True iff `version` parses leniently, is `>= min` when `min` is given,
/// and is `<= max` when `max` is given. Malformed input in any consulted
/// position yields false.
pub fn in_range(version: &str, min: Option<&str>, max: Option<&str>) -> bool {
    let Some(v) = Version::parse_lenient(version) else {
        return false;
    };
    let req = VersionReq {
        min: match min {
            Some(s) => match Version::parse_lenient(s) {
                Some(m) => Some(m),
                None => return false,
            },
            None => None,
        },
        max: match max {
            Some(s) => match Version::parse_lenient(s) {
                Some(m) => Some(m),
                None => return false,
            },
            None => None,
        },
    };
    req.matches(&v)
}

/// A host version requirement declared by a plugin.
///
/// Either bound may be absent, in which case that side is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct VersionReq {
    /// Minimum supported version, inclusive.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub min: Option<Version>,

    /// Maximum supported version, inclusive.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub max: Option<Version>,
}

impl VersionReq {
    /// A requirement with no bounds - matches every version.
    pub const fn any() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    /// Require at least `min`.
    pub const fn at_least(min: Version) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// Require a version within `[min, max]`.
    pub const fn between(min: Version, max: Version) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Whether `version` satisfies this requirement.
    pub fn matches(&self, version: &Version) -> bool {
        if let Some(min) = &self.min {
            if version < min {
                return false;
            }
        }
        if let Some(max) = &self.max {
            if version > max {
                return false;
            }
        }
        true
    }
}

/// Error from strict version parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionError {
    /// The input string was empty.
    Empty,
    /// More than three dot-separated segments.
    TooManySegments,
    /// A segment was not a non-negative integer.
    InvalidSegment,
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::Empty => write!(f, "empty version string"),
            VersionError::TooManySegments => {
                write!(f, "version has more than three segments")
            }
            VersionError::InvalidSegment => {
                write!(f, "version segment is not a non-negative integer")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for VersionError {}
