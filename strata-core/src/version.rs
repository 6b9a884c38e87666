//! Semantic versions used by the NMA version compatibility check.
//!
//! Endpoint versioning is a separate concern: endpoints carry a string
//! prefix (`v1/`) owned by the request builder, never a [`SemVer`].

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A `major.minor.patch` version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SemVer {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component.
    pub patch: u32,
}

impl SemVer {
    /// Create a version from its components.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Whether two versions share a major component.
    pub fn same_major(&self, other: &SemVer) -> bool {
        self.major == other.major
    }
}

impl FromStr for SemVer {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidVersion { version: s.to_string() };
        let mut parts = s.trim().split('.');
        let mut next = |parts: &mut std::str::Split<'_, char>| -> Result<u32, CoreError> {
            parts
                .next()
                .ok_or_else(invalid)?
                .parse::<u32>()
                .map_err(|_| invalid())
        };
        let major = next(&mut parts)?;
        let minor = next(&mut parts)?;
        let patch = next(&mut parts)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(SemVer { major, minor, patch })
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_version() {
        let version: SemVer = "12.0.4".parse().unwrap();
        assert_eq!(version, SemVer::new(12, 0, 4));
        assert_eq!(version.to_string(), "12.0.4");
    }

    #[test]
    fn parse_trims_whitespace() {
        let version: SemVer = " 1.2.3 ".parse().unwrap();
        assert_eq!(version, SemVer::new(1, 2, 3));
    }

    #[test]
    fn reject_malformed_versions() {
        for bad in ["", "1", "1.2", "1.2.3.4", "a.b.c", "1.2.x"] {
            assert!(bad.parse::<SemVer>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn major_compatibility() {
        let a = SemVer::new(12, 0, 1);
        let b = SemVer::new(12, 3, 0);
        let c = SemVer::new(11, 9, 9);
        assert!(a.same_major(&b));
        assert!(!a.same_major(&c));
    }
}
