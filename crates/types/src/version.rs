//! Release version parsing and ordering
//!
//! Release versions carry one to four dotted numeric components and an
//! optional pre-release tag:
//! - `1.2` - same as `1.2.0.0`
//! - `1.2.3.4` - four-part package version
//! - `v2.0.0-beta.1` - leading `v` is ignored, tag ordered per semver rules
//!
//! Missing components compare as zero, and a version without a tag sorts
//! after any tagged version with the same numbers.

use semver::Prerelease;
use serde::{Deserialize, Serialize};
use hotswap_errors::VersionError;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const MAX_COMPONENTS: usize = 4;

/// A dotted release version with up to four numeric components
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseVersion {
    components: [u64; MAX_COMPONENTS],
    // number of components written, kept for display
    written: usize,
    pre: Prerelease,
}

impl ReleaseVersion {
    /// The version assumed when nothing is known to be installed.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            components: [0; MAX_COMPONENTS],
            written: MAX_COMPONENTS,
            pre: Prerelease::EMPTY,
        }
    }

    /// Parse a version string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is empty, has more than four
    /// components, contains a non-numeric component or an invalid tag.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(VersionError::InvalidVersion {
                input: input.to_string(),
            });
        }

        let (numbers, tag) = match trimmed.split_once('-') {
            Some((numbers, tag)) => (numbers, Some(tag)),
            None => (trimmed, None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.len() > MAX_COMPONENTS {
            return Err(VersionError::TooManyComponents {
                input: input.to_string(),
            });
        }

        let mut components = [0; MAX_COMPONENTS];
        for (slot, part) in components.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| VersionError::InvalidVersion {
                input: input.to_string(),
            })?;
        }

        let pre = match tag {
            Some(tag) => Prerelease::new(tag).map_err(|e| VersionError::ParseError {
                message: e.to_string(),
            })?,
            None => Prerelease::EMPTY,
        };

        Ok(Self {
            components,
            written: parts.len(),
            pre,
        })
    }

    #[must_use]
    pub fn components(&self) -> [u64; MAX_COMPONENTS] {
        self.components
    }

    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

impl Default for ReleaseVersion {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialEq for ReleaseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReleaseVersion {}

impl Hash for ReleaseVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
        self.pre.hash(state);
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components
            .cmp(&other.components)
            .then_with(|| self.pre.cmp(&other.pre))
    }
}

impl FromStr for ReleaseVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReleaseVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReleaseVersion> for String {
    fn from(version: ReleaseVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.written.clamp(1, MAX_COMPONENTS);
        for (i, component) in self.components.iter().take(shown).enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
        }
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(s: &str) -> ReleaseVersion {
        ReleaseVersion::parse(s).unwrap()
    }

    #[test]
    fn parses_short_and_four_part_versions() {
        assert_eq!(v("1.2").components(), [1, 2, 0, 0]);
        assert_eq!(v("1.2.3.4").components(), [1, 2, 3, 4]);
        assert_eq!(v("v2.0.0").components(), [2, 0, 0, 0]);
    }

    #[test]
    fn rejects_malformed_versions() {
        assert!(ReleaseVersion::parse("").is_err());
        assert!(ReleaseVersion::parse("1.2.3.4.5").is_err());
        assert!(ReleaseVersion::parse("1.x.3").is_err());
        assert!(ReleaseVersion::parse("1..3").is_err());
    }

    #[test]
    fn missing_components_compare_as_zero() {
        assert_eq!(v("1.2"), v("1.2.0.0"));
        assert!(v("1.2.0.1") > v("1.2"));
    }

    #[test]
    fn prerelease_sorts_before_release() {
        assert!(v("1.0.0-beta.1") < v("1.0.0"));
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
        assert!(v("1.0.0-beta.1").is_prerelease());
    }

    #[test]
    fn zero_is_lowest_release() {
        assert_eq!(ReleaseVersion::zero().to_string(), "0.0.0.0");
        assert!(ReleaseVersion::zero() < v("0.0.0.1"));
    }

    #[test]
    fn display_keeps_written_components() {
        assert_eq!(v("1.2.3").to_string(), "1.2.3");
        assert_eq!(v("1.2.3.4-rc.1").to_string(), "1.2.3.4-rc.1");
    }

    proptest! {
        #[test]
        fn ordering_matches_numeric_tuple(a in proptest::array::uniform4(0u64..50), b in proptest::array::uniform4(0u64..50)) {
            let va = v(&format!("{}.{}.{}.{}", a[0], a[1], a[2], a[3]));
            let vb = v(&format!("{}.{}.{}.{}", b[0], b[1], b[2], b[3]));
            prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
        }
    }
}
