//! Driver version: a `(major, minor, patch)` triple parsed from whatever
//! text the host obtained from its platform's driver-identity source.
//!
//! Grounded on spec.md §3 "Driver version" and §6 "Device-identity source";
//! the regex is used verbatim from spec.md §6. Where the string comes from
//! (sysfs, an ioctl, `nvidia-smi`, a registry key) is the host's concern —
//! spec.md Open Question 4 asks implementations to document this, and this
//! crate's answer is: it doesn't read anything itself, callers pass text in.

use core::fmt;
use once_cell::sync::Lazy;
use regex::Regex;

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{2,4})\.(\d{1,3})(?:\.(\d{1,3}))?").unwrap());

/// A driver's reported version, supporting a total order and a
/// "meets recommended baseline" predicate.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct DriverVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl DriverVersion {
    /// Compile-time baseline this crate was validated against.
    pub const RECOMMENDED: DriverVersion = DriverVersion { major: 590, minor: 48, patch: 1 };

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parses the first `major.minor[.patch]`-shaped token out of `text`,
    /// matching spec.md §6's device-identity grammar. Only the first line
    /// is considered, matching the teacher's "first line" parsing rule.
    pub fn parse(text: &str) -> Option<DriverVersion> {
        let first_line = text.lines().next().unwrap_or(text);
        let caps = VERSION_RE.captures(first_line)?;
        let major = caps.get(1)?.as_str().parse().ok()?;
        let minor = caps.get(2)?.as_str().parse().ok()?;
        let patch = caps
            .get(3)
            .map(|m| m.as_str().parse().unwrap_or(0))
            .unwrap_or(0);
        Some(DriverVersion { major, minor, patch })
    }

    /// Whether this version is at least as new as [`Self::RECOMMENDED`].
    pub fn meets_recommended(&self) -> bool {
        *self >= Self::RECOMMENDED
    }
}

impl fmt::Display for DriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_major_minor_patch() {
        let v = DriverVersion::parse("590.48.01 driver build\nsome other line").unwrap();
        assert_eq!(v, DriverVersion::new(590, 48, 1));
    }

    #[test]
    fn parses_major_minor_only() {
        let v = DriverVersion::parse("551.23").unwrap();
        assert_eq!(v, DriverVersion::new(551, 23, 0));
    }

    #[test]
    fn ignores_lines_after_the_first() {
        assert!(DriverVersion::parse("no version here\n590.48.01").is_none());
    }

    #[test]
    fn malformed_string_returns_none() {
        assert!(DriverVersion::parse("not a version at all").is_none());
    }

    #[test]
    fn ordering_and_recommended_baseline() {
        assert!(DriverVersion::new(590, 48, 1).meets_recommended());
        assert!(DriverVersion::new(591, 0, 0).meets_recommended());
        assert!(!DriverVersion::new(590, 48, 0).meets_recommended());
        assert!(!DriverVersion::new(470, 0, 0).meets_recommended());
        assert!(DriverVersion::new(1, 0, 0) < DriverVersion::new(2, 0, 0));
    }
}
