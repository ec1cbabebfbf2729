//! Scope-aware version parsing and comparison.
//!
//! A [`Version`] is `Major.Minor.Build.Revision` where any suffix may be
//! omitted. What "omitted" means during a comparison is not fixed on the
//! type — it is an [`InferencePolicy`] supplied by the caller at compare
//! time, because the resolver genuinely needs both answers depending on
//! what it's doing: "find the newest candidate" wants missing components
//! treated as the maximum possible value, while "does this concrete
//! installed version equal that concrete requested version" wants missing
//! treated as zero.

use crate::error::{Error, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// How an absent version component should be treated when it is compared
/// against a component that *was* specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferencePolicy {
    /// Absent components compare as the largest possible value. Used when
    /// searching a catalog for "the newest version compatible with a
    /// partial reference."
    Newest,
    /// Absent components compare as zero. Used when comparing a resolved,
    /// concrete version against another concrete version.
    Zero,
}

fn regex_component() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:\.(\d+))?$").unwrap())
}

/// A `Major.Minor.Build.Revision` version, with a per-value inference
/// policy controlling how missing trailing components are treated during
/// comparison.
///
/// `major` is always present; `minor`/`build`/`revision` may be absent.
/// `components()` always returns a 4-element array reflecting whichever
/// policy is currently set — comparisons never read the raw `Option`s
/// directly, per the invariant that inference is applied exactly once and
/// consistently.
#[derive(Debug, Clone)]
pub struct Version {
    major: u32,
    minor: Option<u32>,
    build: Option<u32>,
    revision: Option<u32>,
    policy: InferencePolicy,
}

/// Sentinel used by the `Newest` policy: higher than any real component.
const MAX_COMPONENT: u32 = u32::MAX;

impl Version {
    /// Parse `s` against `^(\d+)(\.(\d+))?(\.(\d+))?(\.(\d+))?$`. Fails with
    /// [`Error::InvalidVersion`] if the string does not match. The resulting
    /// value defaults to the `Zero` inference policy; use
    /// [`Version::with_policy`] to switch it.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = regex_component()
            .captures(s.trim())
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))?;

        let major = caps[1]
            .parse::<u32>()
            .map_err(|_| Error::InvalidVersion(s.to_string()))?;
        let minor = caps.get(2).map(|m| m.as_str().parse::<u32>().unwrap());
        let build = caps.get(3).map(|m| m.as_str().parse::<u32>().unwrap());
        let revision = caps.get(4).map(|m| m.as_str().parse::<u32>().unwrap());

        Ok(Self {
            major,
            minor,
            build,
            revision,
            policy: InferencePolicy::Zero,
        })
    }

    /// A version with all four components specified and an explicit policy
    /// (mostly useful in tests and for constructing the "latest" sentinel).
    pub fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor: Some(minor),
            build: Some(build),
            revision: Some(revision),
            policy: InferencePolicy::Zero,
        }
    }

    /// The sentinel value representing the `latest` special-but-semantical
    /// version: major = u32::MAX, every other component absent.
    pub fn latest_sentinel() -> Self {
        Self {
            major: u32::MAX,
            minor: None,
            build: None,
            revision: None,
            policy: InferencePolicy::Newest,
        }
    }

    /// Return a copy of this version carrying a different inference policy.
    pub fn with_policy(&self, policy: InferencePolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }

    pub fn policy(&self) -> InferencePolicy {
        self.policy
    }

    pub fn major_raw(&self) -> u32 {
        self.major
    }

    /// The minor component after this version's inference policy has been
    /// applied (i.e. `components()[1]`), used by the resolver's
    /// major-or-minor conflict check.
    pub fn minor_raw(&self) -> u32 {
        self.components()[1]
    }

    /// The highest index `i` (0..=3) such that component `i` was explicitly
    /// specified: 0 = only major, 3 = all four.
    pub fn scope(&self) -> usize {
        if self.revision.is_some() {
            3
        } else if self.build.is_some() {
            2
        } else if self.minor.is_some() {
            1
        } else {
            0
        }
    }

    /// The four components after this version's inference policy has been
    /// applied. Comparisons are always performed over this array, never
    /// over the raw `Option`s.
    pub fn components(&self) -> [u32; 4] {
        let fill = match self.policy {
            InferencePolicy::Newest => MAX_COMPONENT,
            InferencePolicy::Zero => 0,
        };
        [
            self.major,
            self.minor.unwrap_or(fill),
            self.build.unwrap_or(fill),
            self.revision.unwrap_or(fill),
        ]
    }

    /// Lexicographic comparison over `[major, minor, build, revision]`,
    /// applying each side's own inference policy exactly once.
    pub fn compare(&self, other: &Version) -> Ordering {
        self.components().cmp(&other.components())
    }

    /// Whether this version agrees with `other` in every component up to
    /// (and including) `scope` — used by §4.G's partial-semantical-version
    /// matching rule (`2.3` binds only to `2.3.*.*`).
    ///
    /// Both sides must have actually *specified* a component at every index
    /// up to `scope`, not merely agree after zero-filling: otherwise `2.3`
    /// (scope 1) and `2.3.0` (scope 2) would be indistinguishable at index 2
    /// since an absent build both zero-fills to `0`. A side whose own scope
    /// doesn't reach `scope` can never agree, regardless of fill policy.
    pub fn agrees_up_to_scope(&self, other: &Version, scope: usize) -> bool {
        let scope = scope.min(3);
        if self.scope() < scope || other.scope() < scope {
            return false;
        }
        let a = self.components();
        let b = other.components();
        a[..=scope] == b[..=scope]
    }

    /// Parse a range expression of the form `[low,high)` / `(low,high]` /
    /// mixed flanks, where `low`/`high` follow the same grammar as
    /// [`Version::parse`] and either bound may be omitted (an empty bound
    /// means unbounded on that side). Returns whether `self` lies in the
    /// range.
    pub fn is_inside_range(&self, expr: &str) -> Result<bool> {
        let expr = expr.trim();
        let mut chars = expr.chars();
        let open = chars.next().ok_or_else(|| Error::InvalidVersion(expr.to_string()))?;
        let close = expr
            .chars()
            .last()
            .ok_or_else(|| Error::InvalidVersion(expr.to_string()))?;

        let (lower_inclusive, upper_inclusive) = match (open, close) {
            ('[', ']') => (true, true),
            ('[', ')') => (true, false),
            ('(', ']') => (false, true),
            ('(', ')') => (false, false),
            _ => return Err(Error::InvalidVersion(expr.to_string())),
        };

        let inner = &expr[1..expr.len() - 1];
        let mut parts = inner.splitn(2, ',');
        let lower_str = parts.next().unwrap_or("").trim();
        let upper_str = parts.next().unwrap_or("").trim();

        let lhs = self.with_policy(InferencePolicy::Zero);

        if !lower_str.is_empty() {
            let lower = Version::parse(lower_str)?.with_policy(InferencePolicy::Zero);
            let ord = lhs.compare(&lower);
            let ok = if lower_inclusive {
                ord != Ordering::Less
            } else {
                ord == Ordering::Greater
            };
            if !ok {
                return Ok(false);
            }
        }

        if !upper_str.is_empty() {
            let upper = Version::parse(upper_str)?.with_policy(InferencePolicy::Zero);
            let ord = lhs.compare(&upper);
            let ok = if upper_inclusive {
                ord != Ordering::Greater
            } else {
                ord == Ordering::Less
            };
            if !ok {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}
impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}
impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        if let Some(m) = self.minor {
            write!(f, ".{}", m)?;
        }
        if let Some(b) = self.build {
            write!(f, ".{}", b)?;
        }
        if let Some(r) = self.revision {
            write!(f, ".{}", r)?;
        }
        Ok(())
    }
}

/// `{min_version, compatible}` — `compatible` holds iff `min_version <=
/// CORE_VERSION`.
#[derive(Debug, Clone)]
pub struct VersionRequirement {
    pub min_version: Version,
    pub compatible: bool,
}

impl VersionRequirement {
    pub fn new(min_version: Version) -> Self {
        let core = core_version();
        let compatible = min_version.with_policy(InferencePolicy::Zero).compare(core) != Ordering::Greater;
        Self {
            min_version,
            compatible,
        }
    }
}

static CORE_VERSION: OnceLock<Version> = OnceLock::new();

/// The version of this build of uppm, parsed once from `CARGO_PKG_VERSION`.
pub fn core_version() -> &'static Version {
    CORE_VERSION.get_or_init(|| {
        Version::parse(env!("CARGO_PKG_VERSION"))
            .unwrap_or_else(|_| Version::new(0, 0, 0, 0))
            .with_policy(InferencePolicy::Zero)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_each_scope() {
        for (s, scope) in [("1", 0), ("1.2", 1), ("1.2.3", 2), ("1.2.3.4", 3)] {
            let v = Version::parse(s).unwrap();
            assert_eq!(v.scope(), scope);
            assert_eq!(v.to_string(), s);
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(Version::parse("abc").is_err());
        assert!(Version::parse("1.2.3.4.5").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn zero_policy_fills_missing_with_zero() {
        let a = Version::parse("2.3").unwrap().with_policy(InferencePolicy::Zero);
        let b = Version::parse("2.3.0.0").unwrap().with_policy(InferencePolicy::Zero);
        assert_eq!(a, b);
    }

    #[test]
    fn newest_policy_fills_missing_with_max() {
        let a = Version::parse("2.3").unwrap().with_policy(InferencePolicy::Newest);
        let b = Version::parse("2.3.9.9").unwrap().with_policy(InferencePolicy::Zero);
        assert!(a.compare(&b) == Ordering::Greater);
    }

    #[test]
    fn scope_restricted_match_boundary() {
        // 2.3 should bind to the highest 2.3.*.*, never to a bare 2.3.0.
        let partial = Version::parse("2.3").unwrap();
        let candidate_a = Version::parse("2.3.12").unwrap();
        let candidate_b = Version::parse("2.3.5").unwrap();
        let candidate_c = Version::parse("2.4.1").unwrap();

        assert!(partial.agrees_up_to_scope(&candidate_a, partial.scope()));
        assert!(partial.agrees_up_to_scope(&candidate_b, partial.scope()));
        assert!(!partial.agrees_up_to_scope(&candidate_c, partial.scope()));

        let bare = Version::parse("2.3.0").unwrap();
        assert!(!bare.agrees_up_to_scope(&partial, bare.scope()));
    }

    #[test]
    fn total_order_holds_for_any_pair_under_same_policy() {
        let versions = ["1", "1.0", "1.0.0", "1.0.0.1", "2", "1.9.9.9"];
        for a in &versions {
            for b in &versions {
                let va = Version::parse(a).unwrap();
                let vb = Version::parse(b).unwrap();
                let lt = va.compare(&vb) == Ordering::Less;
                let eq = va.compare(&vb) == Ordering::Equal;
                let gt = va.compare(&vb) == Ordering::Greater;
                assert_eq!([lt, eq, gt].iter().filter(|x| **x).count(), 1);
            }
        }
    }

    #[test]
    fn range_matches_inclusive_and_exclusive_flanks() {
        let v = Version::parse("5.3").unwrap();
        assert!(v.is_inside_range("[5.0,6.0)").unwrap());
        assert!(v.is_inside_range("[5.3,5.3]").unwrap());
        assert!(!v.is_inside_range("(5.3,6.0)").unwrap());
        assert!(v.is_inside_range("[5.0,]").unwrap());
        assert!(v.is_inside_range("[,6.0]").unwrap());
    }

    #[test]
    fn requirement_compatibility_gates_on_core_version() {
        let core = core_version().clone();
        let too_new = Version::new(core.major_raw() + 1, 0, 0, 0);
        let req = VersionRequirement::new(too_new);
        assert!(!req.compatible);

        let old = Version::new(0, 0, 0, 0);
        let req = VersionRequirement::new(old);
        assert!(req.compatible);
    }
}
