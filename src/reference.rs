//! Package references: `name[:version][@repository]`, the URI form
//! `uppm-ref:<target-app>/<text-form>`, and the `Partial`/`Complete`
//! distinction the resolver relies on throughout.
//!
//! A `Partial` reference is whatever the user typed. A `Complete` reference
//! is one the resolver has proven resolves to an actual catalog entry in a
//! specific repository — the two are distinct types so a call site that
//! requires a `CompleteReference` cannot accidentally be handed unresolved
//! user input.

use crate::error::{Error, Result};
use crate::version::{InferencePolicy, Version};
use std::fmt;
use std::hash::{Hash, Hasher};

const URI_SCHEME: &str = "uppm-ref:";

/// Characters that are illegal in a filename on at least one of the
/// platforms uppm runs on, and are therefore rejected inside a reference's
/// `name`/`version` fields (which end up as path segments of
/// `<author>/<name>/<version>.<ext>`).
const FILENAME_ILLEGAL: &[char] = &['<', '>', '"', '/', '\\', '|', '?', '*'];

fn validate_field(s: &str, field: &'static str, whole: &str) -> Result<()> {
    if s.is_empty() {
        return Err(Error::InvalidReference(
            whole.to_string(),
            format!("{field} must not be empty"),
        ));
    }
    if s.contains(FILENAME_ILLEGAL) {
        return Err(Error::InvalidReference(
            whole.to_string(),
            format!("{field} contains a character illegal in filenames"),
        ));
    }
    Ok(())
}

/// The fields shared by [`PartialReference`] and [`CompleteReference`].
#[derive(Debug, Clone)]
pub struct RawReference {
    pub name: String,
    pub version: Option<String>,
    pub repository_url: Option<String>,
    pub target_app: Option<String>,
}

impl RawReference {
    /// Parse the text form: `name ( \s* ':' \s* version )? ( \s* '@' \s*
    /// repository )?`. `name` and `version` may contain spaces but not `:`,
    /// `@`, or a filename-illegal character. Everything is case-sensitive
    /// at parse time; case-insensitivity is applied by equality/matching.
    pub fn parse_text(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidReference(
                text.to_string(),
                "reference text is empty".to_string(),
            ));
        }

        // '@' only ever separates the repository suffix, so the first
        // occurrence (from the left) is unambiguous because name/version
        // may not themselves contain '@'.
        let (body, repository_url) = match trimmed.split_once('@') {
            Some((body, repo)) => (body.trim(), Some(repo.trim().to_string())),
            None => (trimmed, None),
        };

        // Likewise ':' only ever separates the version suffix.
        let (name, version) = match body.split_once(':') {
            Some((name, version)) => (name.trim(), Some(version.trim().to_string())),
            None => (body.trim(), None),
        };

        validate_field(name, "name", text)?;
        if let Some(v) = &version {
            validate_field(v, "version", text)?;
        }
        if let Some(r) = &repository_url {
            if r.is_empty() {
                return Err(Error::InvalidReference(
                    text.to_string(),
                    "repository must not be empty".to_string(),
                ));
            }
        }

        Ok(Self {
            name: name.to_string(),
            version,
            repository_url,
            target_app: None,
        })
    }

    /// Parse the URI form: `uppm-ref:<target-app>/<text-form>`, URL-decoded
    /// before parsing. The `<target-app>/` prefix is mandatory.
    pub fn parse_uri(uri: &str) -> Result<Self> {
        let rest = uri.strip_prefix(URI_SCHEME).ok_or_else(|| {
            Error::InvalidReference(uri.to_string(), format!("missing '{URI_SCHEME}' scheme"))
        })?;

        let decoded = urlencoding::decode(rest)
            .map_err(|e| Error::InvalidReference(uri.to_string(), e.to_string()))?
            .into_owned();

        let (target_app, text_form) = decoded.split_once('/').ok_or_else(|| {
            Error::InvalidReference(
                uri.to_string(),
                "URI form requires a '<target-app>/' prefix".to_string(),
            )
        })?;

        if target_app.is_empty() {
            return Err(Error::InvalidReference(
                uri.to_string(),
                "target application name must not be empty".to_string(),
            ));
        }

        let mut reference = Self::parse_text(text_form)?;
        reference.target_app = Some(target_app.to_string());
        Ok(reference)
    }

    fn ci_eq(a: &str, b: &str) -> bool {
        a.eq_ignore_ascii_case(b)
    }

    fn ci_opt_eq(a: &Option<String>, b: &Option<String>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => Self::ci_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for RawReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(v) = &self.version {
            write!(f, ":{v}")?;
        }
        if let Some(r) = &self.repository_url {
            write!(f, "@{r}")?;
        }
        Ok(())
    }
}

impl PartialEq for RawReference {
    fn eq(&self, other: &Self) -> bool {
        Self::ci_eq(&self.name, &other.name)
            && Self::ci_opt_eq(&self.version, &other.version)
            && Self::ci_opt_eq(&self.repository_url, &other.repository_url)
    }
}
impl Eq for RawReference {}

impl Hash for RawReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_ascii_lowercase().hash(state);
        self.version.as_ref().map(|v| v.to_ascii_lowercase()).hash(state);
        self.repository_url
            .as_ref()
            .map(|r| r.to_ascii_lowercase())
            .hash(state);
    }
}

/// A user-supplied reference with some fields possibly absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartialReference(pub RawReference);

/// A reference for which `version` and `repository_url` are known to
/// resolve against an actual repository catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompleteReference(pub RawReference);

impl PartialReference {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self(RawReference::parse_text(text)?))
    }

    pub fn parse_uri(uri: &str) -> Result<Self> {
        Ok(Self(RawReference::parse_uri(uri)?))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn version(&self) -> Option<&str> {
        self.0.version.as_deref()
    }

    pub fn repository_url(&self) -> Option<&str> {
        self.0.repository_url.as_deref()
    }

    pub fn target_app(&self) -> Option<&str> {
        self.0.target_app.as_deref()
    }

    /// Classify `version` per §4.B: absent is [`VersionClass::Empty`],
    /// case-insensitively `"latest"` is [`VersionClass::Latest`], anything
    /// that parses as a [`Version`] is [`VersionClass::Semantical`], and
    /// everything else is [`VersionClass::Special`].
    pub fn version_class(&self) -> VersionClass {
        classify_version(self.0.version.as_deref())
    }

    pub fn is_special(&self) -> bool {
        matches!(self.version_class(), VersionClass::Special(_))
    }

    /// Promote this partial reference to complete once a repository has
    /// confirmed both fields resolve. Callers outside this crate's
    /// repository module should not construct a `CompleteReference` any
    /// other way.
    pub(crate) fn into_complete(self, version: String, repository_url: String) -> CompleteReference {
        CompleteReference(RawReference {
            name: self.0.name,
            version: Some(version),
            repository_url: Some(repository_url),
            target_app: self.0.target_app,
        })
    }

    /// Names equal case-insensitively, repositories both absent or both
    /// present and equal, versions equal under `version_comparator`.
    pub fn matches(&self, other: &PartialReference, version_comparator: impl Fn(&str, &str) -> bool) -> bool {
        if !self.0.name.eq_ignore_ascii_case(&other.0.name) {
            return false;
        }
        if !RawReference::ci_opt_eq(&self.0.repository_url, &other.0.repository_url) {
            return false;
        }
        match (&self.0.version, &other.0.version) {
            (None, None) => true,
            (Some(a), Some(b)) => version_comparator(a, b),
            _ => false,
        }
    }

    /// The default version comparator described in §4.B: both semantical
    /// compare as semantically equal, both non-semantical compare as
    /// strings, both empty match, otherwise mismatch.
    pub fn matches_default(&self, other: &PartialReference) -> bool {
        self.matches(other, |a, b| {
            let ca = classify_version(Some(a));
            let cb = classify_version(Some(b));
            match (ca, cb) {
                (VersionClass::Semantical(va), VersionClass::Semantical(vb)) => va == vb,
                (VersionClass::Latest, VersionClass::Latest) => true,
                (VersionClass::Special(sa), VersionClass::Special(sb)) => sa.eq_ignore_ascii_case(&sb),
                _ => a.eq_ignore_ascii_case(b),
            }
        })
    }
}

impl CompleteReference {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn version(&self) -> &str {
        self.0.version.as_deref().expect("complete reference always has a version")
    }

    pub fn repository_url(&self) -> &str {
        self.0
            .repository_url
            .as_deref()
            .expect("complete reference always has a repository")
    }

    pub fn target_app(&self) -> Option<&str> {
        self.0.target_app.as_deref()
    }

    pub fn as_partial(&self) -> PartialReference {
        PartialReference(self.0.clone())
    }

    pub fn version_class(&self) -> VersionClass {
        classify_version(self.0.version.as_deref())
    }
}

impl fmt::Display for PartialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl fmt::Display for CompleteReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The classification a version string falls into, used throughout §4.G's
/// inference rules.
#[derive(Debug, Clone)]
pub enum VersionClass {
    Empty,
    Latest,
    Semantical(Version),
    Special(String),
}

fn classify_version(version: Option<&str>) -> VersionClass {
    let Some(v) = version else {
        return VersionClass::Empty;
    };
    if v.eq_ignore_ascii_case("latest") {
        return VersionClass::Latest;
    }
    match Version::parse(v) {
        Ok(parsed) => VersionClass::Semantical(parsed.with_policy(InferencePolicy::Zero)),
        Err(_) => VersionClass::Special(v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_only() {
        let r = PartialReference::parse("my-package").unwrap();
        assert_eq!(r.name(), "my-package");
        assert!(r.version().is_none());
        assert!(r.repository_url().is_none());
    }

    #[test]
    fn parses_name_version_repo() {
        let r = PartialReference::parse("my package : 2.3 @ https://example.com/x.git").unwrap();
        assert_eq!(r.name(), "my package");
        assert_eq!(r.version(), Some("2.3"));
        assert_eq!(r.repository_url(), Some("https://example.com/x.git"));
    }

    #[test]
    fn rejects_filename_illegal_characters() {
        assert!(PartialReference::parse("weird/name").is_err());
        assert!(PartialReference::parse("name:ver*sion").is_err());
    }

    #[test]
    fn uri_form_requires_target_app_prefix() {
        assert!(PartialReference::parse_uri("uppm-ref:mypkg").is_err());
        let r = PartialReference::parse_uri("uppm-ref:my-app/pkg%3A1.0").unwrap();
        assert_eq!(r.target_app(), Some("my-app"));
        assert_eq!(r.name(), "pkg");
        assert_eq!(r.version(), Some("1.0"));
    }

    #[test]
    fn equality_is_case_insensitive() {
        let a = PartialReference::parse("Pkg:1.0@Repo").unwrap();
        let b = PartialReference::parse("pkg:1.0@repo").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn matches_default_latest_and_special() {
        let a = PartialReference::parse("pkg:latest").unwrap();
        let b = PartialReference::parse("pkg:Latest").unwrap();
        assert!(a.matches_default(&b));

        let c = PartialReference::parse("pkg:nightly").unwrap();
        let d = PartialReference::parse("pkg:nightly").unwrap();
        assert!(c.matches_default(&d));

        let e = PartialReference::parse("pkg:nightly").unwrap();
        let f = PartialReference::parse("pkg:1.0").unwrap();
        assert!(!e.matches_default(&f));
    }

    #[test]
    fn round_trip_print_then_parse() {
        let r = PartialReference::parse("pkg:2.3@https://example.com/x.git").unwrap();
        let printed = r.to_string();
        let reparsed = PartialReference::parse(&printed).unwrap();
        assert_eq!(r, reparsed);
    }
}
