//! Reference inference (§4.G) — "the heart" of this crate: turning a
//! partial reference plus a repository's catalog into one complete
//! reference, honoring latest/special/semantical version semantics.

use crate::error::{Error, Result};
use crate::reference::{CompleteReference, PartialReference, VersionClass};
use crate::version::{InferencePolicy, Version};
use std::collections::HashMap;
use std::path::PathBuf;

pub fn infer_reference(
    partial: &PartialReference,
    repository_url: &str,
    catalog: &HashMap<CompleteReference, PathBuf>,
) -> Result<CompleteReference> {
    // Step 1: if a repository was explicitly requested, it must match this one.
    if let Some(requested_repo) = partial.repository_url() {
        if !requested_repo.eq_ignore_ascii_case(repository_url) {
            return Err(not_found_err(partial));
        }
    }

    // Step 2: candidates with a matching name, case-insensitively.
    let candidates: Vec<&CompleteReference> = catalog
        .keys()
        .filter(|c| c.name().eq_ignore_ascii_case(partial.name()))
        .collect();
    if candidates.is_empty() {
        return Err(not_found_err(partial));
    }

    match partial.version_class() {
        // Step 3: a special version must match a candidate's version string exactly
        // (case-insensitively); no fallback.
        VersionClass::Special(requested) => candidates
            .into_iter()
            .find(|c| c.version().eq_ignore_ascii_case(&requested))
            .cloned()
            .ok_or_else(|| not_found_err(partial)),

        // Step 4: no version, or explicit "latest".
        VersionClass::Empty | VersionClass::Latest => {
            if let Some(exact_latest) = candidates.iter().find(|c| c.version().eq_ignore_ascii_case("latest")) {
                return Ok((*exact_latest).clone());
            }
            highest_semantical(&candidates).ok_or_else(|| not_found_err(partial))
        }

        // Step 5: a partial semantical version narrows candidates to the same
        // scope, then picks the highest remaining.
        VersionClass::Semantical(requested) => {
            let scope = requested.scope();
            let scoped: Vec<&CompleteReference> = candidates
                .into_iter()
                .filter(|c| match Version::parse(c.version()) {
                    Ok(v) => requested.agrees_up_to_scope(&v.with_policy(InferencePolicy::Zero), scope),
                    Err(_) => false,
                })
                .collect();
            highest_semantical(&scoped).ok_or_else(|| not_found_err(partial))
        }
    }
}

fn highest_semantical(candidates: &[&CompleteReference]) -> Option<CompleteReference> {
    candidates
        .iter()
        .filter_map(|c| Version::parse(c.version()).ok().map(|v| (v.with_policy(InferencePolicy::Newest), *c)))
        .max_by(|(a, _), (b, _)| a.compare(b))
        .map(|(_, c)| c.clone())
}

fn not_found_err(partial: &PartialReference) -> Error {
    Error::PackageNotFound {
        name: partial.name().to_string(),
        repository: partial.repository_url().unwrap_or("<any>").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::RawReference;

    fn complete(name: &str, version: &str, repo: &str) -> CompleteReference {
        CompleteReference(RawReference {
            name: name.to_string(),
            version: Some(version.to_string()),
            repository_url: Some(repo.to_string()),
            target_app: None,
        })
    }

    fn catalog(entries: &[(&str, &str)], repo: &str) -> HashMap<CompleteReference, PathBuf> {
        entries
            .iter()
            .map(|(name, version)| (complete(name, version, repo), PathBuf::from(format!("{name}/{version}"))))
            .collect()
    }

    #[test]
    fn latest_semantical_resolution() {
        let cat = catalog(&[("p", "1.0"), ("p", "1.2"), ("p", "2.0")], "repo");
        let partial = PartialReference::parse("p").unwrap();
        let result = infer_reference(&partial, "repo", &cat).unwrap();
        assert_eq!(result.version(), "2.0");
    }

    #[test]
    fn scope_restricted_resolution() {
        let cat = catalog(&[("p", "2.3.1"), ("p", "2.3.7"), ("p", "2.4.0")], "repo");
        let partial = PartialReference::parse("p:2.3").unwrap();
        let result = infer_reference(&partial, "repo", &cat).unwrap();
        assert_eq!(result.version(), "2.3.7");
    }

    #[test]
    fn explicit_zero_patch_does_not_match_scope_restricted() {
        let cat = catalog(&[("p", "2.3")], "repo");
        let partial = PartialReference::parse("p:2.3.0").unwrap();
        assert!(infer_reference(&partial, "repo", &cat).is_err());
    }

    #[test]
    fn special_label_match_is_case_insensitive() {
        let cat = catalog(&[("p", "nightly"), ("p", "1.0")], "repo");
        let partial = PartialReference::parse("p:Nightly").unwrap();
        let result = infer_reference(&partial, "repo", &cat).unwrap();
        assert_eq!(result.version(), "nightly");
    }

    #[test]
    fn repository_mismatch_fails() {
        let cat = catalog(&[("p", "1.0")], "repo-a");
        let partial = PartialReference::parse("p@repo-b").unwrap();
        assert!(infer_reference(&partial, "repo-a", &cat).is_err());
    }

    #[test]
    fn unknown_name_fails() {
        let cat = catalog(&[("p", "1.0")], "repo");
        let partial = PartialReference::parse("other").unwrap();
        assert!(infer_reference(&partial, "repo", &cat).is_err());
    }
}
