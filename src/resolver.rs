//! Dependency resolver (§4.J) — the critical algorithm in this crate.
//!
//! This is deliberately *not* a SAT/constraint solve: §4.J specifies a
//! fixed, ordered table of reconciliation and conflict rules, evaluated
//! top to bottom with first-match-wins semantics. A general solver would
//! be solving the wrong problem — there is no backtracking and no notion
//! of "no solution exists," only "this rule fires, and that's the
//! decision."

use crate::error::Result;
use crate::package::{LoadedPackage, Package};
use crate::reference::{PartialReference, VersionClass};
use crate::repository::RepositoryRegistry;
use crate::target_app::{InstalledScope, TargetApp};
use crate::version::InferencePolicy;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// A non-fatal note surfaced during tree construction (§7 "Conflict logs
/// are warnings, not errors").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// Two special-labeled candidates for the same name disagreed.
    SpecialVersionConflict,
    /// A semantical winner differs from the loser in major or minor.
    MajorMinorConflict,
    /// The installed version's major exceeds the requested major.
    InstalledMajorAhead,
}

#[derive(Debug, Clone)]
pub struct ConflictLogEntry {
    pub name: String,
    pub kind: ConflictKind,
    pub message: String,
}

#[derive(Default)]
pub struct ConflictLog(pub Vec<ConflictLogEntry>);

impl ConflictLog {
    fn push(&mut self, name: &str, kind: ConflictKind, message: impl Into<String>) {
        self.0.push(ConflictLogEntry {
            name: name.to_string(),
            kind,
            message: message.into(),
        });
    }
}

/// Callback for interactive confirmations (§9 "User prompts"). The core
/// never reads the console itself.
pub trait UserPrompt {
    /// Ask a yes/no question; returns the user's answer, or `default` under
    /// unattended mode.
    fn confirm(&self, question: &str, default: bool) -> bool;
}

/// Always answers with the supplied default and logs a warning (§7
/// "User-input-required situations under unattended mode").
pub struct UnattendedPrompt;

impl UserPrompt for UnattendedPrompt {
    fn confirm(&self, question: &str, default: bool) -> bool {
        log::warn!("unattended mode: defaulting '{question}' to {default}");
        default
    }
}

/// Everything `resolve` needs from its environment, gathered in one place
/// so the recursive tree-build function doesn't grow an unbounded
/// parameter list.
pub struct ResolveContext<'a> {
    pub repositories: &'a mut RepositoryRegistry,
    pub engines: &'a crate::engine::EngineRegistry,
    pub target_app: &'a TargetApp,
    pub prompt: &'a dyn UserPrompt,
    pub unattended: bool,
    pub log: ConflictLog,
    /// Scratch folder script engines materialize `#load`-resolved imports
    /// under (§4.D).
    pub import_temp_dir: &'a Path,
}

/// Build (or rebuild) `root.flat_dependencies` by walking `root.meta.dependencies`
/// in insertion order, per §4.J.
pub fn resolve(root: &Rc<RefCell<Package>>, ctx: &mut ResolveContext) {
    let deps = root.borrow().meta.dependencies.clone();
    for dep_ref in &deps {
        build_one(root, dep_ref, ctx);
    }
}

fn build_one(root: &Rc<RefCell<Package>>, dep_ref: &PartialReference, ctx: &mut ResolveContext) {
    let effective_scope = root.borrow().effective_scope();

    // Phase 1: reconcile against what's already installed.
    let installed = ctx.target_app.try_get_installed_package(dep_ref, effective_scope);
    let (mut dep_ref, decision) = reconcile(dep_ref, installed.as_ref(), ctx.prompt, ctx.unattended, &mut ctx.log);

    match decision {
        ReconcileDecision::Skip => return,
        ReconcileDecision::UpdateWithExisting => {
            if let Some(installed_complete) = &installed {
                dep_ref = installed_complete.as_partial();
            }
        }
        ReconcileDecision::UpdateWithInput => {}
    }

    // Phase 2: load. A missing dependency is a warning, not a fatal error.
    let loaded = match load_via_registry(&dep_ref, ctx) {
        Ok(loaded) => loaded,
        Err(e) => {
            log::warn!("dependency '{dep_ref}' failed to load: {e}");
            return;
        }
    };

    let name = loaded.meta.name.clone();
    let candidate_root = root.borrow().root.upgrade().unwrap_or_else(|| root.clone());
    let depth = root.borrow().depth + 1;
    let target_app_name = root.borrow().target_app.clone();
    let candidate = Package::new_descendant(loaded, target_app_name, effective_scope, depth, Rc::downgrade(&candidate_root));

    place_in_tree(&candidate_root, &name, candidate, ctx);
}

fn load_via_registry(dep_ref: &PartialReference, ctx: &mut ResolveContext) -> Result<LoadedPackage> {
    if let Some(repo_url) = dep_ref.repository_url() {
        let handle = ctx.repositories.get_or_create(repo_url, ctx.engines)?;
        let repo = handle.borrow();
        crate::package::load(&repo, ctx.engines, dep_ref, ctx.repositories, ctx.import_temp_dir)
    } else {
        let (handle, _complete) = ctx.repositories.resolve_without_repository(dep_ref)?;
        let repo = handle.borrow();
        crate::package::load(&repo, ctx.engines, dep_ref, ctx.repositories, ctx.import_temp_dir)
    }
}

enum ReconcileDecision {
    Skip,
    UpdateWithExisting,
    UpdateWithInput,
}

/// §4.J Phase 1 decision table.
fn reconcile(
    dep_ref: &PartialReference,
    installed: Option<&crate::reference::CompleteReference>,
    prompt: &dyn UserPrompt,
    _unattended: bool,
    log: &mut ConflictLog,
) -> (PartialReference, ReconcileDecision) {
    let Some(installed) = installed else {
        return (dep_ref.clone(), ReconcileDecision::UpdateWithInput);
    };
    let installed_partial = installed.as_partial();

    let requested_str = dep_ref.version().unwrap_or_default();
    let installed_str = installed_partial.version().unwrap_or_default();

    if requested_str.eq_ignore_ascii_case(installed_str) {
        return (dep_ref.clone(), ReconcileDecision::Skip);
    }

    let requested_class = dep_ref.version_class();
    let installed_class = installed_partial.version_class();

    match (&installed_class, &requested_class) {
        (VersionClass::Special(i), VersionClass::Special(r)) => {
            if !i.eq_ignore_ascii_case(r) {
                log.push(dep_ref.name(), ConflictKind::SpecialVersionConflict, format!("installed '{i}' vs requested '{r}'"));
            }
            (dep_ref.clone(), ReconcileDecision::Skip)
        }
        (VersionClass::Latest, requested) if !matches!(requested, VersionClass::Special(_)) => {
            let adopt = prompt.confirm(&format!("'{}' is installed at latest; update to match the requested reference?", dep_ref.name()), false);
            if adopt {
                (dep_ref.clone(), ReconcileDecision::UpdateWithExisting)
            } else {
                (dep_ref.clone(), ReconcileDecision::Skip)
            }
        }
        (VersionClass::Semantical(installed_v), VersionClass::Semantical(requested_v)) => {
            let installed_v = installed_v.with_policy(InferencePolicy::Zero);
            let requested_v = requested_v.with_policy(InferencePolicy::Zero);
            if installed_v == requested_v {
                (dep_ref.clone(), ReconcileDecision::Skip)
            } else if requested_v > installed_v {
                let adopt = prompt.confirm(&format!("update '{}' from {} to {}?", dep_ref.name(), installed_v, requested_v), false);
                if adopt {
                    (dep_ref.clone(), ReconcileDecision::UpdateWithInput)
                } else {
                    (dep_ref.clone(), ReconcileDecision::Skip)
                }
            } else if installed_v.major_raw() > requested_v.major_raw() {
                log.push(dep_ref.name(), ConflictKind::InstalledMajorAhead, format!("installed {installed_v} ahead of requested {requested_v}"));
                (dep_ref.clone(), ReconcileDecision::Skip)
            } else if installed_partial.version().map(|v| crate::version::Version::parse(v).map(|p| p.scope()).unwrap_or(3)).unwrap_or(3)
                < dep_ref.version().map(|v| crate::version::Version::parse(v).map(|p| p.scope()).unwrap_or(3)).unwrap_or(3)
            {
                let adopt = prompt.confirm(&format!("installed '{}' has a broader version scope than requested; keep installed?", dep_ref.name()), true);
                if adopt {
                    (dep_ref.clone(), ReconcileDecision::UpdateWithExisting)
                } else {
                    (dep_ref.clone(), ReconcileDecision::Skip)
                }
            } else {
                (dep_ref.clone(), ReconcileDecision::UpdateWithInput)
            }
        }
        _ => (dep_ref.clone(), ReconcileDecision::UpdateWithInput),
    }
}

/// §4.J Phase 3: flatten `candidate` into `root.flat_dependencies` under
/// `name`, applying the ordered conflict table when an entry already
/// exists.
fn place_in_tree(root: &Rc<RefCell<Package>>, name: &str, candidate: Rc<RefCell<Package>>, ctx: &mut ResolveContext) {
    let existing = root.borrow().flat_dependencies.get(name).cloned();

    let Some(existing) = existing else {
        root.borrow_mut().flat_dependencies.insert(name, candidate.clone());
        resolve_child(root, &candidate, ctx);
        return;
    };

    let existing_class = existing.borrow().meta.self_reference.version_class();
    let candidate_class = candidate.borrow().meta.self_reference.version_class();

    // Rule 1: both special.
    if let (VersionClass::Special(e), VersionClass::Special(c)) = (&existing_class, &candidate_class) {
        if !e.eq_ignore_ascii_case(c) {
            ctx.log.push(name, ConflictKind::SpecialVersionConflict, format!("'{e}' vs '{c}'"));
        }
        return;
    }

    // Rule 2: exactly one special.
    let existing_is_special = matches!(existing_class, VersionClass::Special(_));
    let candidate_is_special = matches!(candidate_class, VersionClass::Special(_));
    if existing_is_special != candidate_is_special {
        if existing_is_special {
            root.borrow_mut().flat_dependencies.insert(name, candidate.clone());
            resolve_child(root, &candidate, ctx);
        }
        return;
    }

    // Rule 3: exactly one is `latest`.
    let existing_is_latest = matches!(existing_class, VersionClass::Latest);
    let candidate_is_latest = matches!(candidate_class, VersionClass::Latest);
    if existing_is_latest != candidate_is_latest {
        if existing_is_latest {
            root.borrow_mut().flat_dependencies.insert(name, candidate.clone());
            resolve_child(root, &candidate, ctx);
        }
        return;
    }

    // Rule 4: both `latest`.
    if existing_is_latest && candidate_is_latest {
        return;
    }

    // Rule 5: both semantical.
    if let (VersionClass::Semantical(e), VersionClass::Semantical(c)) = (&existing_class, &candidate_class) {
        let e = e.with_policy(InferencePolicy::Newest);
        let c = c.with_policy(InferencePolicy::Newest);
        let candidate_wins = c > e;
        let winner = if candidate_wins { &c } else { &e };
        let loser = if candidate_wins { &e } else { &c };
        let major_differs = winner.major_raw() != loser.major_raw();
        // Only compare minors when both sides actually specified one; an
        // absent minor (scope 0) carries no value to disagree with.
        let minor_differs = winner.scope() >= 1 && loser.scope() >= 1 && winner.minor_raw() != loser.minor_raw();
        if major_differs || minor_differs {
            ctx.log.push(name, ConflictKind::MajorMinorConflict, format!("kept {winner}, discarded {loser}"));
        }
        if candidate_wins {
            root.borrow_mut().flat_dependencies.insert(name, candidate.clone());
            resolve_child(root, &candidate, ctx);
        }
    }
}

fn resolve_child(root: &Rc<RefCell<Package>>, candidate: &Rc<RefCell<Package>>, ctx: &mut ResolveContext) {
    let mut inner_ctx = ResolveContext {
        repositories: ctx.repositories,
        engines: ctx.engines,
        target_app: ctx.target_app,
        prompt: ctx.prompt,
        unattended: ctx.unattended,
        log: std::mem::take(&mut ctx.log),
        import_temp_dir: ctx.import_temp_dir,
    };
    resolve(candidate, &mut inner_ctx);
    ctx.log = inner_ctx.log;
    let _ = root;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysNo;
    impl UserPrompt for AlwaysNo {
        fn confirm(&self, _question: &str, _default: bool) -> bool {
            false
        }
    }

    #[test]
    fn reconcile_exact_match_skips() {
        let dep = PartialReference::parse("x:1.5").unwrap();
        let installed = crate::reference::CompleteReference(crate::reference::RawReference {
            name: "x".to_string(),
            version: Some("1.5".to_string()),
            repository_url: Some("repo".to_string()),
            target_app: None,
        });
        let mut log = ConflictLog::default();
        let (_, decision) = reconcile(&dep, Some(&installed), &AlwaysNo, true, &mut log);
        assert!(matches!(decision, ReconcileDecision::Skip));
    }

    #[test]
    fn reconcile_installed_major_ahead_skips_with_conflict() {
        let dep = PartialReference::parse("x:1.2").unwrap();
        let installed = crate::reference::CompleteReference(crate::reference::RawReference {
            name: "x".to_string(),
            version: Some("2.0".to_string()),
            repository_url: Some("repo".to_string()),
            target_app: None,
        });
        let mut log = ConflictLog::default();
        let (_, decision) = reconcile(&dep, Some(&installed), &AlwaysNo, true, &mut log);
        assert!(matches!(decision, ReconcileDecision::Skip));
        assert_eq!(log.0.len(), 1);
        assert_eq!(log.0[0].kind, ConflictKind::InstalledMajorAhead);
    }

    #[test]
    fn reconcile_higher_requested_asks_and_defaults_no_under_unattended() {
        let dep = PartialReference::parse("x:1.5").unwrap();
        let installed = crate::reference::CompleteReference(crate::reference::RawReference {
            name: "x".to_string(),
            version: Some("1.2".to_string()),
            repository_url: Some("repo".to_string()),
            target_app: None,
        });
        let mut log = ConflictLog::default();
        let (_, decision) = reconcile(&dep, Some(&installed), &AlwaysNo, true, &mut log);
        assert!(matches!(decision, ReconcileDecision::Skip));
    }
}
