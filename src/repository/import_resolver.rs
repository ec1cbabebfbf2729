//! Backs [`crate::engine::ImportResolver`] with the real [`RepositoryRegistry`]
//! (§4.D / §4.F), so `#load` directives resolve against whichever repository
//! a reference names (or the importing package's own repository when it
//! names none).

use super::RepositoryRegistry;
use crate::engine::{EngineRegistry, ImportResolver, ResolvedImport};
use crate::error::Result;
use crate::reference::PartialReference;
use std::cell::RefCell;

/// `resolve_import` takes `&self` (the engine recurses through it without
/// threading a `&mut` down), but looking up an unfamiliar repository URL can
/// still need to create and refresh one, so the registry sits behind a
/// `RefCell` here rather than a plain reference.
pub struct RegistryImportResolver<'a> {
    registry: RefCell<&'a mut RepositoryRegistry>,
    engines: &'a EngineRegistry,
}

impl<'a> RegistryImportResolver<'a> {
    pub fn new(registry: &'a mut RepositoryRegistry, engines: &'a EngineRegistry) -> Self {
        Self {
            registry: RefCell::new(registry),
            engines,
        }
    }
}

fn slugify(reference_text: &str) -> String {
    reference_text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

impl<'a> ImportResolver for RegistryImportResolver<'a> {
    fn resolve_import(&self, reference: &PartialReference, parent_repository_url: &str) -> Result<ResolvedImport> {
        let url = reference.repository_url().unwrap_or(parent_repository_url);
        let mut registry = self.registry.borrow_mut();
        let handle = registry.get_or_create(url, self.engines)?;
        let repo = handle.borrow();
        let complete = repo.try_infer_reference(reference)?;
        let engine = repo.try_get_script_engine(&complete, self.engines)?;
        let text = repo.try_get_package_text(&complete)?;
        Ok(ResolvedImport {
            text,
            extension: engine.extension().to_string(),
            reference_slug: slugify(&complete.to_string()),
        })
    }
}
