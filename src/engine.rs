//! Script engine registry (§4.D).
//!
//! A script engine binds one file extension to three capabilities: reading
//! the metadata header (delegating to [`crate::metadata`]), materializing
//! script text with `#load` import directives resolved to on-disk temp
//! files, and invoking a named action through the host [`ActionRuntime`].
//! The engine itself never runs the scripting language — that runtime is an
//! external collaborator reached only through `ActionRuntime`.

use crate::error::{Error, Result};
use crate::metadata::{self, ExtractedHeader};
use crate::reference::PartialReference;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Recursion bound for `#load` resolution (§4.D).
pub const MAX_IMPORT_DEPTH: usize = 500;

/// What an [`ImportResolver`] hands back for one resolved `#load` target.
pub struct ResolvedImport {
    pub text: String,
    pub extension: String,
    pub reference_slug: String,
}

/// Looks up and loads a package reference encountered inside a `#load`
/// directive. Implemented by the repository registry (§4.F) so that
/// `engine.rs` never depends on `repository.rs` directly.
pub trait ImportResolver {
    fn resolve_import(&self, reference: &PartialReference, parent_repository_url: &str) -> Result<ResolvedImport>;
}

/// The host object engines invoke actions against. The scripting runtime
/// itself (the interpreter for `csup`/`ps1` bodies) is out of scope; this
/// trait is the seam a caller plugs a real interpreter into.
pub trait ActionRuntime {
    fn invoke(&self, target_app: &str, package_name: &str, package_version: &str, action: &str, script_path: &str) -> Result<()>;
}

/// An [`ActionRuntime`] that performs no work, for tests and dry runs.
pub struct NullActionRuntime;

impl ActionRuntime for NullActionRuntime {
    fn invoke(&self, _target_app: &str, _package_name: &str, _package_version: &str, _action: &str, _script_path: &str) -> Result<()> {
        Ok(())
    }
}

fn load_directive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"#load\s+"([^"]+)""#).unwrap())
}

fn slugify(reference_text: &str) -> String {
    reference_text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

/// A script engine: one file extension, a header-comment delimiter pair,
/// and the ability to invoke named actions.
pub trait ScriptEngine: Send + Sync {
    /// File extension this engine owns, without a leading dot.
    fn extension(&self) -> &'static str;

    /// Regex fragments delimiting the header comment, e.g. `/\*` / `\*/`.
    fn header_delimiters(&self) -> (&'static str, &'static str);

    /// Whether the OS integration collaborator may associate this
    /// extension with uppm. Advisory only; unused by the core.
    fn allow_system_association(&self) -> bool {
        true
    }

    /// Locate and parse the header comment, gating on core-version
    /// compatibility (§4.C).
    fn try_get_meta(&self, text: &str, source_label: &str) -> Result<ExtractedHeader> {
        let (open, close) = self.header_delimiters();
        metadata::extract(text, open, close, source_label)
    }

    /// Resolve every `#load "<ref>"` directive in `text`, recursively,
    /// bounded by [`MAX_IMPORT_DEPTH`]. Returns the rewritten script text
    /// and the list of references that were imported.
    fn try_get_script_text(
        &self,
        text: &str,
        parent_repository_url: &str,
        resolver: &dyn ImportResolver,
        temp_dir: &Path,
    ) -> Result<(String, Vec<PartialReference>)> {
        let mut imports = Vec::new();
        let resolved = self.resolve_imports_depth(text, parent_repository_url, resolver, temp_dir, 0, &mut imports)?;
        Ok((resolved, imports))
    }

    #[doc(hidden)]
    fn resolve_imports_depth(
        &self,
        text: &str,
        parent_repository_url: &str,
        resolver: &dyn ImportResolver,
        temp_dir: &Path,
        depth: usize,
        imports: &mut Vec<PartialReference>,
    ) -> Result<String> {
        if depth > MAX_IMPORT_DEPTH {
            return Err(Error::ImportDepthExceeded(MAX_IMPORT_DEPTH));
        }

        let re = load_directive_regex();
        let mut out = String::with_capacity(text.len());
        let mut last_end = 0;

        for caps in re.captures_iter(text) {
            let whole = caps.get(0).unwrap();
            let target_text = caps.get(1).unwrap().as_str();

            out.push_str(&text[last_end..whole.start()]);

            let partial = PartialReference::parse(target_text)?;
            let resolved = resolver.resolve_import(&partial, parent_repository_url)?;

            let inner_text = self.resolve_imports_depth(
                &resolved.text,
                parent_repository_url,
                resolver,
                temp_dir,
                depth + 1,
                imports,
            )?;

            let engine_dir = temp_dir.join(self.extension());
            let file_path: PathBuf = engine_dir.join(format!("{}.{}", resolved.reference_slug, resolved.extension));
            write_import_file(&file_path, &inner_text)?;

            out.push_str(&format!(r#"#load "{}""#, file_path.display()));
            imports.push(partial);
            last_end = whole.end();
        }
        out.push_str(&text[last_end..]);
        Ok(out)
    }

    /// Invoke `action` against `pack` through `runtime`. Engines that only
    /// support a single action must return `ActionUnsupported` for any
    /// other name.
    fn run_action(&self, runtime: &dyn ActionRuntime, target_app: &str, package_name: &str, package_version: &str, action: &str, script_path: &str) -> Result<()>;
}

fn write_import_file(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}

/// C#-like engine: `/* … */` header, extension `csup`.
pub struct CSharpLikeEngine;

impl ScriptEngine for CSharpLikeEngine {
    fn extension(&self) -> &'static str {
        "csup"
    }

    fn header_delimiters(&self) -> (&'static str, &'static str) {
        (r"/\*", r"\*/")
    }

    fn run_action(&self, runtime: &dyn ActionRuntime, target_app: &str, package_name: &str, package_version: &str, action: &str, script_path: &str) -> Result<()> {
        if action != "install" {
            return Err(Error::ActionUnsupported {
                action: action.to_string(),
                extension: self.extension().to_string(),
            });
        }
        runtime.invoke(target_app, package_name, package_version, action, script_path)
    }
}

/// Shell-like engine: `<# … #>` header, extension `ps1`.
pub struct ShellLikeEngine;

impl ScriptEngine for ShellLikeEngine {
    fn extension(&self) -> &'static str {
        "ps1"
    }

    fn header_delimiters(&self) -> (&'static str, &'static str) {
        (r"<#", r"#>")
    }

    fn run_action(&self, runtime: &dyn ActionRuntime, target_app: &str, package_name: &str, package_version: &str, action: &str, script_path: &str) -> Result<()> {
        if action != "install" {
            return Err(Error::ActionUnsupported {
                action: action.to_string(),
                extension: self.extension().to_string(),
            });
        }
        runtime.invoke(target_app, package_name, package_version, action, script_path)
    }
}

/// Maps extension → engine, populated at startup.
#[derive(Default)]
pub struct EngineRegistry {
    engines: HashMap<&'static str, Box<dyn ScriptEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self { engines: HashMap::new() }
    }

    /// The registry pre-populated with the two built-in engines (§6).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CSharpLikeEngine));
        registry.register(Box::new(ShellLikeEngine));
        registry
    }

    pub fn register(&mut self, engine: Box<dyn ScriptEngine>) {
        self.engines.insert(engine.extension(), engine);
    }

    pub fn get(&self, extension: &str) -> Option<&dyn ScriptEngine> {
        self.engines.get(extension).map(|b| b.as_ref())
    }

    pub fn get_or_err(&self, extension: &str) -> Result<&dyn ScriptEngine> {
        self.get(extension)
            .ok_or_else(|| Error::EngineUnavailable(extension.to_string()))
    }
}
