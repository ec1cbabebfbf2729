//! Error taxonomy for the uppm core.
//!
//! Every variant corresponds to one of the failure kinds named in the
//! package-graph resolver design: grammar failures on user input, repository
//! I/O, metadata extraction, and the resolver/action-runner's own fatal
//! conditions. Collaborator errors (I/O, JSON, TOML, regex, git) are wrapped
//! rather than flattened so call sites can still match on `Error::Io(_)`
//! when they need to.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("invalid reference '{0}': {1}")]
    InvalidReference(String, String),

    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    #[error("no repository accepts url '{0}'")]
    RepositoryNotFound(String),

    #[error("repository '{0}' failed to refresh: {1}")]
    RepositoryRefreshFailed(String, String),

    #[error("package '{name}' not found in repository '{repository}'")]
    PackageNotFound { name: String, repository: String },

    #[error("no script engine registered for extension '.{0}'")]
    EngineUnavailable(String),

    #[error("malformed metadata header in '{0}'")]
    MalformedHeader(String),

    #[error("malformed metadata object in '{0}': {1}")]
    MalformedMetadata(String, String),

    #[error("package '{package}' requires uppm core >= {required}, but this build is {running}")]
    CoreTooOld {
        package: String,
        required: String,
        running: String,
    },

    #[error("import depth exceeded {0} while resolving '#load' directives")]
    ImportDepthExceeded(usize),

    #[error("action '{action}' is not supported by the '{extension}' engine")]
    ActionUnsupported { action: String, extension: String },

    #[error("action '{action}' failed for package '{package}': {reason}")]
    ActionFailed {
        action: String,
        package: String,
        reason: String,
    },

    #[error("unknown target application '{0}'")]
    UnknownTargetApp(String),

    #[error("{0}")]
    Other(String),
}
