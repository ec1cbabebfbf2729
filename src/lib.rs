//! uppm — a decentralized package manager for script-driven target
//! applications.
//!
//! A package is a script file plus an embedded metadata header; repositories
//! are either local directories or remote Git working trees laid out by
//! `<author>/<name>/<version>.<engine-extension>`. Installation is performed
//! by executing a named action inside a script engine with a host object
//! exposing filesystem and version-control helpers.
//!
//! The core of this crate is the package-graph resolver: turning a partially
//! specified user reference into a concrete, conflict-free, transitively
//! closed installation plan across multiple repository backends and
//! multiple script engines.
//!
//! # Modules
//!
//! - [`version`] — scope-aware version parsing and comparison
//! - [`reference`] — partial/complete package references and their grammar
//! - [`metadata`] — header-comment metadata extraction
//! - [`engine`] — script engine registry (`#load` resolution, action dispatch)
//! - [`repository`] — filesystem/Git repository backends and registry
//! - [`target_app`] — target-app registry and installed-package enumeration
//! - [`package`] — the package loader
//! - [`resolver`] — the dependency-graph resolver (the core algorithm)
//! - [`action`] — the action runner
//! - [`config`] — on-disk user configuration (ambient, not part of the core)
//! - [`error`] — error types and result handling

pub mod action;
pub mod config;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod package;
pub mod reference;
pub mod repository;
pub mod resolver;
pub mod target_app;
pub mod version;

pub use config::Config;
pub use error::{Error, Result};
pub use reference::{CompleteReference, PartialReference};
pub use version::{InferencePolicy, Version, VersionRequirement};
