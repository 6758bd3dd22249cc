//! Plugin loader for the IKE daemon's dynamically loaded feature modules:
//! discovery, a feature registry with exact/fuzzy lookup, cycle-guarded
//! dependency resolution, and critical-vs-non-critical failure policy.
//!
//! The loader is deliberately oblivious to what a "feature" means — all
//! comparison and hashing of capability signatures is injected through the
//! [`Capability`] trait, and the actual load/unload work for a feature is
//! injected through [`FeatureActions`]. This crate owns only the graph:
//! which plugin provides which feature, which features depend on which,
//! and in what order they must be brought up and torn down.

mod engine;
mod loader;

pub mod actions;
pub mod config;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod integrity;
pub mod plugin;
pub mod registry;
pub mod state;

pub use actions::{AlwaysSucceed, FeatureActions, FnFeatureActions};
pub use config::{
    default_plugin_filename, locate_plugin_file, normalize_name, parse_plugin_list,
    plugin_directory_search_paths, PluginToken,
};
pub use descriptor::{Capability, FeatureDescriptor, FeatureKind, Signature};
pub use entry::{resolve_plugin, PluginEntry, PluginEntryId, PluginHandle, ProvidedFeature, ProvidedFeatureId};
pub use error::{ConfigError, IntegrityStage, LoadError, ResolveError};
pub use integrity::{IntegrityChecker, NullIntegrityChecker};
#[cfg(unix)]
pub use integrity::PermissionsIntegrityChecker;
pub use plugin::{Plugin, StaticPlugin};
pub use registry::{FeatureRegistry, RegisteredFeature, RegisteredFeatureId};
pub use state::{LoadStats, PluginLoader};
