//! `PluginLoader`: the loader instance that owns the Plugin Entry Table,
//! Feature Registry, Loaded-Order Stack, and statistics.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::actions::FeatureActions;
use crate::entry::{PluginEntry, PluginEntryId, ProvidedFeature, ProvidedFeatureId};
use crate::error::ConfigError;
use crate::integrity::{IntegrityChecker, NullIntegrityChecker};
use crate::registry::FeatureRegistry;

/// Aggregate failure counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Total provided features that ended up `failed`.
    pub failed: u32,
    /// Of those, how many failed specifically because of an unmet hard
    /// dependency (a subset of `failed`).
    pub depends: u32,
    /// Of those, how many belonged to a critical plugin.
    pub critical: u32,
}

pub struct PluginLoader {
    pub(crate) entries: Vec<Option<PluginEntry>>,
    /// Insertion order of still-live entries; drives load-engine iteration
    /// and reverse-order teardown.
    pub(crate) entry_order: Vec<PluginEntryId>,
    pub(crate) entries_by_name: HashMap<String, PluginEntryId>,

    pub(crate) features: Vec<Option<ProvidedFeature>>,
    pub(crate) registry: FeatureRegistry,

    /// Provided features in reverse load order; front-to-back is a valid
    /// unload sequence.
    pub(crate) loaded_order: Vec<ProvidedFeatureId>,

    pub(crate) search_paths: Vec<PathBuf>,
    pub(crate) default_path: Option<PathBuf>,

    pub(crate) loaded_plugins_display: Option<String>,
    pub(crate) stats: LoadStats,

    pub(crate) integrity: Box<dyn IntegrityChecker>,
    pub(crate) actions: Box<dyn FeatureActions>,

    /// Leak-detection mode: retain shared-object handles at teardown
    /// instead of releasing them, for accurate symbolication of leaks.
    pub(crate) retain_handles_on_unload: bool,
}

impl PluginLoader {
    pub fn new(actions: Box<dyn FeatureActions>) -> Self {
        Self {
            entries: Vec::new(),
            entry_order: Vec::new(),
            entries_by_name: HashMap::new(),
            features: Vec::new(),
            registry: FeatureRegistry::new(),
            loaded_order: Vec::new(),
            search_paths: Vec::new(),
            default_path: None,
            loaded_plugins_display: None,
            stats: LoadStats::default(),
            integrity: Box::new(NullIntegrityChecker),
            actions,
            retain_handles_on_unload: false,
        }
    }

    pub fn with_integrity_checker(mut self, checker: Box<dyn IntegrityChecker>) -> Self {
        self.integrity = checker;
        self
    }

    pub fn with_default_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_path = Some(path.into());
        self
    }

    pub fn set_retain_handles_on_unload(&mut self, retain: bool) {
        self.retain_handles_on_unload = retain;
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    pub fn loaded_plugins(&self) -> Option<&str> {
        self.loaded_plugins_display.as_deref()
    }

    /// Append a directory to the search path list. Fails if the directory
    /// does not exist, since a silently-ignored typo here just means every
    /// plugin lookup quietly falls through to the default path instead.
    pub fn add_path(&mut self, path: impl Into<PathBuf>) -> Result<(), ConfigError> {
        let path = path.into();
        if !path.exists() {
            return Err(ConfigError::MissingPath(path));
        }
        self.search_paths.push(path);
        Ok(())
    }

    pub(crate) fn entry(&self, id: PluginEntryId) -> &PluginEntry {
        self.entries[id.0 as usize]
            .as_ref()
            .expect("plugin entry id must be live")
    }

    pub(crate) fn entry_mut(&mut self, id: PluginEntryId) -> &mut PluginEntry {
        self.entries[id.0 as usize]
            .as_mut()
            .expect("plugin entry id must be live")
    }

    pub(crate) fn feature(&self, id: ProvidedFeatureId) -> &ProvidedFeature {
        self.features[id.0 as usize]
            .as_ref()
            .expect("provided feature id must be live")
    }

    pub(crate) fn feature_mut(&mut self, id: ProvidedFeatureId) -> &mut ProvidedFeature {
        self.features[id.0 as usize]
            .as_mut()
            .expect("provided feature id must be live")
    }

    pub(crate) fn push_entry(&mut self, entry: PluginEntry) -> PluginEntryId {
        let id = PluginEntryId(self.entries.len() as u32);
        self.entries_by_name.insert(entry.name.clone(), id);
        self.entries.push(Some(entry));
        self.entry_order.push(id);
        id
    }

    pub(crate) fn push_feature(&mut self, feature: ProvidedFeature) -> ProvidedFeatureId {
        let id = ProvidedFeatureId(self.features.len() as u32);
        self.features.push(Some(feature));
        id
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.entries_by_name.contains_key(name)
    }
}
