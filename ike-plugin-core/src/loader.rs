//! Public API of `PluginLoader`: plugin discovery and
//! registration, the load/unload/reload lifecycle, and status/introspection.

use log::{debug, error, warn};

use crate::config::{locate_plugin_file, parse_plugin_list};
use crate::descriptor::{Capability, FeatureDescriptor, FeatureKind};
use crate::entry::{resolve_plugin, PluginEntry, PluginEntryId, PluginHandle, ProvidedFeature};
use crate::error::LoadError;
use crate::plugin::{Plugin, StaticPlugin};
use crate::state::{LoadStats, PluginLoader};

fn release_entry(entry: PluginEntry, retain_handle: bool) {
    let PluginEntry { plugin, handle, .. } = entry;
    drop(plugin);
    if retain_handle {
        if let PluginHandle::Shared(lib) = handle {
            // Leak-detection mode: keep the mapping alive so a leak
            // reporter can still symbolicate addresses inside it.
            std::mem::forget(lib);
        }
    }
}

impl PluginLoader {
    /// Wrap an externally supplied, already-in-image feature array as a
    /// synthetic plugin entry with no shared-object handle, and register
    /// its features.
    pub fn add_static(
        &mut self,
        name: impl Into<String>,
        features: Vec<FeatureDescriptor>,
        critical: bool,
    ) -> PluginEntryId {
        let name = name.into();
        let plugin: Box<dyn Plugin> = Box::new(StaticPlugin::new(name.clone(), features));
        let entry = PluginEntry::new(name, plugin, PluginHandle::HostImage, critical);
        let id = self.push_entry(entry);
        self.register_plugin_features(id);
        id
    }

    /// Iterate `get_features()`, carving out Provided Features and
    /// registering each under its canonical capability.
    fn register_plugin_features(&mut self, entry_id: PluginEntryId) {
        let descriptors: std::sync::Arc<[FeatureDescriptor]> =
            match self.entry(entry_id).plugin.get_features() {
                Some(v) => v.into(),
                None => std::sync::Arc::from(Vec::new().into_boxed_slice()),
            };

        let mut reg_index = None;
        for i in 0..descriptors.len() {
            match descriptors[i].kind {
                FeatureKind::Register | FeatureKind::Callback => {
                    reg_index = Some(i);
                }
                FeatureKind::Provide => {
                    let provided = ProvidedFeature {
                        entry: entry_id,
                        descriptors: descriptors.clone(),
                        provide_index: i,
                        dependency_window: descriptors.len() - i,
                        reg_index,
                        loading: false,
                        loaded: false,
                        failed: false,
                    };
                    let feature_id = self.push_feature(provided);
                    self.registry
                        .register(feature_id, descriptors[i].capability.clone());
                    self.entry_mut(entry_id).features.push(feature_id);
                }
                FeatureKind::Depends | FeatureKind::Sdepend => {}
            }
        }
    }

    /// Parse a whitespace-separated plugin list, instantiate each
    /// not-yet-present plugin, register its features, then run the Load
    /// Engine and purge entries with no loaded feature.
    ///
    /// Returns `Err` the moment a critical plugin fails to instantiate,
    /// aborting before the Load Engine runs at all. Otherwise returns
    /// `Ok(true)` iff no critical plugin and no critical feature failed.
    pub fn load(&mut self, list: &str) -> Result<bool, LoadError> {
        for token in parse_plugin_list(list) {
            if self.has_plugin(&token.name) {
                continue;
            }

            let file = locate_plugin_file(
                &token.name,
                &self.search_paths,
                self.default_path.as_deref(),
            );

            match resolve_plugin(&token.name, file.as_deref(), token.critical, self.integrity.as_ref()) {
                Ok(entry) => {
                    debug!(
                        "instantiated plugin '{}' (critical={})",
                        entry.name, entry.critical
                    );
                    let id = self.push_entry(entry);
                    self.register_plugin_features(id);
                }
                Err(source) => {
                    if token.critical {
                        error!("critical plugin '{}' failed to load: {source}", token.name);
                        return Err(LoadError {
                            name: token.name,
                            source,
                        });
                    }
                    warn!("plugin '{}' failed to load: {source}", token.name);
                }
            }
        }

        self.load_features();
        self.purge_empty_entries();

        let ok = self.stats.critical == 0;
        if ok {
            self.rebuild_loaded_plugins_display();
        }
        Ok(ok)
    }

    fn purge_empty_entries(&mut self) {
        let empty: Vec<PluginEntryId> = self
            .entry_order
            .iter()
            .copied()
            .filter(|&id| {
                !self
                    .entry(id)
                    .features
                    .iter()
                    .any(|&fid| self.feature(fid).loaded)
            })
            .collect();

        for id in empty {
            self.destroy_entry(id);
        }
    }

    fn destroy_entry(&mut self, id: PluginEntryId) {
        let feature_ids = self.entry(id).features.clone();
        for fid in feature_ids {
            self.unregister_feature(fid);
        }
        self.entry_order.retain(|&e| e != id);
        if let Some(entry) = self.entries[id.0 as usize].take() {
            self.entries_by_name.remove(&entry.name);
            release_entry(entry, self.retain_handles_on_unload);
        }
    }

    fn unregister_feature(&mut self, id: crate::entry::ProvidedFeatureId) {
        self.registry.unregister(id, |remaining| {
            self.features[remaining.0 as usize]
                .as_ref()
                .expect("live provided feature")
                .provide()
                .capability
                .clone()
        });
        self.features[id.0 as usize] = None;
    }

    /// Unload every loaded feature in exact reverse order of loading, then
    /// destroy every plugin entry in reverse insertion order, and reset all
    /// state to a fresh-`new()` equivalent.
    pub fn unload(&mut self) {
        let order = std::mem::take(&mut self.loaded_order);
        for id in order {
            let entry_id = self.feature(id).entry;
            let descriptor = self.feature(id).provide().clone();
            let reg = self.feature(id).reg().cloned();

            {
                let entry = self.entries[entry_id.0 as usize]
                    .as_mut()
                    .expect("live entry");
                self.actions
                    .unload(entry.plugin.as_mut(), &descriptor, reg.as_ref());
            }
            debug!("unloaded feature '{}'", descriptor.capability.describe());

            self.entry_mut(entry_id).features.retain(|&f| f != id);
            self.unregister_feature(id);
        }

        let entries: Vec<PluginEntryId> = self.entry_order.drain(..).rev().collect();
        for id in entries {
            if let Some(entry) = self.entries[id.0 as usize].take() {
                self.entries_by_name.remove(&entry.name);
                debug!("destroyed plugin entry '{}'", entry.name);
                release_entry(entry, self.retain_handles_on_unload);
            }
        }

        self.loaded_plugins_display = None;
        self.stats = LoadStats::default();
    }

    /// Invoke the optional `reload` callback on every plugin matching
    /// `list` (or all plugins, if `None`), returning how many acknowledged
    /// it. Never re-orders or re-loads features.
    pub fn reload(&mut self, list: Option<&str>) -> usize {
        let names: Option<Vec<String>> =
            list.map(|l| parse_plugin_list(l).into_iter().map(|t| t.name).collect());

        let mut acknowledged = 0;
        for id in self.entry_order.clone() {
            let wants_reload = match &names {
                Some(names) => names.iter().any(|n| n == &self.entry(id).name),
                None => true,
            };
            if wants_reload && self.entry_mut(id).plugin.reload() {
                acknowledged += 1;
            }
        }
        acknowledged
    }

    /// True iff any loaded feature of any plugin matches `capability`
    /// (`has_feature`).
    pub fn has_feature(&self, capability: &dyn Capability) -> bool {
        self.registry
            .get_match(|r| {
                r.capability.matches(capability)
                    && r.providers.iter().any(|&p| self.feature(p).loaded)
            })
            .is_some()
    }

    /// Yield `(plugin, loaded features)` for every plugin entry, in
    /// insertion order (`create_plugin_enumerator`).
    pub fn create_plugin_enumerator(
        &self,
    ) -> impl Iterator<Item = (&dyn Plugin, Vec<&FeatureDescriptor>)> {
        self.entry_order.iter().map(move |&id| {
            let entry = self.entry(id);
            let loaded = entry
                .features
                .iter()
                .filter(|&&fid| self.feature(fid).loaded)
                .map(|&fid| self.feature(fid).provide())
                .collect();
            (entry.plugin.as_ref(), loaded)
        })
    }

    fn rebuild_loaded_plugins_display(&mut self) {
        let display = self
            .entry_order
            .iter()
            .map(|&id| self.entry(id).name.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.loaded_plugins_display = Some(display);
    }

    /// Emit the loaded-plugins display string at `level`, and, if any
    /// feature failed, the failed/unmet-dependency counts (`status`).
    pub fn status(&self, level: log::Level) {
        log::log!(
            level,
            "loaded plugins: {}",
            self.loaded_plugins().unwrap_or("(none)")
        );
        if self.stats.failed > 0 {
            log::log!(
                level,
                "{} features failed to load ({} due to unmet dependencies)",
                self.stats.failed,
                self.stats.depends
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::AlwaysSucceed;
    use crate::descriptor::{FeatureDescriptor, Signature};
    use crate::state::PluginLoader;

    fn sig(name: &str) -> Signature {
        Signature::Exact {
            category: "test",
            name: name.to_string(),
        }
    }

    #[test]
    fn load_purges_entries_with_no_loaded_feature() {
        let mut loader = PluginLoader::new(Box::new(AlwaysSucceed));
        loader.add_static(
            "a",
            vec![
                FeatureDescriptor::provide(sig("x")),
                FeatureDescriptor::depends(sig("missing")),
            ],
            false,
        );

        loader.load_features();
        assert!(loader.has_plugin("a"));
        loader.purge_empty_entries();
        assert!(!loader.has_plugin("a"));
    }

    #[test]
    fn unload_after_load_restores_fresh_state() {
        let mut loader = PluginLoader::new(Box::new(AlwaysSucceed));
        loader.add_static("a", vec![FeatureDescriptor::provide(sig("x"))], false);
        loader.load_features();
        assert_eq!(loader.loaded_order.len(), 1);

        loader.unload();

        assert!(loader.loaded_order.is_empty());
        assert!(!loader.has_plugin("a"));
        assert_eq!(loader.stats(), Default::default());
        assert!(loader.loaded_plugins().is_none());
    }

    #[test]
    fn critical_failure_short_circuits_without_destroying_load_engine_state() {
        let mut loader = PluginLoader::new(Box::new(AlwaysSucceed));
        loader.add_static("a", vec![FeatureDescriptor::provide(sig("x"))], false);
        let result = loader.load("nonexistent-plugin!");
        assert!(result.is_err());
    }

    #[test]
    fn reload_counts_acknowledging_plugins() {
        struct Reloadable(bool);
        impl crate::plugin::Plugin for Reloadable {
            fn name(&self) -> &str {
                "reloadable"
            }
            fn reload(&mut self) -> bool {
                self.0
            }
        }

        let mut loader = PluginLoader::new(Box::new(AlwaysSucceed));
        loader.push_entry(crate::entry::PluginEntry::new(
            "reloadable".into(),
            Box::new(Reloadable(true)),
            crate::entry::PluginHandle::HostImage,
            false,
        ));

        assert_eq!(loader.reload(None), 1);
    }
}
