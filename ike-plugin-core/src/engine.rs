//! The Load Engine: a recursive, cycle-guarded resolver that, for
//! each provided feature, attempts to satisfy its dependencies by
//! recursively loading other matching provided features, then invokes the
//! feature's register callback.

use log::{debug, trace, warn};

use crate::descriptor::FeatureKind;
use crate::entry::ProvidedFeatureId;
use crate::registry::RegisteredFeatureId;
use crate::state::PluginLoader;

impl PluginLoader {
    /// Entry point: iterate the Plugin Entry Table in insertion order, and
    /// within each entry its Provided Features in registration order.
    pub(crate) fn load_features(&mut self) {
        for entry_id in self.entry_order.clone() {
            let feature_ids = self
                .entries[entry_id.0 as usize]
                .as_ref()
                .expect("live entry")
                .features
                .clone();
            for feature_id in feature_ids {
                self.load_provided(feature_id, 0);
            }
        }
    }

    fn load_provided(&mut self, id: ProvidedFeatureId, level: usize) {
        let f = self.feature(id);
        if f.loaded || f.failed {
            return;
        }
        if f.loading {
            trace!(
                "cycle detected while loading '{}' (level {level})",
                f.provide().capability.describe()
            );
            return;
        }

        self.feature_mut(id).loading = true;
        self.load_feature(id, level + 1);
        self.feature_mut(id).loading = false;
    }

    fn load_feature(&mut self, id: ProvidedFeatureId, level: usize) {
        let critical = self.entry(self.feature(id).entry).critical;

        if !self.load_dependencies(id, level) {
            self.feature_mut(id).failed = true;
            self.stats.failed += 1;
            self.stats.depends += 1;
            if critical {
                self.stats.critical += 1;
            }
            return;
        }

        let entry_id = self.feature(id).entry;
        let descriptor = self.feature(id).provide().clone();
        let reg = self.feature(id).reg().cloned();
        let description = descriptor.capability.describe();

        let success = {
            let entry = self.entries[entry_id.0 as usize]
                .as_mut()
                .expect("live entry");
            self.actions
                .load(entry.plugin.as_mut(), &descriptor, reg.as_ref())
        };

        if success {
            debug!("loaded feature '{description}' (level {level})");
            self.feature_mut(id).loaded = true;
            self.loaded_order.insert(0, id);
        } else {
            warn!("feature '{description}' register callback returned false (level {level})");
            self.feature_mut(id).failed = true;
            self.stats.failed += 1;
            if critical {
                self.stats.critical += 1;
            }
        }
    }

    /// For each dependency descriptor following the PROVIDE, repeatedly
    /// loads every registered record with a loadable provider equal (then,
    /// failing that, matching) the dependency, until none remain, then
    /// checks whether a loaded provider now satisfies it.
    fn load_dependencies(&mut self, id: ProvidedFeatureId, level: usize) -> bool {
        let dependencies: Vec<_> = self
            .feature(id)
            .dependencies()
            .map(|d| (d.kind, d.capability.clone()))
            .collect();

        for (kind, capability) in dependencies {
            loop {
                let exact = self.registry.get_match(|r| {
                    r.capability.equals(capability.as_ref())
                        && r.providers.iter().any(|&p| self.feature(p).loadable())
                });
                let next = exact.or_else(|| {
                    self.registry.get_match(|r| {
                        r.capability.matches(capability.as_ref())
                            && r.providers.iter().any(|&p| self.feature(p).loadable())
                    })
                });
                let Some(record_id) = next else { break };
                self.load_registered(record_id, level);
            }

            let satisfied = self
                .registry
                .get_match(|r| {
                    r.capability.matches(capability.as_ref())
                        && r.providers.iter().any(|&p| self.feature(p).loaded)
                })
                .is_some();

            if satisfied {
                continue;
            }

            if kind == FeatureKind::Sdepend {
                trace!(
                    "soft dependency '{}' unmet (level {level})",
                    capability.describe()
                );
                continue;
            }

            warn!(
                "hard dependency '{}' unmet (level {level})",
                capability.describe()
            );
            return false;
        }

        true
    }

    fn load_registered(&mut self, record_id: RegisteredFeatureId, level: usize) {
        let providers = self.registry.get(record_id).providers.clone();
        for provider in providers {
            self.load_provided(provider, level);
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
    fn linear_chain_loads_in_dependency_order() {
        let mut loader = PluginLoader::new(Box::new(AlwaysSucceed));
        loader.add_static(
            "a",
            vec![
                FeatureDescriptor::provide(sig("x")),
                FeatureDescriptor::depends(sig("y")),
            ],
            false,
        );
        loader.add_static("b", vec![FeatureDescriptor::provide(sig("y"))], false);

        loader.load_features();

        assert_eq!(loader.stats().failed, 0);
        let names: Vec<String> = loader
            .loaded_order
            .iter()
            .map(|&id| loader.feature(id).provide().capability.describe())
            .collect();
        assert_eq!(names, vec!["test:x", "test:y"]);
    }

    #[test]
    fn reverse_plugin_order_still_resolves() {
        let mut loader = PluginLoader::new(Box::new(AlwaysSucceed));
        loader.add_static("b", vec![FeatureDescriptor::provide(sig("y"))], false);
        loader.add_static(
            "a",
            vec![
                FeatureDescriptor::provide(sig("x")),
                FeatureDescriptor::depends(sig("y")),
            ],
            false,
        );

        loader.load_features();

        assert_eq!(loader.stats().failed, 0);
        assert_eq!(loader.loaded_order.len(), 2);
    }

    #[test]
    fn soft_dependency_does_not_block_load() {
        let mut loader = PluginLoader::new(Box::new(AlwaysSucceed));
        loader.add_static(
            "a",
            vec![
                FeatureDescriptor::provide(sig("x")),
                FeatureDescriptor::soft_depends(sig("y")),
            ],
            false,
        );

        loader.load_features();

        assert_eq!(loader.stats().failed, 0);
        assert_eq!(loader.loaded_order.len(), 1);
    }

    #[test]
    fn hard_dependency_missing_marks_failed() {
        let mut loader = PluginLoader::new(Box::new(AlwaysSucceed));
        loader.add_static(
            "a",
            vec![
                FeatureDescriptor::provide(sig("x")),
                FeatureDescriptor::depends(sig("y")),
            ],
            false,
        );

        loader.load_features();

        assert_eq!(loader.stats().failed, 1);
        assert_eq!(loader.stats().depends, 1);
        assert!(loader.loaded_order.is_empty());
    }

    #[test]
    fn cycle_terminates_and_marks_both_failed() {
        let mut loader = PluginLoader::new(Box::new(AlwaysSucceed));
        loader.add_static(
            "a",
            vec![
                FeatureDescriptor::provide(sig("x")),
                FeatureDescriptor::depends(sig("y")),
            ],
            false,
        );
        loader.add_static(
            "b",
            vec![
                FeatureDescriptor::provide(sig("y")),
                FeatureDescriptor::depends(sig("x")),
            ],
            false,
        );

        loader.load_features();

        assert_eq!(loader.stats().failed, 2);
        assert_eq!(loader.stats().depends, 2);
        assert_eq!(loader.stats().critical, 0);
    }

    #[test]
    fn cycle_with_fan_out_is_idempotent() {
        // A depends on both y and y (via two equal-capability providers of
        // y that each also depend back on x), exercising load_registered's
        // "attempt every loadable provider" loop against the cycle guard.
        let mut loader = PluginLoader::new(Box::new(AlwaysSucceed));
        loader.add_static(
            "a",
            vec![
                FeatureDescriptor::provide(sig("x")),
                FeatureDescriptor::depends(sig("y")),
            ],
            false,
        );
        loader.add_static(
            "b1",
            vec![
                FeatureDescriptor::provide(sig("y")),
                FeatureDescriptor::depends(sig("x")),
            ],
            false,
        );
        loader.add_static(
            "b2",
            vec![
                FeatureDescriptor::provide(sig("y")),
                FeatureDescriptor::depends(sig("x")),
            ],
            false,
        );

        // Must terminate; re-entering an already-loading/failed provider is
        // a no-op past the first visit.
        loader.load_features();

        assert_eq!(loader.stats().depends, 3);
    }

    #[test]
    fn fuzzy_match_resolves_wildcard_dependency() {
        let mut loader = PluginLoader::new(Box::new(AlwaysSucceed));
        loader.add_static(
            "a",
            vec![
                FeatureDescriptor::provide(sig("x")),
                FeatureDescriptor::depends(Signature::Any { category: "db" }),
            ],
            false,
        );
        loader.add_static(
            "b",
            vec![FeatureDescriptor::provide(Signature::Exact {
                category: "db",
                name: "sqlite".into(),
            })],
            false,
        );

        loader.load_features();

        assert_eq!(loader.stats().failed, 0);
        assert!(loader.has_feature(&Signature::Exact {
            category: "db",
            name: "sqlite".into(),
        }));
        assert!(!loader.has_feature(&Signature::Exact {
            category: "db",
            name: "postgres".into(),
        }));
    }

    #[test]
    fn critical_feature_failure_is_counted() {
        struct AlwaysFail;
        impl crate::actions::FeatureActions for AlwaysFail {
            fn load(
                &self,
                _: &mut dyn crate::plugin::Plugin,
                _: &FeatureDescriptor,
                _: Option<&FeatureDescriptor>,
            ) -> bool {
                false
            }
            fn unload(
                &self,
                _: &mut dyn crate::plugin::Plugin,
                _: &FeatureDescriptor,
                _: Option<&FeatureDescriptor>,
            ) -> bool {
                true
            }
        }

        let mut loader = PluginLoader::new(Box::new(AlwaysFail));
        loader.add_static("a", vec![FeatureDescriptor::provide(sig("x"))], true);

        loader.load_features();

        assert_eq!(loader.stats().critical, 1);
    }
}
