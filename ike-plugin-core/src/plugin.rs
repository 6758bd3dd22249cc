//! The plugin object contract: `name`, optional `get_features`, optional
//! `reload`. Every loaded plugin — whether resolved from the host image, a
//! shared object, or wrapped statically via `add_static` — is a `Box<dyn
//! Plugin>`.

use crate::descriptor::FeatureDescriptor;

pub trait Plugin: Send {
    fn name(&self) -> &str;

    /// The features this plugin offers. `None` means "no features", distinct
    /// from `Some(vec![])` only in that a plugin without this method at all
    /// (in the C original) is indistinguishable from one that returns an
    /// empty array; both are treated identically here.
    fn get_features(&self) -> Option<Vec<FeatureDescriptor>> {
        None
    }

    /// Acknowledge a reload request. Returns whether the plugin applied it.
    /// Reloading never re-orders or re-loads features.
    fn reload(&mut self) -> bool {
        false
    }
}

/// Wraps an externally supplied, already-in-image feature array as a plugin
/// object, for `PluginLoader::add_static`.
pub struct StaticPlugin {
    name: String,
    features: Vec<FeatureDescriptor>,
}

impl StaticPlugin {
    pub fn new(name: impl Into<String>, features: Vec<FeatureDescriptor>) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }
}

impl Plugin for StaticPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_features(&self) -> Option<Vec<FeatureDescriptor>> {
        Some(self.features.clone())
    }
}
