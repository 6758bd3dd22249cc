//! Sample plugin providing a single RNG backend, with no dependencies of
//! its own. Demonstrates the leaf of a dependency chain.

use ike_plugin_core::{FeatureDescriptor, Plugin, Signature};

#[derive(Default)]
pub struct RandomPlugin;

impl Plugin for RandomPlugin {
    fn name(&self) -> &str {
        "random"
    }

    fn get_features(&self) -> Option<Vec<FeatureDescriptor>> {
        Some(vec![FeatureDescriptor::provide(Signature::Exact {
            category: "rng",
            name: "ctr-drbg".into(),
        })])
    }
}

/// Exported constructor, resolved by name as `random_plugin_create`.
/// Same-compiler ABI only, matching `ike_plugin_core::entry::PluginCreateFn`.
#[allow(improper_ctypes_definitions)]
#[no_mangle]
pub extern "C" fn random_plugin_create() -> *mut dyn Plugin {
    Box::into_raw(Box::new(RandomPlugin))
}
