//! Sample plugin providing an AES-128-CBC crypter, depending on any RNG
//! backend: a feature with a hard dependency on another plugin's feature.

use ike_plugin_core::{FeatureDescriptor, Plugin, Signature};

#[derive(Default)]
pub struct AesPlugin;

impl Plugin for AesPlugin {
    fn name(&self) -> &str {
        "aes"
    }

    fn get_features(&self) -> Option<Vec<FeatureDescriptor>> {
        Some(vec![
            FeatureDescriptor::provide(Signature::Exact {
                category: "crypter",
                name: "aes128-cbc".into(),
            }),
            FeatureDescriptor::depends(Signature::Any { category: "rng" }),
        ])
    }
}

#[allow(improper_ctypes_definitions)]
#[no_mangle]
pub extern "C" fn aes_plugin_create() -> *mut dyn Plugin {
    Box::into_raw(Box::new(AesPlugin))
}
