//! Sample plugin providing IKE attribute storage backed by any database
//! plugin (`db *`), mirroring strongSwan's real `attr-sql` plugin, which
//! depends on whichever of `sqlite`/`mysql` happens to be loaded.

use ike_plugin_core::{FeatureDescriptor, Plugin, Signature};

#[derive(Default)]
pub struct AttrSqlPlugin;

impl Plugin for AttrSqlPlugin {
    fn name(&self) -> &str {
        "attr-sql"
    }

    fn get_features(&self) -> Option<Vec<FeatureDescriptor>> {
        Some(vec![
            FeatureDescriptor::provide(Signature::Exact {
                category: "attr",
                name: "sql".into(),
            }),
            FeatureDescriptor::depends(Signature::Any { category: "db" }),
        ])
    }
}

#[allow(improper_ctypes_definitions)]
#[no_mangle]
pub extern "C" fn attr_sql_plugin_create() -> *mut dyn Plugin {
    Box::into_raw(Box::new(AttrSqlPlugin))
}
