//! Sample plugin providing a `db sqlite` backend. Paired with
//! `plugin-attr-sql`, which depends on `db *`, to demonstrate fuzzy
//! wildcard dependency matching the way strongSwan's real
//! `sqlite`/`attr-sql` plugins relate to each other.

use ike_plugin_core::{FeatureDescriptor, Plugin, Signature};

#[derive(Default)]
pub struct SqlitePlugin;

impl Plugin for SqlitePlugin {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn get_features(&self) -> Option<Vec<FeatureDescriptor>> {
        Some(vec![FeatureDescriptor::provide(Signature::Exact {
            category: "db",
            name: "sqlite".into(),
        })])
    }
}

#[allow(improper_ctypes_definitions)]
#[no_mangle]
pub extern "C" fn sqlite_plugin_create() -> *mut dyn Plugin {
    Box::into_raw(Box::new(SqlitePlugin))
}
