//! Demo host for `ike-plugin-core`. Registers a handful of compiled-in
//! sample plugins in deliberately mixed order (to show the Load Engine
//! resolves dependencies regardless of registration order), then
//! optionally also resolves further plugins from a shared-object
//! directory given on the command line.
//!
//! Usage: `ike-plugin-host [plugin-dir] ["plugin list!"]`

use ike_plugin_core::{FeatureDescriptor, Plugin, PluginLoader, Signature};
use log::{error, info};

/// Stands in for the per-capability register/unregister hooks each real
/// feature descriptor would carry in the original C plugin system; this
/// demo just logs what would have happened.
struct DemoActions;

impl ike_plugin_core::FeatureActions for DemoActions {
    fn load(
        &self,
        plugin: &mut dyn Plugin,
        feature: &FeatureDescriptor,
        _reg: Option<&FeatureDescriptor>,
    ) -> bool {
        info!(
            "{}: registering '{}'",
            plugin.name(),
            feature.capability.describe()
        );
        true
    }

    fn unload(
        &self,
        plugin: &mut dyn Plugin,
        feature: &FeatureDescriptor,
        _reg: Option<&FeatureDescriptor>,
    ) -> bool {
        info!(
            "{}: unregistering '{}'",
            plugin.name(),
            feature.capability.describe()
        );
        true
    }
}

fn main() {
    env_logger::init();

    let mut loader = PluginLoader::new(Box::new(DemoActions));

    loader.add_static(
        "attr-sql",
        plugin_attr_sql::AttrSqlPlugin.get_features().unwrap(),
        false,
    );
    loader.add_static("aes", plugin_aes::AesPlugin.get_features().unwrap(), true);
    loader.add_static(
        "sqlite",
        plugin_sqlite::SqlitePlugin.get_features().unwrap(),
        false,
    );
    loader.add_static(
        "random",
        plugin_random::RandomPlugin.get_features().unwrap(),
        false,
    );

    let mut args = std::env::args().skip(1);
    if let Some(dir) = args.next() {
        if let Err(err) = loader.add_path(dir) {
            error!("ignoring plugin search path: {err}");
        }
    }
    let dynamic_list = args.next().unwrap_or_default();

    // An empty list still triggers the Load Engine over everything
    // registered so far via `add_static` above.
    match loader.load(&dynamic_list) {
        Ok(true) => info!("all critical plugins and features loaded"),
        Ok(false) => info!("load completed, but a non-critical feature failed"),
        Err(err) => {
            error!("critical plugin failed to load: {err}");
            std::process::exit(1);
        }
    }

    loader.status(log::Level::Info);
    info!(
        "db backend available: {}",
        loader.has_feature(&Signature::Any { category: "db" })
    );

    loader.unload();
}
