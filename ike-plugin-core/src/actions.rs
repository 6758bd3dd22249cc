//! The external "register/unregister procedure" each feature carries.
//! The loader calls through this trait; it never
//! knows what loading a feature actually does.

use crate::descriptor::FeatureDescriptor;
use crate::plugin::Plugin;

pub trait FeatureActions: Send + Sync {
    /// Attempt to load `feature` (the PROVIDE descriptor) on `plugin`, given
    /// the preceding REGISTER/CALLBACK context `reg`, if any. Returns
    /// whether the load succeeded.
    fn load(
        &self,
        plugin: &mut dyn Plugin,
        feature: &FeatureDescriptor,
        reg: Option<&FeatureDescriptor>,
    ) -> bool;

    /// Undo a previously successful `load`.
    fn unload(
        &self,
        plugin: &mut dyn Plugin,
        feature: &FeatureDescriptor,
        reg: Option<&FeatureDescriptor>,
    ) -> bool;
}

/// Adapts two closures into a `FeatureActions` implementation, for tests and
/// small embedders that don't want a dedicated type.
pub struct FnFeatureActions<L, U> {
    load: L,
    unload: U,
}

impl<L, U> FnFeatureActions<L, U>
where
    L: Fn(&mut dyn Plugin, &FeatureDescriptor, Option<&FeatureDescriptor>) -> bool + Send + Sync,
    U: Fn(&mut dyn Plugin, &FeatureDescriptor, Option<&FeatureDescriptor>) -> bool + Send + Sync,
{
    pub fn new(load: L, unload: U) -> Self {
        Self { load, unload }
    }
}

impl<L, U> FeatureActions for FnFeatureActions<L, U>
where
    L: Fn(&mut dyn Plugin, &FeatureDescriptor, Option<&FeatureDescriptor>) -> bool + Send + Sync,
    U: Fn(&mut dyn Plugin, &FeatureDescriptor, Option<&FeatureDescriptor>) -> bool + Send + Sync,
{
    fn load(
        &self,
        plugin: &mut dyn Plugin,
        feature: &FeatureDescriptor,
        reg: Option<&FeatureDescriptor>,
    ) -> bool {
        (self.load)(plugin, feature, reg)
    }

    fn unload(
        &self,
        plugin: &mut dyn Plugin,
        feature: &FeatureDescriptor,
        reg: Option<&FeatureDescriptor>,
    ) -> bool {
        (self.unload)(plugin, feature, reg)
    }
}

/// Treats every load and unload as successful. Useful for demos and for
/// tests that only care about ordering, not load outcomes.
pub struct AlwaysSucceed;

impl FeatureActions for AlwaysSucceed {
    fn load(&self, _: &mut dyn Plugin, _: &FeatureDescriptor, _: Option<&FeatureDescriptor>) -> bool {
        true
    }

    fn unload(&self, _: &mut dyn Plugin, _: &FeatureDescriptor, _: Option<&FeatureDescriptor>) -> bool {
        true
    }
}
