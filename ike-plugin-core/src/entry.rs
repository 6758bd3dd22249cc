//! Plugin entries, provided features, and the symbol resolver wrapper
//! that turns a name and optional file into a `PluginEntry`.

use std::ffi::CString;
use std::path::Path;
use std::sync::Arc;

use libloading::Library;
use log::{debug, warn};

use crate::descriptor::FeatureDescriptor;
use crate::error::{IntegrityStage, ResolveError};
use crate::integrity::IntegrityChecker;
use crate::plugin::Plugin;

/// Arena index for a `PluginEntry` stored in `LoaderState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginEntryId(pub(crate) u32);

/// Arena index for a `ProvidedFeature` stored in `LoaderState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProvidedFeatureId(pub(crate) u32);

/// Where a plugin's code lives, and what must be released at teardown.
pub enum PluginHandle {
    /// Resolved from the host image; nothing to release.
    HostImage,
    /// Resolved from a shared object; dropping the `Library` unloads it
    /// unless leak-detection retention is in effect.
    Shared(Library),
}

impl std::fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginHandle::HostImage => write!(f, "HostImage"),
            PluginHandle::Shared(_) => write!(f, "Shared(..)"),
        }
    }
}

/// One loaded plugin.
pub struct PluginEntry {
    pub name: String,
    pub plugin: Box<dyn Plugin>,
    pub handle: PluginHandle,
    pub critical: bool,
    /// Providers belonging to this entry, in registration order.
    pub features: Vec<ProvidedFeatureId>,
}

impl PluginEntry {
    pub fn new(name: String, plugin: Box<dyn Plugin>, handle: PluginHandle, critical: bool) -> Self {
        Self {
            name,
            plugin,
            handle,
            critical,
            features: Vec::new(),
        }
    }
}

/// One capability offered by one plugin. The backing descriptor array
/// is shared (via `Arc`) between the owning `PluginEntry`'s registration
/// call and every `ProvidedFeature` carved out of it, so providers can be
/// freely reordered/removed in the arena without re-borrowing the entry.
pub struct ProvidedFeature {
    pub entry: PluginEntryId,
    pub descriptors: Arc<[FeatureDescriptor]>,
    pub provide_index: usize,
    /// `descriptors.len() - provide_index`, kept for parity with the base
    /// spec's `dependencies` field; the dependency scan stops at the first
    /// non-DEPENDS/SDEPEND kind regardless.
    pub dependency_window: usize,
    pub reg_index: Option<usize>,
    pub loading: bool,
    pub loaded: bool,
    pub failed: bool,
}

impl ProvidedFeature {
    pub fn provide(&self) -> &FeatureDescriptor {
        &self.descriptors[self.provide_index]
    }

    pub fn reg(&self) -> Option<&FeatureDescriptor> {
        self.reg_index.map(|i| &self.descriptors[i])
    }

    /// Dependency descriptors following the PROVIDE, stopping at the first
    /// descriptor whose kind is not DEPENDS/SDEPEND.
    pub fn dependencies(&self) -> impl Iterator<Item = &FeatureDescriptor> {
        let start = self.provide_index + 1;
        let end = (self.provide_index + self.dependency_window).min(self.descriptors.len());
        self.descriptors[start..end]
            .iter()
            .take_while(|d| d.kind.is_dependency())
    }

    pub fn loadable(&self) -> bool {
        !self.loading && !self.loaded && !self.failed
    }
}

type PluginCreateFn = unsafe extern "C" fn() -> *mut dyn Plugin;

fn nul_terminated(symbol: &str) -> CString {
    CString::new(symbol).expect("plugin symbol name must not contain interior NUL bytes")
}

fn instantiate(
    ctor: libloading::Symbol<PluginCreateFn>,
    handle: PluginHandle,
    name: &str,
    critical: bool,
) -> Result<PluginEntry, ResolveError> {
    let raw = unsafe { ctor() };
    if raw.is_null() {
        return Err(ResolveError::ConstructorFailed {
            name: name.to_string(),
        });
    }
    // Safety: the constructor contract guarantees a non-null return
    // is a heap-allocated plugin object this call uniquely owns.
    let plugin = unsafe { Box::from_raw(raw) };
    debug!("instantiated plugin '{name}'");
    Ok(PluginEntry::new(name.to_string(), plugin, handle, critical))
}

/// The symbol resolver wrapper: given a plugin name and an optional
/// shared-object path, obtain a constructor symbol from the host image or
/// the file, and invoke it.
pub fn resolve_plugin(
    name: &str,
    file: Option<&Path>,
    critical: bool,
    integrity: &dyn IntegrityChecker,
) -> Result<PluginEntry, ResolveError> {
    let symbol_name = format!("{}_plugin_create", crate::config::normalize_name(name));
    let symbol_cstr = nul_terminated(&symbol_name);

    if let Ok(host_lib) = unsafe { Library::this() } {
        if let Ok(ctor) = unsafe {
            host_lib.get::<PluginCreateFn>(symbol_cstr.as_bytes_with_nul())
        } {
            if !integrity.enabled() || file.is_none() {
                return instantiate(ctor, PluginHandle::HostImage, name, critical);
            }
        }
    }

    let Some(file) = file else {
        return Err(ResolveError::NotFound {
            name: name.to_string(),
        });
    };

    if integrity.enabled() && !integrity.check_file(name, file) {
        return Err(ResolveError::IntegrityFailed {
            name: name.to_string(),
            stage: IntegrityStage::File,
        });
    }

    let lib = unsafe { Library::new(file) }?;
    let ctor = unsafe { lib.get::<PluginCreateFn>(symbol_cstr.as_bytes_with_nul()) }.map_err(|_| {
        ResolveError::NotFound {
            name: name.to_string(),
        }
    })?;

    if integrity.enabled() {
        let addr = *ctor as usize;
        if !integrity.check_segment(name, addr) {
            warn!("segment integrity check failed for plugin '{name}'");
            return Err(ResolveError::IntegrityFailed {
                name: name.to_string(),
                stage: IntegrityStage::Segment,
            });
        }
    }

    instantiate(ctor, PluginHandle::Shared(lib), name, critical)
}
