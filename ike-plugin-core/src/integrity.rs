//! Optional integrity verification consulted before loading a shared object
//! Absent when not configured.

use std::path::Path;

pub trait IntegrityChecker: Send + Sync {
    /// Whether this checker should be consulted at all. `NullIntegrityChecker`
    /// returns `false` so the resolver skips straight past the integrity
    /// gates in the symbol resolver.
    fn enabled(&self) -> bool {
        true
    }

    /// Verify the file at `path` before it is opened.
    fn check_file(&self, name: &str, path: &Path) -> bool;

    /// Verify the resolved constructor symbol's segment after opening.
    fn check_segment(&self, name: &str, symbol_addr: usize) -> bool;
}

/// The default: integrity checking is not configured.
#[derive(Default)]
pub struct NullIntegrityChecker;

impl IntegrityChecker for NullIntegrityChecker {
    fn enabled(&self) -> bool {
        false
    }

    fn check_file(&self, _name: &str, _path: &Path) -> bool {
        true
    }

    fn check_segment(&self, _name: &str, _symbol_addr: usize) -> bool {
        true
    }
}

/// A minimal real checker: refuses to load a plugin file that is
/// world-writable. Does not attempt to verify the resolved symbol's
/// segment (`check_segment` always passes) since doing that properly
/// needs a signature scheme this crate does not define.
#[cfg(unix)]
#[derive(Default)]
pub struct PermissionsIntegrityChecker;

#[cfg(unix)]
impl IntegrityChecker for PermissionsIntegrityChecker {
    fn check_file(&self, name: &str, path: &Path) -> bool {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
            log::warn!("integrity check: plugin '{name}' path is not representable as a C string");
            return false;
        };

        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::stat(c_path.as_ptr(), &mut stat) } != 0 {
            log::warn!("integrity check: could not stat plugin '{name}' at {path:?}");
            return false;
        }

        let world_writable = stat.st_mode & (libc::S_IWOTH as libc::mode_t) != 0;
        if world_writable {
            log::warn!("integrity check: plugin '{name}' at {path:?} is world-writable");
        }
        !world_writable
    }

    fn check_segment(&self, _name: &str, _symbol_addr: usize) -> bool {
        true
    }
}
