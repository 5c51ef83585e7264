//! Disk space checks (Unix).
//! Sums planned transfer sizes and compares against statvfs of the base
//! directory before any plan runs; no-op on non-Unix.

use std::path::Path;

use crate::errors::OrganizerError;
use crate::model::OrganizationPlan;

/// Conservative requirement estimate: every plan is costed at full source
/// size. Same-device moves consume no new space, but whether a move stays on
/// one device is unknowable until rename time.
pub fn estimate_required(plans: &[OrganizationPlan]) -> u64 {
    plans.iter().map(|p| p.record.size).sum()
}

/// Nearest existing ancestor, so checks also work before the destination
/// base has been created (dry runs).
pub(super) fn existing_ancestor(dir: &Path) -> &Path {
    let mut p = dir;
    while !p.exists() {
        match p.parent() {
            Some(parent) => p = parent,
            None => return dir,
        }
    }
    p
}

#[cfg(unix)]
pub fn check_space(required: u64, dest_dir: &Path) -> Result<(), OrganizerError> {
    use std::ffi::CString;

    let dest_dir = existing_ancestor(dest_dir);
    let dest_c = CString::new(dest_dir.to_string_lossy().into_owned()).map_err(|e| {
        OrganizerError::Configuration(format!(
            "invalid destination path '{}': {e}",
            dest_dir.display()
        ))
    })?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(dest_c.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(OrganizerError::Configuration(format!(
            "failed to stat filesystem for {}",
            dest_dir.display()
        )));
    }
    let available = (stat.f_bavail as u128).saturating_mul(stat.f_frsize as u128);
    if (required as u128) > available {
        return Err(OrganizerError::InsufficientSpace {
            required,
            available: available.min(u64::MAX as u128) as u64,
            dest: dest_dir.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn check_space(_required: u64, _dest_dir: &Path) -> Result<(), OrganizerError> {
    // Not implemented on non-Unix platforms.
    Ok(())
}
