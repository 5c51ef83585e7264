//! Metadata preservation.
//! Copies timestamps (atime, mtime) and, on Unix, permission bits from
//! source metadata onto the destination. Best-effort: failures are logged
//! and ignored, never turning a finished transfer into an error.

use filetime::{FileTime, set_file_times};
use std::fs;
use std::path::Path;
use tracing::{trace, warn};

/// Preserve metadata on `dest` using already-fetched `src_meta`.
pub fn preserve_metadata(dest: &Path, src_meta: &fs::Metadata) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let mt = FileTime::from_unix_time(src_meta.mtime(), src_meta.mtime_nsec() as u32);
        let at = FileTime::from_unix_time(src_meta.atime(), src_meta.atime_nsec() as u32);
        if let Err(e) = set_file_times(dest, at, mt) {
            warn!(path = %dest.display(), error = %e, "failed to set atime/mtime on destination");
        } else {
            trace!(path = %dest.display(), "set atime/mtime on destination");
        }
    }
    #[cfg(not(unix))]
    {
        if let (Ok(at), Ok(mt)) = (src_meta.accessed(), src_meta.modified()) {
            let at = FileTime::from_system_time(at);
            let mt = FileTime::from_system_time(mt);
            if let Err(e) = set_file_times(dest, at, mt) {
                warn!(path = %dest.display(), error = %e, "failed to set atime/mtime on destination");
            }
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let src_mode = src_meta.permissions().mode() & 0o777;
        let perms = fs::Permissions::from_mode(src_mode);
        if let Err(e) = fs::set_permissions(dest, perms) {
            warn!(path = %dest.display(), mode = format!("{src_mode:o}"), error = %e, "failed to set permissions on destination");
        } else {
            trace!(path = %dest.display(), mode = format!("{src_mode:o}"), "set permissions on destination");
        }
    }
}
