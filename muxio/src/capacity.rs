//! Free-space probing for merge targets.
//!
//! Capacity is a diagnostic, not a gatekeeper: when it cannot be determined
//! the answer is `None` and callers proceed without the check. A probe never
//! raises.

use std::path::Path;

use sysinfo::Disks;
use tracing::warn;

/// Source of free-space information for a target path.
///
/// `None` means "capacity unknown", never "zero" and never an error.
pub trait CapacityProbe: Send + Sync {
    fn free_bytes(&self, path: &Path) -> Option<u64>;
}

/// Probe backed by the OS disk list.
#[derive(Debug, Default)]
pub struct DiskCapacity;

impl CapacityProbe for DiskCapacity {
    fn free_bytes(&self, path: &Path) -> Option<u64> {
        if !path.exists() {
            warn!(path = %path.display(), "free-space query on a missing path");
            return None;
        }

        let disks = Disks::new_with_refreshed_list();
        let available = available_space_for_path(&disks, path);
        if available.is_none() {
            warn!(path = %path.display(), "could not determine free space");
        }
        available
    }
}

/// Find the disk owning `path`: the longest matching mount point wins.
fn available_space_for_path(disks: &Disks, path: &Path) -> Option<u64> {
    let path_str = path.to_string_lossy();
    let mut best_match: Option<(&sysinfo::Disk, usize)> = None;

    for disk in disks.list() {
        let mount_point = disk.mount_point().to_string_lossy();

        if path_str.starts_with(mount_point.as_ref()) {
            let mount_len = mount_point.len();

            if best_match.is_none_or(|(_, len)| mount_len > len) {
                best_match = Some((disk, mount_len));
            }
        }
    }

    best_match.map(|(disk, _)| disk.available_space())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_unknown_not_an_error() {
        let probe = DiskCapacity;
        assert_eq!(
            probe.free_bytes(Path::new("/definitely/not/a/real/path")),
            None
        );
    }

    #[test]
    fn existing_directory_does_not_panic() {
        // The value depends on the host; only the call contract is checked.
        let probe = DiskCapacity;
        let _ = probe.free_bytes(&std::env::temp_dir());
    }
}
