// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Reading the number of VFs a physical function is configured with.

use crate::address::InterfaceName;
use crate::error::{Missing, ResolveErr};
use crate::topology::DeviceTopology;
use std::path::PathBuf;
use tracing::debug;

/// Location of the configured VF count of `pf`, relative to the sysfs root.
#[must_use]
pub fn numvfs_path(pf: &InterfaceName) -> PathBuf {
    PathBuf::from(format!("class/net/{pf}/device/sriov_numvfs"))
}

/// Read the number of VFs currently configured on `pf`.
///
/// This is read from the kernel on every call: the count changes whenever an administrator
/// (or an operator) writes `sriov_numvfs`.
///
/// # Errors
///
/// - [`ResolveErr::NotFound`] if `pf` has no `sriov_numvfs` attribute (not SR-IOV capable, or no
///   such interface)
/// - [`ResolveErr::Io`] if the attribute exists but can not be read
/// - [`ResolveErr::MalformedData`] if the attribute is empty or not a non-negative integer
pub fn read_numvfs(topology: &impl DeviceTopology, pf: &InterfaceName) -> Result<u32, ResolveErr> {
    let path = numvfs_path(pf);
    let content = topology.read_attribute(&path).map_err(|err| {
        ResolveErr::from_io(
            err,
            || Missing::NumVfs(pf.clone()),
            || format!("configured VF count of {pf}"),
        )
    })?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ResolveErr::MalformedData {
            path,
            reason: "no data".to_string(),
        });
    }
    let numvfs = trimmed
        .parse::<u32>()
        .map_err(|err| ResolveErr::MalformedData {
            path,
            reason: format!("{trimmed:?} is not a VF count: {err}"),
        })?;
    debug!("{pf} has {numvfs} VFs configured");
    Ok(numvfs)
}
