// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Finding the network interface of the physical function which owns a VF.

use crate::address::{InterfaceName, VfPciAddress};
use crate::error::{Missing, ResolveErr};
use crate::topology::DeviceTopology;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Directory holding the network devices of the PF owning `vf`, relative to the sysfs root.
#[must_use]
pub fn physfn_net_path(vf: &VfPciAddress) -> PathBuf {
    PathBuf::from(format!("bus/pci/devices/{vf}/physfn/net"))
}

/// Determine the interface name of the physical function which owns `vf`.
///
/// A PF with more than one network device (rare, but possible with some multi port cards) yields
/// the first device the kernel lists.
///
/// # Errors
///
/// - [`ResolveErr::NotFound`] if `vf` has no `physfn` reference (it is not a VF or does not exist)
/// - [`ResolveErr::NotFound`] if the owning PF exposes no network device
/// - [`ResolveErr::Io`] if the directory exists but can not be listed
/// - [`ResolveErr::MalformedData`] if the device name is not a legal interface name
pub fn pf_name(topology: &impl DeviceTopology, vf: &VfPciAddress) -> Result<InterfaceName, ResolveErr> {
    let path = physfn_net_path(vf);
    let mut names = topology.list_dir(&path).map_err(|err| {
        ResolveErr::from_io(
            err,
            || Missing::PhysFn(vf.clone()),
            || format!("network devices of the PF owning {vf}"),
        )
    })?;
    if names.is_empty() {
        return Err(ResolveErr::NotFound(Missing::PfNetdev(vf.clone())));
    }
    if names.len() > 1 {
        warn!("PF owning {vf} exposes several network devices ({names:?}), using the first");
    }
    let name = names.swap_remove(0);
    let pf = InterfaceName::try_from(name.trim()).map_err(|err| ResolveErr::MalformedData {
        path,
        reason: err.to_string(),
    })?;
    debug!("{vf} is owned by {pf}");
    Ok(pf)
}
