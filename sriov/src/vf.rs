// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The records produced by (and fed into) the resolution pipeline.

use crate::address::{InterfaceName, VfPciAddress};
use crate::mac::Mac;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The 0-based slot of a VF within its physical function.
///
/// A `VfIndex` only means something next to the [`InterfaceName`] of its PF: VF 3 of `eth0` and
/// VF 3 of `eth1` are unrelated devices.
#[repr(transparent)]
#[derive(
    Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize,
)]
#[serde(transparent)]
pub struct VfIndex(u32);

impl VfIndex {
    /// Treat the provided `u32` as a [`VfIndex`].
    #[must_use]
    pub const fn new(raw: u32) -> VfIndex {
        VfIndex(raw)
    }
}

impl From<u32> for VfIndex {
    fn from(value: u32) -> Self {
        VfIndex(value)
    }
}

impl From<VfIndex> for u32 {
    fn from(value: VfIndex) -> Self {
        value.0
    }
}

impl Display for VfIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything we learn about one VF.
///
/// Produced fresh by every resolution; never cached.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct VfRecord {
    /// Interface name of the owning physical function.
    pub pf: InterfaceName,
    /// Slot of the VF within `pf`.
    pub vf: VfIndex,
    /// Hardware address currently assigned to the VF.
    pub mac: Mac,
}

/// One entry of the VF list the network stack reports for a physical function.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct VfDescriptor {
    /// The VF slot this entry describes.
    pub index: VfIndex,
    /// The hardware address assigned to that VF.
    pub mac: Mac,
}

/// Live link state of a physical function, as far as VFs are concerned.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct PfLink {
    /// Name of the link.
    pub name: InterfaceName,
    /// The VF entries reported for the link, in kernel order.
    pub vfs: Vec<VfDescriptor>,
}

/// A batch of VFs to resolve, grouped under a resource name.
///
/// This mirrors the `<network>,<resource>,<pci>[,<pci>...]` form the tool accepts on its command
/// line.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ResourceRequest {
    /// Name of the network the VFs are attached to (informational).
    pub network: String,
    /// Name of the resource the VFs are published under.
    pub resource: String,
    /// The VFs to resolve, in order.
    pub devices: Vec<VfPciAddress>,
}

/// A resolved VF as it appears in a [`ResourceGroup`].
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct Device {
    /// The PCI address of the VF.
    pub pci: VfPciAddress,
    /// The hardware address of the VF.
    pub mac: Mac,
}

/// The resolved VFs of one resource.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ResourceGroup {
    /// The resource name.
    pub name: String,
    /// The resolved VFs, in request order.
    pub devices: Vec<Device>,
}

/// The complete output of one invocation, handed whole to a sink.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct MacReport {
    /// Name under which the report is published.
    pub name: String,
    /// One group per request, in request order.
    pub resources: Vec<ResourceGroup>,
}

#[cfg(test)]
mod tests {
    use super::{Device, MacReport, ResourceGroup};
    use crate::address::VfPciAddress;
    use crate::mac::Mac;
    use pretty_assertions::assert_eq;

    #[test]
    fn report_wire_shape() {
        let report = MacReport {
            name: "vf-macs".to_string(),
            resources: vec![ResourceGroup {
                name: "intel_sriov_netdevice".to_string(),
                devices: vec![Device {
                    pci: VfPciAddress::try_from("0000:01:00.1").unwrap(),
                    mac: Mac([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]),
                }],
            }],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "name": "vf-macs",
                "resources": [{
                    "name": "intel_sriov_netdevice",
                    "devices": [{"pci": "0000:01:00.1", "mac": "aa:bb:cc:dd:ee:01"}]
                }]
            })
        );
    }
}
