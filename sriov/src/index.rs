// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Finding the slot (index) of a VF within its physical function.

use crate::address::{InterfaceName, VfPciAddress};
use crate::error::{Missing, ResolveErr};
use crate::numvfs::read_numvfs;
use crate::topology::DeviceTopology;
use crate::vf::VfIndex;
use std::path::PathBuf;
use tracing::{debug, trace};

/// Which `virtfn<N>` slots are probed for a PF with `sriov_numvfs` = `N`.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScanRange {
    /// Probe `virtfn0` through `virtfnN`.
    ///
    /// One slot more than the kernel creates.
    /// The extra slot never exists on a healthy system and is skipped like any other missing slot,
    /// so this only costs one extra probe.
    #[default]
    Inclusive,
    /// Probe `virtfn0` through `virtfn(N-1)`, exactly the slots the kernel creates.
    Exact,
}

impl ScanRange {
    /// The slots to probe for a PF configured with `numvfs` VFs, in ascending order.
    pub fn slots(self, numvfs: u32) -> impl Iterator<Item = VfIndex> {
        let end = match self {
            ScanRange::Inclusive => numvfs.saturating_add(1),
            ScanRange::Exact => numvfs,
        };
        (0..end).map(VfIndex::new)
    }
}

/// Location of the link for slot `vf` of `pf`, relative to the sysfs root.
#[must_use]
pub fn virtfn_path(pf: &InterfaceName, vf: VfIndex) -> PathBuf {
    PathBuf::from(format!("class/net/{pf}/device/virtfn{vf}"))
}

/// Determine the slot of `vf` within `pf`.
///
/// Slots are probed in ascending order and the first slot whose link resolves to a path ending in
/// `vf` wins.
/// Slots which are missing or whose link can not be read are skipped.
///
/// # Errors
///
/// - any error of [`read_numvfs`]
/// - [`ResolveErr::NotFound`] if no probed slot points at `vf`
pub fn vf_index(
    topology: &impl DeviceTopology,
    vf: &VfPciAddress,
    pf: &InterfaceName,
    range: ScanRange,
) -> Result<VfIndex, ResolveErr> {
    let numvfs = read_numvfs(topology, pf)?;
    for slot in range.slots(numvfs) {
        let path = virtfn_path(pf, slot);
        let target = match topology.read_link(&path) {
            Ok(target) => target,
            Err(err) => {
                trace!("skipping slot {slot} of {pf}: {err}");
                continue;
            }
        };
        if target
            .file_name()
            .is_some_and(|name| name == vf.as_str())
        {
            debug!("{vf} is VF {slot} of {pf}");
            return Ok(slot);
        }
    }
    Err(ResolveErr::NotFound(Missing::VfSlot {
        pf: pf.clone(),
        pci: vf.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::{ScanRange, vf_index};
    use crate::address::{InterfaceName, VfPciAddress};
    use crate::error::{ErrorKind, Missing, ResolveErr};
    use crate::testing::FakeTopology;
    use crate::vf::VfIndex;
    use std::path::PathBuf;
    use std::str::FromStr;

    fn eth0() -> InterfaceName {
        InterfaceName::try_from("eth0").unwrap()
    }

    fn pci(s: &str) -> VfPciAddress {
        VfPciAddress::try_from(s).unwrap()
    }

    #[test]
    fn slots() {
        assert_eq!(
            ScanRange::Inclusive.slots(2).collect::<Vec<_>>(),
            vec![VfIndex::new(0), VfIndex::new(1), VfIndex::new(2)]
        );
        assert_eq!(
            ScanRange::Exact.slots(2).collect::<Vec<_>>(),
            vec![VfIndex::new(0), VfIndex::new(1)]
        );
        assert_eq!(ScanRange::Exact.slots(0).count(), 0);
        assert_eq!(ScanRange::Inclusive.slots(0).count(), 1);
        assert_eq!(ScanRange::Inclusive.slots(u32::MAX).size_hint().0, u32::MAX as usize);
    }

    #[test]
    fn scan_range_names() {
        assert_eq!(ScanRange::from_str("inclusive").unwrap(), ScanRange::Inclusive);
        assert_eq!(ScanRange::from_str("exact").unwrap(), ScanRange::Exact);
        assert_eq!(ScanRange::Exact.to_string(), "exact");
        assert!(ScanRange::from_str("sideways").is_err());
    }

    #[test]
    fn finds_each_slot() {
        let topology = FakeTopology::new().sriov_pf("eth0", &["0000:01:00.0", "0000:01:00.1"]);
        for range in [ScanRange::Inclusive, ScanRange::Exact] {
            assert_eq!(
                vf_index(&topology, &pci("0000:01:00.0"), &eth0(), range).unwrap(),
                VfIndex::new(0)
            );
            assert_eq!(
                vf_index(&topology, &pci("0000:01:00.1"), &eth0(), range).unwrap(),
                VfIndex::new(1)
            );
        }
    }

    #[test]
    fn unknown_address_is_not_found() {
        let topology = FakeTopology::new().sriov_pf("eth0", &["0000:01:00.0", "0000:01:00.1"]);
        let err = vf_index(&topology, &pci("0000:01:00.2"), &eth0(), ScanRange::Inclusive)
            .unwrap_err();
        match err {
            ResolveErr::NotFound(Missing::VfSlot { pf, pci: missing }) => {
                assert_eq!(pf, eth0());
                assert_eq!(missing, pci("0000:01:00.2"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn inclusive_scan_probes_one_slot_past_the_count() {
        let topology = FakeTopology::new().sriov_pf("eth0", &["0000:01:00.0", "0000:01:00.1"]);
        vf_index(&topology, &pci("0000:01:00.7"), &eth0(), ScanRange::Inclusive).unwrap_err();
        assert!(
            topology
                .accessed()
                .contains(&PathBuf::from("class/net/eth0/device/virtfn2"))
        );

        let topology = FakeTopology::new().sriov_pf("eth0", &["0000:01:00.0", "0000:01:00.1"]);
        vf_index(&topology, &pci("0000:01:00.7"), &eth0(), ScanRange::Exact).unwrap_err();
        assert!(
            !topology
                .accessed()
                .contains(&PathBuf::from("class/net/eth0/device/virtfn2"))
        );
    }

    #[test]
    fn trailing_slot_matches_only_when_inclusive() {
        // sriov_numvfs says 1 but the kernel (mid reconfiguration) exposes virtfn1
        let topology = FakeTopology::new()
            .attribute("class/net/eth0/device/sriov_numvfs", "1")
            .link("class/net/eth0/device/virtfn0", "../0000:01:00.0")
            .link("class/net/eth0/device/virtfn1", "../0000:01:00.1");
        assert_eq!(
            vf_index(&topology, &pci("0000:01:00.1"), &eth0(), ScanRange::Inclusive).unwrap(),
            VfIndex::new(1)
        );
        assert_eq!(
            vf_index(&topology, &pci("0000:01:00.1"), &eth0(), ScanRange::Exact)
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn broken_slots_are_skipped() {
        let topology = FakeTopology::new()
            .attribute("class/net/eth0/device/sriov_numvfs", "3")
            .unreadable(
                "class/net/eth0/device/virtfn0",
                std::io::ErrorKind::PermissionDenied,
            )
            .link("class/net/eth0/device/virtfn2", "../0000:01:00.2");
        assert_eq!(
            vf_index(&topology, &pci("0000:01:00.2"), &eth0(), ScanRange::Exact).unwrap(),
            VfIndex::new(2)
        );
    }

    #[test]
    fn only_the_final_path_segment_is_compared() {
        let topology = FakeTopology::new()
            .attribute("class/net/eth0/device/sriov_numvfs", "1")
            .link(
                "class/net/eth0/device/virtfn0",
                "../../../devices/pci0000:00/0000:00:02.0/0000:01:00.1",
            );
        assert_eq!(
            vf_index(&topology, &pci("0000:01:00.1"), &eth0(), ScanRange::Exact).unwrap(),
            VfIndex::new(0)
        );
        assert!(vf_index(&topology, &pci("0000:00:02.0"), &eth0(), ScanRange::Exact).is_err());
    }

    #[test]
    fn count_errors_propagate() {
        let err = vf_index(&FakeTopology::new(), &pci("0000:01:00.1"), &eth0(), ScanRange::Exact)
            .unwrap_err();
        assert!(matches!(err, ResolveErr::NotFound(Missing::NumVfs(_))));
    }

    #[test]
    fn any_slot_is_found() {
        bolero::check!()
            .with_type()
            .for_each(|(numvfs, slot): &(u8, u8)| {
                let numvfs = u32::from(*numvfs);
                let slot = u32::from(*slot) % (numvfs + 1);
                let target = format!("0000:02:{:02x}.{}", slot / 8, slot % 8);
                let topology = FakeTopology::new()
                    .attribute("class/net/eth0/device/sriov_numvfs", numvfs.to_string())
                    .link(
                        format!("class/net/eth0/device/virtfn{slot}"),
                        format!("../{target}"),
                    );
                assert_eq!(
                    vf_index(&topology, &pci(&target), &eth0(), ScanRange::Inclusive).unwrap(),
                    VfIndex::new(slot)
                );
            });
    }
}
