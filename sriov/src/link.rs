// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Looking up the hardware address of a VF in the network stack's live link state.

use crate::address::InterfaceName;
use crate::error::{Missing, ResolveErr};
use crate::mac::Mac;
use crate::topology::LinkTable;
use crate::vf::{PfLink, VfIndex};
use tracing::debug;

impl PfLink {
    /// The hardware address the link reports for VF `vf`, if it reports one.
    #[must_use]
    pub fn vf_mac(&self, vf: VfIndex) -> Option<Mac> {
        self.vfs
            .iter()
            .find(|descriptor| descriptor.index == vf)
            .map(|descriptor| descriptor.mac)
    }
}

/// Query the network stack for the hardware address of VF `vf` of `pf`.
///
/// `Ok(None)` means the link exists but carries no state for that VF (the VF exists in the device
/// topology but the driver does not report it).
///
/// # Errors
///
/// - [`ResolveErr::NotFound`] if the network stack has no link named `pf`
/// - [`ResolveErr::Io`] if the query itself fails
pub fn query_vf_mac(
    links: &impl LinkTable,
    pf: &InterfaceName,
    vf: VfIndex,
) -> Result<Option<Mac>, ResolveErr> {
    let link = links.link_by_name(pf).map_err(|err| {
        ResolveErr::from_io(
            err,
            || Missing::Link(pf.clone()),
            || format!("link state of {pf}"),
        )
    })?;
    debug!("{pf} reports {} VFs", link.vfs.len());
    Ok(link.vf_mac(vf))
}

#[cfg(test)]
mod tests {
    use super::query_vf_mac;
    use crate::address::InterfaceName;
    use crate::error::{Missing, ResolveErr};
    use crate::mac::Mac;
    use crate::testing::FakeLinks;
    use crate::vf::VfIndex;

    const MAC0: Mac = Mac([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x00]);
    const MAC1: Mac = Mac([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]);

    fn eth0() -> InterfaceName {
        InterfaceName::try_from("eth0").unwrap()
    }

    #[test]
    fn finds_the_vf_by_index() {
        let links = FakeLinks::new().link("eth0", &[(0, MAC0), (1, MAC1)]);
        assert_eq!(
            query_vf_mac(&links, &eth0(), VfIndex::new(1)).unwrap(),
            Some(MAC1)
        );
        assert_eq!(
            query_vf_mac(&links, &eth0(), VfIndex::new(0)).unwrap(),
            Some(MAC0)
        );
    }

    #[test]
    fn kernel_order_does_not_matter() {
        let links = FakeLinks::new().link("eth0", &[(1, MAC1), (0, MAC0)]);
        assert_eq!(
            query_vf_mac(&links, &eth0(), VfIndex::new(0)).unwrap(),
            Some(MAC0)
        );
    }

    #[test]
    fn unmatched_index_is_absent_not_an_error() {
        let links = FakeLinks::new().link("eth0", &[(0, MAC0)]);
        assert_eq!(query_vf_mac(&links, &eth0(), VfIndex::new(1)).unwrap(), None);
    }

    #[test]
    fn missing_link_is_not_found() {
        let err = query_vf_mac(&FakeLinks::new(), &eth0(), VfIndex::new(0)).unwrap_err();
        assert!(matches!(err, ResolveErr::NotFound(Missing::Link(_))));
    }
}
