// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Live link state from the kernel via [rtnetlink].
//!
//! [`NetlinkLinks`] is the [`LinkTable`] used outside of tests.
//! It asks the kernel for a single link by name with the VF extension mask set, so that the reply
//! carries the `IFLA_VFINFO_LIST` of the physical function.
//!
//! [rtnetlink]: https://docs.rs/rtnetlink

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

use futures::TryStreamExt;
use nix::errno::Errno;
use rtnetlink::Handle;
use rtnetlink::packet_route::link::{LinkAttribute, LinkExtentMask, LinkMessage, VfInfo};
use sriov::{InterfaceName, LinkTable, Mac, PfLink, VfDescriptor, VfIndex};
use std::io;
use tracing::{debug, trace, warn};

/// Errors which may occur while setting up a netlink connection.
#[derive(Debug, thiserror::Error)]
pub enum NetlinkErr {
    /// The runtime driving the netlink socket could not be built.
    #[error("unable to build netlink runtime: {0}")]
    Runtime(io::Error),
    /// The netlink socket could not be opened.
    #[error("unable to open netlink socket: {0}")]
    Connect(io::Error),
}

/// [`LinkTable`] backed by an rtnetlink socket.
///
/// The socket is driven by a private single threaded tokio runtime, so callers stay synchronous.
/// Each query is a fresh `RTM_GETLINK`; nothing is cached.
#[derive(Debug)]
pub struct NetlinkLinks {
    runtime: tokio::runtime::Runtime,
    handle: Handle,
}

impl NetlinkLinks {
    /// Open a netlink socket in the current network namespace.
    ///
    /// # Errors
    ///
    /// If the runtime can not be started or the socket can not be opened.
    pub fn connect() -> Result<NetlinkLinks, NetlinkErr> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()
            .map_err(NetlinkErr::Runtime)?;
        // the socket registers with the reactor, so it must be created inside the runtime
        let (connection, handle, _) = runtime
            .block_on(async { rtnetlink::new_connection() })
            .map_err(NetlinkErr::Connect)?;
        runtime.spawn(connection);
        debug!("netlink connection established");
        Ok(NetlinkLinks { runtime, handle })
    }

    async fn get_link(&self, name: &InterfaceName) -> Result<Option<LinkMessage>, rtnetlink::Error> {
        let mut request = self.handle.link().get().match_name(name.to_string());
        request
            .message_mut()
            .attributes
            .push(LinkAttribute::ExtMask(vec![LinkExtentMask::Vf]));
        let mut replies = request.execute();
        replies.try_next().await
    }
}

impl LinkTable for NetlinkLinks {
    fn link_by_name(&self, name: &InterfaceName) -> io::Result<PfLink> {
        trace!("querying link {name}");
        link_from_reply(name, self.runtime.block_on(self.get_link(name)))
    }
}

fn link_from_reply(
    name: &InterfaceName,
    reply: Result<Option<LinkMessage>, rtnetlink::Error>,
) -> io::Result<PfLink> {
    match reply {
        Ok(Some(message)) => Ok(pf_link(name, &message)),
        Ok(None) => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("kernel sent no reply for link {name}"),
        )),
        Err(err) => Err(to_io(name, err)),
    }
}

fn to_io(name: &InterfaceName, err: rtnetlink::Error) -> io::Error {
    match &err {
        rtnetlink::Error::NetlinkError(message)
            if message.raw_code().abs() == Errno::ENODEV as i32 =>
        {
            io::Error::new(io::ErrorKind::NotFound, format!("no link named {name}"))
        }
        _ => io::Error::other(err),
    }
}

/// Extract the VF view of a link from an `RTM_NEWLINK` message.
///
/// VF entries without a usable `IFLA_VF_MAC` are dropped; entries keep kernel order.
#[must_use]
pub fn pf_link(requested: &InterfaceName, message: &LinkMessage) -> PfLink {
    let name = message
        .attributes
        .iter()
        .find_map(|attribute| match attribute {
            LinkAttribute::IfName(name) => InterfaceName::try_from(name.as_str()).ok(),
            _ => None,
        })
        .unwrap_or_else(|| requested.clone());
    PfLink {
        name,
        vfs: vf_descriptors(message),
    }
}

/// The `(index, mac)` pairs of the `IFLA_VFINFO_LIST` of a link message.
#[must_use]
pub fn vf_descriptors(message: &LinkMessage) -> Vec<VfDescriptor> {
    message
        .attributes
        .iter()
        .filter_map(|attribute| match attribute {
            LinkAttribute::VfInfoList(list) => Some(list),
            _ => None,
        })
        .flatten()
        .filter_map(|vf| {
            vf.0.iter().find_map(|info| match info {
                VfInfo::Mac(mac) => Some(mac),
                _ => None,
            })
        })
        .filter_map(|vf_mac| match Mac::from_padded(&vf_mac.mac) {
            Ok(mac) => Some(VfDescriptor {
                index: VfIndex::new(vf_mac.vf_id),
                mac,
            }),
            Err(err) => {
                warn!("ignoring VF {}: {err}", vf_mac.vf_id);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{link_from_reply, pf_link, vf_descriptors};
    use nix::errno::Errno;
    use pretty_assertions::assert_eq;
    use rtnetlink::packet_core::ErrorMessage;
    use rtnetlink::packet_route::link::{
        LinkAttribute, LinkMessage, LinkVfInfo, VfInfo, VfInfoMac,
    };
    use sriov::{InterfaceName, Mac, VfDescriptor, VfIndex};
    use std::io;
    use std::num::NonZeroI32;

    fn kernel_error(errno: Errno) -> rtnetlink::Error {
        let mut message = ErrorMessage::default();
        message.code = NonZeroI32::new(-(errno as i32));
        rtnetlink::Error::NetlinkError(message)
    }

    fn vf(index: u32, mac: [u8; 6]) -> LinkVfInfo {
        LinkVfInfo(vec![VfInfo::Mac(VfInfoMac::new(index, &mac))])
    }

    fn eth0() -> InterfaceName {
        InterfaceName::try_from("eth0").unwrap()
    }

    #[test]
    fn decodes_the_vf_list() {
        let mut message = LinkMessage::default();
        message
            .attributes
            .push(LinkAttribute::IfName("eth0".to_string()));
        message.attributes.push(LinkAttribute::VfInfoList(vec![
            vf(0, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x00]),
            vf(1, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]),
        ]));
        let link = pf_link(&eth0(), &message);
        assert_eq!(link.name, eth0());
        assert_eq!(
            link.vfs,
            vec![
                VfDescriptor {
                    index: VfIndex::new(0),
                    mac: Mac([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x00]),
                },
                VfDescriptor {
                    index: VfIndex::new(1),
                    mac: Mac([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]),
                },
            ]
        );
        assert_eq!(
            link.vf_mac(VfIndex::new(1)).map(|mac| mac.to_string()),
            Some("aa:bb:cc:dd:ee:01".to_string())
        );
    }

    #[test]
    fn links_without_vfs_report_none() {
        let mut message = LinkMessage::default();
        message.attributes.push(LinkAttribute::IfName("lo".to_string()));
        assert!(vf_descriptors(&message).is_empty());
    }

    #[test]
    fn vf_entries_without_a_mac_are_dropped() {
        let mut message = LinkMessage::default();
        message.attributes.push(LinkAttribute::VfInfoList(vec![
            LinkVfInfo(vec![]),
            vf(3, [2, 0, 0, 0, 0, 3]),
        ]));
        let vfs = vf_descriptors(&message);
        assert_eq!(vfs.len(), 1);
        assert_eq!(vfs[0].index, VfIndex::new(3));
    }

    #[test]
    fn requested_name_is_used_when_the_reply_has_none() {
        let link = pf_link(&eth0(), &LinkMessage::default());
        assert_eq!(link.name, eth0());
        assert!(link.vfs.is_empty());
    }

    #[test]
    fn unknown_device_is_not_found() {
        let err = link_from_reply(&eth0(), Err(kernel_error(Errno::ENODEV))).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(err.to_string(), "no link named eth0");
    }

    #[test]
    fn empty_reply_is_not_found() {
        let err = link_from_reply(&eth0(), Ok(None)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn other_kernel_errors_are_io_errors() {
        for errno in [Errno::EPERM, Errno::EINVAL, Errno::ENOBUFS] {
            let err = link_from_reply(&eth0(), Err(kernel_error(errno))).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::Other, "{errno}");
        }
        let err = link_from_reply(&eth0(), Err(rtnetlink::Error::RequestFailed)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn replies_are_decoded() {
        let mut message = LinkMessage::default();
        message.attributes.push(LinkAttribute::VfInfoList(vec![vf(
            0,
            [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x00],
        )]));
        let link = link_from_reply(&eth0(), Ok(Some(message))).unwrap();
        assert_eq!(link.name, eth0());
        assert_eq!(link.vfs.len(), 1);
    }
}
