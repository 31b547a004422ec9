// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Resolve SR-IOV virtual functions to their hardware addresses.
//!
//! Given the PCI address of a VF, the [`Resolver`] finds
//!
//! 1. the network interface of the physical function owning it ([`pf::pf_name`]),
//! 2. the slot of the VF within that PF ([`index::vf_index`], using [`numvfs::read_numvfs`]),
//! 3. the hardware address the network stack reports for that slot ([`link::query_vf_mac`]).
//!
//! The kernel is reached only through the [`DeviceTopology`] and [`LinkTable`] traits.
//! [`SysfsTopology`] is the real device topology; the real link table lives in the netlink crate.
//! The `testing` feature provides in-memory fakes of both.
//!
//! Nothing is cached: every resolution observes the kernel as it is at that moment.

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

pub mod address;
pub mod error;
pub mod index;
pub mod link;
pub mod mac;
pub mod numvfs;
pub mod pf;
pub mod resolve;
pub mod topology;
pub mod vf;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use address::{InterfaceName, VfPciAddress};
pub use error::{ErrorKind, Missing, ResolveErr, VfErr};
pub use index::ScanRange;
pub use mac::Mac;
pub use resolve::{Resolver, ResolverBuilder, ResolverBuilderError};
pub use topology::{DeviceTopology, LinkTable, SysfsTopology};
pub use vf::{
    Device, MacReport, PfLink, ResourceGroup, ResourceRequest, VfDescriptor, VfIndex, VfRecord,
};
