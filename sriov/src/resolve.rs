// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Composing the individual lookups into VF records, and VF records into resource groups.

use crate::address::VfPciAddress;
use crate::error::{Missing, ResolveErr, VfErr};
use crate::index::{ScanRange, vf_index};
use crate::link::query_vf_mac;
use crate::pf::pf_name;
use crate::topology::{DeviceTopology, LinkTable};
use crate::vf::{Device, MacReport, ResourceGroup, ResourceRequest, VfRecord};
use derive_builder::Builder;
use tracing::{debug, error, info, instrument, warn};

/// Resolves VF PCI addresses into [`VfRecord`]s.
///
/// A `Resolver` holds no state of its own besides the means to reach the kernel; every call
/// observes the device topology and link table as they are at that moment.
#[derive(Builder, Debug)]
#[builder(pattern = "owned")]
pub struct Resolver<T, L> {
    /// Where the device topology is read from.
    topology: T,
    /// Where link state is read from.
    links: L,
    /// Which `virtfn<N>` slots to probe.
    #[builder(default)]
    scan_range: ScanRange,
}

impl<T, L> Resolver<T, L> {
    /// A resolver using the default [`ScanRange`].
    pub fn new(topology: T, links: L) -> Self {
        Resolver {
            topology,
            links,
            scan_range: ScanRange::default(),
        }
    }

    /// The device topology in use.
    pub fn topology(&self) -> &T {
        &self.topology
    }

    /// The link table in use.
    pub fn links(&self) -> &L {
        &self.links
    }

    /// The slot scan policy in use.
    pub fn scan_range(&self) -> ScanRange {
        self.scan_range
    }
}

impl<T: DeviceTopology, L: LinkTable> Resolver<T, L> {
    /// Resolve a single VF into its PF name, VF index and hardware address.
    ///
    /// # Errors
    ///
    /// The first failing step aborts the resolution; its error is returned tagged with `pci`.
    /// A VF which the link reports no state for is [`ResolveErr::NotFound`].
    #[instrument(level = "debug", skip_all, fields(pci = %pci))]
    pub fn resolve(&self, pci: &VfPciAddress) -> Result<VfRecord, VfErr> {
        match self.try_resolve(pci) {
            Ok(record) => {
                if record.mac.is_zero() {
                    warn!("{pci} has no hardware address assigned yet");
                }
                info!(
                    "{pci} is VF {vf} of {pf} with mac {mac}",
                    vf = record.vf,
                    pf = record.pf,
                    mac = record.mac
                );
                Ok(record)
            }
            Err(source) => Err(VfErr {
                pci: pci.clone(),
                source,
            }),
        }
    }

    fn try_resolve(&self, pci: &VfPciAddress) -> Result<VfRecord, ResolveErr> {
        let pf = pf_name(&self.topology, pci)?;
        let vf = vf_index(&self.topology, pci, &pf, self.scan_range)?;
        let Some(mac) = query_vf_mac(&self.links, &pf, vf)? else {
            return Err(ResolveErr::NotFound(Missing::VfLinkState { pf, vf }));
        };
        Ok(VfRecord { pf, vf, mac })
    }

    /// Resolve every VF of every request, in order.
    ///
    /// Resolution is fail-fast: the first VF which can not be resolved aborts the whole batch and no
    /// later VF is looked at.
    ///
    /// # Errors
    ///
    /// The error of the first VF which could not be resolved.
    pub fn resolve_groups(
        &self,
        requests: &[ResourceRequest],
    ) -> Result<Vec<ResourceGroup>, VfErr> {
        requests
            .iter()
            .map(|request| self.resolve_group(request))
            .collect()
    }

    #[instrument(level = "debug", skip_all, fields(network = %request.network, resource = %request.resource))]
    fn resolve_group(&self, request: &ResourceRequest) -> Result<ResourceGroup, VfErr> {
        debug!("resolving {} VFs", request.devices.len());
        let devices = request
            .devices
            .iter()
            .map(|pci| {
                self.resolve(pci)
                    .map(|record| Device {
                        pci: pci.clone(),
                        mac: record.mac,
                    })
                    .inspect_err(|err| error!("aborting batch: {err}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResourceGroup {
            name: request.resource.clone(),
            devices,
        })
    }

    /// Resolve a batch into the report handed to a sink.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve_groups`].
    pub fn resolve_report(
        &self,
        name: impl Into<String>,
        requests: &[ResourceRequest],
    ) -> Result<MacReport, VfErr> {
        Ok(MacReport {
            name: name.into(),
            resources: self.resolve_groups(requests)?,
        })
    }
}
