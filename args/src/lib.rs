// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Command line of the `vfmac` tool.

pub use clap::Parser;
use sriov::{ResourceRequest, ScanRange, VfPciAddress};
use std::path::PathBuf;
use std::str::FromStr;

/// One `<network>,<resource>,<pci>[,<pci>...]` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceArg(ResourceRequest);

impl ResourceArg {
    /// The request this argument describes.
    #[must_use]
    pub fn request(&self) -> &ResourceRequest {
        &self.0
    }
}

impl FromStr for ResourceArg {
    type Err = String;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut fields = input.split(',');
        let (Some(network), Some(resource)) = (fields.next(), fields.next()) else {
            return Err(format!(
                "invalid arg format {input:?}: expected <net_name>,<resource_name>,<vf_pci1>,...,<vf_pciN>"
            ));
        };
        if resource.is_empty() {
            return Err(format!("invalid arg format {input:?}: empty resource name"));
        }
        let devices = fields
            .map(|pci| VfPciAddress::try_from(pci).map_err(|e| format!("Invalid PCI address: {e}")))
            .collect::<Result<Vec<_>, _>>()?;
        if devices.is_empty() {
            return Err(format!(
                "invalid arg format {input:?}: at least one VF PCI address is required"
            ));
        }
        Ok(ResourceArg(ResourceRequest {
            network: network.to_string(),
            resource: resource.to_string(),
            devices,
        }))
    }
}

/// How the report is written.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, strum::Display, strum::EnumString, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum OutputFormat {
    /// Pretty printed JSON.
    #[default]
    Json,
    /// YAML.
    Yaml,
}

#[derive(Parser, Debug)]
#[command(name = "vfmac")]
#[command(version)]
#[command(about = "Resolve SR-IOV virtual functions to their MAC addresses", long_about = None)]
pub struct CmdArgs {
    #[arg(
        value_name = "NET,RESOURCE,PCI[,PCI...]",
        required = true,
        value_parser = ResourceArg::from_str,
        help = "VFs to resolve, grouped by resource, in the format <net_name>,<resource_name>,<vf_pci1>,...,<vf_pciN>.
E.g. sriov-net,intel_sriov_netdevice,0000:3b:02.0,0000:3b:02.1. Several groups may be given."
    )]
    resources: Vec<ResourceArg>,

    #[arg(
        long,
        value_name = "NAME",
        env = "VFMAC_REPORT_NAME",
        default_value = "vf-macs",
        help = "Name under which the report is published"
    )]
    name: String,

    #[arg(
        long,
        value_name = "json|yaml",
        default_value_t = OutputFormat::Json,
        help = "Format of the report"
    )]
    format: OutputFormat,

    #[arg(
        long,
        value_name = "PATH",
        help = "Write the report to this file instead of stdout"
    )]
    output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "inclusive|exact",
        default_value_t = ScanRange::Inclusive,
        help = "VF slots to probe for a PF with N VFs: virtfn0..=virtfnN (inclusive) or virtfn0..virtfnN-1 (exact)"
    )]
    scan_range: ScanRange,

    #[arg(
        long,
        value_name = "PATH",
        help = "Root of the sysfs to read (defaults to the mounted sysfs)"
    )]
    sysfs_root: Option<PathBuf>,

    #[arg(
        long,
        value_name = "tracing filter",
        help = "Tracing filter directive, e.g. info or vfmac_sriov=debug (defaults to RUST_LOG, then info)"
    )]
    tracing: Option<String>,
}

impl CmdArgs {
    /// The requests to resolve, in command line order.
    pub fn requests(&self) -> Vec<ResourceRequest> {
        self.resources
            .iter()
            .map(|arg| arg.request().clone())
            .collect()
    }

    /// Name the report is published under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format the report is rendered in.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// File to write the report to; `None` means stdout.
    pub fn output(&self) -> Option<&PathBuf> {
        self.output.as_ref()
    }

    /// Which `virtfn<N>` slots to probe.
    pub fn scan_range(&self) -> ScanRange {
        self.scan_range
    }

    /// Explicit sysfs root; `None` means the mounted sysfs.
    pub fn sysfs_root(&self) -> Option<&PathBuf> {
        self.sysfs_root.as_ref()
    }

    /// Tracing filter directive, if one was given.
    pub fn tracing(&self) -> Option<&String> {
        self.tracing.as_ref()
    }
}
