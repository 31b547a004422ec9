// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]
#![allow(rustdoc::missing_crate_level_docs)]

mod report;

use crate::report::{ReportSink, SinkErr, sink_for};
use args::{CmdArgs, Parser};
use netlink::{NetlinkErr, NetlinkLinks};
use sriov::{DeviceTopology, LinkTable, Resolver, ResolverBuilder, ResolverBuilderError};
use sriov::{SysfsTopology, VfErr};
use std::path::PathBuf;
use std::process::ExitCode;
use sysfs::SysfsErr;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit code for unusable command lines (`EINVAL`).
const EXIT_INVALID_ARGS: u8 = 22;

#[derive(Debug, thiserror::Error)]
enum RunErr {
    #[error("invalid tracing configuration: {0}")]
    Tracing(String),
    #[error(transparent)]
    Sysfs(#[from] SysfsErr),
    #[error(transparent)]
    Netlink(#[from] NetlinkErr),
    #[error("incomplete resolver configuration: {0}")]
    Builder(#[from] ResolverBuilderError),
    #[error(transparent)]
    Resolve(#[from] VfErr),
    #[error(transparent)]
    Sink(#[from] SinkErr),
}

fn init_logging(directive: Option<&String>) -> Result<(), RunErr> {
    let filter = match directive {
        Some(directive) => {
            EnvFilter::try_new(directive).map_err(|e| RunErr::Tracing(e.to_string()))?
        }
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_file(true)
        .with_level(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| RunErr::Tracing(e.to_string()))
}

fn publish<T: DeviceTopology, L: LinkTable>(
    resolver: &Resolver<T, L>,
    args: &CmdArgs,
    sink: &mut impl ReportSink,
) -> Result<(), RunErr> {
    let report = resolver.resolve_report(args.name(), &args.requests())?;
    let count: usize = report.resources.iter().map(|r| r.devices.len()).sum();
    sink.publish(&report)?;
    info!("published report {} with {count} VFs", report.name);
    Ok(())
}

fn run(args: &CmdArgs) -> Result<(), RunErr> {
    let topology = match args.sysfs_root() {
        Some(root) => SysfsTopology::at(root)?,
        None => SysfsTopology::discover()?,
    };
    info!("reading device topology from {}", topology.root());
    let resolver = ResolverBuilder::default()
        .topology(topology)
        .links(NetlinkLinks::connect()?)
        .scan_range(args.scan_range())
        .build()?;
    let mut sink = sink_for(args.output().map(PathBuf::as_path), args.format());
    publish(&resolver, args, &mut sink)
}

fn main() -> ExitCode {
    /* parse cmd line args */
    let args = match CmdArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            return match (e.print(), e.use_stderr()) {
                (Err(_), _) => ExitCode::FAILURE,
                (Ok(()), true) => ExitCode::from(EXIT_INVALID_ARGS),
                (Ok(()), false) => ExitCode::SUCCESS,
            };
        }
    };

    /* initialize logging */
    if let Err(e) = init_logging(args.tracing()) {
        eprintln!("{e}");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
