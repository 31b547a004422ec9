// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors of the resolution pipeline.

use crate::address::{InterfaceName, VfPciAddress};
use crate::vf::VfIndex;
use std::path::PathBuf;

/// The thing which turned out to be absent when a [`ResolveErr::NotFound`] was raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Missing {
    /// The PCI device has no `physfn` reference (it is not a VF, or it does not exist).
    #[error("owning physical function of PCI device {0}")]
    PhysFn(VfPciAddress),
    /// The owning physical function exposes no network device.
    #[error("network device of the physical function owning PCI device {0}")]
    PfNetdev(VfPciAddress),
    /// The physical function has no `sriov_numvfs` attribute.
    #[error("configured VF count of {0}")]
    NumVfs(InterfaceName),
    /// None of the scanned `virtfn<N>` slots of the physical function point at the VF.
    #[error("VF slot of PCI device {pci} under PF {pf}")]
    VfSlot {
        /// The physical function which was scanned
        pf: InterfaceName,
        /// The VF which was looked for
        pci: VfPciAddress,
    },
    /// The network stack has no link by that name.
    #[error("link {0}")]
    Link(InterfaceName),
    /// The link exists but reports no state for the VF.
    #[error("link state of VF {vf} of PF {pf}")]
    VfLinkState {
        /// The physical function which was queried
        pf: InterfaceName,
        /// The VF index which was looked for
        vf: VfIndex,
    },
}

/// The taxonomy of [`ResolveErr`], for callers which only need to branch on the category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIs, strum::IntoStaticStr,
)]
pub enum ErrorKind {
    /// Expected absence of a topology node, attribute file, or link.
    NotFound,
    /// Something exists but could not be read.
    Io,
    /// Something was read but its content is not in the expected format.
    MalformedData,
}

/// Errors which may occur while resolving a single VF.
#[derive(Debug, thiserror::Error)]
pub enum ResolveErr {
    /// Something we needed does not exist.
    #[error("not found: {0}")]
    NotFound(Missing),
    /// Something exists but could not be read.
    #[error("unable to read {context}: {source}")]
    Io {
        /// What we were trying to read
        context: String,
        /// The underlying failure
        #[source]
        source: std::io::Error,
    },
    /// Something was read but it is not in the expected format.
    #[error("malformed data in {path:?}: {reason}")]
    MalformedData {
        /// Where the data came from
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },
}

impl ResolveErr {
    /// The category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveErr::NotFound(_) => ErrorKind::NotFound,
            ResolveErr::Io { .. } => ErrorKind::Io,
            ResolveErr::MalformedData { .. } => ErrorKind::MalformedData,
        }
    }

    /// Map an I/O failure, treating [`std::io::ErrorKind::NotFound`] as the absence of `missing`.
    pub(crate) fn from_io(
        err: std::io::Error,
        missing: impl FnOnce() -> Missing,
        context: impl FnOnce() -> String,
    ) -> ResolveErr {
        match err.kind() {
            std::io::ErrorKind::NotFound => ResolveErr::NotFound(missing()),
            _ => ResolveErr::Io {
                context: context(),
                source: err,
            },
        }
    }
}

/// A [`ResolveErr`] tagged with the PCI address whose resolution failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to resolve VF {pci}: {source}")]
pub struct VfErr {
    /// The VF which could not be resolved
    pub pci: VfPciAddress,
    /// Why it could not be resolved
    #[source]
    pub source: ResolveErr,
}

impl VfErr {
    /// The category of the underlying error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, Missing, ResolveErr};
    use crate::address::InterfaceName;

    fn pf() -> InterfaceName {
        InterfaceName::try_from("eth0").unwrap()
    }

    #[test]
    fn not_found_io_errors_become_not_found() {
        let err = std::io::Error::from(std::io::ErrorKind::NotFound);
        let err = ResolveErr::from_io(err, || Missing::NumVfs(pf()), || "numvfs".to_string());
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(err, ResolveErr::NotFound(Missing::NumVfs(_))));
    }

    #[test]
    fn other_io_errors_stay_io() {
        let err = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let err = ResolveErr::from_io(err, || Missing::NumVfs(pf()), || "numvfs".to_string());
        assert!(err.kind().is_io());
        assert_eq!(
            err.to_string(),
            "unable to read numvfs: permission denied"
        );
    }

    #[test]
    fn messages_name_the_missing_thing() {
        let err = ResolveErr::NotFound(Missing::Link(pf()));
        assert_eq!(err.to_string(), "not found: link eth0");
    }
}
