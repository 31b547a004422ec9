// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The narrow interfaces through which the pipeline observes the kernel.
//!
//! All device topology access goes through [`DeviceTopology`] and all link state access goes
//! through [`LinkTable`].
//! Absence is always reported as an [`std::io::Error`] of kind [`std::io::ErrorKind::NotFound`];
//! the resolvers decide what that absence means.

use crate::address::InterfaceName;
use crate::vf::PfLink;
use std::io;
use std::path::{Path, PathBuf};
use sysfs::{SysfsPath, sysfs_root};
use tracing::trace;

/// Read only view of the kernel's device topology (sysfs).
///
/// Paths are relative to the root of the topology (e.g. `bus/pci/devices/0000:01:00.1/physfn/net`).
pub trait DeviceTopology {
    /// Read the content of an attribute file.
    ///
    /// # Errors
    ///
    /// Kind [`io::ErrorKind::NotFound`] if the attribute does not exist, anything else if it can not
    /// be read.
    fn read_attribute(&self, path: &Path) -> io::Result<String>;

    /// List the entry names of a directory.
    ///
    /// # Errors
    ///
    /// Kind [`io::ErrorKind::NotFound`] if the directory does not exist.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Read the target of a symlink without following it.
    ///
    /// # Errors
    ///
    /// Kind [`io::ErrorKind::NotFound`] if the link does not exist.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Read only view of the network stack's link table.
pub trait LinkTable {
    /// Query the live attributes of the link named `name`, including its VF list.
    ///
    /// # Errors
    ///
    /// Kind [`io::ErrorKind::NotFound`] if no such link exists.
    fn link_by_name(&self, name: &InterfaceName) -> io::Result<PfLink>;
}

impl<T: DeviceTopology + ?Sized> DeviceTopology for &T {
    fn read_attribute(&self, path: &Path) -> io::Result<String> {
        (**self).read_attribute(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        (**self).list_dir(path)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).read_link(path)
    }
}

impl<T: LinkTable + ?Sized> LinkTable for &T {
    fn link_by_name(&self, name: &InterfaceName) -> io::Result<PfLink> {
        (**self).link_by_name(name)
    }
}

/// [`DeviceTopology`] backed by the mounted sysfs.
///
/// Every call goes to the kernel.
#[derive(Debug, Clone)]
pub struct SysfsTopology {
    root: SysfsPath,
}

impl SysfsTopology {
    /// Use the sysfs mounted in this mount namespace.
    ///
    /// # Errors
    ///
    /// If sysfs is not mounted exactly once, or the mount table can not be read.
    pub fn discover() -> Result<SysfsTopology, sysfs::SysfsErr> {
        Ok(SysfsTopology {
            root: sysfs_root()?,
        })
    }

    /// Use the sysfs mounted at `root`.
    ///
    /// # Errors
    ///
    /// If `root` does not exist or is not a sysfs.
    pub fn at(root: impl AsRef<Path>) -> Result<SysfsTopology, sysfs::SysfsErr> {
        Ok(SysfsTopology {
            root: SysfsPath::new(root)?,
        })
    }

    /// The root all paths are resolved against.
    #[must_use]
    pub fn root(&self) -> &SysfsPath {
        &self.root
    }
}

impl DeviceTopology for SysfsTopology {
    fn read_attribute(&self, path: &Path) -> io::Result<String> {
        trace!("reading {}/{}", self.root, path.display());
        Ok(self.root.read_attribute(path)?)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        trace!("listing {}/{}", self.root, path.display());
        Ok(self.root.list_dir(path)?)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        trace!("resolving {}/{}", self.root, path.display());
        Ok(self.root.read_link(path)?)
    }
}
