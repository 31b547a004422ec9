// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! In-memory stand-ins for [`DeviceTopology`] and [`LinkTable`].
//!
//! These let the pipeline be exercised without SR-IOV hardware or privileges.
//! Both fakes remember every query they were asked, so tests can check what was (and what was
//! not) looked at.

use crate::address::InterfaceName;
use crate::mac::Mac;
use crate::topology::{DeviceTopology, LinkTable};
use crate::vf::{PfLink, VfDescriptor, VfIndex};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
enum Node {
    Attribute(String),
    Dir,
    Link(PathBuf),
    Unreadable(io::ErrorKind),
}

/// In-memory [`DeviceTopology`].
#[derive(Debug, Default)]
pub struct FakeTopology {
    nodes: BTreeMap<PathBuf, Node>,
    accessed: Mutex<Vec<PathBuf>>,
}

impl FakeTopology {
    /// An empty topology: every lookup is `NotFound`.
    #[must_use]
    pub fn new() -> FakeTopology {
        FakeTopology::default()
    }

    /// Add an attribute file with the given content.
    #[must_use]
    pub fn attribute(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.nodes
            .insert(path.into(), Node::Attribute(content.into()));
        self
    }

    /// Add an (empty) directory.
    #[must_use]
    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.nodes.insert(path.into(), Node::Dir);
        self
    }

    /// Add a symlink pointing at `target`.
    #[must_use]
    pub fn link(mut self, path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.nodes.insert(path.into(), Node::Link(target.into()));
        self
    }

    /// Add a node which exists but fails every access with `kind`.
    #[must_use]
    pub fn unreadable(mut self, path: impl Into<PathBuf>, kind: io::ErrorKind) -> Self {
        self.nodes.insert(path.into(), Node::Unreadable(kind));
        self
    }

    /// Remove a node (and everything below it).
    #[must_use]
    pub fn without(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.nodes.retain(|candidate, _| !candidate.starts_with(path));
        self
    }

    /// Lay out a physical function `pf` with one `virtfn<N>` slot per entry of `vfs` and the
    /// matching `physfn` back references, the way the kernel does once `sriov_numvfs` is written.
    #[must_use]
    pub fn sriov_pf(self, pf: &str, vfs: &[&str]) -> Self {
        let mut topology =
            self.attribute(format!("class/net/{pf}/device/sriov_numvfs"), format!("{}\n", vfs.len()));
        for (slot, vf) in vfs.iter().enumerate() {
            topology = topology
                .link(
                    format!("class/net/{pf}/device/virtfn{slot}"),
                    format!("../{vf}"),
                )
                .dir(format!("bus/pci/devices/{vf}/physfn/net/{pf}"));
        }
        topology
    }

    /// Every path queried so far, in query order.
    #[must_use]
    pub fn accessed(&self) -> Vec<PathBuf> {
        self.accessed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, path: &Path) {
        self.accessed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_path_buf());
    }

    fn lookup(&self, path: &Path) -> io::Result<Option<&Node>> {
        self.record(path);
        match self.nodes.get(path) {
            Some(Node::Unreadable(kind)) => Err(io::Error::from(*kind)),
            node => Ok(node),
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.nodes
            .keys()
            .any(|candidate| candidate != path && candidate.starts_with(path))
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

impl DeviceTopology for FakeTopology {
    fn read_attribute(&self, path: &Path) -> io::Result<String> {
        match self.lookup(path)? {
            Some(Node::Attribute(content)) => Ok(content.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not an attribute", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        match self.lookup(path)? {
            Some(Node::Dir) | None if self.is_dir(path) || self.nodes.contains_key(path) => {}
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("{} is not a directory", path.display()),
                ));
            }
            None => return Err(not_found(path)),
        }
        let mut names: Vec<String> = self
            .nodes
            .keys()
            .filter_map(|candidate| candidate.strip_prefix(path).ok())
            .filter_map(|rest| rest.components().next())
            .filter_map(|first| first.as_os_str().to_str().map(ToString::to_string))
            .collect();
        names.dedup();
        Ok(names)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        match self.lookup(path)? {
            Some(Node::Link(target)) => Ok(target.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a symlink", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }
}

/// In-memory [`LinkTable`].
#[derive(Debug, Default)]
pub struct FakeLinks {
    links: BTreeMap<InterfaceName, Vec<VfDescriptor>>,
    queried: Mutex<Vec<InterfaceName>>,
}

impl FakeLinks {
    /// An empty link table: every query is `NotFound`.
    #[must_use]
    pub fn new() -> FakeLinks {
        FakeLinks::default()
    }

    /// Add a link reporting the given `(index, mac)` VF entries.
    ///
    /// # Panics
    ///
    /// If `name` is not a legal interface name.
    #[must_use]
    pub fn link(mut self, name: &str, vfs: &[(u32, Mac)]) -> Self {
        #[allow(clippy::expect_used)] // test fixture input
        let name = InterfaceName::try_from(name).expect("illegal interface name in fixture");
        let vfs = vfs
            .iter()
            .map(|(index, mac)| VfDescriptor {
                index: VfIndex::new(*index),
                mac: *mac,
            })
            .collect();
        self.links.insert(name, vfs);
        self
    }

    /// Every link queried so far, in query order.
    #[must_use]
    pub fn queried(&self) -> Vec<InterfaceName> {
        self.queried
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LinkTable for FakeLinks {
    fn link_by_name(&self, name: &InterfaceName) -> io::Result<PfLink> {
        self.queried
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.clone());
        match self.links.get(name) {
            Some(vfs) => Ok(PfLink {
                name: name.clone(),
                vfs: vfs.clone(),
            }),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no link named {name}"),
            )),
        }
    }
}
