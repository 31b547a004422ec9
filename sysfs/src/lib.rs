// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! [sysfs] access utilities.
//!
//! Basically, this is a module full of minor guard rails to make sure that whatever we read about
//! PCI devices and network interfaces actually comes from the kernel and not from some file which
//! happens to be sitting at a familiar looking path.
//!
//! Everything in here is read only.
//!
//! [sysfs]: https://www.kernel.org/doc/Documentation/filesystems/sysfs.txt

#![deny(clippy::pedantic, clippy::unwrap_used, missing_docs)]

use std::io::Read;
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

/// Errors which might occur when accessing sysfs directories
#[derive(Debug, thiserror::Error)]
pub enum SysfsErr {
    /// The path is not under a mounted sysfs and therefore does not qualify as a [`SysfsPath`].
    #[error("path {0:?} is not under sysfs")]
    PathNotUnderSysfs(PathBuf),
    /// No sysfs filesystem is mounted in this mount namespace.
    #[error("sysfs is not mounted")]
    NotMounted,
    /// sysfs is mounted more than once, and we refuse to guess which mount is authoritative.
    #[error("suspicious configuration found: sysfs is mounted at more than one location: {0:?}")]
    MountedMoreThanOnce(Vec<PathBuf>),
    /// The mount table could not be read.
    #[error("unable to read mount table: {0}")]
    MountTable(String),
    /// Some [`std::io::Error`] error occurred
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    /// Invalid UTF-8 in a path under sysfs is an absolutely wild error case we expect to
    /// never see.
    ///
    /// The kernel just uses ascii byte strings for sysfs, so you should never see this
    /// error under healthy conditions.
    ///
    /// The [`SysfsErr::SysfsPathIsNotValidUtf8`] branch deliberately does not include
    /// any information about the offending string name or any derivative, even for logging
    /// or error reporting.
    /// Injecting arbitrary bytes into a system log is not something we want to help with.
    #[error("path under sysfs is not a valid UTF-8 string")]
    SysfsPathIsNotValidUtf8,
}

impl From<SysfsErr> for std::io::Error {
    fn from(value: SysfsErr) -> Self {
        use std::io::ErrorKind;
        match value {
            SysfsErr::IoError(err) => err,
            SysfsErr::SysfsPathIsNotValidUtf8 => {
                std::io::Error::new(ErrorKind::InvalidData, SysfsErr::SysfsPathIsNotValidUtf8)
            }
            SysfsErr::PathNotUnderSysfs(path) => std::io::Error::new(
                ErrorKind::PermissionDenied,
                SysfsErr::PathNotUnderSysfs(path),
            ),
            other => std::io::Error::other(other),
        }
    }
}

/// Locate the (single) mounted sysfs.
///
/// The mount table is consulted on every call; nothing is remembered between calls.
///
/// # Errors
///
/// - [`SysfsErr::NotMounted`] if no sysfs is mounted
/// - [`SysfsErr::MountedMoreThanOnce`] if sysfs is mounted more than once
/// - [`SysfsErr::MountTable`] if `/proc/self/mounts` can not be read
pub fn sysfs_root() -> Result<SysfsPath, SysfsErr> {
    let sysfs_mounts: Vec<_> = procfs::mounts()
        .map_err(|err| SysfsErr::MountTable(err.to_string()))?
        .into_iter()
        .filter(|mount| mount.fs_vfstype == "sysfs")
        .map(|mount| PathBuf::from(mount.fs_file))
        .collect();
    match sysfs_mounts.as_slice() {
        [] => {
            error!("sysfs is not mounted");
            Err(SysfsErr::NotMounted)
        }
        [root] => {
            let root = SysfsPath::new(root)?;
            debug!("found sysfs filesystem at {root}");
            Ok(root)
        }
        _ => {
            error!("sysfs is mounted at more than one location: {sysfs_mounts:#?}");
            Err(SysfsErr::MountedMoreThanOnce(sysfs_mounts))
        }
    }
}

/// Path which is promised to
///
/// 1. exist under a mounted sysfs at the time of creation,
/// 2. be both absolute and canonical,
/// 3. be both safely and correctly represented as a valid UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SysfsPath(PathBuf);

impl SysfsPath {
    /// Create a new `SysfsPath` from a path.
    ///
    /// This function takes a path and returns a `SysfsPath` if the path is under sysfs.
    ///
    /// <div class="note">
    ///
    /// The path will be canonicalized prior to any other checks, so passing paths to symlinks here
    /// is completely fine (sysfs uses a lot of symlinks).
    /// If you need the symlink itself rather than its target, see [`SysfsPath::read_link`].
    /// </div>
    ///
    /// # Errors
    ///
    /// - If the canonicalized path is not under sysfs, an error is returned.
    /// - If the path is under sysfs but is (somehow) not a valid UTF-8 string, an error is returned.
    /// - io errors (such as not found or permission denied) can also occur
    pub fn new(path: impl AsRef<Path>) -> Result<SysfsPath, SysfsErr> {
        let path = path.as_ref();
        if path.as_os_str().to_str().is_none() {
            return Err(SysfsErr::SysfsPathIsNotValidUtf8);
        }
        let path = std::fs::canonicalize(path)?;
        if path.as_os_str().to_str().is_none() {
            return Err(SysfsErr::SysfsPathIsNotValidUtf8);
        }
        match nix::sys::statfs::statfs(&path) {
            Ok(stats) => {
                if stats.filesystem_type() == nix::sys::statfs::SYSFS_MAGIC {
                    Ok(SysfsPath(path))
                } else {
                    Err(SysfsErr::PathNotUnderSysfs(path))
                }
            }
            Err(errno) => Err(SysfsErr::IoError(errno.into())),
        }
    }

    /// Get an immutable reference to the inner [`PathBuf`].
    #[must_use]
    pub fn inner(&self) -> &PathBuf {
        &self.0
    }

    /// Construct a path relative to this [`SysfsPath`]
    ///
    /// # Errors
    ///
    /// [`SysfsErr`] will occur if
    ///
    /// 1. the child path does not exist
    /// 2. the child path does not resolve to a path in sysfs (e.g. something is bind mounted under sysfs)
    /// 3. [`std::io::Error`] error occurs (e.g. permission denied)
    /// 4. a path is somehow not valid utf-8
    ///
    /// <div class="caution">
    ///
    /// The returned path will be canonicalized, so it need not be under the starting point.
    /// </div>
    pub fn relative(&self, path: impl AsRef<Path>) -> Result<SysfsPath, SysfsErr> {
        SysfsPath::new(self.inner().join(path))
    }

    /// Read a (small) sysfs attribute file located at `path` relative to this directory.
    ///
    /// The content is returned as is; callers decide how much whitespace they care about.
    ///
    /// # Errors
    ///
    /// - If the attribute does not exist or is not under sysfs
    /// - If the attribute is not readable (permissions, or the driver refuses the read)
    /// - If the content is not valid UTF-8
    pub fn read_attribute(&self, path: impl AsRef<Path>) -> Result<String, SysfsErr> {
        let mut options = std::fs::OpenOptions::new();
        options.read(true);
        let mut file = SysfsFile::open(self.inner().join(path), &options)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }

    /// List the names of the entries of the directory at `path` relative to this directory.
    ///
    /// Names are returned in the order the kernel reports them.
    ///
    /// # Errors
    ///
    /// - If the directory does not exist or is not under sysfs
    /// - If any entry name is not valid UTF-8
    pub fn list_dir(&self, path: impl AsRef<Path>) -> Result<Vec<String>, SysfsErr> {
        let dir = self.relative(path)?;
        let mut names = vec![];
        for entry in std::fs::read_dir(dir.inner())? {
            match entry?.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(_) => return Err(SysfsErr::SysfsPathIsNotValidUtf8),
            }
        }
        Ok(names)
    }

    /// Read the target of the symlink at `path` relative to this directory, without following it.
    ///
    /// Only the directory holding the link is required to be under sysfs; the returned target is
    /// reported exactly as the kernel wrote it (usually a relative path).
    ///
    /// # Errors
    ///
    /// - If the containing directory does not exist or is not under sysfs
    /// - If `path` is not a symlink or does not exist
    pub fn read_link(&self, path: impl AsRef<Path>) -> Result<PathBuf, SysfsErr> {
        let path = path.as_ref();
        let Some(link_name) = path.file_name() else {
            return Err(SysfsErr::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} does not name a link", path.display()),
            )));
        };
        let parent = match path.parent() {
            Some(parent) => self.relative(parent)?,
            None => self.clone(),
        };
        let target = std::fs::read_link(parent.inner().join(link_name))?;
        if target.as_os_str().to_str().is_none() {
            return Err(SysfsErr::SysfsPathIsNotValidUtf8);
        }
        Ok(target)
    }
}

impl AsRef<Path> for SysfsPath {
    fn as_ref(&self) -> &Path {
        self.inner()
    }
}

// this is safe because we have already validated the conversion to UTF-8 in the constructor
impl std::fmt::Display for SysfsPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner().assert_str())
    }
}

/// Trait intended to insist that a value can be represented as valid UTF-8.
///
/// This trait is intended to be used in the situation where deviation from that expectation represents a
/// severe system error and crashing is the only reasonable response.
pub trait AssertAsStr {
    /// Insist that a value can be represented as valid UTF-8 and panic with a deliberately vague error message if not.
    ///
    /// # Panics
    ///
    /// If the conversion fails, all implementations are
    ///
    /// - **required** to panic or abort the process and,
    /// - are **forbidden** from logging the offending value or any value derived from the invalid value.
    fn assert_str(&self) -> &str;
}

/// We insist that path names are valid UTF-8 and immediately panic with a deliberately vague error message if not.
impl AssertAsStr for PathBuf {
    fn assert_str(&self) -> &str {
        match self.as_os_str().to_str() {
            Some(s) => s,
            None => panic!("PathBuf is not valid UTF-8 (this is suspicious)"),
        }
    }
}

/// File which is promised to be under a mounted sysfs.
#[derive(Debug)]
pub struct SysfsFile(std::fs::File);

impl SysfsFile {
    /// Open a file under a mounted sysfs.
    ///
    /// # Errors
    ///
    /// - If the path leads out of the sysfs mount
    /// - On permissions errors or otherwise invalid file access
    pub fn open(path: impl AsRef<Path>, options: &std::fs::OpenOptions) -> Result<Self, SysfsErr> {
        let path = SysfsPath::new(path.as_ref())?;
        let file = options.open(path.inner()).map_err(SysfsErr::IoError)?;
        match nix::sys::statfs::fstatfs(file.as_fd()) {
            Ok(stat) => {
                if stat.filesystem_type() == nix::sys::statfs::SYSFS_MAGIC {
                    Ok(SysfsFile(file))
                } else {
                    Err(SysfsErr::PathNotUnderSysfs(path.inner().clone()))
                }
            }
            Err(e) => Err(SysfsErr::IoError(e.into())),
        }
    }
}

impl std::io::Read for SysfsFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}
