// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Identifiers used as lookup keys: PCI addresses of VFs and names of network interfaces.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The PCI address of a virtual function (e.g. `"0000:01:00.1"`).
///
/// This is deliberately opaque.
/// It is only ever used as a sysfs path segment and compared against the final path segment of
/// the `virtfn<N>` links of a physical function, so we do not parse it into its domain, bus, device
/// and function components.
/// We do, however, insist that it can be used as a single path segment.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct VfPciAddress(String);

/// Errors which may occur when mapping a `String` into a [`VfPciAddress`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalPciAddress {
    /// The empty string is not a PCI address.
    #[error("PCI address must not be empty")]
    Empty,
    /// The string would not be a single path segment.
    #[error("PCI address {0:?} must not contain '/' or be . or ..")]
    NotAPathSegment(String),
    /// The string contains an interior null character.
    #[error("PCI address {0:?} contains interior null characters")]
    InteriorNull(String),
}

impl VfPciAddress {
    /// Borrow the address as a `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for VfPciAddress {
    type Error = IllegalPciAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(IllegalPciAddress::Empty);
        }
        if value.contains('\0') {
            return Err(IllegalPciAddress::InteriorNull(value));
        }
        if value.contains('/') || value == "." || value == ".." {
            return Err(IllegalPciAddress::NotAPathSegment(value));
        }
        Ok(VfPciAddress(value))
    }
}

impl TryFrom<&str> for VfPciAddress {
    type Error = IllegalPciAddress;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

impl From<VfPciAddress> for String {
    fn from(value: VfPciAddress) -> Self {
        value.0
    }
}

impl AsRef<str> for VfPciAddress {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for VfPciAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

const MAX_INTERFACE_NAME_LEN: usize = 16;

/// A string which has been checked to be a legal linux network interface name.
///
/// The rules are the kernel's own (`dev_valid_name`): no `/`, `:` or whitespace, not `.` or `..`,
/// and at most 15 bytes.
/// The kernel limits names to 16 bytes including the terminating null, but the names we get back
/// from sysfs and netlink never carry that null.
#[repr(transparent)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct InterfaceName(String);

impl Display for InterfaceName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl InterfaceName {
    /// The maximum legal length of a linux network interface name (including the trailing NUL)
    pub const MAX_LEN: usize = MAX_INTERFACE_NAME_LEN;
}

/// Errors which may occur when mapping a general `String` into an `InterfaceName`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum IllegalInterfaceName {
    /// An empty string was submitted.
    #[error("interface name must be at least one character")]
    Empty,
    /// You can't make an interface named ., ..
    #[error("name must not be . or ..")]
    MustNotIncludeOnlyDots(String),
    /// A string which is longer than 15 bytes was submitted.
    #[error("interface name {0} is too long")]
    TooLong(String),
    /// The supplied string contains a character the kernel refuses in interface names.
    #[error("interface name {0:?} contains illegal characters (/, : or whitespace)")]
    IllegalCharacters(String),
}

impl TryFrom<String> for InterfaceName {
    type Error = IllegalInterfaceName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(IllegalInterfaceName::Empty);
        }
        if value == "." || value == ".." {
            return Err(IllegalInterfaceName::MustNotIncludeOnlyDots(value));
        }
        if value
            .chars()
            .any(|c| c == '/' || c == ':' || c == '\0' || c.is_whitespace())
        {
            return Err(IllegalInterfaceName::IllegalCharacters(value));
        }
        if value.len() >= InterfaceName::MAX_LEN {
            return Err(IllegalInterfaceName::TooLong(value));
        }
        Ok(InterfaceName(value))
    }
}

impl TryFrom<&str> for InterfaceName {
    type Error = IllegalInterfaceName;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

impl From<InterfaceName> for String {
    fn from(value: InterfaceName) -> Self {
        value.0
    }
}

impl AsRef<str> for InterfaceName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
