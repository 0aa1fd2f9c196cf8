//! Data types for ports

use derive_more::{From, Into};
use serde::{Deserialize, Serialize};

/// A port type, given by its index in the catalog of port types.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Serialize, Deserialize,
)]
pub struct PortTypeId(usize);

/// A component type, given by its index in the catalog of component types.
///
/// This is the colour of a component in the interconnection graph.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Serialize, Deserialize,
)]
pub struct ComponentTypeId(usize);

impl PortTypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ComponentTypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Site of a port: where it can be connected.
///
/// Uniquely given by the component instance that owns the port and the port
/// type. There may be several ports at the same site, all of them
/// interchangeable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Port {
    /// The owning component instance
    pub component: usize,
    /// The port type
    pub kind: PortTypeId,
}

impl Port {
    pub fn new(component: usize, kind: PortTypeId) -> Self {
        Self { component, kind }
    }

    /// Whether `self` and `other` sit on the same component instance.
    pub fn is_sibling(&self, other: &Port) -> bool {
        self.component == other.component
    }
}
