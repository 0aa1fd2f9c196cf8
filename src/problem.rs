//! The problem catalog: what components exist and how their ports may connect.
//!
//! A [`Problem`] is plain data. It is validated and expanded into a
//! [`PortModel`](crate::port_model::PortModel) before any search happens.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How many distinct neighbours a component instance must end up with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionCount {
    /// No constraint.
    #[default]
    Any,
    /// Every port reaches a different component: the number of distinct
    /// neighbours equals the number of ports.
    Unique,
    /// Exactly this many distinct neighbours.
    Exact(usize),
}

/// A line-connectivity rule between two port types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineRule {
    /// A line leaving a `from` port must not end at a `to` port.
    Forbidden,
    /// A line leaving a `from` port must end at a `to` port.
    Required,
}

/// A line-connectivity constraint, see [`LineRule`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConstraint {
    pub from: String,
    pub to: String,
    pub rule: LineRule,
}

/// A component type of the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentType {
    pub name: String,
    /// Number of ports of each port type, by port type name.
    pub ports: BTreeMap<String, usize>,
    /// Number of instances of this type in every architecture.
    #[serde(default = "default_instances")]
    pub instances: usize,
    /// Mandatory components may never be removed from an architecture.
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
    /// Whether two ports of the same instance may be connected to each other.
    #[serde(default)]
    pub loops: bool,
    #[serde(default)]
    pub connections: ConnectionCount,
}

fn default_instances() -> usize {
    1
}

fn default_mandatory() -> bool {
    true
}

impl ComponentType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ports: BTreeMap::new(),
            instances: default_instances(),
            mandatory: default_mandatory(),
            loops: false,
            connections: ConnectionCount::Any,
        }
    }

    /// Add `count` ports of type `kind`.
    pub fn port(mut self, kind: impl Into<String>, count: usize) -> Self {
        *self.ports.entry(kind.into()).or_default() += count;
        self
    }

    pub fn instances(mut self, instances: usize) -> Self {
        self.instances = instances;
        self
    }

    /// Allow instances of this type to be removed when left unconnected.
    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }

    pub fn loops(mut self, loops: bool) -> Self {
        self.loops = loops;
        self
    }

    pub fn connections(mut self, connections: ConnectionCount) -> Self {
        self.connections = connections;
        self
    }

    /// Number of ports of a single instance.
    pub fn n_ports(&self) -> usize {
        self.ports.values().sum()
    }
}

/// A problem instance: the full catalog of an architecture synthesis run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Names of the port types.
    pub port_types: Vec<String>,
    pub components: Vec<ComponentType>,
    /// Unordered pairs of port types that may be connected.
    pub compatible: Vec<(String, String)>,
    #[serde(default)]
    pub lines: Vec<LineConstraint>,
    /// Require every architecture to be a connected graph.
    #[serde(default)]
    pub connected: bool,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn port_type(mut self, name: impl Into<String>) -> Self {
        self.port_types.push(name.into());
        self
    }

    pub fn component(mut self, component: ComponentType) -> Self {
        self.components.push(component);
        self
    }

    pub fn compatible(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.compatible.push((a.into(), b.into()));
        self
    }

    pub fn line(mut self, from: impl Into<String>, to: impl Into<String>, rule: LineRule) -> Self {
        self.lines.push(LineConstraint {
            from: from.into(),
            to: to.into(),
            rule,
        });
        self
    }

    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }
}
