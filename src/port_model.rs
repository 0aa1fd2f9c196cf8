//! Expansion of a [`Problem`] catalog into its port-level model.
//!
//! Every component instance is laid out as a contiguous run of ports, sorted
//! by port type. The per-type compatibility rules are replicated over all
//! instances to obtain the port compatibility matrix `A`, and the optional
//! line constraints are expanded to the port-level matrix `B`. Both are
//! immutable once built and shared by all stages of the pipeline.

use std::{collections::BTreeSet, ops::Range};

use bimap::BiBTreeMap;
use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

use crate::{
    port::{ComponentTypeId, Port, PortTypeId},
    problem::{ComponentType, ConnectionCount, LineRule, Problem},
};

/// Largest number of ports whose perfect matchings can be ranked in a `u128`.
pub const MAX_PORTS: usize = 56;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("the catalog contains no ports")]
    NoPorts,
    #[error("odd total port count {0}: no perfect matching exists")]
    OddPortCount(usize),
    #[error("{0} ports exceed the supported maximum of {MAX_PORTS}")]
    TooManyPorts(usize),
    #[error("unknown port type `{0}`")]
    UnknownPortType(String),
    #[error("port type `{0}` is declared twice")]
    DuplicatePortType(String),
    #[error("component type `{0}` is declared twice")]
    DuplicateComponentType(String),
    #[error("line constraint references undeclared port type `{0}`")]
    UnknownLinePortType(String),
    #[error("line constraint from `{0}` to `{1}` is both forbidden and required")]
    ConflictingLineRules(String, String),
    #[error("the matching cap must be positive")]
    ZeroCap,
}

/// A square boolean matrix, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdjacencyMatrix {
    n: usize,
    data: Vec<bool>,
}

impl AdjacencyMatrix {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            data: vec![false; n * n],
        }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> bool {
        self.data[i * self.n + j]
    }

    /// Set both `(i, j)` and `(j, i)`.
    pub fn set(&mut self, i: usize, j: usize) {
        self.data[i * self.n + j] = true;
        self.data[j * self.n + i] = true;
    }

    /// All `j` such that `(i, j)` is set, in increasing order.
    pub fn neighbours(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.data[i * self.n..(i + 1) * self.n]
            .iter()
            .positions(|&b| b)
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.n).all(|i| (0..i).all(|j| self.get(i, j) == self.get(j, i)))
    }
}

/// The port-level line constraint matrix `B`.
///
/// Entry `(p, q)` holds the rule that applies to a line leaving `p` and
/// ending at `q`. The matrix is not symmetric.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineMatrix {
    n: usize,
    data: Vec<Option<LineRule>>,
    /// Ports with at least one required line target
    required: Vec<bool>,
    /// Ports with at least one rule
    constrained: Vec<bool>,
}

impl LineMatrix {
    fn new(n: usize) -> Self {
        Self {
            n,
            data: vec![None; n * n],
            required: vec![false; n],
            constrained: vec![false; n],
        }
    }

    /// Set the rule from `from` to `to`. Returns `false` on a conflicting rule.
    fn set(&mut self, from: usize, to: usize, rule: LineRule) -> bool {
        let entry = &mut self.data[from * self.n + to];
        if entry.is_some_and(|existing| existing != rule) {
            return false;
        }
        *entry = Some(rule);
        self.constrained[from] = true;
        if rule == LineRule::Required {
            self.required[from] = true;
        }
        true
    }

    pub fn get(&self, from: usize, to: usize) -> Option<LineRule> {
        self.data[from * self.n + to]
    }

    pub fn is_constrained(&self, port: usize) -> bool {
        self.constrained[port]
    }

    pub fn has_required(&self, port: usize) -> bool {
        self.required[port]
    }
}

/// The expanded, immutable port model of a problem.
#[derive(Clone, Debug)]
pub struct PortModel {
    port_types: BiBTreeMap<String, PortTypeId>,
    component_types: Vec<ComponentType>,
    /// The component type of every component instance
    colors: Vec<ComponentTypeId>,
    /// The ports of every component instance
    component_ports: Vec<Range<usize>>,
    ports: Vec<Port>,
    /// Symmetry class of every port: ports at the same site share a class
    classes: Vec<usize>,
    /// Port type compatibility (may have a non-zero diagonal)
    reduced: AdjacencyMatrix,
    compatibility: AdjacencyMatrix,
    lines: Option<LineMatrix>,
    connected: bool,
}

impl PortModel {
    /// Validate `problem` and expand it to port level.
    pub fn build(problem: &Problem) -> Result<Self, ConfigurationError> {
        let mut port_types = BiBTreeMap::new();
        for name in &problem.port_types {
            let id = PortTypeId::from(port_types.len());
            if port_types.insert_no_overwrite(name.clone(), id).is_err() {
                return Err(ConfigurationError::DuplicatePortType(name.clone()));
            }
        }
        let lookup = |name: &str| {
            port_types
                .get_by_left(name)
                .copied()
                .ok_or_else(|| ConfigurationError::UnknownPortType(name.to_string()))
        };

        let mut reduced = AdjacencyMatrix::new(port_types.len());
        for (a, b) in &problem.compatible {
            reduced.set(lookup(a)?.index(), lookup(b)?.index());
        }

        let mut names = BTreeSet::new();
        let mut colors = Vec::new();
        let mut component_ports = Vec::new();
        let mut ports = Vec::new();
        let mut classes = Vec::new();
        let mut n_classes = 0;
        for (type_index, ctype) in problem.components.iter().enumerate() {
            if !names.insert(ctype.name.as_str()) {
                return Err(ConfigurationError::DuplicateComponentType(
                    ctype.name.clone(),
                ));
            }
            let kinds: Vec<(PortTypeId, usize)> = ctype
                .ports
                .iter()
                .map(|(kind, &count)| Ok((lookup(kind)?, count)))
                .collect::<Result<Vec<_>, ConfigurationError>>()?
                .into_iter()
                .filter(|&(_, count)| count > 0)
                .sorted()
                .collect();
            for _ in 0..ctype.instances {
                let component = colors.len();
                colors.push(ComponentTypeId::from(type_index));
                let start = ports.len();
                for &(kind, count) in &kinds {
                    ports.extend((0..count).map(|_| Port::new(component, kind)));
                    classes.extend((0..count).map(|_| n_classes));
                    n_classes += 1;
                }
                component_ports.push(start..ports.len());
            }
        }

        let n = ports.len();
        if n == 0 {
            return Err(ConfigurationError::NoPorts);
        }
        if n % 2 == 1 {
            return Err(ConfigurationError::OddPortCount(n));
        }
        if n > MAX_PORTS {
            return Err(ConfigurationError::TooManyPorts(n));
        }

        let mut compatibility = AdjacencyMatrix::new(n);
        for (i, p) in ports.iter().enumerate() {
            for (j, q) in ports.iter().enumerate().skip(i + 1) {
                if !reduced.get(p.kind.index(), q.kind.index()) {
                    continue;
                }
                let loops = problem.components[colors[p.component].index()].loops;
                if p.is_sibling(q) && !loops {
                    continue;
                }
                compatibility.set(i, j);
            }
        }

        let lines = if problem.lines.is_empty() {
            None
        } else {
            let mut matrix = LineMatrix::new(n);
            for constraint in &problem.lines {
                let line_lookup = |name: &String| {
                    port_types
                        .get_by_left(name)
                        .copied()
                        .ok_or_else(|| ConfigurationError::UnknownLinePortType(name.clone()))
                };
                let from = line_lookup(&constraint.from)?;
                let to = line_lookup(&constraint.to)?;
                for (p, q) in (0..n).cartesian_product(0..n) {
                    if p == q || ports[p].kind != from || ports[q].kind != to {
                        continue;
                    }
                    if !matrix.set(p, q, constraint.rule) {
                        return Err(ConfigurationError::ConflictingLineRules(
                            constraint.from.clone(),
                            constraint.to.clone(),
                        ));
                    }
                }
            }
            Some(matrix)
        };

        debug!(
            n_ports = n,
            n_components = colors.len(),
            n_classes,
            "expanded port model"
        );
        Ok(Self {
            port_types,
            component_types: problem.components.clone(),
            colors,
            component_ports,
            ports,
            classes,
            reduced,
            compatibility,
            lines,
            connected: problem.connected,
        })
    }

    pub fn n_ports(&self) -> usize {
        self.ports.len()
    }

    pub fn n_components(&self) -> usize {
        self.colors.len()
    }

    pub fn n_port_types(&self) -> usize {
        self.port_types.len()
    }

    pub fn port(&self, port: usize) -> Port {
        self.ports[port]
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// The component instance that owns `port` (the map `phi`).
    pub fn component_of(&self, port: usize) -> usize {
        self.ports[port].component
    }

    /// The ports of a component instance.
    pub fn component_ports(&self, component: usize) -> Range<usize> {
        self.component_ports[component].clone()
    }

    /// The symmetry class of every port.
    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    /// The component type of every component instance.
    pub fn colors(&self) -> &[ComponentTypeId] {
        &self.colors
    }

    pub fn color(&self, component: usize) -> ComponentTypeId {
        self.colors[component]
    }

    pub fn component_type(&self, id: ComponentTypeId) -> &ComponentType {
        &self.component_types[id.index()]
    }

    /// The component type of a component instance.
    pub fn type_of(&self, component: usize) -> &ComponentType {
        self.component_type(self.colors[component])
    }

    pub fn port_type_name(&self, id: PortTypeId) -> Option<&str> {
        self.port_types.get_by_right(&id).map(String::as_str)
    }

    /// The port compatibility matrix `A`.
    pub fn compatibility(&self) -> &AdjacencyMatrix {
        &self.compatibility
    }

    /// The port type compatibility, before expansion.
    pub fn type_compatibility(&self) -> &AdjacencyMatrix {
        &self.reduced
    }

    /// The line constraint matrix `B`, if any line constraints were declared.
    pub fn lines(&self) -> Option<&LineMatrix> {
        self.lines.as_ref()
    }

    /// Whether any component type constrains its number of connections.
    pub fn has_connection_constraints(&self) -> bool {
        self.component_types
            .iter()
            .any(|c| c.connections != ConnectionCount::Any)
    }

    pub fn requires_connected(&self) -> bool {
        self.connected
    }
}
