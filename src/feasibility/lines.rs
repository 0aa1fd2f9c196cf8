//! Line connectivity.
//!
//! A line leaves a port `p` through the port `q` it is paired with. While
//! `q` belongs to a two-port component, the line passes through it and
//! continues from the other port of that component. It ends at the first
//! port whose component has any other number of ports.

use crate::{
    port_model::{LineMatrix, PortModel},
    problem::LineRule,
};

/// The port where the line leaving `port` ends.
///
/// `None` if `port` is unpaired or the line runs in a cycle.
pub fn line_end(model: &PortModel, partners: &[Option<usize>], port: usize) -> Option<usize> {
    let mut end = partners[port]?;
    for _ in 0..model.n_ports() {
        let ports = model.component_ports(model.component_of(end));
        if ports.len() != 2 {
            return Some(end);
        }
        let through = if end == ports.start { ports.start + 1 } else { ports.start };
        end = partners[through]?;
    }
    None
}

/// Whether every line satisfies the rules of `lines`.
pub fn satisfies(model: &PortModel, lines: &LineMatrix, partners: &[Option<usize>]) -> bool {
    (0..model.n_ports())
        .filter(|&p| lines.is_constrained(p))
        .all(|p| match line_end(model, partners, p) {
            Some(q) => match lines.get(p, q) {
                Some(LineRule::Forbidden) => false,
                Some(LineRule::Required) => true,
                None => !lines.has_required(p),
            },
            None => !lines.has_required(p),
        })
}
