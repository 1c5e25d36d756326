//! Gate symbols and their behaviors.
//!
//! A cell is a group in the drawing tagged with the role marker. Its pins
//! are labelled wire paths inside the group; each pin label maps to the net
//! that path ended up on. At load time the cell's behavior runs once with
//! a [`Ports`] capability and wires itself into the simulation through net
//! subscriptions. Nothing about gate logic lives in this crate.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::config::MarkerConfig;
use crate::document::{Document, NodeId};
use crate::nets::{NetId, Netlist};
use crate::sim::{NetHandle, SimError, Simulation};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BehaviorError {
    #[error("no behavior registered for '{0}'")]
    UnknownBehavior(String),
    #[error("no port named '{0}'")]
    UnknownPort(String),
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Sim(#[from] SimError),
}

impl BehaviorError {
    pub fn failed(msg: impl std::fmt::Display) -> Self {
        BehaviorError::Failed(msg.to_string())
    }
}

/// A discovered gate symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub node: NodeId,
    pub name: String,
    /// Key handed to the [`BehaviorHost`].
    pub behavior: String,
    /// Pin label → net.
    pub ports: BTreeMap<String, NetId>,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

fn is_cell(doc: &Document, node: NodeId, markers: &MarkerConfig) -> bool {
    doc.attr(node, &markers.role_attr) == Some(markers.cell_role.as_str())
}

/// The closest enclosing cell, so pins of nested cells are not claimed by
/// their parents.
fn owning_cell(doc: &Document, node: NodeId, markers: &MarkerConfig) -> Option<NodeId> {
    doc.ancestors(node).find(|&a| is_cell(doc, a, markers))
}

fn behavior_key(doc: &Document, cell: NodeId, markers: &MarkerConfig) -> Option<String> {
    if let Some(key) = doc.attr(cell, &markers.behavior_attr) {
        return Some(key.trim().to_string());
    }
    doc.children(cell)
        .iter()
        .find(|&&c| doc.is_element(c, "desc"))
        .map(|&desc| doc.text_content(desc).trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Find every drawn cell and resolve its pins against `netlist`.
///
/// Cells without a behavior key are skipped with a warning, as are pins
/// whose path did not decode.
pub fn discover(doc: &Document, netlist: &Netlist, markers: &MarkerConfig) -> Vec<Cell> {
    let mut cells = Vec::new();
    for node in doc.descendants(doc.root()) {
        if !is_cell(doc, node, markers) || !doc.is_rendered(node) {
            continue;
        }
        let name = doc
            .first_attr(node, &markers.name_attrs)
            .map(str::to_string)
            .unwrap_or_else(|| format!("cell{}", cells.len()));
        let Some(behavior) = behavior_key(doc, node, markers) else {
            clilog::warn!("cell '{name}' ({}) has no behavior; skipping", doc.describe(node));
            continue;
        };

        let mut ports = BTreeMap::new();
        for pin in doc.descendants(node) {
            if !doc.is_element(pin, "path") || owning_cell(doc, pin, markers) != Some(node) {
                continue;
            }
            let Some(label) = doc.first_attr(pin, &markers.pin_attrs) else {
                continue;
            };
            let Some(net) = netlist.net_of_node(pin) else {
                clilog::warn!("cell '{name}': pin '{label}' has no usable geometry");
                continue;
            };
            if let Some(previous) = ports.insert(label.to_string(), net) {
                if previous != net {
                    clilog::warn!(
                        "cell '{name}': pin '{label}' drawn on both {previous} and {net}; keeping {previous}"
                    );
                    ports.insert(label.to_string(), previous);
                }
            }
        }

        cells.push(Cell {
            node,
            name,
            behavior,
            ports,
        });
    }
    cells
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// What a behavior may touch: its own nets, by pin label, and the
/// scheduler through them.
///
/// The `&mut Simulation` passed to callbacks cannot mint handles for other
/// nets:
///
/// ```compile_fail
/// fn reach_elsewhere(sim: &livegate::Simulation) {
///     let _ = sim.net(1);
/// }
/// ```
pub struct Ports<'a> {
    table: &'a BTreeMap<String, NetHandle>,
    sim: &'a mut Simulation,
}

impl<'a> Ports<'a> {
    pub fn new(table: &'a BTreeMap<String, NetHandle>, sim: &'a mut Simulation) -> Self {
        Self { table, sim }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Handle for use inside subscriptions.
    pub fn port(&self, name: &str) -> Result<NetHandle, BehaviorError> {
        self.table
            .get(name)
            .copied()
            .ok_or_else(|| BehaviorError::UnknownPort(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Result<Option<bool>, BehaviorError> {
        Ok(self.port(name)?.get(&*self.sim))
    }

    pub fn set(&mut self, name: &str, value: bool) -> Result<(), BehaviorError> {
        self.port(name)?.set(self.sim, value);
        Ok(())
    }

    pub fn set_later(
        &mut self,
        name: &str,
        value: bool,
        delay: Option<u64>,
    ) -> Result<(), BehaviorError> {
        Ok(self.port(name)?.set_later(self.sim, value, delay)?)
    }

    pub fn on_change<F>(&mut self, name: &str, f: F) -> Result<(), BehaviorError>
    where
        F: FnMut(&mut Simulation) -> Result<(), SimError> + 'static,
    {
        self.port(name)?.on_change(self.sim, f);
        Ok(())
    }

    pub fn on_posedge<F>(&mut self, name: &str, f: F) -> Result<(), BehaviorError>
    where
        F: FnMut(&mut Simulation) -> Result<(), SimError> + 'static,
    {
        self.port(name)?.on_posedge(self.sim, f);
        Ok(())
    }

    pub fn on_negedge<F>(&mut self, name: &str, f: F) -> Result<(), BehaviorError>
    where
        F: FnMut(&mut Simulation) -> Result<(), SimError> + 'static,
    {
        self.port(name)?.on_negedge(self.sim, f);
        Ok(())
    }

    /// Schedule one-shot work, e.g. a source that toggles on a period.
    pub fn schedule_later<F>(&mut self, f: F, delay: Option<u64>) -> Result<(), BehaviorError>
    where
        F: FnOnce(&mut Simulation) -> Result<(), SimError> + 'static,
    {
        Ok(self.sim.schedule_later(f, delay)?)
    }
}

// ---------------------------------------------------------------------------
// Hosts
// ---------------------------------------------------------------------------

/// Runs a cell's behavior, identified by its key, exactly once.
pub trait BehaviorHost {
    fn run(&mut self, behavior: &str, ports: Ports<'_>) -> Result<(), BehaviorError>;
}

type BehaviorFn = Box<dyn FnMut(&mut Ports<'_>) -> Result<(), BehaviorError>>;

/// Behaviors as Rust closures keyed by name.
#[derive(Default)]
pub struct BehaviorRegistry {
    behaviors: HashMap<String, BehaviorFn>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, key: &str, f: F) -> &mut Self
    where
        F: FnMut(&mut Ports<'_>) -> Result<(), BehaviorError> + 'static,
    {
        self.behaviors.insert(key.to_string(), Box::new(f));
        self
    }

    pub fn with<F>(mut self, key: &str, f: F) -> Self
    where
        F: FnMut(&mut Ports<'_>) -> Result<(), BehaviorError> + 'static,
    {
        self.register(key, f);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.behaviors.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.behaviors.keys().map(String::as_str)
    }
}

impl BehaviorHost for BehaviorRegistry {
    fn run(&mut self, behavior: &str, mut ports: Ports<'_>) -> Result<(), BehaviorError> {
        let f = self
            .behaviors
            .get_mut(behavior)
            .ok_or_else(|| BehaviorError::UnknownBehavior(behavior.to_string()))?;
        f(&mut ports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nets::extract;

    const GATES: &str = r#"<svg xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape">
  <g data-role="cell" data-name="inv1">
    <desc> not </desc>
    <path data-pin="a" d="m 0,0 l 10,0"/>
    <path data-pin="y" d="m 20,0 l 10,0"/>
    <rect width="10" height="10"/>
  </g>
  <g data-role="cell" data-behavior="probe">
    <path inkscape:label="in" d="m 30,0 l 10,0"/>
    <g data-role="cell" data-behavior="inner">
      <path data-pin="q" d="m 100,100 l 1,0"/>
    </g>
  </g>
  <g data-role="cell"><path data-pin="x" d="m 500,0 l 1,0"/></g>
  <defs><g data-role="cell" data-behavior="hidden"/></defs>
</svg>"#;

    fn cells() -> Vec<Cell> {
        let doc = Document::parse(GATES).unwrap();
        let (netlist, _) = extract(&doc, 0.001);
        discover(&doc, &netlist, &MarkerConfig::default())
    }

    #[test]
    fn finds_drawn_cells_with_behaviors() {
        let cells = cells();
        let keys: Vec<_> = cells.iter().map(|c| c.behavior.as_str()).collect();
        assert_eq!(keys, vec!["not", "probe", "inner"]);
        assert_eq!(cells[0].name, "inv1");
        assert_eq!(cells[1].name, "cell1");
    }

    #[test]
    fn pins_map_to_nets() {
        let cells = cells();
        let inv = &cells[0];
        assert_eq!(inv.ports.keys().collect::<Vec<_>>(), vec!["a", "y"]);
        assert_ne!(inv.ports["a"], inv.ports["y"]);
        // inv1.y touches probe.in at (30,0).
        assert_eq!(inv.ports["y"], cells[1].ports["in"]);
    }

    #[test]
    fn nested_cells_own_their_pins() {
        let cells = cells();
        assert!(!cells[1].ports.contains_key("q"));
        assert!(cells[2].ports.contains_key("q"));
    }

    #[test]
    fn registry_runs_and_reports_unknown() {
        let mut sim = Simulation::new(1);
        let table = BTreeMap::from([("y".to_string(), sim.net(0).unwrap())]);
        let mut reg = BehaviorRegistry::new().with("high", |ports| ports.set("y", true));

        reg.run("high", Ports::new(&table, &mut sim)).unwrap();
        assert_eq!(
            reg.run("nope", Ports::new(&table, &mut sim)),
            Err(BehaviorError::UnknownBehavior("nope".into()))
        );
        sim.advance_timestep().unwrap();
        assert_eq!(sim.net_values(), vec![Some(true)]);
    }

    #[test]
    fn unknown_port_is_an_error() {
        let mut sim = Simulation::new(0);
        let table = BTreeMap::new();
        let mut ports = Ports::new(&table, &mut sim);
        assert_eq!(
            ports.set("missing", true),
            Err(BehaviorError::UnknownPort("missing".into()))
        );
        assert!(!ports.has("missing"));
    }
}
