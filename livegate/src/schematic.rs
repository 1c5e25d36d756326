//! Load pipeline and the stepping façade used by the host.
//!
//! ```text
//! SVG text ─► Document ─► flatten ─► extract nets ─► discover cells
//!                                                        │
//!                                   Simulation ◄─ run behaviors once
//! ```
//!
//! [`Schematic`] is the static result of the first four stages and can be
//! inspected without running anything (the CLI does this). [`LiveCircuit`]
//! adds the simulation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cell::{discover, BehaviorError, BehaviorHost, Cell, Ports};
use crate::config::{ConfigError, LiveGateConfig};
use crate::document::{Document, NodeId};
use crate::flatten::{flatten, FlattenError, FlattenReport};
use crate::nets::{extract, ExtractionReport, NetId, NetReport, Netlist};
use crate::sim::{NetHandle, SimError, Simulation};
use crate::xml::XmlError;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("document has no <svg> element")]
    NotSvg,
    #[error(transparent)]
    Flatten(#[from] FlattenError),
    #[error("cell '{cell}' failed to initialize: {source}")]
    Behavior {
        cell: String,
        source: BehaviorError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Schematic
// ---------------------------------------------------------------------------

/// A flattened drawing with its nets and cells.
#[derive(Debug, Clone)]
pub struct Schematic {
    document: Document,
    flatten: FlattenReport,
    netlist: Netlist,
    extraction: ExtractionReport,
    cells: Vec<Cell>,
}

impl Schematic {
    pub fn parse(src: &str, config: &LiveGateConfig) -> Result<Self, LoadError> {
        let timer = clilog::stimer!("parse");
        let document = Document::parse(src)?;
        clilog::finish!(timer);
        Self::from_document(document, config)
    }

    pub fn open(path: impl AsRef<Path>, config: &LiveGateConfig) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&src, config)
    }

    pub fn from_document(mut document: Document, config: &LiveGateConfig) -> Result<Self, LoadError> {
        if document.svg_element().is_none() {
            return Err(LoadError::NotSvg);
        }

        let timer = clilog::stimer!("flatten");
        let flatten = flatten(&mut document)?;
        clilog::finish!(timer);

        let timer = clilog::stimer!("extract nets");
        let (netlist, extraction) = extract(&document, config.tolerance);
        clilog::finish!(timer);

        let cells = discover(&document, &netlist, &config.markers);
        clilog::info!(
            "schematic: {} references expanded, {} nets, {} cells",
            flatten.references,
            netlist.net_count(),
            cells.len()
        );

        Ok(Self {
            document,
            flatten,
            netlist,
            extraction,
            cells,
        })
    }

    /// The flattened document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn flatten_report(&self) -> &FlattenReport {
        &self.flatten
    }

    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    pub fn extraction(&self) -> &ExtractionReport {
        &self.extraction
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn net_report(&self, values: &[Option<bool>]) -> NetReport {
        NetReport::new(&self.netlist, &self.extraction, values)
    }

    /// Build the simulation and run every cell's behavior once.
    ///
    /// Stops at the first failing cell; later cells are not initialized.
    pub fn start(
        self,
        host: &mut dyn BehaviorHost,
        config: &LiveGateConfig,
    ) -> Result<LiveCircuit, LoadError> {
        let timer = clilog::stimer!("initialize cells");
        let mut sim =
            Simulation::new(self.netlist.net_count()).with_round_limit(config.max_micro_rounds);

        for cell in &self.cells {
            let table: BTreeMap<String, NetHandle> = cell
                .ports
                .iter()
                .filter_map(|(label, net)| sim.net(net.index()).map(|h| (label.clone(), h)))
                .collect();
            clilog::debug!(
                "cell '{}': behavior '{}' with ports {:?}",
                cell.name,
                cell.behavior,
                table.keys().collect::<Vec<_>>()
            );
            host.run(&cell.behavior, Ports::new(&table, &mut sim))
                .map_err(|source| LoadError::Behavior {
                    cell: cell.name.clone(),
                    source,
                })?;
        }
        clilog::finish!(timer);

        Ok(LiveCircuit {
            schematic: self,
            sim,
        })
    }
}

// ---------------------------------------------------------------------------
// LiveCircuit
// ---------------------------------------------------------------------------

/// A schematic whose cells are wired into a running simulation.
#[derive(Debug)]
pub struct LiveCircuit {
    schematic: Schematic,
    sim: Simulation,
}

impl LiveCircuit {
    /// Parse, flatten, extract and initialize in one go.
    pub fn load(
        src: &str,
        host: &mut dyn BehaviorHost,
        config: &LiveGateConfig,
    ) -> Result<Self, LoadError> {
        Schematic::parse(src, config)?.start(host, config)
    }

    pub fn schematic(&self) -> &Schematic {
        &self.schematic
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    pub fn now(&self) -> i64 {
        self.sim.now()
    }

    /// Run one timestep. Returns the timestep just completed.
    pub fn advance_timestep(&mut self) -> Result<i64, SimError> {
        self.sim.advance_timestep()
    }

    /// Current value of every net, indexed by net.
    pub fn net_values(&self) -> Vec<Option<bool>> {
        self.sim.net_values()
    }

    /// Assign a net from outside the circuit, as a stimulus. Before the
    /// first timestep the write lands at timestep 0, like a behavior's.
    ///
    /// Returns `false` for a net this circuit does not have.
    pub fn drive(&mut self, net: NetId, value: bool) -> bool {
        match self.sim.net(net.index()) {
            Some(handle) => {
                handle.set(&mut self.sim, value);
                true
            }
            None => false,
        }
    }

    pub fn value(&self, net: NetId) -> Option<bool> {
        self.sim.net(net.index()).and_then(|h| h.get(&self.sim))
    }

    /// Value of the net a drawn path belongs to, for styling it.
    pub fn path_value(&self, path: NodeId) -> Option<bool> {
        self.schematic
            .netlist
            .net_of_node(path)
            .and_then(|net| self.value(net))
    }

    pub fn net_report(&self) -> NetReport {
        self.schematic.net_report(&self.net_values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::BehaviorRegistry;

    const LATCH: &str = r##"<svg>
  <defs>
    <g id="src" data-role="cell" data-behavior="source">
      <path data-pin="y" d="m 0,0 l 10,0"/>
    </g>
  </defs>
  <use href="#src"/>
  <g data-role="cell" data-behavior="buffer">
    <path data-pin="a" d="m 10,0 l 10,0"/>
    <path data-pin="y" d="m 30,0 l 10,0"/>
  </g>
</svg>"##;

    fn registry() -> BehaviorRegistry {
        BehaviorRegistry::new()
            .with("source", |ports| ports.set("y", true))
            .with("buffer", |ports| {
                let (a, y) = (ports.port("a")?, ports.port("y")?);
                ports.on_change("a", move |sim| {
                    if let Some(v) = a.get(sim) {
                        y.set(sim, v);
                    }
                    Ok(())
                })
            })
    }

    #[test]
    fn instances_become_live_cells() {
        let config = LiveGateConfig::default();
        let mut circuit = LiveCircuit::load(LATCH, &mut registry(), &config).unwrap();
        let schematic = circuit.schematic();
        assert_eq!(schematic.flatten_report().references, 1);
        // The master in <defs> is not a cell; the instance is.
        assert_eq!(schematic.cells().len(), 2);
        assert_eq!(schematic.netlist().net_count(), 2);

        assert_eq!(circuit.net_values(), vec![None, None]);
        assert_eq!(circuit.advance_timestep().unwrap(), 0);
        assert_eq!(circuit.net_values(), vec![Some(true), Some(true)]);
    }

    #[test]
    fn unknown_behavior_names_the_cell() {
        let config = LiveGateConfig::default();
        let mut host = BehaviorRegistry::new().with("source", |_| Ok(()));
        match LiveCircuit::load(LATCH, &mut host, &config) {
            Err(LoadError::Behavior { cell, source }) => {
                assert_eq!(cell, "cell1");
                assert_eq!(source, BehaviorError::UnknownBehavior("buffer".into()));
            }
            other => panic!("expected behavior error, got {other:?}"),
        }
    }

    #[test]
    fn not_svg() {
        let config = LiveGateConfig::default();
        assert!(matches!(
            Schematic::parse("<html/>", &config),
            Err(LoadError::NotSvg)
        ));
    }

    #[test]
    fn malformed_xml() {
        let config = LiveGateConfig::default();
        assert!(matches!(
            Schematic::parse("<svg><g></svg>", &config),
            Err(LoadError::Xml(_))
        ));
    }
}
