//! LiveGate — turn hand-drawn SVG logic schematics into steppable digital
//! circuit simulations.
//!
//! # Modules
//!
//! - [`geometry`] — affine matrices and tolerant point equality
//! - [`transform`] — nom parser for the SVG `transform` attribute
//! - [`path`] — path-data decoding for wires (move-to + relative line-to)
//! - [`document`] — arena-backed SVG tree
//! - [`xml`] — nom-based XML reader and writer for [`Document`]
//! - [`flatten`] — `<use>` instance expansion in dependency order
//! - [`nets`] — connectivity from coincident wire vertices
//! - [`sim`] — discrete-event scheduler and net signal state
//! - [`cell`] — gate symbols, port tables and behavior hosting
//! - [`schematic`] — load pipeline and the [`LiveCircuit`] stepping façade
//! - [`config`] — YAML configuration
//!
//! # Example
//!
//! ```no_run
//! use livegate::{BehaviorRegistry, LiveCircuit, LiveGateConfig};
//!
//! let svg = std::fs::read_to_string("schematic.svg").unwrap();
//! let mut behaviors = BehaviorRegistry::new()
//!     .with("high", |ports| ports.set("y", true));
//! let mut circuit = LiveCircuit::load(&svg, &mut behaviors, &LiveGateConfig::default()).unwrap();
//! circuit.advance_timestep().unwrap();
//! println!("{:?}", circuit.net_values());
//! ```

pub mod cell;
pub mod config;
pub mod document;
pub mod flatten;
pub mod geometry;
pub mod nets;
pub mod path;
pub mod schematic;
pub mod sim;
pub mod transform;
pub mod xml;

pub use cell::{BehaviorError, BehaviorHost, BehaviorRegistry, Cell, Ports};
pub use config::LiveGateConfig;
pub use document::{Document, NodeId};
pub use nets::{NetId, NetReport, Netlist};
pub use schematic::{LiveCircuit, LoadError, Schematic};
pub use sim::{NetHandle, SimError, Simulation};
