//! Net extraction from wire geometry.
//!
//! Connectivity is purely geometric: every decoded vertex of a wire is
//! dropped into a location cluster, and all wires touching one cluster end
//! up on one net. A vertex within tolerance of several clusters joins them
//! into one, so a cluster is the transitive closure of "coincides with" and
//! does not depend on the order segments are visited in.

use serde::Serialize;

use crate::document::{Document, NodeId};
use crate::geometry::Point;
use crate::path::PathError;

/// Dense net index, stable for the lifetime of a [`Netlist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NetId(usize);

impl NetId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A decoded wire.
#[derive(Debug, Clone, PartialEq)]
pub struct WireSegment {
    pub node: Option<NodeId>,
    /// `#id` or `path[index]`, for reports.
    pub label: String,
    /// Absolute vertices in drawing order.
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedPath {
    pub node: NodeId,
    pub label: String,
    pub reason: PathError,
}

/// Outcome of decoding the drawn paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionReport {
    pub decoded: usize,
    pub rejected: Vec<RejectedPath>,
}

// ---------------------------------------------------------------------------
// Clustering & merging
// ---------------------------------------------------------------------------

struct Cluster {
    points: Vec<Point>,
    segments: Vec<usize>,
}

impl Cluster {
    fn touches(&self, p: &Point, tolerance: f64) -> bool {
        self.points.iter().any(|q| q.coincides_within(p, tolerance))
    }
}

fn cluster(segments: &[WireSegment], tolerance: f64) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    for (i, seg) in segments.iter().enumerate() {
        for p in &seg.points {
            let mut joined = Cluster {
                points: vec![*p],
                segments: vec![i],
            };
            // Pull out every cluster this vertex touches and fold them into one.
            let mut k = 0;
            while k < clusters.len() {
                if clusters[k].touches(p, tolerance) {
                    let c = clusters.swap_remove(k);
                    joined.points.extend(c.points);
                    joined.segments.extend(c.segments);
                } else {
                    k += 1;
                }
            }
            clusters.push(joined);
        }
    }
    clusters
}

/// Nets under construction. A net absorbed by a merge is left empty.
struct NetBuilder {
    members: Vec<Vec<usize>>,
    owner: Vec<Option<usize>>,
}

impl NetBuilder {
    fn new(segment_count: usize) -> Self {
        Self {
            members: Vec::new(),
            owner: vec![None; segment_count],
        }
    }

    fn create(&mut self) -> usize {
        self.members.push(Vec::new());
        self.members.len() - 1
    }

    /// Put `seg` on `net`, pulling in whatever net it was already on.
    fn add(&mut self, net: usize, seg: usize) {
        match self.owner[seg] {
            Some(current) if current == net => {}
            Some(current) => self.merge(net, current),
            None => {
                self.members[net].push(seg);
                self.owner[seg] = Some(net);
            }
        }
    }

    /// Move every member of `from` into `into`.
    fn merge(&mut self, into: usize, from: usize) {
        if into == from {
            return;
        }
        for seg in std::mem::take(&mut self.members[from]) {
            self.owner[seg] = Some(into);
            if !self.members[into].contains(&seg) {
                self.members[into].push(seg);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Netlist
// ---------------------------------------------------------------------------

/// Partition of wire segments into nets.
#[derive(Debug, Clone)]
pub struct Netlist {
    segments: Vec<WireSegment>,
    segment_net: Vec<NetId>,
    nets: Vec<Vec<usize>>,
}

impl Netlist {
    /// Partition already-decoded segments.
    pub fn from_segments(segments: Vec<WireSegment>, tolerance: f64) -> Self {
        let mut builder = NetBuilder::new(segments.len());
        for c in cluster(&segments, tolerance) {
            let net = builder.create();
            for seg in c.segments {
                builder.add(net, seg);
            }
        }
        for seg in 0..segments.len() {
            if builder.owner[seg].is_none() {
                let net = builder.create();
                builder.add(net, seg);
            }
        }

        // Compact: number surviving nets by their first segment.
        let mut dense: Vec<Option<NetId>> = vec![None; builder.members.len()];
        let mut nets: Vec<Vec<usize>> = Vec::new();
        let mut segment_net = Vec::with_capacity(segments.len());
        for seg in 0..segments.len() {
            let raw = builder.owner[seg].unwrap_or_default();
            let id = *dense[raw].get_or_insert_with(|| {
                nets.push(Vec::new());
                NetId(nets.len() - 1)
            });
            nets[id.0].push(seg);
            segment_net.push(id);
        }

        Self {
            segments,
            segment_net,
            nets,
        }
    }

    pub fn segments(&self) -> &[WireSegment] {
        &self.segments
    }

    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    pub fn net_ids(&self) -> impl Iterator<Item = NetId> {
        (0..self.nets.len()).map(NetId)
    }

    /// Segment indices on `net`, ascending.
    pub fn members(&self, net: NetId) -> &[usize] {
        &self.nets[net.0]
    }

    pub fn net_of(&self, segment: usize) -> NetId {
        self.segment_net[segment]
    }

    pub fn net_of_node(&self, node: NodeId) -> Option<NetId> {
        self.segments
            .iter()
            .position(|s| s.node == Some(node))
            .map(|i| self.segment_net[i])
    }

    /// Labels of the segments on `net`.
    pub fn labels(&self, net: NetId) -> Vec<&str> {
        self.members(net)
            .iter()
            .map(|&i| self.segments[i].label.as_str())
            .collect()
    }
}

/// Decode every drawn `<path>` and partition the result.
pub fn extract(doc: &Document, tolerance: f64) -> (Netlist, ExtractionReport) {
    let mut segments = Vec::new();
    let mut report = ExtractionReport::default();

    for node in doc.elements_named("path") {
        if !doc.is_rendered(node) {
            continue;
        }
        let label = doc.describe(node);
        match doc.path_points(node) {
            Ok(points) => {
                report.decoded += 1;
                segments.push(WireSegment {
                    node: Some(node),
                    label,
                    points,
                });
            }
            Err(reason) => {
                clilog::warn!("{label}: {reason}; skipping path");
                report.rejected.push(RejectedPath {
                    node,
                    label,
                    reason,
                });
            }
        }
    }

    let netlist = Netlist::from_segments(segments, tolerance);
    clilog::info!(
        "{} paths on {} nets ({} rejected)",
        report.decoded,
        netlist.net_count(),
        report.rejected.len()
    );
    (netlist, report)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetEntry {
    pub net: usize,
    pub segments: Vec<String>,
    pub value: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedEntry {
    pub path: String,
    pub reason: String,
}

/// Serializable view of a netlist, optionally with signal values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetReport {
    pub nets: Vec<NetEntry>,
    pub rejected: Vec<RejectedEntry>,
}

impl NetReport {
    /// `values` is indexed by net; missing entries are reported as unset.
    pub fn new(netlist: &Netlist, report: &ExtractionReport, values: &[Option<bool>]) -> Self {
        let nets = netlist
            .net_ids()
            .map(|id| NetEntry {
                net: id.index(),
                segments: netlist.labels(id).into_iter().map(String::from).collect(),
                value: values.get(id.index()).copied().flatten(),
            })
            .collect();
        let rejected = report
            .rejected
            .iter()
            .map(|r| RejectedEntry {
                path: r.label.clone(),
                reason: r.reason.to_string(),
            })
            .collect();
        Self { nets, rejected }
    }
}
