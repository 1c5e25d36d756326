//! `<use>` instance flattening.
//!
//! Every reference is expanded into an owned copy of its target so later
//! stages only ever see plain geometry. Work happens in two phases: a plan
//! is computed from an immutable view of the document (targets, their
//! nested references, a dependency order), then the plan is applied. The
//! order guarantees a definition is only copied once its own references
//! have been expanded, so copies never contain references.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::document::{local_name, Document, NodeId};
use crate::geometry::Matrix;
use crate::transform::format_matrix;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlattenError {
    #[error("{reference}: <use> has no href")]
    MissingHref { reference: String },
    #[error("{reference}: <use> target '{target}' does not exist")]
    MissingTarget { reference: String, target: String },
    #[error("reference cycle: {}", chain.join(" -> "))]
    ReferenceCycle { chain: Vec<String> },
}

/// Attributes that only make sense on a `<use>`; dropped when it becomes a
/// group.
const USE_ONLY_ATTRS: &[&str] = &["href", "xlink:href", "x", "y", "width", "height"];

/// What a flatten pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenReport {
    /// References expanded.
    pub references: usize,
    /// Distinct definitions that were referenced.
    pub definitions: usize,
}

/// Result of the planning phase.
#[derive(Debug, Clone)]
pub struct FlattenPlan {
    /// Every reference and the element it resolves to.
    targets: BTreeMap<NodeId, NodeId>,
    /// Definitions in dependency order: dependencies first.
    order: Vec<NodeId>,
}

impl FlattenPlan {
    pub fn reference_count(&self) -> usize {
        self.targets.len()
    }

    pub fn order(&self) -> &[NodeId] {
        &self.order
    }
}

fn href(doc: &Document, id: NodeId) -> Option<&str> {
    doc.attr(id, "href").or_else(|| doc.attr(id, "xlink:href"))
}

fn resolve(doc: &Document, reference: NodeId) -> Result<NodeId, FlattenError> {
    let Some(raw) = href(doc, reference) else {
        return Err(FlattenError::MissingHref {
            reference: doc.describe(reference),
        });
    };
    let ident = raw.trim().strip_prefix('#').unwrap_or(raw.trim());
    doc.element_by_id(ident)
        .ok_or_else(|| FlattenError::MissingTarget {
            reference: doc.describe(reference),
            target: raw.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

struct Ordering<'a> {
    doc: &'a Document,
    deps: &'a BTreeMap<NodeId, BTreeSet<NodeId>>,
    marks: BTreeMap<NodeId, Mark>,
    stack: Vec<NodeId>,
    order: Vec<NodeId>,
}

impl Ordering<'_> {
    fn visit(&mut self, def: NodeId) -> Result<(), FlattenError> {
        match self.marks.get(&def) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = self.stack.iter().position(|&n| n == def).unwrap_or(0);
                let chain = self.stack[start..]
                    .iter()
                    .chain(std::iter::once(&def))
                    .map(|&n| self.doc.describe(n))
                    .collect();
                return Err(FlattenError::ReferenceCycle { chain });
            }
            None => {}
        }

        self.marks.insert(def, Mark::InProgress);
        self.stack.push(def);
        let deps = self.deps;
        if let Some(children) = deps.get(&def) {
            for &dep in children {
                self.visit(dep)?;
            }
        }
        self.stack.pop();
        self.marks.insert(def, Mark::Done);
        self.order.push(def);
        Ok(())
    }
}

/// Resolve every reference and order the definitions.
pub fn plan(doc: &Document) -> Result<FlattenPlan, FlattenError> {
    let mut targets = BTreeMap::new();
    for reference in doc.elements_named("use") {
        targets.insert(reference, resolve(doc, reference)?);
    }

    // A definition depends on whatever the references inside it (itself
    // included, for a `<use>` pointing at another `<use>`) resolve to.
    let definitions: BTreeSet<NodeId> = targets.values().copied().collect();
    let mut deps: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    for &def in &definitions {
        let nested = doc
            .descendants(def)
            .into_iter()
            .filter_map(|n| targets.get(&n).copied())
            .collect();
        deps.insert(def, nested);
    }

    // Virtual root: every definition, in document order.
    let mut ordering = Ordering {
        doc,
        deps: &deps,
        marks: BTreeMap::new(),
        stack: Vec::new(),
        order: Vec::new(),
    };
    for &def in &definitions {
        ordering.visit(def)?;
    }

    Ok(FlattenPlan {
        targets,
        order: ordering.order,
    })
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

fn coordinate(doc: &Document, id: NodeId, key: &str) -> f64 {
    match doc.attr(id, key).map(|v| v.trim().parse::<f64>()) {
        Some(Ok(v)) => v,
        Some(Err(_)) => {
            clilog::warn!("{}: ignoring non-numeric {key}", doc.describe(id));
            0.0
        }
        None => 0.0,
    }
}

/// Turn `reference` into a `<g>` holding a stripped copy of `target`.
///
/// The node keeps its id in the arena, so ids from the plan stay valid.
fn expand(doc: &mut Document, reference: NodeId, target: NodeId) {
    let (x, y) = (
        coordinate(doc, reference, "x"),
        coordinate(doc, reference, "y"),
    );
    if x != 0.0 || y != 0.0 {
        let base = doc
            .local_transforms(reference)
            .iter()
            .fold(Matrix::IDENTITY, |acc, m| acc.multiply(m));
        let placed = base.multiply(&Matrix::translate(x, y));
        doc.set_attr(reference, "transform", &format_matrix(&placed));
    }
    for key in USE_ONLY_ATTRS {
        doc.remove_attr(reference, key);
    }

    let group_name = match doc.name(reference) {
        Some(name) if name != local_name(name) => {
            format!("{}g", &name[..name.len() - local_name(name).len()])
        }
        _ => "g".to_string(),
    };
    doc.rename(reference, &group_name);

    let copy = doc.deep_clone(target);
    doc.strip_ids(copy);
    doc.clear_children(reference);
    doc.append_child(reference, copy);
}

/// Carry out a plan computed on this same document.
pub fn apply(doc: &mut Document, plan: &FlattenPlan) -> FlattenReport {
    let mut by_target: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for (&reference, &target) in &plan.targets {
        by_target.entry(target).or_default().push(reference);
    }

    for def in &plan.order {
        for &reference in by_target.get(def).into_iter().flatten() {
            expand(doc, reference, *def);
        }
    }

    FlattenReport {
        references: plan.targets.len(),
        definitions: plan.order.len(),
    }
}

/// Plan and apply in one go.
pub fn flatten(doc: &mut Document) -> Result<FlattenReport, FlattenError> {
    let plan = plan(doc)?;
    let report = apply(doc, &plan);
    clilog::info!(
        "flattened {} references to {} definitions",
        report.references,
        report.definitions
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::decode_points;

    fn rendered_points(doc: &Document) -> Vec<(i64, i64)> {
        let mut pts: Vec<(i64, i64)> = doc
            .elements_named("path")
            .into_iter()
            .filter(|&p| doc.is_rendered(p))
            .flat_map(|p| {
                let m = doc.accumulated_transform(p);
                decode_points(doc.attr(p, "d").unwrap_or(""), &m).unwrap()
            })
            .map(|p| ((p.x * 1000.0).round() as i64, (p.y * 1000.0).round() as i64))
            .collect();
        pts.sort();
        pts
    }

    const NESTED: &str = r##"<svg xmlns:xlink="http://www.w3.org/1999/xlink">
  <defs>
    <g id="stub"><path d="m 0,0 l 5,0"/></g>
    <g id="pair">
      <use xlink:href="#stub"/>
      <use xlink:href="#stub" transform="translate(0,10)"/>
    </g>
  </defs>
  <use xlink:href="#pair" transform="translate(100,0)"/>
  <use href="#stub" x="7" y="3"/>
</svg>"##;

    #[test]
    fn nested_references_are_fully_expanded() {
        let mut doc = Document::parse(NESTED).unwrap();
        let report = flatten(&mut doc).unwrap();
        assert_eq!(report.references, 4);
        assert_eq!(report.definitions, 2);
        assert!(doc.elements_named("use").is_empty());
        assert_eq!(
            rendered_points(&doc),
            vec![
                (7000, 3000),
                (12000, 3000),
                (100000, 0),
                (100000, 10000),
                (105000, 0),
                (105000, 10000),
            ]
        );
    }

    #[test]
    fn copies_carry_no_ids() {
        let mut doc = Document::parse(NESTED).unwrap();
        flatten(&mut doc).unwrap();
        let svg = doc.svg_element().unwrap();
        let ids: Vec<_> = doc
            .descendants(svg)
            .into_iter()
            .filter_map(|n| doc.attr(n, "id"))
            .collect();
        assert_eq!(ids, vec!["stub", "pair"]);
    }

    #[test]
    fn source_order_does_not_matter() {
        // Same drawing with the definitions and references reversed.
        let reordered = r##"<svg>
  <use href="#stub" x="7" y="3"/>
  <use href="#pair" transform="translate(100,0)"/>
  <defs>
    <g id="pair">
      <use href="#stub" transform="translate(0,10)"/>
      <use href="#stub"/>
    </g>
    <g id="stub"><path d="m 0,0 l 5,0"/></g>
  </defs>
</svg>"##;
        let mut a = Document::parse(NESTED).unwrap();
        let mut b = Document::parse(reordered).unwrap();
        flatten(&mut a).unwrap();
        flatten(&mut b).unwrap();
        assert_eq!(rendered_points(&a), rendered_points(&b));
    }

    #[test]
    fn use_of_a_use() {
        let src = r##"<svg>
  <defs><path id="w" d="m 0,0 l 1,0"/></defs>
  <use id="first" href="#w" transform="translate(10,0)"/>
  <use href="#first" transform="translate(0,10)"/>
</svg>"##;
        let mut doc = Document::parse(src).unwrap();
        flatten(&mut doc).unwrap();
        assert!(doc.elements_named("use").is_empty());
        assert_eq!(
            rendered_points(&doc),
            vec![(10000, 0), (10000, 10000), (11000, 0), (11000, 10000)]
        );
    }

    #[test]
    fn missing_target_is_fatal() {
        let mut doc = Document::parse(r##"<svg><use href="#nope"/></svg>"##).unwrap();
        assert!(matches!(
            flatten(&mut doc),
            Err(FlattenError::MissingTarget { target, .. }) if target == "#nope"
        ));
    }

    #[test]
    fn cycles_are_reported() {
        let src = r##"<svg>
  <g id="a"><use href="#b"/></g>
  <g id="b"><use href="#a"/></g>
</svg>"##;
        let mut doc = Document::parse(src).unwrap();
        match flatten(&mut doc) {
            Err(FlattenError::ReferenceCycle { chain }) => {
                assert_eq!(chain.first(), chain.last());
                assert!(chain.len() >= 3);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut doc = Document::parse(r##"<svg><g id="a"><use href="#a"/></g></svg>"##).unwrap();
        assert!(matches!(
            flatten(&mut doc),
            Err(FlattenError::ReferenceCycle { .. })
        ));
    }

    #[test]
    fn plan_orders_dependencies_first() {
        let doc = Document::parse(NESTED).unwrap();
        let plan = plan(&doc).unwrap();
        let stub = doc.element_by_id("stub").unwrap();
        let pair = doc.element_by_id("pair").unwrap();
        assert_eq!(plan.order(), &[stub, pair]);
        assert_eq!(plan.reference_count(), 4);
    }
}
