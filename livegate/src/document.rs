//! Arena-backed SVG document tree.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`], so the
//! flattener can rewrite the tree while holding ids from an earlier
//! snapshot. Detached nodes (fresh clones not yet appended) simply have no
//! parent and are invisible to tree walks that start at the root.

use crate::geometry::{Matrix, Point};
use crate::path::{decode_points, PathError};
use crate::transform::parse_transform_list;

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The virtual document node above the `<svg>` element.
    Root,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Elements whose subtrees are never drawn. Geometry inside them is a
/// definition, not part of the schematic.
const NON_RENDERED: &[&str] = &["defs", "symbol", "clipPath", "mask", "marker", "pattern"];

/// An SVG document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip a namespace prefix: `svg:path` → `path`.
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, l)| l).unwrap_or(name)
}

impl Document {
    /// An empty document holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.data(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    /// The first `<svg>` element under the root, if any.
    pub fn svg_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&c| self.is_element(c, "svg"))
    }

    /// Pre-order walk of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// All attached elements with the given local name, in document order.
    pub fn elements_named(&self, name: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&n| self.is_element(n, name))
            .collect()
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    // -----------------------------------------------------------------------
    // Elements & attributes
    // -----------------------------------------------------------------------

    /// Element name as written (including any prefix).
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId, local: &str) -> bool {
        self.name(id).map(local_name) == Some(local)
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match self.kind(id) {
            NodeKind::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First present attribute among `keys`.
    pub fn first_attr(&self, id: NodeId, keys: &[String]) -> Option<&str> {
        keys.iter().find_map(|k| self.attr(id, k))
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.data_mut(id).kind {
            match attrs.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value.to_string(),
                None => attrs.push((key.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, key: &str) -> Option<String> {
        if let NodeKind::Element { attrs, .. } = &mut self.data_mut(id).kind {
            if let Some(pos) = attrs.iter().position(|(k, _)| k == key) {
                return Some(attrs.remove(pos).1);
            }
        }
        None
    }

    pub fn rename(&mut self, id: NodeId, new_name: &str) {
        if let NodeKind::Element { name, .. } = &mut self.data_mut(id).kind {
            *name = new_name.to_string();
        }
    }

    /// Attached element whose `id` attribute equals `ident`.
    pub fn element_by_id(&self, ident: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&n| self.attr(n, "id") == Some(ident))
    }

    /// Concatenated text and CDATA below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match self.kind(n) {
                NodeKind::Text(t) | NodeKind::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Human-readable handle for diagnostics: the `id` attribute if present,
    /// otherwise `name[index]`.
    pub fn describe(&self, id: NodeId) -> String {
        match (self.attr(id, "id"), self.name(id)) {
            (Some(ident), _) => format!("#{ident}"),
            (None, Some(name)) => format!("{name}[{}]", id.0),
            (None, None) => format!("node[{}]", id.0),
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// A detached element with no attributes.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push_node(NodeKind::Element {
            name: name.to_string(),
            attrs: Vec::new(),
        })
    }

    /// A detached text/comment/CDATA node.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        self.push_node(kind)
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.parent(child).is_none(), "child is already attached");
        self.data_mut(child).parent = Some(parent);
        self.data_mut(parent).children.push(child);
    }

    /// Detach every child of `id`. The children stay in the arena.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.data_mut(id).children);
        for c in children {
            self.data_mut(c).parent = None;
        }
    }

    /// Detached deep copy of the subtree at `id`.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let copy = self.push_node(self.kind(id).clone());
        let children = self.children(id).to_vec();
        for c in children {
            let cc = self.deep_clone(c);
            self.append_child(copy, cc);
        }
        copy
    }

    /// Remove the `id` attribute from every element in the subtree.
    pub fn strip_ids(&mut self, id: NodeId) {
        for n in self.descendants(id) {
            self.remove_attr(n, "id");
        }
    }

    // -----------------------------------------------------------------------
    // Geometry
    // -----------------------------------------------------------------------

    /// Transform entries declared on the node itself.
    ///
    /// A malformed attribute is reported and treated as having no entries.
    pub fn local_transforms(&self, id: NodeId) -> Vec<Matrix> {
        let Some(src) = self.attr(id, "transform") else {
            return Vec::new();
        };
        match parse_transform_list(src) {
            Ok(list) => list,
            Err(e) => {
                clilog::warn!("{}: {e}; ignoring transform", self.describe(id));
                Vec::new()
            }
        }
    }

    /// Matrix from the node's coordinates to root coordinates.
    ///
    /// Zero or one transform entry per node is supported. A node with more
    /// than one entry falls back to its parent's matrix with a warning.
    pub fn accumulated_transform(&self, id: NodeId) -> Matrix {
        let parent = match self.parent(id) {
            Some(p) => self.accumulated_transform(p),
            None => Matrix::IDENTITY,
        };
        let entries = self.local_transforms(id);
        match entries.as_slice() {
            [] => parent,
            [m] => parent.multiply(m),
            _ => {
                clilog::warn!(
                    "{}: {} transform entries, expected at most one; using parent transform",
                    self.describe(id),
                    entries.len()
                );
                parent
            }
        }
    }

    /// Absolute points of a `<path>` element's `d` attribute. A missing
    /// attribute is an empty path.
    pub fn path_points(&self, id: NodeId) -> Result<Vec<Point>, PathError> {
        decode_points(self.attr(id, "d").unwrap_or(""), &self.accumulated_transform(id))
    }

    /// Whether the node is drawn (not inside `<defs>`, `<symbol>` and the
    /// like).
    pub fn is_rendered(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .all(|n| !NON_RENDERED.iter().any(|nr| self.is_element(n, nr)))
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root() || self.ancestors(id).any(|a| a == self.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let svg = doc.create_element("svg");
        let root = doc.root();
        doc.append_child(root, svg);
        let g = doc.create_element("g");
        doc.set_attr(g, "transform", "translate(10,0)");
        doc.append_child(svg, g);
        let p = doc.create_element("path");
        doc.set_attr(p, "id", "wire");
        doc.set_attr(p, "transform", "translate(0,5)");
        doc.append_child(g, p);
        (doc, g, p)
    }

    #[test]
    fn transforms_accumulate_down_the_tree() {
        let (doc, _, p) = build();
        let m = doc.accumulated_transform(p);
        assert_eq!(m.apply(Point::new(0.0, 0.0)), Point::new(10.0, 5.0));
    }

    #[test]
    fn more_than_one_entry_falls_back_to_parent() {
        let (mut doc, _, p) = build();
        doc.set_attr(p, "transform", "translate(0,5) scale(2)");
        let m = doc.accumulated_transform(p);
        assert_eq!(m.apply(Point::new(1.0, 1.0)), Point::new(11.0, 1.0));
    }

    #[test]
    fn malformed_transform_is_ignored() {
        let (mut doc, _, p) = build();
        doc.set_attr(p, "transform", "wobble(1)");
        let m = doc.accumulated_transform(p);
        assert_eq!(m, Matrix::translate(10.0, 0.0));
    }

    #[test]
    fn lookup_and_strip_ids() {
        let (mut doc, g, p) = build();
        assert_eq!(doc.element_by_id("wire"), Some(p));
        let copy = doc.deep_clone(g);
        doc.strip_ids(copy);
        assert!(doc.descendants(copy).iter().all(|&n| doc.attr(n, "id").is_none()));
        // The source keeps its id, and the detached copy is not findable.
        assert_eq!(doc.element_by_id("wire"), Some(p));
        assert!(!doc.is_attached(copy));
    }

    #[test]
    fn path_points_use_accumulated_transform() {
        let (mut doc, _, p) = build();
        doc.set_attr(p, "d", "m 1,0 l 2,0");
        assert_eq!(
            doc.path_points(p).unwrap(),
            vec![Point::new(11.0, 5.0), Point::new(13.0, 5.0)]
        );
    }

    #[test]
    fn defs_are_not_rendered() {
        let (mut doc, _, p) = build();
        let svg = doc.svg_element().unwrap();
        let defs = doc.create_element("defs");
        doc.append_child(svg, defs);
        let hidden = doc.create_element("path");
        doc.append_child(defs, hidden);
        assert!(doc.is_rendered(p));
        assert!(!doc.is_rendered(hidden));
    }

    #[test]
    fn local_names_ignore_prefixes() {
        assert_eq!(local_name("svg:path"), "path");
        assert_eq!(local_name("g"), "g");
    }
}
