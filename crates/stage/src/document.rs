//! In-memory document model.
//!
//! The document is a tree of elements addressed by their template `id`
//! attribute. Each element holds rendered content, a list of [`Affordance`]s
//! (the things an operator can press) and a map of input values.
//!
//! Two roots always exist: [`CONTENT_ROOT`], where the router injects page
//! templates, and [`MODAL_ROOT`], the singleton overlay.
//!
//! An [`ElementRef`] pins one concrete node. Once that node is removed (its
//! parent's content was replaced, the modal was swapped) every write through
//! the old reference fails with [`DocumentError::Detached`], even if a new
//! element with the same id exists by then.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

use crate::bus::{Event, EventBus, Target};

/// Id of the element that hosts page templates.
pub const CONTENT_ROOT: &str = "main-content";

/// Id of the singleton modal overlay.
pub const MODAL_ROOT: &str = "app-modal";

static ID_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s<])id\s*=\s*["']([^"']+)["']"#).expect("id attribute pattern is valid")
});

/// Process-unique identity of one element node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Reference to a concrete element node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef {
    id: String,
    node: NodeId,
}

impl ElementRef {
    /// The element's `id` attribute.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The node this reference pins.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Bus target for listeners bound to this element.
    #[must_use]
    pub const fn target(&self) -> Target {
        Target::Element(self.node)
    }
}

/// Errors raised by document operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// The referenced node is no longer part of the document.
    #[error("element #{0} is detached from the document")]
    Detached(String),

    /// No live element offers an affordance with this label.
    #[error("nothing to press for \"{0}\"")]
    NoAffordance(String),

    /// The affordance exists but is disabled.
    #[error("\"{0}\" is disabled")]
    Disabled(String),
}

type Trigger = Arc<dyn Fn(&EventBus) -> usize + Send + Sync>;

/// Something an operator can activate: a button, a link, a select option.
///
/// Activating an affordance emits its event on the bus. The affordance never
/// calls page logic directly.
#[derive(Clone)]
pub struct Affordance {
    label: String,
    enabled: bool,
    trigger: Trigger,
}

impl Affordance {
    /// Creates an enabled affordance that emits `event` on `target`.
    pub fn new<E>(label: impl Into<String>, target: Target, event: E) -> Self
    where
        E: Event + Clone,
    {
        Self {
            label: label.into(),
            enabled: true,
            trigger: Arc::new(move |bus: &EventBus| bus.emit(target, &event)),
        }
    }

    /// Sets whether the affordance can be activated.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The label used to activate it.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether activation is allowed.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn fire(&self, bus: &EventBus) -> usize {
        (self.trigger)(bus)
    }
}

impl fmt::Debug for Affordance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Affordance")
            .field("label", &self.label)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Read-only view of one element, for printing the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    /// Element id.
    pub id: String,
    /// Nesting depth (roots are 0).
    pub depth: usize,
    /// Rendered content.
    pub content: String,
    /// Affordance labels with their enabled flag.
    pub affordances: Vec<(String, bool)>,
    /// Input values.
    pub inputs: BTreeMap<String, String>,
}

struct Node {
    id: String,
    content: String,
    affordances: Vec<Affordance>,
    inputs: BTreeMap<String, String>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: String::new(),
            affordances: Vec::new(),
            inputs: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Tree {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
    stylesheets: Vec<String>,
    title: String,
}

impl Tree {
    /// Live node ids in document order.
    fn walk(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, usize)> = self.roots.iter().rev().map(|n| (*n, 0)).collect();
        while let Some((node, depth)) = stack.pop() {
            out.push((node, depth));
            if let Some(n) = self.nodes.get(&node) {
                stack.extend(n.children.iter().rev().map(|c| (*c, depth + 1)));
            }
        }
        out
    }

    fn node_mut(&mut self, el: &ElementRef) -> Result<&mut Node, DocumentError> {
        self.nodes
            .get_mut(&el.node)
            .ok_or_else(|| DocumentError::Detached(el.id.clone()))
    }

    fn node(&self, el: &ElementRef) -> Result<&Node, DocumentError> {
        self.nodes
            .get(&el.node)
            .ok_or_else(|| DocumentError::Detached(el.id.clone()))
    }

    /// Removes every descendant of `node`, returning the removed ids.
    fn detach_children(&mut self, node: NodeId) -> Vec<NodeId> {
        let children = self
            .nodes
            .get_mut(&node)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        let mut removed = Vec::new();
        for child in children {
            self.remove_subtree(child, &mut removed);
        }
        removed
    }

    fn remove_subtree(&mut self, node: NodeId, removed: &mut Vec<NodeId>) {
        if let Some(n) = self.nodes.remove(&node) {
            removed.push(node);
            for child in n.children {
                self.remove_subtree(child, removed);
            }
        }
    }
}

/// The shared element tree.
///
/// Cloning is cheap; all clones see the same tree.
#[derive(Clone)]
pub struct Document {
    tree: Arc<RwLock<Tree>>,
    next_node: Arc<AtomicU64>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.read();
        f.debug_struct("Document")
            .field("nodes", &tree.nodes.len())
            .field("stylesheets", &tree.stylesheets)
            .field("title", &tree.title)
            .finish()
    }
}

impl Document {
    /// Creates a document with the content root and the modal overlay.
    #[must_use]
    pub fn new() -> Self {
        let doc = Self {
            tree: Arc::new(RwLock::new(Tree::default())),
            next_node: Arc::new(AtomicU64::new(1)),
        };
        {
            let mut tree = doc.tree.write();
            for id in [CONTENT_ROOT, MODAL_ROOT] {
                let node = doc.allocate();
                tree.nodes.insert(node, Node::new(id));
                tree.roots.push(node);
            }
        }
        doc
    }

    fn allocate(&self) -> NodeId {
        NodeId::new(self.next_node.fetch_add(1, Ordering::Relaxed))
    }

    /// The element pages are injected into.
    #[must_use]
    pub fn content_root(&self) -> ElementRef {
        self.get_element_by_id(CONTENT_ROOT)
            .unwrap_or_else(|| unreachable!("content root is never removed"))
    }

    /// The current modal overlay node.
    #[must_use]
    pub fn modal(&self) -> ElementRef {
        self.get_element_by_id(MODAL_ROOT)
            .unwrap_or_else(|| unreachable!("modal root is replaced, never removed"))
    }

    /// Finds the first live element with `id`, in document order.
    #[must_use]
    pub fn get_element_by_id(&self, id: &str) -> Option<ElementRef> {
        let tree = self.tree.read();
        tree.walk().into_iter().find_map(|(node, _)| {
            tree.nodes
                .get(&node)
                .filter(|n| n.id == id)
                .map(|n| ElementRef {
                    id: n.id.clone(),
                    node,
                })
        })
    }

    /// Returns the root element `id`, appending it after the existing roots
    /// when it does not exist yet.
    ///
    /// Extra roots hold page chrome (a sidebar) that navigation never clears.
    pub fn root(&self, id: &str) -> ElementRef {
        let fresh = self.allocate();
        let mut tree = self.tree.write();
        if let Some(node) = tree
            .roots
            .iter()
            .copied()
            .find(|r| tree.nodes.get(r).is_some_and(|n| n.id == id))
        {
            return ElementRef {
                id: id.to_string(),
                node,
            };
        }
        tree.nodes.insert(fresh, Node::new(id));
        tree.roots.push(fresh);
        debug!(element = id, "root added");
        ElementRef {
            id: id.to_string(),
            node: fresh,
        }
    }

    /// Whether the referenced node is still in the document.
    #[must_use]
    pub fn is_attached(&self, el: &ElementRef) -> bool {
        self.tree.read().nodes.contains_key(&el.node)
    }

    /// Replaces the element's content with `html`.
    ///
    /// Every `id="..."` attribute in the markup becomes a child element. The
    /// previous children, affordances and inputs are discarded; the removed
    /// node ids are returned so their listeners can be released.
    pub fn set_inner_html(
        &self,
        el: &ElementRef,
        html: &str,
    ) -> Result<Vec<NodeId>, DocumentError> {
        let child_ids: Vec<String> = ID_ATTR
            .captures_iter(html)
            .map(|c| c[1].to_string())
            .collect();
        let fresh: Vec<NodeId> = child_ids.iter().map(|_| self.allocate()).collect();

        let mut tree = self.tree.write();
        tree.node(el)?;
        let removed = tree.detach_children(el.node);
        for (node, id) in fresh.iter().zip(&child_ids) {
            tree.nodes.insert(*node, Node::new(id.as_str()));
        }
        let target = tree.node_mut(el)?;
        target.content = html.to_string();
        target.affordances.clear();
        target.inputs.clear();
        target.children = fresh;

        debug!(
            element = %el.id,
            children = child_ids.len(),
            removed = removed.len(),
            "inner html replaced"
        );
        Ok(removed)
    }

    /// Replaces the element's content with plain text, removing its children.
    pub fn set_text(&self, el: &ElementRef, text: &str) -> Result<Vec<NodeId>, DocumentError> {
        let mut tree = self.tree.write();
        tree.node(el)?;
        let removed = tree.detach_children(el.node);
        let target = tree.node_mut(el)?;
        target.content = text.to_string();
        target.affordances.clear();
        trace!(element = %el.id, "text replaced");
        Ok(removed)
    }

    /// Empties the element.
    pub fn clear(&self, el: &ElementRef) -> Result<Vec<NodeId>, DocumentError> {
        self.set_text(el, "")
    }

    /// Replaces the element's affordances.
    pub fn set_affordances(
        &self,
        el: &ElementRef,
        affordances: Vec<Affordance>,
    ) -> Result<(), DocumentError> {
        let mut tree = self.tree.write();
        tree.node_mut(el)?.affordances = affordances;
        Ok(())
    }

    /// The element's rendered content.
    pub fn content(&self, el: &ElementRef) -> Result<String, DocumentError> {
        Ok(self.tree.read().node(el)?.content.clone())
    }

    /// Content of the first live element with `id`.
    #[must_use]
    pub fn content_of(&self, id: &str) -> Option<String> {
        let el = self.get_element_by_id(id)?;
        self.content(&el).ok()
    }

    /// Affordance labels on the element, with their enabled flag.
    pub fn affordances(&self, el: &ElementRef) -> Result<Vec<(String, bool)>, DocumentError> {
        Ok(self
            .tree
            .read()
            .node(el)?
            .affordances
            .iter()
            .map(|a| (a.label.clone(), a.enabled))
            .collect())
    }

    /// Sets an input value on the element (a form field, a search box).
    pub fn set_input(
        &self,
        el: &ElementRef,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DocumentError> {
        self.tree
            .write()
            .node_mut(el)?
            .inputs
            .insert(name.into(), value.into());
        Ok(())
    }

    /// Reads one input value.
    #[must_use]
    pub fn input(&self, el: &ElementRef, name: &str) -> Option<String> {
        self.tree
            .read()
            .node(el)
            .ok()
            .and_then(|n| n.inputs.get(name).cloned())
    }

    /// All input values on the element.
    pub fn inputs(&self, el: &ElementRef) -> Result<BTreeMap<String, String>, DocumentError> {
        Ok(self.tree.read().node(el)?.inputs.clone())
    }

    /// Activates the first enabled affordance labelled `label`.
    ///
    /// Returns the number of listeners the emitted event reached.
    pub fn activate(&self, bus: &EventBus, label: &str) -> Result<usize, DocumentError> {
        let found = {
            let tree = self.tree.read();
            let mut disabled = false;
            let mut hit = None;
            for (node, _) in tree.walk() {
                let Some(n) = tree.nodes.get(&node) else {
                    continue;
                };
                for a in n.affordances.iter().filter(|a| a.label == label) {
                    if a.enabled {
                        hit = Some(a.clone());
                        break;
                    }
                    disabled = true;
                }
                if hit.is_some() {
                    break;
                }
            }
            match hit {
                Some(a) => Ok(a),
                None if disabled => Err(DocumentError::Disabled(label.to_string())),
                None => Err(DocumentError::NoAffordance(label.to_string())),
            }
        }?;
        debug!(label, "affordance activated");
        Ok(found.fire(bus))
    }

    /// Activates an affordance on one element only.
    ///
    /// Used when several elements offer the same label (two paginated tables
    /// on one page both have a `page:2`).
    pub fn activate_in(
        &self,
        bus: &EventBus,
        el: &ElementRef,
        label: &str,
    ) -> Result<usize, DocumentError> {
        let found = {
            let tree = self.tree.read();
            let node = tree.node(el)?;
            let mut matching = node.affordances.iter().filter(|a| a.label == label);
            match matching.clone().find(|a| a.enabled) {
                Some(a) => a.clone(),
                None if matching.next().is_some() => {
                    return Err(DocumentError::Disabled(label.to_string()));
                }
                None => return Err(DocumentError::NoAffordance(label.to_string())),
            }
        };
        debug!(element = %el.id, label, "affordance activated");
        Ok(found.fire(bus))
    }

    /// Swaps the modal overlay for a fresh, empty node.
    ///
    /// Returns every removed node (the old overlay and its descendants).
    pub fn replace_modal(&self) -> Vec<NodeId> {
        let fresh = self.allocate();
        let mut tree = self.tree.write();
        let Some(index) = tree
            .roots
            .iter()
            .position(|r| tree.nodes.get(r).is_some_and(|n| n.id == MODAL_ROOT))
        else {
            tree.nodes.insert(fresh, Node::new(MODAL_ROOT));
            tree.roots.push(fresh);
            return Vec::new();
        };
        let old = tree.roots[index];
        let mut removed = Vec::new();
        tree.remove_subtree(old, &mut removed);
        tree.nodes.insert(fresh, Node::new(MODAL_ROOT));
        tree.roots[index] = fresh;
        debug!(old = old.get(), new = fresh.get(), "modal replaced");
        removed
    }

    /// Appends a stylesheet link to the head.
    pub fn add_stylesheet(&self, href: impl Into<String>) {
        let href = href.into();
        debug!(%href, "stylesheet added");
        self.tree.write().stylesheets.push(href);
    }

    /// Removes a stylesheet link. Returns whether it was present.
    pub fn remove_stylesheet(&self, href: &str) -> bool {
        let mut tree = self.tree.write();
        let before = tree.stylesheets.len();
        tree.stylesheets.retain(|s| s != href);
        let removed = tree.stylesheets.len() != before;
        if removed {
            debug!(%href, "stylesheet removed");
        }
        removed
    }

    /// Active stylesheet links, in insertion order.
    #[must_use]
    pub fn stylesheets(&self) -> Vec<String> {
        self.tree.read().stylesheets.clone()
    }

    /// Sets the document title.
    pub fn set_title(&self, title: impl Into<String>) {
        self.tree.write().title = title.into();
    }

    /// The document title.
    #[must_use]
    pub fn title(&self) -> String {
        self.tree.read().title.clone()
    }

    /// Every live element, in document order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ElementSnapshot> {
        let tree = self.tree.read();
        tree.walk()
            .into_iter()
            .filter_map(|(node, depth)| {
                tree.nodes.get(&node).map(|n| ElementSnapshot {
                    id: n.id.clone(),
                    depth,
                    content: n.content.clone(),
                    affordances: n
                        .affordances
                        .iter()
                        .map(|a| (a.label.clone(), a.enabled))
                        .collect(),
                    inputs: n.inputs.clone(),
                })
            })
            .collect()
    }
}
