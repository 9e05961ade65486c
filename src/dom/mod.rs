//! In-memory model of the live page.
//!
//! A small arena tree of elements and text. Mutations record the nodes they
//! attach; [`Page::update`] flushes those records to subscribers as one batch.

pub mod html;
pub mod observer;

use tokio::sync::mpsc;
use url::Url;

pub use observer::{MutationBatch, MutationSubscription, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// What the host environment can do, fixed for the lifetime of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// A sanitising HTML parser is available.
    pub sanitizer: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self { sanitizer: true }
    }
}

pub struct Document {
    location: Url,
    nodes: Vec<Node>,
    root: NodeId,
    capabilities: HostCapabilities,
    pending: Vec<NodeId>,
    observers: Vec<(u64, mpsc::UnboundedSender<MutationBatch>)>,
    next_observer: u64,
}

impl Document {
    /// An empty `<html><head></head><body></body></html>` document.
    pub fn new(location: Url) -> Self {
        let mut doc = Self::blank(location);
        let head = doc.create_element("head", Vec::<(String, String)>::new());
        let body = doc.create_element("body", Vec::<(String, String)>::new());
        doc.append_child(doc.root, head);
        doc.append_child(doc.root, body);
        doc.pending.clear();
        doc
    }

    fn blank(location: Url) -> Self {
        let root = Node {
            data: NodeData::Element {
                tag: "html".to_string(),
                attrs: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            location,
            nodes: vec![root],
            root: NodeId(0),
            capabilities: HostCapabilities::default(),
            pending: Vec::new(),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    pub fn with_capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> Option<NodeId> {
        self.find_in(self.root, |doc, id| doc.tag(id) == Some("body"))
    }

    // ── Node access ──

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Pre-order walk of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match self.data(n) {
                NodeData::Text(t) => Some(t.as_str()),
                NodeData::Element { .. } => None,
            })
            .collect()
    }

    // ── Queries ──

    pub fn find_in<F>(&self, root: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        self.descendants(root).into_iter().find(|&id| pred(self, id))
    }

    pub fn has_class_containing(&self, id: NodeId, needle: &str) -> bool {
        self.attr(id, "class").is_some_and(|c| c.contains(needle))
    }

    /// First element under `root` (inclusive) whose class contains `needle`.
    pub fn find_by_class_in(&self, root: NodeId, needle: &str) -> Option<NodeId> {
        self.find_in(root, |doc, id| doc.has_class_containing(id, needle))
    }

    pub fn find_by_class(&self, needle: &str) -> Option<NodeId> {
        self.find_by_class_in(self.root, needle)
    }

    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<NodeId> {
        self.find_in(self.root, |doc, id| doc.attr(id, name) == Some(value))
    }

    /// Follow the last element child down as far as it goes.
    pub fn innermost_last(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(&last) = self
            .children(current)
            .iter()
            .rev()
            .find(|&&c| self.tag(c).is_some())
        {
            current = last;
        }
        current
    }

    // ── Mutation ──

    pub fn create_element<I, K, V>(&mut self, tag: &str, attrs: I) -> NodeId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let attrs = attrs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.push_node(NodeData::Element {
            tag: tag.to_string(),
            attrs,
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeData::Text(text.to_string()))
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        if self.is_attached(parent) {
            self.pending.push(child);
        }
    }

    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        let old = std::mem::take(&mut self.nodes[parent.0].children);
        for child in old {
            self.nodes[child.0].parent = None;
        }
        for child in children {
            self.append_child(parent, child);
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let node = self.create_text(text);
        self.replace_children(id, vec![node]);
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    /// Set one declaration of the inline `style`, replacing any previous one.
    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) {
        let current = self.attr(id, "style").unwrap_or_default();
        let mut declarations: Vec<String> = current
            .split(';')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .filter(|d| {
                d.split_once(':')
                    .map_or(true, |(name, _)| !name.trim().eq_ignore_ascii_case(property))
            })
            .map(str::to_string)
            .collect();
        declarations.push(format!("{property}: {value}"));
        let style = declarations.join("; ");
        self.set_attr(id, "style", &style);
    }

    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        self.attr(id, "style")?
            .split(';')
            .filter_map(|d| d.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(property))
            .map(|(_, value)| value.trim().to_string())
    }

    // ── Observers ──

    pub(crate) fn add_observer(&mut self) -> (u64, mpsc::UnboundedReceiver<MutationBatch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_observer;
        self.next_observer += 1;
        self.observers.push((id, tx));
        (id, rx)
    }

    pub(crate) fn remove_observer(&mut self, id: u64) {
        self.observers.retain(|(observer, _)| *observer != id);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver the mutations recorded since the last flush as one batch.
    pub(crate) fn flush_mutations(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch = MutationBatch {
            added: std::mem::take(&mut self.pending),
        };
        self.observers.retain(|(_, tx)| tx.send(batch.clone()).is_ok());
    }
}
