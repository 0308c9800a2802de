//! Mutable host-page model.
//!
//! `Page` owns a parsed HTML tree and records structural (`ChildList`) and text
//! (`CharacterData`) mutations as they happen. Records accumulate until
//! [`Page::flush_mutations`] hands them out, one batch per subscription, to every
//! observer whose target subtree contains the record target.

use std::fmt;
use std::sync::mpsc;

use ego_tree::{NodeId, NodeMut, NodeRef, Tree};
use scraper::node::{Node, Text};
use scraper::{Html, Selector};
use widget_logging::widget_trace;

use crate::decode::{decode_page, DecodeError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),
    #[error("node {0:?} cannot hold children")]
    NotContainer(NodeId),
    #[error("the document root cannot be removed")]
    RootRemoval,
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    CharacterData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Parent for child-list changes, the text node for character data.
    pub target: NodeId,
    pub kind: MutationKind,
}

pub type MutationBatch = Vec<MutationRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Receiving end of an observation. Dropping it, or passing its id to
/// [`Page::disconnect`], ends delivery.
#[derive(Debug)]
pub struct Subscription {
    id: ObserverId,
    target: NodeId,
    rx: mpsc::Receiver<MutationBatch>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn try_next(&self) -> Option<MutationBatch> {
        self.rx.try_recv().ok()
    }
}

struct Observer {
    id: ObserverId,
    target: NodeId,
    tx: mpsc::Sender<MutationBatch>,
}

pub struct Page {
    html: Html,
    pending: Vec<MutationRecord>,
    observers: Vec<Observer>,
    next_observer: u64,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("nodes", &self.html.tree.nodes().count())
            .field("pending", &self.pending.len())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Page {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
            pending: Vec::new(),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    /// Decodes raw page bytes (see [`decode_page`]) and parses the result.
    pub fn from_bytes(bytes: &[u8], content_type: Option<&str>) -> Result<Self, DecodeError> {
        let decoded = decode_page(bytes, content_type)?;
        Ok(Self::parse(&decoded.html))
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        self.html.tree.root().id()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.html
            .tree
            .root()
            .descendants()
            .find(|node| element_name(*node).is_some_and(|name| name == "body"))
            .map(|node| node.id())
    }

    /// All attached elements matching `selector`, in document order.
    pub fn select(&self, selector: &str) -> Result<Vec<NodeId>, PageError> {
        let parsed = Selector::parse(selector).map_err(|err| PageError::InvalidSelector {
            selector: selector.to_string(),
            message: err.to_string(),
        })?;
        // `Html::select` also walks nodes detached by earlier mutations.
        let root = self.root();
        Ok(self
            .html
            .select(&parsed)
            .map(|element| element.id())
            .filter(|id| self.contains(root, *id))
            .collect())
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(element_name)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)?.value().as_element()?.attr(name)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.value().is_text())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent().map(|parent| parent.id())
    }

    /// Concatenated text of the node and all its descendants.
    pub fn text(&self, id: NodeId) -> Result<String, PageError> {
        let node = self.node(id).ok_or(PageError::UnknownNode(id))?;
        Ok(subtree_text(node))
    }

    /// Total character count of the texts of `ids`, as if concatenated.
    pub fn text_len(&self, ids: &[NodeId]) -> Result<usize, PageError> {
        self.text_len_excluding(ids, None)
    }

    /// Like [`Page::text_len`], leaving out text inside the `exclude` subtree.
    pub fn text_len_excluding(
        &self,
        ids: &[NodeId],
        exclude: Option<NodeId>,
    ) -> Result<usize, PageError> {
        ids.iter().try_fold(0usize, |total, id| {
            let node = self.node(*id).ok_or(PageError::UnknownNode(*id))?;
            let len: usize = node
                .descendants()
                .filter(|n| exclude.map_or(true, |skip| !self.contains(skip, n.id())))
                .filter_map(|n| n.value().as_text())
                .map(|text| text.chars().count())
                .sum();
            Ok(total + len)
        })
    }

    /// True when `node` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if ancestor == node {
            return self.node(node).is_some();
        }
        self.node(node)
            .is_some_and(|n| n.ancestors().any(|a| a.id() == ancestor))
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root(), id)
    }

    /// Deep copy of the subtree rooted at `id` into a tree of its own.
    pub fn detached_copy(&self, id: NodeId) -> Option<Tree<Node>> {
        let source = self.node(id)?;
        let mut copy = Tree::new(source.value().clone());
        copy_children(source, &mut copy.root_mut());
        Some(copy)
    }

    /// Parses `markup` as a fragment and appends its nodes to `parent`.
    pub fn append_html(&mut self, parent: NodeId, markup: &str) -> Result<Vec<NodeId>, PageError> {
        self.ensure_container(parent)?;
        let fragment = Html::parse_fragment(markup);
        let mut parent_mut = self.node_mut(parent)?;
        let mut added = Vec::new();
        for child in fragment.root_element().children() {
            let mut copied = parent_mut.append(child.value().clone());
            added.push(copied.id());
            copy_children(child, &mut copied);
        }
        self.record(parent, MutationKind::ChildList {
            added: added.clone(),
            removed: Vec::new(),
        });
        Ok(added)
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, PageError> {
        self.ensure_container(parent)?;
        let id = self.node_mut(parent)?.append(text_node(text)).id();
        self.record(parent, MutationKind::ChildList {
            added: vec![id],
            removed: Vec::new(),
        });
        Ok(id)
    }

    /// Replaces the data of an existing text node.
    pub fn set_text(&mut self, text_id: NodeId, text: &str) -> Result<(), PageError> {
        let mut node = self.node_mut(text_id)?;
        match node.value() {
            Node::Text(existing) => existing.text = text.into(),
            _ => return Err(PageError::NotText(text_id)),
        }
        self.record(text_id, MutationKind::CharacterData);
        Ok(())
    }

    /// Replaces all children of `element` with a single text node.
    pub fn set_text_content(&mut self, element: NodeId, text: &str) -> Result<(), PageError> {
        self.ensure_container(element)?;
        let removed: Vec<NodeId> = self
            .node(element)
            .map(|node| node.children().map(|child| child.id()).collect())
            .unwrap_or_default();
        for id in &removed {
            self.node_mut(*id)?.detach();
        }
        let mut added = Vec::new();
        if !text.is_empty() {
            added.push(self.node_mut(element)?.append(text_node(text)).id());
        }
        self.record(element, MutationKind::ChildList { added, removed });
        Ok(())
    }

    pub fn remove(&mut self, id: NodeId) -> Result<(), PageError> {
        let parent = self
            .parent(id)
            .ok_or_else(|| match self.node(id) {
                Some(_) => PageError::RootRemoval,
                None => PageError::UnknownNode(id),
            })?;
        self.node_mut(id)?.detach();
        self.record(parent, MutationKind::ChildList {
            added: Vec::new(),
            removed: vec![id],
        });
        Ok(())
    }

    /// Starts observing child-list and character-data changes anywhere under `target`.
    pub fn observe(&mut self, target: NodeId) -> Subscription {
        self.next_observer += 1;
        let id = ObserverId(self.next_observer);
        let (tx, rx) = mpsc::channel();
        self.observers.push(Observer { id, target, tx });
        Subscription { id, target, rx }
    }

    pub fn disconnect(&mut self, id: ObserverId) {
        self.observers.retain(|observer| observer.id != id);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Delivers pending records and returns how many batches were sent.
    pub fn flush_mutations(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let records = std::mem::take(&mut self.pending);

        let batches: Vec<(ObserverId, MutationBatch)> = self
            .observers
            .iter()
            .map(|observer| {
                let batch = records
                    .iter()
                    .filter(|record| self.contains(observer.target, record.target))
                    .cloned()
                    .collect();
                (observer.id, batch)
            })
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, batch) in batches {
            if batch.is_empty() {
                continue;
            }
            let Some(observer) = self.observers.iter().find(|o| o.id == id) else {
                continue;
            };
            if observer.tx.send(batch).is_ok() {
                delivered += 1;
            } else {
                closed.push(id);
            }
        }
        self.observers.retain(|observer| !closed.contains(&observer.id));
        widget_trace!(
            "Flushed {} mutation records in {} batches",
            records.len(),
            delivered
        );
        delivered
    }

    fn node_mut(&mut self, id: NodeId) -> Result<NodeMut<'_, Node>, PageError> {
        self.html.tree.get_mut(id).ok_or(PageError::UnknownNode(id))
    }

    fn ensure_container(&self, id: NodeId) -> Result<(), PageError> {
        let node = self.node(id).ok_or(PageError::UnknownNode(id))?;
        match node.value() {
            Node::Element(_) | Node::Document | Node::Fragment => Ok(()),
            _ => Err(PageError::NotContainer(id)),
        }
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        if self.observers.is_empty() {
            return;
        }
        self.pending.push(MutationRecord { target, kind });
    }
}

pub(crate) fn element_name(node: NodeRef<'_, Node>) -> Option<&str> {
    node.value().as_element().map(|element| element.name())
}

pub(crate) fn subtree_text(node: NodeRef<'_, Node>) -> String {
    node.descendants()
        .filter_map(|n| n.value().as_text())
        .map(|text| &**text)
        .collect()
}

fn text_node(text: &str) -> Node {
    Node::Text(Text { text: text.into() })
}

fn copy_children(source: NodeRef<'_, Node>, target: &mut NodeMut<'_, Node>) {
    for child in source.children() {
        let mut copied = target.append(child.value().clone());
        copy_children(child, &mut copied);
    }
}
