use scraper::{ElementRef, Html, Node as HtmlNode};
use url::Url;

use super::{Document, NodeData, NodeId};
use crate::markup::{escape_attr, escape_text};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Decides which parsed elements and attributes make it into the document.
pub trait ImportPolicy {
    fn keep_element(&self, _tag: &str) -> bool {
        true
    }

    fn keep_attribute(&self, _name: &str, _value: &str) -> bool {
        true
    }
}

/// Imports everything as parsed.
pub struct KeepAll;

impl ImportPolicy for KeepAll {}

impl Document {
    /// Build a document from a full HTML page. Comments and the doctype are dropped.
    pub fn parse(location: Url, html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let root_element = parsed.root_element();

        let mut doc = Self::blank(location);
        let root = doc.root();
        for (name, value) in root_element.value().attrs() {
            doc.set_attr(root, name, value);
        }
        for child in doc.import_children(root_element, &KeepAll) {
            doc.append_child(root, child);
        }
        doc.pending.clear();
        doc
    }

    /// Parse `markup` as a body fragment into detached nodes.
    pub fn parse_fragment(&mut self, markup: &str, policy: &dyn ImportPolicy) -> Vec<NodeId> {
        let fragment = Html::parse_fragment(markup);
        self.import_children(fragment.root_element(), policy)
    }

    fn import_children(&mut self, element: ElementRef<'_>, policy: &dyn ImportPolicy) -> Vec<NodeId> {
        let mut imported = Vec::new();
        for child in element.children() {
            match child.value() {
                HtmlNode::Text(text) => {
                    let content: &str = text;
                    imported.push(self.create_text(content));
                }
                HtmlNode::Element(_) => {
                    let Some(child_element) = ElementRef::wrap(child) else {
                        continue;
                    };
                    let value = child_element.value();
                    if !policy.keep_element(value.name()) {
                        continue;
                    }
                    let attrs: Vec<(String, String)> = value
                        .attrs()
                        .filter(|(name, val)| policy.keep_attribute(name, val))
                        .map(|(name, val)| (name.to_string(), val.to_string()))
                        .collect();
                    let id = self.create_element(value.name(), attrs);
                    for grandchild in self.import_children(child_element, policy) {
                        self.append_child(id, grandchild);
                    }
                    imported.push(id);
                }
                _ => {}
            }
        }
        imported
    }

    // ── Serialisation ──

    pub fn to_html(&self) -> String {
        format!("<!DOCTYPE html>{}", self.outer_html(self.root()))
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, false, &mut out);
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let raw = self.tag(id).is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        match self.data(id) {
            NodeData::Text(text) if raw_text => out.push_str(text),
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html(id));
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}
