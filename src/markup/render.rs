use super::node::{scalar_text, StructuredNode};

/// Bookkeeping attribute the origin attaches to links; never rendered.
const INTERNAL_ATTRIBUTE: &str = "isExternal";

/// Render a body sequence to markup.
pub fn render_body(nodes: &[StructuredNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_into(node, &mut out);
    }
    out
}

/// Render one node. Total: malformed input renders as nothing.
pub fn render(node: &StructuredNode) -> String {
    let mut out = String::new();
    render_into(node, &mut out);
    out
}

fn render_into(node: &StructuredNode, out: &mut String) {
    match node {
        StructuredNode::Text(text) => out.push_str(&escape_text(text)),
        StructuredNode::Opaque => {}
        StructuredNode::Element { .. } if node.is_advertisement() => {}
        StructuredNode::Element { tag, .. } if !is_markup_name(tag) => {}
        StructuredNode::Element {
            tag,
            attributes,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                if name == INTERNAL_ATTRIBUTE || !is_markup_name(name) {
                    continue;
                }
                let Some(value) = scalar_text(value) else {
                    continue;
                };
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attr(&value));
                out.push('"');
            }
            out.push('>');
            for child in children {
                render_into(child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

/// Tag and attribute names are written unescaped, so anything that could end
/// the name early is refused.
fn is_markup_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | '"' | '\'' | '/' | '=')
        })
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

// ── Tests ──
