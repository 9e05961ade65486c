pub mod node;
pub mod render;

pub use node::StructuredNode;
pub use render::{escape_attr, escape_text, render, render_body};

use serde_json::Value;

/// Two-step transform: raw JSON body → normalised nodes → markup.
pub fn reconstruct(body: &[Value]) -> String {
    render_body(&StructuredNode::from_values(body))
}
