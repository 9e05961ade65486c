use serde_json::{Map, Value};

/// One node of the structured article body.
///
/// The origin encodes elements positionally as `[tag, attrs?, ...children]`
/// where `attrs` is present only when the second entry is a JSON object.
/// [`StructuredNode::from_value`] resolves that encoding once so rendering
/// never has to guess.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredNode {
    Text(String),
    Element {
        tag: String,
        /// Insertion order of the source object is preserved.
        attributes: Map<String, Value>,
        children: Vec<StructuredNode>,
    },
    /// Anything else: a number, a bare object, an array without a string tag.
    Opaque,
}

impl StructuredNode {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => StructuredNode::Text(text.clone()),
            Value::Array(items) => {
                let Some(Value::String(tag)) = items.first() else {
                    return StructuredNode::Opaque;
                };

                let mut rest = items[1..].iter().peekable();
                let attributes = match rest.peek() {
                    Some(Value::Object(map)) => {
                        let map = map.clone();
                        rest.next();
                        map
                    }
                    _ => Map::new(),
                };
                let children = rest.map(StructuredNode::from_value).collect();

                StructuredNode::Element {
                    tag: tag.clone(),
                    attributes,
                    children,
                }
            }
            _ => StructuredNode::Opaque,
        }
    }

    /// Normalise a whole body sequence.
    pub fn from_values(values: &[Value]) -> Vec<Self> {
        values.iter().map(StructuredNode::from_value).collect()
    }

    /// Ad slots are dropped with their whole subtree: either the tag name or a
    /// `position` attribute mentions "ad" in any case.
    pub fn is_advertisement(&self) -> bool {
        let StructuredNode::Element { tag, attributes, .. } = self else {
            return false;
        };
        if tag.to_lowercase().contains("ad") {
            return true;
        }
        attributes
            .get("position")
            .and_then(scalar_text)
            .is_some_and(|position| position.to_lowercase().contains("ad"))
    }
}

/// Text form of a scalar attribute value. Null and compound values have none.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
