//! Serializable tree snapshots, for structural assertions and debugging.

use indexmap::IndexMap;
use serde::Serialize;

/// A detached copy of a subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeSnapshot {
    Element {
        tag: String,
        #[serde(skip_serializing_if = "IndexMap::is_empty")]
        attributes: IndexMap<String, String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        classes: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        children: Vec<NodeSnapshot>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

impl NodeSnapshot {
    /// Concatenated text of this subtree.
    pub fn text_content(&self) -> String {
        match self {
            NodeSnapshot::Element { children, .. } => {
                children.iter().map(NodeSnapshot::text_content).collect()
            }
            NodeSnapshot::Text { text } => text.clone(),
            NodeSnapshot::Comment { .. } => String::new(),
        }
    }
}
