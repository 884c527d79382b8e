//! Document configuration.

use serde::Deserialize;

/// Options for a [`Document`](super::Document).
///
/// Deserializable so hosts can keep it alongside their own settings:
///
/// ```rust
/// use strand_core::dom::DocumentConfig;
///
/// let config: DocumentConfig = serde_json::from_str(r#"{ "root_tag": "main" }"#).unwrap();
/// assert_eq!(config.root_tag, "main");
/// assert!(config.observe_lifecycle);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Tag of the root element every connected node descends from.
    pub root_tag: String,

    /// Queue `mount` / `unmount` notifications on attach and detach.
    /// `destroy` is always manual and unaffected.
    pub observe_lifecycle: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            root_tag: "body".to_string(),
            observe_lifecycle: true,
        }
    }
}
