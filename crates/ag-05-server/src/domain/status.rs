use serde::{Deserialize, Serialize};

/// One line of operational status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatusEntry {
    pub key: String,
    pub name: String,
    pub value: String,
    pub description: String,
}

impl ServerStatusEntry {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        value: impl ToString,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            value: value.to_string(),
            description: description.into(),
        }
    }
}

/// Find the value recorded under `key`.
pub fn status_value<'a>(entries: &'a [ServerStatusEntry], key: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|entry| entry.key == key)
        .map(|entry| entry.value.as_str())
}
