//! Service descriptor published on the info request path.

use serde::{Deserialize, Serialize};

/// Immutable service identity, constructed once at startup.
///
/// Published verbatim as the info reply body. `name` is the unique service
/// identifier and also derives the worker's inbound queue name;
/// `sub_parsers` lists the registered sub-parser names in registration
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub display_name: String,
    pub extension: Option<String>,
    pub sub_parsers: Vec<String>,
}

impl ServiceDescriptor {
    /// Create a descriptor
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        extension: Option<String>,
        sub_parsers: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            extension,
            sub_parsers,
        }
    }

    /// Inbound queue name for this service
    pub fn queue(&self) -> String {
        format!("parser-{}", self.name)
    }
}
