//! Parser plugin capabilities and registries.
//!
//! The worker core treats parsers as opaque capabilities: named sub-parsers
//! each turn one raw payload into a structured value, and a top-level parser
//! combines the ordered outputs into the job result. Deployments compile
//! their implementations in and register them by service name (see the
//! `plugins` module); there is no runtime code loading.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::diagnostics::DiagnosticSink;
use crate::job::{Metadata, SubParserOutput};

/// Error type for plugin invocations
#[derive(Debug, Clone)]
pub enum PluginError {
    InvalidInput(String),
    Execution(String),
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            PluginError::Execution(msg) => write!(f, "Execution error: {}", msg),
        }
    }
}

impl std::error::Error for PluginError {}

/// A sub-parser turns one raw payload into a structured intermediate value.
///
/// Implementations may write freeform diagnostics to the sink; the text is
/// included in the error reply if the job fails.
pub trait SubParser: Send + Sync {
    /// Parse one raw payload.
    ///
    /// # Arguments
    /// * `data` - Raw payload bytes, already transport-decoded
    /// * `metadata` - The job's metadata, passed through unmodified
    /// * `diag` - Diagnostic sink for the current invocation window
    fn parse(
        &self,
        data: &[u8],
        metadata: &Metadata,
        diag: &DiagnosticSink,
    ) -> Result<Value, PluginError>;
}

/// Simple function-based implementation of SubParser
impl<F> SubParser for F
where
    F: Fn(&[u8], &Metadata, &DiagnosticSink) -> Result<Value, PluginError> + Send + Sync,
{
    fn parse(
        &self,
        data: &[u8],
        metadata: &Metadata,
        diag: &DiagnosticSink,
    ) -> Result<Value, PluginError> {
        self(data, metadata, diag)
    }
}

/// The top-level parser combines all sub-parser outputs into the job result.
///
/// Outputs arrive in input-list order. The returned value must be
/// serializable as the success reply body.
pub trait Parser: Send + Sync {
    /// Combine the ordered sub-parser outputs into the final result.
    fn parse(
        &self,
        outputs: &[SubParserOutput],
        metadata: &Metadata,
        diag: &DiagnosticSink,
    ) -> Result<Value, PluginError>;
}

/// Simple function-based implementation of Parser
impl<F> Parser for F
where
    F: Fn(&[SubParserOutput], &Metadata, &DiagnosticSink) -> Result<Value, PluginError>
        + Send
        + Sync,
{
    fn parse(
        &self,
        outputs: &[SubParserOutput],
        metadata: &Metadata,
        diag: &DiagnosticSink,
    ) -> Result<Value, PluginError> {
        self(outputs, metadata, diag)
    }
}

/// A complete plugin set: the top-level parser plus its named sub-parsers.
///
/// The sub-parser mapping is ordered by registration; the service
/// descriptor publishes the names in the same order.
pub struct PluginSet {
    parser: Box<dyn Parser>,
    sub_parsers: IndexMap<String, Box<dyn SubParser>>,
}

impl PluginSet {
    /// Create a plugin set around a top-level parser
    pub fn new(parser: Box<dyn Parser>) -> Self {
        Self {
            parser,
            sub_parsers: IndexMap::new(),
        }
    }

    /// Register a sub-parser under a name.
    ///
    /// Registering the same name twice replaces the earlier capability but
    /// keeps its position.
    pub fn register_sub_parser(&mut self, name: impl Into<String>, sub_parser: Box<dyn SubParser>) {
        self.sub_parsers.insert(name.into(), sub_parser);
    }

    /// Get the top-level parser
    pub fn parser(&self) -> &dyn Parser {
        self.parser.as_ref()
    }

    /// Look up a sub-parser by name
    pub fn sub_parser(&self, name: &str) -> Option<&dyn SubParser> {
        self.sub_parsers.get(name).map(|sub_parser| sub_parser.as_ref())
    }

    /// Check if a sub-parser is registered
    pub fn has_sub_parser(&self, name: &str) -> bool {
        self.sub_parsers.contains_key(name)
    }

    /// Get all registered sub-parser names, in registration order
    pub fn sub_parser_names(&self) -> Vec<String> {
        self.sub_parsers.keys().cloned().collect()
    }
}

/// Registry of compiled-in plugin sets keyed by service name.
///
/// This is the capability-injection point: process startup resolves the
/// configured service name against this registry instead of loading code
/// at runtime.
pub struct ParserRegistry {
    sets: HashMap<String, PluginSet>,
}

impl ParserRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            sets: HashMap::new(),
        }
    }

    /// Register a plugin set under a service name
    pub fn register(&mut self, name: impl Into<String>, set: PluginSet) {
        self.sets.insert(name.into(), set);
    }

    /// Remove and return the plugin set for a service name
    pub fn take(&mut self, name: &str) -> Option<PluginSet> {
        self.sets.remove(name)
    }

    /// Check if a service name has a registered plugin set
    pub fn has_service(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    /// Get all registered service names
    pub fn service_names(&self) -> Vec<String> {
        self.sets.keys().cloned().collect()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop_parser() -> Box<dyn Parser> {
        Box::new(
            |_outputs: &[SubParserOutput],
             _metadata: &Metadata,
             _diag: &DiagnosticSink|
             -> Result<Value, PluginError> { Ok(json!(null)) },
        )
    }

    #[test]
    fn test_register_and_look_up_sub_parser() {
        let mut set = PluginSet::new(noop_parser());

        set.register_sub_parser(
            "length",
            Box::new(
                |data: &[u8], _metadata: &Metadata, _diag: &DiagnosticSink|
                 -> Result<Value, PluginError> { Ok(json!(data.len())) },
            ),
        );

        assert!(set.has_sub_parser("length"));
        assert!(!set.has_sub_parser("missing"));

        let sink = DiagnosticSink::new();
        let value = set
            .sub_parser("length")
            .unwrap()
            .parse(b"abc", &Metadata::new(), &sink)
            .unwrap();
        assert_eq!(value, json!(3));
    }

    #[test]
    fn test_sub_parser_names_preserve_registration_order() {
        let mut set = PluginSet::new(noop_parser());
        for name in ["zeta", "alpha", "mid"] {
            set.register_sub_parser(
                name,
                Box::new(
                    |_data: &[u8], _metadata: &Metadata, _diag: &DiagnosticSink|
                     -> Result<Value, PluginError> { Ok(json!(null)) },
                ),
            );
        }

        assert_eq!(set.sub_parser_names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_registry_take() {
        let mut registry = ParserRegistry::new();
        registry.register("svc", PluginSet::new(noop_parser()));

        assert!(registry.has_service("svc"));
        assert!(registry.take("svc").is_some());
        assert!(!registry.has_service("svc"));
        assert!(registry.take("svc").is_none());
    }

    #[test]
    fn test_registry_service_names() {
        let mut registry = ParserRegistry::new();
        registry.register("a", PluginSet::new(noop_parser()));
        registry.register("b", PluginSet::new(noop_parser()));

        let mut names = registry.service_names();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }
}
