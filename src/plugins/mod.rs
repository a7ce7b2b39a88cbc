//! Compiled-in parser plugin sets.
//!
//! Deployments register their plugin implementations here, behind feature
//! flags where appropriate; the binary resolves the configured service name
//! against this registry at startup. Runtime code loading is deliberately
//! not supported.

#[cfg(feature = "echo-plugin")]
pub mod echo;

use crate::plugin::ParserRegistry;

/// Build the registry of all compiled-in plugin sets
pub fn builtin_registry() -> ParserRegistry {
    #[allow(unused_mut)]
    let mut registry = ParserRegistry::new();

    #[cfg(feature = "echo-plugin")]
    registry.register(echo::SERVICE_NAME, echo::plugin_set());

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(feature = "echo-plugin")]
    fn test_echo_set_is_registered() {
        let registry = builtin_registry();
        assert!(registry.has_service("echo"));
    }
}
