//! # Parserd: Message-Queue Parser Worker
//!
//! Parserd turns a parser plugin into a network-addressable service: it
//! receives a parsing job over NATS, dispatches the job's payload entries
//! to registered sub-parsers in order, feeds the aggregated outputs to a
//! top-level parser, and publishes the result (or a diagnostic error body)
//! to the job's reply subject.
//!
//! ## Features
//!
//! - **Opaque parser capabilities**: `Parser` and `SubParser` traits; the
//!   core never knows what is being parsed
//! - **Compiled-in plugin registry**: plugin sets are registered by service
//!   name at build time, no runtime code loading
//! - **One job in flight**: deliveries are processed strictly in order,
//!   one reply per job-bearing message
//! - **Diagnostic capture**: plugin output written during the invocation
//!   window becomes the error reply body on failure
//! - **Info path**: a descriptor reply (name, display name, extension,
//!   sub-parser names) with no parser invocation
//!
//! ## Example: job request
//!
//! ```json
//! { "metadata": { "source": "upload" },
//!   "data": [ { "sub_parser": "vulns", "data": "QUI=" } ] }
//! ```
//!
//! The reply body is the top-level parser's result on success, or freeform
//! diagnostic text on error; a `type` header (`success`/`error`) and the
//! request's `message-id` correlation token travel out-of-band.

// Core job pipeline
pub mod descriptor;
pub mod diagnostics;
pub mod dispatch;
pub mod job;
pub mod plugin;
pub mod reply;

// Worker loop and configuration
pub mod config;
pub mod worker;

// Compiled-in plugin sets
pub mod plugins;

// NATS integration
pub mod nats;

// Re-export key types
pub use config::{ConfigError, ServiceConfig};
pub use descriptor::ServiceDescriptor;
pub use diagnostics::DiagnosticSink;
pub use dispatch::{dispatch, DispatchError};
pub use job::{DecodeError, Job, Metadata, SubParserInput, SubParserOutput};
pub use plugin::{Parser, ParserRegistry, PluginError, PluginSet, SubParser};
pub use reply::{ReplyEnvelope, ReplyKind};
pub use worker::{process_delivery, Worker};

// Re-export nats types
pub use nats::{BrokerConfig, BrokerError, Delivery, NatsClient};
