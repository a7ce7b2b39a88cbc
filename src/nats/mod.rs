/// NATS integration module
///
/// Provides the broker client plus the delivery/reply wire mapping used by
/// the worker loop

pub mod client;

pub use client::{BrokerConfig, BrokerError, Delivery, NatsClient, CORRELATION_HEADER, TYPE_HEADER};
