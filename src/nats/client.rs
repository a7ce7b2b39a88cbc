/// NATS client for the parser worker
///
/// Maps the worker's wire contract onto NATS: the request's discriminator
/// and correlation token travel as message headers, and the reply
/// destination is the message's reply subject.

use async_nats::{ConnectOptions, HeaderMap, Message, Subscriber};
use std::fmt;

use crate::descriptor::ServiceDescriptor;
use crate::reply::ReplyEnvelope;

/// Header carrying the request/reply discriminator (`info`, `success`,
/// `error`; job requests may omit it)
pub const TYPE_HEADER: &str = "type";

/// Header carrying the opaque correlation token copied from each request
/// onto its reply
pub const CORRELATION_HEADER: &str = "message-id";

/// Error type for broker operations
#[derive(Debug)]
pub enum BrokerError {
    Connect(String),
    Subscribe(String),
    Publish(String),
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::Connect(msg) => write!(f, "NATS connect failed: {}", msg),
            BrokerError::Subscribe(msg) => write!(f, "NATS subscribe failed: {}", msg),
            BrokerError::Publish(msg) => write!(f, "NATS publish failed: {}", msg),
        }
    }
}

impl std::error::Error for BrokerError {}

#[derive(Clone)]
pub struct BrokerConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("NATS_URL")
                .unwrap_or_else(|_| "nats://localhost:4222".to_string()),
            username: std::env::var("NATS_USERNAME").ok(),
            password: std::env::var("NATS_PASSWORD").ok(),
        }
    }
}

/// One inbound delivery, reduced to the tuple the worker core consumes:
/// body, discriminator, reply address, correlation token.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub body: Vec<u8>,
    pub kind: Option<String>,
    pub reply_to: Option<String>,
    pub correlation_id: Option<String>,
}

impl From<Message> for Delivery {
    fn from(message: Message) -> Self {
        let headers = message.headers.as_ref();
        let kind = headers
            .and_then(|h| h.get(TYPE_HEADER))
            .map(|v| v.as_str().to_string());
        let correlation_id = headers
            .and_then(|h| h.get(CORRELATION_HEADER))
            .map(|v| v.as_str().to_string());

        Self {
            body: message.payload.to_vec(),
            kind,
            reply_to: message.reply.map(|subject| subject.to_string()),
            correlation_id,
        }
    }
}

impl Delivery {
    /// Whether this request selects the descriptor-reply path
    pub fn is_info(&self) -> bool {
        self.kind.as_deref() == Some("info")
    }
}

#[derive(Clone)]
pub struct NatsClient {
    client: async_nats::Client,
}

impl NatsClient {
    /// Connect to NATS
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let options = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                ConnectOptions::with_user_and_password(username.clone(), password.clone())
            }
            _ => ConnectOptions::new(),
        };

        let client = options
            .connect(&config.url)
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;
        tracing::info!("Connected to NATS at {}", config.url);

        Ok(Self { client })
    }

    /// Subscribe to the worker's inbound queue
    pub async fn subscribe(&self, queue: &str) -> Result<Subscriber, BrokerError> {
        self.client
            .subscribe(queue.to_string())
            .await
            .map_err(|e| BrokerError::Subscribe(e.to_string()))
    }

    /// Publish one job reply, tagging it out-of-band with its discriminator
    /// and the request's correlation token
    pub async fn publish_reply(
        &self,
        reply_to: &str,
        envelope: &ReplyEnvelope,
    ) -> Result<(), BrokerError> {
        let mut headers = HeaderMap::new();
        headers.insert(TYPE_HEADER, envelope.kind.as_str());
        if let Some(correlation_id) = &envelope.correlation_id {
            headers.insert(CORRELATION_HEADER, correlation_id.as_str());
        }

        self.client
            .publish_with_headers(
                reply_to.to_string(),
                headers,
                envelope.payload.clone().into_bytes().into(),
            )
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;

        Ok(())
    }

    /// Publish the service descriptor to an info request's reply subject.
    ///
    /// Info replies are a bare body with no type or correlation headers.
    pub async fn publish_info(
        &self,
        reply_to: &str,
        descriptor: &ServiceDescriptor,
    ) -> Result<(), BrokerError> {
        let body =
            serde_json::to_vec(descriptor).map_err(|e| BrokerError::Publish(e.to_string()))?;

        self.client
            .publish(reply_to.to_string(), body.into())
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;

        Ok(())
    }

    /// Check if the NATS connection is active
    pub fn is_connected(&self) -> bool {
        self.client.connection_state() == async_nats::connection::State::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(kind: Option<&str>) -> Delivery {
        Delivery {
            body: Vec::new(),
            kind: kind.map(String::from),
            reply_to: Some("reply.subject".to_string()),
            correlation_id: Some("token".to_string()),
        }
    }

    #[test]
    fn test_info_discriminator() {
        assert!(delivery(Some("info")).is_info());
        assert!(!delivery(None).is_info());
        assert!(!delivery(Some("parse")).is_info());
    }
}
