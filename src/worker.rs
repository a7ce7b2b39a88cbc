//! Worker loop: consumes the service queue one message at a time.
//!
//! Exactly one reply is published per job-bearing message, success or
//! error; info requests get the service descriptor instead. Deliveries are
//! processed strictly in order with one job in flight: the next message
//! is not taken until the previous reply has been published. Delivery is
//! at-most-once: a message is consumed on receipt, so a crash mid-dispatch
//! loses that job rather than requeuing it.

use futures::StreamExt;

use crate::descriptor::ServiceDescriptor;
use crate::diagnostics::DiagnosticSink;
use crate::dispatch::dispatch;
use crate::job::Job;
use crate::nats::{BrokerError, Delivery, NatsClient};
use crate::plugin::PluginSet;
use crate::reply::ReplyEnvelope;

/// Run one job-bearing delivery to its reply envelope.
///
/// Never fails: every decode or dispatch error becomes an error reply whose
/// body is the diagnostic text captured during the attempt plus the failure
/// description. Captured diagnostics are also mirrored to the log.
pub fn process_delivery(delivery: &Delivery, plugins: &PluginSet) -> ReplyEnvelope {
    let diag = DiagnosticSink::new();

    let outcome = match Job::decode(&delivery.body) {
        Ok(job) => dispatch(&job, plugins, &diag)
            .map_err(|e| e.to_string())
            .and_then(|result| serde_json::to_string(&result).map_err(|e| e.to_string())),
        Err(e) => Err(e.to_string()),
    };

    match outcome {
        Ok(payload) => {
            let captured = diag.take();
            if !captured.is_empty() {
                tracing::info!("{}", captured.trim_end());
            }
            ReplyEnvelope::success(delivery.correlation_id.clone(), payload)
        }
        Err(description) => {
            diag.write(&description);
            let captured = diag.take();
            tracing::info!("{}", captured.trim_end());
            ReplyEnvelope::error(delivery.correlation_id.clone(), captured)
        }
    }
}

/// The message-queue parser worker: descriptor, plugin set, broker client.
///
/// All state is fixed at startup and read-only across jobs.
pub struct Worker {
    client: NatsClient,
    descriptor: ServiceDescriptor,
    plugins: PluginSet,
}

impl Worker {
    /// Create a worker
    pub fn new(client: NatsClient, descriptor: ServiceDescriptor, plugins: PluginSet) -> Self {
        Self {
            client,
            descriptor,
            plugins,
        }
    }

    /// Consume the service queue until the subscription ends.
    ///
    /// Job failures become error replies and the loop continues; broker
    /// failures (subscribe, publish) are fatal and propagate to the caller.
    pub async fn run(&self) -> Result<(), BrokerError> {
        let queue = self.descriptor.queue();
        let mut deliveries = self.client.subscribe(&queue).await?;
        tracing::info!(
            "Worker '{}' consuming from queue '{}'",
            self.descriptor.name,
            queue
        );

        while let Some(message) = deliveries.next().await {
            self.handle(Delivery::from(message)).await?;
        }

        Ok(())
    }

    /// Handle one delivery: info requests get the descriptor, everything
    /// else is decoded and dispatched.
    ///
    /// A delivery with no reply subject is dropped with a warning; the
    /// worker has nowhere to publish its outcome.
    pub async fn handle(&self, delivery: Delivery) -> Result<(), BrokerError> {
        let reply_to = match &delivery.reply_to {
            Some(reply_to) => reply_to.clone(),
            None => {
                tracing::warn!("Dropping message with no reply subject");
                return Ok(());
            }
        };

        // The info path replies with the descriptor and touches no parser,
        // regardless of any body present.
        if delivery.is_info() {
            tracing::debug!("Publishing service descriptor to '{}'", reply_to);
            return self.client.publish_info(&reply_to, &self.descriptor).await;
        }

        let envelope = process_delivery(&delivery, &self.plugins);
        tracing::debug!(
            "Publishing {} reply to '{}'",
            envelope.kind.as_str(),
            reply_to
        );
        self.client.publish_reply(&reply_to, &envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Metadata, SubParserOutput};
    use crate::plugin::PluginError;
    use crate::reply::ReplyKind;
    use serde_json::{json, Value};

    fn delivery(body: Value) -> Delivery {
        Delivery {
            body: serde_json::to_vec(&body).unwrap(),
            kind: None,
            reply_to: Some("reply.subject".to_string()),
            correlation_id: Some("corr-1".to_string()),
        }
    }

    fn length_set() -> PluginSet {
        let mut plugins = PluginSet::new(Box::new(
            |outputs: &[SubParserOutput], _metadata: &Metadata, _diag: &DiagnosticSink|
             -> Result<Value, PluginError> {
                let total: u64 = outputs
                    .iter()
                    .map(|o| o.value.as_u64().unwrap_or(0))
                    .sum();
                Ok(json!({ "total": total }))
            },
        ));
        plugins.register_sub_parser(
            "x",
            Box::new(
                |data: &[u8], _metadata: &Metadata, _diag: &DiagnosticSink|
                 -> Result<Value, PluginError> { Ok(json!(data.len())) },
            ),
        );
        plugins
    }

    #[test]
    fn test_success_reply() {
        // base64("AB") == "QUI="
        let delivery = delivery(json!({
            "metadata": {"k": 1},
            "data": [{"sub_parser": "x", "data": "QUI="}]
        }));

        let envelope = process_delivery(&delivery, &length_set());

        assert_eq!(envelope.kind, ReplyKind::Success);
        assert_eq!(envelope.correlation_id.as_deref(), Some("corr-1"));
        assert_eq!(
            serde_json::from_str::<Value>(&envelope.payload).unwrap(),
            json!({ "total": 2 })
        );
    }

    #[test]
    fn test_decode_failure_becomes_error_reply() {
        let delivery = Delivery {
            body: b"{not json".to_vec(),
            kind: None,
            reply_to: Some("reply.subject".to_string()),
            correlation_id: Some("corr-2".to_string()),
        };

        let envelope = process_delivery(&delivery, &length_set());

        assert_eq!(envelope.kind, ReplyKind::Error);
        assert_eq!(envelope.correlation_id.as_deref(), Some("corr-2"));
        assert!(envelope.payload.contains("not valid JSON"));
    }

    #[test]
    fn test_unknown_sub_parser_becomes_error_reply() {
        let delivery = delivery(json!({
            "metadata": {},
            "data": [{"sub_parser": "nope", "data": "QUI="}]
        }));

        let envelope = process_delivery(&delivery, &length_set());

        assert_eq!(envelope.kind, ReplyKind::Error);
        assert!(envelope.payload.contains("Unknown sub-parser: nope"));
    }

    #[test]
    fn test_error_reply_carries_captured_diagnostics() {
        let mut plugins = PluginSet::new(Box::new(
            |_outputs: &[SubParserOutput], _metadata: &Metadata, _diag: &DiagnosticSink|
             -> Result<Value, PluginError> { Ok(json!(null)) },
        ));
        plugins.register_sub_parser(
            "noisy",
            Box::new(
                |_data: &[u8], _metadata: &Metadata, diag: &DiagnosticSink|
                 -> Result<Value, PluginError> {
                    diag.write("reading header block");
                    Err(PluginError::Execution("truncated payload".to_string()))
                },
            ),
        );

        let delivery = delivery(json!({
            "metadata": {},
            "data": [{"sub_parser": "noisy", "data": ""}]
        }));

        let envelope = process_delivery(&delivery, &plugins);

        assert_eq!(envelope.kind, ReplyKind::Error);
        // Captured plugin output precedes the failure description.
        let diag_at = envelope.payload.find("reading header block").unwrap();
        let error_at = envelope.payload.find("truncated payload").unwrap();
        assert!(diag_at < error_at);
    }

    #[test]
    fn test_no_correlation_token() {
        let mut delivery = delivery(json!({
            "metadata": {},
            "data": []
        }));
        delivery.correlation_id = None;

        let envelope = process_delivery(&delivery, &length_set());
        assert!(envelope.correlation_id.is_none());
    }
}
