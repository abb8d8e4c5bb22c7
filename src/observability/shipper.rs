//! Log shipping to an external HTTP intake.
//!
//! # Responsibilities
//! - Enrich each record with static metadata (source, service, tags)
//! - POST enriched records to the configured intake endpoint
//! - Keep shipping failures invisible to request handling
//!
//! # Design Decisions
//! - Records cross to a background task over an unbounded channel, so the
//!   sink's `write` never blocks a request
//! - Delivery failures are reported on the ambient tracing channel only

use reqwest::Client;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::ShippingConfig;
use crate::observability::logging::LogSink;

/// Sink that forwards records to an HTTP log intake.
#[derive(Clone)]
pub struct LogShipper {
    tx: mpsc::UnboundedSender<Value>,
    source: String,
    service: String,
    tags: String,
}

impl LogShipper {
    /// Build the sink and spawn its delivery task.
    pub fn spawn(config: &ShippingConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        let endpoint = config.endpoint.clone();
        let api_key = config.api_key.clone();
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();

        tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                let result = client
                    .post(&endpoint)
                    .header("DD-API-KEY", &api_key)
                    .json(&payload)
                    .send()
                    .await;
                match result {
                    Ok(response) if !response.status().is_success() => {
                        tracing::warn!(status = %response.status(), "log intake rejected record");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "log shipping failed");
                    }
                    Ok(_) => {}
                }
            }
        });

        Ok(Self {
            tx,
            source: config.source.clone(),
            service: config.service.clone(),
            tags: config.tags.join(","),
        })
    }
}

/// Merge the record with the shipper's static metadata.
fn enrich(record: &Value, source: &str, service: &str, tags: &str) -> Value {
    let mut payload = match record {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("message".to_string(), Value::from(other.to_string()));
            map
        }
    };
    payload.insert("ddsource".to_string(), Value::from(source));
    payload.insert("service".to_string(), Value::from(service));
    payload.insert("ddtags".to_string(), Value::from(tags));
    Value::Object(payload)
}

impl LogSink for LogShipper {
    fn write(&self, record: &Value) {
        let payload = enrich(record, &self.source, &self.service, &self.tags);
        // Receiver gone means shutdown is underway; the record is dropped.
        let _ = self.tx.send(payload);
    }
}
