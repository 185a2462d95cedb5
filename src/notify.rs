use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};
use uuid::Uuid;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Event posted to the notification service when a resource is added to a
/// topic; the service fans it out to topic subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceNotification {
    pub topic_id: Uuid,
    pub resource_id: Uuid,
    pub resource_title: String,
    pub resource_type: String,
    pub author_name: String,
}

/// Best-effort client for the external notification service.
///
/// Delivery is fire-and-forget: failures are logged and never propagated, so
/// a notification outage cannot fail resource creation.
#[derive(Clone)]
pub struct Notifier {
    client: Client,
    endpoint: Option<String>,
}

impl Notifier {
    pub fn new(endpoint: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .context("failed to build notification HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.filter(|url| !url.trim().is_empty()),
        })
    }

    pub fn notify_new_resource(&self, notification: ResourceNotification) {
        let Some(endpoint) = self.endpoint.clone() else {
            debug!(
                resource_id = %notification.resource_id,
                "notification endpoint not configured; skipping new-resource event"
            );
            return;
        };

        let client = self.client.clone();
        tokio::spawn(async move {
            match client.post(&endpoint).json(&notification).send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    error!(
                        status = %response.status(),
                        resource_id = %notification.resource_id,
                        "notification service rejected new-resource event"
                    );
                }
                Err(err) => {
                    error!(
                        ?err,
                        resource_id = %notification.resource_id,
                        "failed to deliver new-resource notification"
                    );
                }
            }
        });
    }
}
