use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::executor::http::{HttpClient, JsonPost};
use crate::executor::{Event, EventSink};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts terminal events to a URL. Fire-and-forget: delivery failures are logged only.
pub struct WebhookEventSink {
    url: url::Url,
    http: Arc<dyn HttpClient>,
    base: Arc<dyn EventSink>,
}

impl WebhookEventSink {
    pub fn new(
        url: &str,
        http: Arc<dyn HttpClient>,
        base: Arc<dyn EventSink>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: url::Url::parse(url)?,
            http,
            base,
        })
    }
}

#[async_trait]
impl EventSink for WebhookEventSink {
    async fn emit(&self, event: Event) {
        let notify = matches!(event, Event::StepFinished { .. } | Event::StepAborted { .. });
        let payload = notify.then(|| event.to_json());
        self.base.emit(event).await;

        let Some(body) = payload else {
            return;
        };
        let post = JsonPost {
            url: self.url.clone(),
            body,
        };

        let http = self.http.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(WEBHOOK_TIMEOUT, http.post_json(post, WEBHOOK_TIMEOUT)).await {
                Ok(Ok(status)) if status >= 400 => {
                    tracing::warn!(status, "webhook returned an error status");
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "webhook delivery failed"),
                Err(_) => tracing::warn!("webhook delivery timed out"),
            }
        });
    }
}
