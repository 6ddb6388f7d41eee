use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::application::{Application, ApplicationStatus};
use crate::models::application_event::{
    ApplicationEvent, NewApplicationEvent, TransitionPayload, EVENT_TYPE_UPDATE,
};
use crate::store::EventStore;

/// Appends to the application audit trail. Events are never updated or
/// deleted once written.
#[derive(Clone)]
pub struct EventRecorder {
    events: Arc<dyn EventStore>,
}

impl EventRecorder {
    pub fn new(events: Arc<dyn EventStore>) -> Self {
        Self { events }
    }

    pub async fn record(
        &self,
        application_id: Uuid,
        event_type: &str,
        payload: JsonValue,
    ) -> Result<ApplicationEvent> {
        let event = self
            .events
            .append_event(&NewApplicationEvent {
                application_id,
                event_type: event_type.to_string(),
                payload,
            })
            .await?;
        tracing::debug!(
            application_id = %application_id,
            event_id = %event.id,
            event_type,
            "Recorded application event"
        );
        Ok(event)
    }

    /// Records the `update` event for a committed transition.
    pub async fn record_transition(
        &self,
        updated: &Application,
        from_status: ApplicationStatus,
        reason: Option<String>,
    ) -> Result<ApplicationEvent> {
        let payload = serde_json::to_value(TransitionPayload {
            to_status: updated.status,
            from_status,
            version: updated.version,
            reason,
        })?;
        self.record(updated.id, EVENT_TYPE_UPDATE, payload).await
    }
}
