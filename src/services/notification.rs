use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::flight::{Category, FlightId, Phase};
use crate::models::resource::ResourceKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum EventKind {
    PhaseChanged(Phase),
    AcquireAttempt(ResourceKind),
    Granted(ResourceKind),
    Backoff(ResourceKind),
    Promoted(ResourceKind),
    Crashed(ResourceKind),
    Completed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlightEvent {
    pub flight_id: FlightId,
    pub category: Category,
    pub kind: EventKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl FlightEvent {
    pub fn new(flight_id: FlightId, category: Category, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            flight_id,
            category,
            kind,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Receives lifecycle and arbitration events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: FlightEvent);
}

/// Writes every event to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: FlightEvent) {
        let FlightEvent { flight_id, category, kind, message, .. } = event;
        match kind {
            EventKind::Crashed(resource) => tracing::error!(
                flight = flight_id,
                category = %category,
                resource = %resource,
                "{}", message
            ),
            EventKind::Promoted(resource) | EventKind::Backoff(resource) => tracing::warn!(
                flight = flight_id,
                category = %category,
                resource = %resource,
                "{}", message
            ),
            EventKind::Granted(resource) => tracing::info!(
                flight = flight_id,
                category = %category,
                resource = %resource,
                "{}", message
            ),
            EventKind::AcquireAttempt(resource) => tracing::debug!(
                flight = flight_id,
                category = %category,
                resource = %resource,
                "{}", message
            ),
            EventKind::PhaseChanged(_) | EventKind::Completed => tracing::info!(
                flight = flight_id,
                category = %category,
                "{}", message
            ),
        }
    }
}

/// Forwards events over an unbounded channel; used to observe a run from outside.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<FlightEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FlightEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: FlightEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.publish(FlightEvent::new(1, Category::Domestic, EventKind::AcquireAttempt(ResourceKind::Tower), "a"));
        sink.publish(FlightEvent::new(1, Category::Domestic, EventKind::Granted(ResourceKind::Tower), "b"));

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::AcquireAttempt(ResourceKind::Tower));
        assert_eq!(rx.recv().await.unwrap().message, "b");
    }

    #[test]
    fn test_publish_after_receiver_dropped_is_silent() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.publish(FlightEvent::new(2, Category::International, EventKind::Completed, "done"));
    }

    #[test]
    fn test_tracing_sink_levels() {
        use parking_lot::Mutex;
        use std::sync::Arc;
        use tracing::{Event, Level, Subscriber};
        use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

        struct Levels(Arc<Mutex<Vec<Level>>>);

        impl<S: Subscriber> Layer<S> for Levels {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                self.0.lock().push(*event.metadata().level());
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(Levels(seen.clone()));
        tracing::subscriber::with_default(subscriber, || {
            for kind in [
                EventKind::AcquireAttempt(ResourceKind::Gate),
                EventKind::Granted(ResourceKind::Gate),
                EventKind::PhaseChanged(Phase::Deboarding),
                EventKind::Backoff(ResourceKind::Gate),
                EventKind::Promoted(ResourceKind::Gate),
                EventKind::Crashed(ResourceKind::Gate),
                EventKind::Completed,
            ] {
                TracingSink.publish(FlightEvent::new(4, Category::Domestic, kind, "x"));
            }
        });

        assert_eq!(
            *seen.lock(),
            vec![
                Level::DEBUG,
                Level::INFO,
                Level::INFO,
                Level::WARN,
                Level::WARN,
                Level::ERROR,
                Level::INFO,
            ]
        );
    }

    #[test]
    fn test_event_serializes_with_tagged_kind() {
        let event = FlightEvent::new(3, Category::International, EventKind::Promoted(ResourceKind::Runway), "MAYDAY");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"]["type"], "promoted");
        assert_eq!(json["kind"]["detail"], "runway");
        assert_eq!(json["category"], "international");
    }
}
