// 11.0: every state change produces an event. used for the admin audit trail and for
// notifying downstream consumers that a new configuration version is live.
// the EventPayload enum lists all event types.

use serde::{Deserialize, Serialize};

use crate::engine::ImportMode;
use crate::types::{EntityKind, ItemId, Timestamp, VersionId, VersionTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub entity: EntityKind,
    pub actor: String,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    // Draft events
    DraftCreated { id: ItemId },
    DraftUpdated { id: ItemId },
    DraftDeleted { id: ItemId },
    DraftCheckedOut { id: ItemId },
    ItemRetired { id: ItemId },

    // Ledger events
    Published(PublishedEvent),
    PublishRejected { failed: usize, reason: String },
    RolledBack(RolledBackEvent),

    // Bulk events
    Imported(ImportedEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub version_id: VersionId,
    pub version_tag: VersionTag,
    pub drafts_applied: usize,
    pub retired: usize,
    pub item_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolledBackEvent {
    pub version_id: VersionId,
    pub version_tag: VersionTag,
    pub target_id: VersionId,
    pub target_tag: VersionTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedEvent {
    pub mode: ImportMode,
    pub success_count: usize,
    pub failed_count: usize,
    pub cancelled: bool,
}

/// Bounded in-memory audit log. the oldest events drop once `max_events` is reached.
#[derive(Debug)]
pub struct EventLog {
    events: Vec<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn record(&mut self, timestamp: Timestamp, entity: EntityKind, actor: &str, payload: EventPayload) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;

        tracing::trace!(event_id = id.0, %entity, ?payload, "event recorded");
        self.events.push(Event {
            id,
            timestamp,
            entity,
            actor: actor.to_string(),
            payload,
        });

        if self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(0..drain_count);
        }
        id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ids_are_sequential() {
        let mut log = EventLog::new(10);
        let a = log.record(
            Timestamp::from_millis(1),
            EntityKind::TradingFee,
            "ops",
            EventPayload::DraftCreated { id: ItemId::from("fee-0001") },
        );
        let b = log.record(
            Timestamp::from_millis(2),
            EntityKind::TradingFee,
            "ops",
            EventPayload::DraftDeleted { id: ItemId::from("fee-0001") },
        );
        assert!(a < b);
        assert_eq!(log.len(), 2);
        assert_eq!(log.recent(1)[0].id, b);
    }

    #[test]
    fn log_is_bounded() {
        let mut log = EventLog::new(3);
        for i in 0..5 {
            log.record(
                Timestamp::from_millis(i),
                EntityKind::NavRoute,
                "ops",
                EventPayload::DraftUpdated { id: ItemId::new(format!("nav-{i}")) },
            );
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.events()[0].id, EventId(3));
    }

    #[test]
    fn payload_serializes_with_type_tag() {
        let payload = EventPayload::PublishRejected { failed: 2, reason: "validation".to_string() };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "publish_rejected");
        assert_eq!(json["failed"], 2);
    }
}
