//! Work item — one firing of a scheduled or triggered event.
//!
//! Work items are transient: they are owned by whichever queue or worker
//! currently holds them and are never persisted.

use serde::{Deserialize, Serialize};

use crate::path::EventPath;
use crate::payload::EventPayload;
use crate::triggered::TriggeredEvent;

/// Which kind of event produced a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    Scheduled,
    Triggered,
}

/// A transient unit of dispatch.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub path: EventPath,
    pub kind: WorkItemKind,
    pub serialized: bool,
    pub loggable: bool,
    /// The triggering payload, present only for triggered items. Each item
    /// carries its own defensive copy.
    pub payload: Option<EventPayload>,
}

impl WorkItem {
    /// Work item for a scheduled firing.
    #[must_use]
    pub fn scheduled(path: EventPath) -> Self {
        Self {
            path,
            kind: WorkItemKind::Scheduled,
            serialized: false,
            loggable: true,
            payload: None,
        }
    }

    /// Work item for a triggered firing, cloning the matched payload.
    #[must_use]
    pub fn triggered(event: &TriggeredEvent, payload: &EventPayload) -> Self {
        Self {
            path: event.path.clone(),
            kind: WorkItemKind::Triggered,
            serialized: event.serialized,
            loggable: event.loggable,
            payload: Some(payload.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    #[test]
    fn should_build_scheduled_item_without_payload() {
        let item = WorkItem::scheduled(EventPath::parse("/heating/morning").unwrap());
        assert_eq!(item.kind, WorkItemKind::Scheduled);
        assert!(!item.serialized);
        assert!(item.payload.is_none());
    }

    #[test]
    fn should_copy_flags_and_payload_from_triggered_event() {
        let event = TriggeredEvent::builder()
            .path(EventPath::parse("/security/siren").unwrap())
            .filter(Filter::IsNight)
            .serialized(true)
            .loggable(false)
            .build()
            .unwrap();
        let payload = EventPayload::new().with("state", "detected");
        let item = WorkItem::triggered(&event, &payload);
        assert_eq!(item.kind, WorkItemKind::Triggered);
        assert!(item.serialized);
        assert!(!item.loggable);
        assert_eq!(item.payload.as_ref().unwrap().get("state").unwrap(), "detected");
    }

    #[test]
    fn should_own_independent_payload_copies_per_item() {
        let event = TriggeredEvent::builder()
            .path(EventPath::parse("/security/siren").unwrap())
            .filter(Filter::IsNight)
            .build()
            .unwrap();
        let payload = EventPayload::new().with("n", 1);
        let a = WorkItem::triggered(&event, &payload);
        let b = WorkItem::triggered(&event, &payload);
        assert_eq!(a.payload, b.payload);
        drop(a);
        assert!(b.payload.is_some());
    }
}
