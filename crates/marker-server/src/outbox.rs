//! Outbound topics

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use marker_core::{MarkerDimensions, OverlayText, Pose};

use crate::marker_server::MarkerUpdate;

/// Everything the server publishes to other processes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Batched changes for the visualization front end
    MarkerUpdate(MarkerUpdate),
    /// Name of the focused marker
    FocusText(OverlayText),
    /// Pose of the focused marker
    FocusPose(OverlayText),
    /// Dimensions after a successful change
    MarkerDimensions(MarkerDimensions),
    /// Link pose after a model link was dragged
    LinkPose {
        model: String,
        link: String,
        frame_id: String,
        pose: Pose,
    },
}

/// Sink for outbound events
pub trait Outbox: Send + Sync {
    fn publish(&self, event: OutboundEvent);
}

/// Outbox that queues events until drained
#[derive(Default)]
pub struct EventQueue {
    events: Mutex<Vec<OutboundEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all queued events in publish order
    pub fn drain(&self) -> Vec<OutboundEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Outbox for EventQueue {
    fn publish(&self, event: OutboundEvent) {
        self.events.lock().push(event);
    }
}
