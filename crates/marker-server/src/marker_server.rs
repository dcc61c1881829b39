//! Batched interactive marker publication
//!
//! Changes are queued per marker name and become visible together on
//! [`InteractiveMarkerServer::apply_changes`], which yields one
//! [`MarkerUpdate`] describing the whole batch.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use marker_core::{InteractiveMarker, Pose};

/// Pose-only change of a published marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerPoseUpdate {
    pub name: String,
    pub frame_id: String,
    pub pose: Pose,
}

/// One applied batch of marker changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerUpdate {
    pub server_id: String,
    pub seq_num: u64,
    pub markers: Vec<InteractiveMarker>,
    pub poses: Vec<MarkerPoseUpdate>,
    pub erases: Vec<String>,
}

impl MarkerUpdate {
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty() && self.poses.is_empty() && self.erases.is_empty()
    }
}

#[derive(Debug, Clone)]
enum PendingChange {
    Full(InteractiveMarker),
    Pose { frame_id: String, pose: Pose },
    Erase,
}

/// Holds published markers and queues changes until applied
pub struct InteractiveMarkerServer {
    server_id: String,
    seq_num: u64,
    published: HashMap<String, InteractiveMarker>,
    // Ordered so a batch lists markers deterministically
    pending: BTreeMap<String, PendingChange>,
}

impl InteractiveMarkerServer {
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            seq_num: 0,
            published: HashMap::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Queue a full marker (insert or replace)
    pub fn insert(&mut self, marker: InteractiveMarker) {
        self.pending
            .insert(marker.name.clone(), PendingChange::Full(marker));
    }

    /// Queue a pose change; returns false if no such marker exists or is pending
    pub fn set_pose(&mut self, name: &str, pose: Pose, frame_id: &str) -> bool {
        match self.pending.get_mut(name) {
            Some(PendingChange::Full(marker)) => {
                marker.pose = pose;
                marker.frame_id = frame_id.to_string();
                true
            }
            Some(PendingChange::Erase) => false,
            Some(PendingChange::Pose { .. }) | None => {
                if !self.published.contains_key(name) && !self.pending.contains_key(name) {
                    return false;
                }
                self.pending.insert(
                    name.to_string(),
                    PendingChange::Pose {
                        frame_id: frame_id.to_string(),
                        pose,
                    },
                );
                true
            }
        }
    }

    /// Record a pose the front end already shows, without publishing it
    pub fn sync_pose(&mut self, name: &str, pose: Pose, frame_id: &str) -> bool {
        let marker = match self.pending.get_mut(name) {
            Some(PendingChange::Full(marker)) => Some(marker),
            _ => self.published.get_mut(name),
        };
        let Some(marker) = marker else {
            return false;
        };
        marker.pose = pose;
        marker.frame_id = frame_id.to_string();
        true
    }

    /// Queue removal; returns false if the marker is neither published nor pending
    pub fn erase(&mut self, name: &str) -> bool {
        let known = self.published.contains_key(name)
            || matches!(self.pending.get(name), Some(PendingChange::Full(_)));
        if known {
            self.pending.insert(name.to_string(), PendingChange::Erase);
        }
        known
    }

    /// Publish every queued change at once
    ///
    /// Returns `None` when nothing effective was queued.
    pub fn apply_changes(&mut self) -> Option<MarkerUpdate> {
        if self.pending.is_empty() {
            return None;
        }

        let mut update = MarkerUpdate {
            server_id: self.server_id.clone(),
            seq_num: self.seq_num,
            markers: Vec::new(),
            poses: Vec::new(),
            erases: Vec::new(),
        };

        for (name, change) in std::mem::take(&mut self.pending) {
            match change {
                PendingChange::Full(marker) => {
                    update.markers.push(marker.clone());
                    self.published.insert(name, marker);
                }
                PendingChange::Pose { frame_id, pose } => {
                    if let Some(marker) = self.published.get_mut(&name) {
                        marker.pose = pose;
                        marker.frame_id = frame_id.clone();
                        update.poses.push(MarkerPoseUpdate {
                            name,
                            frame_id,
                            pose,
                        });
                    }
                }
                PendingChange::Erase => {
                    // Inserted and erased within one batch: nothing to tell anyone
                    if self.published.remove(&name).is_some() {
                        update.erases.push(name);
                    }
                }
            }
        }

        if update.is_empty() {
            return None;
        }
        self.seq_num += 1;
        Some(update)
    }

    /// Published state of a marker
    pub fn get(&self, name: &str) -> Option<&InteractiveMarker> {
        self.published.get(name)
    }

    pub fn len(&self) -> usize {
        self.published.len()
    }

    pub fn is_empty(&self) -> bool {
        self.published.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
