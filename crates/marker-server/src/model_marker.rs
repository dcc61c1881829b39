//! Interactive markers for a URDF robot model
//!
//! Every link is drawn by a marker anchored in its own frame
//! `"{model}/{link}"`. Dragging a link re-publishes the transform from its
//! parent frame, so child links follow through the transform tree. Each link
//! also carries a grasp point expressed in the link frame.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use marker_core::{
    Feedback, FeedbackEvent, InteractionMode, InteractiveMarker, InteractiveMarkerControl, Pose,
    PrimitiveKind, RobotModel, VisualMarker, axis_controls,
};

use crate::marker_server::InteractiveMarkerServer;
use crate::outbox::{OutboundEvent, Outbox};
use crate::tf::{StampedTransform, TransformBroadcaster, TransformLookup};

const LINK_CONTROL_NAME: &str = "link";
const GRASP_CONTROL_NAME: &str = "grasp_point";
const GRASP_SUFFIX: &str = "/grasp_point";
const LINK_MARKER_SCALE: f32 = 0.3;
const GRASP_MARKER_SCALE: f32 = 0.05;
const GRASP_COLOR: [f32; 3] = [1.0, 1.0, 0.0];

/// Inbound messages for the model marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ModelRequest {
    Feedback { feedback: Feedback },
    ResetPose {
        link: String,
    },
    ResetAll,
    /// Show or hide the six-axis handles of a link or of its grasp point
    SetMoveMarker {
        link: String,
        #[serde(default)]
        grasp: bool,
        enabled: bool,
    },
    /// Move the model root to `pose`, given in `frame_id`
    SetRootPose {
        pose: Pose,
        frame_id: String,
    },
}

/// Grasp point attached to a link
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GraspPoint {
    pub display_grasp_point: bool,
    pub display_move_marker: bool,
    /// Pose in the link frame
    pub pose: Pose,
}

/// Runtime state of one link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkProperty {
    pub frame_id: String,
    pub parent_frame: String,
    pub display_move_marker: bool,
    /// Current pose in `parent_frame`
    pub pose: Pose,
    /// Pose at load time in `parent_frame`
    pub origin: Pose,
    pub grasp: GraspPoint,
}

impl LinkProperty {
    fn grasp_frame(&self) -> String {
        format!("{}{}", self.frame_id, GRASP_SUFFIX)
    }

    fn transform(&self) -> StampedTransform {
        StampedTransform::new(&self.parent_frame, &self.frame_id, self.pose)
    }
}

/// Marker mirror of a robot model
pub struct UrdfModelMarker {
    model_name: String,
    frame_id: String,
    root_link: String,
    links: BTreeMap<String, LinkProperty>,
    visuals: BTreeMap<String, Vec<VisualMarker>>,
    markers: InteractiveMarkerServer,
    tf: Arc<dyn TransformLookup>,
    broadcaster: Arc<dyn TransformBroadcaster>,
    outbox: Arc<dyn Outbox>,
    timeout: Duration,
}

impl UrdfModelMarker {
    /// Build link markers for `model`, rooted at `root_pose` in `frame_id`
    ///
    /// The initial link transforms are broadcast and the markers published
    /// before this returns.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: &RobotModel,
        model_name: impl Into<String>,
        frame_id: impl Into<String>,
        root_pose: Pose,
        tf: Arc<dyn TransformLookup>,
        broadcaster: Arc<dyn TransformBroadcaster>,
        outbox: Arc<dyn Outbox>,
        timeout: Duration,
    ) -> Self {
        let model_name = model_name.into();
        let frame_id = frame_id.into();
        let link_frame = |link: &str| format!("{}/{}", model_name, link);

        let mut links = BTreeMap::new();
        let mut visuals = BTreeMap::new();
        for link in model.links() {
            let (parent_frame, origin) = match &link.parent {
                Some(parent) => (link_frame(parent), link.origin),
                None => (frame_id.clone(), root_pose),
            };
            links.insert(
                link.name.clone(),
                LinkProperty {
                    frame_id: link_frame(&link.name),
                    parent_frame,
                    display_move_marker: link.parent.is_none(),
                    pose: origin,
                    origin,
                    grasp: GraspPoint::default(),
                },
            );
            visuals.insert(link.name.clone(), link.visuals.clone());
        }

        let mut marker = Self {
            markers: InteractiveMarkerServer::new(format!("{}_marker", model_name)),
            model_name,
            frame_id,
            root_link: model.root_link.clone(),
            links,
            visuals,
            tf,
            broadcaster,
            outbox,
            timeout,
        };

        for property in marker.links.values() {
            marker.broadcaster.send_transform(property.transform());
        }
        let link_names: Vec<String> = marker.links.keys().cloned().collect();
        for link in &link_names {
            marker.render_link(link);
            marker.render_grasp(link);
        }
        marker.apply_changes();

        tracing::info!(
            "Loaded model '{}' with {} links in frame '{}'",
            marker.model_name,
            marker.links.len(),
            marker.frame_id
        );
        marker
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn link(&self, name: &str) -> Option<&LinkProperty> {
        self.links.get(name)
    }

    pub fn links(&self) -> impl Iterator<Item = (&str, &LinkProperty)> {
        self.links.iter().map(|(name, p)| (name.as_str(), p))
    }

    pub fn marker_server(&self) -> &InteractiveMarkerServer {
        &self.markers
    }

    pub fn handle(&mut self, request: ModelRequest) {
        match request {
            ModelRequest::Feedback { feedback } => self.process_feedback(&feedback),
            ModelRequest::ResetPose { link } => {
                self.reset_pose(&link);
            }
            ModelRequest::ResetAll => self.reset_all(),
            ModelRequest::SetMoveMarker {
                link,
                grasp,
                enabled,
            } => {
                self.set_move_marker(&link, grasp, enabled);
            }
            ModelRequest::SetRootPose { pose, frame_id } => {
                self.set_root_pose(pose, &frame_id);
            }
        }
    }

    /// Route feedback to the link or grasp point it belongs to
    pub fn process_feedback(&mut self, feedback: &Feedback) {
        if feedback.event != FeedbackEvent::PoseUpdate {
            return;
        }

        let name = feedback.marker_name.as_str();
        let Some(local) = name
            .strip_prefix(self.model_name.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            tracing::debug!("Feedback for foreign marker '{}' ignored", name);
            return;
        };

        match local.strip_suffix(GRASP_SUFFIX) {
            Some(link) if self.links.contains_key(link) => {
                self.grasp_point_feedback(link.to_string(), feedback)
            }
            _ if self.links.contains_key(local) => self.link_feedback(local.to_string(), feedback),
            _ => tracing::debug!("Feedback for unknown link marker '{}' ignored", name),
        }
    }

    fn link_feedback(&mut self, link: String, feedback: &Feedback) {
        self.move_link(link, &feedback.pose, &feedback.frame_id);
    }

    /// Place `link` at `pose` (given in `source_frame`) relative to its parent
    fn move_link(&mut self, link: String, pose: &Pose, source_frame: &str) -> bool {
        let Some(property) = self.links.get_mut(&link) else {
            return false;
        };

        let pose = match self.tf.transform_pose(
            &property.parent_frame,
            source_frame,
            pose,
            self.timeout,
        ) {
            Ok(pose) => pose,
            Err(e) => {
                tracing::error!("Transform error: {}", e);
                return false;
            }
        };

        property.pose = pose;
        self.broadcaster.send_transform(property.transform());
        let frame_id = property.frame_id.clone();
        let parent_frame = property.parent_frame.clone();

        // The link frame itself moved, so the marker rests at its origin again
        self.markers.set_pose(&frame_id, Pose::IDENTITY, &frame_id);
        self.apply_changes();

        tracing::debug!("Link '{}' moved in '{}'", link, parent_frame);
        self.outbox.publish(OutboundEvent::LinkPose {
            model: self.model_name.clone(),
            link,
            frame_id: parent_frame,
            pose,
        });
        true
    }

    /// Move the root link; false if the pose cannot be expressed in the fixed frame
    pub fn set_root_pose(&mut self, pose: Pose, frame_id: &str) -> bool {
        self.move_link(self.root_link.clone(), &pose, frame_id)
    }

    /// Toggle the axis handles of a link, or of its grasp point when `grasp`
    pub fn set_move_marker(&mut self, link: &str, grasp: bool, enabled: bool) -> bool {
        let Some(property) = self.links.get_mut(link) else {
            tracing::debug!("Move marker toggle for unknown link '{}' ignored", link);
            return false;
        };

        if grasp {
            property.grasp.display_move_marker = enabled;
            self.render_grasp(link);
        } else {
            property.display_move_marker = enabled;
            self.render_link(link);
        }
        self.apply_changes();
        true
    }

    fn grasp_point_feedback(&mut self, link: String, feedback: &Feedback) {
        let Some(property) = self.links.get_mut(&link) else {
            return;
        };

        let pose = match self.tf.transform_pose(
            &property.frame_id,
            &feedback.frame_id,
            &feedback.pose,
            self.timeout,
        ) {
            Ok(pose) => pose,
            Err(e) => {
                tracing::error!("Transform error: {}", e);
                return;
            }
        };

        property.grasp.pose = pose;
        property.grasp.display_grasp_point = true;
        self.broadcaster.send_transform(StampedTransform::new(
            &property.frame_id,
            property.grasp_frame(),
            pose,
        ));

        self.render_grasp(&link);
        self.apply_changes();
    }

    /// Restore a link to its load-time pose; false for unknown links
    pub fn reset_pose(&mut self, link: &str) -> bool {
        let Some(property) = self.links.get_mut(link) else {
            tracing::debug!("Reset of unknown link '{}' ignored", link);
            return false;
        };

        property.pose = property.origin;
        self.broadcaster.send_transform(property.transform());
        let frame_id = property.frame_id.clone();
        let parent_frame = property.parent_frame.clone();
        let pose = property.pose;

        self.markers.set_pose(&frame_id, Pose::IDENTITY, &frame_id);
        self.apply_changes();

        self.outbox.publish(OutboundEvent::LinkPose {
            model: self.model_name.clone(),
            link: link.to_string(),
            frame_id: parent_frame,
            pose,
        });
        true
    }

    pub fn reset_all(&mut self) {
        let link_names: Vec<String> = self.links.keys().cloned().collect();
        for link in &link_names {
            self.reset_pose(link);
        }
        tracing::info!("Reset all links of '{}'", self.model_name);
    }

    fn render_link(&mut self, link: &str) {
        let Some(property) = self.links.get(link) else {
            return;
        };

        let mut control =
            InteractiveMarkerControl::new(LINK_CONTROL_NAME, InteractionMode::MoveRotate3D)
                .always_visible();
        for visual in self.visuals.get(link).into_iter().flatten() {
            control = control.with_marker(visual.clone());
        }

        let mut marker = InteractiveMarker::new(&property.frame_id, &property.frame_id);
        marker.description = link.to_string();
        marker.scale = LINK_MARKER_SCALE;
        marker.controls.push(control);
        if property.display_move_marker {
            marker.controls.extend(axis_controls());
        }
        self.markers.insert(marker);
    }

    fn render_grasp(&mut self, link: &str) {
        let Some(property) = self.links.get(link) else {
            return;
        };

        let alpha = if property.grasp.display_grasp_point { 1.0 } else { 0.3 };
        let [r, g, b] = GRASP_COLOR;
        let sphere = VisualMarker::new(
            PrimitiveKind::Sphere,
            Vec3::splat(GRASP_MARKER_SCALE),
            [r, g, b, alpha],
        );

        let mut marker = InteractiveMarker::new(property.grasp_frame(), &property.frame_id);
        marker.description = format!("{} grasp point", link);
        marker.pose = property.grasp.pose;
        marker.scale = GRASP_MARKER_SCALE * 2.0;
        marker.controls.push(
            InteractiveMarkerControl::new(GRASP_CONTROL_NAME, InteractionMode::MoveRotate3D)
                .always_visible()
                .with_marker(sphere),
        );
        if property.grasp.display_move_marker {
            marker.controls.extend(axis_controls());
        }
        self.markers.insert(marker);
    }

    fn apply_changes(&mut self) {
        if let Some(update) = self.markers.apply_changes() {
            self.outbox.publish(OutboundEvent::MarkerUpdate(update));
        }
    }
}
