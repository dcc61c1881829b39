//! Renderable interactive marker description
//!
//! These types describe what the visualization front end draws and which drag
//! gestures it offers. Hit-testing and gesture handling live in the front end;
//! the server only produces descriptions and consumes [`Feedback`].

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::pose::Pose;

/// How a control reacts to drag gestures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    #[default]
    None,
    Menu,
    Button,
    MoveAxis,
    MovePlane,
    RotateAxis,
    MoveRotate,
    Move3D,
    Rotate3D,
    MoveRotate3D,
}

/// Primitive drawn inside a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Cube,
    Sphere,
    Cylinder,
    TriangleList,
    MeshResource,
}

/// A single visual primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualMarker {
    pub kind: PrimitiveKind,
    /// Pose relative to the owning interactive marker
    pub pose: Pose,
    pub scale: Vec3,
    pub color: [f32; 4],
    /// Triangle vertices for [`PrimitiveKind::TriangleList`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<[f32; 3]>,
    /// Resource URI for [`PrimitiveKind::MeshResource`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_resource: Option<String>,
}

impl VisualMarker {
    pub fn new(kind: PrimitiveKind, scale: Vec3, color: [f32; 4]) -> Self {
        Self {
            kind,
            pose: Pose::IDENTITY,
            scale,
            color,
            points: Vec::new(),
            mesh_resource: None,
        }
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    pub fn with_points(mut self, points: Vec<[f32; 3]>) -> Self {
        self.points = points;
        self
    }

    pub fn with_mesh_resource(mut self, resource: impl Into<String>) -> Self {
        self.mesh_resource = Some(resource.into());
        self
    }
}

/// A control: a group of visuals sharing one interaction mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveMarkerControl {
    pub name: String,
    pub orientation: Quat,
    pub interaction_mode: InteractionMode,
    pub always_visible: bool,
    #[serde(default)]
    pub markers: Vec<VisualMarker>,
}

impl InteractiveMarkerControl {
    pub fn new(name: impl Into<String>, interaction_mode: InteractionMode) -> Self {
        Self {
            name: name.into(),
            orientation: Quat::IDENTITY,
            interaction_mode,
            always_visible: false,
            markers: Vec::new(),
        }
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn always_visible(mut self) -> Self {
        self.always_visible = true;
        self
    }

    pub fn with_marker(mut self, marker: VisualMarker) -> Self {
        self.markers.push(marker);
        self
    }
}

/// Six handles: translate and rotate along each local axis
pub fn axis_controls() -> Vec<InteractiveMarkerControl> {
    let axes = [
        ("x", Quat::from_xyzw(1.0, 0.0, 0.0, 1.0).normalize()),
        ("z", Quat::from_xyzw(0.0, 1.0, 0.0, 1.0).normalize()),
        ("y", Quat::from_xyzw(0.0, 0.0, 1.0, 1.0).normalize()),
    ];

    axes.iter()
        .flat_map(|(axis, orientation)| {
            [
                InteractiveMarkerControl::new(format!("rotate_{axis}"), InteractionMode::RotateAxis)
                    .with_orientation(*orientation),
                InteractiveMarkerControl::new(format!("move_{axis}"), InteractionMode::MoveAxis)
                    .with_orientation(*orientation),
            ]
        })
        .collect()
}

/// Everything the front end needs to draw and manipulate one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveMarker {
    pub name: String,
    pub description: String,
    pub frame_id: String,
    pub pose: Pose,
    /// Size of the manipulation handles
    pub scale: f32,
    pub controls: Vec<InteractiveMarkerControl>,
}

impl InteractiveMarker {
    pub fn new(name: impl Into<String>, frame_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            frame_id: frame_id.into(),
            pose: Pose::IDENTITY,
            scale: 1.0,
            controls: Vec::new(),
        }
    }

    pub fn control(&self, name: &str) -> Option<&InteractiveMarkerControl> {
        self.controls.iter().find(|c| c.name == name)
    }
}

/// Feedback event type reported by the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackEvent {
    KeepAlive,
    PoseUpdate,
    MenuSelect,
    ButtonClick,
    MouseDown,
    MouseUp,
}

/// User interaction with a marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub marker_name: String,
    #[serde(default)]
    pub control_name: String,
    pub event: FeedbackEvent,
    /// Frame the pose is expressed in
    pub frame_id: String,
    #[serde(default)]
    pub pose: Pose,
}

impl Feedback {
    pub fn new(
        marker_name: impl Into<String>,
        event: FeedbackEvent,
        frame_id: impl Into<String>,
        pose: Pose,
    ) -> Self {
        Self {
            marker_name: marker_name.into(),
            control_name: String::new(),
            event,
            frame_id: frame_id.into(),
            pose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_controls() {
        let controls = axis_controls();
        assert_eq!(controls.len(), 6);

        let names: Vec<&str> = controls.iter().map(|c| c.name.as_str()).collect();
        for expected in ["move_x", "rotate_x", "move_y", "rotate_y", "move_z", "rotate_z"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        assert!(
            controls
                .iter()
                .all(|c| (c.orientation.length() - 1.0).abs() < 1e-6)
        );
    }

    #[test]
    fn test_feedback_json_defaults() {
        let json = r#"{"marker_name":"b1","event":"mouse_down","frame_id":"map"}"#;
        let feedback: Feedback = serde_json::from_str(json).unwrap();
        assert_eq!(feedback.event, FeedbackEvent::MouseDown);
        assert_eq!(feedback.pose, Pose::IDENTITY);
        assert!(feedback.control_name.is_empty());
    }
}
