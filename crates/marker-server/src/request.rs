//! Inbound message surface of the registry

use serde::{Deserialize, Serialize};

use marker_core::{Feedback, MarkerDimensions, Pose, ShapeKind};

use crate::config::InteractiveSettings;

/// Marker lifecycle action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperateAction {
    Insert,
    Erase,
    EraseAll,
    EraseFocus,
}

/// Lifecycle request for transformable objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerOperate {
    pub action: OperateAction,
    /// Shape wire code, see [`ShapeKind::from_code`]
    #[serde(rename = "type", default)]
    pub shape: u8,
    #[serde(default)]
    pub frame_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl MarkerOperate {
    pub fn insert(
        kind: ShapeKind,
        frame_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action: OperateAction::Insert,
            shape: kind.code(),
            frame_id: frame_id.into(),
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn erase(name: impl Into<String>) -> Self {
        Self {
            action: OperateAction::Erase,
            shape: 0,
            frame_id: String::new(),
            name: name.into(),
            description: String::new(),
        }
    }
}

/// Inbound messages and service calls
///
/// Attribute setters act on the focused object. Queries with an empty
/// `target` also resolve to the focused object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    SetPose {
        pose: Pose,
        frame_id: String,
    },
    SetColor {
        color: [f32; 4],
    },
    SetRadius {
        value: f32,
    },
    SetSmallRadius {
        value: f32,
    },
    SetX {
        value: f32,
    },
    SetY {
        value: f32,
    },
    SetZ {
        value: f32,
    },
    AddPose {
        pose: Pose,
    },
    AddPoseRelative {
        pose: Pose,
    },
    GetPose {
        #[serde(default)]
        target: String,
    },
    GetType {
        #[serde(default)]
        target: String,
    },
    SetDimensions {
        #[serde(default)]
        target: String,
        dimensions: MarkerDimensions,
    },
    GetDimensions {
        #[serde(default)]
        target: String,
    },
    RequestMarkerOperate {
        operate: MarkerOperate,
    },
    Feedback {
        feedback: Feedback,
    },
    Reconfigure {
        settings: InteractiveSettings,
    },
}

/// Reply to a [`Request`]
///
/// Topic-style requests are answered with `Ack`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Response {
    Ack,
    Pose { pose: Pose },
    Type { kind: Option<ShapeKind> },
    Dimensions { dimensions: MarkerDimensions },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operate_request() {
        let json = r#"{"op":"request_marker_operate","operate":{"action":"insert","type":1,"frame_id":"map","name":"c1"}}"#;
        let request: Request = serde_json::from_str(json).unwrap();

        let Request::RequestMarkerOperate { operate } = request else {
            panic!("unexpected request: {request:?}");
        };
        assert_eq!(operate.action, OperateAction::Insert);
        assert_eq!(ShapeKind::from_code(operate.shape), Some(ShapeKind::Cylinder));
        assert!(operate.description.is_empty());
    }

    #[test]
    fn test_parse_set_pose() {
        let json = r#"{"op":"set_pose","frame_id":"odom","pose":{"position":[1.0,2.0,3.0],"orientation":[0.0,0.0,0.0,1.0]}}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(request, Request::SetPose { ref frame_id, .. } if frame_id == "odom"));
    }

    #[test]
    fn test_query_target_defaults_to_focus() {
        let request: Request = serde_json::from_str(r#"{"op":"get_pose"}"#).unwrap();
        assert_eq!(request, Request::GetPose { target: String::new() });
    }
}
