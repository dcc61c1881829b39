//! Overlay text shown on top of the 3D view

use serde::{Deserialize, Serialize};

use crate::pose::Pose;

/// A text box drawn in screen space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayText {
    pub text: String,
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
    pub bg_color: [f32; 4],
    pub fg_color: [f32; 4],
    pub line_width: u32,
    pub text_size: f32,
}

const OVERLAY_BG: [f32; 4] = [0.9, 0.9, 0.9, 0.1];

impl OverlayText {
    /// Overlay carrying the focused marker name (empty when nothing is focused)
    pub fn focus_name(name: Option<&str>) -> Self {
        Self {
            text: name.unwrap_or_default().to_string(),
            top: 0,
            left: 0,
            width: 300,
            height: 50,
            bg_color: OVERLAY_BG,
            fg_color: [0.3, 0.3, 0.8, 1.0],
            line_width: 1,
            text_size: 30.0,
        }
    }

    /// Overlay carrying the focused marker pose (empty when nothing is focused)
    pub fn focus_pose(pose: Option<&Pose>) -> Self {
        let text = pose
            .map(|p| {
                format!(
                    "Pos x: {} y: {} z: {}\nOri x: {} y: {} z: {} w: {}",
                    p.position.x,
                    p.position.y,
                    p.position.z,
                    p.orientation.x,
                    p.orientation.y,
                    p.orientation.z,
                    p.orientation.w
                )
            })
            .unwrap_or_default();

        Self {
            text,
            top: 50,
            left: 0,
            width: 500,
            height: 50,
            bg_color: OVERLAY_BG,
            fg_color: [0.8, 0.3, 0.3, 1.0],
            line_width: 1,
            text_size: 15.0,
        }
    }
}
