//! Transformable object: a shaped, posed, colored proxy the operator drags around

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::interactive::{
    InteractionMode, InteractiveMarker, InteractiveMarkerControl, PrimitiveKind, VisualMarker,
    axis_controls,
};
use crate::mesh::torus_triangles;
use crate::pose::Pose;
use crate::shape::{MarkerDimensions, Shape, ShapeKind};

/// Name of the control carrying the shape geometry
pub const SHAPE_CONTROL_NAME: &str = "shape";

/// A transformable object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformableObject {
    pub name: String,
    pub description: String,
    pub frame_id: String,
    pose: Pose,
    color: [f32; 4],
    shape: Shape,
    /// Show the six axis handles around the shape
    pub display_interactive_manipulator: bool,
}

impl TransformableObject {
    pub const DEFAULT_COLOR: [f32; 4] = [0.5, 0.5, 0.5, 1.0];

    pub fn new(
        shape: Shape,
        frame_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            frame_id: frame_id.into(),
            pose: Pose::IDENTITY,
            color: Self::DEFAULT_COLOR,
            shape,
            display_interactive_manipulator: true,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Relative deltas compose in the object's local frame, absolute ones replace the pose
    pub fn add_pose(&mut self, delta: Pose, relative: bool) {
        self.pose = if relative { self.pose * delta } else { delta };
    }

    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    pub fn set_color(&mut self, color: [f32; 4]) -> bool {
        if self.color == color {
            return false;
        }
        self.color = color;
        true
    }

    pub fn set_radius(&mut self, value: f32) -> bool {
        self.shape.set_radius(value)
    }

    pub fn set_small_radius(&mut self, value: f32) -> bool {
        self.shape.set_small_radius(value)
    }

    pub fn set_x(&mut self, value: f32) -> bool {
        self.shape.set_x(value)
    }

    pub fn set_y(&mut self, value: f32) -> bool {
        self.shape.set_y(value)
    }

    pub fn set_z(&mut self, value: f32) -> bool {
        self.shape.set_z(value)
    }

    pub fn set_dimensions(&mut self, dims: &MarkerDimensions) -> bool {
        self.shape.set_dimensions(dims)
    }

    pub fn dimensions(&self) -> MarkerDimensions {
        self.shape.dimensions()
    }

    /// Shape primitive as drawn inside the geometry control
    fn shape_visual(&self) -> VisualMarker {
        match self.shape {
            Shape::Box { x, y, z } => VisualMarker::new(
                PrimitiveKind::Cube,
                Vec3::new(2.0 * x, 2.0 * y, 2.0 * z),
                self.color,
            ),
            Shape::Cylinder { radius, z } => VisualMarker::new(
                PrimitiveKind::Cylinder,
                Vec3::new(2.0 * radius, 2.0 * radius, z),
                self.color,
            ),
            Shape::Torus {
                radius,
                small_radius,
                u_div,
                v_div,
            } => VisualMarker::new(PrimitiveKind::TriangleList, Vec3::ONE, self.color)
                .with_points(torus_triangles(radius, small_radius, u_div, v_div)),
        }
    }

    /// Build the renderable description for the current state
    pub fn interactive_marker(&self) -> InteractiveMarker {
        let mut marker = InteractiveMarker::new(&self.name, &self.frame_id);
        marker.description = self.description.clone();
        marker.pose = self.pose;
        marker.scale = self.shape.extent().max(f32::EPSILON);

        marker.controls.push(
            InteractiveMarkerControl::new(SHAPE_CONTROL_NAME, InteractionMode::MoveRotate3D)
                .always_visible()
                .with_marker(self.shape_visual()),
        );

        if self.display_interactive_manipulator {
            marker.controls.extend(axis_controls());
        }

        marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Quat;

    fn make_box() -> TransformableObject {
        TransformableObject::new(
            Shape::with_defaults(ShapeKind::Box, 20, 20),
            "map",
            "b1",
            "test box",
        )
    }

    #[test]
    fn test_add_pose_relative_composes() {
        let d1 = Pose::new(Vec3::new(0.1, 0.2, 0.0), Quat::from_rotation_z(0.4));
        let d2 = Pose::new(Vec3::new(-0.3, 0.0, 0.5), Quat::from_rotation_x(1.1));

        let mut stepwise = make_box();
        stepwise.add_pose(d1, true);
        stepwise.add_pose(d2, true);

        let mut combined = make_box();
        combined.add_pose(d1 * d2, true);

        assert!(stepwise.pose().abs_diff_eq(combined.pose(), 1e-5));
    }

    #[test]
    fn test_add_pose_absolute_replaces() {
        let mut object = make_box();
        object.add_pose(Pose::from_position(Vec3::X), true);

        let target = Pose::from_position(Vec3::new(0.0, 2.0, 0.0));
        object.add_pose(target, false);
        assert_eq!(*object.pose(), target);
    }

    #[test]
    fn test_render_box() {
        let object = make_box();
        let marker = object.interactive_marker();

        assert_eq!(marker.name, "b1");
        assert_eq!(marker.frame_id, "map");
        assert_eq!(marker.controls.len(), 7);

        let shape = marker.control(SHAPE_CONTROL_NAME).unwrap();
        assert_eq!(shape.markers[0].kind, PrimitiveKind::Cube);
        assert_relative_eq!(shape.markers[0].scale.x, 0.9);
        assert_relative_eq!(marker.scale, 0.9);
    }

    #[test]
    fn test_render_without_manipulator() {
        let mut object = make_box();
        object.display_interactive_manipulator = false;
        assert_eq!(object.interactive_marker().controls.len(), 1);
    }

    #[test]
    fn test_render_torus_is_triangle_list() {
        let object = TransformableObject::new(
            Shape::with_defaults(ShapeKind::Torus, 4, 5),
            "map",
            "t1",
            "",
        );
        let marker = object.interactive_marker();
        let visual = &marker.control(SHAPE_CONTROL_NAME).unwrap().markers[0];
        assert_eq!(visual.kind, PrimitiveKind::TriangleList);
        assert_eq!(visual.points.len(), 4 * 5 * 6);
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut object = make_box();
        object.set_color([1.0, 0.0, 0.0, 1.0]);
        assert_eq!(object.interactive_marker(), object.interactive_marker());
    }

    #[test]
    fn test_set_color_reports_change() {
        let mut object = make_box();
        assert!(!object.set_color(TransformableObject::DEFAULT_COLOR));
        assert!(object.set_color([0.1, 0.2, 0.3, 1.0]));
        assert_eq!(object.color(), [0.1, 0.2, 0.3, 1.0]);
    }
}
