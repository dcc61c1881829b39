//! Robot description loading
//!
//! Parses URDF with `urdf-rs` into the link hierarchy the model marker needs:
//! link names, parent links, joint origins and visual geometry.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use glam::Vec3;

use crate::interactive::{PrimitiveKind, VisualMarker};
use crate::pose::Pose;

/// Color used for links without a material
pub const DEFAULT_LINK_COLOR: [f32; 4] = [0.7, 0.7, 0.7, 1.0];

/// Errors that can occur while loading a robot description
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrdfError {
    #[error("Failed to parse URDF: {0}")]
    Parse(String),

    #[error("Empty URDF: no links defined")]
    EmptyUrdf,

    #[error("Joint '{joint}' references unknown link: {link}")]
    LinkNotFound { joint: String, link: String },

    #[error("No root link: every link is the child of a joint")]
    NoRootLink,
}

/// A link of the parsed model
#[derive(Debug, Clone)]
pub struct RobotLink {
    pub name: String,
    /// Parent link, `None` for the root
    pub parent: Option<String>,
    /// Pose relative to the parent link (joint origin), identity for the root
    pub origin: Pose,
    /// Visual geometry relative to the link frame
    pub visuals: Vec<VisualMarker>,
}

/// Link hierarchy of a robot description
#[derive(Debug, Clone)]
pub struct RobotModel {
    pub name: String,
    pub root_link: String,
    links: Vec<RobotLink>,
    link_index: HashMap<String, usize>,
}

impl RobotModel {
    /// Parse a URDF document held in memory
    pub fn from_urdf_str(xml: &str) -> Result<Self, UrdfError> {
        let robot = urdf_rs::read_from_string(xml).map_err(|e| UrdfError::Parse(e.to_string()))?;
        Self::from_robot(&robot)
    }

    /// Read and parse a URDF file
    pub fn from_urdf_file(path: &Path) -> Result<Self, UrdfError> {
        let robot = urdf_rs::read_file(path).map_err(|e| UrdfError::Parse(e.to_string()))?;
        Self::from_robot(&robot)
    }

    fn from_robot(robot: &urdf_rs::Robot) -> Result<Self, UrdfError> {
        if robot.links.is_empty() {
            return Err(UrdfError::EmptyUrdf);
        }

        // Collect named material colors
        let material_colors: HashMap<String, [f32; 4]> = robot
            .materials
            .iter()
            .filter_map(|m| m.color.as_ref().map(|c| (m.name.clone(), convert_color(c))))
            .collect();

        let known: HashSet<&str> = robot.links.iter().map(|l| l.name.as_str()).collect();

        // child link -> (parent link, joint origin)
        let mut parents: HashMap<&str, (&str, Pose)> = HashMap::new();
        for joint in &robot.joints {
            for link in [&joint.parent.link, &joint.child.link] {
                if !known.contains(link.as_str()) {
                    return Err(UrdfError::LinkNotFound {
                        joint: joint.name.clone(),
                        link: link.clone(),
                    });
                }
            }
            parents.insert(
                joint.child.link.as_str(),
                (joint.parent.link.as_str(), Pose::from(&joint.origin)),
            );
        }

        let root_link = robot
            .links
            .iter()
            .find(|l| !parents.contains_key(l.name.as_str()))
            .map(|l| l.name.clone())
            .ok_or(UrdfError::NoRootLink)?;

        let links: Vec<RobotLink> = robot
            .links
            .iter()
            .map(|link| {
                let (parent, origin) = match parents.get(link.name.as_str()) {
                    Some((parent, origin)) => (Some(parent.to_string()), *origin),
                    None => (None, Pose::IDENTITY),
                };
                RobotLink {
                    name: link.name.clone(),
                    parent,
                    origin,
                    visuals: link
                        .visual
                        .iter()
                        .map(|v| convert_visual(v, &material_colors))
                        .collect(),
                }
            })
            .collect();

        let link_index = links
            .iter()
            .enumerate()
            .map(|(i, l)| (l.name.clone(), i))
            .collect();

        tracing::debug!(
            "Parsed robot '{}' with {} links, root '{}'",
            robot.name,
            links.len(),
            root_link
        );

        Ok(Self {
            name: robot.name.clone(),
            root_link,
            links,
            link_index,
        })
    }

    pub fn links(&self) -> &[RobotLink] {
        &self.links
    }

    pub fn link(&self, name: &str) -> Option<&RobotLink> {
        self.link_index.get(name).map(|&i| &self.links[i])
    }

    pub fn is_root(&self, name: &str) -> bool {
        self.root_link == name
    }
}

fn convert_color(color: &urdf_rs::Color) -> [f32; 4] {
    [
        color.rgba.0[0] as f32,
        color.rgba.0[1] as f32,
        color.rgba.0[2] as f32,
        color.rgba.0[3] as f32,
    ]
}

/// Convert a URDF visual element into a drawable primitive
fn convert_visual(
    visual: &urdf_rs::Visual,
    material_colors: &HashMap<String, [f32; 4]>,
) -> VisualMarker {
    let color = visual
        .material
        .as_ref()
        .and_then(|mat| {
            mat.color
                .as_ref()
                .map(convert_color)
                .or_else(|| material_colors.get(&mat.name).copied())
        })
        .unwrap_or(DEFAULT_LINK_COLOR);

    let origin = Pose::from(&visual.origin);

    let marker = match &visual.geometry {
        urdf_rs::Geometry::Box { size } => VisualMarker::new(
            PrimitiveKind::Cube,
            Vec3::new(size.0[0] as f32, size.0[1] as f32, size.0[2] as f32),
            color,
        ),
        urdf_rs::Geometry::Cylinder { radius, length }
        | urdf_rs::Geometry::Capsule { radius, length } => {
            // Capsules are drawn as cylinders
            let diameter = 2.0 * *radius as f32;
            VisualMarker::new(
                PrimitiveKind::Cylinder,
                Vec3::new(diameter, diameter, *length as f32),
                color,
            )
        }
        urdf_rs::Geometry::Sphere { radius } => {
            VisualMarker::new(PrimitiveKind::Sphere, Vec3::splat(2.0 * *radius as f32), color)
        }
        urdf_rs::Geometry::Mesh { filename, scale } => {
            let scale = scale
                .as_ref()
                .map(|s| Vec3::new(s.0[0] as f32, s.0[1] as f32, s.0[2] as f32))
                .unwrap_or(Vec3::ONE);
            VisualMarker::new(PrimitiveKind::MeshResource, scale, color)
                .with_mesh_resource(filename.clone())
        }
    };

    marker.with_pose(origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LINK_ARM: &str = r#"<?xml version="1.0"?>
<robot name="arm">
  <material name="blue">
    <color rgba="0 0 1 1"/>
  </material>
  <link name="base_link">
    <visual>
      <geometry><box size="0.2 0.2 0.1"/></geometry>
      <material name="blue"/>
    </visual>
  </link>
  <link name="upper_arm">
    <visual>
      <origin xyz="0 0 0.25" rpy="0 0 0"/>
      <geometry><cylinder radius="0.05" length="0.5"/></geometry>
    </visual>
  </link>
  <link name="hand"/>
  <joint name="shoulder" type="revolute">
    <parent link="base_link"/>
    <child link="upper_arm"/>
    <origin xyz="0 0 0.1" rpy="0 0 0"/>
    <axis xyz="0 1 0"/>
    <limit lower="-1.57" upper="1.57" effort="10" velocity="1"/>
  </joint>
  <joint name="wrist" type="fixed">
    <parent link="upper_arm"/>
    <child link="hand"/>
    <origin xyz="0 0 0.5" rpy="0 0 0"/>
  </joint>
</robot>
"#;

    #[test]
    fn test_parse_hierarchy() {
        let model = RobotModel::from_urdf_str(TWO_LINK_ARM).unwrap();

        assert_eq!(model.name, "arm");
        assert_eq!(model.root_link, "base_link");
        assert_eq!(model.links().len(), 3);
        assert!(model.is_root("base_link"));

        let upper = model.link("upper_arm").unwrap();
        assert_eq!(upper.parent.as_deref(), Some("base_link"));
        assert_eq!(upper.origin.position, Vec3::new(0.0, 0.0, 0.1));

        let hand = model.link("hand").unwrap();
        assert_eq!(hand.parent.as_deref(), Some("upper_arm"));
        assert!(hand.visuals.is_empty());
    }

    #[test]
    fn test_visual_conversion() {
        let model = RobotModel::from_urdf_str(TWO_LINK_ARM).unwrap();

        let base = &model.link("base_link").unwrap().visuals[0];
        assert_eq!(base.kind, PrimitiveKind::Cube);
        assert_eq!(base.color, [0.0, 0.0, 1.0, 1.0]);

        let arm = &model.link("upper_arm").unwrap().visuals[0];
        assert_eq!(arm.kind, PrimitiveKind::Cylinder);
        assert_eq!(arm.color, DEFAULT_LINK_COLOR);
        assert_eq!(arm.pose.position, Vec3::new(0.0, 0.0, 0.25));
    }

    #[test]
    fn test_unknown_link_in_joint() {
        let xml = r#"<robot name="bad">
  <link name="a"/>
  <joint name="j" type="fixed">
    <parent link="a"/>
    <child link="ghost"/>
  </joint>
</robot>"#;
        let result = RobotModel::from_urdf_str(xml);
        assert!(matches!(result, Err(UrdfError::LinkNotFound { .. })));
    }

    #[test]
    fn test_invalid_xml() {
        assert!(matches!(
            RobotModel::from_urdf_str("<robot"),
            Err(UrdfError::Parse(_))
        ));
    }
}
