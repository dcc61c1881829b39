//! Transformable Markers Core Data Structures
//!
//! This crate contains the data structures shared by the marker server:
//! - Pose: position + orientation, composable as a rigid transform
//! - Shape / TransformableObject: Box, Cylinder and Torus proxies
//! - InteractiveMarker: renderable description with manipulation controls
//! - RobotModel: link hierarchy parsed from URDF

pub mod interactive;
pub mod mesh;
pub mod object;
pub mod overlay;
pub mod pose;
pub mod shape;
pub mod urdf;

pub use interactive::*;
pub use object::*;
pub use overlay::*;
pub use pose::*;
pub use shape::*;
pub use urdf::*;
