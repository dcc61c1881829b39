//! Shape variants and their dimensions

use serde::{Deserialize, Serialize};

/// Kind of transformable shape
///
/// Discriminants match the wire codes used by marker operate requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Box = 0,
    Cylinder = 1,
    Torus = 2,
}

impl ShapeKind {
    /// Resolve a wire code, `None` for anything unknown
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ShapeKind::Box),
            1 => Some(ShapeKind::Cylinder),
            2 => Some(ShapeKind::Torus),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            ShapeKind::Box => "Box",
            ShapeKind::Cylinder => "Cylinder",
            ShapeKind::Torus => "Torus",
        }
    }
}

/// Dimensions snapshot, broadcast whenever a dimension changes
///
/// Fields that do not apply to `kind` stay at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkerDimensions {
    #[serde(default)]
    pub kind: Option<ShapeKind>,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default)]
    pub radius: f32,
    #[serde(default)]
    pub small_radius: f32,
}

/// Shape-specific geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Half-extents along each axis
    Box { x: f32, y: f32, z: f32 },
    /// `z` is the full height
    Cylinder { radius: f32, z: f32 },
    Torus {
        radius: f32,
        small_radius: f32,
        u_div: u32,
        v_div: u32,
    },
}

/// Store `value` into `slot` if it is a valid, different dimension
fn assign(slot: &mut f32, value: f32) -> bool {
    if !value.is_finite() || value < 0.0 || *slot == value {
        return false;
    }
    *slot = value;
    true
}

impl Shape {
    pub const DEFAULT_BOX_HALF_EXTENT: f32 = 0.45;
    pub const DEFAULT_CYLINDER_RADIUS: f32 = 0.45;
    pub const DEFAULT_CYLINDER_HEIGHT: f32 = 0.45;
    pub const DEFAULT_TORUS_RADIUS: f32 = 0.45;
    pub const DEFAULT_TORUS_SMALL_RADIUS: f32 = 0.2;

    /// Shape of the given kind with the default insert dimensions
    pub fn with_defaults(kind: ShapeKind, u_div: u32, v_div: u32) -> Self {
        match kind {
            ShapeKind::Box => Shape::Box {
                x: Self::DEFAULT_BOX_HALF_EXTENT,
                y: Self::DEFAULT_BOX_HALF_EXTENT,
                z: Self::DEFAULT_BOX_HALF_EXTENT,
            },
            ShapeKind::Cylinder => Shape::Cylinder {
                radius: Self::DEFAULT_CYLINDER_RADIUS,
                z: Self::DEFAULT_CYLINDER_HEIGHT,
            },
            ShapeKind::Torus => Shape::Torus {
                radius: Self::DEFAULT_TORUS_RADIUS,
                small_radius: Self::DEFAULT_TORUS_SMALL_RADIUS,
                u_div,
                v_div,
            },
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Box { .. } => ShapeKind::Box,
            Shape::Cylinder { .. } => ShapeKind::Cylinder,
            Shape::Torus { .. } => ShapeKind::Torus,
        }
    }

    pub fn set_radius(&mut self, value: f32) -> bool {
        match self {
            Shape::Cylinder { radius, .. } | Shape::Torus { radius, .. } => assign(radius, value),
            Shape::Box { .. } => false,
        }
    }

    pub fn set_small_radius(&mut self, value: f32) -> bool {
        match self {
            Shape::Torus { small_radius, .. } => assign(small_radius, value),
            _ => false,
        }
    }

    pub fn set_x(&mut self, value: f32) -> bool {
        match self {
            Shape::Box { x, .. } => assign(x, value),
            _ => false,
        }
    }

    pub fn set_y(&mut self, value: f32) -> bool {
        match self {
            Shape::Box { y, .. } => assign(y, value),
            _ => false,
        }
    }

    pub fn set_z(&mut self, value: f32) -> bool {
        match self {
            Shape::Box { z, .. } | Shape::Cylinder { z, .. } => assign(z, value),
            Shape::Torus { .. } => false,
        }
    }

    /// Apply the fields of `dims` that are meaningful for this shape
    ///
    /// Every field is attempted; returns true if any of them changed.
    pub fn set_dimensions(&mut self, dims: &MarkerDimensions) -> bool {
        match self.kind() {
            ShapeKind::Box => {
                let x = self.set_x(dims.x);
                let y = self.set_y(dims.y);
                let z = self.set_z(dims.z);
                x | y | z
            }
            ShapeKind::Cylinder => {
                let r = self.set_radius(dims.radius);
                let z = self.set_z(dims.z);
                r | z
            }
            ShapeKind::Torus => {
                let r = self.set_radius(dims.radius);
                let sr = self.set_small_radius(dims.small_radius);
                r | sr
            }
        }
    }

    pub fn dimensions(&self) -> MarkerDimensions {
        let mut dims = MarkerDimensions {
            kind: Some(self.kind()),
            ..Default::default()
        };
        match *self {
            Shape::Box { x, y, z } => {
                dims.x = x;
                dims.y = y;
                dims.z = z;
            }
            Shape::Cylinder { radius, z } => {
                dims.radius = radius;
                dims.z = z;
            }
            Shape::Torus {
                radius,
                small_radius,
                ..
            } => {
                dims.radius = radius;
                dims.small_radius = small_radius;
            }
        }
        dims
    }

    /// Largest full extent of the shape, used to size manipulation handles
    pub fn extent(&self) -> f32 {
        match *self {
            Shape::Box { x, y, z } => 2.0 * x.max(y).max(z),
            Shape::Cylinder { radius, z } => (2.0 * radius).max(z),
            Shape::Torus {
                radius,
                small_radius,
                ..
            } => 2.0 * (radius + small_radius),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        for kind in [ShapeKind::Box, ShapeKind::Cylinder, ShapeKind::Torus] {
            assert_eq!(ShapeKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ShapeKind::from_code(7), None);
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let mut shape = Shape::with_defaults(ShapeKind::Box, 20, 20);
        assert!(!shape.set_x(-0.1));
        assert!(!shape.set_y(f32::NAN));
        assert_eq!(shape.dimensions().x, Shape::DEFAULT_BOX_HALF_EXTENT);
        assert_eq!(shape.dimensions().y, Shape::DEFAULT_BOX_HALF_EXTENT);
    }

    #[test]
    fn test_unchanged_value_reports_no_change() {
        let mut shape = Shape::with_defaults(ShapeKind::Cylinder, 20, 20);
        assert!(!shape.set_radius(Shape::DEFAULT_CYLINDER_RADIUS));
        assert!(shape.set_radius(0.0));
        assert_eq!(shape.dimensions().radius, 0.0);
    }

    #[test]
    fn test_setter_on_missing_field() {
        let mut torus = Shape::with_defaults(ShapeKind::Torus, 20, 20);
        assert!(!torus.set_x(1.0));
        assert!(!torus.set_z(1.0));
        assert!(torus.set_small_radius(0.1));

        let mut cube = Shape::with_defaults(ShapeKind::Box, 20, 20);
        assert!(!cube.set_radius(1.0));
        assert!(!cube.set_small_radius(1.0));
    }

    #[test]
    fn test_set_dimensions_uses_relevant_fields() {
        let mut cylinder = Shape::with_defaults(ShapeKind::Cylinder, 20, 20);
        let dims = MarkerDimensions {
            x: 3.0,
            radius: 0.2,
            z: 1.5,
            ..Default::default()
        };
        assert!(cylinder.set_dimensions(&dims));
        assert_eq!(cylinder, Shape::Cylinder { radius: 0.2, z: 1.5 });
        assert!(!cylinder.set_dimensions(&dims));
    }

    #[test]
    fn test_dimensions_zero_irrelevant_fields() {
        let torus = Shape::with_defaults(ShapeKind::Torus, 20, 20);
        let dims = torus.dimensions();
        assert_eq!(dims.kind, Some(ShapeKind::Torus));
        assert_eq!(dims.radius, 0.45);
        assert_eq!(dims.small_radius, 0.2);
        assert_eq!(dims.x, 0.0);
        assert_eq!(dims.z, 0.0);
    }
}
