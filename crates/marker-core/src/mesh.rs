//! Triangle tessellation for shapes without a native primitive

use std::f32::consts::TAU;

/// Generate a torus around the Z axis as a flat triangle list
///
/// `u_div` segments run around the main ring, `v_div` around the tube.
/// Each quad becomes two triangles, so the result holds
/// `u_div * v_div * 6` vertices. Zero divisions yield an empty list.
pub fn torus_triangles(radius: f32, small_radius: f32, u_div: u32, v_div: u32) -> Vec<[f32; 3]> {
    if u_div == 0 || v_div == 0 {
        return Vec::new();
    }

    let point = |u: u32, v: u32| -> [f32; 3] {
        let theta = TAU * (u % u_div) as f32 / u_div as f32;
        let phi = TAU * (v % v_div) as f32 / v_div as f32;
        let ring = radius + small_radius * phi.cos();
        [ring * theta.cos(), ring * theta.sin(), small_radius * phi.sin()]
    };

    let mut vertices = Vec::with_capacity((u_div * v_div * 6) as usize);
    for u in 0..u_div {
        for v in 0..v_div {
            let current = point(u, v);
            let next_u = point(u + 1, v);
            let next_v = point(u, v + 1);
            let next_uv = point(u + 1, v + 1);

            vertices.push(current);
            vertices.push(next_u);
            vertices.push(next_v);

            vertices.push(next_v);
            vertices.push(next_u);
            vertices.push(next_uv);
        }
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_torus_vertex_count() {
        assert_eq!(torus_triangles(0.45, 0.2, 20, 20).len(), 20 * 20 * 6);
        assert_eq!(torus_triangles(0.45, 0.2, 3, 4).len(), 72);
        assert!(torus_triangles(0.45, 0.2, 0, 20).is_empty());
    }

    #[test]
    fn test_torus_vertices_on_surface() {
        let (radius, small_radius) = (0.45, 0.2);
        for [x, y, z] in torus_triangles(radius, small_radius, 12, 8) {
            let ring = (x * x + y * y).sqrt() - radius;
            assert_relative_eq!(ring * ring + z * z, small_radius * small_radius, epsilon = 1e-5);
        }
    }
}
