//! Procedural unit meshes as unindexed position + normal triangle lists.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec3;

use super::MeshVertex;

/// UV sphere of radius 1 centred on the origin.
#[must_use]
pub fn unit_sphere(sectors: u32, stacks: u32) -> Vec<MeshVertex> {
    let point = |stack: u32, sector: u32| {
        let phi = FRAC_PI_2 - stack as f32 * PI / stacks as f32;
        let theta = sector as f32 * TAU / sectors as f32;
        let p = Vec3::new(phi.cos() * theta.cos(), phi.sin(), phi.cos() * theta.sin());
        MeshVertex::new(p, p)
    };

    let mut vertices =
        Vec::with_capacity((sectors * stacks * 6) as usize);
    for stack in 0..stacks {
        for sector in 0..sectors {
            let p00 = point(stack, sector);
            let p10 = point(stack + 1, sector);
            let p01 = point(stack, sector + 1);
            let p11 = point(stack + 1, sector + 1);
            vertices.extend_from_slice(&[p00, p10, p11, p00, p11, p01]);
        }
    }
    vertices
}

/// Capped cylinder of radius 1 spanning y = -1 to y = 1.
#[must_use]
pub fn unit_cylinder(sides: u32) -> Vec<MeshVertex> {
    let rim = |side: u32, y: f32| {
        let angle = side as f32 * TAU / sides as f32;
        Vec3::new(angle.cos(), y, angle.sin())
    };

    let mut vertices = Vec::with_capacity((sides * 12) as usize);
    for side in 0..sides {
        let (top0, top1) = (rim(side, 1.0), rim(side + 1, 1.0));
        let (bot0, bot1) = (rim(side, -1.0), rim(side + 1, -1.0));

        for p in [Vec3::Y, top0, top1] {
            vertices.push(MeshVertex::new(p, Vec3::Y));
        }
        for p in [Vec3::NEG_Y, bot1, bot0] {
            vertices.push(MeshVertex::new(p, Vec3::NEG_Y));
        }

        let n0 = Vec3::new(top0.x, 0.0, top0.z);
        let n1 = Vec3::new(top1.x, 0.0, top1.z);
        vertices.extend_from_slice(&[
            MeshVertex::new(bot0, n0),
            MeshVertex::new(top0, n0),
            MeshVertex::new(top1, n1),
            MeshVertex::new(bot0, n0),
            MeshVertex::new(top1, n1),
            MeshVertex::new(bot1, n1),
        ]);
    }
    vertices
}

/// Axis-aligned cube spanning -1 to 1 on every axis, flat-shaded.
#[must_use]
pub fn unit_cube() -> Vec<MeshVertex> {
    let faces = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
    let mut vertices = Vec::with_capacity(36);
    for normal in faces {
        // Two in-plane axes perpendicular to the face normal.
        let u = normal.any_orthonormal_vector();
        let v = normal.cross(u);
        let corner = |a: f32, b: f32| MeshVertex::new(normal + a * u + b * v, normal);
        vertices.extend_from_slice(&[
            corner(-1.0, -1.0),
            corner(1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, 1.0),
        ]);
    }
    vertices
}

/// Square in the z = 0 plane spanning -1 to 1, facing +z.
#[must_use]
pub fn unit_quad() -> Vec<MeshVertex> {
    [
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
    ]
    .into_iter()
    .map(|p| MeshVertex::new(p, Vec3::Z))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normals_are_unit(vertices: &[MeshVertex]) -> bool {
        vertices
            .iter()
            .all(|v| (Vec3::from(v.normal).length() - 1.0).abs() < 1e-5)
    }

    #[test]
    fn sphere_is_triangle_list_on_unit_radius() {
        let sphere = unit_sphere(12, 12);
        assert_eq!(sphere.len(), 12 * 12 * 6);
        assert!(sphere
            .iter()
            .all(|v| (Vec3::from(v.position).length() - 1.0).abs() < 1e-5));
        assert!(normals_are_unit(&sphere));
    }

    #[test]
    fn cylinder_stays_within_unit_bounds() {
        let cylinder = unit_cylinder(16);
        assert_eq!(cylinder.len(), 16 * 12);
        for v in &cylinder {
            let p = Vec3::from(v.position);
            assert!(p.y.abs() <= 1.0 + 1e-6);
            assert!(Vec3::new(p.x, 0.0, p.z).length() <= 1.0 + 1e-5);
        }
        assert!(normals_are_unit(&cylinder));
    }

    #[test]
    fn cube_faces_lie_on_their_planes() {
        let cube = unit_cube();
        assert_eq!(cube.len(), 36);
        for v in &cube {
            let p = Vec3::from(v.position);
            let n = Vec3::from(v.normal);
            assert!((p.dot(n) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn quad_faces_positive_z() {
        let quad = unit_quad();
        assert_eq!(quad.len(), 6);
        assert!(quad.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }
}
