//! Procedural meshes

use crate::assets::MeshData;
use crate::foundation::math::{constants::PI, constants::TAU, Vec3};
use crate::render::vertex::Vertex;

/// Axis-aligned cube centered on the origin.
///
/// Eight shared corners, so each normal points diagonally outwards.
pub fn cube(side_length: f32) -> MeshData {
    //    E---F
    //   /|  /|
    //  A---B |
    //  | H-|-G
    //  |/  |/
    //  D---C
    let corners = [
        Vec3::new(-0.5, 0.5, -0.5),  // A
        Vec3::new(0.5, 0.5, -0.5),   // B
        Vec3::new(0.5, -0.5, -0.5),  // C
        Vec3::new(-0.5, -0.5, -0.5), // D
        Vec3::new(-0.5, 0.5, 0.5),   // E
        Vec3::new(0.5, 0.5, 0.5),    // F
        Vec3::new(0.5, -0.5, 0.5),   // G
        Vec3::new(-0.5, -0.5, 0.5),  // H
    ];
    let vertices = corners
        .iter()
        .map(|corner| Vertex::new(corner * side_length, corner.normalize()))
        .collect();

    const A: u32 = 0;
    const B: u32 = 1;
    const C: u32 = 2;
    const D: u32 = 3;
    const E: u32 = 4;
    const F: u32 = 5;
    const G: u32 = 6;
    const H: u32 = 7;
    let indices = vec![
        A, C, D, A, B, C, // front
        B, F, G, B, G, C, // right
        G, F, E, H, G, E, // back
        E, A, H, A, D, H, // left
        E, F, B, E, B, A, // top
        C, G, H, D, C, H, // bottom
    ];

    MeshData::new(vertices, indices)
}

/// Flat square in the XZ plane facing +Y
pub fn square(side_length: f32) -> MeshData {
    let up = Vec3::y();
    let vertices = [
        Vec3::new(-0.5, 0.0, -0.5),
        Vec3::new(0.5, 0.0, -0.5),
        Vec3::new(0.5, 0.0, 0.5),
        Vec3::new(-0.5, 0.0, 0.5),
    ]
    .iter()
    .map(|corner| Vertex::new(corner * side_length, up))
    .collect();

    MeshData::new(vertices, vec![0, 1, 2, 2, 3, 0])
}

/// Latitude/longitude sphere.
///
/// `rings` bands from pole to pole and `segments` slices around +Y; the
/// seam column is duplicated.
pub fn uv_sphere(radius: f32, rings: u32, segments: u32) -> MeshData {
    let rings = rings.max(2);
    let segments = segments.max(3);

    let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
    for ring in 0..=rings {
        let theta = PI * ring as f32 / rings as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for segment in 0..=segments {
            let phi = TAU * segment as f32 / segments as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let normal = Vec3::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi);
            vertices.push(Vertex::new(normal * radius, normal));
        }
    }

    let stride = segments + 1;
    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
    for ring in 0..rings {
        for segment in 0..segments {
            let top_left = ring * stride + segment;
            let bottom_left = top_left + stride;
            indices.extend_from_slice(&[top_left, bottom_left, top_left + 1]);
            indices.extend_from_slice(&[top_left + 1, bottom_left, bottom_left + 1]);
        }
    }

    MeshData::new(vertices, indices)
}
