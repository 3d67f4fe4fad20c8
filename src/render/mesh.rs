use crate::core::vertex::Vertex;

pub fn add_quad(
    vertices: &mut Vec<Vertex>,
    indices: &mut Vec<u32>,
    v0: [f32; 3],
    v1: [f32; 3],
    v2: [f32; 3],
    v3: [f32; 3],
    normal: [f32; 3],
) {
    let base_idx = vertices.len() as u32;
    vertices.push(Vertex {
        position: v0,
        normal,
        uv: [0.0, 1.0],
    });
    vertices.push(Vertex {
        position: v1,
        normal,
        uv: [1.0, 1.0],
    });
    vertices.push(Vertex {
        position: v2,
        normal,
        uv: [1.0, 0.0],
    });
    vertices.push(Vertex {
        position: v3,
        normal,
        uv: [0.0, 0.0],
    });
    indices.extend_from_slice(&[
        base_idx,
        base_idx + 1,
        base_idx + 2,
        base_idx,
        base_idx + 2,
        base_idx + 3,
    ]);
}

/// Cube spanning [-1, 1] on every axis, counter-clockwise faces seen from outside.
pub fn build_cube() -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    // +X
    add_quad(
        &mut vertices,
        &mut indices,
        [1.0, -1.0, 1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [1.0, 1.0, 1.0],
        [1.0, 0.0, 0.0],
    );
    // -X
    add_quad(
        &mut vertices,
        &mut indices,
        [-1.0, -1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [-1.0, 1.0, 1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, 0.0, 0.0],
    );
    // +Y
    add_quad(
        &mut vertices,
        &mut indices,
        [-1.0, 1.0, 1.0],
        [1.0, 1.0, 1.0],
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [0.0, 1.0, 0.0],
    );
    // -Y
    add_quad(
        &mut vertices,
        &mut indices,
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, -1.0, 1.0],
        [-1.0, -1.0, 1.0],
        [0.0, -1.0, 0.0],
    );
    // +Z
    add_quad(
        &mut vertices,
        &mut indices,
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
        [0.0, 0.0, 1.0],
    );
    // -Z
    add_quad(
        &mut vertices,
        &mut indices,
        [1.0, -1.0, -1.0],
        [-1.0, -1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [1.0, 1.0, -1.0],
        [0.0, 0.0, -1.0],
    );

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CUBE_INDEX_COUNT, CUBE_VERTEX_COUNT};
    use glam::Vec3;

    #[test]
    fn cube_has_expected_counts() {
        let (vertices, indices) = build_cube();
        assert_eq!(vertices.len() as u32, CUBE_VERTEX_COUNT);
        assert_eq!(indices.len() as u32, CUBE_INDEX_COUNT);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn cube_faces_wind_outward() {
        let (vertices, indices) = build_cube();
        for tri in indices.chunks(3) {
            let a = Vec3::from(vertices[tri[0] as usize].position);
            let b = Vec3::from(vertices[tri[1] as usize].position);
            let c = Vec3::from(vertices[tri[2] as usize].position);
            let normal = Vec3::from(vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(normal) > 0.0);
        }
    }
}
