use super::vertex::{v, Vertex};

/// Unit cube centered at the origin, one quad per face.
pub fn cube_mesh() -> (Vec<Vertex>, Vec<u16>) {
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        // normal, u axis, v axis
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, u_axis, v_axis) in faces {
        let base = vertices.len() as u16;
        for (su, sv) in [(-0.5f32, -0.5f32), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            let pos = [
                normal[0] * 0.5 + u_axis[0] * su + v_axis[0] * sv,
                normal[1] * 0.5 + u_axis[1] * su + v_axis[1] * sv,
                normal[2] * 0.5 + u_axis[2] * su + v_axis[2] * sv,
            ];
            vertices.push(v(pos, normal, [su + 0.5, 0.5 - sv]));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

/// Camera-facing unit quad in the XY plane, used for billboards and point meshes.
pub fn quad_mesh() -> (Vec<Vertex>, Vec<u16>) {
    let n = [0.0, 0.0, 1.0];
    let vertices = vec![
        v([-0.5, -0.5, 0.0], n, [0.0, 1.0]),
        v([0.5, -0.5, 0.0], n, [1.0, 1.0]),
        v([0.5, 0.5, 0.0], n, [1.0, 0.0]),
        v([-0.5, 0.5, 0.0], n, [0.0, 0.0]),
    ];
    (vertices, vec![0, 1, 2, 0, 2, 3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn cube_winding_faces_outward() {
        let (vertices, indices) = cube_mesh();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);

        for tri in indices.chunks(3) {
            let a = Vec3::from(vertices[tri[0] as usize].pos);
            let b = Vec3::from(vertices[tri[1] as usize].pos);
            let c = Vec3::from(vertices[tri[2] as usize].pos);
            let n = Vec3::from(vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(n) > 0.0);
        }
    }

    #[test]
    fn quad_indices_in_range() {
        let (vertices, indices) = quad_mesh();
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }
}
