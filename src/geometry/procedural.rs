//! Built-in meshes for the benchmark scene

use glam::Vec3;

use super::{Mesh, Triangle};

/// Axis pairs (u, v) with u x v pointing out of each cube face
const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::Y, Vec3::Z),
    (Vec3::Z, Vec3::Y),
    (Vec3::Z, Vec3::X),
    (Vec3::X, Vec3::Z),
    (Vec3::X, Vec3::Y),
    (Vec3::Y, Vec3::X),
];

/// Push two outward-facing triangles for the quad centered at `c`
fn push_quad(out: &mut Vec<Triangle>, c: Vec3, u: Vec3, v: Vec3) {
    out.push(Triangle::flat(c - u - v, c + u - v, c + u + v));
    out.push(Triangle::flat(c - u - v, c + u + v, c - u + v));
}

/// Unit cube centered on the origin (12 triangles)
pub fn cube(color: Vec3) -> Mesh {
    let mut triangles = Vec::with_capacity(12);
    for (u, v) in CUBE_FACES {
        let n = u.cross(v);
        push_quad(&mut triangles, n * 0.5, u * 0.5, v * 0.5);
    }
    Mesh::new("cube", triangles, color)
}

/// Square ground plane at y = 0 facing +Y
pub fn plane(size: f32, color: Vec3) -> Mesh {
    let mut triangles = Vec::with_capacity(2);
    let half = size * 0.5;
    push_quad(&mut triangles, Vec3::ZERO, Vec3::Z * half, Vec3::X * half);
    Mesh::new("plane", triangles, color)
}

/// Unit-radius icosphere with smooth normals (20 * 4^subdivisions triangles)
pub fn icosphere(subdivisions: u32, color: Vec3) -> Mesh {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let verts = [
        Vec3::new(-1.0, t, 0.0), Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0), Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t), Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t), Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0), Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0), Vec3::new(-t, 0.0, 1.0),
    ]
    .map(Vec3::normalize);

    const FACES: [[usize; 3]; 20] = [
        [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
        [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
        [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
    ];

    let mut faces: Vec<[Vec3; 3]> = FACES
        .iter()
        .map(|f| [verts[f[0]], verts[f[1]], verts[f[2]]])
        .collect();

    for _ in 0..subdivisions {
        let mut next = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = ((a + b) * 0.5).normalize();
            let bc = ((b + c) * 0.5).normalize();
            let ca = ((c + a) * 0.5).normalize();
            next.push([a, ab, ca]);
            next.push([b, bc, ab]);
            next.push([c, ca, bc]);
            next.push([ab, bc, ca]);
        }
        faces = next;
    }

    let triangles = faces
        .into_iter()
        .map(|positions| Triangle { positions, normals: positions })
        .collect();
    Mesh::new("icosphere", triangles, color)
}

/// Minimal single-triangle mesh used when real geometry is unavailable
pub fn placeholder() -> Mesh {
    let tri = Triangle::flat(
        Vec3::new(-0.5, 0.0, 0.0),
        Vec3::new(0.5, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    );
    Mesh::new("placeholder", vec![tri], Vec3::new(1.0, 0.0, 1.0))
}
