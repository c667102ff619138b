use std::collections::HashMap;
use std::f64::consts::TAU;

use crate::{Mesh, normalize};

/// Segment count used for the round side of cylinders.
pub const CYLINDER_SEGMENTS: usize = 32;

/// Subdivision passes applied to the base icosahedron of spheres.
pub const SPHERE_SUBDIVISIONS: usize = 3;

/// Axis-aligned rectangular prism centered at the origin.
///
/// `extents` are the full side lengths along X, Y and Z. The result always
/// has 8 vertices and 12 triangles.
pub fn box_mesh(extents: [f64; 3]) -> Mesh {
    let [hx, hy, hz] = [extents[0] / 2.0, extents[1] / 2.0, extents[2] / 2.0];

    // Vertex index bits: 1 = +x, 2 = +y, 4 = +z.
    let vertices = (0..8)
        .map(|i| {
            [
                if i & 1 == 0 { -hx } else { hx },
                if i & 2 == 0 { -hy } else { hy },
                if i & 4 == 0 { -hz } else { hz },
            ]
        })
        .collect();

    let triangles = vec![
        [0, 2, 1],
        [1, 2, 3],
        [4, 5, 6],
        [5, 7, 6],
        [0, 1, 4],
        [1, 5, 4],
        [2, 6, 3],
        [3, 6, 7],
        [0, 4, 2],
        [2, 4, 6],
        [1, 3, 5],
        [3, 7, 5],
    ];

    Mesh {
        vertices,
        triangles,
    }
}

/// Capped cylinder along the Z axis, centered at the origin.
///
/// Produces `2 + 2 * segments` vertices and `4 * segments` triangles.
pub fn cylinder(radius: f64, height: f64, segments: usize) -> Mesh {
    let segments = segments.max(3);
    let half = height / 2.0;

    let mut vertices = Vec::with_capacity(2 + 2 * segments);
    vertices.push([0.0, 0.0, -half]);
    vertices.push([0.0, 0.0, half]);
    for z in [-half, half] {
        for i in 0..segments {
            let angle = TAU * i as f64 / segments as f64;
            vertices.push([radius * angle.cos(), radius * angle.sin(), z]);
        }
    }

    let bottom = |i: usize| (2 + i % segments) as u32;
    let top = |i: usize| (2 + segments + i % segments) as u32;

    let mut triangles = Vec::with_capacity(4 * segments);
    for i in 0..segments {
        let j = i + 1;
        triangles.push([0, bottom(j), bottom(i)]);
        triangles.push([1, top(i), top(j)]);
        triangles.push([bottom(i), bottom(j), top(j)]);
        triangles.push([bottom(i), top(j), top(i)]);
    }

    Mesh {
        vertices,
        triangles,
    }
}

/// Sphere approximated by a subdivided icosahedron, centered at the origin.
///
/// Each subdivision splits every face into four, so the result has
/// `20 * 4^subdivisions` triangles.
pub fn icosphere(radius: f64, subdivisions: usize) -> Mesh {
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let mut vertices: Vec<[f64; 3]> = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ]
    .into_iter()
    .map(normalize)
    .collect();

    let mut triangles: Vec<[u32; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut next = Vec::with_capacity(triangles.len() * 4);
        for [a, b, c] in triangles {
            let ab = midpoint(&mut vertices, &mut midpoints, a, b);
            let bc = midpoint(&mut vertices, &mut midpoints, b, c);
            let ca = midpoint(&mut vertices, &mut midpoints, c, a);
            next.push([a, ab, ca]);
            next.push([b, bc, ab]);
            next.push([c, ca, bc]);
            next.push([ab, bc, ca]);
        }
        triangles = next;
    }

    for vertex in &mut vertices {
        vertex[0] *= radius;
        vertex[1] *= radius;
        vertex[2] *= radius;
    }

    Mesh {
        vertices,
        triangles,
    }
}

fn midpoint(
    vertices: &mut Vec<[f64; 3]>,
    cache: &mut HashMap<(u32, u32), u32>,
    a: u32,
    b: u32,
) -> u32 {
    let key = if a < b { (a, b) } else { (b, a) };
    *cache.entry(key).or_insert_with(|| {
        let pa = vertices[a as usize];
        let pb = vertices[b as usize];
        vertices.push(normalize([
            (pa[0] + pb[0]) / 2.0,
            (pa[1] + pb[1]) / 2.0,
            (pa[2] + pb[2]) / 2.0,
        ]));
        (vertices.len() - 1) as u32
    })
}
