pub mod export;
pub mod preview;
pub mod primitives;

pub use export::{to_binary_stl, write_binary_stl};
pub use preview::{PreviewConfig, PreviewError, render_preview};
pub use primitives::{CYLINDER_SEGMENTS, SPHERE_SUBDIVISIONS, box_mesh, cylinder, icosphere};

/// Indexed triangle mesh with counter-clockwise (outward facing) winding.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<[f64; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Moves every vertex by `offset`.
    pub fn translate(&mut self, offset: [f64; 3]) {
        for vertex in &mut self.vertices {
            vertex[0] += offset[0];
            vertex[1] += offset[1];
            vertex[2] += offset[2];
        }
    }

    pub fn translated(mut self, offset: [f64; 3]) -> Self {
        self.translate(offset);
        self
    }

    /// Appends `other` to this mesh, rebasing its indices past the current vertices.
    pub fn append(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.triangles.extend(
            other
                .triangles
                .iter()
                .map(|tri| [tri[0] + base, tri[1] + base, tri[2] + base]),
        );
    }

    /// Unions the vertex and face buffers of `meshes` into one mesh.
    ///
    /// This is a plain buffer concatenation: overlapping solids stay
    /// overlapping and no shared vertices are merged.
    pub fn concatenate(meshes: &[Mesh]) -> Mesh {
        let vertex_count = meshes.iter().map(|mesh| mesh.vertices.len()).sum();
        let triangle_count = meshes.iter().map(|mesh| mesh.triangles.len()).sum();
        let mut combined = Mesh {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        };
        for mesh in meshes {
            combined.append(mesh);
        }
        combined
    }

    pub fn bounding_box(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = *self.vertices.first()?;
        let mut min = first;
        let mut max = first;
        for vertex in &self.vertices[1..] {
            for axis in 0..3 {
                min[axis] = min[axis].min(vertex[axis]);
                max[axis] = max[axis].max(vertex[axis]);
            }
        }
        Some((min, max))
    }

    /// Signed volume via the divergence theorem. Positive for closed meshes
    /// with outward winding.
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|tri| {
                let a = self.vertices[tri[0] as usize];
                let b = self.vertices[tri[1] as usize];
                let c = self.vertices[tri[2] as usize];
                dot(a, cross(b, c)) / 6.0
            })
            .sum()
    }

    /// Unit normal of triangle `index`, or zero for degenerate faces.
    pub fn face_normal(&self, index: usize) -> [f64; 3] {
        let tri = self.triangles[index];
        triangle_normal(
            self.vertices[tri[0] as usize],
            self.vertices[tri[1] as usize],
            self.vertices[tri[2] as usize],
        )
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::empty()
    }
}

#[inline]
pub(crate) fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub(crate) fn normalize(v: [f64; 3]) -> [f64; 3] {
    let len = dot(v, v).sqrt();
    if len <= f64::EPSILON {
        [0.0, 0.0, 0.0]
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

#[inline]
pub(crate) fn triangle_normal(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> [f64; 3] {
    normalize(cross(sub(b, a), sub(c, a)))
}
