use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use thiserror::Error;

use crate::{Mesh, cross, dot, normalize, sub};

/// Settings for the software preview renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 3],
    pub color: [u8; 3],
    /// Direction pointing from the scene towards the light.
    pub light: [f64; 3],
    /// Fraction of the shorter image side left empty around the model.
    pub margin: f64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            background: [245, 245, 245],
            color: [90, 140, 200],
            light: [0.4, -0.5, 0.8],
            margin: 0.1,
        }
    }
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("cannot render a mesh without triangles")]
    EmptyMesh,
    #[error("preview resolution must be non-zero, got {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
    #[error("failed to encode preview image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Rasterizes `mesh` from an isometric viewpoint and encodes it as PNG.
pub fn render_preview(mesh: &Mesh, config: &PreviewConfig) -> Result<Vec<u8>, PreviewError> {
    let image = rasterize(mesh, config)?;
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Isometric camera looking at the mesh from the (+x, -y, +z) octant, Z up.
struct Camera {
    right: [f64; 3],
    up: [f64; 3],
    toward_eye: [f64; 3],
    center: [f64; 2],
    scale: f64,
    half_width: f64,
    half_height: f64,
}

impl Camera {
    fn fit(mesh: &Mesh, config: &PreviewConfig) -> Self {
        let toward_eye = normalize([1.0, -1.0, 1.0]);
        let forward = [-toward_eye[0], -toward_eye[1], -toward_eye[2]];
        let right = normalize(cross(forward, [0.0, 0.0, 1.0]));
        let up = cross(right, forward);

        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];
        for vertex in &mesh.vertices {
            let projected = [dot(*vertex, right), dot(*vertex, up)];
            for axis in 0..2 {
                min[axis] = min[axis].min(projected[axis]);
                max[axis] = max[axis].max(projected[axis]);
            }
        }

        let width = config.width as f64;
        let height = config.height as f64;
        let usable = width.min(height) * (1.0 - 2.0 * config.margin.clamp(0.0, 0.45));
        let span = (max[0] - min[0]).max(max[1] - min[1]);
        let scale = if span > f64::EPSILON { usable / span } else { 1.0 };

        Self {
            right,
            up,
            toward_eye,
            center: [(min[0] + max[0]) / 2.0, (min[1] + max[1]) / 2.0],
            scale,
            half_width: width / 2.0,
            half_height: height / 2.0,
        }
    }

    /// Returns pixel x, pixel y and a depth that grows towards the viewer.
    fn project(&self, point: [f64; 3]) -> [f64; 3] {
        [
            (dot(point, self.right) - self.center[0]) * self.scale + self.half_width,
            self.half_height - (dot(point, self.up) - self.center[1]) * self.scale,
            dot(point, self.toward_eye),
        ]
    }
}

fn rasterize(mesh: &Mesh, config: &PreviewConfig) -> Result<RgbImage, PreviewError> {
    if config.width == 0 || config.height == 0 {
        return Err(PreviewError::InvalidResolution {
            width: config.width,
            height: config.height,
        });
    }
    if mesh.is_empty() {
        return Err(PreviewError::EmptyMesh);
    }

    let camera = Camera::fit(mesh, config);
    let light = normalize(config.light);
    let width = config.width as usize;
    let height = config.height as usize;

    let mut image = RgbImage::from_pixel(config.width, config.height, Rgb(config.background));
    let mut depth = vec![f64::NEG_INFINITY; width * height];

    for (index, &tri) in mesh.triangles.iter().enumerate() {
        let normal = mesh.face_normal(index);
        let intensity = 0.25 + 0.75 * dot(normal, light).max(0.0);
        let shade = Rgb(config.color.map(|c| (c as f64 * intensity).round().min(255.0) as u8));

        let p = tri.map(|v| camera.project(mesh.vertices[v as usize]));
        let area = edge(p[0], p[1], p[2]);
        if area.abs() <= f64::EPSILON {
            continue;
        }

        let min_x = p.iter().map(|v| v[0]).fold(f64::INFINITY, f64::min).floor().max(0.0) as usize;
        let min_y = p.iter().map(|v| v[1]).fold(f64::INFINITY, f64::min).floor().max(0.0) as usize;
        let max_x = p.iter().map(|v| v[0]).fold(f64::NEG_INFINITY, f64::max).ceil();
        let max_y = p.iter().map(|v| v[1]).fold(f64::NEG_INFINITY, f64::max).ceil();
        if max_x < 0.0 || max_y < 0.0 {
            continue;
        }
        let max_x = (max_x as usize).min(width - 1);
        let max_y = (max_y as usize).min(height - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let sample = [x as f64 + 0.5, y as f64 + 0.5, 0.0];
                let w0 = edge(p[1], p[2], sample) / area;
                let w1 = edge(p[2], p[0], sample) / area;
                let w2 = edge(p[0], p[1], sample) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let z = w0 * p[0][2] + w1 * p[1][2] + w2 * p[2][2];
                let slot = y * width + x;
                if z > depth[slot] {
                    depth[slot] = z;
                    image.put_pixel(x as u32, y as u32, shade);
                }
            }
        }
    }

    Ok(image)
}

#[inline]
fn edge(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    let ab = sub(b, a);
    let ac = sub(c, a);
    ab[0] * ac[1] - ab[1] * ac[0]
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use crate::{Mesh, box_mesh, icosphere};

    use super::{PreviewConfig, PreviewError, rasterize, render_preview};

    #[test]
    fn renders_png_at_configured_resolution() {
        let mesh = box_mesh([10.0, 5.0, 3.0]);
        let png = render_preview(&mesh, &PreviewConfig::default()).expect("render should succeed");

        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).expect("png should decode");
        assert_eq!(decoded.width(), 500);
        assert_eq!(decoded.height(), 500);
    }

    #[test]
    fn model_covers_center_and_leaves_corners_clear() {
        let config = PreviewConfig {
            width: 120,
            height: 80,
            ..PreviewConfig::default()
        };
        let image = rasterize(&icosphere(4.0, 2), &config).expect("render should succeed");

        assert_ne!(*image.get_pixel(60, 40), Rgb(config.background));
        assert_eq!(*image.get_pixel(0, 0), Rgb(config.background));
        assert_eq!(*image.get_pixel(119, 79), Rgb(config.background));
    }

    #[test]
    fn lit_and_unlit_faces_get_different_shades() {
        let config = PreviewConfig::default();
        let image = rasterize(&box_mesh([1.0, 1.0, 1.0]), &config).expect("render should succeed");

        let mut shades = image
            .pixels()
            .filter(|pixel| **pixel != Rgb(config.background))
            .copied()
            .collect::<Vec<_>>();
        shades.sort_by_key(|pixel| pixel.0);
        shades.dedup();
        assert!(shades.len() >= 2, "expected several shades, got {shades:?}");
    }

    #[test]
    fn empty_mesh_is_rejected() {
        let err = render_preview(&Mesh::empty(), &PreviewConfig::default())
            .expect_err("empty mesh should fail");
        assert!(matches!(err, PreviewError::EmptyMesh));
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let config = PreviewConfig {
            width: 0,
            ..PreviewConfig::default()
        };
        let err = render_preview(&box_mesh([1.0, 1.0, 1.0]), &config)
            .expect_err("zero width should fail");
        assert!(matches!(err, PreviewError::InvalidResolution { .. }));
    }
}
