use std::io::{self, Write};

use crate::{Mesh, triangle_normal};

const HEADER_LEN: usize = 80;
const TRIANGLE_RECORD_LEN: usize = 50;

/// Serializes `mesh` as binary STL into a fresh buffer.
///
/// The header carries `name` truncated to 80 bytes and zero padded.
pub fn to_binary_stl(mesh: &Mesh, name: &str) -> Vec<u8> {
    let mut bytes =
        Vec::<u8>::with_capacity(HEADER_LEN + 4 + mesh.triangles.len() * TRIANGLE_RECORD_LEN);
    write_binary_stl(mesh, name, &mut bytes).expect("writing to a Vec<u8> cannot fail");
    bytes
}

/// Streams `mesh` as binary STL into `writer`.
///
/// Layout: 80 byte header, little-endian `u32` triangle count, then per
/// triangle a facet normal, three vertices (all `f32` triplets) and a zero
/// `u16` attribute word.
pub fn write_binary_stl<W: Write>(mesh: &Mesh, name: &str, writer: &mut W) -> io::Result<()> {
    let mut header = [0u8; HEADER_LEN];
    let name_bytes = name.as_bytes();
    let header_len = name_bytes.len().min(HEADER_LEN);
    header[..header_len].copy_from_slice(&name_bytes[..header_len]);
    writer.write_all(&header)?;

    let tri_count = u32::try_from(mesh.triangles.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many triangles for STL"))?;
    writer.write_all(&tri_count.to_le_bytes())?;

    let mut record = [0u8; TRIANGLE_RECORD_LEN];
    for tri in &mesh.triangles {
        let a = mesh.vertices[tri[0] as usize];
        let b = mesh.vertices[tri[1] as usize];
        let c = mesh.vertices[tri[2] as usize];

        for (slot, value) in [triangle_normal(a, b, c), a, b, c].iter().enumerate() {
            let offset = slot * 12;
            record[offset..offset + 4].copy_from_slice(&(value[0] as f32).to_le_bytes());
            record[offset + 4..offset + 8].copy_from_slice(&(value[1] as f32).to_le_bytes());
            record[offset + 8..offset + 12].copy_from_slice(&(value[2] as f32).to_le_bytes());
        }
        writer.write_all(&record)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{Mesh, box_mesh};

    use super::to_binary_stl;

    fn read_f32(bytes: &[u8], offset: usize) -> f32 {
        f32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[test]
    fn binary_stl_has_valid_size_and_triangle_count() {
        let mesh = box_mesh([10.0, 5.0, 3.0]);
        let bytes = to_binary_stl(&mesh, "model");
        assert_eq!(bytes.len(), 84 + 12 * 50);
        let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]);
        assert_eq!(count, 12);
        assert_eq!(&bytes[..5], b"model");
        assert!(bytes[5..80].iter().all(|&b| b == 0));
    }

    #[test]
    fn first_record_holds_normal_vertices_and_zero_attribute() {
        let mesh = Mesh {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            triangles: vec![[0, 1, 2]],
        };
        let bytes = to_binary_stl(&mesh, "tri");

        assert_eq!(read_f32(&bytes, 84 + 8), 1.0);
        assert_eq!(read_f32(&bytes, 84 + 24), 1.0);
        assert_eq!(read_f32(&bytes, 84 + 40), 1.0);
        assert_eq!(&bytes[132..134], &[0, 0]);
    }

    #[test]
    fn long_names_are_truncated_to_header() {
        let name = "x".repeat(200);
        let bytes = to_binary_stl(&Mesh::empty(), &name);
        assert_eq!(bytes.len(), 84);
        assert!(bytes[..80].iter().all(|&b| b == b'x'));
        assert_eq!(&bytes[80..84], &[0, 0, 0, 0]);
    }
}
