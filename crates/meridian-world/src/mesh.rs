//! Terrain mesh generation from bordered height fields.
//!
//! The outer ring of the height field produces "border" vertices. They take
//! part in normal averaging so tile edges shade the same as their neighbours,
//! but they never reach the final vertex or index buffers.
//!
//! Triangles wind clockwise when viewed from above (+Y); face normals point up.

use glam::{Vec2, Vec3};

use crate::height::HeightFieldSample;

/// Vertex stride for a LOD level.
#[must_use]
pub const fn lod_stride(lod: u32) -> usize {
    if lod == 0 {
        1
    } else {
        lod as usize * 2
    }
}

/// Interior vertices per row for a bordered grid of side `bordered_size`.
#[must_use]
pub const fn vertices_per_line(bordered_size: usize, lod: u32) -> usize {
    let stride = lod_stride(lod);
    (bordered_size - 1 - 2 * stride) / stride + 1
}

/// Renderable mesh data handed to the rendering and physics collaborators.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshBuffers {
    /// Vertex positions in tile-local space
    pub vertices: Vec<Vec3>,
    /// Unit vertex normals, one per vertex
    pub normals: Vec<Vec3>,
    /// Texture coordinates in `[0, 1]`
    pub uvs: Vec<Vec2>,
    /// Triangle list
    pub triangles: Vec<[u32; 3]>,
    /// Row length of the vertex grid (0 for flat-shaded meshes)
    pub vertices_per_line: usize,
}

impl MeshBuffers {
    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Flattened index buffer.
    #[must_use]
    pub fn indices(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Whether the mesh is flat-shaded (no shared vertices).
    #[must_use]
    pub fn is_flat_shaded(&self) -> bool {
        self.vertices_per_line == 0 && !self.vertices.is_empty()
    }
}

/// Classification of a visited grid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VertexSlot {
    Mesh(u32),
    Border(u32),
}

/// Grid location and height of a vertex, used for exact edge vectors.
#[derive(Debug, Clone, Copy)]
struct GridPoint {
    x: i32,
    z: i32,
    height: f32,
}

/// Work-in-progress mesh including the auxiliary border data.
#[derive(Debug, Default)]
struct MeshDraft {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    mesh_points: Vec<GridPoint>,
    border_points: Vec<GridPoint>,
    /// Every triangle in emission order, border ones included
    all_triangles: Vec<[VertexSlot; 3]>,
    cell: f32,
    vertices_per_line: usize,
}

impl MeshDraft {
    fn point(&self, slot: VertexSlot) -> GridPoint {
        match slot {
            VertexSlot::Mesh(i) => self.mesh_points[i as usize],
            VertexSlot::Border(i) => self.border_points[i as usize],
        }
    }

    fn edge(&self, from: GridPoint, to: GridPoint) -> Vec3 {
        Vec3::new(
            (to.x - from.x) as f32 * self.cell,
            to.height - from.height,
            (to.z - from.z) as f32 * self.cell,
        )
    }

    fn face_normal(&self, [a, b, c]: [VertexSlot; 3]) -> Vec3 {
        let (a, b, c) = (self.point(a), self.point(b), self.point(c));
        self.edge(a, c).cross(self.edge(a, b))
    }

    /// Area-weighted smooth normals, accumulated in triangle emission order.
    fn smooth_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for &triangle in &self.all_triangles {
            let normal = self.face_normal(triangle);
            for slot in triangle {
                if let VertexSlot::Mesh(i) = slot {
                    normals[i as usize] += normal;
                }
            }
        }
        // Degenerate neighbourhoods stay zero rather than becoming NaN.
        normals.iter_mut().for_each(|n| *n = n.normalize_or_zero());
        normals
    }

    fn mesh_triangles(&self) -> Vec<[u32; 3]> {
        self.all_triangles
            .iter()
            .filter_map(|triangle| match *triangle {
                [VertexSlot::Mesh(a), VertexSlot::Mesh(b), VertexSlot::Mesh(c)] => {
                    Some([a, b, c])
                },
                _ => None,
            })
            .collect()
    }

    fn finish(self) -> MeshBuffers {
        MeshBuffers {
            normals: self.smooth_normals(),
            triangles: self.mesh_triangles(),
            vertices_per_line: self.vertices_per_line,
            vertices: self.vertices,
            uvs: self.uvs,
        }
    }

    fn finish_flat(self) -> MeshBuffers {
        let triangles = self.mesh_triangles();
        let mut vertices = Vec::with_capacity(triangles.len() * 3);
        let mut uvs = Vec::with_capacity(triangles.len() * 3);
        let mut normals = Vec::with_capacity(triangles.len() * 3);
        for &[a, b, c] in &triangles {
            let corners = [a as usize, b as usize, c as usize];
            let [pa, pb, pc] = corners.map(|i| self.vertices[i]);
            let normal = (pc - pa).cross(pb - pa).normalize_or_zero();
            for i in corners {
                vertices.push(self.vertices[i]);
                uvs.push(self.uvs[i]);
                normals.push(normal);
            }
        }
        let count = vertices.len() as u32;
        MeshBuffers {
            vertices,
            normals,
            uvs,
            triangles: (0..count / 3).map(|t| [t * 3, t * 3 + 1, t * 3 + 2]).collect(),
            vertices_per_line: 0,
        }
    }
}

/// Builds a mesh from a bordered height field at the given LOD.
///
/// Every LOD of the same tile spans the same `(n - 3) x (n - 3)` footprint in
/// grid units, where `n` is the bordered side length.
///
/// Edge vertices of neighbouring tiles coincide exactly only at LOD 0. At
/// coarser LODs the last column is sampled one stride inside the tile edge.
///
/// # Panics
/// Panics if the field is not square or too small for the stride.
#[must_use]
pub fn build(field: &HeightFieldSample, lod: u32, flat_shading: bool) -> MeshBuffers {
    let size = field.width();
    let stride = lod_stride(lod);
    assert_eq!(
        size,
        field.height(),
        "bordered height field must be square, got {size}x{}",
        field.height()
    );
    assert!(
        size > 2 * stride + 1,
        "bordered size {size} is too small for LOD {lod} (stride {stride})"
    );

    let last = size - 1;
    let inner_steps = (last - 2 * stride) as f32;
    let footprint = (size - 3) as f32;
    let line = last / stride + 1;

    let mut draft = MeshDraft {
        cell: footprint / inner_steps,
        vertices_per_line: vertices_per_line(size, lod),
        ..MeshDraft::default()
    };

    let mut slots = Vec::with_capacity(line * line);
    for z in (0..size).step_by(stride) {
        for x in (0..size).step_by(stride) {
            let point = GridPoint {
                x: x as i32,
                z: z as i32,
                height: field.get(x, z),
            };
            let is_border = x == 0 || z == 0 || x == last || z == last;
            if is_border {
                slots.push(VertexSlot::Border(draft.border_points.len() as u32));
                draft.border_points.push(point);
            } else {
                let u = (x - stride) as f32 / inner_steps;
                let v = (z - stride) as f32 / inner_steps;
                slots.push(VertexSlot::Mesh(draft.vertices.len() as u32));
                draft.vertices.push(Vec3::new(
                    (x - stride) as f32 * draft.cell,
                    point.height,
                    (z - stride) as f32 * draft.cell,
                ));
                draft.uvs.push(Vec2::new(u, v));
                draft.mesh_points.push(point);
            }
        }
    }

    for row in 0..line - 1 {
        for col in 0..line - 1 {
            if (col + 1) * stride > last || (row + 1) * stride > last {
                continue;
            }
            let tl = slots[row * line + col];
            let tr = slots[row * line + col + 1];
            let bl = slots[(row + 1) * line + col];
            let br = slots[(row + 1) * line + col + 1];
            draft.all_triangles.push([tl, tr, bl]);
            draft.all_triangles.push([tr, br, bl]);
        }
    }

    if flat_shading {
        draft.finish_flat()
    } else {
        draft.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::HeightCurve;
    use crate::height::generate_chunk;
    use crate::settings::{HeightMapSettings, NoiseSettings};
    use meridian_common::ChunkCoord;

    fn flat_field(size: usize, height: f32) -> HeightFieldSample {
        HeightFieldSample::from_values(size, size, vec![height; size * size])
    }

    fn noisy_settings() -> HeightMapSettings {
        HeightMapSettings {
            noise: NoiseSettings {
                frequency: 0.08,
                seed: 7,
                ..NoiseSettings::default()
            },
            multiplier: 25.0,
            curve: HeightCurve::linear(),
            use_falloff: false,
        }
    }

    #[test]
    fn test_lod_stride() {
        assert_eq!(lod_stride(0), 1);
        assert_eq!(lod_stride(1), 2);
        assert_eq!(lod_stride(4), 8);
    }

    #[test]
    fn test_vertex_and_normal_counts_per_lod() {
        let field = flat_field(49, 1.0);
        for lod in 0..5 {
            let mesh = build(&field, lod, false);
            let line = vertices_per_line(49, lod);
            assert_eq!(mesh.vertex_count(), line * line, "lod {lod}");
            assert_eq!(mesh.normals.len(), mesh.vertex_count());
            assert_eq!(mesh.uvs.len(), mesh.vertex_count());
            assert_eq!(mesh.triangle_count(), (line - 1) * (line - 1) * 2);
        }
        assert_eq!(vertices_per_line(49, 0), 47);
        assert_eq!(vertices_per_line(49, 1), 23);
        assert_eq!(vertices_per_line(49, 4), 5);
    }

    #[test]
    fn test_index_buffer_only_references_mesh_vertices() {
        let field = flat_field(25, 0.0);
        let mesh = build(&field, 1, false);
        let count = mesh.vertex_count() as u32;
        assert!(mesh.indices().iter().all(|&i| i < count));
    }

    #[test]
    fn test_every_lod_has_same_footprint() {
        let field = flat_field(49, 0.0);
        for lod in 0..5 {
            let mesh = build(&field, lod, false);
            let max_x = mesh.vertices.iter().map(|v| v.x).fold(f32::MIN, f32::max);
            let min_x = mesh.vertices.iter().map(|v| v.x).fold(f32::MAX, f32::min);
            assert_eq!(min_x, 0.0);
            assert!((max_x - 46.0).abs() < 1e-4, "lod {lod} spans {max_x}");
            let max_u = mesh.uvs.iter().map(|uv| uv.x).fold(f32::MIN, f32::max);
            assert!((max_u - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_flat_terrain_normals_point_up() {
        let mesh = build(&flat_field(25, 3.0), 0, false);
        assert!(mesh.normals.iter().all(|n| (*n - Vec3::Y).length() < 1e-6));
    }

    #[test]
    fn test_slope_normals_lean_downhill() {
        let size = 25;
        let values = (0..size * size).map(|i| (i % size) as f32).collect();
        let field = HeightFieldSample::from_values(size, size, values);
        let mesh = build(&field, 0, false);
        for n in &mesh.normals {
            assert!(n.x < 0.0 && n.y > 0.0);
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_normals_are_unit_and_finite() {
        let field = generate_chunk(ChunkCoord::new(2, -1), 47, &noisy_settings()).expect("field");
        for lod in 0..5 {
            let mesh = build(&field, lod, false);
            for n in &mesh.normals {
                assert!(n.is_finite());
                assert!((n.length() - 1.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_degenerate_geometry_yields_no_nan() {
        let size = 7;
        let mut values = vec![0.0; size * size];
        values[3 * size + 3] = f32::MAX;
        let field = HeightFieldSample::from_values(size, size, values);
        let mesh = build(&field, 0, false);
        assert!(mesh.normals.iter().all(|n| !n.is_nan()));
    }

    // Only LOD 0 shares exact edge columns; coarser strides inset the last column.
    #[test]
    fn test_seam_vertices_match_between_neighbours() {
        let mesh_size = 47;
        let settings = noisy_settings();
        let left = generate_chunk(ChunkCoord::new(0, 0), mesh_size, &settings).expect("left");
        let right = generate_chunk(ChunkCoord::new(1, 0), mesh_size, &settings).expect("right");
        let left_mesh = build(&left, 0, false);
        let right_mesh = build(&right, 0, false);
        let line = left_mesh.vertices_per_line;
        for row in 0..line {
            let a = row * line + (line - 1);
            let b = row * line;
            let (va, vb) = (left_mesh.vertices[a], right_mesh.vertices[b]);
            assert_eq!(va.y.to_bits(), vb.y.to_bits());
            assert_eq!(va.z.to_bits(), vb.z.to_bits());
            assert_eq!(va.x - vb.x, (mesh_size - 1) as f32);
            let (na, nb) = (left_mesh.normals[a], right_mesh.normals[b]);
            assert_eq!(na.to_array().map(f32::to_bits), nb.to_array().map(f32::to_bits));
        }
    }

    #[test]
    fn test_flat_shading_duplicates_vertices() {
        let field = generate_chunk(ChunkCoord::new(0, 0), 47, &noisy_settings()).expect("field");
        let smooth = build(&field, 2, false);
        let flat = build(&field, 2, true);
        assert!(flat.is_flat_shaded());
        assert_eq!(flat.vertex_count(), smooth.triangle_count() * 3);
        assert_eq!(flat.normals.len(), flat.vertex_count());
        assert_eq!(flat.triangle_count(), smooth.triangle_count());
        for (t, triangle) in flat.triangles.iter().enumerate() {
            let base = t as u32 * 3;
            assert_eq!(*triangle, [base, base + 1, base + 2]);
            let [a, b, c] = triangle.map(|i| flat.normals[i as usize]);
            assert_eq!(a, b);
            assert_eq!(b, c);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let field = generate_chunk(ChunkCoord::new(5, 5), 47, &noisy_settings()).expect("field");
        assert_eq!(build(&field, 1, false), build(&field, 1, false));
    }
}
