//! glTF format support.
//!
//! This module provides loading of meshes from glTF and GLB files. Each glTF
//! mesh becomes one [`UvMesh`]; its primitives are merged. `TEXCOORD_0` is
//! loaded as the UV set `map1`, with V flipped to the bottom-left origin
//! used everywhere else in this crate.
//!
//! Note: Saving to glTF is not supported.

use std::path::Path;

use nalgebra::{Point2, Point3};

use crate::error::{MeshError, Result};
use crate::mesh::UvMesh;

use super::obj::UV_SET_NAME;

/// Load all meshes from a glTF or GLB file.
///
/// Primitives that are not triangle lists, strips or fans are skipped.
/// Meshes without any triangles are dropped.
///
/// # Example
///
/// ```no_run
/// use uvratio::io::gltf;
///
/// let meshes = gltf::load("model.gltf").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<UvMesh>> {
    let path = path.as_ref();

    let (document, buffers, _images) =
        ::gltf::import(path).map_err(|e| MeshError::load(path, e.to_string()))?;

    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        let name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh{}", mesh.index()));

        let mut positions: Vec<Point3<f64>> = Vec::new();
        let mut coords: Vec<Point2<f32>> = Vec::new();
        let mut triangles: Vec<[usize; 3]> = Vec::new();
        let mut mapped: Vec<bool> = Vec::new();

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
            let vertex_offset = positions.len();

            let Some(read_positions) = reader.read_positions() else {
                continue;
            };
            positions.extend(
                read_positions.map(|p| Point3::new(p[0] as f64, p[1] as f64, p[2] as f64)),
            );
            let count = positions.len() - vertex_offset;

            // Coordinates stay index-aligned with positions.
            let has_uvs = match reader.read_tex_coords(0) {
                Some(tex) => {
                    coords.extend(tex.into_f32().map(|t| Point2::new(t[0], 1.0 - t[1])));
                    true
                }
                None => false,
            };
            coords.resize(positions.len(), Point2::origin());

            let indices: Vec<usize> = match reader.read_indices() {
                Some(indices) => indices.into_u32().map(|i| i as usize).collect(),
                None => (0..count).collect(),
            };

            let before = triangles.len();
            primitive_triangles(primitive.mode(), &indices, vertex_offset, &mut triangles);
            mapped.resize(mapped.len() + triangles.len() - before, has_uvs);
        }

        if triangles.is_empty() {
            log::warn!("{}: no triangles, skipped", name);
            continue;
        }

        let polygons: Vec<Vec<usize>> = triangles.iter().map(|t| t.to_vec()).collect();
        let mut uv_mesh = UvMesh::from_polygons(name, positions, &polygons)?;
        if mapped.iter().any(|&m| m) {
            let face_uvs: Vec<Vec<usize>> = polygons
                .iter()
                .zip(&mapped)
                .map(|(poly, &m)| if m { poly.clone() } else { Vec::new() })
                .collect();
            uv_mesh.add_uv_set(UV_SET_NAME, &coords, &face_uvs)?;
        }
        meshes.push(uv_mesh);
    }

    if meshes.is_empty() {
        return Err(MeshError::load(path, "glTF file contains no triangle meshes"));
    }
    Ok(meshes)
}

fn primitive_triangles(
    mode: ::gltf::mesh::Mode,
    indices: &[usize],
    offset: usize,
    out: &mut Vec<[usize; 3]>,
) {
    match mode {
        ::gltf::mesh::Mode::Triangles => {
            for chunk in indices.chunks_exact(3) {
                out.push([chunk[0] + offset, chunk[1] + offset, chunk[2] + offset]);
            }
        }
        ::gltf::mesh::Mode::TriangleStrip => {
            for i in 0..indices.len().saturating_sub(2) {
                if i % 2 == 0 {
                    out.push([indices[i] + offset, indices[i + 1] + offset, indices[i + 2] + offset]);
                } else {
                    // Reverse winding for odd triangles
                    out.push([indices[i] + offset, indices[i + 2] + offset, indices[i + 1] + offset]);
                }
            }
        }
        ::gltf::mesh::Mode::TriangleFan => {
            for i in 1..indices.len().saturating_sub(1) {
                out.push([indices[0] + offset, indices[i] + offset, indices[i + 1] + offset]);
            }
        }
        _ => {}
    }
}
