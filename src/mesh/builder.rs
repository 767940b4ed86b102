//! Mesh construction utilities.
//!
//! This module provides functions for building [`UvMesh`] values from
//! face-vertex lists as found in mesh file formats, and for attaching UV sets
//! to them.

use nalgebra::{Matrix4, Point2, Point3};

use super::index::{UvId, VertexId};
use super::uv_mesh::{UvMesh, UvSet};
use crate::error::{MeshError, Result};

impl UvMesh {
    /// Build a mesh from vertex positions and polygon corner lists.
    ///
    /// The mesh starts without UV sets; use [`UvMesh::add_uv_set`] to attach
    /// them.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no faces, a face has fewer than three
    /// corners, or a corner references a missing vertex.
    pub fn from_polygons(
        name: impl Into<String>,
        positions: Vec<Point3<f64>>,
        polygons: &[Vec<usize>],
    ) -> Result<Self> {
        if polygons.is_empty() {
            return Err(MeshError::EmptyMesh);
        }

        let mut faces = Vec::with_capacity(polygons.len());
        for (fi, poly) in polygons.iter().enumerate() {
            if poly.len() < 3 {
                return Err(MeshError::DegenerateFace {
                    face: fi,
                    corners: poly.len(),
                });
            }
            for &vi in poly {
                if vi >= positions.len() {
                    return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
                }
            }
            faces.push(poly.iter().map(|&vi| VertexId::new(vi)).collect());
        }

        Ok(Self {
            name: name.into(),
            positions,
            faces,
            uv_sets: Vec::new(),
            current: None,
            transform: Matrix4::identity(),
            unit_scale: 1.0,
        })
    }

    /// Attach a UV set.
    ///
    /// `face_uvs` holds one entry per face: either the UV index of every
    /// corner, or an empty list for a face that is not mapped in this set.
    /// The first set added becomes the current set.
    ///
    /// # Errors
    ///
    /// Returns an error if the face count or a face's corner count does not
    /// match, if a UV index is out of range, or if a set with the same name
    /// already exists.
    pub fn add_uv_set(
        &mut self,
        name: impl Into<String>,
        coords: &[Point2<f32>],
        face_uvs: &[Vec<usize>],
    ) -> Result<()> {
        let name = name.into();
        if self.uv_set(&name).is_some() {
            return Err(MeshError::invalid_param("uv_set", name, "already exists"));
        }
        if face_uvs.len() != self.faces.len() {
            return Err(MeshError::invalid_param(
                "face_uvs",
                face_uvs.len(),
                "must have one entry per face",
            ));
        }

        let mut assigned = Vec::with_capacity(face_uvs.len());
        for (fi, uvs) in face_uvs.iter().enumerate() {
            let corners = self.faces[fi].len();
            if !uvs.is_empty() && uvs.len() != corners {
                return Err(MeshError::CornerMismatch {
                    face: fi,
                    corners,
                    uvs: uvs.len(),
                });
            }
            for &uv in uvs {
                if uv >= coords.len() {
                    return Err(MeshError::InvalidUvIndex { face: fi, uv });
                }
            }
            assigned.push(uvs.iter().map(|&uv| UvId::new(uv)).collect());
        }

        self.uv_sets.push(UvSet {
            name,
            u: coords.iter().map(|p| p.x).collect(),
            v: coords.iter().map(|p| p.y).collect(),
            face_uvs: assigned,
        });
        if self.current.is_none() {
            self.current = Some(self.uv_sets.len() - 1);
        }
        Ok(())
    }
}

/// Build a flat grid of quads with a single UV set named `map1`.
///
/// The grid has `cols x rows` cells of `cell_size` world units; the UVs form
/// one connected shell of `uv_cell` units per cell, starting at `uv_origin`.
///
/// # Example
///
/// ```
/// use uvratio::mesh::{build_grid, MeshAccess};
/// use nalgebra::Point2;
///
/// let mesh = build_grid("plane", 4, 2, 1.0, 0.1, Point2::origin()).unwrap();
/// assert_eq!(mesh.num_faces(), 8);
/// ```
pub fn build_grid(
    name: impl Into<String>,
    cols: usize,
    rows: usize,
    cell_size: f64,
    uv_cell: f32,
    uv_origin: Point2<f32>,
) -> Result<UvMesh> {
    let mut positions = Vec::with_capacity((cols + 1) * (rows + 1));
    let mut coords = Vec::with_capacity((cols + 1) * (rows + 1));

    for j in 0..=rows {
        for i in 0..=cols {
            positions.push(Point3::new(i as f64 * cell_size, j as f64 * cell_size, 0.0));
            coords.push(Point2::new(
                uv_origin.x + i as f32 * uv_cell,
                uv_origin.y + j as f32 * uv_cell,
            ));
        }
    }

    let mut polygons = Vec::with_capacity(cols * rows);
    for j in 0..rows {
        for i in 0..cols {
            let v00 = j * (cols + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (cols + 1);
            let v11 = v01 + 1;
            polygons.push(vec![v00, v10, v11, v01]);
        }
    }

    let mut mesh = UvMesh::from_polygons(name, positions, &polygons)?;
    mesh.add_uv_set("map1", &coords, &polygons)?;
    Ok(mesh)
}
