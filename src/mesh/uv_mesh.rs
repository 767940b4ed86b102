//! In-memory polygon mesh with named UV sets.

use nalgebra::{Matrix4, Point2, Point3};

use super::access::{MeshAccess, Space};
use super::index::{FaceId, UvId, VertexId};
use crate::error::{MeshError, Result};

/// A named set of UV coordinates and the per-corner assignment into it.
#[derive(Debug, Clone)]
pub struct UvSet {
    pub(crate) name: String,
    pub(crate) u: Vec<f32>,
    pub(crate) v: Vec<f32>,
    /// UV index per polygon corner; empty for faces that are not mapped.
    pub(crate) face_uvs: Vec<Vec<UvId>>,
}

impl UvSet {
    /// Name of the set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of UV coordinates stored in the set.
    pub fn len(&self) -> usize {
        self.u.len()
    }

    /// Check if the set stores no coordinates.
    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }

    /// Coordinate of a UV.
    #[inline]
    pub fn get(&self, uv: UvId) -> Point2<f32> {
        Point2::new(self.u[uv.index()], self.v[uv.index()])
    }

    /// UV indices of a face's corners (empty if the face is unmapped).
    pub fn face_uvs(&self, face: FaceId) -> &[UvId] {
        self.face_uvs
            .get(face.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A polygon mesh carrying one or more UV sets.
///
/// Faces are stored as corner lists into the vertex array. Each UV set maps
/// every corner of every face to an index in that set's coordinate arrays,
/// so UVs can be split along seams independently of the vertices.
///
/// # Example
///
/// ```
/// use uvratio::mesh::{MeshAccess, UvMesh};
/// use nalgebra::{Point2, Point3};
///
/// let positions = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mut mesh = UvMesh::from_polygons("quad", positions, &[vec![0, 1, 2, 3]]).unwrap();
/// let uvs = vec![
///     Point2::new(0.0, 0.0),
///     Point2::new(0.5, 0.0),
///     Point2::new(0.5, 0.5),
///     Point2::new(0.0, 0.5),
/// ];
/// mesh.add_uv_set("map1", &uvs, &[vec![0, 1, 2, 3]]).unwrap();
///
/// assert_eq!(mesh.num_faces(), 1);
/// assert_eq!(mesh.current_uv_set().as_deref(), Some("map1"));
/// ```
#[derive(Debug, Clone)]
pub struct UvMesh {
    pub(crate) name: String,
    pub(crate) positions: Vec<Point3<f64>>,
    pub(crate) faces: Vec<Vec<VertexId>>,
    pub(crate) uv_sets: Vec<UvSet>,
    pub(crate) current: Option<usize>,
    pub(crate) transform: Matrix4<f64>,
    pub(crate) unit_scale: f64,
}

impl UvMesh {
    /// Set the object-to-world transform.
    pub fn with_transform(mut self, transform: Matrix4<f64>) -> Self {
        self.transform = transform;
        self
    }

    /// Set the factor converting internal lengths to display units.
    pub fn with_unit_scale(mut self, scale: f64) -> Self {
        self.unit_scale = scale;
        self
    }

    /// Rename the mesh.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Object-space position of a vertex.
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.positions[v.index()]
    }

    /// All vertex positions.
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// Vertex indices of a face.
    pub fn face_vertices(&self, face: FaceId) -> &[VertexId] {
        &self.faces[face.index()]
    }

    /// Look up a UV set by name.
    pub fn uv_set(&self, name: &str) -> Option<&UvSet> {
        self.uv_sets.iter().find(|s| s.name == name)
    }

    fn uv_set_mut(&mut self, name: &str) -> Result<&mut UvSet> {
        let mesh = self.name.clone();
        self.uv_sets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| MeshError::UnknownUvSet {
                name: name.to_string(),
                mesh,
            })
    }

    fn require_uv_set(&self, name: &str) -> Result<&UvSet> {
        self.uv_set(name).ok_or_else(|| MeshError::UnknownUvSet {
            name: name.to_string(),
            mesh: self.name.clone(),
        })
    }

    /// All UV sets in creation order.
    pub fn uv_sets(&self) -> &[UvSet] {
        &self.uv_sets
    }

    fn world_point(&self, p: &Point3<f64>) -> Point3<f64> {
        let w = self.transform.transform_point(p);
        Point3::from(w.coords * self.unit_scale)
    }
}

impl MeshAccess for UvMesh {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_faces(&self) -> usize {
        self.faces.len()
    }

    fn face_corner_count(&self, face: FaceId) -> usize {
        self.faces[face.index()].len()
    }

    fn face_triangles(&self, face: FaceId) -> Vec<[usize; 3]> {
        // Fan triangulation keeps corner indices polygon-local.
        let n = self.faces[face.index()].len();
        (1..n.saturating_sub(1)).map(|i| [0, i, i + 1]).collect()
    }

    fn corner_position(&self, face: FaceId, corner: usize, space: Space) -> Point3<f64> {
        let p = &self.positions[self.faces[face.index()][corner].index()];
        match space {
            Space::World => self.world_point(p),
            Space::Object => *p,
        }
    }

    fn corner_uv(&self, face: FaceId, corner: usize, uv_set: &str) -> Option<UvId> {
        self.uv_set(uv_set)?.face_uvs(face).get(corner).copied()
    }

    fn uv_set_names(&self) -> Vec<String> {
        self.uv_sets.iter().map(|s| s.name.clone()).collect()
    }

    fn current_uv_set(&self) -> Option<String> {
        self.current.map(|i| self.uv_sets[i].name.clone())
    }

    fn set_current_uv_set(&mut self, name: &str) -> Result<()> {
        let index = self
            .uv_sets
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| MeshError::UnknownUvSet {
                name: name.to_string(),
                mesh: self.name.clone(),
            })?;
        self.current = Some(index);
        Ok(())
    }

    fn uvs(&self, uv_set: &str) -> Result<(Vec<f32>, Vec<f32>)> {
        let set = self.require_uv_set(uv_set)?;
        Ok((set.u.clone(), set.v.clone()))
    }

    fn set_uvs(&mut self, uv_set: &str, u: &[f32], v: &[f32]) -> Result<()> {
        if u.len() != v.len() {
            return Err(MeshError::UvLengthMismatch {
                u: u.len(),
                v: v.len(),
            });
        }
        let set = self.uv_set_mut(uv_set)?;
        if u.len() != set.u.len() {
            return Err(MeshError::invalid_param(
                "uv_count",
                u.len(),
                "must match the existing uv count",
            ));
        }
        set.u.copy_from_slice(u);
        set.v.copy_from_slice(v);
        Ok(())
    }

    fn has_uv_set(&self, name: &str) -> bool {
        self.uv_set(name).is_some()
    }
}
