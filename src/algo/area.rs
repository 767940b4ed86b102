//! Surface and UV area measurement.
//!
//! Areas are accumulated per triangle over polygon faces, using the host's
//! triangulation. 3D areas use Heron's formula on the three edge lengths so
//! that the result only depends on distances; UV areas use the 2D cross
//! product.
//!
//! Empty or degenerate input yields `0.0`, never an error. Face ids past the
//! end of the mesh are skipped.
//!
//! # Example
//!
//! ```
//! use uvratio::algo::area::{measure_faces, surface_area, uv_area};
//! use uvratio::mesh::{build_grid, Space};
//! use nalgebra::Point2;
//!
//! // 2x2 world units mapped onto 0.2x0.2 of UV space.
//! let mesh = build_grid("plane", 2, 2, 1.0, 0.1, Point2::origin()).unwrap();
//!
//! assert!((surface_area(&mesh, None, Space::World) - 4.0).abs() < 1e-9);
//! assert!((uv_area(&mesh, None, "map1") - 0.04).abs() < 1e-6);
//!
//! let m = measure_faces(&mesh, None, "map1");
//! assert!((m.ratio() - 100.0).abs() < 1e-3);
//! ```

use nalgebra::{Point2, Point3};

use crate::mesh::{FaceId, MeshAccess, Space};

/// Squared triangle area from its three edge lengths (Heron's formula).
///
/// Can be slightly negative for degenerate triangles because of rounding.
#[inline]
pub fn triangle_area_squared(a: f64, b: f64, c: f64) -> f64 {
    let s = (a + b + c) * 0.5;
    s * (s - a) * (s - b) * (s - c)
}

/// Area of a 3D triangle.
#[inline]
pub fn triangle_area_3d(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> f64 {
    let a = (p1 - p0).norm();
    let b = (p2 - p1).norm();
    let c = (p0 - p2).norm();
    let sq = triangle_area_squared(a, b, c);
    if sq > 0.0 {
        sq.sqrt()
    } else {
        0.0
    }
}

/// Area of a 2D triangle.
#[inline]
pub fn triangle_area_2d(p0: &Point2<f64>, p1: &Point2<f64>, p2: &Point2<f64>) -> f64 {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    (e1.x * e2.y - e1.y * e2.x).abs() * 0.5
}

fn for_each_face<M, F>(mesh: &M, faces: Option<&[FaceId]>, mut f: F)
where
    M: MeshAccess + ?Sized,
    F: FnMut(FaceId),
{
    match faces {
        Some(faces) => faces
            .iter()
            .copied()
            .filter(|face| face.index() < mesh.num_faces())
            .for_each(&mut f),
        None => mesh.face_ids().for_each(&mut f),
    }
}

/// Total 3D surface area of the given faces, or of the whole mesh.
pub fn surface_area<M: MeshAccess + ?Sized>(
    mesh: &M,
    faces: Option<&[FaceId]>,
    space: Space,
) -> f64 {
    let mut area = 0.0;
    for_each_face(mesh, faces, |face| {
        for [i, j, k] in mesh.face_triangles(face) {
            let p0 = mesh.corner_position(face, i, space);
            let p1 = mesh.corner_position(face, j, space);
            let p2 = mesh.corner_position(face, k, space);
            area += triangle_area_3d(&p0, &p1, &p2);
        }
    });
    area
}

/// Total UV area of the given faces in a UV set, read from the mesh.
pub fn uv_area<M: MeshAccess + ?Sized>(mesh: &M, faces: Option<&[FaceId]>, uv_set: &str) -> f64 {
    match mesh.uvs(uv_set) {
        Ok((u, v)) => uv_area_from(mesh, faces, uv_set, &u, &v),
        Err(_) => 0.0,
    }
}

/// Total UV area of the given faces, using explicit coordinate arrays.
///
/// The UV assignment of each corner still comes from `mesh`; `u` and `v`
/// replace the stored coordinates. Corners without a UV, or with a UV index
/// outside the arrays, make their triangle contribute nothing.
pub fn uv_area_from<M: MeshAccess + ?Sized>(
    mesh: &M,
    faces: Option<&[FaceId]>,
    uv_set: &str,
    u: &[f32],
    v: &[f32],
) -> f64 {
    let coord = |face: FaceId, corner: usize| -> Option<Point2<f64>> {
        let id = mesh.corner_uv(face, corner, uv_set)?.index();
        Some(Point2::new(*u.get(id)? as f64, *v.get(id)? as f64))
    };

    let mut area = 0.0;
    for_each_face(mesh, faces, |face| {
        for [i, j, k] in mesh.face_triangles(face) {
            if let (Some(p0), Some(p1), Some(p2)) = (coord(face, i), coord(face, j), coord(face, k))
            {
                area += triangle_area_2d(&p0, &p1, &p2);
            }
        }
    });
    area
}

/// Surface and UV area of a set of faces.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaceMeasure {
    /// World-space surface area.
    pub area_3d: f64,
    /// UV area.
    pub area_2d: f64,
}

impl FaceMeasure {
    /// Surface area per unit of UV area; `1.0` if either area is zero.
    pub fn ratio(&self) -> f64 {
        if self.area_3d == 0.0 || self.area_2d == 0.0 {
            1.0
        } else {
            self.area_3d / self.area_2d
        }
    }
}

/// Measure the world-space surface area and UV area of faces in one pass.
pub fn measure_faces<M: MeshAccess + ?Sized>(
    mesh: &M,
    faces: Option<&[FaceId]>,
    uv_set: &str,
) -> FaceMeasure {
    FaceMeasure {
        area_3d: surface_area(mesh, faces, Space::World),
        area_2d: uv_area(mesh, faces, uv_set),
    }
}
