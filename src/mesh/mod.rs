//! Core mesh data structures.
//!
//! This module provides the polygon mesh representation the processing
//! pipeline works on, and the [`MeshAccess`] trait that lets a host plug in
//! its own mesh storage instead.
//!
//! # Overview
//!
//! [`UvMesh`] stores polygon faces as corner lists into a vertex array, plus
//! any number of named UV sets. Each UV set assigns every face corner to a UV
//! coordinate, so UV seams are independent of vertex topology.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`FaceId`] - Identifies a polygon face
//! - [`UvId`] - Identifies a UV coordinate within a UV set
//!
//! # Construction
//!
//! ```
//! use uvratio::mesh::{MeshAccess, UvMesh};
//! use nalgebra::{Point2, Point3};
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let mut mesh = UvMesh::from_polygons("tri", positions, &[vec![0, 1, 2]]).unwrap();
//! mesh.add_uv_set(
//!     "map1",
//!     &[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.5, 1.0)],
//!     &[vec![0, 1, 2]],
//! )
//! .unwrap();
//! assert!(mesh.has_uv_set("map1"));
//! ```

mod access;
mod builder;
mod index;
mod uv_mesh;

pub use access::{FaceIds, MeshAccess, Space};
pub use builder::build_grid;
pub use index::{FaceId, UvId, VertexId};
pub use uv_mesh::{UvMesh, UvSet};
