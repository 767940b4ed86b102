//! Wavefront OBJ format support.
//!
//! Every object (`o`) or group in the file becomes its own [`UvMesh`]. The
//! `vt` coordinates and per-corner `v/vt` references are kept as a UV set
//! named `map1`, so UV seams survive loading. Polygons are not triangulated.
//!
//! Saving writes the current UV set of each mesh.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point2, Point3};

use crate::error::{MeshError, Result};
use crate::mesh::{MeshAccess, UvId, UvMesh};

/// Name given to the UV set read from `vt` records.
pub const UV_SET_NAME: &str = "map1";

/// Load all objects of an OBJ file.
///
/// # Example
///
/// ```no_run
/// use uvratio::io::obj;
///
/// let meshes = obj::load("model.obj").unwrap();
/// println!("{} objects", meshes.len());
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<UvMesh>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    read(&mut reader).map_err(|e| match e {
        MeshError::LoadError { message, .. } => MeshError::load(path, message),
        other => other,
    })
}

/// Read OBJ data from a buffered reader. Material libraries are ignored.
pub fn read<R: BufRead>(reader: &mut R) -> Result<Vec<UvMesh>> {
    let options = tobj::LoadOptions {
        single_index: false,
        triangulate: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };
    let (models, _) = tobj::load_obj_buf(reader, &options, |_| Ok(Default::default()))
        .map_err(|e| MeshError::load("<obj>", e.to_string()))?;

    let meshes = models
        .iter()
        .filter(|m| !m.mesh.indices.is_empty())
        .map(|m| to_uv_mesh(&m.name, &m.mesh))
        .collect::<Result<Vec<_>>>()?;

    if meshes.is_empty() {
        return Err(MeshError::load("<obj>", "OBJ data contains no faces"));
    }
    Ok(meshes)
}

fn to_uv_mesh(name: &str, mesh: &tobj::Mesh) -> Result<UvMesh> {
    let positions: Vec<Point3<f64>> = mesh
        .positions
        .chunks_exact(3)
        .map(|p| Point3::new(p[0] as f64, p[1] as f64, p[2] as f64))
        .collect();

    // An empty arity list means every face is a triangle.
    let arities: Vec<usize> = if mesh.face_arities.is_empty() {
        vec![3; mesh.indices.len() / 3]
    } else {
        mesh.face_arities.iter().map(|&a| a as usize).collect()
    };

    let split = |indices: &[u32]| -> Vec<Vec<usize>> {
        let mut polygons = Vec::with_capacity(arities.len());
        let mut next = 0;
        for &arity in &arities {
            let end = (next + arity).min(indices.len());
            polygons.push(indices[next..end].iter().map(|&i| i as usize).collect());
            next = end;
        }
        polygons
    };

    let polygons = split(&mesh.indices);
    let mut uv_mesh = UvMesh::from_polygons(name, positions, &polygons)?;

    if !mesh.texcoords.is_empty() && mesh.texcoord_indices.len() == mesh.indices.len() {
        let coords: Vec<Point2<f32>> = mesh
            .texcoords
            .chunks_exact(2)
            .map(|t| Point2::new(t[0], t[1]))
            .collect();
        uv_mesh.add_uv_set(UV_SET_NAME, &coords, &split(&mesh.texcoord_indices))?;
    } else {
        log::debug!("{}: no texture coordinates", name);
    }

    Ok(uv_mesh)
}

/// Save meshes to an OBJ file, one object per mesh.
///
/// # Example
///
/// ```no_run
/// use uvratio::io::obj;
/// use uvratio::mesh::build_grid;
/// use nalgebra::Point2;
///
/// let mesh = build_grid("plane", 2, 2, 1.0, 0.5, Point2::origin()).unwrap();
/// obj::save(&[mesh], "output.obj").unwrap();
/// ```
pub fn save<P: AsRef<Path>>(meshes: &[UvMesh], path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write(meshes, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write meshes as OBJ text.
pub fn write<W: Write>(meshes: &[UvMesh], writer: &mut W) -> Result<()> {
    writeln!(writer, "# uvratio")?;

    let mut vertex_base = 1;
    let mut uv_base = 1;
    for mesh in meshes {
        writeln!(writer, "o {}", mesh.name())?;
        for p in mesh.positions() {
            writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
        }

        let set = mesh
            .current_uv_set()
            .and_then(|name| mesh.uv_set(&name));
        if let Some(set) = set {
            for i in 0..set.len() {
                let t = set.get(UvId::new(i));
                writeln!(writer, "vt {} {}", t.x, t.y)?;
            }
        }

        for face in mesh.face_ids() {
            let verts = mesh.face_vertices(face);
            let uvs = set.map(|s| s.face_uvs(face)).unwrap_or(&[]);
            write!(writer, "f")?;
            for (corner, v) in verts.iter().enumerate() {
                match uvs.get(corner) {
                    Some(uv) => write!(
                        writer,
                        " {}/{}",
                        v.index() + vertex_base,
                        uv.index() + uv_base
                    )?,
                    None => write!(writer, " {}", v.index() + vertex_base)?,
                }
            }
            writeln!(writer)?;
        }

        vertex_base += mesh.num_vertices();
        uv_base += set.map_or(0, |s| s.len());
    }
    Ok(())
}
