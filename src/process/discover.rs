//! Turning a selection into jobs.
//!
//! At object level every selected mesh becomes one whole-mesh job. At shell
//! level each mesh is split into UV shells, the sets of UVs connected
//! through shared polygons, and every shell touched by the selection becomes
//! its own job.

use std::collections::BTreeSet;

use crate::mesh::{FaceId, MeshAccess, UvId};

use super::job::{Job, MeshUnit};
use super::options::{AutoRatioOptions, OperationMode};
use super::uvset::resolve_uv_set;

/// What part of a mesh is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The whole mesh.
    Whole,
    /// Some faces; every shell they touch is kept.
    Faces(Vec<FaceId>),
    /// Some UVs; every shell they belong to is kept.
    Uvs(Vec<UvId>),
}

/// UV shell membership of one mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UvShells {
    /// Shell of every UV; `None` for UVs no face uses.
    pub shell_of: Vec<Option<usize>>,
    /// Number of shells.
    pub count: usize,
}

impl UvShells {
    /// UVs of one shell, in index order.
    pub fn uvs(&self, shell: usize) -> Vec<UvId> {
        self.shell_of
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Some(shell))
            .map(|(i, _)| UvId::new(i))
            .collect()
    }

    /// UVs of every shell, in index order.
    pub fn members(&self) -> Vec<Vec<UvId>> {
        let mut members = vec![Vec::new(); self.count];
        for (i, shell) in self.shell_of.iter().enumerate() {
            if let Some(shell) = *shell {
                members[shell].push(UvId::new(i));
            }
        }
        members
    }
}

fn find_root(parents: &mut [usize], mut index: usize) -> usize {
    while parents[index] != index {
        parents[index] = parents[parents[index]];
        index = parents[index];
    }
    index
}

fn union_sets(parents: &mut [usize], ranks: &mut [u8], a: usize, b: usize) {
    let mut root_a = find_root(parents, a);
    let mut root_b = find_root(parents, b);
    if root_a == root_b {
        return;
    }
    if ranks[root_a] < ranks[root_b] {
        std::mem::swap(&mut root_a, &mut root_b);
    }
    parents[root_b] = root_a;
    if ranks[root_a] == ranks[root_b] {
        ranks[root_a] = ranks[root_a].saturating_add(1);
    }
}

/// Split the UVs of a set into shells.
///
/// Two UVs are in the same shell if some chain of faces connects them. Shells
/// are numbered in the order of their lowest UV index.
pub fn uv_shells<M: MeshAccess + ?Sized>(mesh: &M, uv_set: &str) -> UvShells {
    let num_uvs = mesh.uvs(uv_set).map(|(u, _)| u.len()).unwrap_or(0);
    let mut parents: Vec<usize> = (0..num_uvs).collect();
    let mut ranks = vec![0u8; num_uvs];
    let mut used = vec![false; num_uvs];

    for face in mesh.face_ids() {
        let mut first = None;
        for corner in 0..mesh.face_corner_count(face) {
            let Some(uv) = mesh.corner_uv(face, corner, uv_set) else {
                continue;
            };
            let i = uv.index();
            if i >= num_uvs {
                continue;
            }
            used[i] = true;
            match first {
                None => first = Some(i),
                Some(f) => union_sets(&mut parents, &mut ranks, f, i),
            }
        }
    }

    let mut numbering = vec![None; num_uvs];
    let mut shell_of = vec![None; num_uvs];
    let mut count = 0;
    for i in 0..num_uvs {
        if !used[i] {
            continue;
        }
        let root = find_root(&mut parents, i);
        let shell = *numbering[root].get_or_insert_with(|| {
            count += 1;
            count - 1
        });
        shell_of[i] = Some(shell);
    }

    UvShells { shell_of, count }
}

/// Faces of every shell.
///
/// All mapped corners of a face are joined into one shell, so the first
/// corner with a shell decides where the face goes.
fn shell_faces<M: MeshAccess + ?Sized>(mesh: &M, uv_set: &str, shells: &UvShells) -> Vec<Vec<FaceId>> {
    let mut faces = vec![Vec::new(); shells.count];
    for face in mesh.face_ids() {
        let shell = (0..mesh.face_corner_count(face)).find_map(|corner| {
            mesh.corner_uv(face, corner, uv_set)
                .and_then(|uv| shells.shell_of.get(uv.index()).copied().flatten())
        });
        if let Some(shell) = shell {
            faces[shell].push(face);
        }
    }
    faces
}

/// Merge selections of the same mesh, keeping first-seen order.
fn unique_meshes(selection: &[(usize, Selection)]) -> Vec<(usize, Vec<&Selection>)> {
    let mut order: Vec<(usize, Vec<&Selection>)> = Vec::new();
    for (handle, sel) in selection {
        match order.iter_mut().find(|(h, _)| h == handle) {
            Some((_, sels)) => sels.push(sel),
            None => order.push((*handle, vec![sel])),
        }
    }
    order
}

/// Build the mesh units and jobs for a run.
///
/// `selection` pairs mesh handles (indices into `meshes`) with what is
/// selected on them; a mesh may appear more than once.
///
/// At shell level, meshes whose UV set does not resolve, or whose selection
/// touches no shell, are left out. Handles that do not name a mesh are left
/// out at shell level and kept at object level, where gathering reports them
/// as [`JobError::InvalidMesh`](crate::error::JobError::InvalidMesh).
///
/// # Example
///
/// ```
/// use uvratio::mesh::build_grid;
/// use uvratio::process::{discover_jobs, AutoRatioOptions, OperationMode, Selection};
/// use nalgebra::Point2;
///
/// let meshes = vec![build_grid("plane", 2, 2, 1.0, 0.1, Point2::origin()).unwrap()];
/// let options = AutoRatioOptions::default().with_operation_mode(OperationMode::UvShellLevel);
///
/// let units = discover_jobs(&meshes, &[(0, Selection::Whole)], &options);
/// assert_eq!(units.len(), 1);
/// assert_eq!(units[0].jobs.len(), 1);
/// ```
pub fn discover_jobs<M: MeshAccess>(
    meshes: &[M],
    selection: &[(usize, Selection)],
    options: &AutoRatioOptions,
) -> Vec<MeshUnit> {
    let meshes_selected = unique_meshes(selection);

    match options.operation_mode {
        OperationMode::ObjectLevel => meshes_selected
            .into_iter()
            .map(|(handle, _)| MeshUnit::new(handle, vec![Job::whole()]))
            .collect(),
        OperationMode::UvShellLevel => meshes_selected
            .into_iter()
            .filter_map(|(handle, sels)| {
                let Some(mesh) = meshes.get(handle) else {
                    log::warn!("selection names missing mesh {}, skipped", handle);
                    return None;
                };
                shell_unit(mesh, handle, &sels, options)
            })
            .collect(),
    }
}

fn shell_unit<M: MeshAccess>(
    mesh: &M,
    handle: usize,
    selections: &[&Selection],
    options: &AutoRatioOptions,
) -> Option<MeshUnit> {
    let choice = match resolve_uv_set(mesh, options.uv_set.as_deref(), options.fallback) {
        Ok(choice) => choice,
        Err(e) => {
            log::warn!("{}: {}", mesh.name(), e);
            return None;
        }
    };
    let uv_set = choice.name();
    let shells = uv_shells(mesh, uv_set);

    let shell_of = |uv: UvId| shells.shell_of.get(uv.index()).copied().flatten();
    let mut keep = BTreeSet::new();

    for sel in selections {
        match sel {
            Selection::Whole => {
                keep = (0..shells.count).collect();
                break;
            }
            Selection::Uvs(uvs) => keep.extend(uvs.iter().filter_map(|&uv| shell_of(uv))),
            Selection::Faces(faces) => {
                for &face in faces {
                    if face.index() >= mesh.num_faces() {
                        continue;
                    }
                    keep.extend(
                        (0..mesh.face_corner_count(face))
                            .filter_map(|corner| mesh.corner_uv(face, corner, uv_set))
                            .filter_map(shell_of),
                    );
                }
            }
        }
    }

    if keep.is_empty() {
        log::debug!("{}: selection touches no uv shell", mesh.name());
        return None;
    }

    let mut uvs = shells.members();
    let mut faces = shell_faces(mesh, uv_set, &shells);
    let jobs = keep
        .iter()
        .map(|&shell| {
            Job::shell(
                shell,
                std::mem::take(&mut uvs[shell]),
                std::mem::take(&mut faces[shell]),
            )
        })
        .collect();

    log::debug!(
        "{}: {} of {} uv shells selected on '{}'",
        mesh.name(),
        keep.len(),
        shells.count,
        uv_set
    );
    Some(MeshUnit::new(handle, jobs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::UvMesh;
    use crate::process::JobKind;
    use nalgebra::{Point2, Point3};

    /// Two quads sharing an edge in 3D but split into two UV shells.
    fn split_strip() -> UvMesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        let polys = vec![vec![0, 1, 4, 3], vec![1, 2, 5, 4]];
        let mut mesh = UvMesh::from_polygons("strip", positions, &polys).unwrap();
        let coords = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.4, 0.0),
            Point2::new(0.4, 0.4),
            Point2::new(0.0, 0.4),
            Point2::new(0.5, 0.0),
            Point2::new(0.9, 0.0),
            Point2::new(0.9, 0.4),
            Point2::new(0.5, 0.4),
            // Unused UV.
            Point2::new(0.9, 0.9),
        ];
        mesh.add_uv_set("map1", &coords, &[vec![0, 1, 2, 3], vec![4, 5, 6, 7]])
            .unwrap();
        mesh
    }

    #[test]
    fn test_union_find() {
        let mut parents: Vec<usize> = (0..5).collect();
        let mut ranks = vec![0u8; 5];
        union_sets(&mut parents, &mut ranks, 0, 1);
        union_sets(&mut parents, &mut ranks, 3, 4);
        union_sets(&mut parents, &mut ranks, 1, 4);
        let root = find_root(&mut parents, 0);
        assert_eq!(find_root(&mut parents, 3), root);
        assert_ne!(find_root(&mut parents, 2), root);
    }

    #[test]
    fn test_uv_shells() {
        let mesh = split_strip();
        let shells = uv_shells(&mesh, "map1");
        assert_eq!(shells.count, 2);
        assert_eq!(shells.shell_of[0], Some(0));
        assert_eq!(shells.shell_of[3], Some(0));
        assert_eq!(shells.shell_of[4], Some(1));
        assert_eq!(shells.shell_of[8], None);
        assert_eq!(shells.uvs(1).len(), 4);
        assert_eq!(shells.members()[1], shells.uvs(1));
    }

    #[test]
    fn test_many_small_shells() {
        // A soup of disconnected triangles, one UV shell each.
        let n = 4000;
        let mut positions = Vec::with_capacity(n * 3);
        let mut coords = Vec::with_capacity(n * 3);
        let mut polys = Vec::with_capacity(n);
        for i in 0..n {
            let x = (i % 64) as f64;
            let y = (i / 64) as f64;
            positions.push(Point3::new(x, y, 0.0));
            positions.push(Point3::new(x + 0.5, y, 0.0));
            positions.push(Point3::new(x, y + 0.5, 0.0));
            let (s, t) = (x as f32 * 0.01, y as f32 * 0.01);
            coords.push(Point2::new(s, t));
            coords.push(Point2::new(s + 0.005, t));
            coords.push(Point2::new(s, t + 0.005));
            polys.push(vec![3 * i, 3 * i + 1, 3 * i + 2]);
        }
        let mut mesh = UvMesh::from_polygons("soup", positions, &polys).unwrap();
        mesh.add_uv_set("map1", &coords, &polys).unwrap();

        let options = AutoRatioOptions::default().with_operation_mode(OperationMode::UvShellLevel);
        let units = discover_jobs(&[mesh], &[(0, Selection::Whole)], &options);
        let jobs = &units[0].jobs;
        assert_eq!(jobs.len(), n);
        for (i, job) in jobs.iter().enumerate() {
            assert_eq!(job.faces(), Some(&[FaceId::new(i)][..]));
            let uvs: Vec<usize> = job.uvs().unwrap().iter().map(|uv| uv.index()).collect();
            assert_eq!(uvs, vec![3 * i, 3 * i + 1, 3 * i + 2]);
        }
    }

    #[test]
    fn test_object_level_dedups_meshes() {
        let meshes = vec![split_strip()];
        let selection = vec![
            (0, Selection::Faces(vec![FaceId::new(0)])),
            (0, Selection::Whole),
            (7, Selection::Whole),
        ];
        let units = discover_jobs(&meshes, &selection, &AutoRatioOptions::default());
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].handle, 0);
        assert_eq!(units[1].handle, 7);
        assert_eq!(units[0].jobs[0].kind, JobKind::Whole);
    }

    #[test]
    fn test_shell_level_selection() {
        let meshes = vec![split_strip()];
        let options = AutoRatioOptions::default().with_operation_mode(OperationMode::UvShellLevel);

        let units = discover_jobs(&meshes, &[(0, Selection::Whole)], &options);
        assert_eq!(units[0].jobs.len(), 2);

        let units = discover_jobs(&meshes, &[(0, Selection::Faces(vec![FaceId::new(1)]))], &options);
        assert_eq!(units[0].jobs.len(), 1);
        assert_eq!(units[0].jobs[0].faces(), Some(&[FaceId::new(1)][..]));

        let units = discover_jobs(&meshes, &[(0, Selection::Uvs(vec![UvId::new(2)]))], &options);
        assert_eq!(units[0].jobs[0].name("strip"), "shell:0");

        // An unused UV belongs to no shell.
        let units = discover_jobs(&meshes, &[(0, Selection::Uvs(vec![UvId::new(8)]))], &options);
        assert!(units.is_empty());
    }

    #[test]
    fn test_shell_level_skips_missing_uv_set() {
        let meshes = vec![split_strip()];
        let options = AutoRatioOptions::default()
            .with_operation_mode(OperationMode::UvShellLevel)
            .with_uv_set("lightmap");
        assert!(discover_jobs(&meshes, &[(0, Selection::Whole)], &options).is_empty());
        assert!(discover_jobs(&meshes, &[(3, Selection::Whole)], &options).is_empty());
    }
}
