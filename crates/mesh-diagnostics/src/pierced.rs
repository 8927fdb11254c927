//! Pierced-face (self-intersection) detection.
//!
//! A pierced face is one that geometrically intersects another face
//! without sharing any vertex with it. Candidate pairs come from the
//! octree over triangle centroids, are pre-filtered by exact AABB overlap,
//! and are then decided by the Separating Axis Theorem: two triangles are
//! disjoint iff some axis among the two face normals and the nine
//! edge-edge cross products separates their projections.
//!
//! Besides one-shot detection over a whole mesh, [`SpatialIndex`] keeps
//! the triangle table, per-face bounding boxes, and the octree alive
//! across local edits so that repeated detection around a small set of
//! modified faces stays cheap.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashSet;
use nalgebra::Vector3;
use tracing::{debug, info, warn};

use crate::error::{DiagError, DiagResult};
use crate::octree::Octree;
use crate::timing::OperationTimer;
use crate::types::{Aabb, EPS_AXIS, EPS_GEOM, Mesh, Triangle, safe_div};

/// Parameters for pierced-face detection.
#[derive(Debug, Clone)]
pub struct PiercedParams {
    /// Coincident-vertex threshold for the shared-vertex exclusion.
    pub eps_geom: f64,
    /// Axes with a norm below this are ignored in the SAT test.
    pub eps_axis: f64,
}

impl Default for PiercedParams {
    fn default() -> Self {
        Self {
            eps_geom: EPS_GEOM,
            eps_axis: EPS_AXIS,
        }
    }
}

/// Result of a pierced-face detection run.
///
/// `faces` holds every face involved in at least one intersection, sorted
/// ascending; `map` holds the symmetric intersection relation
/// (`g ∈ map[f]` iff `f ∈ map[g]`, and `faces` equals the key set).
#[derive(Debug, Clone)]
pub struct PiercedResult {
    pub faces: Vec<u32>,
    pub map: BTreeMap<u32, Vec<u32>>,
    /// Wall-clock seconds spent in the detection run.
    pub elapsed: f64,
}

impl PiercedResult {
    /// Whether no intersections were found.
    pub fn is_clean(&self) -> bool {
        self.faces.is_empty()
    }

    fn from_pairs(pairs: BTreeMap<u32, BTreeSet<u32>>, elapsed: f64) -> Self {
        let faces: Vec<u32> = pairs.keys().copied().collect();
        let map = pairs
            .into_iter()
            .map(|(face, others)| (face, others.into_iter().collect()))
            .collect();
        Self {
            faces,
            map,
            elapsed,
        }
    }
}

impl std::fmt::Display for PiercedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            write!(f, "No pierced faces detected")
        } else {
            write!(f, "Pierced faces: {} face(s) involved", self.faces.len())
        }
    }
}

/// Project a triangle onto an axis, returning the interval `(min, max)`.
#[inline]
fn project(tri: &Triangle, axis: &Vector3<f64>) -> (f64, f64) {
    let p0 = axis.dot(&tri.v0.coords);
    let p1 = axis.dot(&tri.v1.coords);
    let p2 = axis.dot(&tri.v2.coords);
    (p0.min(p1).min(p2), p0.max(p1).max(p2))
}

/// Whether the projections of the two triangles onto `axis` are disjoint.
#[inline]
fn separated_on_axis(t1: &Triangle, t2: &Triangle, axis: &Vector3<f64>) -> bool {
    let (min1, max1) = project(t1, axis);
    let (min2, max2) = project(t2, axis);
    max1 < min2 || max2 < min1
}

/// Exact triangle-triangle intersection test by the Separating Axis
/// Theorem. Degenerate axes (norm below `eps_axis`) are skipped.
pub fn triangles_intersect(t1: &Triangle, t2: &Triangle, params: &PiercedParams) -> bool {
    // Face-normal axes.
    for normal in [t1.normal_unnormalized(), t2.normal_unnormalized()] {
        let norm = normal.norm();
        if norm >= params.eps_axis && separated_on_axis(t1, t2, &safe_div(normal, norm)) {
            return false;
        }
    }

    // The nine edge-edge cross-product axes.
    for e1 in t1.edge_vectors() {
        for e2 in t2.edge_vectors() {
            let cross = e1.cross(&e2);
            let norm = cross.norm();
            if norm >= params.eps_axis && separated_on_axis(t1, t2, &safe_div(cross, norm)) {
                return false;
            }
        }
    }

    // No separating axis exists.
    true
}

/// Whether the two triangles share a vertex by geometric proximity.
///
/// Adjacent faces touch along an edge or corner and must not be reported
/// as pierced, so any corner pair closer than `eps_geom` excludes the pair.
pub fn share_vertex(t1: &Triangle, t2: &Triangle, eps_geom: f64) -> bool {
    let eps_sq = eps_geom * eps_geom;
    t1.corners()
        .iter()
        .any(|a| t2.corners().iter().any(|b| (a - b).norm_squared() < eps_sq))
}

/// Cached per-mesh geometry: triangle table, bounding boxes, octree.
#[derive(Debug, Clone)]
struct IndexState {
    triangles: Vec<Triangle>,
    aabbs: Vec<Aabb>,
    octree: Octree,
    face_count: usize,
    vertex_count: usize,
}

impl IndexState {
    /// Build from a mesh. Out-of-range vertex indices are a structural
    /// input problem here (every face is read) and surface as an error.
    fn build(mesh: &Mesh) -> DiagResult<Self> {
        let mut triangles = Vec::with_capacity(mesh.face_count());
        for (face_idx, face) in mesh.faces.iter().enumerate() {
            let tri = mesh.triangle(face_idx).ok_or_else(|| {
                let bad = face
                    .iter()
                    .copied()
                    .find(|&v| v as usize >= mesh.vertex_count())
                    .unwrap_or(face[0]);
                DiagError::InvalidVertexIndex {
                    face_index: face_idx,
                    vertex_index: bad,
                    vertex_count: mesh.vertex_count(),
                }
            })?;
            triangles.push(tri);
        }

        let aabbs: Vec<Aabb> = triangles.iter().map(Triangle::aabb).collect();
        let octree = Octree::build(&triangles);

        Ok(Self {
            triangles,
            aabbs,
            octree,
            face_count: mesh.face_count(),
            vertex_count: mesh.vertex_count(),
        })
    }

    /// SAT + shared-vertex decision for one AABB-overlapping pair.
    fn pair_intersects(&self, a: u32, b: u32, params: &PiercedParams) -> bool {
        let (t1, t2) = (&self.triangles[a as usize], &self.triangles[b as usize]);
        !share_vertex(t1, t2, params.eps_geom) && triangles_intersect(t1, t2, params)
    }
}

/// Detect pierced faces across the whole mesh with default parameters.
pub fn detect_pierced_faces(mesh: &Mesh) -> DiagResult<PiercedResult> {
    detect_pierced_faces_with_params(mesh, &PiercedParams::default())
}

/// Detect pierced faces across the whole mesh.
///
/// Builds triangle AABBs and the octree, then for every face queries the
/// octree for candidates and runs the AABB prefilter, the shared-vertex
/// exclusion, and the SAT test on each.
pub fn detect_pierced_faces_with_params(
    mesh: &Mesh,
    params: &PiercedParams,
) -> DiagResult<PiercedResult> {
    let timer = OperationTimer::start("detect_pierced_faces");

    let state = IndexState::build(mesh)?;
    let mut pairs: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();

    for face_idx in 0..state.face_count as u32 {
        let bbox = state.aabbs[face_idx as usize];
        state.octree.for_each_candidate(&bbox, &mut |other_idx| {
            if other_idx == face_idx {
                return;
            }
            if !bbox.intersects(&state.aabbs[other_idx as usize]) {
                return;
            }
            if state.pair_intersects(face_idx, other_idx, params) {
                pairs.entry(face_idx).or_default().insert(other_idx);
                pairs.entry(other_idx).or_default().insert(face_idx);
            }
        });
    }

    let involved = pairs.len();
    let result = PiercedResult::from_pairs(pairs, timer.finish());
    if involved > 0 {
        warn!(faces = involved, "pierced faces found");
    } else {
        info!("no pierced faces found");
    }
    Ok(result)
}

/// Persistent spatial index for incremental pierced-face detection.
///
/// The index is an opaque handle owned by the caller; it starts
/// uninitialized and is (re)built on demand. Callers must not share one
/// index across concurrent detection runs.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    state: Option<IndexState>,
    params: PiercedParams,
}

/// Fraction of modified faces above which the octree is rebuilt rather
/// than left stale.
const REBUILD_FRACTION: f64 = 0.1;

impl SpatialIndex {
    /// Create an uninitialized index with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an uninitialized index with explicit tolerances.
    pub fn with_params(params: PiercedParams) -> Self {
        Self {
            state: None,
            params,
        }
    }

    /// Whether the index currently holds a built state.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Drop any cached state, returning the index to uninitialized.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Build (or fully rebuild) the cached triangle table, bounding boxes,
    /// and octree from the mesh.
    pub fn initialize(&mut self, mesh: &Mesh) -> DiagResult<()> {
        let timer = OperationTimer::start("initialize_spatial_index");
        self.state = Some(IndexState::build(mesh)?);
        debug!(
            faces = mesh.face_count(),
            vertices = mesh.vertex_count(),
            elapsed_secs = timer.finish(),
            "spatial index initialized"
        );
        Ok(())
    }

    /// Refresh the cached geometry for `modified` faces after a local
    /// edit.
    ///
    /// A change in the mesh's face or vertex count discards the cache and
    /// rebuilds from scratch. When the modified set exceeds 10% of the
    /// faces the octree is rebuilt too (keeping the refreshed triangles);
    /// otherwise the octree is left in place — stale bucketing only widens
    /// candidate sets, it never loses intersections, because queries
    /// re-check exact per-face boxes. Invalid face indices are logged and
    /// skipped.
    pub fn update(&mut self, mesh: &Mesh, modified: &[u32]) -> DiagResult<()> {
        let Some(state) = self.state.as_mut() else {
            return self.initialize(mesh);
        };

        if state.face_count != mesh.face_count() || state.vertex_count != mesh.vertex_count() {
            info!(
                old_faces = state.face_count,
                new_faces = mesh.face_count(),
                "mesh dimensions changed, rebuilding spatial index"
            );
            return self.initialize(mesh);
        }

        let timer = OperationTimer::start("update_spatial_index");

        for &face_idx in modified {
            if face_idx as usize >= state.face_count {
                warn!(face = face_idx, "invalid face index in modification list");
                continue;
            }
            match mesh.triangle(face_idx as usize) {
                Some(tri) => {
                    state.aabbs[face_idx as usize] = tri.aabb();
                    state.triangles[face_idx as usize] = tri;
                }
                None => {
                    warn!(face = face_idx, "modified face references out-of-range vertex");
                }
            }
        }

        if modified.len() as f64 > state.face_count as f64 * REBUILD_FRACTION {
            info!(
                modified = modified.len(),
                "large update, rebuilding octree"
            );
            state.octree = Octree::build(&state.triangles);
        }

        debug!(
            modified = modified.len(),
            elapsed_secs = timer.finish(),
            "spatial index updated"
        );
        Ok(())
    }

    /// Localized pierced-face detection around a set of target faces.
    ///
    /// An uninitialized index is built implicitly. The target set is
    /// expanded to a candidate set by walking the octree and taking every
    /// face stored at a leaf whose cell overlaps a target's bounding box.
    /// Each target is then tested against every other candidate, and each
    /// non-target candidate against every target, so asymmetric edits are
    /// caught from both sides. The output is restricted to pairs touching
    /// the target set.
    pub fn detect_local(&mut self, mesh: &Mesh, targets: &[u32]) -> DiagResult<PiercedResult> {
        let timer = OperationTimer::start("detect_pierced_faces_local");

        let state = match self.state.take() {
            Some(state) => state,
            None => {
                debug!("spatial index not initialized, building it now");
                IndexState::build(mesh)?
            }
        };
        let params = &self.params;

        let mut valid_targets: Vec<u32> = Vec::with_capacity(targets.len());
        let mut target_set: HashSet<u32> = HashSet::with_capacity(targets.len());
        for &face_idx in targets {
            if face_idx as usize >= state.face_count {
                warn!(face = face_idx, "invalid face index in target list");
                continue;
            }
            if target_set.insert(face_idx) {
                valid_targets.push(face_idx);
            }
        }

        // Candidate expansion: targets plus everything in octree cells
        // their bounding boxes touch. BTreeSet keeps iteration canonical.
        let mut candidates: BTreeSet<u32> = valid_targets.iter().copied().collect();
        for &target in &valid_targets {
            let bbox = state.aabbs[target as usize];
            state
                .octree
                .for_each_candidate(&bbox, &mut |face| {
                    candidates.insert(face);
                });
        }
        debug!(
            targets = valid_targets.len(),
            candidates = candidates.len(),
            "local detection candidate set expanded"
        );

        let mut pairs: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        let mut check_pair = |pairs: &mut BTreeMap<u32, BTreeSet<u32>>, a: u32, b: u32| {
            if a != b
                && state.aabbs[a as usize].intersects(&state.aabbs[b as usize])
                && state.pair_intersects(a, b, params)
            {
                pairs.entry(a).or_default().insert(b);
                pairs.entry(b).or_default().insert(a);
            }
        };

        for &face_idx in &candidates {
            if target_set.contains(&face_idx) {
                for &other_idx in &candidates {
                    check_pair(&mut pairs, face_idx, other_idx);
                }
            } else {
                for &target_idx in &valid_targets {
                    check_pair(&mut pairs, face_idx, target_idx);
                }
            }
        }

        let result = PiercedResult::from_pairs(pairs, timer.finish());
        info!(
            targets = valid_targets.len(),
            pierced = result.faces.len(),
            "local pierced-face detection complete"
        );
        self.state = Some(state);
        Ok(result)
    }
}
