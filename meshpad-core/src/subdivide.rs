/// Midpoint subdivision
///
/// Every triangle `(v0, v1, v2)` becomes four: one per corner plus a
/// central triangle joining the edge midpoints. No smoothing is applied,
/// so the surface keeps its shape while edge resolution doubles.
///
/// Two variants are provided:
///
/// - [`SubdivisionMethod::Split`] gives each input triangle a private copy
///   of its six points (`v0, v1, v2, m01, m12, m20`). Output has `6T`
///   positions and `4T` triangles; shared edges are not welded.
/// - [`SubdivisionMethod::Welded`] keeps the original positions and shares
///   each edge midpoint between the triangles on that edge, so output has
///   `V + E` positions.
///
/// Triangle winding is preserved by both.
use std::collections::HashMap;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SubdivideError;
use crate::geometry::GeometryBuffer;

/// Subdivision strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubdivisionMethod {
    /// Per-triangle copies of corners and midpoints, no welding.
    #[default]
    Split,
    /// Midpoints shared through an edge-keyed cache.
    Welded,
}

/// Parameters for [`subdivide_mesh`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubdivideParams {
    pub method: SubdivisionMethod,
    pub iterations: u32,
    /// Upper bound on the output triangle count.
    pub max_triangles: usize,
}

impl Default for SubdivideParams {
    fn default() -> Self {
        Self {
            method: SubdivisionMethod::Split,
            iterations: 1,
            max_triangles: 4_000_000,
        }
    }
}

impl SubdivideParams {
    pub fn welded() -> Self {
        Self {
            method: SubdivisionMethod::Welded,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Triangle count after all iterations, saturating on overflow.
    pub fn expected_triangles(&self, triangles: usize) -> usize {
        (0..self.iterations).fold(triangles, |count, _| count.saturating_mul(4))
    }
}

/// Outcome of [`subdivide_mesh`].
#[derive(Debug, Clone)]
pub struct SubdivisionResult {
    pub geometry: GeometryBuffer,
    pub original_triangles: usize,
    pub final_triangles: usize,
    pub original_positions: usize,
    pub final_positions: usize,
    pub iterations: u32,
    pub method: SubdivisionMethod,
}

/// Validate the input and run `params.iterations` passes.
///
/// An unindexed input is returned unchanged, as with [`subdivide`].
pub fn subdivide_mesh(
    geometry: &GeometryBuffer,
    params: &SubdivideParams,
) -> Result<SubdivisionResult, SubdivideError> {
    if params.iterations == 0 {
        return Err(SubdivideError::InvalidIterations(0));
    }
    geometry.validate()?;

    let original_triangles = geometry.triangle_count();
    let projected = params.expected_triangles(original_triangles);
    if geometry.is_indexed() && projected > params.max_triangles {
        return Err(SubdivideError::MeshTooLarge {
            current: original_triangles,
            projected,
            max: params.max_triangles,
        });
    }

    debug!(
        triangles = original_triangles,
        positions = geometry.position_count(),
        iterations = params.iterations,
        method = ?params.method,
        "subdividing geometry"
    );

    let mut current = geometry.clone();
    for _ in 0..params.iterations {
        current = match params.method {
            SubdivisionMethod::Split => subdivide(&current),
            SubdivisionMethod::Welded => subdivide_welded(&current),
        };
    }

    Ok(SubdivisionResult {
        original_triangles,
        final_triangles: current.triangle_count(),
        original_positions: geometry.position_count(),
        final_positions: current.position_count(),
        iterations: params.iterations,
        method: params.method,
        geometry: current,
    })
}

/// One pass of unwelded 1-to-4 midpoint subdivision.
///
/// Returns a new buffer and leaves the input untouched. A buffer without an
/// index list comes back as an unchanged copy.
///
/// # Panics
///
/// Panics if an index is out of range for the position list. An index count
/// that is not a multiple of 3 trips a debug assertion; release builds drop
/// the trailing indices. [`subdivide_mesh`] validates both first.
pub fn subdivide(geometry: &GeometryBuffer) -> GeometryBuffer {
    if !geometry.is_indexed() {
        return geometry.clone();
    }
    debug_assert!(
        geometry.indices.len() % 3 == 0,
        "index count {} is not a multiple of 3",
        geometry.indices.len()
    );

    let triangles = geometry.indices.len() / 3;
    let mut positions = Vec::with_capacity(triangles * 6);
    let mut indices = Vec::with_capacity(triangles * 12);

    for triangle in geometry.triangles() {
        let [v0, v1, v2] = geometry.triangle_positions(triangle);
        let m01 = midpoint(&v0, &v1);
        let m12 = midpoint(&v1, &v2);
        let m20 = midpoint(&v2, &v0);

        let base = positions.len() as u32;
        positions.extend_from_slice(&[v0, v1, v2, m01, m12, m20]);
        indices.extend_from_slice(&[
            base,
            base + 3,
            base + 5,
            base + 3,
            base + 1,
            base + 4,
            base + 5,
            base + 4,
            base + 2,
            base + 3,
            base + 4,
            base + 5,
        ]);
    }

    GeometryBuffer::new(positions, indices)
}

/// One pass of midpoint subdivision with shared edge midpoints.
///
/// The first `positions.len()` output positions are the input positions in
/// their original order.
///
/// # Panics
///
/// Panics if an index is out of range for the position list. An index count
/// that is not a multiple of 3 trips a debug assertion; release builds drop
/// the trailing indices. [`subdivide_mesh`] validates both first.
pub fn subdivide_welded(geometry: &GeometryBuffer) -> GeometryBuffer {
    if !geometry.is_indexed() {
        return geometry.clone();
    }
    debug_assert!(
        geometry.indices.len() % 3 == 0,
        "index count {} is not a multiple of 3",
        geometry.indices.len()
    );

    let mut positions = geometry.positions.clone();
    let mut indices = Vec::with_capacity(geometry.indices.len() * 4);
    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();

    for [i0, i1, i2] in geometry.triangles() {
        let mut edge_midpoint = |a: u32, b: u32| {
            let key = if a <= b { (a, b) } else { (b, a) };
            *midpoints.entry(key).or_insert_with(|| {
                let index = positions.len() as u32;
                positions.push(midpoint(
                    &geometry.positions[a as usize],
                    &geometry.positions[b as usize],
                ));
                index
            })
        };
        let m01 = edge_midpoint(i0, i1);
        let m12 = edge_midpoint(i1, i2);
        let m20 = edge_midpoint(i2, i0);

        indices.extend_from_slice(&[
            i0, m01, m20, //
            m01, i1, m12, //
            m20, m12, i2, //
            m01, m12, m20,
        ]);
    }

    GeometryBuffer::new(positions, indices)
}

fn midpoint(a: &Point3<f32>, b: &Point3<f32>) -> Point3<f32> {
    a.lerp(b, 0.5)
}
