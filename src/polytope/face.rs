use std::ptr;

use glam::DVec3;
use slotmap::new_key_type;
use smallvec::SmallVec;

use super::{half_edge::EdgeKey, ConvexPolytope, HalfEdge, Vertex};
use crate::{Aabb, Plane, Segment};

new_key_type! {
    /// Stable handle to a face of a [`ConvexPolytope`].
    pub struct FaceKey;
}

#[derive(Clone, Debug)]
pub(crate) struct FaceData {
    // Boundary loop, counter-clockwise when seen from the side `normal` points to.
    pub(crate) edges: SmallVec<[EdgeKey; 8]>,
    pub(crate) normal: DVec3,
    pub(crate) centroid: DVec3,
    pub(crate) area: f64,
    pub(crate) aabb: Aabb,
}

impl FaceData {
    pub(crate) fn new() -> FaceData {
        FaceData {
            edges: SmallVec::new(),
            normal: DVec3::Z,
            centroid: DVec3::ZERO,
            area: 0.0,
            aabb: Aabb::EMPTY,
        }
    }

    /// Recomputes the normal, centroid, area and bounds from the loop's vertex positions.
    ///
    /// The normal comes from Newell's method, so it follows the winding of the loop. Point and
    /// segment faces have no area; they keep any normal orthogonal to their extent.
    pub(crate) fn update_geometry(&mut self, positions: &[DVec3]) {
        self.aabb = Aabb::of_vertices(positions.iter().copied());

        if positions.is_empty() {
            self.area = 0.0;
            self.centroid = DVec3::ZERO;
            return;
        }

        let n = positions.len();
        let average = positions.iter().copied().sum::<DVec3>() / n as f64;

        let mut newell = DVec3::ZERO;
        for i in 0..n {
            let a = positions[i] - average;
            let b = positions[(i + 1) % n] - average;
            newell += a.cross(b);
        }

        let Some(normal) = newell.try_normalize() else {
            self.area = 0.0;
            self.centroid = average;

            if let Some(dir) = (positions[n - 1] - positions[0]).try_normalize() {
                if self.normal.dot(dir).abs() > 1.0e-9 || !self.normal.is_normalized() {
                    self.normal = dir.any_orthonormal_vector();
                }
            }

            return;
        };

        // Area-weighted centroid of the fan around the vertex average.
        let mut weighted = DVec3::ZERO;
        let mut total = 0.0;
        for i in 0..n {
            let a = positions[i] - average;
            let b = positions[(i + 1) % n] - average;
            let w = a.cross(b).dot(normal);
            weighted += w * (a + b) / 3.0;
            total += w;
        }

        self.normal = normal;
        self.area = 0.5 * newell.length();
        self.centroid = if total != 0.0 {
            average + weighted / total
        } else {
            average
        };
    }
}

/// A face of a polytope, borrowed from its owner.
///
/// Faces are convex planar polygons; a polytope with fewer than three vertices also uses a single
/// face with one (point) or two (segment) half-edges.
#[derive(Copy, Clone, Debug)]
pub struct Face<'p> {
    polytope: &'p ConvexPolytope,
    key: FaceKey,
}

impl<'p> PartialEq for Face<'p> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.polytope, other.polytope) && self.key == other.key
    }
}

impl<'p> Eq for Face<'p> {}

impl<'p> Face<'p> {
    #[inline]
    pub(crate) fn new(polytope: &'p ConvexPolytope, key: FaceKey) -> Face<'p> {
        Face { polytope, key }
    }

    #[inline]
    fn data(&self) -> &'p FaceData {
        &self.polytope.faces[self.key]
    }

    #[inline]
    pub fn key(&self) -> FaceKey {
        self.key
    }

    /// The outward unit normal.
    #[inline]
    pub fn normal(&self) -> DVec3 {
        self.data().normal
    }

    #[inline]
    pub fn centroid(&self) -> DVec3 {
        self.data().centroid
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.data().area
    }

    #[inline]
    pub fn aabb(&self) -> Aabb {
        self.data().aabb
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.data().edges.len()
    }

    /// Returns the `index`th half-edge of the loop, wrapping around.
    #[inline]
    pub fn edge(&self, index: usize) -> HalfEdge<'p> {
        let edges = &self.data().edges;
        HalfEdge::new(self.polytope, edges[index % edges.len()])
    }

    pub fn edges(&self) -> impl Iterator<Item = HalfEdge<'p>> + 'p {
        let polytope = self.polytope;
        self.data()
            .edges
            .iter()
            .map(move |&key| HalfEdge::new(polytope, key))
    }

    /// Iterates over the vertices of the loop, starting from the first edge's origin.
    pub fn vertices(&self) -> impl Iterator<Item = Vertex<'p>> + 'p {
        self.edges().map(|edge| edge.origin())
    }

    pub(crate) fn positions(&self) -> SmallVec<[DVec3; 8]> {
        self.vertices().map(|v| v.position()).collect()
    }

    /// The plane through the centroid with the face normal.
    pub fn plane(&self) -> Option<Plane> {
        Plane::from_point_normal(self.centroid(), self.normal())
    }

    /// Signed distance from the face's supporting plane to `point`, positive on the outer side.
    #[inline]
    pub fn signed_distance_to_plane(&self, point: DVec3) -> f64 {
        self.normal().dot(point - self.centroid())
    }

    /// Returns `true` if `point` is more than `epsilon` above the face's supporting plane.
    #[inline]
    pub fn can_observer_see_face(&self, point: DVec3, epsilon: f64) -> bool {
        self.signed_distance_to_plane(point) > epsilon
    }

    /// Returns `true` if `point` lies more than `epsilon` outside the edge, measured in the plane
    /// perpendicular to the face containing the edge.
    pub fn can_observer_see_edge(&self, point: DVec3, edge_index: usize, epsilon: f64) -> bool {
        let edge = self.edge(edge_index);
        let origin = edge.origin().position();
        let outward = edge.direction(false).cross(self.normal());

        match outward.try_normalize() {
            Some(outward) => (point - origin).dot(outward) > epsilon,
            None => false,
        }
    }

    /// Finds the contiguous run of edges visible from `point`.
    ///
    /// Returns the indices of the first and last visible edge, in loop order, or `None` if no edge
    /// is visible, i.e. the point projects inside the face.
    pub fn line_of_sight(&self, point: DVec3, epsilon: f64) -> Option<(usize, usize)> {
        let n = self.num_edges();
        let visible: SmallVec<[bool; 8]> = (0..n)
            .map(|i| self.can_observer_see_edge(point, i, epsilon))
            .collect();

        if !visible.iter().any(|&v| v) {
            return None;
        }

        if visible.iter().all(|&v| v) {
            return Some((0, n - 1));
        }

        let start = (0..n).find(|&i| visible[i] && !visible[(i + n - 1) % n])?;
        let mut end = start;
        while visible[(end + 1) % n] {
            end = (end + 1) % n;
        }

        Some((start, end))
    }

    /// Returns `true` if the projection of `point` onto the face's plane lies inside the face.
    #[inline]
    pub fn is_point_directly_above_or_below(&self, point: DVec3) -> bool {
        self.num_edges() > 2 && self.line_of_sight(point, 0.0).is_none()
    }

    /// Returns the half-edge closest to `point`; ties go to the lowest loop index.
    pub fn closest_edge(&self, point: DVec3) -> Option<HalfEdge<'p>> {
        let mut best: Option<(HalfEdge<'p>, f64)> = None;

        for edge in self.edges() {
            let d = edge.distance(point);
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((edge, d));
            }
        }

        best.map(|(edge, _)| edge)
    }

    /// Returns the closest of the edges visible from `point`.
    pub fn closest_visible_edge(&self, point: DVec3) -> Option<HalfEdge<'p>> {
        let mut best: Option<(HalfEdge<'p>, f64)> = None;

        for (i, edge) in self.edges().enumerate() {
            if !self.can_observer_see_edge(point, i, 0.0) {
                continue;
            }

            let d = edge.distance(point);
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((edge, d));
            }
        }

        best.map(|(edge, _)| edge)
    }

    /// Returns the point of the face closest to `point`.
    pub fn orthogonal_projection(&self, point: DVec3) -> DVec3 {
        match self.num_edges() {
            1 => self.edge(0).origin().position(),
            2 => self.edge(0).closest_point(point),
            _ => {
                if self.is_point_directly_above_or_below(point) {
                    point - self.signed_distance_to_plane(point) * self.normal()
                } else {
                    self.closest_edge(point)
                        .map(|edge| edge.closest_point(point))
                        .unwrap_or(self.centroid())
                }
            }
        }
    }

    /// Returns the distance from `point` to the face.
    pub fn distance(&self, point: DVec3) -> f64 {
        match self.num_edges() {
            1 => self.edge(0).origin().position().distance(point),
            2 => self.edge(0).distance(point),
            _ => {
                if self.is_point_directly_above_or_below(point) {
                    self.signed_distance_to_plane(point).abs()
                } else {
                    self.edges()
                        .map(|edge| edge.distance(point))
                        .fold(f64::INFINITY, f64::min)
                }
            }
        }
    }

    /// Returns the vertex that maximizes its dot product with `direction`.
    ///
    /// Ties go to the vertex that comes first in the loop.
    pub fn supporting_vertex(&self, direction: DVec3) -> Vertex<'p> {
        let mut vertices = self.vertices();
        // Loops are never empty.
        let mut best = vertices.next().unwrap_or_else(|| self.edge(0).origin());
        let mut best_dot = best.position().dot(direction);

        for v in vertices {
            let d = v.position().dot(direction);
            if d > best_dot {
                best = v;
                best_dot = d;
            }
        }

        best
    }

    /// Expresses the point of the face closest to `point` as a convex combination of the face's
    /// vertices, in loop order.
    pub fn barycentric_coordinates(&self, point: DVec3) -> SmallVec<[f64; 8]> {
        let positions = self.positions();
        let q = self.orthogonal_projection(point);
        polygon_barycentric(&positions, q)
    }
}

// Barycentric coordinates of `q` with respect to a convex polygon, using the triangle fan around
// the first vertex. `q` is expected to lie on the polygon.
pub(crate) fn polygon_barycentric(positions: &[DVec3], q: DVec3) -> SmallVec<[f64; 8]> {
    let n = positions.len();
    let mut coords: SmallVec<[f64; 8]> = smallvec::smallvec![0.0; n];

    match n {
        0 => {}
        1 => coords[0] = 1.0,
        2 => {
            let t = Segment::new(positions[0], positions[1])
                .closest_point_to_point(q)
                .t
                .clamp(0.0, 1.0);
            coords[0] = 1.0 - t;
            coords[1] = t;
        }
        _ => {
            // Pick the fan triangle whose smallest coordinate is largest; for a point on the
            // polygon that triangle contains it.
            let mut best = (f64::NEG_INFINITY, 1, [1.0, 0.0, 0.0]);

            for i in 1..n - 1 {
                let Some(bary) = triangle_barycentric(positions[0], positions[i], positions[i + 1], q)
                else {
                    continue;
                };

                let min = bary[0].min(bary[1]).min(bary[2]);
                if min > best.0 {
                    best = (min, i, bary);
                }
            }

            let (_, i, bary) = best;
            let clamped = [bary[0].max(0.0), bary[1].max(0.0), bary[2].max(0.0)];
            let sum: f64 = clamped.iter().sum();
            let scale = if sum > 0.0 { sum.recip() } else { 0.0 };

            if scale == 0.0 {
                coords[0] = 1.0;
            } else {
                coords[0] = clamped[0] * scale;
                coords[i] = clamped[1] * scale;
                coords[i + 1] = clamped[2] * scale;
            }
        }
    }

    coords
}

// Returns `None` for a degenerate triangle.
fn triangle_barycentric(a: DVec3, b: DVec3, c: DVec3, q: DVec3) -> Option<[f64; 3]> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = q - a;

    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= f64::EPSILON * d00 * d11 {
        return None;
    }

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;

    Some([1.0 - v - w, v, w])
}
