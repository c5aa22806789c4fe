//! Convex polytopes stored as half-edge meshes.
//!
//! A [`ConvexPolytope`] owns its vertices, half-edges and faces in arenas keyed by stable handles
//! ([`VertexKey`], [`EdgeKey`], [`FaceKey`]). The views [`Vertex`], [`HalfEdge`] and [`Face`]
//! borrow the polytope and resolve those handles on demand.
//!
//! Besides full-dimensional solids, a polytope can be empty or take one of three flat forms, each
//! represented by a single face:
//! - a point: one half-edge from the vertex to itself,
//! - a segment: two opposite half-edges,
//! - a convex polygon.
//!
//! Twins are only present on solids.

use std::f64::consts::TAU;

use glam::DVec3;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::{Aabb, Error, Isometry};

mod build;
#[cfg(test)]
mod datasets;
mod face;
mod half_edge;
mod validate;
mod vertex;

pub use face::{Face, FaceKey};
pub use half_edge::{EdgeKey, HalfEdge};
pub use vertex::{Vertex, VertexKey};

use face::FaceData;
use half_edge::EdgeData;
use vertex::VertexData;

pub(crate) use face::polygon_barycentric;

/// The result of testing a single point against a polytope.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointCollision {
    /// `true` if the point lies strictly outside the polytope.
    pub outside: bool,
    /// The nearest point on the boundary.
    pub closest_point: DVec3,
    /// The outward normal of the boundary at `closest_point`.
    pub normal: DVec3,
}

/// A convex polytope grown by incremental point insertion.
#[derive(Clone, Debug)]
pub struct ConvexPolytope {
    vertices: SlotMap<VertexKey, VertexData>,
    edges: SlotMap<EdgeKey, EdgeData>,
    faces: SlotMap<FaceKey, FaceData>,
    // Surviving vertices in insertion order.
    vertex_order: Vec<VertexKey>,
    // Surviving faces in creation order.
    face_order: Vec<FaceKey>,
    epsilon: f64,
    centroid: DVec3,
    volume: f64,
    aabb: Aabb,
}

impl Default for ConvexPolytope {
    fn default() -> Self {
        ConvexPolytope::new()
    }
}

impl ConvexPolytope {
    /// The default construction epsilon.
    pub const DEFAULT_EPSILON: f64 = 1.0e-10;

    /// Constructs an empty polytope with the default construction epsilon.
    pub fn new() -> ConvexPolytope {
        ConvexPolytope::with_epsilon(Self::DEFAULT_EPSILON)
    }

    /// Constructs an empty polytope with the given construction epsilon.
    ///
    /// The epsilon is an absolute distance. Points within it of a face plane count as lying on
    /// that plane, and points within it of a vertex or line count as coincident or collinear.
    pub fn with_epsilon(epsilon: f64) -> ConvexPolytope {
        ConvexPolytope {
            vertices: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            faces: SlotMap::with_key(),
            vertex_order: Vec::new(),
            face_order: Vec::new(),
            epsilon: epsilon.abs(),
            centroid: DVec3::ZERO,
            volume: 0.0,
            aabb: Aabb::EMPTY,
        }
    }

    /// Constructs the convex hull of `points`, inserting them in order.
    pub fn from_points<I>(points: I, epsilon: f64) -> Result<ConvexPolytope, Error>
    where
        I: IntoIterator<Item = DVec3>,
    {
        let mut polytope = ConvexPolytope::with_epsilon(epsilon);
        polytope.add_vertices(points)?;
        Ok(polytope)
    }

    /// Constructs a tetrahedron, or one of its flat degenerations if the points are coplanar.
    pub fn tetrahedron(points: [DVec3; 4]) -> Result<ConvexPolytope, Error> {
        ConvexPolytope::from_points(points, Self::DEFAULT_EPSILON)
    }

    /// Constructs an axis-aligned cube centered on the origin.
    pub fn cube(half_extent: f64) -> Result<ConvexPolytope, Error> {
        let h = half_extent;
        let sign = |bit: bool| if bit { h } else { -h };

        let corners = (0..8).map(|i| DVec3::new(sign(i & 1 != 0), sign(i & 2 != 0), sign(i & 4 != 0)));

        ConvexPolytope::from_points(corners, Self::DEFAULT_EPSILON)
    }

    /// Constructs a regular icosahedron centered on the origin with its vertices at `radius`.
    pub fn icosahedron(radius: f64) -> Result<ConvexPolytope, Error> {
        ConvexPolytope::from_points(icosahedron_vertices(radius), Self::DEFAULT_EPSILON)
    }

    /// Constructs a cone with its base circle in the XY plane and its apex at `height` along Z.
    ///
    /// The base is a regular polygon with `divisions` vertices.
    pub fn cone(radius: f64, height: f64, divisions: usize) -> Result<ConvexPolytope, Error> {
        let base = circle(radius, 0.0, divisions);
        let apex = DVec3::new(0.0, 0.0, height);

        ConvexPolytope::from_points(base.chain([apex]), Self::DEFAULT_EPSILON)
    }

    /// Constructs a cylinder centered on the origin with its axis along Z.
    ///
    /// Both caps are regular polygons with `divisions` vertices.
    pub fn cylinder(radius: f64, height: f64, divisions: usize) -> Result<ConvexPolytope, Error> {
        let half = 0.5 * height;
        let bottom = circle(radius, -half, divisions);
        let top = circle(radius, half, divisions);

        ConvexPolytope::from_points(bottom.chain(top), Self::DEFAULT_EPSILON)
    }

    #[inline]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Returns `true` if the polytope encloses a volume, i.e. it is not empty, a point, a segment
    /// or a single polygon.
    #[inline]
    pub fn is_full_dimensional(&self) -> bool {
        self.faces.len() > 1
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn num_half_edges(&self) -> usize {
        self.edges.len()
    }

    /// Returns the number of undirected edges.
    ///
    /// A point has no edges and a segment has one, even though they are stored as one and two
    /// half-edges respectively.
    pub fn num_edges(&self) -> usize {
        match self.vertices.len() {
            0 | 1 => 0,
            2 => 1,
            _ => {
                let paired = self.edges.values().filter(|e| e.twin.is_some()).count();
                paired / 2 + (self.edges.len() - paired)
            }
        }
    }

    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// The center of mass of the enclosed volume.
    ///
    /// Flat polytopes report the centroid of their single face.
    #[inline]
    pub fn centroid(&self) -> DVec3 {
        self.centroid
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    #[inline]
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// Iterates over the vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = Vertex<'_>> + '_ {
        self.vertex_order.iter().map(move |&key| Vertex::new(self, key))
    }

    /// Iterates over the faces in creation order.
    pub fn faces(&self) -> impl Iterator<Item = Face<'_>> + '_ {
        self.face_order.iter().map(move |&key| Face::new(self, key))
    }

    /// Iterates over every half-edge, face by face.
    pub fn half_edges(&self) -> impl Iterator<Item = HalfEdge<'_>> + '_ {
        self.faces().flat_map(|face| face.edges())
    }

    pub fn vertex(&self, key: VertexKey) -> Option<Vertex<'_>> {
        self.vertices
            .contains_key(key)
            .then(|| Vertex::new(self, key))
    }

    pub fn face(&self, key: FaceKey) -> Option<Face<'_>> {
        self.faces.contains_key(key).then(|| Face::new(self, key))
    }

    pub fn edge(&self, key: EdgeKey) -> Option<HalfEdge<'_>> {
        self.edges
            .contains_key(key)
            .then(|| HalfEdge::new(self, key))
    }

    /// Returns `true` if `point` lies inside the polytope or within `epsilon` of its boundary.
    ///
    /// For flat polytopes this tests whether `point` is within `epsilon` of the shape.
    pub fn is_point_inside(&self, point: DVec3, epsilon: f64) -> bool {
        if self.is_empty() {
            return false;
        }

        if !self.is_full_dimensional() {
            return self.distance(point) <= epsilon;
        }

        if !self.aabb.contains_point_within(point, epsilon) {
            return false;
        }

        self.faces()
            .all(|face| face.signed_distance_to_plane(point) <= epsilon)
    }

    /// Returns the largest signed distance from any face plane to `point`.
    ///
    /// The result is negative inside the polytope and positive outside; it can underestimate the
    /// true Euclidean distance of an outside point near an edge or vertex. Flat polytopes report
    /// the unsigned distance to their face, and an empty polytope reports infinity.
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        if !self.is_full_dimensional() {
            return self
                .faces()
                .next()
                .map_or(f64::INFINITY, |face| face.distance(point));
        }

        self.faces()
            .map(|face| face.signed_distance_to_plane(point))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Returns the Euclidean distance from `point` to the polytope, zero inside.
    pub fn distance(&self, point: DVec3) -> f64 {
        if self.is_full_dimensional() && self.signed_distance(point) <= 0.0 {
            return 0.0;
        }

        self.faces()
            .map(|face| face.distance(point))
            .fold(f64::INFINITY, f64::min)
    }

    /// Returns the face closest to `point`.
    ///
    /// Outside a solid, this is the face whose plane is farthest below the point. Inside, it is
    /// the face at the smallest distance. Ties go to the earliest face.
    pub fn closest_face(&self, point: DVec3) -> Option<Face<'_>> {
        if self.is_full_dimensional() && self.signed_distance(point) > 0.0 {
            self.best_face(|face| face.signed_distance_to_plane(point))
        } else {
            self.nearest_face(point)
        }
    }

    // The face at the smallest Euclidean distance from `point`.
    fn nearest_face(&self, point: DVec3) -> Option<Face<'_>> {
        self.best_face(|face| -face.distance(point))
    }

    // Maximizes `score`, keeping the first face among equals.
    fn best_face<'p, F>(&'p self, score: F) -> Option<Face<'p>>
    where
        F: Fn(&Face<'p>) -> f64,
    {
        let mut best: Option<(Face<'p>, f64)> = None;

        for face in self.faces() {
            let s = score(&face);
            if best.map_or(true, |(_, best_s)| s > best_s) {
                best = Some((face, s));
            }
        }

        best.map(|(face, _)| face)
    }

    /// Returns the point on the boundary nearest to `point`.
    pub fn closest_point(&self, point: DVec3) -> Option<DVec3> {
        self.nearest_face(point)
            .map(|face| face.orthogonal_projection(point))
    }

    /// Projects `point` onto the polytope.
    ///
    /// Returns `None` if the polytope is empty or already contains `point`.
    pub fn orthogonal_projection(&self, point: DVec3) -> Option<DVec3> {
        if self.is_point_inside(point, 0.0) {
            return None;
        }

        self.closest_point(point)
    }

    /// Locates `point` relative to the boundary.
    ///
    /// The closest point and outward normal are reported even when `point` is inside. Returns
    /// `None` only for an empty polytope.
    pub fn evaluate_point_collision(&self, point: DVec3) -> Option<PointCollision> {
        let face = self.nearest_face(point)?;
        let closest_point = face.orthogonal_projection(point);

        if !self.is_full_dimensional() {
            let outside = closest_point != point;
            let normal = (point - closest_point)
                .try_normalize()
                .unwrap_or(face.normal());

            return Some(PointCollision {
                outside,
                closest_point,
                normal,
            });
        }

        let outside = self.signed_distance(point) > 0.0;
        let normal = if !outside || face.is_point_directly_above_or_below(point) {
            face.normal()
        } else {
            (point - closest_point)
                .try_normalize()
                .unwrap_or(face.normal())
        };

        Some(PointCollision {
            outside,
            closest_point,
            normal,
        })
    }

    /// Returns the vertex farthest along `direction`, or `None` if the polytope is empty.
    pub fn supporting_vertex(&self, direction: DVec3) -> Option<Vertex<'_>> {
        self.supporting_vertex_key(direction)
            .map(|key| Vertex::new(self, key))
    }

    /// Returns the key of the vertex farthest along `direction`.
    ///
    /// Solids are searched by hill climbing along edges, which is exact on a convex mesh.
    pub fn supporting_vertex_key(&self, direction: DVec3) -> Option<VertexKey> {
        let &start = self.vertex_order.first()?;

        if !self.is_full_dimensional() {
            return self
                .faces()
                .next()
                .map(|face| face.supporting_vertex(direction).key());
        }

        let mut current = start;
        let mut best = self.vertices[current].position.dot(direction);

        'climb: loop {
            for &e in &self.vertices[current].edges {
                let neighbor = self.edges[e].destination;
                let d = self.vertices[neighbor].position.dot(direction);

                if d > best {
                    current = neighbor;
                    best = d;
                    continue 'climb;
                }
            }

            break;
        }

        Some(current)
    }

    /// Moves every vertex by `isometry`.
    pub fn apply_transform(&mut self, isometry: &Isometry) -> Result<(), Error> {
        if !isometry.is_finite() {
            return Err(Error::InvalidData);
        }

        for vertex in self.vertices.values_mut() {
            vertex.position = *isometry * vertex.position;
        }

        self.update_geometry();
        Ok(())
    }

    /// Moves every vertex by the inverse of `isometry`.
    pub fn apply_inverse_transform(&mut self, isometry: &Isometry) -> Result<(), Error> {
        if !isometry.is_finite() {
            return Err(Error::InvalidData);
        }

        self.apply_transform(&isometry.inverse())
    }

    /// Makes this polytope a deep copy of `other`, including its epsilon.
    pub fn set(&mut self, other: &ConvexPolytope) {
        self.clone_from(other);
    }

    /// Removes every vertex, edge and face. The epsilon is kept.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.faces.clear();
        self.vertex_order.clear();
        self.face_order.clear();
        self.centroid = DVec3::ZERO;
        self.volume = 0.0;
        self.aabb = Aabb::EMPTY;
    }

    // Refreshes every cached quantity from the vertex positions.
    fn update_geometry(&mut self) {
        let faces: SmallVec<[FaceKey; 16]> = self.face_order.iter().copied().collect();
        for face in faces {
            self.update_face_geometry(face);
        }

        self.aabb = Aabb::of_vertices(self.vertices.values().map(|v| v.position));

        let (volume, centroid) = self.compute_mass_properties();
        self.volume = volume;
        self.centroid = centroid;
    }

    // Sums the signed tetrahedra spanned by an interior reference point and each face's triangle
    // fan.
    fn compute_mass_properties(&self) -> (f64, DVec3) {
        match self.face_order.len() {
            0 => (0.0, DVec3::ZERO),
            1 => (0.0, self.faces[self.face_order[0]].centroid),
            _ => {
                let reference = self.vertices.values().map(|v| v.position).sum::<DVec3>()
                    / self.vertices.len() as f64;

                let mut six_volume = 0.0;
                let mut weighted = DVec3::ZERO;

                for face in self.faces() {
                    let positions = face.positions();

                    for i in 1..positions.len() - 1 {
                        let a = positions[0] - reference;
                        let b = positions[i] - reference;
                        let c = positions[i + 1] - reference;

                        let v = a.dot(b.cross(c));
                        six_volume += v;
                        weighted += v * (a + b + c) / 4.0;
                    }
                }

                if six_volume > 0.0 {
                    (six_volume / 6.0, reference + weighted / six_volume)
                } else {
                    (0.0, reference)
                }
            }
        }
    }
}

fn circle(radius: f64, z: f64, divisions: usize) -> impl Iterator<Item = DVec3> {
    (0..divisions).map(move |i| {
        let angle = TAU * i as f64 / divisions as f64;
        DVec3::new(radius * angle.cos(), radius * angle.sin(), z)
    })
}

fn icosahedron_vertices(radius: f64) -> Vec<DVec3> {
    let phi = 0.5 * (1.0 + 5.0_f64.sqrt());
    let scale = radius / (1.0 + phi * phi).sqrt();

    let mut points = Vec::with_capacity(12);
    for s in [-1.0, 1.0] {
        for t in [-1.0, 1.0] {
            points.push(DVec3::new(0.0, s, t * phi) * scale);
            points.push(DVec3::new(s, t * phi, 0.0) * scale);
            points.push(DVec3::new(t * phi, 0.0, s) * scale);
        }
    }

    points
}
