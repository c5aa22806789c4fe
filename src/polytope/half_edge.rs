use std::ptr;

use glam::DVec3;
use slotmap::new_key_type;

use super::{face::FaceKey, vertex::VertexKey, ConvexPolytope, Face, Vertex};
use crate::Segment;

new_key_type! {
    /// Stable handle to a half-edge of a [`ConvexPolytope`].
    pub struct EdgeKey;
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct EdgeData {
    pub(crate) origin: VertexKey,
    pub(crate) destination: VertexKey,
    /// The face whose boundary loop contains this half-edge.
    pub(crate) face: FaceKey,
    /// The opposite half-edge on the adjacent face.
    ///
    /// `None` only on the boundary of a point, segment or single-polygon polytope.
    pub(crate) twin: Option<EdgeKey>,
    pub(crate) next: EdgeKey,
    pub(crate) prev: EdgeKey,
}

/// A directed edge of a polytope, borrowed from its owner.
#[derive(Copy, Clone, Debug)]
pub struct HalfEdge<'p> {
    polytope: &'p ConvexPolytope,
    key: EdgeKey,
}

impl<'p> PartialEq for HalfEdge<'p> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.polytope, other.polytope) && self.key == other.key
    }
}

impl<'p> Eq for HalfEdge<'p> {}

impl<'p> HalfEdge<'p> {
    #[inline]
    pub(crate) fn new(polytope: &'p ConvexPolytope, key: EdgeKey) -> HalfEdge<'p> {
        HalfEdge { polytope, key }
    }

    #[inline]
    fn data(&self) -> &'p EdgeData {
        &self.polytope.edges[self.key]
    }

    #[inline]
    pub fn key(&self) -> EdgeKey {
        self.key
    }

    #[inline]
    pub fn origin(&self) -> Vertex<'p> {
        Vertex::new(self.polytope, self.data().origin)
    }

    #[inline]
    pub fn destination(&self) -> Vertex<'p> {
        Vertex::new(self.polytope, self.data().destination)
    }

    #[inline]
    pub fn face(&self) -> Face<'p> {
        Face::new(self.polytope, self.data().face)
    }

    #[inline]
    pub fn twin(&self) -> Option<HalfEdge<'p>> {
        self.data()
            .twin
            .map(|key| HalfEdge::new(self.polytope, key))
    }

    /// Returns the next half-edge, walking the face loop counter-clockwise.
    #[inline]
    pub fn next(&self) -> HalfEdge<'p> {
        HalfEdge::new(self.polytope, self.data().next)
    }

    #[inline]
    pub fn prev(&self) -> HalfEdge<'p> {
        HalfEdge::new(self.polytope, self.data().prev)
    }

    #[inline]
    pub fn segment(&self) -> Segment {
        Segment::new(self.origin().position(), self.destination().position())
    }

    /// Returns `destination - origin`, normalized if `normalize` is set.
    ///
    /// A zero-length edge normalizes to the zero vector.
    pub fn direction(&self, normalize: bool) -> DVec3 {
        let dir = self.segment().direction();

        if normalize {
            dir.normalize_or_zero()
        } else {
            dir
        }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.segment().length()
    }

    /// Returns the point at `t` along the edge.
    ///
    /// `t = 0` is the origin and `t = 1` the destination; values outside [0, 1] extrapolate along
    /// the supporting line.
    #[inline]
    pub fn point_at(&self, t: f64) -> DVec3 {
        self.segment().at(t)
    }

    /// Returns the point on the edge closest to `point`.
    #[inline]
    pub fn closest_point(&self, point: DVec3) -> DVec3 {
        self.segment().closest_point_to_point(point).point
    }

    /// Returns the distance from `point` to the edge.
    #[inline]
    pub fn distance(&self, point: DVec3) -> f64 {
        self.segment().distance_to_point(point)
    }
}
