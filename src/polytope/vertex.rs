use std::ptr;

use glam::DVec3;
use slotmap::new_key_type;
use smallvec::SmallVec;

use super::{half_edge::EdgeKey, ConvexPolytope, HalfEdge};

new_key_type! {
    /// Stable handle to a vertex of a [`ConvexPolytope`].
    pub struct VertexKey;
}

#[derive(Clone, Debug)]
pub(crate) struct VertexData {
    pub(crate) position: DVec3,
    // Outgoing half-edges, in the order they were attached.
    pub(crate) edges: SmallVec<[EdgeKey; 6]>,
}

impl VertexData {
    pub(crate) fn new(position: DVec3) -> VertexData {
        VertexData {
            position,
            edges: SmallVec::new(),
        }
    }

    #[inline]
    pub(crate) fn attach(&mut self, edge: EdgeKey) {
        debug_assert!(!self.edges.contains(&edge));
        self.edges.push(edge);
    }

    #[inline]
    pub(crate) fn detach(&mut self, edge: EdgeKey) {
        self.edges.retain(|e| *e != edge);
    }
}

/// A vertex of a polytope, borrowed from its owner.
#[derive(Copy, Clone, Debug)]
pub struct Vertex<'p> {
    polytope: &'p ConvexPolytope,
    key: VertexKey,
}

impl<'p> PartialEq for Vertex<'p> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.polytope, other.polytope) && self.key == other.key
    }
}

impl<'p> Eq for Vertex<'p> {}

impl<'p> Vertex<'p> {
    #[inline]
    pub(crate) fn new(polytope: &'p ConvexPolytope, key: VertexKey) -> Vertex<'p> {
        Vertex { polytope, key }
    }

    #[inline]
    fn data(&self) -> &'p VertexData {
        &self.polytope.vertices[self.key]
    }

    #[inline]
    pub fn key(&self) -> VertexKey {
        self.key
    }

    #[inline]
    pub fn position(&self) -> DVec3 {
        self.data().position
    }

    /// Returns the number of half-edges leaving this vertex.
    #[inline]
    pub fn degree(&self) -> usize {
        self.data().edges.len()
    }

    /// Iterates over the half-edges that originate at this vertex, in attachment order.
    pub fn outgoing_edges(&self) -> impl Iterator<Item = HalfEdge<'p>> + 'p {
        let polytope = self.polytope;
        self.data()
            .edges
            .iter()
            .map(move |&key| HalfEdge::new(polytope, key))
    }

    /// Iterates over the vertices reachable through one outgoing half-edge.
    pub fn neighbors(&self) -> impl Iterator<Item = Vertex<'p>> + 'p {
        self.outgoing_edges().map(|edge| edge.destination())
    }

    /// Returns the half-edge going from this vertex to `destination`, if there is one.
    pub fn associated_edge_to(&self, destination: VertexKey) -> Option<HalfEdge<'p>> {
        self.outgoing_edges()
            .find(|edge| edge.destination().key() == destination)
    }

    /// Returns `true` if an edge connects this vertex and `other`, in either direction.
    pub fn is_edge_in_between(&self, other: VertexKey) -> bool {
        if !self.polytope.vertices.contains_key(other) {
            return false;
        }

        self.associated_edge_to(other).is_some()
            || Vertex::new(self.polytope, other)
                .associated_edge_to(self.key)
                .is_some()
    }
}
