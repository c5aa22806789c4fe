use std::mem;

use glam::DVec3;

/// The outcome of a collision query between two shapes, A and B.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionResult {
    pub are_shapes_colliding: bool,
    /// The separation between the shapes, or the penetration depth if they collide.
    pub distance: f64,
    /// The witness point on A.
    ///
    /// For disjoint shapes this is the point of A closest to B.
    pub point_on_a: DVec3,
    /// The witness point on B.
    pub point_on_b: DVec3,
    /// The unit normal at A's witness point, pointing towards B.
    ///
    /// Zero if a colliding pair was not resolved into a penetration axis.
    pub normal_on_a: DVec3,
    /// The unit normal at B's witness point, pointing towards A.
    pub normal_on_b: DVec3,
}

impl CollisionResult {
    /// Exchanges the roles of A and B.
    pub fn swap_shapes(&mut self) {
        mem::swap(&mut self.point_on_a, &mut self.point_on_b);
        mem::swap(&mut self.normal_on_a, &mut self.normal_on_b);
    }

    /// Returns the result with the roles of A and B exchanged.
    #[inline]
    pub fn swapped(mut self) -> CollisionResult {
        self.swap_shapes();
        self
    }

    /// Returns the separation between the shapes, negative when they overlap.
    #[inline]
    pub fn signed_distance(&self) -> f64 {
        if self.are_shapes_colliding {
            -self.distance
        } else {
            self.distance
        }
    }
}

/// How an iterative query stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The tolerance was met.
    Converged,
    /// The iteration cap was reached first; the result is a best effort.
    MaxIterations,
}
