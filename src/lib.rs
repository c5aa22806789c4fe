//! Incremental convex hulls and GJK/EPA narrow-phase collision queries in 3D.

use std::{cmp::Ordering, ops::Mul};

use glam::{DQuat, DVec3};

mod aabb;
pub mod collision;
pub mod epa;
mod error;
pub mod gjk;
pub mod polytope;
pub mod simplex;
pub mod support;

#[doc(inline)]
pub use aabb::Aabb;
#[doc(inline)]
pub use collision::{CollisionResult, Termination};
#[doc(inline)]
pub use epa::{EpaDetector, HybridDetector};
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use gjk::GjkDetector;
#[doc(inline)]
pub use polytope::ConvexPolytope;
#[doc(inline)]
pub use support::SupportingVertex;

/// An isometry, or rigid transformation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Isometry {
    pub rotation: DQuat,
    pub translation: DVec3,
}

impl Default for Isometry {
    fn default() -> Self {
        Isometry::IDENTITY
    }
}

impl Isometry {
    pub const IDENTITY: Self = Isometry {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
    };

    pub fn new(rotation: DQuat, translation: DVec3) -> Isometry {
        Isometry {
            rotation,
            translation,
        }
    }

    pub fn from_translation(v: DVec3) -> Isometry {
        Isometry {
            translation: v,
            ..Default::default()
        }
    }

    #[inline]
    pub fn inverse(self) -> Isometry {
        let rotation = self.rotation.inverse();

        Isometry {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    /// Returns `true` if every component of the rotation and translation is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.rotation.is_finite() && self.translation.is_finite()
    }

    /// Applies the inverse rotation to `dir`.
    #[inline]
    pub fn inverse_transform_vector(&self, dir: DVec3) -> DVec3 {
        self.rotation.inverse() * dir
    }
}

impl Mul<Isometry> for Isometry {
    type Output = Isometry;

    fn mul(self, rhs: Isometry) -> Self::Output {
        Isometry {
            rotation: self.rotation * rhs.rotation,
            translation: self.rotation * rhs.translation + self.translation,
        }
    }
}

impl Mul<DVec3> for Isometry {
    type Output = DVec3;

    #[inline]
    fn mul(self, rhs: DVec3) -> Self::Output {
        self.rotation * rhs + self.translation
    }
}

/// A line segment between two points.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Segment {
    pub a: DVec3,
    pub b: DVec3,
}

/// The closest point on a given segment to some other primitive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SegmentClosest {
    /// The closest point on the segment to the other primitive.
    pub point: DVec3,

    /// The parameter value obtained by projecting the other primitive onto the segment's
    /// supporting line.
    ///
    /// The closest point on the segment is obtained by clamping this parameter value to the range
    /// [0, 1].
    pub t: f64,
}

impl Segment {
    pub fn new(a: DVec3, b: DVec3) -> Segment {
        Segment { a, b }
    }

    #[inline]
    pub fn direction(&self) -> DVec3 {
        self.b - self.a
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.a.distance(self.b)
    }

    /// Returns the point at parameter `t` on the supporting line.
    ///
    /// `t = 0` is `a`, `t = 1` is `b`. Values outside [0, 1] extrapolate past the endpoints.
    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.a + t * (self.b - self.a)
    }

    /// Finds the point on the segment closest to `c`.
    pub fn closest_point_to_point(&self, c: DVec3) -> SegmentClosest {
        let ab = self.b - self.a;
        let denom = ab.length_squared();

        // Segment degenerates to a point.
        if denom <= f64::EPSILON * f64::EPSILON {
            return SegmentClosest {
                point: self.a,
                t: 0.0,
            };
        }

        let t = (c - self.a).dot(ab) / denom;
        let t_clamp = t.clamp(0.0, 1.0);

        SegmentClosest {
            point: self.a + t_clamp * ab,
            t,
        }
    }

    /// Returns the distance from `c` to the closest point on the segment.
    #[inline]
    pub fn distance_to_point(&self, c: DVec3) -> f64 {
        self.closest_point_to_point(c).point.distance(c)
    }

    /// Returns the distance from `c` to the segment's supporting line.
    pub fn distance_to_line(&self, c: DVec3) -> f64 {
        let ab = self.b - self.a;
        match ab.try_normalize() {
            Some(dir) => {
                let ac = c - self.a;
                (ac - ac.dot(dir) * dir).length()
            }
            None => c.distance(self.a),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    // Unit vector normal to the plane.
    normal: DVec3,
    // Distance from the origin to its projection on the plane.
    dist: f64,
}

impl Plane {
    /// Constructs a plane given a plane normal and the magnitude of the projected origin.
    pub fn new(normal: DVec3, dist: f64) -> Option<Plane> {
        if !dist.is_finite() || !normal.is_normalized() {
            return None;
        }

        Some(Plane {
            normal: normal.try_normalize()?,
            dist,
        })
    }

    /// Constructs a plane given a point on the plane and the plane normal.
    pub fn from_point_normal(point: DVec3, normal: DVec3) -> Option<Plane> {
        if !point.is_finite() || !normal.is_normalized() {
            return None;
        }

        Plane::new(normal, point.dot(normal))
    }

    #[inline]
    pub fn normal(&self) -> DVec3 {
        self.normal
    }

    /// Signed distance between the plane and the given point.
    #[inline]
    pub fn distance_to_point(&self, point: DVec3) -> f64 {
        point.dot(self.normal) - self.dist
    }

    /// Classifies `point` against the plane, treating distances within `epsilon` as planar.
    pub fn side(&self, point: DVec3, epsilon: f64) -> PlaneSide {
        let d = self.distance_to_point(point);

        if d.abs() <= epsilon {
            return PlaneSide::Planar;
        }

        match d.partial_cmp(&0.0) {
            Some(Ordering::Greater) => PlaneSide::Front,
            _ => PlaneSide::Back,
        }
    }

    #[inline]
    pub fn project_point(&self, point: DVec3) -> DVec3 {
        point - self.distance_to_point(point) * self.normal
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaneSide {
    Back,
    Planar,
    Front,
}

/// A sphere.
#[derive(Clone, Debug, PartialEq)]
pub struct Sphere {
    /// The center of the sphere.
    pub center: DVec3,
    /// The radius of the sphere.
    pub radius: f64,
}
