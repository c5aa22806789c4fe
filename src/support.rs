//! Support functions.

use glam::DVec3;

use crate::{
    polytope::{ConvexPolytope, Face},
    Isometry, Segment, Sphere,
};

/// A trait for convex shapes which can compute supporting points in a given direction.
///
/// Implementations must return an exact maximizer of `point · direction`. Ties may be broken in
/// any deterministic way.
pub trait SupportingVertex {
    /// Returns the point of the shape farthest along `direction`, or `None` if the shape is empty.
    fn supporting_vertex(&self, direction: DVec3) -> Option<DVec3>;
}

impl<T: SupportingVertex + ?Sized> SupportingVertex for &T {
    #[inline]
    fn supporting_vertex(&self, direction: DVec3) -> Option<DVec3> {
        (**self).supporting_vertex(direction)
    }
}

impl SupportingVertex for DVec3 {
    #[inline]
    fn supporting_vertex(&self, _direction: DVec3) -> Option<DVec3> {
        Some(*self)
    }
}

impl SupportingVertex for Sphere {
    #[inline]
    fn supporting_vertex(&self, direction: DVec3) -> Option<DVec3> {
        Some(self.center + self.radius * direction.normalize_or_zero())
    }
}

impl SupportingVertex for Segment {
    fn supporting_vertex(&self, direction: DVec3) -> Option<DVec3> {
        if self.direction().dot(direction) < 0.0 {
            Some(self.a)
        } else {
            Some(self.b)
        }
    }
}

impl SupportingVertex for ConvexPolytope {
    #[inline]
    fn supporting_vertex(&self, direction: DVec3) -> Option<DVec3> {
        self.supporting_vertex_key(direction)
            .and_then(|key| self.vertex(key))
            .map(|v| v.position())
    }
}

impl SupportingVertex for Face<'_> {
    #[inline]
    fn supporting_vertex(&self, direction: DVec3) -> Option<DVec3> {
        Some(Face::supporting_vertex(self, direction).position())
    }
}

/// A shape placed in the world by an isometry.
#[derive(Copy, Clone, Debug)]
pub struct Transformed<S> {
    pub shape: S,
    pub isometry: Isometry,
}

impl<S> Transformed<S> {
    pub fn new(shape: S, isometry: Isometry) -> Transformed<S> {
        Transformed { shape, isometry }
    }
}

impl<S: SupportingVertex> SupportingVertex for Transformed<S> {
    /// Rotates `direction` into the shape's frame, then maps the local support point back out.
    #[inline]
    fn supporting_vertex(&self, direction: DVec3) -> Option<DVec3> {
        let local = self.isometry.inverse_transform_vector(direction);

        self.shape
            .supporting_vertex(local)
            .map(|p| self.isometry * p)
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_relative_eq, assert_ulps_eq};
    use glam::DQuat;

    use super::*;

    #[test]
    fn sphere_support() {
        let origin = DVec3::new(2.0, -1.0, 10.0);

        let at_origin = Sphere {
            center: DVec3::ZERO,
            radius: 1.0,
        };

        for w in -10..=10 {
            let x = (w as f64).cos();
            let y = (w as f64).sin();
            let z = w as f64;

            let v = DVec3::new(x, y, z).normalize();

            assert_ulps_eq!(at_origin.supporting_vertex(v).unwrap(), v);
            assert_ulps_eq!(
                Transformed::new(&at_origin, Isometry::from_translation(origin))
                    .supporting_vertex(v)
                    .unwrap(),
                origin + v
            );
        }
    }

    #[test]
    fn segment_support() {
        let seg = Segment::new(DVec3::ZERO, DVec3::new(1.0, 1.0, 0.0));

        assert_eq!(seg.supporting_vertex(DVec3::X), Some(seg.b));
        assert_eq!(seg.supporting_vertex(-DVec3::Y), Some(seg.a));
    }

    #[test]
    fn polytope_support() {
        let cube = ConvexPolytope::cube(1.0).unwrap();
        let dir = DVec3::new(0.3, -2.0, 0.7);

        assert_eq!(
            SupportingVertex::supporting_vertex(&cube, dir),
            Some(DVec3::new(1.0, -1.0, 1.0))
        );
        assert_eq!(
            SupportingVertex::supporting_vertex(&ConvexPolytope::new(), dir),
            None
        );

        let face = cube.faces().next().unwrap();
        let on_face = SupportingVertex::supporting_vertex(&face, dir).unwrap();
        assert!(face.vertices().all(|v| v.position().dot(dir) <= on_face.dot(dir)));
    }

    #[test]
    fn transformed_support() {
        let cube = ConvexPolytope::cube(1.0).unwrap();
        let iso = Isometry::new(
            DQuat::from_rotation_z(std::f64::consts::FRAC_PI_4),
            DVec3::new(5.0, 0.0, 0.0),
        );
        let placed = Transformed::new(&cube, iso);

        // The rotated corner (1, -1, z) now lies on the +X axis.
        let p = placed.supporting_vertex(DVec3::new(1.0, 0.0, 0.01)).unwrap();
        assert_relative_eq!(
            p,
            DVec3::new(5.0 + 2.0_f64.sqrt(), 0.0, 1.0),
            epsilon = 1e-12
        );
    }
}
