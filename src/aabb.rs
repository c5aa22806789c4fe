use approx::{AbsDiffEq, RelativeEq};
use glam::DVec3;

/// An axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    origin: DVec3,
    half_extents: DVec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb::EMPTY
    }
}

impl Aabb {
    /// An AABB which contains nothing; the identity of [`Aabb::union`].
    pub const EMPTY: Aabb = Aabb {
        origin: DVec3::ZERO,
        half_extents: DVec3::NEG_INFINITY,
    };

    /// Constructs an AABB given its origin and half-extents (or radii) along each axis.
    pub fn new(origin: DVec3, half_extents: DVec3) -> Aabb {
        Aabb {
            origin,
            half_extents,
        }
    }

    /// Constructs an AABB from its minimum and maximum corners.
    pub fn from_mins_maxs(mins: DVec3, maxs: DVec3) -> Aabb {
        Aabb {
            origin: 0.5 * (mins + maxs),
            half_extents: 0.5 * (maxs - mins),
        }
    }

    /// Computes the smallest AABB containing every vertex.
    ///
    /// Returns [`Aabb::EMPTY`] if `vertices` is empty.
    pub fn of_vertices<I>(vertices: I) -> Aabb
    where
        I: IntoIterator<Item = DVec3>,
    {
        let mut mins = DVec3::INFINITY;
        let mut maxs = DVec3::NEG_INFINITY;
        let mut any = false;

        for v in vertices.into_iter() {
            mins = mins.min(v);
            maxs = maxs.max(v);
            any = true;
        }

        if !any {
            return Aabb::EMPTY;
        }

        Aabb::from_mins_maxs(mins, maxs)
    }

    /// Returns `true` if the AABB contains no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.half_extents.cmplt(DVec3::ZERO).any()
    }

    /// Returns `true` _iff_ `self` intersects `b`.
    #[inline]
    pub fn intersects_aabb(&self, b: &Aabb) -> bool {
        !self.is_empty()
            && !b.is_empty()
            && (self.origin - b.origin)
                .abs()
                .cmple(self.half_extents + b.half_extents)
                .all()
    }

    /// Returns `true` _iff_ `self` fully contains the point `point`.
    #[inline]
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.mins().cmple(point).all() && self.maxs().cmpge(point).all()
    }

    /// Returns `true` if `point` lies within the AABB grown by `epsilon` along every axis.
    #[inline]
    pub fn contains_point_within(&self, point: DVec3, epsilon: f64) -> bool {
        self.dilate(DVec3::splat(epsilon)).contains_point(point)
    }

    /// Returns the closest point on the AABB to the point `point`.
    #[inline]
    pub fn closest_point_to(&self, point: DVec3) -> DVec3 {
        point.clamp(self.mins(), self.maxs())
    }

    /// Returns the origin of the AABB.
    #[inline]
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    /// Returns the half-extents of the AABB.
    #[inline]
    pub fn half_extents(&self) -> DVec3 {
        self.half_extents
    }

    /// Returns the minimum extent of the AABB along each axis.
    #[inline]
    pub fn mins(&self) -> DVec3 {
        self.origin - self.half_extents
    }

    /// Returns the maximum extent of the AABB along each axis.
    #[inline]
    pub fn maxs(&self) -> DVec3 {
        self.origin + self.half_extents
    }

    /// Returns the union of `self` with the AABB `b`.
    pub fn union(&self, b: &Aabb) -> Aabb {
        if self.is_empty() {
            return *b;
        }

        if b.is_empty() {
            return *self;
        }

        Aabb::from_mins_maxs(self.mins().min(b.mins()), self.maxs().max(b.maxs()))
    }

    /// Increases the extents of the AABB along each axis by `dims` in the negative and positive
    /// directions.
    #[must_use = "this returns the dilated AABB, without modifying the original"]
    pub fn dilate(&self, dims: DVec3) -> Aabb {
        Aabb {
            half_extents: self.half_extents + dims.abs(),
            ..*self
        }
    }
}

impl AbsDiffEq for Aabb {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.origin.abs_diff_eq(other.origin, epsilon)
            && self.half_extents.abs_diff_eq(other.half_extents, epsilon)
    }
}

impl RelativeEq for Aabb {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.origin.relative_eq(&other.origin, epsilon, max_relative)
            && self
                .half_extents
                .relative_eq(&other.half_extents, epsilon, max_relative)
    }
}
