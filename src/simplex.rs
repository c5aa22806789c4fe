//! Simplices over the Minkowski difference of two shapes.
//!
//! The closest-point search is Johnson's distance sub-algorithm, following "A Fast and Robust GJK
//! Implementation for Collision Detection of Convex Objects" by Gino van den Bergen
//! (https://doi.org/10.1080/10867651.1999.10487502). Determinants of every sub-simplex are
//! memoized and updated incrementally as points are added.

use arrayvec::ArrayVec;
use glam::DVec3;
use tracing::trace;

/// A point of the Minkowski difference `A - B` together with the points of A and B it came from.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SupportPoint {
    pub on_a: DVec3,
    pub on_b: DVec3,
    /// `on_a - on_b`.
    pub point: DVec3,
}

impl SupportPoint {
    #[inline]
    pub fn new(on_a: DVec3, on_b: DVec3) -> SupportPoint {
        SupportPoint {
            on_a,
            on_b,
            point: on_a - on_b,
        }
    }
}

/// Reasons a point can be rejected by [`Simplex::insert`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InsertError {
    /// The point is already a vertex of the simplex.
    Duplicate,
    /// The simplex already has four vertices.
    Full,
}

/// Up to four support points and the memoized determinants of their sub-simplices.
#[derive(Clone, Debug)]
pub struct Simplex {
    prev_bits: u8,
    bits: u8,
    new_bit: u8,
    new_idx: u8,

    points: [SupportPoint; 4],

    // Symmetric table of pairwise dot products between the points.
    dot: [[f64; 4]; 4],

    // Row `mask`, column `i`: cofactor of point `i` within the sub-simplex made of the points
    // whose bits are set in `mask`. Divided by the row sum they are barycentric coordinates.
    det: [[f64; 4]; 16],
}

impl Default for Simplex {
    fn default() -> Self {
        Simplex::new()
    }
}

impl Simplex {
    pub fn new() -> Simplex {
        Simplex {
            prev_bits: 0,
            bits: 0b0000,
            new_bit: 0b0000,
            new_idx: 0,
            points: [SupportPoint::default(); 4],
            dot: Default::default(),
            det: Default::default(),
        }
    }

    /// Removes every point.
    pub fn clear(&mut self) {
        *self = Simplex::new();
    }

    /// Returns the number of points in the simplex.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.bits == 0b1111
    }

    /// Returns `true` if the simplex is a tetrahedron enclosing the origin.
    ///
    /// [`Simplex::find_closest`] only keeps all four points when the origin lies inside them.
    #[inline]
    pub fn contains_origin(&self) -> bool {
        self.is_full()
    }

    /// Iterates over the points of the simplex.
    pub fn points(&self) -> impl Iterator<Item = &SupportPoint> + '_ {
        (0..4)
            .filter(move |i| self.bits & (1 << i) != 0)
            .map(move |i| &self.points[i])
    }

    /// Adds a point to the simplex.
    pub fn insert(&mut self, point: SupportPoint) -> Result<(), InsertError> {
        if self.is_full() {
            return Err(InsertError::Full);
        }

        if self.points().any(|p| p.point == point.point) {
            return Err(InsertError::Duplicate);
        }

        let new_idx = self.bits.trailing_ones() as usize;

        self.points[new_idx] = point;
        self.prev_bits = self.bits;
        self.new_idx = new_idx as u8;
        self.new_bit = 1 << new_idx;
        self.bits |= self.new_bit;

        self.update_det();

        Ok(())
    }

    // Sets the cofactor of `p` in the sub-simplex `{p} + rest` from the cofactors of `rest`.
    fn extend_cofactor(&mut self, p: usize, rest: &[usize]) {
        let rest_bits = rest.iter().fold(0, |bits, &i| bits | (1 << i));
        let anchor = rest[0];

        let cofactor: f64 = rest
            .iter()
            .map(|&i| self.det[rest_bits][i] * (self.dot[i][anchor] - self.dot[i][p]))
            .sum();

        self.det[rest_bits | (1 << p)][p] = cofactor;
    }

    fn update_det(&mut self) {
        let k = self.new_idx as usize;
        let old: ArrayVec<usize, 4> = (0..4).filter(|&i| self.prev_bits & (1 << i) != 0).collect();

        let new_point = self.points[k].point;
        for &i in &old {
            let d = self.points[i].point.dot(new_point);
            self.dot[i][k] = d;
            self.dot[k][i] = d;
        }
        self.dot[k][k] = new_point.length_squared();

        // Sub-simplices without the new point keep their cofactors.
        self.det[1 << k][k] = 1.0;

        for (j, &q) in old.iter().enumerate() {
            self.extend_cofactor(q, &[k]);
            self.extend_cofactor(k, &[q]);

            // Each triangle needs both of its edges through the new point first.
            for &p in &old[..j] {
                self.extend_cofactor(p, &[q, k]);
                self.extend_cofactor(q, &[p, k]);
                self.extend_cofactor(k, &[p, q]);
            }
        }

        if self.is_full() {
            for p in 0..4 {
                let rest: ArrayVec<usize, 3> = (0..4).filter(|&i| i != p).collect();
                self.extend_cofactor(p, &rest);
            }
        }
    }

    /// Reduces the simplex to the smallest sub-simplex containing the point closest to the
    /// origin, and returns that point.
    ///
    /// The most recently inserted point is always kept. Returns `None`, leaving the simplex
    /// unchanged, if rounding error leaves no sub-simplex satisfying the optimality conditions.
    pub fn find_closest(&mut self) -> Option<DVec3> {
        let old_bits = self.prev_bits;

        for sub_bits in (1..=old_bits).rev() {
            if old_bits & sub_bits != sub_bits {
                continue;
            }

            if self.is_valid_solution(sub_bits | self.new_bit) {
                self.bits = sub_bits | self.new_bit;
                trace!(points = self.len(), "simplex reduced");

                return self.barycentric_sum(|p| p.point);
            }
        }

        if self.is_valid_solution(self.new_bit) {
            self.bits = self.new_bit;
            return Some(self.points[self.new_idx as usize].point);
        }

        None
    }

    /// Returns the points of A and B whose difference is the closest point of the simplex.
    pub fn closest_points(&self) -> Option<(DVec3, DVec3)> {
        let on_a = self.barycentric_sum(|p| p.on_a)?;
        let on_b = self.barycentric_sum(|p| p.on_b)?;
        Some((on_a, on_b))
    }

    // Combines `f` of the active points, weighted by their barycentric coordinates.
    fn barycentric_sum(&self, f: impl Fn(&SupportPoint) -> DVec3) -> Option<DVec3> {
        let mut sum = DVec3::ZERO;
        let mut bary_sum = 0.0;

        for i in 0..4 {
            if self.bits & (1 << i) == 0 {
                continue;
            }

            let det = self.det[self.bits as usize][i];
            bary_sum += det;
            sum += f(&self.points[i]) * det;
        }

        let denom = bary_sum.recip();
        if !denom.is_normal() || denom < 0.0 {
            return None;
        }

        Some(sum * denom)
    }

    // `sub_bits` carries the closest point when each of its members has a positive cofactor and
    // adding any other active point would give that point a non-positive one.
    fn is_valid_solution(&self, sub_bits: u8) -> bool {
        let all_bits = self.bits;
        debug_assert_eq!(all_bits & sub_bits, sub_bits);

        for i in 0..4 {
            let bit = 1 << i;

            if all_bits & bit == 0 {
                continue;
            }

            let bit_included = sub_bits & bit != 0;
            let det_positive = self.det[(sub_bits | bit) as usize][i] > 0.0;

            if bit_included != det_positive {
                return false;
            }
        }

        true
    }
}
