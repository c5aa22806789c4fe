//! The Gilbert-Johnson-Keerthi least distance algorithm.
// Implementation based on "A Fast and Robust GJK Implementation for Collision Detection of Convex
// Objects" by Gino van den Bergen (https://doi.org/10.1080/10867651.1999.10487502).

use glam::DVec3;
use tracing::{debug, trace, warn};

use crate::{
    collision::{CollisionResult, Termination},
    simplex::{Simplex, SupportPoint},
    support::SupportingVertex,
    Error,
};

/// Computes the support point of `A - B` in `direction`.
pub(crate) fn support_point<A, B>(a: &A, b: &B, direction: DVec3) -> Result<SupportPoint, Error>
where
    A: SupportingVertex + ?Sized,
    B: SupportingVertex + ?Sized,
{
    if !direction.is_finite() {
        return Err(Error::InvalidData);
    }

    let on_a = a.supporting_vertex(direction).ok_or(Error::EmptyShape)?;
    let on_b = b.supporting_vertex(-direction).ok_or(Error::EmptyShape)?;

    if !on_a.is_finite() || !on_b.is_finite() {
        return Err(Error::InvalidData);
    }

    Ok(SupportPoint::new(on_a, on_b))
}

#[derive(Copy, Clone, Debug)]
struct LowerBound(f64);

impl LowerBound {
    #[inline(always)]
    fn new() -> LowerBound {
        LowerBound(0.0)
    }

    #[inline(always)]
    fn get(&self) -> f64 {
        self.0
    }

    #[inline(always)]
    fn update(&mut self, delta: f64) {
        self.0 = delta.max(self.0)
    }
}

/// The full state of a finished GJK query.
#[derive(Clone, Debug)]
pub struct GjkOutcome {
    pub result: CollisionResult,
    /// The terminal simplex. It encloses the origin when the shapes overlap.
    pub simplex: Simplex,
    pub iterations: usize,
    pub termination: Termination,
}

/// Separation and intersection queries between convex shapes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GjkDetector {
    epsilon: f64,
    relative_epsilon: f64,
    max_iterations: usize,
    initial_direction: DVec3,
}

impl Default for GjkDetector {
    fn default() -> Self {
        GjkDetector {
            epsilon: Self::DEFAULT_EPSILON,
            relative_epsilon: Self::DEFAULT_RELATIVE_EPSILON,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            initial_direction: DVec3::X,
        }
    }
}

impl GjkDetector {
    /// Shapes closer than this are considered to be touching.
    ///
    /// Assuming units are in meters, this terminates the loop if objects are within a tenth of a
    /// nanometer of each other.
    pub const DEFAULT_EPSILON: f64 = 1.0e-10;
    pub const DEFAULT_RELATIVE_EPSILON: f64 = 1.0e-8;
    pub const DEFAULT_MAX_ITERATIONS: usize = 128;

    pub fn new() -> GjkDetector {
        GjkDetector::default()
    }

    /// Sets the absolute distance below which shapes are reported as colliding.
    pub fn with_epsilon(self, epsilon: f64) -> GjkDetector {
        GjkDetector {
            epsilon: epsilon.abs(),
            ..self
        }
    }

    /// Sets the relative gap between the distance estimate and its lower bound at which the
    /// search stops.
    pub fn with_relative_epsilon(self, relative_epsilon: f64) -> GjkDetector {
        GjkDetector {
            relative_epsilon: relative_epsilon.abs(),
            ..self
        }
    }

    pub fn with_max_iterations(self, max_iterations: usize) -> GjkDetector {
        GjkDetector {
            max_iterations,
            ..self
        }
    }

    /// Sets the first search direction. Zero or non-finite directions fall back to +X.
    pub fn with_initial_direction(self, direction: DVec3) -> GjkDetector {
        let initial_direction = match direction.try_normalize() {
            Some(dir) => dir,
            None => DVec3::X,
        };

        GjkDetector {
            initial_direction,
            ..self
        }
    }

    #[inline]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    #[inline]
    pub fn relative_epsilon(&self) -> f64 {
        self.relative_epsilon
    }

    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Computes the distance and closest points between `a` and `b`.
    ///
    /// When the shapes overlap, the result reports a collision with zero distance and no normals;
    /// the terminal simplex can then seed [`EpaDetector`](crate::EpaDetector).
    pub fn evaluate<A, B>(&self, a: &A, b: &B) -> Result<GjkOutcome, Error>
    where
        A: SupportingVertex + ?Sized,
        B: SupportingVertex + ?Sized,
    {
        self.run(a, b, false)
    }

    /// Returns `true` if `a` and `b` overlap or touch.
    ///
    /// Stops as soon as a separating axis is found, without refining the distance.
    pub fn test_collision<A, B>(&self, a: &A, b: &B) -> Result<bool, Error>
    where
        A: SupportingVertex + ?Sized,
        B: SupportingVertex + ?Sized,
    {
        Ok(self.run(a, b, true)?.result.are_shapes_colliding)
    }

    fn run<A, B>(&self, a: &A, b: &B, stop_when_separated: bool) -> Result<GjkOutcome, Error>
    where
        A: SupportingVertex + ?Sized,
        B: SupportingVertex + ?Sized,
    {
        // Initialize v with an arbitrary support point on the Minkowski difference.
        let init = support_point(a, b, self.initial_direction)?;

        let mut simplex = Simplex::new();
        let mut v = init.point;
        if simplex.insert(init).is_ok() {
            v = simplex.find_closest().unwrap_or(v);
        }

        let mut dist = v.length();
        let mut dist_lower_bound = LowerBound::new();
        let mut iterations = 0;
        let mut termination = Termination::Converged;
        let mut separated = false;

        while !simplex.is_full() && dist > self.epsilon {
            if iterations == self.max_iterations {
                warn!(iterations, dist, "GJK stopped at its iteration cap");
                termination = Termination::MaxIterations;
                break;
            }
            iterations += 1;

            // Compute the support point on the Minkowski difference.
            let w = support_point(a, b, -v)?;

            // Update the lower bound.
            dist_lower_bound.update(v.dot(w.point) / dist);

            trace!(
                iterations,
                dist,
                lower_bound = dist_lower_bound.get(),
                "GJK iteration"
            );

            // A positive lower bound means a separating plane exists.
            if stop_when_separated && dist_lower_bound.get() > self.epsilon {
                separated = true;
                break;
            }

            // If the previous distance is less than the lower bound, terminate.
            if dist - dist_lower_bound.get() <= dist * self.relative_epsilon {
                break;
            }

            if simplex.insert(w).is_err() {
                break;
            }

            let Some(closest) = simplex.find_closest() else {
                break;
            };

            v = closest;
            dist = v.length();
        }

        let colliding = !separated && (simplex.contains_origin() || dist <= self.epsilon);

        let (point_on_a, point_on_b) = simplex
            .closest_points()
            .unwrap_or((init.on_a, init.on_b));

        let result = if colliding {
            CollisionResult {
                are_shapes_colliding: true,
                distance: 0.0,
                point_on_a,
                point_on_b,
                normal_on_a: DVec3::ZERO,
                normal_on_b: DVec3::ZERO,
            }
        } else {
            // v points from B's witness to A's.
            let normal_on_a = (-v).normalize_or_zero();

            CollisionResult {
                are_shapes_colliding: false,
                distance: dist,
                point_on_a,
                point_on_b,
                normal_on_a,
                normal_on_b: -normal_on_a,
            }
        };

        debug!(iterations, colliding, distance = dist, "GJK finished");

        Ok(GjkOutcome {
            result,
            simplex,
            iterations,
            termination,
        })
    }
}

// van den Bergen notes
//
// - A: first convex object
// - B: second convex object
// - δ_k: signed distance from origin to supporting plane, (v_k · w_k) / mag(v_k)
// - Δ(X): determinant of X, used in calculation of λ via Cramer's rule
// - ɛ: absolute error tolerance
// - I_X: set of indices which gives X ⊆ Y s.t. X = {Y[i] : i ∈ I_X}.
// - λ_k: barycentric coordinate vector at kth iteration
// - μ_k: corrected lower bound at kth iteration, max(0, δ_0, ... , δ_k)
// - v(A - B): point closest to origin in A - B
// - v_k: point in W_k closest to origin
// - W_k: simplex at kth iteration
// - X: subset of W whose convex hull contains v
